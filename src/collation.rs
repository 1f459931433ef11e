//! The collation service consumed by index building and lookups.
//!
//! Ordering and normalization are treated as pure functions of a locale id
//! and a normalizer ruleset id respectively. A [`Registry`] maps ids to
//! implementations, and ships with a folding collation for the common
//! Latin-script locales.


use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arrayvec::ArrayVec;

use crate::error::Error;

/// A total order over strings for a given locale.
pub trait Collator: Send + Sync {
    /// Compare two strings.
    fn compare(&self, a: &str, b: &str) -> Ordering;
}

/// Collapse case, diacritic and ligature variants into a canonical form.
pub trait Normalizer: Send + Sync {
    /// Normalize the given string.
    fn normalize<'a>(&self, input: &'a str) -> Cow<'a, str>;
}

/// Locales served by the built-in folding collator.
const FOLDING_LOCALES: &[&str] = &[
    "root", "en", "de", "fr", "es", "it", "nl", "pt", "sv", "da", "no", "fi", "pl", "cs",
];

/// The resolved collation of a single index.
#[derive(Clone)]
pub struct Collation {
    collator: Arc<dyn Collator>,
    normalizer: Arc<dyn Normalizer>,
}

impl Collation {
    /// Construct a collation out of its parts.
    pub fn new(collator: Arc<dyn Collator>, normalizer: Arc<dyn Normalizer>) -> Self {
        Self {
            collator,
            normalizer,
        }
    }

    /// Compare raw strings.
    #[inline]
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        self.collator.compare(a, b)
    }

    /// Normalize a string.
    #[inline]
    pub fn normalize<'a>(&self, input: &'a str) -> Cow<'a, str> {
        self.normalizer.normalize(input)
    }

    /// The order in which tokens are stored in an index: collation order
    /// with ties broken by the raw string.
    pub fn token_order(&self, a: &str, b: &str) -> Ordering {
        self.collator.compare(a, b).then_with(|| a.cmp(b))
    }
}

impl fmt::Debug for Collation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collation").finish_non_exhaustive()
    }
}

/// A lookup table from locale and ruleset ids to implementations.
pub struct Registry {
    collators: HashMap<String, Arc<dyn Collator>>,
    normalizers: HashMap<String, Arc<dyn Normalizer>>,
}

impl Registry {
    /// Construct an empty registry.
    pub fn empty() -> Self {
        Self {
            collators: HashMap::new(),
            normalizers: HashMap::new(),
        }
    }

    /// Register a collator for the given locale id.
    pub fn register_collator<C>(&mut self, locale: &str, collator: C)
    where
        C: 'static + Collator,
    {
        self.collators.insert(locale.to_owned(), Arc::new(collator));
    }

    /// Register a normalizer for the given ruleset id.
    pub fn register_normalizer<N>(&mut self, rules: &str, normalizer: N)
    where
        N: 'static + Normalizer,
    {
        self.normalizers.insert(rules.to_owned(), Arc::new(normalizer));
    }

    /// Resolve the collator of a locale.
    ///
    /// A locale with a region such as `de_DE` falls back to its language
    /// part if the full id isn't registered.
    pub fn collator(&self, locale: &str) -> Result<Arc<dyn Collator>, Error> {
        if let Some(collator) = self.collators.get(locale) {
            return Ok(collator.clone());
        }

        if let Some((language, _)) = locale.split_once(['_', '-']) {
            if let Some(collator) = self.collators.get(language) {
                return Ok(collator.clone());
            }
        }

        Err(Error::CollationUnavailable {
            kind: "collator",
            id: locale.to_owned(),
        })
    }

    /// Resolve a normalizer ruleset.
    pub fn normalizer(&self, rules: &str) -> Result<Arc<dyn Normalizer>, Error> {
        match self.normalizers.get(rules) {
            Some(normalizer) => Ok(normalizer.clone()),
            None => Err(Error::CollationUnavailable {
                kind: "normalizer",
                id: rules.to_owned(),
            }),
        }
    }

    /// Resolve both parts of a collation.
    pub fn collation(&self, locale: &str, rules: &str) -> Result<Collation, Error> {
        Ok(Collation::new(self.collator(locale)?, self.normalizer(rules)?))
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();

        for locale in FOLDING_LOCALES {
            registry.register_collator(locale, FoldingCollator);
        }

        registry.register_normalizer("fold", Fold);
        registry.register_normalizer("lower", Lower);
        registry.register_normalizer("identity", Identity);
        registry
    }
}

/// Compares strings by their folded form, so case and diacritic variants
/// compare equal.
#[derive(Debug, Clone, Copy)]
pub struct FoldingCollator;

impl Collator for FoldingCollator {
    fn compare(&self, a: &str, b: &str) -> Ordering {
        folded(a).cmp(folded(b))
    }
}

/// Lower-cases, strips diacritics and expands ligatures.
#[derive(Debug, Clone, Copy)]
pub struct Fold;

impl Normalizer for Fold {
    fn normalize<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if folded(input).eq(input.chars()) {
            return Cow::Borrowed(input);
        }

        Cow::Owned(folded(input).collect())
    }
}

/// Lower-cases only.
#[derive(Debug, Clone, Copy)]
pub struct Lower;

impl Normalizer for Lower {
    fn normalize<'a>(&self, input: &'a str) -> Cow<'a, str> {
        if !input.chars().any(char::is_uppercase) {
            return Cow::Borrowed(input);
        }

        Cow::Owned(input.to_lowercase())
    }
}

/// Leaves input untouched.
#[derive(Debug, Clone, Copy)]
pub struct Identity;

impl Normalizer for Identity {
    #[inline]
    fn normalize<'a>(&self, input: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(input)
    }
}

/// Iterate over the folded characters of a string.
pub fn folded(input: &str) -> impl Iterator<Item = char> + '_ {
    input
        .chars()
        .flat_map(char::to_lowercase)
        .flat_map(fold_lower)
}

/// Fold a lower-case character into zero or more base characters.
fn fold_lower(c: char) -> ArrayVec<char, 2> {
    let mut out = ArrayVec::new();

    let (a, b) = match c {
        '\u{0300}'..='\u{036f}' => return out,
        'à'..='å' | 'ā' | 'ă' | 'ą' => ('a', None),
        'æ' => ('a', Some('e')),
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => ('c', None),
        'ð' | 'ď' | 'đ' => ('d', None),
        'è'..='ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => ('e', None),
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => ('g', None),
        'ĥ' | 'ħ' => ('h', None),
        'ì'..='ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => ('i', None),
        'ĳ' => ('i', Some('j')),
        'ĵ' => ('j', None),
        'ķ' => ('k', None),
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => ('l', None),
        'ñ' | 'ń' | 'ņ' | 'ň' => ('n', None),
        'ò'..='ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => ('o', None),
        'œ' => ('o', Some('e')),
        'ŕ' | 'ŗ' | 'ř' => ('r', None),
        'ś' | 'ŝ' | 'ş' | 'š' => ('s', None),
        'ß' => ('s', Some('s')),
        'ţ' | 'ť' | 'ŧ' => ('t', None),
        'þ' => ('t', Some('h')),
        'ù'..='ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => ('u', None),
        'ŵ' => ('w', None),
        'ý' | 'ÿ' | 'ŷ' => ('y', None),
        'ź' | 'ż' | 'ž' => ('z', None),
        'ﬀ' => ('f', Some('f')),
        'ﬁ' => ('f', Some('i')),
        'ﬂ' => ('f', Some('l')),
        c => (c, None),
    };

    out.push(a);

    if let Some(b) = b {
        out.push(b);
    }

    out
}
