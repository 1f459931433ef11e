//! Entries owned by a dictionary.

use crate::index::Index;

/// Provenance of a batch of entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntrySource {
    pub name: String,
    /// Number of entries filed under this source.
    pub count: u32,
}

/// A single translation pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub lang1: String,
    pub lang2: String,
}

impl Pair {
    pub fn new<A, B>(lang1: A, lang2: B) -> Self
    where
        A: Into<String>,
        B: Into<String>,
    {
        Self {
            lang1: lang1.into(),
            lang2: lang2.into(),
        }
    }

    /// Get one side of the pair, optionally swapped.
    pub fn side(&self, swap: bool) -> &str {
        if swap {
            &self.lang2
        } else {
            &self.lang1
        }
    }
}

/// One or more pairs sharing a single dictionary row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairEntry {
    pub source: u32,
    pub pairs: Vec<Pair>,
}

/// A free-text note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    pub source: u32,
    pub text: String,
}

/// A titled rich-text article. The body is compressed when stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlEntry {
    pub source: u32,
    pub title: String,
    pub html: String,
}

/// A fully built dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    /// Creation time in milliseconds since the unix epoch.
    pub created: i64,
    pub description: String,
    pub sources: Vec<EntrySource>,
    pub pair_entries: Vec<PairEntry>,
    pub text_entries: Vec<TextEntry>,
    pub html_entries: Vec<HtmlEntry>,
    pub indices: Vec<Index>,
}

impl Dictionary {
    /// Find an index by its short name.
    pub fn index(&self, short_name: &str) -> Option<&Index> {
        self.indices.iter().find(|i| i.short_name == short_name)
    }
}
