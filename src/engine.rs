//! Building dictionaries out of entries, and moving them to and from disk.


use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use crate::collation::{Collation, Registry};
use crate::config::StreamConfig;
use crate::container::{self, WriteOptions};
use crate::entry::{Dictionary, EntrySource, HtmlEntry, Pair, PairEntry, TextEntry};
use crate::error::Error;
use crate::index::{EntryRef, Index, IndexBuilder, IndexEntry, IndexSpec, Row};
use crate::reporter::Reporter;
use crate::stream::{ReadAhead, WriteBehind};
use crate::tokenizer::{main_token_count, EntryTypeTag, SimpleTokenizer, Token, Tokenizer};
use crate::trie::{Descriptor, TrieBuilder, TrieReader};
use crate::{report_info, report_warn};

/// Collects the entries of a bilingual dictionary and builds its two
/// indices.
pub struct DictionaryEngine {
    description: String,
    created: i64,
    specs: [IndexSpec; 2],
    registry: Registry,
    tokenizer: Box<dyn Tokenizer>,
    max_token_chars: usize,
    sources: Vec<EntrySource>,
    pair_entries: Vec<PairEntry>,
    text_entries: Vec<(usize, TextEntry)>,
    html_entries: Vec<(usize, HtmlEntry)>,
}

impl DictionaryEngine {
    /// Construct a new engine. The first index is that of the first column
    /// of pair entries, the second that of the second column.
    pub fn new(description: &str, specs: [IndexSpec; 2]) -> Self {
        let created = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as i64);

        Self {
            description: description.to_owned(),
            created,
            specs,
            registry: Registry::default(),
            tokenizer: Box::new(SimpleTokenizer),
            max_token_chars: 64,
            sources: Vec::new(),
            pair_entries: Vec::new(),
            text_entries: Vec::new(),
            html_entries: Vec::new(),
        }
    }

    /// Override the creation time, in milliseconds since the unix epoch.
    pub fn with_created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    /// Resolve index collations through the given registry.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Split entry text into tokens with the given tokenizer.
    pub fn with_tokenizer<T>(mut self, tokenizer: T) -> Self
    where
        T: 'static + Tokenizer,
    {
        self.tokenizer = Box::new(tokenizer);
        self
    }

    /// Tokens with more characters than this are not indexed.
    pub fn with_max_token_chars(mut self, max_token_chars: usize) -> Self {
        self.max_token_chars = max_token_chars;
        self
    }

    /// Add a source, returning its handle.
    pub fn add_source(&mut self, name: &str) -> u32 {
        let index = self.sources.len() as u32;

        self.sources.push(EntrySource {
            name: name.to_owned(),
            count: 0,
        });

        index
    }

    fn count(&mut self, source: u32) -> Result<(), Error> {
        let Some(s) = self.sources.get_mut(source as usize) else {
            return Err(Error::UnknownSource {
                index: source as usize,
            });
        };

        s.count += 1;
        Ok(())
    }

    fn check_lang(&self, lang: usize) -> Result<(), Error> {
        if lang >= self.specs.len() {
            return Err(Error::UnknownIndex { index: lang });
        }

        Ok(())
    }

    /// Add an entry of one or more translation pairs, returning its handle.
    pub fn add_pair_entry(&mut self, source: u32, pairs: Vec<Pair>) -> Result<u32, Error> {
        self.count(source)?;
        let index = self.pair_entries.len() as u32;
        self.pair_entries.push(PairEntry { source, pairs });
        Ok(index)
    }

    /// Add a free-text note, indexed in the language `lang`.
    pub fn add_text_entry(&mut self, source: u32, lang: usize, text: &str) -> Result<u32, Error> {
        self.check_lang(lang)?;
        self.count(source)?;
        let index = self.text_entries.len() as u32;

        self.text_entries.push((
            lang,
            TextEntry {
                source,
                text: text.to_owned(),
            },
        ));

        Ok(index)
    }

    /// Add an article indexed by its title in the language `lang`.
    pub fn add_html_entry(
        &mut self,
        source: u32,
        lang: usize,
        title: &str,
        html: &str,
    ) -> Result<u32, Error> {
        self.check_lang(lang)?;
        self.count(source)?;
        let index = self.html_entries.len() as u32;

        self.html_entries.push((
            lang,
            HtmlEntry {
                source,
                title: title.to_owned(),
                html: html.to_owned(),
            },
        ));

        Ok(index)
    }

    /// Build both indices in parallel and assemble the dictionary.
    pub fn build(self, reporter: &dyn Reporter) -> Result<Dictionary, Error> {
        let start = Instant::now();

        let collations = [
            self.registry
                .collation(&self.specs[0].locale, &self.specs[0].normalizer)?,
            self.registry
                .collation(&self.specs[1].locale, &self.specs[1].normalizer)?,
        ];

        let engine = &self;

        let indices = thread::scope(|s| {
            let handles = engine
                .specs
                .iter()
                .zip(collations)
                .enumerate()
                .map(|(lang, (spec, collation))| {
                    thread::Builder::new()
                        .name(format!("index-{}", spec.short_name))
                        .spawn_scoped(s, move || {
                            engine.build_index(lang, spec.clone(), collation, reporter)
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let mut indices = Vec::with_capacity(handles.len());

            for handle in handles {
                match handle.join() {
                    Ok(index) => indices.push(index),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }

            Ok::<_, Error>(indices)
        })?;

        let duration = Duration::from_millis(start.elapsed().as_millis() as u64);

        report_info!(
            reporter,
            "Built {} pair, {} text and {} html entries in {duration:?}",
            self.pair_entries.len(),
            self.text_entries.len(),
            self.html_entries.len()
        );

        Ok(Dictionary {
            created: self.created,
            description: self.description,
            sources: self.sources,
            pair_entries: self.pair_entries,
            text_entries: self.text_entries.into_iter().map(|(_, e)| e).collect(),
            html_entries: self.html_entries.into_iter().map(|(_, e)| e).collect(),
            indices,
        })
    }

    fn build_index(
        &self,
        lang: usize,
        spec: IndexSpec,
        collation: Collation,
        reporter: &dyn Reporter,
    ) -> Index {
        let swap = spec.swap_pair_entries;
        let mut builder = IndexBuilder::new(spec, collation, self.max_token_chars);
        let mut tokens = Vec::new();
        let mut empty = 0usize;

        for (n, entry) in self.pair_entries.iter().enumerate() {
            for pair in &entry.pairs {
                tokens.clear();
                self.tokenizer.tokenize(pair.side(swap), &mut tokens);
                empty += usize::from(tokens.is_empty());
                add_tokens(&mut builder, &tokens, EntryRef::Pair(n as u32), None);
            }
        }

        for (n, (entry_lang, entry)) in self.text_entries.iter().enumerate() {
            if *entry_lang != lang {
                continue;
            }

            tokens.clear();
            self.tokenizer.tokenize(&entry.text, &mut tokens);
            empty += usize::from(tokens.is_empty());
            add_tokens(
                &mut builder,
                &tokens,
                EntryRef::Text(n as u32),
                Some(EntryTypeTag::Note),
            );
        }

        for (n, (entry_lang, entry)) in self.html_entries.iter().enumerate() {
            if *entry_lang != lang {
                continue;
            }

            tokens.clear();
            self.tokenizer.tokenize(&entry.title, &mut tokens);
            empty += usize::from(tokens.is_empty());
            add_tokens(&mut builder, &tokens, EntryRef::Html(n as u32), None);
        }

        if empty > 0 {
            report_warn!(
                reporter,
                "{}: {empty} text(s) without any tokens",
                builder.spec().short_name
            );
        }

        builder.build(reporter)
    }
}

/// File `tokens` under `entry`, overriding the tag of directly attached
/// tokens if `tag` is set.
fn add_tokens(
    builder: &mut IndexBuilder,
    tokens: &[Token<'_>],
    entry: EntryRef,
    tag: Option<EntryTypeTag>,
) {
    let token_count = main_token_count(tokens);

    for token in tokens {
        let tag = match tag {
            Some(tag) if token.tag.is_main() => tag,
            _ => token.tag,
        };

        builder.add(token.text, entry, tag, token_count);
    }
}

/// Write a dictionary to `path` through a background writer.
///
/// A partially written file is removed if writing fails.
pub fn write_path(
    dictionary: &Dictionary,
    path: &Path,
    options: &WriteOptions,
    stream: &StreamConfig,
) -> Result<u64, Error> {
    let file = File::create(path)?;

    match write_file(dictionary, file, options, stream) {
        Ok(len) => {
            tracing::info!(path = %path.display(), len, "Wrote dictionary");
            Ok(len)
        }
        Err(error) => {
            if let Err(e) = std::fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial file");
            }

            Err(error)
        }
    }
}

fn write_file(
    dictionary: &Dictionary,
    file: File,
    options: &WriteOptions,
    stream: &StreamConfig,
) -> Result<u64, Error> {
    let mut writer = WriteBehind::new(file, stream.block_size, stream.capacity)?;
    let len = container::write(dictionary, options, &mut writer)?;
    writer.close()?;
    Ok(len)
}

/// Read the raw bytes of a dictionary through a background reader.
pub fn read_bytes(path: &Path, stream: &StreamConfig) -> Result<Vec<u8>, Error> {
    let file = File::open(path)?;
    let len = file.metadata().map_or(0, |m| m.len() as usize);
    let mut reader = ReadAhead::new(file, stream.block_size, stream.capacity)?;
    let mut data = Vec::with_capacity(len);
    reader.read_to_end(&mut data)?;
    Ok(data)
}

/// Read and fully decode a dictionary.
pub fn read_path(path: &Path, stream: &StreamConfig) -> Result<Dictionary, Error> {
    let data = read_bytes(path, stream)?;
    container::read(&data)
}

/// Build a prefix trie over the normalized tokens of an index.
///
/// Every token is described by the row of its token marker and the number of
/// words in it.
pub fn prefix_trie(index: &Index) -> TrieBuilder {
    let mut trie = TrieBuilder::new();

    for entry in &index.sorted_index_entries {
        let words = entry.token.split_whitespace().count().max(1) as u32;
        trie.insert(
            entry.normalized_token(),
            Descriptor::new(u64::from(entry.start_row), words),
        );
    }

    trie
}

/// Find every index entry whose normalized token starts with the normalized
/// `prefix`, in index order.
///
/// This goes through a serialized and pruned prefix trie, so candidates
/// coming out of collapsed nodes are filtered again.
pub fn prefix_search<'a>(
    index: &'a Index,
    collation: &Collation,
    prefix: &str,
    prune_bound: usize,
) -> Result<Vec<&'a IndexEntry>, Error> {
    let mut trie = prefix_trie(index);
    trie.prune(prune_bound);

    let mut data = Vec::new();
    trie.write(&mut data)?;

    let prefix = collation.normalize(prefix);
    let reader = TrieReader::new(&data)?;

    let mut output = Vec::new();

    for d in reader.search(&prefix)? {
        let Some(Row::Token { index_entry, .. }) = usize::try_from(d.offset)
            .ok()
            .and_then(|row| index.rows.get(row))
        else {
            continue;
        };

        let Some(entry) = index.sorted_index_entries.get(*index_entry as usize) else {
            continue;
        };

        if entry.normalized_token().starts_with(&*prefix) {
            output.push(entry);
        }
    }

    output.sort_by_key(|e| e.start_row);
    Ok(output)
}
