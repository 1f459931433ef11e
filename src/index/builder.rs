//! Production index build: aggregate postings per token, then sort tokens by
//! collation and lay out rows.

use std::collections::hash_map::{Entry, HashMap};

use crate::collation::Collation;
use crate::reporter::Reporter;
use crate::tokenizer::EntryTypeTag;
use crate::{report_info, report_warn};

use super::{EntryRef, Index, IndexEntry, Row};

/// Metadata describing an index to build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub short_name: String,
    pub long_name: String,
    pub locale: String,
    pub normalizer: String,
    pub swap_pair_entries: bool,
}

impl IndexSpec {
    /// Construct an index spec using the folding normalizer.
    pub fn new(short_name: &str, long_name: &str, locale: &str, swap_pair_entries: bool) -> Self {
        Self {
            short_name: short_name.to_owned(),
            long_name: long_name.to_owned(),
            locale: locale.to_owned(),
            normalizer: String::from("fold"),
            swap_pair_entries,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Posting {
    entry: EntryRef,
    tag: EntryTypeTag,
    token_count: u32,
}

#[derive(Default)]
struct TokenData {
    has_main_entry: bool,
    postings: Vec<Posting>,
    seen: HashMap<EntryRef, usize>,
}

/// Builds the index of a single language.
pub struct IndexBuilder {
    spec: IndexSpec,
    collation: Collation,
    max_token_chars: usize,
    tokens: HashMap<String, TokenData>,
    skipped: usize,
}

impl IndexBuilder {
    /// Construct a new builder. Tokens longer than `max_token_chars`
    /// characters are skipped.
    pub fn new(spec: IndexSpec, collation: Collation, max_token_chars: usize) -> Self {
        Self {
            spec,
            collation,
            max_token_chars,
            tokens: HashMap::new(),
            skipped: 0,
        }
    }

    /// Access the spec of the index being built.
    pub fn spec(&self) -> &IndexSpec {
        &self.spec
    }

    /// File `entry` under `token`.
    ///
    /// `token_count` is the number of tokens in the text the entry was
    /// tokenized from, entries with fewer tokens sort first. An entry is only
    /// filed once per token, keeping the lowest `(token_count, tag)` it was
    /// added with. Returns `false` if the token was skipped.
    pub fn add(
        &mut self,
        token: &str,
        entry: EntryRef,
        tag: EntryTypeTag,
        token_count: u32,
    ) -> bool {
        if token.is_empty() || token.chars().count() > self.max_token_chars {
            self.skipped += 1;
            return false;
        }

        let data = self.tokens.entry(token.to_owned()).or_default();

        data.has_main_entry |= tag.is_main();

        match data.seen.entry(entry) {
            Entry::Occupied(e) => {
                let posting = &mut data.postings[*e.get()];

                if (token_count, tag) < (posting.token_count, posting.tag) {
                    posting.token_count = token_count;
                    posting.tag = tag;
                }
            }
            Entry::Vacant(e) => {
                e.insert(data.postings.len());

                data.postings.push(Posting {
                    entry,
                    tag,
                    token_count,
                });
            }
        }

        true
    }

    /// Build the index.
    ///
    /// Entries under one token are ordered by token count and then by tag.
    /// The sort is stable, so entries which are still equal keep the order in
    /// which they were added.
    pub fn build(self, reporter: &dyn Reporter) -> Index {
        let IndexBuilder {
            spec,
            collation,
            tokens,
            skipped,
            ..
        } = self;

        if skipped > 0 {
            report_warn!(
                reporter,
                "{}: Skipped {skipped} overlong or empty token(s)",
                spec.short_name
            );
        }

        let mut tokens = tokens.into_iter().collect::<Vec<_>>();
        tokens.sort_by(|(a, _), (b, _)| collation.token_order(a, b));

        let mut rows = Vec::new();
        let mut sorted_index_entries = Vec::with_capacity(tokens.len());
        let mut main_token_count = 0;

        for (n, (token, mut data)) in tokens.into_iter().enumerate() {
            let html_refs = data
                .postings
                .iter()
                .filter_map(|p| match (p.entry, p.tag) {
                    (EntryRef::Html(index), EntryTypeTag::Headword) => Some(index),
                    _ => None,
                })
                .collect::<Vec<_>>();

            data.postings.sort_by_key(|p| (p.token_count, p.tag));

            let start_row = rows.len() as u32;

            rows.push(Row::Token {
                index_entry: n as u32,
                has_main_entry: data.has_main_entry,
            });

            rows.extend(data.postings.iter().map(|p| p.entry.row()));

            if data.has_main_entry {
                main_token_count += 1;
            }

            let normalized = {
                let normalized = collation.normalize(&token);

                if normalized == token.as_str() {
                    None
                } else {
                    Some(normalized.into_owned())
                }
            };

            sorted_index_entries.push(IndexEntry {
                token,
                normalized,
                start_row,
                num_rows: rows.len() as u32 - start_row,
                html_refs,
            });
        }

        report_info!(
            reporter,
            "{}: Built {} token(s) ({main_token_count} main) over {} row(s)",
            spec.short_name,
            sorted_index_entries.len(),
            rows.len()
        );

        Index {
            short_name: spec.short_name,
            long_name: spec.long_name,
            locale: spec.locale,
            normalizer: spec.normalizer,
            swap_pair_entries: spec.swap_pair_entries,
            main_token_count,
            rows,
            sorted_index_entries,
        }
    }
}
