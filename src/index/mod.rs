//! Per-language indices.
//!
//! An index is a linear sequence of [`Row`]s where every token is marked by a
//! [`Row::Token`] followed by the rows of the entries filed under it. Tokens
//! are additionally listed in [`Index::sorted_index_entries`] in collation
//! order, each pointing at the row of its token marker.

pub mod builder;
pub mod row_index;

#[cfg(test)]
mod tests;

use fixed_map::Key;

use crate::collation::{Collation, Registry};
use crate::error::Error;

pub use self::builder::{IndexBuilder, IndexSpec};
pub use self::row_index::{Lookup, RowIndex};

/// The kind of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Key)]
pub enum RowKind {
    Token,
    Pair,
    Text,
    Html,
}

/// A reference into one of the entry lists of a dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntryRef {
    Pair(u32),
    Text(u32),
    Html(u32),
}

impl EntryRef {
    /// The row referencing this entry.
    pub fn row(self) -> Row {
        match self {
            EntryRef::Pair(index) => Row::Pair(index),
            EntryRef::Text(index) => Row::Text(index),
            EntryRef::Html(index) => Row::Html(index),
        }
    }
}

/// A single addressable row of an index.
///
/// Rows never own entry data, they only hold a stable integer handle into the
/// entry lists of the dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Row {
    /// Marks the start of a token.
    Token {
        /// Position of the token in the sorted index entries.
        index_entry: u32,
        /// If at least one entry is directly attached to the token, as opposed
        /// to the token only existing as an alternate form.
        has_main_entry: bool,
    },
    Pair(u32),
    Text(u32),
    Html(u32),
}

impl Row {
    /// Get the kind of the row.
    pub fn kind(&self) -> RowKind {
        match self {
            Row::Token { .. } => RowKind::Token,
            Row::Pair(..) => RowKind::Pair,
            Row::Text(..) => RowKind::Text,
            Row::Html(..) => RowKind::Html,
        }
    }

    /// Get the entry referenced by this row, if it's not a token marker.
    pub fn entry(&self) -> Option<EntryRef> {
        match *self {
            Row::Token { .. } => None,
            Row::Pair(index) => Some(EntryRef::Pair(index)),
            Row::Text(index) => Some(EntryRef::Text(index)),
            Row::Html(index) => Some(EntryRef::Html(index)),
        }
    }
}

/// A token in an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub token: String,
    /// Normalized token, if it differs from `token`.
    pub normalized: Option<String>,
    /// Row of the token marker.
    pub start_row: u32,
    /// Number of rows including the token marker.
    pub num_rows: u32,
    /// Html entries titled by this token.
    pub html_refs: Vec<u32>,
}

impl IndexEntry {
    /// The normalized form of the token.
    pub fn normalized_token(&self) -> &str {
        self.normalized.as_deref().unwrap_or(&self.token)
    }

    /// Range of rows filed under this token, excluding the marker.
    pub fn entry_rows(&self) -> std::ops::Range<usize> {
        let start = self.start_row as usize + 1;
        start..self.start_row as usize + self.num_rows as usize
    }
}

/// The index of one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    pub short_name: String,
    pub long_name: String,
    /// Collation locale id.
    pub locale: String,
    /// Normalizer ruleset id.
    pub normalizer: String,
    /// If the columns of pair entries are flipped for this index.
    pub swap_pair_entries: bool,
    /// Number of tokens with a directly attached entry.
    pub main_token_count: u32,
    pub rows: Vec<Row>,
    pub sorted_index_entries: Vec<IndexEntry>,
}

impl Index {
    /// Resolve the collation of this index.
    pub fn collation(&self, registry: &Registry) -> Result<Collation, Error> {
        registry.collation(&self.locale, &self.normalizer)
    }

    /// Open a queryable view of this index.
    pub fn row_index(&self, registry: &Registry, cache: usize) -> Result<RowIndex<'_>, Error> {
        Ok(RowIndex::new(self, self.collation(registry)?, cache))
    }

    /// The rows of entries filed under the given index entry.
    pub fn entry_rows(&self, entry: &IndexEntry) -> &[Row] {
        self.rows.get(entry.entry_rows()).unwrap_or_default()
    }
}
