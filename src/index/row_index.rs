use std::cmp::Ordering;

use lru_cache::LruCache;
use parking_lot::Mutex;

use crate::collation::Collation;

use super::{Index, IndexEntry, Row};

/// The result of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lookup {
    /// Position in the sorted index entries.
    pub entry: usize,
    /// Row of the token marker.
    pub row: u32,
    /// If the normalized form of the found token equals the normalized query.
    pub exact: bool,
}

/// A queryable view over an [`Index`].
///
/// Which token governs a row is a derived relation, resolved through binary
/// search and kept in a bounded cache shared by all readers.
pub struct RowIndex<'a> {
    index: &'a Index,
    collation: Collation,
    cache: Mutex<LruCache<u32, u32>>,
}

impl<'a> RowIndex<'a> {
    /// Construct a new view with a token cache holding up to `cache` rows.
    pub fn new(index: &'a Index, collation: Collation, cache: usize) -> Self {
        Self {
            index,
            collation,
            cache: Mutex::new(LruCache::new(cache.max(1))),
        }
    }

    /// Access the collation in use.
    pub fn collation(&self) -> &Collation {
        &self.collation
    }

    /// Find the token closest to `token`.
    ///
    /// Tokens are compared by their normalized form, which converges on the
    /// first token whose normalized form is not less than the normalized
    /// query. Among the tokens the collator considers equal to the query, the
    /// first one with an identical normalized form is preferred. If the query
    /// is past every token, the last token is returned. Returns `None` only if
    /// the index is empty.
    pub fn lookup(&self, token: &str) -> Option<Lookup> {
        let entries = &self.index.sorted_index_entries;
        let last = entries.len().checked_sub(1)?;
        let query = self.collation.normalize(token);

        let at = entries.partition_point(|e| {
            self.collation.compare(e.normalized_token(), &query) == Ordering::Less
        });

        let exact = self
            .equal_group(at, &query)
            .find(|(_, e)| e.normalized_token() == query)
            .map(|(n, _)| n);

        let at = exact.unwrap_or(at.min(last));
        let entry = &entries[at];

        tracing::trace!(token, at, found = %entry.token);

        Some(Lookup {
            entry: at,
            row: entry.start_row,
            exact: exact.is_some(),
        })
    }

    /// Collect every row filed under tokens whose normalized form equals the
    /// normalized `token`, in index order.
    pub fn matches(&self, token: &str) -> Vec<(&'a IndexEntry, Row)> {
        let mut output = Vec::new();

        let Some(found) = self.lookup(token) else {
            return output;
        };

        if !found.exact {
            return output;
        }

        let query = self.collation.normalize(token);

        for (_, entry) in self
            .equal_group(found.entry, &query)
            .filter(|(_, e)| e.normalized_token() == query)
        {
            for row in self.index.entry_rows(entry) {
                output.push((entry, *row));
            }
        }

        output
    }

    /// Entries starting at `start` which the collator considers equal to the
    /// normalized `query`.
    fn equal_group<'q>(
        &'q self,
        start: usize,
        query: &'q str,
    ) -> impl Iterator<Item = (usize, &'a IndexEntry)> + 'q {
        let entries: &'a [IndexEntry] = &self.index.sorted_index_entries;

        entries
            .get(start..)
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(move |(n, e)| (start + n, e))
            .take_while(move |(_, e)| {
                self.collation.compare(e.normalized_token(), query) == Ordering::Equal
            })
    }

    /// Resolve the position of the index entry governing `row`.
    ///
    /// A cache miss is resolved through binary search if `allow_search` is
    /// set, otherwise `None` is returned and the caller is expected to warm
    /// the cache through [`RowIndex::rows`]. Rows out of bounds resolve to
    /// `None`.
    pub fn token_row(&self, row: u32, allow_search: bool) -> Option<u32> {
        if let Row::Token { index_entry, .. } = self.index.rows.get(row as usize)? {
            return Some(*index_entry);
        }

        if let Some(&mut entry) = self.cache.lock().get_mut(&row) {
            return Some(entry);
        }

        if !allow_search {
            return None;
        }

        let entries = &self.index.sorted_index_entries;
        let at = entries.partition_point(|e| e.start_row <= row);
        let entry = u32::try_from(at.checked_sub(1)?).ok()?;
        self.cache.lock().insert(row, entry);
        Some(entry)
    }

    /// Iterate over rows starting at `start`, yielding each row along with
    /// the position of its governing index entry.
    pub fn rows(&self, start: u32) -> Rows<'_, 'a> {
        let current = self.token_row(start, true);

        Rows {
            index: self,
            pos: start,
            current,
        }
    }
}

/// Sequential iterator over rows, see [`RowIndex::rows`].
pub struct Rows<'r, 'a> {
    index: &'r RowIndex<'a>,
    pos: u32,
    current: Option<u32>,
}

impl Iterator for Rows<'_, '_> {
    type Item = (u32, Row, u32);

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.pos;
        let row = *self.index.index.rows.get(pos as usize)?;

        let current = match row {
            Row::Token { index_entry, .. } => index_entry,
            _ => {
                let current = self.current?;
                self.index.cache.lock().insert(pos, current);
                current
            }
        };

        self.current = Some(current);
        self.pos += 1;
        Some((pos, row, current))
    }
}
