use fixed_map::Set;

use crate::index::{IndexEntry, Row, RowKind};

/// Translation of row positions when eliding kinds of rows.
///
/// Token markers are never elided.
pub(crate) struct RowMapping {
    /// For each old row, the number of surviving rows before it. One longer
    /// than the number of rows.
    before: Vec<u32>,
    survives: Vec<bool>,
}

impl RowMapping {
    pub(crate) fn new(rows: &[Row], elide: &Set<RowKind>) -> Self {
        let mut before = Vec::with_capacity(rows.len() + 1);
        let mut survives = Vec::with_capacity(rows.len());
        let mut count = 0u32;

        for row in rows {
            let keep = match row.kind() {
                RowKind::Token => true,
                kind => !elide.contains(kind),
            };

            before.push(count);
            survives.push(keep);
            count += u32::from(keep);
        }

        before.push(count);
        Self { before, survives }
    }

    /// Map an old row to its new position, or `None` if it was dropped.
    pub(crate) fn map(&self, row: u32) -> Option<u32> {
        let row = row as usize;

        if !*self.survives.get(row)? {
            return None;
        }

        Some(self.before[row])
    }

    /// Translate the row range of an index entry.
    pub(crate) fn translate(&self, entry: &IndexEntry) -> (u32, u32) {
        let start = entry.start_row as usize;
        let end = (start + entry.num_rows as usize).min(self.before.len() - 1);
        let start = start.min(end);
        (self.before[start], self.before[end] - self.before[start])
    }

    /// Number of surviving rows.
    pub(crate) fn len(&self) -> u32 {
        self.before.last().copied().unwrap_or_default()
    }
}
