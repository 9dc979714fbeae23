use std::collections::VecDeque;
use std::sync::Arc;

use super::metadata::{ColumnMetadata, Columns};
use super::row::Row;

/// Rows returned by one statement execution.
///
/// Iteration consumes rows front to back and cannot be restarted. A result
/// set belongs to a single consumer; it is `Send` but not meant to be shared.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    applied: bool,
    rows: VecDeque<Row>,
    columns: Arc<Columns>,
    page_state: Option<String>,
}

impl ResultSet {
    pub(crate) fn new(
        applied: bool,
        rows: VecDeque<Row>,
        columns: Arc<Columns>,
        page_state: Option<String>,
    ) -> Self {
        Self {
            applied,
            rows,
            columns,
            page_state,
        }
    }

    /// Whether the remote call succeeded and produced usable data
    pub fn was_applied(&self) -> bool {
        self.applied
    }

    /// Next row, if any
    pub fn one(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    /// Drain every remaining row
    pub fn all(&mut self) -> Vec<Row> {
        self.rows.drain(..).collect()
    }

    pub fn is_exhausted(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows not yet consumed
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }

    pub fn columns(&self) -> &Columns {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.names()
    }

    pub fn column_metadata(&self, name: &str) -> Option<&ColumnMetadata> {
        self.columns.get(name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Cursor for the next page of a read, `None` on the last page
    pub fn page_state(&self) -> Option<&str> {
        self.page_state.as_deref()
    }
}

impl Iterator for ResultSet {
    type Item = Row;

    fn next(&mut self) -> Option<Row> {
        self.rows.pop_front()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.rows.len(), Some(self.rows.len()))
    }
}
