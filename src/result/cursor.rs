use std::iter::FusedIterator;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::vec;
use futures::Stream;
use crate::core::Tuple;
use super::{QueryResult, Row, RowMetadata};

/// Forward-only result of one statement.
///
/// Iterate it synchronously (`Iterator`) or from async code (`Stream`).
/// Once exhausted it keeps returning `None`. With `StreamExt` in scope,
/// `next()` is ambiguous; [`Cursor::next_row`] works in both contexts.
#[derive(Debug)]
pub struct Cursor {
    metadata: Arc<RowMetadata>,
    rows: vec::IntoIter<Tuple>,
    update_count: Option<u64>,
}

impl Cursor {
    pub fn row_metadata(&self) -> &RowMetadata {
        &self.metadata
    }

    /// `true` for SELECT and SHOW, `false` for statements that only report a count.
    pub fn is_row_set(&self) -> bool {
        self.update_count.is_none()
    }

    /// Affected rows for DML, `0` for DDL, `None` for queries.
    pub fn update_count(&self) -> Option<u64> {
        self.update_count
    }

    pub fn next_row(&mut self) -> Option<Row> {
        self.rows
            .next()
            .map(|values| Row::new(Arc::clone(&self.metadata), values))
    }

    /// Rows not consumed yet.
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl From<QueryResult> for Cursor {
    fn from(result: QueryResult) -> Self {
        Self {
            metadata: result.metadata,
            rows: result.rows.into_iter(),
            update_count: result.update_count,
        }
    }
}

impl Iterator for Cursor {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}

impl ExactSizeIterator for Cursor {}

impl FusedIterator for Cursor {}

impl Stream for Cursor {
    type Item = Row;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.get_mut().next_row())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.rows.size_hint()
    }
}
