//! Handler results and single-record projection.

use crate::error::{QueryError, QueryResult};

/// What a [`Handler`](crate::Handler) produced: one record or a sequence of them.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    /// Exactly one record.
    One(T),
    /// Zero or more records.
    Many(Vec<T>),
}

impl<T> Fetched<T> {
    /// Number of records held.
    pub fn len(&self) -> usize {
        match self {
            Fetched::One(_) => 1,
            Fetched::Many(records) => records.len(),
        }
    }

    /// Whether no records are held.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Take the single record, or the first of a sequence.
    ///
    /// An empty sequence is [`QueryError::NotFound`].
    pub fn first(self) -> QueryResult<T> {
        match self {
            Fetched::One(record) => Ok(record),
            Fetched::Many(records) => records
                .into_iter()
                .next()
                .ok_or_else(|| QueryError::not_found("Expected one record, got none")),
        }
    }

    /// All records as a list.
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Fetched::One(record) => vec![record],
            Fetched::Many(records) => records,
        }
    }
}

impl<T> From<Vec<T>> for Fetched<T> {
    fn from(records: Vec<T>) -> Self {
        Fetched::Many(records)
    }
}

/// Write the first record of `fetched` into `dest`.
///
/// `dest` is left untouched when nothing was fetched.
pub fn project_one<T>(dest: &mut T, fetched: Fetched<T>) -> QueryResult<()> {
    *dest = fetched.first()?;
    Ok(())
}
