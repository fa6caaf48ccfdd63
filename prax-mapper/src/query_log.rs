//! Log of executed queries.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::value::Value;

/// One executed query.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedQuery {
    /// Rendered SQL.
    pub sql: String,
    /// Bound parameters.
    pub params: Vec<Value>,
}

/// Records every query an executor runs, in execution order.
#[derive(Debug, Default)]
pub struct QueryLog {
    entries: RwLock<Vec<LoggedQuery>>,
    total: AtomicU64,
}

impl QueryLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a query.
    pub fn record(&self, sql: impl Into<String>, params: Vec<Value>) {
        self.total.fetch_add(1, Ordering::SeqCst);
        self.entries.write().push(LoggedQuery {
            sql: sql.into(),
            params,
        });
    }

    /// All queries since the last [`clear`](Self::clear).
    pub fn entries(&self) -> Vec<LoggedQuery> {
        self.entries.read().clone()
    }

    /// SQL of all queries since the last clear.
    pub fn sql(&self) -> Vec<String> {
        self.entries.read().iter().map(|q| q.sql.clone()).collect()
    }

    /// Identical SQL texts collapsed to `(count, sql)`, in first-seen order.
    pub fn aggregated(&self) -> Vec<(usize, String)> {
        let entries = self.entries.read();
        let mut out: Vec<(usize, String)> = Vec::new();
        for query in entries.iter() {
            match out.iter_mut().find(|(_, sql)| *sql == query.sql) {
                Some((count, _)) => *count += 1,
                None => out.push((1, query.sql.clone())),
            }
        }
        out
    }

    /// Number of queries since the last clear.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if no query was recorded since the last clear.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Number of queries recorded over the lifetime of the log.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::SeqCst)
    }

    /// Forget recorded queries. The lifetime total is kept.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
