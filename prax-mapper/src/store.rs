//! Query execution.
//!
//! [`QueryExecutor`] is the storage seam; [`InMemoryStore`] evaluates queries
//! against tables held in memory and records every statement in a
//! [`QueryLog`].

use futures::future::BoxFuture;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use smol_str::SmolStr;
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use crate::error::{MapperError, MapperResult};
use crate::metadata::DISCRIMINATOR_COLUMN;
use crate::query::{Condition, PairQuery, SelectQuery};
use crate::query_log::QueryLog;
use crate::value::Value;

/// A table row keyed by column name.
pub type Row = IndexMap<SmolStr, Value>;

/// One row of a [`SelectQuery`] result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    /// Columns of the root alias.
    pub row: Row,
    /// Columns of each fetch join by alias; `None` when the join matched nothing.
    pub joined: IndexMap<SmolStr, Option<Row>>,
}

impl ResultRow {
    /// Create a result row without joined data.
    pub fn new(row: Row) -> Self {
        Self {
            row,
            joined: IndexMap::new(),
        }
    }

    /// Columns of a joined alias, if the join matched.
    pub fn joined(&self, alias: &str) -> Option<&Row> {
        self.joined.get(alias).and_then(Option::as_ref)
    }

    /// Check if a join with this alias was part of the query.
    pub fn has_join(&self, alias: &str) -> bool {
        self.joined.contains_key(alias)
    }
}

/// Executes queries against a storage backend.
pub trait QueryExecutor: Send + Sync {
    /// Execute a select query.
    fn select<'a>(&'a self, query: &'a SelectQuery) -> BoxFuture<'a, MapperResult<Vec<ResultRow>>>;

    /// Execute a junction pair projection, returning `(source_id, target_id)`.
    fn select_pairs<'a>(
        &'a self,
        query: &'a PairQuery,
    ) -> BoxFuture<'a, MapperResult<Vec<(Value, Value)>>>;
}

/// Storage backend holding tables in memory.
///
/// Tables are created on first insert. Junction tables are ordinary tables.
///
/// ```rust
/// use prax_mapper::store::InMemoryStore;
/// use prax_mapper::value::Value;
///
/// let store = InMemoryStore::new();
/// store.insert("category", [("id", Value::Int(1)), ("name", Value::from("Rust"))]);
/// assert_eq!(store.row_count("category"), 1);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<IndexMap<SmolStr, Vec<Row>>>,
    log: Arc<QueryLog>,
    fail_after: Mutex<Option<usize>>,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a row.
    pub fn insert<I, K, V>(&self, table: &str, columns: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<SmolStr>,
        V: Into<Value>,
    {
        let row: Row = columns
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.tables
            .write()
            .entry(SmolStr::new(table))
            .or_default()
            .push(row);
    }

    /// Create a table without rows.
    pub fn create_table(&self, table: &str) {
        self.tables.write().entry(SmolStr::new(table)).or_default();
    }

    /// Number of rows in a table.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, Vec::len)
    }

    /// The query log.
    pub fn log(&self) -> &Arc<QueryLog> {
        &self.log
    }

    /// Let `successful` more queries succeed, then fail every query after.
    pub fn fail_after(&self, successful: usize) {
        *self.fail_after.lock() = Some(successful);
    }

    /// Stop injecting failures.
    pub fn reset_failures(&self) {
        *self.fail_after.lock() = None;
    }

    fn check_failure(&self, sql: &str) -> MapperResult<()> {
        let mut remaining = self.fail_after.lock();
        match remaining.as_mut() {
            Some(0) => Err(MapperError::connection("storage unavailable").with_sql(sql)),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn run_select(&self, query: &SelectQuery) -> MapperResult<Vec<ResultRow>> {
        let sql = query.to_sql();
        debug!(sql = %sql, "Executing select");
        self.log.record(sql.clone(), query.params());
        self.check_failure(&sql)?;

        let tables = self.tables.read();
        let rows = table(&tables, &query.table, &sql)?;

        let linked: Option<Vec<&Value>> = match &query.junction {
            Some(filter) => {
                let junction = table(&tables, &filter.junction.table, &sql)?;
                Some(
                    junction
                        .iter()
                        .filter(|r| r.get(&filter.junction.source_column) == Some(&filter.source_id))
                        .filter_map(|r| r.get(&filter.junction.target_column))
                        .collect(),
                )
            }
            None => None,
        };

        let mut out = Vec::new();
        for row in rows {
            if !matches_discriminator(row, &query.discriminator) {
                continue;
            }
            if let (Some(linked), Some(filter)) = (&linked, &query.junction) {
                match row.get(&filter.target_identifier) {
                    Some(id) if linked.contains(&id) => {}
                    _ => continue,
                }
            }
            if !query.conditions.iter().all(|c| matches_condition(row, c)) {
                continue;
            }

            let mut result = ResultRow::new(row.clone());
            for join in &query.joins {
                let parent = if join.parent_alias == query.alias {
                    Some(&result.row)
                } else {
                    result.joined(&join.parent_alias)
                };
                let key = parent
                    .and_then(|p| p.get(&join.parent_column))
                    .filter(|v| !v.is_null())
                    .cloned();
                let matched = match key {
                    Some(key) => table(&tables, &join.table, &sql)?
                        .iter()
                        .find(|r| {
                            r.get(&join.target_column) == Some(&key)
                                && matches_discriminator(r, &join.discriminator)
                        })
                        .cloned(),
                    None => None,
                };
                result.joined.insert(join.alias.clone(), matched);
            }
            out.push(result);
        }

        if !query.order_by.is_empty() {
            out.sort_by(|a, b| {
                for field in &query.order_by {
                    let ord = compare_values(a.row.get(&*field.column), b.row.get(&*field.column));
                    let ord = match field.order {
                        crate::types::SortOrder::Asc => ord,
                        crate::types::SortOrder::Desc => ord.reverse(),
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        Ok(out)
    }

    fn run_select_pairs(&self, query: &PairQuery) -> MapperResult<Vec<(Value, Value)>> {
        let sql = query.to_sql();
        debug!(sql = %sql, "Executing pair projection");
        self.log.record(sql.clone(), query.params());
        self.check_failure(&sql)?;

        let tables = self.tables.read();
        let sources = table(&tables, &query.source_table, &sql)?;
        let targets = table(&tables, &query.target_table, &sql)?;
        let junction = table(&tables, &query.junction.table, &sql)?;

        let mut pairs = Vec::new();
        for link in junction {
            let (Some(source_id), Some(target_id)) = (
                link.get(&query.junction.source_column),
                link.get(&query.junction.target_column),
            ) else {
                continue;
            };
            if !query.source_ids.contains(source_id) {
                continue;
            }
            let source_exists = sources
                .iter()
                .any(|r| r.get(&query.source_identifier) == Some(source_id));
            let target_exists = targets.iter().any(|r| {
                r.get(&query.target_identifier) == Some(target_id)
                    && matches_discriminator(r, &query.target_discriminator)
            });
            if source_exists && target_exists {
                pairs.push((source_id.clone(), target_id.clone()));
            }
        }
        Ok(pairs)
    }
}

impl QueryExecutor for InMemoryStore {
    fn select<'a>(&'a self, query: &'a SelectQuery) -> BoxFuture<'a, MapperResult<Vec<ResultRow>>> {
        Box::pin(async move { self.run_select(query) })
    }

    fn select_pairs<'a>(
        &'a self,
        query: &'a PairQuery,
    ) -> BoxFuture<'a, MapperResult<Vec<(Value, Value)>>> {
        Box::pin(async move { self.run_select_pairs(query) })
    }
}

fn table<'t>(
    tables: &'t IndexMap<SmolStr, Vec<Row>>,
    name: &str,
    sql: &str,
) -> MapperResult<&'t [Row]> {
    tables
        .get(name)
        .map(Vec::as_slice)
        .ok_or_else(|| MapperError::query_failed(format!("no such table: {}", name), sql))
}

fn matches_discriminator(row: &Row, accepted: &[SmolStr]) -> bool {
    if accepted.is_empty() {
        return true;
    }
    match row.get(DISCRIMINATOR_COLUMN) {
        Some(Value::Text(dtype)) => accepted.iter().any(|a| a == dtype),
        _ => false,
    }
}

fn matches_condition(row: &Row, condition: &Condition) -> bool {
    match condition {
        Condition::In { column, values, .. } => match row.get(column) {
            Some(value) if !value.is_null() => values.contains(value),
            _ => false,
        },
        Condition::Eq { column, value } => match row.get(column) {
            Some(v) if !v.is_null() => v == value,
            _ => false,
        },
        Condition::IsNull { column } => row.get(column).is_none_or(Value::is_null),
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Int(a)), Some(Value::Int(b))) => a.cmp(b),
        (Some(Value::Float(a)), Some(Value::Float(b))) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
        (Some(Value::Text(a)), Some(Value::Text(b))) => a.cmp(b),
        (Some(Value::Bytes(a)), Some(Value::Bytes(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{FetchJoin, SelectQuery};
    use crate::types::OrderByField;
    use crate::value::ArrayParameterType;

    fn store() -> InMemoryStore {
        let store = InMemoryStore::new();
        for id in 1..=3 {
            store.insert("category", [("id", Value::Int(id)), ("name", Value::from(format!("c{}", id)))]);
        }
        store.insert("article", [("id", Value::Int(1)), ("category_id", Value::Int(1))]);
        store.insert("article", [("id", Value::Int(2)), ("category_id", Value::Int(1))]);
        store.insert("article", [("id", Value::Int(3)), ("category_id", Value::Null)]);
        store
    }

    #[tokio::test]
    async fn test_select_in_with_order() {
        let store = store();
        let query = SelectQuery::new("Article", "article", "e")
            .where_in("category_id", vec![Value::Int(1), Value::Int(2)], ArrayParameterType::Integer)
            .order_by(OrderByField::desc("id"));

        let rows = store.select(&query).await.unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.row["id"].clone()).collect();
        assert_eq!(ids, vec![Value::Int(2), Value::Int(1)]);
        assert_eq!(store.log().len(), 1);
    }

    #[tokio::test]
    async fn test_left_join_null_key() {
        let store = store();
        let mut query = SelectQuery::new("Article", "article", "e").where_eq("id", 3);
        query.left_join(FetchJoin {
            parent_alias: "e".into(),
            field: "category".into(),
            alias: "e_category".into(),
            target: "Category".into(),
            table: "category".into(),
            parent_column: "category_id".into(),
            target_column: "id".into(),
            discriminator: Vec::new(),
        });

        let rows = store.select(&query).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert!(rows[0].has_join("e_category"));
        assert!(rows[0].joined("e_category").is_none());
    }

    #[tokio::test]
    async fn test_fail_after() {
        let store = store();
        store.fail_after(1);
        let query = SelectQuery::new("Category", "category", "t0");

        assert!(store.select(&query).await.is_ok());
        let err = store.select(&query).await.unwrap_err();
        assert!(err.is_connection_error());
        assert_eq!(err.context.sql.as_deref(), Some("SELECT * FROM category t0"));

        store.reset_failures();
        assert!(store.select(&query).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_table() {
        let store = InMemoryStore::new();
        let query = SelectQuery::new("Tag", "tag", "t0");
        let err = store.select(&query).await.unwrap_err();
        assert_eq!(err.code, crate::error::ErrorCode::QueryFailed);
    }
}
