//! In-memory store backend.
//!
//! Evaluates a [`Query`] against rows held in memory. Used by tests and by the
//! CLI's `--fixture` mode. Tables can be made to fail, respond slowly or cap
//! their response size to exercise degraded paths.

use super::{Row, Store};
use crate::error::StoreError;
use crate::query::{like_needle, Direction, Filter, Query};
use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    failures: RwLock<HashMap<String, StoreError>>,
    delay: RwLock<Option<Duration>>,
    max_rows: RwLock<Option<usize>>,
    calls: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a JSON object mapping table names to row arrays.
    pub fn from_json(content: &str) -> Result<Self, StoreError> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| StoreError::Fixture(e.to_string()))?;

        let Value::Object(tables) = value else {
            return Err(StoreError::Fixture(
                "expected an object of table name to rows".to_string(),
            ));
        };

        let store = Self::new();
        for (table, rows) in tables {
            let Value::Array(rows) = rows else {
                return Err(StoreError::Fixture(format!("table '{}' is not an array", table)));
            };
            store.insert(&table, rows);
        }

        Ok(store)
    }

    /// Load a fixture file from disk.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Fixture(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Append rows to a table. Non-object values are skipped.
    pub fn insert(&self, table: &str, rows: Vec<Value>) {
        let mut tables = self.tables.write().unwrap_or_else(|e| e.into_inner());
        let entry = tables.entry(table.to_string()).or_default();

        for row in rows {
            match row {
                Value::Object(map) => entry.push(map),
                other => warn!("Skipping non-object row in {}: {}", table, other),
            }
        }
    }

    /// Make every query against `table` fail with `error`.
    pub fn fail_table(&self, table: &str, error: StoreError) {
        self.failures
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(table.to_string(), error);
    }

    /// Delay every response by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.write().unwrap_or_else(|e| e.into_inner()) = delay;
    }

    /// Cap every response at `max_rows` rows, like a server-side row limit.
    pub fn set_max_rows(&self, max_rows: Option<usize>) {
        *self.max_rows.write().unwrap_or_else(|e| e.into_inner()) = max_rows;
    }

    /// Number of queries executed so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(AtomicOrdering::Relaxed)
    }

    fn evaluate(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        if let Some(err) = self
            .failures
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&query.table)
        {
            return Err(err.clone());
        }

        let tables = self.tables.read().unwrap_or_else(|e| e.into_inner());
        let Some(rows) = tables.get(&query.table) else {
            debug!("Table {} has no rows", query.table);
            return Ok(Vec::new());
        };

        let mut matched: Vec<&Row> = rows
            .iter()
            .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
            .collect();

        matched.sort_by(|a, b| {
            for order in &query.order {
                let ord = compare_nulls_last(a.get(&order.column), b.get(&order.column), order.direction);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });

        let offset = query.offset.unwrap_or(0);
        let cap = self
            .max_rows
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .unwrap_or(usize::MAX);
        let limit = query.limit.unwrap_or(usize::MAX).min(cap);

        Ok(matched
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| project(row, &query.columns))
            .collect())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn execute(&self, query: &Query) -> Result<Vec<Row>, StoreError> {
        self.calls.fetch_add(1, AtomicOrdering::Relaxed);

        let delay = *self.delay.read().unwrap_or_else(|e| e.into_inner());
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.evaluate(query)
    }

    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

fn project(row: &Row, columns: &[String]) -> Row {
    if columns.is_empty() {
        return row.clone();
    }
    columns
        .iter()
        .filter_map(|c| row.get(c).map(|v| (c.clone(), v.clone())))
        .collect()
}

fn field<'a>(row: &'a Row, column: &str) -> Option<&'a Value> {
    row.get(column).filter(|v| !v.is_null())
}

/// Compare two scalar JSON values of the same kind.
fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn compare_nulls_last(a: Option<&Value>, b: Option<&Value>, direction: Direction) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ord = compare_values(x, y).unwrap_or(Ordering::Equal);
            match direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            }
        }
    }
}

fn value_eq(a: &Value, b: &Value) -> bool {
    compare_values(a, b).map_or(a == b, |o| o == Ordering::Equal)
}

fn matches_filter(row: &Row, filter: &Filter) -> bool {
    let cmp = |col: &str, v: &Value| field(row, col).and_then(|x| compare_values(x, v));

    match filter {
        Filter::Eq(col, v) => field(row, col).is_some_and(|x| value_eq(x, v)),
        Filter::Neq(col, v) => field(row, col).is_some_and(|x| !value_eq(x, v)),
        Filter::Gt(col, v) => cmp(col, v) == Some(Ordering::Greater),
        Filter::Gte(col, v) => matches!(cmp(col, v), Some(Ordering::Greater | Ordering::Equal)),
        Filter::Lt(col, v) => cmp(col, v) == Some(Ordering::Less),
        Filter::Lte(col, v) => matches!(cmp(col, v), Some(Ordering::Less | Ordering::Equal)),
        Filter::In(col, values) => {
            field(row, col).is_some_and(|x| values.iter().any(|v| value_eq(x, v)))
        }
        Filter::IsNull(col) => field(row, col).is_none(),
        Filter::NotNull(col) => field(row, col).is_some(),
        Filter::Contains(col, needle) => match field(row, col) {
            Some(Value::String(s)) => s
                .to_lowercase()
                .contains(&like_needle(needle).to_lowercase()),
            _ => false,
        },
        Filter::Or(filters) => filters.iter().any(|f| matches_filter(row, f)),
    }
}
