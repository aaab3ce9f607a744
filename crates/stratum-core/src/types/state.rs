//! State snapshots and query results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One immutable property-bag snapshot of an entity's data.
///
/// Keys are property names, values arbitrary JSON scalars or structures.
pub type StateSnapshot = Map<String, Value>;

/// One result row, keyed by the statement's return column names.
pub type Row = Map<String, Value>;

/// Rows returned by a single statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub rows: Vec<Row>,
}

impl QueryResult {
    /// Result with no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True if the statement matched nothing.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The named column of the first row, if any.
    pub fn first_column(&self, column: &str) -> Option<&Value> {
        self.rows.first().and_then(|row| row.get(column))
    }
}

/// Shallow-merge `overlay` into `base`: fields in `overlay` replace
/// same-named fields, everything else persists from `base`.
pub fn merge_state(base: &StateSnapshot, overlay: &StateSnapshot) -> StateSnapshot {
    let mut merged = base.clone();
    for (key, value) in overlay {
        merged.insert(key.clone(), value.clone());
    }
    merged
}
