//! The public versioned entity store.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{StratumError, StratumResult};
use crate::execution::{build_executor, ExecutionMode, StatementExecutor};
use crate::time::{Clock, SystemClock, Timestamp};
use crate::traits::GraphDatabase;
use crate::types::{QueryResult, StateSnapshot};
use crate::versioning::StatementBuilder;

/// Versioned entity store over a graph database.
///
/// Entities are identified by `(label, id)`. Every mutation goes through
/// the executor selected at construction; reads are always a single
/// statement outside any write transaction.
pub struct VersionedEntityStore {
    db: Arc<dyn GraphDatabase>,
    executor: Arc<dyn StatementExecutor>,
    statements: StatementBuilder,
}

impl VersionedEntityStore {
    /// Create a store with the wall clock.
    pub fn new(db: Arc<dyn GraphDatabase>, execution: ExecutionMode) -> Self {
        Self::with_clock(db, execution, Arc::new(SystemClock))
    }

    /// Create a store with an injected clock (for tests).
    pub fn with_clock(
        db: Arc<dyn GraphDatabase>,
        execution: ExecutionMode,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let executor = build_executor(execution, db.clone());
        Self {
            db,
            executor,
            statements: StatementBuilder::new(clock),
        }
    }

    /// Create an entity with its first state snapshot and an open validity
    /// relationship (`from = now`, `to = infinity`).
    pub async fn insert_with_state(
        &self,
        id: &str,
        label: &str,
        state: StateSnapshot,
    ) -> StratumResult<QueryResult> {
        require(id, "id")?;
        require(label, "label")?;
        debug!(%id, %label, "inserting entity with initial state");

        let statements = self.statements.insert(id, label, &state)?;
        self.executor.execute(statements).await
    }

    /// Close the entity's open relationship at `now` and create a
    /// successor pointing at the previous state with `state` shallow-merged
    /// over it.
    ///
    /// An entity without an open relationship is not detected here; the
    /// store matches nothing and the result is empty.
    pub async fn update_state(
        &self,
        id: &str,
        label: &str,
        state: StateSnapshot,
    ) -> StratumResult<QueryResult> {
        require(id, "id")?;
        require(label, "label")?;
        debug!(%id, %label, "updating entity state");

        let statements = self.statements.update(id, label, &state)?;
        self.executor.execute(statements).await
    }

    /// Read the current state, i.e. the snapshot reachable via the open
    /// relationship. `None` if the entity is unknown or soft-deleted.
    pub async fn get_state(&self, id: &str, label: &str) -> StratumResult<Option<StateSnapshot>> {
        require(id, "id")?;
        require(label, "label")?;

        let statement = self.statements.current_state(id, label)?;
        let result = self.db.execute_statement(&statement).await?;
        Ok(state_column(&result))
    }

    /// Read the state that was valid at `timestamp` (`from` inclusive,
    /// `to` exclusive). `None` if no interval contains the instant.
    pub async fn get_state_at(
        &self,
        id: &str,
        label: &str,
        timestamp: Timestamp,
    ) -> StratumResult<Option<StateSnapshot>> {
        require(id, "id")?;
        require(label, "label")?;

        let statement = self.statements.state_at(id, label, timestamp)?;
        let result = self.db.execute_statement(&statement).await?;
        Ok(state_column(&result))
    }

    /// Soft-delete: close the open relationship without a successor. Full
    /// history stays readable through [`Self::get_state_at`].
    pub async fn delete(&self, id: &str, label: &str) -> StratumResult<QueryResult> {
        require(id, "id")?;
        require(label, "label")?;
        debug!(%id, %label, "soft-deleting entity");

        let statements = self.statements.close_current(id, label)?;
        self.executor.execute(statements).await
    }
}

fn require(value: &str, field: &'static str) -> StratumResult<()> {
    if value.is_empty() {
        return Err(StratumError::missing_argument(field));
    }
    Ok(())
}

fn state_column(result: &QueryResult) -> Option<StateSnapshot> {
    result
        .first_column("state")
        .and_then(Value::as_object)
        .cloned()
}
