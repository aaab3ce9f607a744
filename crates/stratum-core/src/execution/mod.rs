//! Execution strategies for statement sequences.
//!
//! Both strategies share one contract: given an ordered statement sequence,
//! return the last statement's result or the first failure. They differ in
//! their partial-failure guarantee, selected by [`ExecutionMode`] when the
//! store is constructed.

mod sequential;
mod transactional;

pub use sequential::SequentialExecutor;
pub use transactional::TransactionalExecutor;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StratumResult;
use crate::traits::GraphDatabase;
use crate::types::{QueryResult, Statement};

/// How a mutation's statement sequence is applied to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// All-or-nothing: one store transaction, rolled back on failure.
    #[default]
    Transactional,
    /// One statement at a time, strictly ordered. A failure aborts the
    /// remainder but statements already applied are NOT rolled back. For
    /// backends without transaction support.
    Sequential,
}

/// Runs an ordered statement sequence against the store.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Execute all statements in order. Resolves to the last statement's
    /// result, or the failure that aborted the sequence.
    async fn execute(&self, statements: Vec<Statement>) -> StratumResult<QueryResult>;
}

/// Build the executor for the given mode.
pub fn build_executor(
    mode: ExecutionMode,
    db: Arc<dyn GraphDatabase>,
) -> Arc<dyn StatementExecutor> {
    match mode {
        ExecutionMode::Transactional => Arc::new(TransactionalExecutor::new(db)),
        ExecutionMode::Sequential => Arc::new(SequentialExecutor::new(db)),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{statements, ScriptedGraph};
    use super::*;

    #[test]
    fn test_mode_selects_strategy() {
        tokio_test::block_on(async {
            let db = Arc::new(ScriptedGraph::default());

            let executor = build_executor(ExecutionMode::Transactional, db.clone());
            executor.execute(statements(&["A"])).await.unwrap();
            assert_eq!(db.recorded_calls(), vec!["begin", "add", "commit"]);

            db.calls.lock().unwrap().clear();

            let executor = build_executor(ExecutionMode::Sequential, db.clone());
            executor.execute(statements(&["A"])).await.unwrap();
            assert_eq!(db.recorded_calls(), vec!["execute:A"]);
        });
    }

    #[test]
    fn test_default_mode_is_transactional() {
        assert_eq!(ExecutionMode::default(), ExecutionMode::Transactional);
    }
}
