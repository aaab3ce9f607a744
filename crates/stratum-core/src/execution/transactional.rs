//! All-or-nothing execution through a store transaction.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::StratumResult;
use crate::traits::{GraphDatabase, TransactionHandle};
use crate::types::{QueryResult, Statement};

use super::StatementExecutor;

/// Applies a statement sequence as one store transaction.
///
/// Any failure after a successful begin triggers a best-effort rollback;
/// the rollback's own outcome never replaces the original error. A failed
/// begin propagates directly, since no transaction exists to roll back.
pub struct TransactionalExecutor {
    db: Arc<dyn GraphDatabase>,
}

impl TransactionalExecutor {
    pub fn new(db: Arc<dyn GraphDatabase>) -> Self {
        Self { db }
    }

    async fn rollback_best_effort(&self, handle: &TransactionHandle) {
        if let Err(rollback_err) = self.db.rollback_transaction(handle).await {
            warn!(
                transaction = %handle.id,
                error = %rollback_err,
                "rollback after failed transaction did not complete"
            );
        }
    }
}

#[async_trait]
impl StatementExecutor for TransactionalExecutor {
    async fn execute(&self, statements: Vec<Statement>) -> StratumResult<QueryResult> {
        let handle = self.db.begin_transaction().await?;
        debug!(transaction = %handle.id, count = statements.len(), "executing statement batch");

        let results = match self.db.add_statements(&handle, &statements).await {
            Ok(results) => results,
            Err(err) => {
                self.rollback_best_effort(&handle).await;
                return Err(err);
            }
        };

        if let Err(err) = self.db.commit_transaction(&handle).await {
            self.rollback_best_effort(&handle).await;
            return Err(err);
        }

        Ok(results.into_iter().last().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{statements, ScriptedGraph};
    use super::*;

    #[tokio::test]
    async fn test_success_returns_last_statement_result() {
        let db = Arc::new(ScriptedGraph::default());
        let executor = TransactionalExecutor::new(db.clone());

        let result = executor.execute(statements(&["A", "B", "C"])).await.unwrap();

        assert_eq!(db.recorded_calls(), vec!["begin", "add", "commit"]);
        assert_eq!(result.first_column("tag"), Some(&serde_json::json!("C")));
    }

    #[tokio::test]
    async fn test_batch_failure_rolls_back_in_order() {
        let db = Arc::new(ScriptedGraph {
            fail_add: true,
            ..Default::default()
        });
        let executor = TransactionalExecutor::new(db.clone());

        let err = executor
            .execute(statements(&["A", "B", "C"]))
            .await
            .unwrap_err();

        assert_eq!(db.recorded_calls(), vec!["begin", "add", "rollback"]);
        assert!(err.to_string().contains("add failed"));
    }

    #[tokio::test]
    async fn test_commit_failure_rolls_back() {
        let db = Arc::new(ScriptedGraph {
            fail_commit: true,
            ..Default::default()
        });
        let executor = TransactionalExecutor::new(db.clone());

        let err = executor.execute(statements(&["A"])).await.unwrap_err();

        assert_eq!(db.recorded_calls(), vec!["begin", "add", "commit", "rollback"]);
        assert!(err.to_string().contains("commit failed"));
    }

    #[tokio::test]
    async fn test_begin_failure_skips_rollback() {
        let db = Arc::new(ScriptedGraph {
            fail_begin: true,
            ..Default::default()
        });
        let executor = TransactionalExecutor::new(db.clone());

        let err = executor.execute(statements(&["A"])).await.unwrap_err();

        assert_eq!(db.recorded_calls(), vec!["begin"]);
        assert!(err.to_string().contains("begin failed"));
    }

    #[tokio::test]
    async fn test_rollback_failure_keeps_original_error() {
        let db = Arc::new(ScriptedGraph {
            fail_add: true,
            fail_rollback: true,
            ..Default::default()
        });
        let executor = TransactionalExecutor::new(db.clone());

        let err = executor.execute(statements(&["A"])).await.unwrap_err();

        assert_eq!(db.recorded_calls(), vec!["begin", "add", "rollback"]);
        assert!(err.to_string().contains("add failed"));
    }
}
