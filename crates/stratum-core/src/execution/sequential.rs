//! Ordered one-at-a-time execution without transaction support.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::StratumResult;
use crate::traits::GraphDatabase;
use crate::types::{QueryResult, Statement};

use super::StatementExecutor;

/// Applies statements one at a time, strictly in the given order.
///
/// The first failure aborts the remaining statements; statements already
/// applied are NOT rolled back. This is a weaker guarantee than
/// [`super::TransactionalExecutor`] and exists for backends without a
/// transaction primitive.
pub struct SequentialExecutor {
    db: Arc<dyn GraphDatabase>,
}

impl SequentialExecutor {
    pub fn new(db: Arc<dyn GraphDatabase>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StatementExecutor for SequentialExecutor {
    async fn execute(&self, statements: Vec<Statement>) -> StratumResult<QueryResult> {
        debug!(count = statements.len(), "executing statements serially");

        let mut last = QueryResult::empty();
        for statement in &statements {
            last = self.db.execute_statement(statement).await?;
        }
        Ok(last)
    }
}
