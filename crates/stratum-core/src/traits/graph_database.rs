//! Graph database collaborator trait and related types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StratumResult;
use crate::types::{QueryResult, Statement};

/// Server-assigned handle for an open transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionHandle {
    /// Transaction identifier, e.g. the id segment of the transactional
    /// endpoint URL.
    pub id: String,
}

impl TransactionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Contract of the underlying graph store, as consumed by the execution
/// strategies. All calls are network round trips.
#[async_trait]
pub trait GraphDatabase: Send + Sync {
    /// Open a transaction and return its handle.
    async fn begin_transaction(&self) -> StratumResult<TransactionHandle>;

    /// Run a batch of statements inside an open transaction. Returns one
    /// result per statement, in statement order.
    async fn add_statements(
        &self,
        handle: &TransactionHandle,
        statements: &[Statement],
    ) -> StratumResult<Vec<QueryResult>>;

    /// Commit an open transaction.
    async fn commit_transaction(&self, handle: &TransactionHandle) -> StratumResult<()>;

    /// Roll back an open transaction. Best-effort; callers treat its own
    /// failure as secondary to whatever error triggered it.
    async fn rollback_transaction(&self, handle: &TransactionHandle) -> StratumResult<()>;

    /// Run a single statement outside any explicit transaction.
    async fn execute_statement(&self, statement: &Statement) -> StratumResult<QueryResult>;
}

/// Graph database connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphDatabaseConfig {
    /// Provider type.
    pub provider: GraphDatabaseProvider,
    /// Endpoint URL.
    pub url: String,
    /// Username for authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password for authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Database name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl Default for GraphDatabaseConfig {
    fn default() -> Self {
        Self {
            provider: GraphDatabaseProvider::Neo4jHttp,
            url: "http://localhost:7474".to_string(),
            username: None,
            password: None,
            database: None,
        }
    }
}

/// Graph database provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GraphDatabaseProvider {
    /// Neo4j over the HTTP transactional endpoint.
    #[default]
    Neo4jHttp,
    /// In-memory backend for tests and local development.
    Memory,
}
