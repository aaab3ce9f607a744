//! Neo4j HTTP transactional endpoint backend.
//!
//! Maps the [`GraphDatabase`] contract onto the transactional HTTP API:
//! `POST /db/{db}/tx` opens a transaction, `POST /db/{db}/tx/{id}` runs a
//! statement batch inside it, `POST /db/{db}/tx/{id}/commit` commits and
//! `DELETE /db/{db}/tx/{id}` rolls back. Single statements go through the
//! auto-commit endpoint `POST /db/{db}/tx/commit`.
//!
//! The endpoint reports statement failures in an `errors` array alongside
//! HTTP 200, so every response body is checked, not just the status.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use stratum_core::error::{StratumError, StratumResult};
use stratum_core::traits::{GraphDatabase, GraphDatabaseConfig, TransactionHandle};
use stratum_core::types::{QueryResult, Row, Statement};

/// Graph database backend over the Neo4j HTTP transactional endpoint.
pub struct HttpGraphDatabase {
    client: Client,
    base_url: String,
    database: String,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
struct StatementsBody<'a> {
    statements: &'a [Statement],
}

#[derive(Debug, Deserialize)]
struct TxResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<ServerError>,
    #[serde(default)]
    commit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    columns: Vec<String>,
    data: Vec<RowData>,
}

#[derive(Debug, Deserialize)]
struct RowData {
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ServerError {
    code: String,
    message: String,
}

impl HttpGraphDatabase {
    /// Create a backend from the given configuration.
    pub fn new(config: GraphDatabaseConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.url.trim_end_matches('/').to_string(),
            database: config.database.unwrap_or_else(|| "neo4j".to_string()),
            username: config.username,
            password: config.password,
        }
    }

    fn tx_root(&self) -> String {
        format!("{}/db/{}/tx", self.base_url, self.database)
    }

    async fn send(
        &self,
        method: Method,
        url: String,
        statements: &[Statement],
    ) -> StratumResult<TxResponse> {
        debug!(%url, count = statements.len(), "sending statements");

        let mut request = self
            .client
            .request(method, url.as_str())
            .json(&StatementsBody { statements });
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request
            .send()
            .await
            .map_err(|e| StratumError::network(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StratumError::graph_store(format!(
                "HTTP {} from {}: {}",
                status, url, body
            )));
        }

        let parsed: TxResponse = response
            .json()
            .await
            .map_err(|e| StratumError::parse(format!("invalid response from {}: {}", url, e)))?;
        check_server_errors(parsed)
    }
}

#[async_trait]
impl GraphDatabase for HttpGraphDatabase {
    async fn begin_transaction(&self) -> StratumResult<TransactionHandle> {
        let response = self.send(Method::POST, self.tx_root(), &[]).await?;
        let commit_url = response
            .commit
            .ok_or_else(|| StratumError::parse("transaction response without commit URL"))?;
        let id = tx_id_from_commit_url(&commit_url).ok_or_else(|| {
            StratumError::parse(format!("malformed commit URL: {}", commit_url))
        })?;
        Ok(TransactionHandle::new(id))
    }

    async fn add_statements(
        &self,
        handle: &TransactionHandle,
        statements: &[Statement],
    ) -> StratumResult<Vec<QueryResult>> {
        let url = format!("{}/{}", self.tx_root(), handle.id);
        let response = self.send(Method::POST, url, statements).await?;

        let mut results: Vec<QueryResult> = response
            .results
            .into_iter()
            .map(into_query_result)
            .collect();
        if results.len() < statements.len() {
            results.resize(statements.len(), QueryResult::empty());
        }
        Ok(results)
    }

    async fn commit_transaction(&self, handle: &TransactionHandle) -> StratumResult<()> {
        let url = format!("{}/{}/commit", self.tx_root(), handle.id);
        self.send(Method::POST, url, &[]).await?;
        Ok(())
    }

    async fn rollback_transaction(&self, handle: &TransactionHandle) -> StratumResult<()> {
        let url = format!("{}/{}", self.tx_root(), handle.id);
        self.send(Method::DELETE, url, &[]).await?;
        Ok(())
    }

    async fn execute_statement(&self, statement: &Statement) -> StratumResult<QueryResult> {
        let url = format!("{}/commit", self.tx_root());
        let response = self
            .send(Method::POST, url, std::slice::from_ref(statement))
            .await?;
        Ok(response
            .results
            .into_iter()
            .next()
            .map(into_query_result)
            .unwrap_or_default())
    }
}

fn check_server_errors(response: TxResponse) -> StratumResult<TxResponse> {
    if let Some(err) = response.errors.first() {
        return Err(StratumError::graph_store(format!(
            "{}: {}",
            err.code, err.message
        )));
    }
    Ok(response)
}

/// Zip a statement result's columns with each row's values.
fn into_query_result(result: StatementResult) -> QueryResult {
    let StatementResult { columns, data } = result;
    let rows = data
        .into_iter()
        .map(|data| columns.iter().cloned().zip(data.row).collect::<Row>())
        .collect();
    QueryResult { rows }
}

/// The transaction id is the last path segment before `/commit`.
fn tx_id_from_commit_url(commit_url: &str) -> Option<String> {
    commit_url
        .trim_end_matches('/')
        .strip_suffix("/commit")?
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
