//! In-memory graph database backend.
//!
//! Interprets the statement vocabulary the versioning statement builder
//! emits against plain maps, standing in for a remote graph engine in
//! tests and local development. Transactions buffer their statements and
//! apply them on commit; rollback discards the buffer.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use stratum_core::error::{StratumError, StratumResult};
use stratum_core::time::Timestamp;
use stratum_core::traits::{GraphDatabase, TransactionHandle};
use stratum_core::types::{merge_state, QueryResult, Row, StateSnapshot, Statement};

static LABEL_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(node:`([^`]+)`").expect("label pattern"));

/// One validity interval of an entity, exposed for inspection.
#[derive(Debug, Clone, PartialEq)]
pub struct StateInterval {
    /// Inclusive start, milliseconds since epoch.
    pub from: Timestamp,
    /// Exclusive end; the open-end sentinel while current.
    pub to: Timestamp,
    /// Snapshot valid over `[from, to)`.
    pub state: StateSnapshot,
}

type EntityKey = (String, String);

/// In-memory [`GraphDatabase`] for tests and local development.
///
/// Every call is recorded and the interval history of each entity can be
/// inspected, so invariants are checkable from the outside.
#[derive(Default)]
pub struct InMemoryGraphDatabase {
    entities: RwLock<HashMap<EntityKey, Vec<StateInterval>>>,
    pending: RwLock<HashMap<String, Vec<Statement>>>,
    next_tx: AtomicU64,
    calls: Mutex<Vec<String>>,
}

enum StatementKind {
    Insert,
    Update,
    ReadCurrent,
    ReadAt,
    Close,
}

impl InMemoryGraphDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// All calls made against this backend, in order.
    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// The interval history of one entity, oldest first.
    pub async fn history(&self, label: &str, id: &str) -> Vec<StateInterval> {
        self.entities
            .read()
            .await
            .get(&(label.to_string(), id.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    async fn apply(&self, statement: &Statement) -> StratumResult<QueryResult> {
        let key = entity_key(statement)?;
        debug!(label = %key.0, id = %key.1, "applying statement");

        match classify(statement)? {
            StatementKind::Insert => {
                let interval = StateInterval {
                    from: required_i64(statement, "valid_from")?,
                    to: required_i64(statement, "valid_to")?,
                    state: required_object(statement, "state")?,
                };
                self.entities
                    .write()
                    .await
                    .entry(key)
                    .or_default()
                    .push(interval);
                Ok(QueryResult::empty())
            }

            StatementKind::Update => {
                let open_end = required_i64(statement, "open_end")?;
                let closed_at = required_i64(statement, "valid_from")?;
                let overlay = required_object(statement, "state")?;

                let mut entities = self.entities.write().await;
                let Some(intervals) = entities.get_mut(&key) else {
                    return Ok(QueryResult::empty());
                };
                let Some(pos) = intervals.iter().position(|i| i.to == open_end) else {
                    return Ok(QueryResult::empty());
                };

                intervals[pos].to = closed_at;
                let seeded = merge_state(&intervals[pos].state, &overlay);
                intervals.push(StateInterval {
                    from: closed_at,
                    to: open_end,
                    state: seeded,
                });
                Ok(QueryResult::empty())
            }

            StatementKind::Close => {
                let open_end = required_i64(statement, "open_end")?;
                let closed_at = required_i64(statement, "closed_at")?;

                let mut entities = self.entities.write().await;
                if let Some(intervals) = entities.get_mut(&key) {
                    if let Some(current) = intervals.iter_mut().find(|i| i.to == open_end) {
                        current.to = closed_at;
                    }
                }
                Ok(QueryResult::empty())
            }

            StatementKind::ReadCurrent => {
                let open_end = required_i64(statement, "open_end")?;
                let entities = self.entities.read().await;
                Ok(state_rows(
                    entities.get(&key).map(Vec::as_slice),
                    |i| i.to == open_end,
                ))
            }

            StatementKind::ReadAt => {
                let at = required_i64(statement, "at")?;
                let entities = self.entities.read().await;
                Ok(state_rows(
                    entities.get(&key).map(Vec::as_slice),
                    |i| i.from <= at && i.to > at,
                ))
            }
        }
    }
}

#[async_trait]
impl GraphDatabase for InMemoryGraphDatabase {
    async fn begin_transaction(&self) -> StratumResult<TransactionHandle> {
        self.record("begin");
        let id = format!("memtx-{}", self.next_tx.fetch_add(1, Ordering::SeqCst));
        self.pending.write().await.insert(id.clone(), Vec::new());
        Ok(TransactionHandle::new(id))
    }

    async fn add_statements(
        &self,
        handle: &TransactionHandle,
        statements: &[Statement],
    ) -> StratumResult<Vec<QueryResult>> {
        self.record(format!("add:{}", statements.len()));
        let mut pending = self.pending.write().await;
        let buffer = pending
            .get_mut(&handle.id)
            .ok_or_else(|| unknown_transaction(handle))?;
        buffer.extend(statements.iter().cloned());
        Ok(vec![QueryResult::empty(); statements.len()])
    }

    async fn commit_transaction(&self, handle: &TransactionHandle) -> StratumResult<()> {
        self.record("commit");
        let buffered = self
            .pending
            .write()
            .await
            .remove(&handle.id)
            .ok_or_else(|| unknown_transaction(handle))?;
        for statement in &buffered {
            self.apply(statement).await?;
        }
        Ok(())
    }

    async fn rollback_transaction(&self, handle: &TransactionHandle) -> StratumResult<()> {
        self.record("rollback");
        self.pending
            .write()
            .await
            .remove(&handle.id)
            .ok_or_else(|| unknown_transaction(handle))?;
        Ok(())
    }

    async fn execute_statement(&self, statement: &Statement) -> StratumResult<QueryResult> {
        self.record("execute");
        self.apply(statement).await
    }
}

fn unknown_transaction(handle: &TransactionHandle) -> StratumError {
    StratumError::transaction(format!("unknown transaction: {}", handle.id))
}

fn classify(statement: &Statement) -> StratumResult<StatementKind> {
    let text = statement.text.as_str();
    if text.starts_with("CREATE (node:") {
        Ok(StatementKind::Insert)
    } else if text.contains("SET newState") {
        Ok(StatementKind::Update)
    } else if text.contains("RETURN state") {
        if statement.parameters.contains_key("at") {
            Ok(StatementKind::ReadAt)
        } else {
            Ok(StatementKind::ReadCurrent)
        }
    } else if text.contains("SET current.to = $closed_at") {
        Ok(StatementKind::Close)
    } else {
        Err(StratumError::graph_store(format!(
            "unsupported statement: {}",
            text
        )))
    }
}

fn entity_key(statement: &Statement) -> StratumResult<EntityKey> {
    let label = LABEL_IN_TEXT
        .captures(&statement.text)
        .and_then(|captures| captures.get(1))
        .ok_or_else(|| StratumError::parse("statement without an entity label"))?
        .as_str()
        .to_string();
    let id = required_str(statement, "id")?;
    Ok((label, id))
}

fn required_i64(statement: &Statement, name: &str) -> StratumResult<Timestamp> {
    statement
        .parameters
        .get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| missing_parameter(name))
}

fn required_str(statement: &Statement, name: &str) -> StratumResult<String> {
    statement
        .parameters
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| missing_parameter(name))
}

fn required_object(statement: &Statement, name: &str) -> StratumResult<StateSnapshot> {
    statement
        .parameters
        .get(name)
        .and_then(Value::as_object)
        .cloned()
        .ok_or_else(|| missing_parameter(name))
}

fn missing_parameter(name: &str) -> StratumError {
    StratumError::parse(format!("statement parameter '{}' missing or mistyped", name))
}

fn state_rows(
    intervals: Option<&[StateInterval]>,
    matches: impl Fn(&StateInterval) -> bool,
) -> QueryResult {
    let rows = intervals
        .map(|intervals| {
            intervals
                .iter()
                .filter(|interval| matches(interval))
                .map(|interval| {
                    let mut row = Row::new();
                    row.insert(
                        "state".to_string(),
                        Value::Object(interval.state.clone()),
                    );
                    row
                })
                .collect()
        })
        .unwrap_or_default();
    QueryResult { rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::json;
    use stratum_core::time::{ManualClock, INFINITY};
    use stratum_core::versioning::{StatementBuilder, VersionedEntityStore};
    use stratum_core::ExecutionMode;

    fn snapshot(value: Value) -> StateSnapshot {
        value.as_object().unwrap().clone()
    }

    fn store_over(
        db: Arc<InMemoryGraphDatabase>,
        clock: Arc<ManualClock>,
        mode: ExecutionMode,
    ) -> VersionedEntityStore {
        VersionedEntityStore::with_clock(db, mode, clock)
    }

    #[tokio::test]
    async fn test_insert_then_get_returns_inserted_state() {
        let db = Arc::new(InMemoryGraphDatabase::new());
        let clock = Arc::new(ManualClock::at(1_000));
        let store = store_over(db.clone(), clock, ExecutionMode::Transactional);

        let state = snapshot(json!({"name": "Leia", "rank": "Princess"}));
        store
            .insert_with_state("leia", "Person", state.clone())
            .await
            .unwrap();

        let current = store.get_state("leia", "Person").await.unwrap().unwrap();
        assert_eq!(current, state);
    }

    #[tokio::test]
    async fn test_update_merges_and_preserves_history() {
        let db = Arc::new(InMemoryGraphDatabase::new());
        let clock = Arc::new(ManualClock::at(1_000));
        let store = store_over(db.clone(), clock.clone(), ExecutionMode::Transactional);

        store
            .insert_with_state(
                "leia",
                "Person",
                snapshot(json!({"name": "Leia", "rank": "Princess"})),
            )
            .await
            .unwrap();

        clock.advance(1_000); // now 2_000
        store
            .update_state("leia", "Person", snapshot(json!({"rank": "General"})))
            .await
            .unwrap();

        // Latest: previous state with the update shallow-merged over it.
        let current = store.get_state("leia", "Person").await.unwrap().unwrap();
        assert_eq!(current, snapshot(json!({"name": "Leia", "rank": "General"})));

        // Before the update: the original snapshot, from is inclusive.
        for at in [1_000, 1_500, 1_999] {
            let old = store
                .get_state_at("leia", "Person", at)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(old["rank"], json!("Princess"), "at {at}");
        }

        // At the update instant the successor is already valid.
        let at_update = store
            .get_state_at("leia", "Person", 2_000)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(at_update["rank"], json!("General"));

        // Before the entity existed: nothing.
        assert!(store
            .get_state_at("leia", "Person", 999)
            .await
            .unwrap()
            .is_none());

        let history = db.history("Person", "leia").await;
        assert_eq!(history.len(), 2);
        assert_eq!((history[0].from, history[0].to), (1_000, 2_000));
        assert_eq!((history[1].from, history[1].to), (2_000, INFINITY));
    }

    #[tokio::test]
    async fn test_at_most_one_open_interval_after_many_updates() {
        let db = Arc::new(InMemoryGraphDatabase::new());
        let clock = Arc::new(ManualClock::at(1_000));
        let store = store_over(db.clone(), clock.clone(), ExecutionMode::Transactional);

        store
            .insert_with_state("leia", "Person", snapshot(json!({"revision": 0})))
            .await
            .unwrap();

        for revision in 1..=5 {
            clock.advance(100);
            store
                .update_state("leia", "Person", snapshot(json!({"revision": revision})))
                .await
                .unwrap();
        }

        let history = db.history("Person", "leia").await;
        assert_eq!(history.len(), 6);

        let open = history.iter().filter(|i| i.to == INFINITY).count();
        assert_eq!(open, 1);

        // Intervals are contiguous and non-overlapping.
        for pair in history.windows(2) {
            assert!(pair[0].from < pair[0].to);
            assert_eq!(pair[0].to, pair[1].from);
        }
    }

    #[tokio::test]
    async fn test_delete_closes_without_successor() {
        let db = Arc::new(InMemoryGraphDatabase::new());
        let clock = Arc::new(ManualClock::at(1_000));
        let store = store_over(db.clone(), clock.clone(), ExecutionMode::Transactional);

        store
            .insert_with_state("alderaan", "Planet", snapshot(json!({"status": "thriving"})))
            .await
            .unwrap();

        clock.advance(500);
        store.delete("alderaan", "Planet").await.unwrap();

        // No current state, but history stays readable.
        assert!(store.get_state("alderaan", "Planet").await.unwrap().is_none());
        let before = store
            .get_state_at("alderaan", "Planet", 1_200)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(before["status"], json!("thriving"));

        let history = db.history("Planet", "alderaan").await;
        assert_eq!(history.len(), 1);
        assert_eq!((history[0].from, history[0].to), (1_000, 1_500));
    }

    #[tokio::test]
    async fn test_update_after_delete_is_a_no_op() {
        let db = Arc::new(InMemoryGraphDatabase::new());
        let clock = Arc::new(ManualClock::at(1_000));
        let store = store_over(db.clone(), clock.clone(), ExecutionMode::Transactional);

        store
            .insert_with_state("alderaan", "Planet", snapshot(json!({"status": "thriving"})))
            .await
            .unwrap();
        clock.advance(500);
        store.delete("alderaan", "Planet").await.unwrap();

        clock.advance(500);
        let result = store
            .update_state("alderaan", "Planet", snapshot(json!({"status": "destroyed"})))
            .await
            .unwrap();
        assert!(result.is_empty());

        assert_eq!(db.history("Planet", "alderaan").await.len(), 1);
    }

    #[tokio::test]
    async fn test_sequential_mode_round_trip() {
        let db = Arc::new(InMemoryGraphDatabase::new());
        let clock = Arc::new(ManualClock::at(1_000));
        let store = store_over(db.clone(), clock.clone(), ExecutionMode::Sequential);

        store
            .insert_with_state("han", "Person", snapshot(json!({"ship": "Falcon"})))
            .await
            .unwrap();
        clock.advance(1);
        store
            .update_state("han", "Person", snapshot(json!({"rank": "General"})))
            .await
            .unwrap();

        let current = store.get_state("han", "Person").await.unwrap().unwrap();
        assert_eq!(
            current,
            snapshot(json!({"ship": "Falcon", "rank": "General"}))
        );

        // Sequential mode never touches the transaction primitives.
        assert!(db
            .recorded_calls()
            .iter()
            .all(|call| call == "execute"));
    }

    #[tokio::test]
    async fn test_rollback_discards_buffered_statements() {
        let db = InMemoryGraphDatabase::new();
        let builder = StatementBuilder::new(Arc::new(ManualClock::at(1_000)));

        let statements = builder
            .insert("leia", "Person", &snapshot(json!({"name": "Leia"})))
            .unwrap();

        let handle = db.begin_transaction().await.unwrap();
        db.add_statements(&handle, &statements).await.unwrap();
        db.rollback_transaction(&handle).await.unwrap();

        assert!(db.history("Person", "leia").await.is_empty());
        assert!(db.rollback_transaction(&handle).await.is_err());
    }

    #[tokio::test]
    async fn test_commit_applies_buffered_statements_in_order() {
        let db = InMemoryGraphDatabase::new();
        let clock = Arc::new(ManualClock::at(1_000));
        let builder = StatementBuilder::new(clock.clone());

        let mut statements = builder
            .insert("leia", "Person", &snapshot(json!({"rank": "Princess"})))
            .unwrap();
        clock.advance(500);
        statements.extend(
            builder
                .update("leia", "Person", &snapshot(json!({"rank": "General"})))
                .unwrap(),
        );

        let handle = db.begin_transaction().await.unwrap();
        db.add_statements(&handle, &statements).await.unwrap();

        // Nothing visible until commit.
        assert!(db.history("Person", "leia").await.is_empty());

        db.commit_transaction(&handle).await.unwrap();
        let history = db.history("Person", "leia").await;
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].state["rank"], json!("General"));
    }

    #[test]
    fn test_unknown_entity_reads_empty() {
        tokio_test::block_on(async {
            let db = Arc::new(InMemoryGraphDatabase::new());
            let clock = Arc::new(ManualClock::at(1_000));
            let store = store_over(db, clock, ExecutionMode::Transactional);

            assert!(store.get_state("ghost", "Person").await.unwrap().is_none());
            assert!(store
                .get_state_at("ghost", "Person", 500)
                .await
                .unwrap()
                .is_none());
        });
    }
}
