//! Statement construction for the versioning operations.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{json, Value};

use crate::error::{StratumError, StratumResult};
use crate::time::{Clock, Timestamp};
use crate::types::{StateSnapshot, Statement};

/// Labels are embedded into statement text (the one thing Cypher cannot
/// parameterize), so they are restricted to plain identifiers.
static LABEL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").expect("label pattern"));

/// Builds the ordered statement sequences that realize the versioning
/// invariants. Timestamps come from the injected [`Clock`].
pub struct StatementBuilder {
    clock: Arc<dyn Clock>,
}

impl StatementBuilder {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Entity node + first state node + open `STATE` relationship.
    pub fn insert(
        &self,
        id: &str,
        label: &str,
        state: &StateSnapshot,
    ) -> StratumResult<Vec<Statement>> {
        let label = checked_label(label)?;
        let text = format!(
            "CREATE (node:`{label}` {{id: $id}})\
             -[:STATE {{from: $valid_from, to: $valid_to}}]\
             ->(state:`{label}State` $state)"
        );

        Ok(vec![Statement::new(
            text,
            vec![
                ("id", json!(id)),
                ("valid_from", json!(self.clock.now())),
                ("valid_to", json!(self.clock.infinity())),
                ("state", Value::Object(state.clone())),
            ],
        )])
    }

    /// Close the open relationship and create its successor, seeded from
    /// the previous state with `state` shallow-merged over it.
    ///
    /// Emitted as one compound statement: matching on `to = $open_end`
    /// makes the close conditional on the relationship still being open at
    /// write time, and the close is ordered before the create.
    pub fn update(
        &self,
        id: &str,
        label: &str,
        state: &StateSnapshot,
    ) -> StratumResult<Vec<Statement>> {
        let label = checked_label(label)?;
        let text = format!(
            "MATCH (node:`{label}` {{id: $id}})\
             -[current:STATE {{to: $open_end}}]\
             ->(currentState:`{label}State`) \
             SET current.to = $valid_from \
             CREATE (node)-[:STATE {{from: $valid_from, to: $open_end}}]\
             ->(newState:`{label}State`) \
             SET newState = currentState \
             SET newState += $state"
        );

        Ok(vec![Statement::new(
            text,
            vec![
                ("id", json!(id)),
                ("open_end", json!(self.clock.infinity())),
                ("valid_from", json!(self.clock.now())),
                ("state", Value::Object(state.clone())),
            ],
        )])
    }

    /// Read the state reachable via the open relationship.
    pub fn current_state(&self, id: &str, label: &str) -> StratumResult<Statement> {
        let label = checked_label(label)?;
        let text = format!(
            "MATCH (node:`{label}` {{id: $id}})\
             -[:STATE {{to: $open_end}}]\
             ->(state:`{label}State`) \
             RETURN state"
        );

        Ok(Statement::new(
            text,
            vec![("id", json!(id)), ("open_end", json!(self.clock.infinity()))],
        ))
    }

    /// Read the state whose interval contains `at` (`from` inclusive,
    /// `to` exclusive).
    pub fn state_at(&self, id: &str, label: &str, at: Timestamp) -> StratumResult<Statement> {
        let label = checked_label(label)?;
        let text = format!(
            "MATCH (node:`{label}` {{id: $id}})-[rel:STATE]->(state:`{label}State`) \
             WHERE rel.from <= $at AND rel.to > $at \
             RETURN state"
        );

        Ok(Statement::new(
            text,
            vec![("id", json!(id)), ("at", json!(at))],
        ))
    }

    /// Close the open relationship without a successor (soft-delete).
    pub fn close_current(&self, id: &str, label: &str) -> StratumResult<Vec<Statement>> {
        let label = checked_label(label)?;
        let text = format!(
            "MATCH (node:`{label}` {{id: $id}})\
             -[current:STATE {{to: $open_end}}]\
             ->(:`{label}State`) \
             SET current.to = $closed_at"
        );

        Ok(vec![Statement::new(
            text,
            vec![
                ("id", json!(id)),
                ("open_end", json!(self.clock.infinity())),
                ("closed_at", json!(self.clock.now())),
            ],
        )])
    }
}

fn checked_label(label: &str) -> StratumResult<&str> {
    if LABEL_PATTERN.is_match(label) {
        Ok(label)
    } else {
        Err(StratumError::invalid_label(label))
    }
}
