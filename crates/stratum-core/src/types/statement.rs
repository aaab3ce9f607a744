//! Parameterized mutation/query statements.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One opaque parameterized statement for the graph store.
///
/// Serializes to the `{"statement": ..., "parameters": ...}` shape the
/// Neo4j transactional endpoint expects. Parameter values are never
/// interpolated into `text`; the entity label is the single exception and
/// is validated by the statement builder before it is embedded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// Statement text with `$name` parameter placeholders.
    #[serde(rename = "statement")]
    pub text: String,
    /// Parameter values by name.
    pub parameters: Map<String, Value>,
}

impl Statement {
    /// Create a statement from text and a parameter list.
    pub fn new(text: impl Into<String>, parameters: Vec<(&str, Value)>) -> Self {
        Self {
            text: text.into(),
            parameters: parameters
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }
}
