//! Configuration for stratum stores.

use serde::{Deserialize, Serialize};

use crate::execution::ExecutionMode;
use crate::traits::GraphDatabaseConfig;

/// Top-level store configuration.
///
/// # Example
///
/// ```ignore
/// use stratum_core::{StoreConfig, VersionedEntityStore};
/// use stratum_graph_stores::GraphDatabaseFactory;
///
/// let config = StoreConfig::default();
/// let db = GraphDatabaseFactory::create(config.graph)?;
/// let store = VersionedEntityStore::new(db, config.execution);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Graph database connection settings.
    pub graph: GraphDatabaseConfig,
    /// How mutation statement sequences are applied.
    pub execution: ExecutionMode,
}
