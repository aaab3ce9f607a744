//! Factory for creating graph database backends.

use std::sync::Arc;

use stratum_core::error::{StratumError, StratumResult};
use stratum_core::traits::{GraphDatabase, GraphDatabaseConfig, GraphDatabaseProvider};

/// Factory for creating graph database backends.
pub struct GraphDatabaseFactory;

impl GraphDatabaseFactory {
    /// Create a backend from the given configuration.
    pub fn create(config: GraphDatabaseConfig) -> StratumResult<Arc<dyn GraphDatabase>> {
        match config.provider {
            #[cfg(feature = "http")]
            GraphDatabaseProvider::Neo4jHttp => {
                Ok(Arc::new(crate::http::HttpGraphDatabase::new(config)))
            }

            #[cfg(feature = "memory")]
            GraphDatabaseProvider::Memory => Ok(Arc::new(crate::memory::InMemoryGraphDatabase::new())),

            #[allow(unreachable_patterns)]
            other => Err(StratumError::UnsupportedProvider {
                provider: format!("{:?}", other),
            }),
        }
    }
}
