//! stratum-graph-stores - Graph database backends for stratum.
//!
//! This crate provides [`stratum_core::GraphDatabase`] implementations the
//! versioned entity store runs against.
//!
//! # Supported Backends
//!
//! - **Neo4j HTTP** (feature: `http`) - the HTTP transactional endpoint
//! - **Memory** (feature: `memory`) - in-memory backend for tests and
//!   local development

mod factory;

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "memory")]
mod memory;

pub use factory::GraphDatabaseFactory;

#[cfg(feature = "http")]
pub use http::HttpGraphDatabase;

#[cfg(feature = "memory")]
pub use memory::{InMemoryGraphDatabase, StateInterval};

// Re-export core types
pub use stratum_core::traits::{GraphDatabase, GraphDatabaseConfig, GraphDatabaseProvider};
