//! stratum-core - Core library for stratum.
//!
//! Bitemporal entity versioning on top of a graph database: entities carry
//! a chain of immutable state snapshots, each valid over a half-open
//! `[from, to)` interval, so the state as of any past instant can be read
//! back without destructive updates.
//!
//! # Example
//!
//! ```ignore
//! use stratum_core::{ExecutionMode, VersionedEntityStore};
//!
//! let store = VersionedEntityStore::new(db, ExecutionMode::Transactional);
//!
//! store.insert_with_state("leia", "Person", state).await?;
//! store.update_state("leia", "Person", changes).await?;
//!
//! // Back in time:
//! let old = store.get_state_at("leia", "Person", yesterday).await?;
//! ```

pub mod config;
pub mod error;
pub mod execution;
pub mod time;
pub mod traits;
pub mod types;
pub mod versioning;

// Re-export commonly used types
pub use config::StoreConfig;
pub use error::{ErrorCode, StratumError, StratumResult};
pub use execution::{
    build_executor, ExecutionMode, SequentialExecutor, StatementExecutor, TransactionalExecutor,
};
pub use time::{Clock, ManualClock, SystemClock, Timestamp, INFINITY};
pub use traits::{
    GraphDatabase, GraphDatabaseConfig, GraphDatabaseProvider, TransactionHandle,
};
pub use types::{merge_state, QueryResult, Row, StateSnapshot, Statement};
pub use versioning::{StatementBuilder, VersionedEntityStore};
