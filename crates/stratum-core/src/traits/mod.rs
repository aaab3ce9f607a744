//! Collaborator traits consumed by stratum.

mod graph_database;

pub use graph_database::*;
