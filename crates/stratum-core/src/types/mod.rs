//! Core data types shared across stratum.

mod state;
mod statement;

pub use state::*;
pub use statement::*;
