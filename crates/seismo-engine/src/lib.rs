//! The insight engine: guarded analysis runs over a normalized event set,
//! candidate generation, reconciliation against live insights, and one
//! atomic commit per run.

pub mod candidates;
pub mod engine;
pub mod error;
pub mod reconcile;

pub use engine::{EngineStatus, InsightEngine, RunMode};
pub use error::{Error, Result};
