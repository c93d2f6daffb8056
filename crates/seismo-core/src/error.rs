//! Error types for `seismo-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::insight::InsightStatus;

#[derive(Debug, Error)]
pub enum Error {
  #[error("insight not found: {0}")]
  InsightNotFound(Uuid),

  #[error("insight {id} is at version {actual}, expected {expected}")]
  VersionConflict { id: Uuid, expected: u32, actual: u32 },

  #[error("insight {0} is already invalidated")]
  AlreadyInvalidated(Uuid),

  #[error("invalid status transition: {from} -> {to}")]
  InvalidTransition { from: InsightStatus, to: InsightStatus },

  #[error("confidence {confidence:.2} is below the minimum threshold {threshold:.2}")]
  BelowThreshold { confidence: f64, threshold: f64 },

  #[error("invalid engine configuration: {0}")]
  InvalidConfig(String),

  #[error("run schedule was advanced by another run")]
  ScheduleConflict,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
