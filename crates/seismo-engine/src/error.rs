//! Error type for `seismo-engine`.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("analysis task failed: {0}")]
  Task(#[from] tokio::task::JoinError),

  #[error("cannot schedule the next run {hours} hours after {from}")]
  Unschedulable { from: DateTime<Utc>, hours: u32 },
}

impl Error {
  pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Store(Box::new(err))
  }

  /// The domain error behind a store failure, if there is one anywhere in
  /// its source chain.
  pub fn core(&self) -> Option<&seismo_core::Error> {
    let Self::Store(inner) = self else { return None };
    let first: &(dyn std::error::Error + 'static) = &**inner;
    let mut cur = Some(first);
    while let Some(err) = cur {
      if let Some(core) = err.downcast_ref::<seismo_core::Error>() {
        return Some(core);
      }
      cur = err.source();
    }
    None
  }

  /// Another writer moved an insight or the schedule underneath this run.
  pub fn is_conflict(&self) -> bool {
    matches!(
      self.core(),
      Some(seismo_core::Error::VersionConflict { .. } | seismo_core::Error::ScheduleConflict)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
