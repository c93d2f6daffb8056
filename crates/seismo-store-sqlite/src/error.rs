//! Error type for `seismo-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] seismo_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored enum discriminant that no longer parses.
  #[error("decode error: {0}")]
  Decode(String),
}

impl Error {
  /// The domain error underneath, if this is one.
  pub fn core(&self) -> Option<&seismo_core::Error> {
    match self {
      Self::Core(e) => Some(e),
      _ => None,
    }
  }

  /// Version or schedule races; the caller may re-read and retry.
  pub fn is_conflict(&self) -> bool {
    matches!(
      self.core(),
      Some(seismo_core::Error::VersionConflict { .. } | seismo_core::Error::ScheduleConflict)
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
