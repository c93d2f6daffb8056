//! The `InsightStore` trait.
//!
//! Implemented by storage backends (e.g. `seismo-store-sqlite`). The engine
//! and the command-line front end depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  config::{ConfigUpdate, EngineConfig},
  insight::{Insight, InsightQuery, InsightStatistics, NewInsight},
  lifecycle::{InsightHistory, InsightRevision},
  run::{CommitSummary, RunCommit, RunTrigger},
};

/// Abstraction over an insight store backend.
///
/// Every status change appends an [`InsightHistory`] row in the same write.
/// Writes against an existing insight carry the version the caller last
/// observed and fail with [`crate::Error::VersionConflict`] if it has moved.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait InsightStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Engine configuration ──────────────────────────────────────────────

  /// Return the configuration singleton, creating it with defaults if it is
  /// missing.
  fn engine_config(&self) -> impl Future<Output = Result<EngineConfig, Self::Error>> + Send + '_;

  /// Validate and apply a partial configuration change.
  fn update_engine_config(
    &self,
    update: ConfigUpdate,
  ) -> impl Future<Output = Result<EngineConfig, Self::Error>> + Send + '_;

  // ── Insights: writes ─────────────────────────────────────────────────

  /// Persist a new insight (status active, version 1) with a `created`
  /// history row. Rejected if its confidence is below the configured
  /// threshold.
  fn create_insight(
    &self,
    input: NewInsight,
    reason: String,
  ) -> impl Future<Output = Result<Insight, Self::Error>> + Send + '_;

  /// Revise an insight in place.
  fn revise_insight(
    &self,
    id: Uuid,
    expected_version: u32,
    revision: InsightRevision,
    reason: String,
  ) -> impl Future<Output = Result<Insight, Self::Error>> + Send + '_;

  /// Retire an insight. Terminal.
  fn invalidate_insight(
    &self,
    id: Uuid,
    expected_version: u32,
    reason: String,
  ) -> impl Future<Output = Result<Insight, Self::Error>> + Send + '_;

  /// Retire `parent_id` with an `evolved` history row and create its
  /// successor pointing back at it. Returns the successor.
  fn evolve_insight(
    &self,
    parent_id: Uuid,
    expected_version: u32,
    successor: NewInsight,
    reason: String,
  ) -> impl Future<Output = Result<Insight, Self::Error>> + Send + '_;

  /// Apply every write of a completed analysis run atomically, advance the
  /// schedule and record the trigger row.
  fn commit_run(
    &self,
    commit: RunCommit,
  ) -> impl Future<Output = Result<CommitSummary, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn get_insight(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Insight>, Self::Error>> + Send + '_;

  /// Insights matching `query`, most recently updated first.
  fn list_insights<'a>(
    &'a self,
    query: &'a InsightQuery,
  ) -> impl Future<Output = Result<Vec<Insight>, Self::Error>> + Send + 'a;

  /// The audit trail of one insight, oldest first.
  fn history(
    &self,
    insight_id: Uuid,
  ) -> impl Future<Output = Result<Vec<InsightHistory>, Self::Error>> + Send + '_;

  /// The most recent run triggers, newest first.
  fn recent_triggers(
    &self,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<RunTrigger>, Self::Error>> + Send + '_;

  fn insight_statistics(
    &self,
  ) -> impl Future<Output = Result<InsightStatistics, Self::Error>> + Send + '_;
}
