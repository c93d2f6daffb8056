//! Analysis run records: the result reported to callers, the audit trigger
//! row, and the atomic write set a run hands to the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  insight::{Insight, NewInsight},
  lifecycle::InsightRevision,
};

/// At most this many contributing event ids are kept on a trigger row.
pub const TRIGGER_SAMPLE_SIZE: usize = 20;

// ─── Not-run reasons ─────────────────────────────────────────────────────────

/// Why a run did not execute. None of these are errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum NotRunReason {
  Disabled,
  MissingCredential,
  NotDue { next_run_at: DateTime<Utc> },
  RunInProgress,
}

impl std::fmt::Display for NotRunReason {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      Self::Disabled => f.write_str("engine is disabled"),
      Self::MissingCredential => f.write_str("no API key configured"),
      Self::NotDue { next_run_at } => write!(f, "next run scheduled for {next_run_at}"),
      Self::RunInProgress => f.write_str("another run is in progress"),
    }
  }
}

// ─── Result ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
  pub success:              bool,
  pub not_run:              Option<NotRunReason>,
  /// Newly created insights, including evolved successors.
  pub insights_generated:   u32,
  pub insights_updated:     u32,
  pub insights_invalidated: u32,
  /// Candidates that fell below the confidence threshold.
  pub candidates_discarded: u32,
  /// Input records dropped during normalization.
  pub records_dropped:      u32,
  pub duration_seconds:     f64,
  pub earthquakes_analyzed: u32,
  pub error:                Option<String>,
}

impl RunResult {
  pub fn not_run(reason: NotRunReason) -> Self {
    Self {
      error: Some(reason.to_string()),
      not_run: Some(reason),
      ..Self::default()
    }
  }

  pub fn failed(error: impl std::fmt::Display, duration_seconds: f64) -> Self {
    Self {
      error: Some(error.to_string()),
      duration_seconds,
      ..Self::default()
    }
  }
}

// ─── Trigger audit row ───────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TriggerType {
  ScheduledAnalysis,
  ManualAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunTrigger {
  pub trigger_id:         Uuid,
  pub trigger_type:       TriggerType,
  pub description:        String,
  pub earthquake_ids:     Vec<String>,
  pub insights_generated: u32,
  pub duration_seconds:   f64,
  pub recorded_at:        DateTime<Utc>,
}

// ─── Commit ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PlannedRevision {
  pub insight_id:       Uuid,
  pub expected_version: u32,
  pub revision:         InsightRevision,
  pub reason:           String,
}

#[derive(Debug, Clone)]
pub struct PlannedEvolution {
  pub parent_id:        Uuid,
  pub expected_version: u32,
  /// `parent_insight_id` is overwritten with `parent_id` by the store.
  pub successor:        NewInsight,
  pub reason:           String,
}

#[derive(Debug, Clone)]
pub struct PlannedInvalidation {
  pub insight_id:       Uuid,
  pub expected_version: u32,
  pub reason:           String,
}

/// Everything a completed run writes. Backends apply it atomically: either
/// every change and the schedule advance land, or none do.
#[derive(Debug, Clone)]
pub struct RunCommit {
  pub ran_at:               DateTime<Utc>,
  /// The `next_run_at` observed when the run started. The commit fails with
  /// [`crate::Error::ScheduleConflict`] if it has moved since.
  pub expected_next_run_at: Option<DateTime<Utc>>,
  pub next_run_at:          DateTime<Utc>,
  pub creates:              Vec<NewInsight>,
  pub revisions:            Vec<PlannedRevision>,
  pub evolutions:           Vec<PlannedEvolution>,
  pub invalidations:        Vec<PlannedInvalidation>,
  pub trigger:              RunTrigger,
}

impl RunCommit {
  /// Insights this commit brings into existence.
  pub fn generated(&self) -> usize { self.creates.len() + self.evolutions.len() }
}

/// The rows written by [`crate::store::InsightStore::commit_run`].
#[derive(Debug, Clone, Default)]
pub struct CommitSummary {
  pub created:     Vec<Insight>,
  pub updated:     Vec<Insight>,
  pub invalidated: Vec<Insight>,
}
