//! Lifecycle transitions and the append-only insight history.
//!
//! The transitions are pure: they take the current insight and return the
//! next state. Storage backends apply them under a version check and append
//! the matching [`InsightHistory`] record in the same write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  insight::{Insight, InsightStatus, NewInsight, Severity},
};

// ─── History ─────────────────────────────────────────────────────────────────

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
pub enum HistoryAction {
  Created,
  Updated,
  Invalidated,
  /// The insight was retired in favour of a successor carrying its id as
  /// `parent_insight_id`.
  Evolved,
}

/// One audit row. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightHistory {
  pub history_id:   Uuid,
  pub insight_id:   Uuid,
  pub action:       HistoryAction,
  /// Snapshot before the transition; `None` for creation.
  pub previous:     Option<serde_json::Value>,
  pub current:      serde_json::Value,
  pub reason:       String,
  pub triggered_by: Option<String>,
  pub recorded_at:  DateTime<Utc>,
}

impl InsightHistory {
  pub fn record(
    action: HistoryAction,
    previous: Option<&Insight>,
    current: &Insight,
    reason: impl Into<String>,
    triggered_by: Option<String>,
  ) -> Result<Self> {
    Ok(Self {
      history_id: Uuid::new_v4(),
      insight_id: current.id,
      action,
      previous: previous.map(Insight::snapshot).transpose()?,
      current: current.snapshot()?,
      reason: reason.into(),
      triggered_by,
      recorded_at: current.updated_at,
    })
  }
}

// ─── Revision ────────────────────────────────────────────────────────────────

/// The fields a revision may change. Identity, classification and scope are
/// fixed for the life of an insight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightRevision {
  pub severity:         Severity,
  pub title:            String,
  pub description:      String,
  pub latitude:         Option<f64>,
  pub longitude:        Option<f64>,
  pub confidence_score: f64,
  pub supporting_data:  serde_json::Value,
  pub earthquake_count: u32,
  pub magnitude_range:  Option<String>,
  pub depth_range:      Option<String>,
  pub time_window_days: u32,
  pub valid_until:      Option<DateTime<Utc>>,
  pub generated_by:     String,
}

impl From<NewInsight> for InsightRevision {
  fn from(n: NewInsight) -> Self {
    Self {
      severity:         n.severity,
      title:            n.title,
      description:      n.description,
      latitude:         n.latitude,
      longitude:        n.longitude,
      confidence_score: n.confidence_score,
      supporting_data:  n.supporting_data,
      earthquake_count: n.earthquake_count,
      magnitude_range:  n.magnitude_range,
      depth_range:      n.depth_range,
      time_window_days: n.time_window_days,
      valid_until:      n.valid_until,
      generated_by:     n.generated_by,
    }
  }
}

// ─── Transitions ─────────────────────────────────────────────────────────────

impl Insight {
  /// JSON snapshot stored in history rows.
  pub fn snapshot(&self) -> Result<serde_json::Value> { Ok(serde_json::to_value(self)?) }

  /// Fail unless the insight is still at `expected` version.
  pub fn check_version(&self, expected: u32) -> Result<()> {
    if self.version != expected {
      return Err(Error::VersionConflict {
        id: self.id,
        expected,
        actual: self.version,
      });
    }
    Ok(())
  }

  fn ensure_transition(&self, next: InsightStatus) -> Result<()> {
    if self.status == InsightStatus::Invalidated {
      return Err(Error::AlreadyInvalidated(self.id));
    }
    if !self.status.can_transition_to(next) {
      return Err(Error::InvalidTransition { from: self.status, to: next });
    }
    Ok(())
  }

  /// The next state after applying `revision`: version + 1, status updated.
  pub fn revised(&self, revision: InsightRevision, now: DateTime<Utc>) -> Result<Insight> {
    self.ensure_transition(InsightStatus::Updated)?;
    Ok(Insight {
      version: self.version + 1,
      status: InsightStatus::Updated,
      updated_at: now,
      severity: revision.severity,
      title: revision.title,
      description: revision.description,
      latitude: revision.latitude,
      longitude: revision.longitude,
      confidence_score: revision.confidence_score,
      supporting_data: revision.supporting_data,
      earthquake_count: revision.earthquake_count,
      magnitude_range: revision.magnitude_range,
      depth_range: revision.depth_range,
      time_window_days: revision.time_window_days,
      valid_until: revision.valid_until,
      generated_by: revision.generated_by,
      ..self.clone()
    })
  }

  /// The terminal state. The version still advances so concurrent writers
  /// holding the old version are rejected.
  pub fn invalidated(&self, now: DateTime<Utc>) -> Result<Insight> {
    self.ensure_transition(InsightStatus::Invalidated)?;
    Ok(Insight {
      version: self.version + 1,
      status: InsightStatus::Invalidated,
      updated_at: now,
      ..self.clone()
    })
  }
}
