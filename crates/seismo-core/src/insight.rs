//! Insights: the persisted, versioned findings produced by the engine.
//!
//! An insight is created `active` at version 1. Revisions bump the version
//! and move it to `updated`; invalidation is terminal. Every transition is
//! mirrored by an [`InsightHistory`](crate::lifecycle::InsightHistory) row.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Classification ──────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InsightType {
  Pattern,
  Anomaly,
  Risk,
  Correlation,
  Prediction,
}

/// Urgency of an insight, independent of its confidence.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
  Low,
  Moderate,
  High,
  Critical,
}

impl Severity {
  /// Severity from the strongest event and the number of events behind a
  /// finding.
  pub fn from_activity(max_magnitude: f64, event_count: usize) -> Self {
    if max_magnitude >= 6.5 || event_count >= 50 {
      Self::Critical
    } else if max_magnitude >= 5.5 || event_count >= 30 {
      Self::High
    } else if max_magnitude >= 4.5 || event_count >= 15 {
      Self::Moderate
    } else {
      Self::Low
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InsightStatus {
  Active,
  Updated,
  Invalidated,
}

impl InsightStatus {
  /// Active and updated insights are both "live".
  pub fn is_live(self) -> bool { !matches!(self, Self::Invalidated) }

  /// `active → updated`, `updated → active | updated`, and
  /// `live → invalidated`, which is terminal.
  pub fn can_transition_to(self, next: Self) -> bool {
    matches!(
      (self, next),
      (Self::Active | Self::Updated, Self::Updated)
        | (Self::Updated, Self::Active)
        | (Self::Active | Self::Updated, Self::Invalidated)
    )
  }
}

// ─── Insight ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
  pub id:                Uuid,
  pub version:           u32,
  pub parent_insight_id: Option<Uuid>,

  pub insight_type: InsightType,
  pub category:     String,
  pub severity:     Severity,

  pub title:       String,
  pub description: String,

  pub region:    String,
  pub location:  Option<String>,
  pub latitude:  Option<f64>,
  pub longitude: Option<f64>,

  pub confidence_score: f64,
  /// Contributing event ids and computed metrics.
  pub supporting_data:  serde_json::Value,
  pub earthquake_count: u32,
  pub magnitude_range:  Option<String>,
  pub depth_range:      Option<String>,
  pub time_window_days: u32,

  pub status:      InsightStatus,
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  /// Soft expiry; the next run re-evaluates the insight after this instant.
  pub valid_until: Option<DateTime<Utc>>,

  pub generated_by: String,
}

impl Insight {
  /// Materialise a freshly created insight from its input.
  pub fn from_new(id: Uuid, input: NewInsight, now: DateTime<Utc>) -> Self {
    Self {
      id,
      version: 1,
      parent_insight_id: input.parent_insight_id,
      insight_type: input.insight_type,
      category: input.category,
      severity: input.severity,
      title: input.title,
      description: input.description,
      region: input.region,
      location: input.location,
      latitude: input.latitude,
      longitude: input.longitude,
      confidence_score: input.confidence_score,
      supporting_data: input.supporting_data,
      earthquake_count: input.earthquake_count,
      magnitude_range: input.magnitude_range,
      depth_range: input.depth_range,
      time_window_days: input.time_window_days,
      status: InsightStatus::Active,
      created_at: now,
      updated_at: now,
      valid_until: input.valid_until,
      generated_by: input.generated_by,
    }
  }

  pub fn key(&self) -> InsightKey {
    InsightKey {
      insight_type: self.insight_type,
      category:     self.category.clone(),
      region:       self.region.clone(),
      location:     self.location.clone(),
    }
  }

  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    self.valid_until.is_some_and(|until| until <= now)
  }
}

/// Identifies "the same finding" across runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InsightKey {
  pub insight_type: InsightType,
  pub category:     String,
  pub region:       String,
  pub location:     Option<String>,
}

// ─── NewInsight ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::InsightStore::create_insight`]. Identity, version,
/// status and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewInsight {
  pub insight_type:      InsightType,
  pub category:          String,
  pub severity:          Severity,
  pub title:             String,
  pub description:       String,
  pub region:            String,
  pub location:          Option<String>,
  pub latitude:          Option<f64>,
  pub longitude:         Option<f64>,
  pub confidence_score:  f64,
  pub supporting_data:   serde_json::Value,
  pub earthquake_count:  u32,
  pub magnitude_range:   Option<String>,
  pub depth_range:       Option<String>,
  pub time_window_days:  u32,
  pub valid_until:       Option<DateTime<Utc>>,
  pub generated_by:      String,
  pub parent_insight_id: Option<Uuid>,
}

impl NewInsight {
  pub fn key(&self) -> InsightKey {
    InsightKey {
      insight_type: self.insight_type,
      category:     self.category.clone(),
      region:       self.region.clone(),
      location:     self.location.clone(),
    }
  }
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::InsightStore::list_insights`].
#[derive(Debug, Clone, Default)]
pub struct InsightQuery {
  pub status:       Option<InsightStatus>,
  /// When `status` is unset, restrict to active and updated insights.
  pub live_only:    bool,
  pub insight_type: Option<InsightType>,
  pub region:       Option<String>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

impl InsightQuery {
  pub fn live() -> Self { Self { live_only: true, ..Self::default() } }
}

/// Aggregate counts over all stored insights.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightStatistics {
  pub total:       u64,
  pub active:      u64,
  pub updated:     u64,
  pub invalidated: u64,
  pub by_type:     BTreeMap<String, u64>,
  pub by_severity: BTreeMap<String, u64>,
}

#[cfg(test)]
mod tests {
  use std::str::FromStr;

  use super::*;

  #[test]
  fn status_transitions() {
    use InsightStatus::*;
    assert!(Active.can_transition_to(Updated));
    assert!(Updated.can_transition_to(Updated));
    assert!(Active.can_transition_to(Invalidated));
    assert!(Updated.can_transition_to(Invalidated));
    assert!(!Invalidated.can_transition_to(Active));
    assert!(!Invalidated.can_transition_to(Updated));
    assert!(Updated.can_transition_to(Active));
    assert!(!Active.can_transition_to(Active));
  }

  #[test]
  fn severity_from_activity_bands() {
    assert_eq!(Severity::from_activity(6.5, 1), Severity::Critical);
    assert_eq!(Severity::from_activity(3.0, 50), Severity::Critical);
    assert_eq!(Severity::from_activity(5.5, 1), Severity::High);
    assert_eq!(Severity::from_activity(4.5, 1), Severity::Moderate);
    assert_eq!(Severity::from_activity(3.0, 14), Severity::Low);
  }

  #[test]
  fn enum_strings_match_serde_names() {
    assert_eq!(InsightType::Correlation.to_string(), "correlation");
    assert_eq!(InsightStatus::from_str("invalidated").unwrap(), InsightStatus::Invalidated);
    assert_eq!(
      serde_json::to_string(&Severity::Critical).unwrap(),
      format!("\"{}\"", Severity::Critical)
    );
  }
}
