//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 UTC strings so that text
//! order is time order. Enums are stored by their snake_case names, JSON
//! payloads as compact JSON, UUIDs as hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use seismo_core::{
  config::EngineConfig,
  insight::Insight,
  lifecycle::InsightHistory,
  run::RunTrigger,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Nanos, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

/// Parse a snake_case enum column.
pub fn decode_enum<T: FromStr>(column: &str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::Decode(format!("unknown {column}: {s:?}")))
}

// ─── Insights ────────────────────────────────────────────────────────────────

pub const INSIGHT_COLUMNS: &str = "id, version, parent_insight_id, insight_type, category,
  severity, title, description, region, location, latitude, longitude,
  confidence_score, supporting_data, earthquake_count, magnitude_range,
  depth_range, time_window_days, status, created_at, updated_at, valid_until,
  generated_by";

/// Raw values read directly from an `insights` row.
pub struct RawInsight {
  pub id:                String,
  pub version:           u32,
  pub parent_insight_id: Option<String>,
  pub insight_type:      String,
  pub category:          String,
  pub severity:          String,
  pub title:             String,
  pub description:       String,
  pub region:            String,
  pub location:          Option<String>,
  pub latitude:          Option<f64>,
  pub longitude:         Option<f64>,
  pub confidence_score:  f64,
  pub supporting_data:   String,
  pub earthquake_count:  u32,
  pub magnitude_range:   Option<String>,
  pub depth_range:       Option<String>,
  pub time_window_days:  u32,
  pub status:            String,
  pub created_at:        String,
  pub updated_at:        String,
  pub valid_until:       Option<String>,
  pub generated_by:      String,
}

impl RawInsight {
  /// Read a row selected with [`INSIGHT_COLUMNS`].
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:                row.get(0)?,
      version:           row.get(1)?,
      parent_insight_id: row.get(2)?,
      insight_type:      row.get(3)?,
      category:          row.get(4)?,
      severity:          row.get(5)?,
      title:             row.get(6)?,
      description:       row.get(7)?,
      region:            row.get(8)?,
      location:          row.get(9)?,
      latitude:          row.get(10)?,
      longitude:         row.get(11)?,
      confidence_score:  row.get(12)?,
      supporting_data:   row.get(13)?,
      earthquake_count:  row.get(14)?,
      magnitude_range:   row.get(15)?,
      depth_range:       row.get(16)?,
      time_window_days:  row.get(17)?,
      status:            row.get(18)?,
      created_at:        row.get(19)?,
      updated_at:        row.get(20)?,
      valid_until:       row.get(21)?,
      generated_by:      row.get(22)?,
    })
  }

  pub fn into_insight(self) -> Result<Insight> {
    Ok(Insight {
      id:                decode_uuid(&self.id)?,
      version:           self.version,
      parent_insight_id: self.parent_insight_id.as_deref().map(decode_uuid).transpose()?,
      insight_type:      decode_enum("insight type", &self.insight_type)?,
      category:          self.category,
      severity:          decode_enum("severity", &self.severity)?,
      title:             self.title,
      description:       self.description,
      region:            self.region,
      location:          self.location,
      latitude:          self.latitude,
      longitude:         self.longitude,
      confidence_score:  self.confidence_score,
      supporting_data:   serde_json::from_str(&self.supporting_data)?,
      earthquake_count:  self.earthquake_count,
      magnitude_range:   self.magnitude_range,
      depth_range:       self.depth_range,
      time_window_days:  self.time_window_days,
      status:            decode_enum("status", &self.status)?,
      created_at:        decode_dt(&self.created_at)?,
      updated_at:        decode_dt(&self.updated_at)?,
      valid_until:       decode_opt_dt(self.valid_until)?,
      generated_by:      self.generated_by,
    })
  }
}

// ─── History ─────────────────────────────────────────────────────────────────

pub struct RawHistory {
  pub history_id:    String,
  pub insight_id:    String,
  pub action:        String,
  pub previous_json: Option<String>,
  pub current_json:  String,
  pub reason:        String,
  pub triggered_by:  Option<String>,
  pub recorded_at:   String,
}

impl RawHistory {
  pub fn into_history(self) -> Result<InsightHistory> {
    Ok(InsightHistory {
      history_id:   decode_uuid(&self.history_id)?,
      insight_id:   decode_uuid(&self.insight_id)?,
      action:       decode_enum("history action", &self.action)?,
      previous:     self
        .previous_json
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()?,
      current:      serde_json::from_str(&self.current_json)?,
      reason:       self.reason,
      triggered_by: self.triggered_by,
      recorded_at:  decode_dt(&self.recorded_at)?,
    })
  }
}

// ─── Engine configuration ────────────────────────────────────────────────────

pub struct RawConfig {
  pub enabled:                  bool,
  pub analysis_frequency_hours: u32,
  pub next_run_at:              Option<String>,
  pub last_run_at:              Option<String>,
  pub total_runs:               i64,
  pub total_insights_generated: i64,
  pub ai_model:                 String,
  pub min_confidence_threshold: f64,
  pub updated_at:               String,
}

impl RawConfig {
  pub fn into_config(self) -> Result<EngineConfig> {
    Ok(EngineConfig {
      enabled:                  self.enabled,
      analysis_frequency_hours: self.analysis_frequency_hours,
      next_run_at:              decode_opt_dt(self.next_run_at)?,
      last_run_at:              decode_opt_dt(self.last_run_at)?,
      total_runs:               decode_count(self.total_runs)?,
      total_insights_generated: decode_count(self.total_insights_generated)?,
      ai_model:                 self.ai_model,
      min_confidence_threshold: self.min_confidence_threshold,
      updated_at:               decode_dt(&self.updated_at)?,
    })
  }
}

pub fn encode_count(n: u64) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

fn decode_count(n: i64) -> Result<u64> {
  u64::try_from(n).map_err(|_| Error::Decode(format!("negative counter: {n}")))
}

// ─── Run triggers ────────────────────────────────────────────────────────────

pub struct RawTrigger {
  pub trigger_id:         String,
  pub trigger_type:       String,
  pub description:        String,
  pub earthquake_ids:     String,
  pub insights_generated: u32,
  pub duration_seconds:   f64,
  pub recorded_at:        String,
}

impl RawTrigger {
  pub fn into_trigger(self) -> Result<RunTrigger> {
    Ok(RunTrigger {
      trigger_id:         decode_uuid(&self.trigger_id)?,
      trigger_type:       decode_enum("trigger type", &self.trigger_type)?,
      description:        self.description,
      earthquake_ids:     serde_json::from_str(&self.earthquake_ids)?,
      insights_generated: self.insights_generated,
      duration_seconds:   self.duration_seconds,
      recorded_at:        decode_dt(&self.recorded_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use seismo_core::insight::{InsightStatus, Severity};

  use super::*;

  #[test]
  fn timestamps_sort_as_text() {
    let a = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    let b = a + chrono::Duration::nanoseconds(1);
    let c = a + chrono::Duration::milliseconds(500);
    let (ea, eb, ec) = (encode_dt(a), encode_dt(b), encode_dt(c));
    assert_eq!(ea.len(), eb.len());
    assert!(ea < eb && eb < ec);
    assert_eq!(decode_dt(&eb).unwrap(), b);
  }

  #[test]
  fn enum_columns_roundtrip() {
    assert_eq!(decode_enum::<Severity>("severity", "critical").unwrap(), Severity::Critical);
    assert_eq!(
      decode_enum::<InsightStatus>("status", InsightStatus::Updated.as_ref()).unwrap(),
      InsightStatus::Updated
    );
    assert!(matches!(decode_enum::<Severity>("severity", "Critical"), Err(Error::Decode(_))));
  }
}
