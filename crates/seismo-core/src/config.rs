//! The engine configuration singleton.
//!
//! Exactly one [`EngineConfig`] exists per store. Backends create it with
//! [`EngineConfig::defaults`] on first access and change it only through
//! [`EngineConfig::apply`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

pub const DEFAULT_MODEL: &str = "x-ai/grok-4-fast";
pub const DEFAULT_FREQUENCY_HOURS: u32 = 6;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.6;
/// Longest accepted analysis interval: one year.
pub const MAX_FREQUENCY_HOURS: u32 = 24 * 365;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
  pub enabled:                  bool,
  pub analysis_frequency_hours: u32,
  pub next_run_at:              Option<DateTime<Utc>>,
  pub last_run_at:              Option<DateTime<Utc>>,
  pub total_runs:               u64,
  pub total_insights_generated: u64,
  pub ai_model:                 String,
  pub min_confidence_threshold: f64,
  pub updated_at:               DateTime<Utc>,
}

impl EngineConfig {
  pub fn defaults(now: DateTime<Utc>) -> Self {
    Self {
      enabled:                  true,
      analysis_frequency_hours: DEFAULT_FREQUENCY_HOURS,
      next_run_at:              None,
      last_run_at:              None,
      total_runs:               0,
      total_insights_generated: 0,
      ai_model:                 DEFAULT_MODEL.to_owned(),
      min_confidence_threshold: DEFAULT_MIN_CONFIDENCE,
      updated_at:               now,
    }
  }

  pub fn frequency(&self) -> Duration { Duration::hours(i64::from(self.analysis_frequency_hours)) }

  /// A run is due when nothing is scheduled or the scheduled time has passed.
  pub fn is_due(&self, now: DateTime<Utc>) -> bool {
    self.next_run_at.is_none_or(|next| now >= next)
  }

  /// Validate and apply `update`. A frequency change reschedules the next
  /// run relative to the last one.
  pub fn apply(&self, update: &ConfigUpdate, now: DateTime<Utc>) -> Result<Self> {
    update.validate()?;
    let mut next = self.clone();

    if let Some(enabled) = update.enabled {
      next.enabled = enabled;
    }
    if let Some(hours) = update.analysis_frequency_hours {
      next.analysis_frequency_hours = hours;
      if let Some(last) = next.last_run_at {
        let rescheduled = last.checked_add_signed(next.frequency()).ok_or_else(|| {
          Error::InvalidConfig(format!("a run {hours} hours after {last} is out of range"))
        })?;
        next.next_run_at = Some(rescheduled);
      }
    }
    if let Some(model) = &update.ai_model {
      next.ai_model = model.clone();
    }
    if let Some(threshold) = update.min_confidence_threshold {
      next.min_confidence_threshold = threshold;
    }
    next.updated_at = now;
    Ok(next)
  }
}

/// A partial change to the configuration surface.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdate {
  pub enabled:                  Option<bool>,
  pub analysis_frequency_hours: Option<u32>,
  pub ai_model:                 Option<String>,
  pub min_confidence_threshold: Option<f64>,
}

impl ConfigUpdate {
  pub fn validate(&self) -> Result<()> {
    if let Some(hours) = self.analysis_frequency_hours
      && !(1..=MAX_FREQUENCY_HOURS).contains(&hours)
    {
      return Err(Error::InvalidConfig(format!(
        "analysis_frequency_hours must be within [1, {MAX_FREQUENCY_HOURS}], got {hours}"
      )));
    }
    if let Some(t) = self.min_confidence_threshold
      && !(0.0..=1.0).contains(&t)
    {
      return Err(Error::InvalidConfig(format!(
        "min_confidence_threshold must be within [0, 1], got {t}"
      )));
    }
    if self.ai_model.as_deref().is_some_and(|m| m.trim().is_empty()) {
      return Err(Error::InvalidConfig("ai_model must not be empty".into()));
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap() }

  #[test]
  fn defaults_are_due_immediately() {
    let cfg = EngineConfig::defaults(now());
    assert!(cfg.enabled);
    assert!(cfg.is_due(now()));
    assert_eq!(cfg.frequency(), Duration::hours(6));
  }

  #[test]
  fn frequency_change_reschedules_from_last_run() {
    let mut cfg = EngineConfig::defaults(now());
    cfg.last_run_at = Some(now());
    cfg.next_run_at = Some(now() + Duration::hours(6));

    let update = ConfigUpdate { analysis_frequency_hours: Some(2), ..Default::default() };
    let next = cfg.apply(&update, now()).unwrap();
    assert_eq!(next.next_run_at, Some(now() + Duration::hours(2)));
    assert!(!next.is_due(now() + Duration::minutes(119)));
    assert!(next.is_due(now() + Duration::hours(2)));
  }

  #[test]
  fn rejects_out_of_range_values() {
    let cfg = EngineConfig::defaults(now());
    for update in [
      ConfigUpdate { analysis_frequency_hours: Some(0), ..Default::default() },
      ConfigUpdate { analysis_frequency_hours: Some(MAX_FREQUENCY_HOURS + 1), ..Default::default() },
      ConfigUpdate { analysis_frequency_hours: Some(u32::MAX), ..Default::default() },
      ConfigUpdate { min_confidence_threshold: Some(1.5), ..Default::default() },
      ConfigUpdate { min_confidence_threshold: Some(-0.1), ..Default::default() },
      ConfigUpdate { ai_model: Some("  ".into()), ..Default::default() },
    ] {
      assert!(matches!(cfg.apply(&update, now()), Err(Error::InvalidConfig(_))));
    }
  }

  #[test]
  fn longest_frequency_is_accepted() {
    let mut cfg = EngineConfig::defaults(now());
    cfg.last_run_at = Some(now());
    let update = ConfigUpdate { analysis_frequency_hours: Some(MAX_FREQUENCY_HOURS), ..Default::default() };
    let next = cfg.apply(&update, now()).unwrap();
    assert_eq!(next.next_run_at, Some(now() + Duration::days(365)));
  }

  #[test]
  fn reschedule_past_the_end_of_time_is_rejected() {
    let mut cfg = EngineConfig::defaults(now());
    cfg.last_run_at = Some(DateTime::<Utc>::MAX_UTC - Duration::hours(1));
    let update = ConfigUpdate { analysis_frequency_hours: Some(2), ..Default::default() };
    assert!(matches!(cfg.apply(&update, now()), Err(Error::InvalidConfig(_))));
  }
}
