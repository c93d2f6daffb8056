//! Regional risk scoring.
//!
//! ```text
//! score = min(count / 10, 30)
//!       + min(avg_magnitude * 5, 25)
//!       + min(significant_count * 10, 25)
//!       + min(shallow_ratio * 20, 20)
//! ```
//!
//! Each term is capped on its own; the caps sum to 100 and the total is
//! clamped to `[0, 100]` to absorb float rounding.

use seismo_core::event::{Event, Region};
use serde::Serialize;

use crate::mean;

const ACTIVITY_CAP: f64 = 30.0;
const MAGNITUDE_CAP: f64 = 25.0;
const SIGNIFICANCE_CAP: f64 = 25.0;
const SHALLOW_CAP: f64 = 20.0;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskLevel {
  Low,
  Moderate,
  Elevated,
  High,
}

impl RiskLevel {
  pub fn from_score(score: f64) -> Self {
    if score >= 70.0 {
      Self::High
    } else if score >= 50.0 {
      Self::Elevated
    } else if score >= 30.0 {
      Self::Moderate
    } else {
      Self::Low
    }
  }
}

/// The inputs and capped terms behind a score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskFactors {
  /// All events, including those without a magnitude.
  pub event_count:       usize,
  pub activity_term:     f64,
  /// Mean over known magnitudes; 0 when none are known.
  pub average_magnitude: f64,
  pub magnitude_term:    f64,
  pub significant_count: usize,
  pub significance_term: f64,
  pub shallow_ratio:     f64,
  pub shallow_term:      f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskScore {
  pub region:  Region,
  pub score:   f64,
  pub level:   RiskLevel,
  pub factors: RiskFactors,
}

/// Score one region's event set. Deterministic: the same input always yields
/// the same output.
pub fn score(region: Region, events: &[Event]) -> RiskScore {
  let count = events.len();
  let average_magnitude = mean(events.iter().filter_map(|e| e.magnitude)).unwrap_or(0.0);
  let significant_count = events.iter().filter(|e| e.is_significant()).count();
  let shallow_count = events.iter().filter(|e| e.depth_class().is_shallow()).count();
  let shallow_ratio = shallow_count as f64 / count.max(1) as f64;

  let factors = RiskFactors {
    event_count: count,
    activity_term: (count as f64 / 10.0).min(ACTIVITY_CAP),
    average_magnitude,
    magnitude_term: (average_magnitude * 5.0).clamp(0.0, MAGNITUDE_CAP),
    significant_count,
    significance_term: (significant_count as f64 * 10.0).min(SIGNIFICANCE_CAP),
    shallow_ratio,
    shallow_term: (shallow_ratio * 20.0).min(SHALLOW_CAP),
  };

  let total = factors.activity_term
    + factors.magnitude_term
    + factors.significance_term
    + factors.shallow_term;
  let score = total.clamp(0.0, 100.0);

  RiskScore { region, score, level: RiskLevel::from_score(score), factors }
}
