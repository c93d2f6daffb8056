//! Calendar summaries: per-year statistics with a damage rating, and per-day
//! counts for a year or month.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use seismo_core::event::Event;
use serde::Serialize;

use crate::mean;

/// Magnitude counted as a major event (inclusive).
pub const MAJOR_MAGNITUDE: f64 = 6.0;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DamageLevel {
  Low,
  Moderate,
  High,
  Severe,
}

impl DamageLevel {
  pub fn assess(major_count: usize, max_magnitude: Option<f64>, significant_count: usize) -> Self {
    let max = max_magnitude.unwrap_or(0.0);
    if major_count >= 3 || max >= 7.5 {
      Self::Severe
    } else if major_count >= 1 || max >= 6.5 {
      Self::High
    } else if significant_count >= 20 {
      Self::Moderate
    } else {
      Self::Low
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearStatistics {
  pub year:              i32,
  pub total:             usize,
  pub max_magnitude:     Option<f64>,
  pub average_magnitude: Option<f64>,
  pub significant_count: usize,
  pub major_count:       usize,
  pub damage_level:      DamageLevel,
}

impl YearStatistics {
  /// Ranking weight for [`worst_years`]: major events dominate, then the
  /// peak magnitude, then the volume of significant events.
  pub fn severity_score(&self) -> f64 {
    self.major_count as f64 * 1000.0
      + self.max_magnitude.unwrap_or(0.0) * 100.0
      + self.significant_count as f64 * 5.0
  }
}

/// One entry per year that has events, oldest first.
pub fn year_statistics(events: &[Event]) -> Vec<YearStatistics> {
  let mut by_year: BTreeMap<i32, Vec<&Event>> = BTreeMap::new();
  for e in events {
    by_year.entry(e.time.year()).or_default().push(e);
  }

  by_year
    .into_iter()
    .map(|(year, members)| {
      let mags = members.iter().filter_map(|e| e.magnitude);
      let max_magnitude = mags.clone().reduce(f64::max);
      let significant_count = members.iter().filter(|e| e.is_significant()).count();
      let major_count = mags.clone().filter(|&m| m >= MAJOR_MAGNITUDE).count();
      YearStatistics {
        year,
        total: members.len(),
        max_magnitude,
        average_magnitude: mean(mags),
        significant_count,
        major_count,
        damage_level: DamageLevel::assess(major_count, max_magnitude, significant_count),
      }
    })
    .collect()
}

/// The `limit` most severe years, worst first. Ties keep chronological order.
pub fn worst_years(events: &[Event], limit: usize) -> Vec<YearStatistics> {
  let mut years = year_statistics(events);
  years.sort_by(|a, b| b.severity_score().total_cmp(&a.severity_score()));
  years.truncate(limit);
  years
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDay {
  pub date:          NaiveDate,
  pub count:         usize,
  pub max_magnitude: Option<f64>,
}

/// Days with events in `year` (and `month`, when given), in date order. Dates
/// are UTC.
pub fn calendar(events: &[Event], year: i32, month: Option<u32>) -> Vec<CalendarDay> {
  let mut days: BTreeMap<NaiveDate, CalendarDay> = BTreeMap::new();

  for e in events {
    let date = e.time.date_naive();
    if date.year() != year || month.is_some_and(|m| date.month() != m) {
      continue;
    }
    let day = days.entry(date).or_insert(CalendarDay { date, count: 0, max_magnitude: None });
    day.count += 1;
    if let Some(m) = e.magnitude {
      day.max_magnitude = Some(day.max_magnitude.map_or(m, |cur| cur.max(m)));
    }
  }

  days.into_values().collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testutil::event;

  #[test]
  fn damage_levels_follow_thresholds() {
    assert_eq!(DamageLevel::assess(3, Some(6.2), 0), DamageLevel::Severe);
    assert_eq!(DamageLevel::assess(0, Some(7.5), 0), DamageLevel::Severe);
    assert_eq!(DamageLevel::assess(1, Some(6.0), 0), DamageLevel::High);
    assert_eq!(DamageLevel::assess(0, Some(6.5), 0), DamageLevel::High);
    assert_eq!(DamageLevel::assess(0, Some(5.9), 20), DamageLevel::Moderate);
    assert_eq!(DamageLevel::assess(0, Some(5.9), 19), DamageLevel::Low);
    assert_eq!(DamageLevel::assess(0, None, 0), DamageLevel::Low);
  }

  #[test]
  fn years_are_grouped_and_ranked() {
    // The test epoch is 2025-06-01.
    let events = vec![
      event("a", 12.0, 123.0, Some(4.6), 10.0, -400.0),
      event("b", 12.0, 123.0, Some(3.0), 10.0, -380.0),
      event("c", 12.0, 123.0, Some(6.8), 10.0, 0.0),
      event("d", 12.0, 123.0, None, 10.0, 10.0),
    ];

    let years = year_statistics(&events);
    assert_eq!(years.len(), 2);
    assert_eq!(years[0].year, 2024);
    assert_eq!(years[0].total, 2);
    assert_eq!(years[0].significant_count, 1);
    assert_eq!(years[0].damage_level, DamageLevel::Low);
    assert_eq!(years[1].year, 2025);
    assert_eq!(years[1].total, 2);
    assert_eq!(years[1].major_count, 1);
    assert_eq!(years[1].average_magnitude, Some(6.8));
    assert_eq!(years[1].damage_level, DamageLevel::High);

    let worst = worst_years(&events, 1);
    assert_eq!(worst.len(), 1);
    assert_eq!(worst[0].year, 2025);
    assert!((worst[0].severity_score() - (1000.0 + 680.0 + 5.0)).abs() < 1e-9);
  }

  #[test]
  fn calendar_counts_per_day() {
    let events = vec![
      event("a", 12.0, 123.0, Some(3.1), 10.0, 0.1),
      event("b", 12.0, 123.0, Some(4.0), 10.0, 0.5),
      event("c", 12.0, 123.0, None, 10.0, 2.0),
      event("d", 12.0, 123.0, Some(2.0), 10.0, 31.0),
    ];

    let june = calendar(&events, 2025, Some(6));
    assert_eq!(june.len(), 2);
    assert_eq!(june[0].date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    assert_eq!(june[0].count, 2);
    assert_eq!(june[0].max_magnitude, Some(4.0));
    assert_eq!(june[1].max_magnitude, None);

    assert_eq!(calendar(&events, 2025, None).len(), 3);
    assert!(calendar(&events, 2024, None).is_empty());
  }
}
