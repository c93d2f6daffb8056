//! Temporal trend segmentation.
//!
//! The period ending at `end` is cut into consecutive windows, oldest first.
//! The trend compares the most recent window's count with the oldest's; it
//! is a first-versus-last ratio, not a regression.

use chrono::{DateTime, Duration, Utc};
use seismo_core::event::Event;
use serde::Serialize;

use crate::mean;

pub const DEFAULT_PERIOD_DAYS: u32 = 90;
pub const DEFAULT_SEGMENT_DAYS: u32 = 30;

const INCREASE_RATIO: f64 = 1.2;
const DECREASE_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Trend {
  Increasing,
  Decreasing,
  Stable,
  InsufficientData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
  pub start:             DateTime<Utc>,
  /// Exclusive, except for the final segment which includes `end`.
  pub end:               DateTime<Utc>,
  pub count:             usize,
  pub average_magnitude: Option<f64>,
  pub significant_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendReport {
  pub period_start:  DateTime<Utc>,
  pub period_end:    DateTime<Utc>,
  pub segments:      Vec<Segment>,
  pub overall_trend: Trend,
}

impl TrendReport {
  /// Last-segment count over first-segment count, when defined.
  pub fn change_ratio(&self) -> Option<f64> {
    let first = self.segments.first()?.count;
    let last = self.segments.last()?.count;
    (self.segments.len() >= 2 && first > 0).then(|| last as f64 / first as f64)
  }
}

/// Segment the `period_days` ending at `end`. A period reaching past the
/// representable calendar yields no segments.
pub fn analyze(events: &[Event], end: DateTime<Utc>, period_days: u32, segment_days: u32) -> TrendReport {
  let Some(period_start) = end.checked_sub_signed(Duration::days(i64::from(period_days))) else {
    return TrendReport {
      period_start:  DateTime::<Utc>::MIN_UTC,
      period_end:    end,
      segments:      Vec::new(),
      overall_trend: Trend::InsufficientData,
    };
  };
  let mut segments = Vec::new();

  if segment_days > 0 {
    let n = period_days.div_ceil(segment_days);
    for i in 0..n {
      let offset = Duration::days(i64::from(i) * i64::from(segment_days));
      let Some(start) = period_start.checked_add_signed(offset) else { break };
      let stop = start
        .checked_add_signed(Duration::days(i64::from(segment_days)))
        .map_or(end, |stop| stop.min(end));
      let last = i + 1 == n;

      let members: Vec<&Event> = events
        .iter()
        .filter(|e| e.time >= start && (e.time < stop || (last && e.time == end)))
        .collect();

      segments.push(Segment {
        start,
        end: stop,
        count: members.len(),
        average_magnitude: mean(members.iter().filter_map(|e| e.magnitude)),
        significant_count: members.iter().filter(|e| e.is_significant()).count(),
      });
    }
  }

  let overall_trend = classify(&segments);
  TrendReport { period_start, period_end: end, segments, overall_trend }
}

fn classify(segments: &[Segment]) -> Trend {
  let (Some(first), Some(last)) = (segments.first(), segments.last()) else {
    return Trend::InsufficientData;
  };
  if segments.len() < 2 {
    return Trend::InsufficientData;
  }
  let (first, last) = (first.count as f64, last.count as f64);
  if last > first * INCREASE_RATIO {
    Trend::Increasing
  } else if last < first * DECREASE_RATIO {
    Trend::Decreasing
  } else {
    Trend::Stable
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testutil::{epoch, event};

  /// `n` events on day `day`, relative to the test epoch.
  fn burst(prefix: &str, n: usize, day: f64) -> Vec<Event> {
    (0..n)
      .map(|i| event(&format!("{prefix}{i}"), 12.0, 123.0, Some(4.6), 15.0, day))
      .collect()
  }

  fn end() -> DateTime<Utc> { epoch() + Duration::days(90) }

  #[test]
  fn three_even_segments_classify_increase() {
    let mut events = burst("a", 10, 5.0);
    events.extend(burst("b", 11, 45.0));
    events.extend(burst("c", 13, 80.0));

    let report = analyze(&events, end(), DEFAULT_PERIOD_DAYS, DEFAULT_SEGMENT_DAYS);
    assert_eq!(report.segments.len(), 3);
    let counts: Vec<_> = report.segments.iter().map(|s| s.count).collect();
    assert_eq!(counts, [10, 11, 13]);
    assert_eq!(report.segments[0].significant_count, 10);
    assert_eq!(report.overall_trend, Trend::Increasing);
    assert_eq!(report.change_ratio(), Some(1.3));
  }

  #[test]
  fn ratios_at_the_edges_are_stable() {
    let mut events = burst("a", 10, 5.0);
    events.extend(burst("c", 12, 80.0));
    let report = analyze(&events, end(), 90, 30);
    assert_eq!(report.overall_trend, Trend::Stable);

    let mut events = burst("a", 10, 5.0);
    events.extend(burst("c", 8, 80.0));
    let report = analyze(&events, end(), 90, 30);
    assert_eq!(report.overall_trend, Trend::Stable);

    let mut events = burst("a", 10, 5.0);
    events.extend(burst("c", 7, 80.0));
    let report = analyze(&events, end(), 90, 30);
    assert_eq!(report.overall_trend, Trend::Decreasing);
  }

  #[test]
  fn last_segment_may_be_shorter() {
    let report = analyze(&burst("x", 3, 89.0), end(), 70, 30);
    assert_eq!(report.segments.len(), 3);
    let last = report.segments.last().unwrap();
    assert_eq!(last.end, end());
    assert_eq!(last.end - last.start, Duration::days(10));
    assert_eq!(last.count, 3);
    assert_eq!(report.overall_trend, Trend::Increasing);
  }

  #[test]
  fn single_segment_is_insufficient() {
    let report = analyze(&burst("x", 5, 80.0), end(), 30, 30);
    assert_eq!(report.segments.len(), 1);
    assert_eq!(report.overall_trend, Trend::InsufficientData);
    assert_eq!(report.change_ratio(), None);

    let report = analyze(&[], end(), 90, 0);
    assert!(report.segments.is_empty());
    assert_eq!(report.overall_trend, Trend::InsufficientData);
  }

  #[test]
  fn events_outside_the_period_are_ignored_and_end_is_inclusive() {
    let mut events = burst("old", 4, -1.0);
    events.extend(burst("edge", 2, 90.0));
    let report = analyze(&events, end(), 90, 30);
    let counts: Vec<_> = report.segments.iter().map(|s| s.count).collect();
    assert_eq!(counts, [0, 0, 2]);
    assert_eq!(report.segments[0].average_magnitude, None);
  }

  #[test]
  fn extreme_periods_do_not_overflow() {
    let events = burst("x", 3, 80.0);
    for (period, segment) in [(u32::MAX, 1), (u32::MAX, u32::MAX), (u32::MAX, 0)] {
      let report = analyze(&events, end(), period, segment);
      assert!(report.segments.is_empty());
      assert_eq!(report.overall_trend, Trend::InsufficientData);
    }

    // Near the end of the calendar the final segment is clipped to `end`.
    let report = analyze(&[], DateTime::<Utc>::MAX_UTC, 10, 3);
    assert_eq!(report.segments.len(), 4);
    assert_eq!(report.segments[3].end, DateTime::<Utc>::MAX_UTC);
    assert_eq!(report.segments[3].end - report.segments[3].start, Duration::days(1));
  }
}
