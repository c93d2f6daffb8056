//! Mainshock/aftershock sequence detection.
//!
//! Candidate mainshocks are the ten strongest events of at least M4.0,
//! strongest first. Each unprocessed candidate claims every other
//! unprocessed, weaker event inside the time and distance window as an
//! aftershock; with three or more it emits a [`Sequence`] and only the
//! mainshock is marked processed. Aftershocks stay eligible for later
//! candidates, so the output depends on the iteration order.
//!
//! Processed tracking is keyed by event id, never by list position.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use seismo_core::event::Event;
use serde::Serialize;

pub const MAINSHOCK_MIN_MAGNITUDE: f64 = 4.0;
pub const MAX_MAINSHOCK_CANDIDATES: usize = 10;
pub const MIN_AFTERSHOCKS: usize = 3;

pub const DEFAULT_TIME_WINDOW_DAYS: f64 = 30.0;
pub const DEFAULT_DISTANCE_THRESHOLD_DEGREES: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sequence {
  pub mainshock:    Event,
  /// In input order.
  pub aftershocks:  Vec<Event>,
  /// Earliest event of the sequence (may precede the mainshock).
  pub window_start: DateTime<Utc>,
  pub window_end:   DateTime<Utc>,
}

impl Sequence {
  pub fn aftershock_count(&self) -> usize { self.aftershocks.len() }

  pub fn duration_days(&self) -> f64 {
    (self.window_end - self.window_start).num_milliseconds() as f64 / 86_400_000.0
  }

  pub fn largest_aftershock(&self) -> Option<f64> {
    self.aftershocks.iter().filter_map(|e| e.magnitude).reduce(f64::max)
  }
}

pub fn detect(
  events: &[Event],
  time_window_days: f64,
  distance_threshold_degrees: f64,
) -> Vec<Sequence> {
  let mut candidates: Vec<(&Event, f64)> = events
    .iter()
    .filter_map(|e| e.magnitude.filter(|&m| m >= MAINSHOCK_MIN_MAGNITUDE).map(|m| (e, m)))
    .collect();
  // Stable: equal magnitudes keep input order.
  candidates.sort_by(|a, b| b.1.total_cmp(&a.1));
  candidates.truncate(MAX_MAINSHOCK_CANDIDATES);

  let window_ms = time_window_days * 86_400_000.0;
  let mut processed: HashSet<&str> = HashSet::new();
  let mut sequences = Vec::new();

  for (main, main_mag) in candidates {
    if processed.contains(main.id.as_str()) {
      continue;
    }

    let aftershocks: Vec<&Event> = events
      .iter()
      .filter(|e| e.id != main.id && !processed.contains(e.id.as_str()))
      .filter(|e| e.magnitude.is_some_and(|m| m < main_mag))
      .filter(|e| ((e.time - main.time).num_milliseconds().abs() as f64) <= window_ms)
      .filter(|e| main.degrees_to(e).is_some_and(|d| d <= distance_threshold_degrees))
      .collect();

    if aftershocks.len() < MIN_AFTERSHOCKS {
      continue;
    }

    let times = aftershocks.iter().map(|e| e.time).chain(std::iter::once(main.time));
    let window_start = times.clone().min().unwrap_or(main.time);
    let window_end = times.max().unwrap_or(main.time);

    processed.insert(main.id.as_str());
    sequences.push(Sequence {
      mainshock: main.clone(),
      aftershocks: aftershocks.into_iter().cloned().collect(),
      window_start,
      window_end,
    });
  }

  sequences
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testutil::event;

  fn ids(seq: &Sequence) -> Vec<&str> { seq.aftershocks.iter().map(|e| e.id.as_str()).collect() }

  #[test]
  fn detects_mainshock_with_three_aftershocks() {
    let events = vec![
      event("m", 10.0, 125.0, Some(5.5), 20.0, 0.0),
      event("a1", 10.2, 125.1, Some(3.1), 20.0, 1.0),
      event("a2", 10.1, 124.9, Some(3.4), 20.0, 2.5),
      event("a3", 9.9, 125.3, Some(4.2), 20.0, 10.0),
      event("far", 12.0, 125.0, Some(3.0), 20.0, 1.0),
      event("late", 10.0, 125.0, Some(3.0), 20.0, 45.0),
    ];

    let seqs = detect(&events, DEFAULT_TIME_WINDOW_DAYS, DEFAULT_DISTANCE_THRESHOLD_DEGREES);
    assert_eq!(seqs.len(), 1);
    assert_eq!(seqs[0].mainshock.id, "m");
    assert_eq!(ids(&seqs[0]), ["a1", "a2", "a3"]);
    assert!((seqs[0].duration_days() - 10.0).abs() < 1e-9);
    assert_eq!(seqs[0].largest_aftershock(), Some(4.2));
  }

  #[test]
  fn two_aftershocks_are_not_enough() {
    let events = vec![
      event("m", 10.0, 125.0, Some(5.0), 20.0, 0.0),
      event("a1", 10.1, 125.0, Some(3.0), 20.0, 1.0),
      event("a2", 10.2, 125.0, Some(3.0), 20.0, 2.0),
    ];
    assert!(detect(&events, 30.0, 1.0).is_empty());
  }

  #[test]
  fn aftershocks_remain_eligible_for_later_mainshocks() {
    // "b" (M4.5) is an aftershock of "a" (M6.0) and later a mainshock itself
    // over the same smaller events.
    let events = vec![
      event("a", 10.0, 125.0, Some(6.0), 20.0, 0.0),
      event("b", 10.1, 125.0, Some(4.5), 20.0, 1.0),
      event("s1", 10.2, 125.0, Some(3.0), 20.0, 2.0),
      event("s2", 10.3, 125.0, Some(3.2), 20.0, 3.0),
      event("s3", 10.1, 125.1, Some(3.3), 20.0, 4.0),
    ];
    let seqs = detect(&events, 30.0, 1.0);
    assert_eq!(seqs.len(), 2);
    assert_eq!(seqs[0].mainshock.id, "a");
    assert_eq!(ids(&seqs[0]), ["b", "s1", "s2", "s3"]);
    assert_eq!(seqs[1].mainshock.id, "b");
    // "a" is processed and stronger; it cannot be b's aftershock anyway.
    assert_eq!(ids(&seqs[1]), ["s1", "s2", "s3"]);
  }

  #[test]
  fn equal_magnitude_candidates_keep_input_order() {
    // Both candidates claim the same aftershocks; "p" comes first because
    // the sort is stable.
    let events = vec![
      event("p", 10.0, 125.0, Some(5.0), 20.0, 0.0),
      event("q", 10.1, 125.0, Some(5.0), 20.0, 1.0),
      event("s1", 10.0, 125.1, Some(3.0), 20.0, 2.0),
      event("s2", 10.1, 125.1, Some(3.0), 20.0, 2.0),
      event("s3", 10.2, 125.1, Some(3.0), 20.0, 2.0),
    ];
    let seqs = detect(&events, 30.0, 1.0);
    assert_eq!(seqs.len(), 2);
    assert_eq!(seqs[0].mainshock.id, "p");
    assert_eq!(ids(&seqs[0]), ["s1", "s2", "s3"]);
    assert_eq!(ids(&seqs[1]), ["s1", "s2", "s3"]);
  }

  #[test]
  fn only_top_ten_candidates_are_considered() {
    let mut events: Vec<Event> = (0..11)
      .map(|i| event(&format!("big{i}"), 5.0 + f64::from(i), 120.0, Some(6.0 - f64::from(i) * 0.1), 30.0, 0.0))
      .collect();
    // Eleventh-strongest candidate (M5.0) has aftershocks, the rest do not.
    let last = events[10].clone();
    for k in 0..3 {
      events.push(event(&format!("af{k}"), last.latitude.unwrap(), 120.05, Some(3.0), 30.0, 1.0));
    }
    assert!(detect(&events, 30.0, 0.5).is_empty());
  }
}
