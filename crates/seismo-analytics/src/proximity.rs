//! Correlation of events with named points of interest.

use std::collections::BTreeMap;

use seismo_core::event::{Event, degree_distance};
use serde::{Deserialize, Serialize};

use crate::mean;

/// Events within this many degrees of a point are attributed to it.
pub const DEFAULT_THRESHOLD_DEGREES: f64 = 0.5;
/// Magnitude counted as a strong local event (inclusive).
pub const STRONG_MAGNITUDE: f64 = 4.0;

/// A named location, e.g. a volcano or a fault segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
  pub name:      String,
  pub latitude:  f64,
  pub longitude: f64,
}

impl PointOfInterest {
  pub fn new(name: impl Into<String>, latitude: f64, longitude: f64) -> Self {
    Self { name: name.into(), latitude, longitude }
  }

  pub fn coordinates(&self) -> (f64, f64) { (self.latitude, self.longitude) }
}

/// Activity attributed to one point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProximityStats {
  pub count:             usize,
  pub max_magnitude:     Option<f64>,
  pub average_magnitude: Option<f64>,
  pub strong_count:      usize,
  /// In input order.
  pub event_ids:         Vec<String>,
}

/// Per-point statistics keyed by point name. Points with no nearby event are
/// omitted. An event near two points counts for both.
pub fn correlate(
  events: &[Event],
  points: &[PointOfInterest],
  threshold_degrees: f64,
) -> BTreeMap<String, ProximityStats> {
  let mut out = BTreeMap::new();

  for point in points {
    let near: Vec<&Event> = events
      .iter()
      .filter(|e| {
        e.coordinates()
          .is_some_and(|at| degree_distance(point.coordinates(), at) <= threshold_degrees)
      })
      .collect();
    if near.is_empty() {
      continue;
    }

    let mags = near.iter().filter_map(|e| e.magnitude);
    out.insert(point.name.clone(), ProximityStats {
      count:             near.len(),
      max_magnitude:     mags.clone().reduce(f64::max),
      average_magnitude: mean(mags.clone()),
      strong_count:      mags.filter(|&m| m >= STRONG_MAGNITUDE).count(),
      event_ids:         near.iter().map(|e| e.id.clone()).collect(),
    });
  }

  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testutil::event;

  fn taal() -> PointOfInterest { PointOfInterest::new("Taal", 14.0, 121.0) }
  fn mayon() -> PointOfInterest { PointOfInterest::new("Mayon", 13.26, 123.69) }

  #[test]
  fn attributes_nearby_events_and_omits_quiet_points() {
    let events = vec![
      event("a", 14.1, 121.1, Some(3.0), 5.0, 0.0),
      event("b", 13.8, 120.9, Some(4.2), 5.0, 1.0),
      event("c", 14.0, 121.0, None, 5.0, 2.0),
      event("far", 16.0, 121.0, Some(5.0), 5.0, 0.0),
    ];

    let stats = correlate(&events, &[taal(), mayon()], DEFAULT_THRESHOLD_DEGREES);
    assert_eq!(stats.len(), 1);
    let taal = &stats["Taal"];
    assert_eq!(taal.count, 3);
    assert_eq!(taal.event_ids, ["a", "b", "c"]);
    assert_eq!(taal.max_magnitude, Some(4.2));
    assert!((taal.average_magnitude.unwrap() - 3.6).abs() < 1e-9);
    assert_eq!(taal.strong_count, 1);
  }

  #[test]
  fn threshold_is_inclusive() {
    let events = vec![event("edge", 14.5, 121.0, Some(3.0), 5.0, 0.0)];
    assert_eq!(correlate(&events, &[taal()], 0.5)["Taal"].count, 1);
    assert!(correlate(&events, &[taal()], 0.49).is_empty());
  }

  #[test]
  fn unlocated_events_are_ignored() {
    let mut e = event("x", 14.0, 121.0, Some(3.0), 5.0, 0.0);
    e.latitude = None;
    assert!(correlate(&[e], &[taal()], 0.5).is_empty());
  }

  #[test]
  fn points_deserialize_from_config() {
    let json = r#"[{"name":"Pinatubo","latitude":15.13,"longitude":120.35}]"#;
    let points: Vec<PointOfInterest> = serde_json::from_str(json).unwrap();
    assert_eq!(points, [PointOfInterest::new("Pinatubo", 15.13, 120.35)]);
  }
}
