//! Radius-based spatial clustering.
//!
//! A single pass over the events in input order. A seed with enough
//! unvisited neighbours inside `eps_degrees` becomes a cluster together with
//! those neighbours, and every member is marked visited. A visited event
//! never seeds or joins another cluster, so this under-merges compared to
//! textbook DBSCAN (no density-connectivity expansion). O(n²); the feed
//! delivers at most a few hundred events per run.

use seismo_core::event::{Event, Region, degree_distance};
use serde::Serialize;

use crate::{mean, min_max};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
  pub centroid_latitude:  f64,
  pub centroid_longitude: f64,
  /// Seed first, then neighbours in input order.
  pub member_ids:         Vec<String>,
  pub min_magnitude:      f64,
  pub max_magnitude:      f64,
  /// Region of the centroid.
  pub region:             Region,
}

impl Cluster {
  pub fn member_count(&self) -> usize { self.member_ids.len() }
}

struct Point<'a> {
  event:     &'a Event,
  at:        (f64, f64),
  magnitude: f64,
}

/// Group nearby events. Events without a magnitude or without coordinates
/// take no part. `min_samples` counts the seed itself.
pub fn cluster(events: &[Event], eps_degrees: f64, min_samples: usize) -> Vec<Cluster> {
  let points: Vec<Point<'_>> = events
    .iter()
    .filter_map(|e| Some(Point { event: e, at: e.coordinates()?, magnitude: e.magnitude? }))
    .collect();

  let mut visited = vec![false; points.len()];
  let mut clusters = Vec::new();

  for seed in 0..points.len() {
    if visited[seed] {
      continue;
    }
    let origin = points[seed].at;
    let neighbours: Vec<usize> = (0..points.len())
      .filter(|&j| j != seed && !visited[j])
      .filter(|&j| degree_distance(origin, points[j].at) <= eps_degrees)
      .collect();

    // neighbours ≥ min_samples − 1, without underflow for min_samples = 0.
    if neighbours.len() + 1 < min_samples {
      continue;
    }

    let members: Vec<usize> = std::iter::once(seed).chain(neighbours).collect();
    for &m in &members {
      visited[m] = true;
    }

    let lat = mean(members.iter().map(|&m| points[m].at.0)).unwrap_or(origin.0);
    let lon = mean(members.iter().map(|&m| points[m].at.1)).unwrap_or(origin.1);
    let seed_mag = points[seed].magnitude;
    let (min_mag, max_mag) =
      min_max(members.iter().map(|&m| points[m].magnitude)).unwrap_or((seed_mag, seed_mag));

    clusters.push(Cluster {
      centroid_latitude:  lat,
      centroid_longitude: lon,
      member_ids:         members.iter().map(|&m| points[m].event.id.clone()).collect(),
      min_magnitude:      min_mag,
      max_magnitude:      max_mag,
      region:             Region::classify(Some(lat), Some(lon)),
    });
  }

  clusters
}

#[cfg(test)]
mod tests {
  use std::collections::HashSet;

  use super::*;
  use crate::testutil::event;

  #[test]
  fn empty_input_yields_no_clusters() {
    assert!(cluster(&[], 0.5, 3).is_empty());
  }

  #[test]
  fn twelve_tight_events_form_one_cluster() {
    let events: Vec<Event> = (0..12)
      .map(|i| {
        let off = f64::from(i) * 0.004;
        event(&format!("e{i}"), 12.0 + off, 124.0 + off, Some(3.0 + f64::from(i) * 0.1), 15.0, 0.0)
      })
      .collect();

    let clusters = cluster(&events, 0.1, 3);
    assert_eq!(clusters.len(), 1);
    let c = &clusters[0];
    assert_eq!(c.member_count(), 12);
    assert_eq!(c.region, Region::Visayas);
    assert!((c.min_magnitude - 3.0).abs() < 1e-9);
    assert!((c.max_magnitude - 4.1).abs() < 1e-9);
    assert!((c.centroid_latitude - 12.022).abs() < 1e-9);
  }

  #[test]
  fn null_magnitudes_are_ignored() {
    let events = vec![
      event("a", 12.0, 124.0, Some(3.0), 10.0, 0.0),
      event("b", 12.01, 124.0, None, 10.0, 0.0),
      event("c", 12.02, 124.0, None, 10.0, 0.0),
    ];
    assert!(cluster(&events, 0.1, 3).is_empty());
    let clusters = cluster(&events, 0.1, 1);
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].member_ids, ["a"]);
  }

  #[test]
  fn visited_events_never_join_a_second_cluster() {
    // b sits between two groups and is claimed by the first seed.
    let events = vec![
      event("a", 10.0, 120.0, Some(3.0), 10.0, 0.0),
      event("b", 10.0, 120.4, Some(3.0), 10.0, 0.0),
      event("x", 10.0, 119.7, Some(3.0), 10.0, 0.0),
      event("c", 10.0, 120.8, Some(3.0), 10.0, 0.0),
      event("d", 10.0, 121.0, Some(3.0), 10.0, 0.0),
    ];
    let clusters = cluster(&events, 0.45, 3);
    assert_eq!(clusters.len(), 1);
    assert_eq!(clusters[0].member_ids, ["a", "b", "x"]);
    // c and d would need b to reach three members.

    let mut seen = HashSet::new();
    for c in &clusters {
      for id in &c.member_ids {
        assert!(seen.insert(id.clone()), "{id} appears in two clusters");
      }
    }
  }

  #[test]
  fn clusters_are_disjoint_on_a_dense_grid() {
    let mut events = Vec::new();
    for i in 0..10 {
      for j in 0..10 {
        let id = format!("g{i}-{j}");
        events.push(event(&id, 5.0 + f64::from(i) * 0.1, 125.0 + f64::from(j) * 0.1, Some(3.5), 20.0, 0.0));
      }
    }
    let clusters = cluster(&events, 0.15, 3);
    assert!(!clusters.is_empty());
    let mut seen = HashSet::new();
    for c in &clusters {
      for id in &c.member_ids {
        assert!(seen.insert(id.clone()), "{id} appears in two clusters");
      }
    }
  }
}
