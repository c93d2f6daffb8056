//! Pure analyzers over a normalized event set.
//!
//! Every function here is a deterministic function of its inputs: no I/O, no
//! clock reads, no shared state. The engine runs them per region on
//! independent read-only slices.
//!
//! The algorithms are heuristics kept simple enough to explain in an insight
//! description. They make no claim of predictive validity.

pub mod cluster;
pub mod magnitude;
pub mod proximity;
pub mod risk;
pub mod sequence;
pub mod trend;
pub mod yearly;

use std::collections::BTreeMap;

use seismo_core::event::{Event, Region};

pub use cluster::Cluster;
pub use proximity::{PointOfInterest, ProximityStats};
pub use risk::{RiskLevel, RiskScore};
pub use sequence::Sequence;
pub use trend::{Trend, TrendReport};

/// Partition events by region, preserving input order within each region.
pub fn group_by_region(events: &[Event]) -> BTreeMap<Region, Vec<Event>> {
  let mut out: BTreeMap<Region, Vec<Event>> = BTreeMap::new();
  for event in events {
    out.entry(event.region).or_default().push(event.clone());
  }
  out
}

/// Known magnitudes, in input order.
pub fn magnitudes(events: &[Event]) -> Vec<f64> {
  events.iter().filter_map(|e| e.magnitude).collect()
}

/// Arithmetic mean; `None` for an empty input.
pub(crate) fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
  let (sum, n) = values.into_iter().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
  (n > 0).then(|| sum / n as f64)
}

/// `(min, max)` of the values; `None` for an empty input.
pub(crate) fn min_max(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
  values.into_iter().fold(None, |acc, v| match acc {
    None => Some((v, v)),
    Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
  })
}
