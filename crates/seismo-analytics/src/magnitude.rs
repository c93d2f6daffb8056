//! Magnitude statistics: Gutenberg–Richter b-value and descriptive
//! distributions.

use std::collections::BTreeMap;

use seismo_core::event::{DepthClass, Event, MagnitudeClass};
use serde::Serialize;
use strum::IntoEnumIterator;

use crate::{mean, min_max};

/// Magnitude of completeness assumed for the b-value estimate.
pub const B_VALUE_MIN_MAGNITUDE: f64 = 3.0;
/// Fewer filtered samples than this and the estimate is unavailable.
pub const B_VALUE_MIN_SAMPLES: usize = 10;

// mean − min below this is treated as zero spread.
const SPREAD_EPSILON: f64 = 1e-9;

/// Method-of-moments b-value, `1 / ((mean − min) · ln 10)`, over magnitudes
/// ≥ [`B_VALUE_MIN_MAGNITUDE`].
///
/// This is a simplified estimator for descriptive use, not Aki's
/// maximum-likelihood estimate (which uses the completeness magnitude and a
/// binning correction instead of the sample minimum). Returns `None` with
/// fewer than [`B_VALUE_MIN_SAMPLES`] samples or when every sample is equal.
pub fn b_value(magnitudes: &[f64]) -> Option<f64> {
  let filtered: Vec<f64> = magnitudes
    .iter()
    .copied()
    .filter(|m| m.is_finite() && *m >= B_VALUE_MIN_MAGNITUDE)
    .collect();
  if filtered.len() < B_VALUE_MIN_SAMPLES {
    return None;
  }

  let avg = mean(filtered.iter().copied())?;
  let (min, _) = min_max(filtered.iter().copied())?;
  let spread = avg - min;
  if spread <= SPREAD_EPSILON {
    return None;
  }

  let b = 1.0 / (spread * std::f64::consts::LN_10);
  b.is_finite().then_some(b)
}

/// Descriptive summary of an event set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MagnitudeSummary {
  pub event_count:            usize,
  /// Events with a known magnitude.
  pub measured_count:         usize,
  pub min_magnitude:          Option<f64>,
  pub max_magnitude:          Option<f64>,
  pub average_magnitude:      Option<f64>,
  pub min_depth_km:           Option<f64>,
  pub max_depth_km:           Option<f64>,
  pub average_depth_km:       Option<f64>,
  pub significant_count:      usize,
  pub total_energy_joules:    f64,
  pub magnitude_distribution: BTreeMap<MagnitudeClass, usize>,
  pub depth_distribution:     BTreeMap<DepthClass, usize>,
  pub b_value:                Option<f64>,
}

pub fn summarize(events: &[Event]) -> MagnitudeSummary {
  let mags = crate::magnitudes(events);
  let depths: Vec<f64> = events.iter().map(|e| e.depth_km).collect();

  let mut magnitude_distribution: BTreeMap<MagnitudeClass, usize> =
    MagnitudeClass::iter().map(|c| (c, 0)).collect();
  for &m in &mags {
    *magnitude_distribution.entry(MagnitudeClass::of(m)).or_default() += 1;
  }

  let mut depth_distribution: BTreeMap<DepthClass, usize> =
    DepthClass::iter().map(|c| (c, 0)).collect();
  for e in events {
    *depth_distribution.entry(e.depth_class()).or_default() += 1;
  }

  let mag_range = min_max(mags.iter().copied());
  let depth_range = min_max(depths.iter().copied());

  MagnitudeSummary {
    event_count: events.len(),
    measured_count: mags.len(),
    min_magnitude: mag_range.map(|r| r.0),
    max_magnitude: mag_range.map(|r| r.1),
    average_magnitude: mean(mags.iter().copied()),
    min_depth_km: depth_range.map(|r| r.0),
    max_depth_km: depth_range.map(|r| r.1),
    average_depth_km: mean(depths.iter().copied()),
    significant_count: events.iter().filter(|e| e.is_significant()).count(),
    total_energy_joules: events.iter().map(|e| e.energy_joules).sum(),
    magnitude_distribution,
    depth_distribution,
    b_value: b_value(&mags),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::testutil::event;

  #[test]
  fn too_few_samples_is_unavailable() {
    assert_eq!(b_value(&[]), None);
    assert_eq!(b_value(&[3.5; 9]), None);
    // Sub-threshold magnitudes do not count toward the minimum.
    let mut mags = vec![2.0; 20];
    mags.extend([3.1, 3.4, 3.9]);
    assert_eq!(b_value(&mags), None);
  }

  #[test]
  fn identical_magnitudes_are_unavailable() {
    assert_eq!(b_value(&[3.0; 15]), None);
    assert_eq!(b_value(&[3.1; 15]), None);
  }

  #[test]
  fn estimator_matches_closed_form() {
    // mean 3.5, min 3.0 → b = 1 / (0.5 · ln 10) ≈ 0.8686
    let mags = [3.0, 4.0, 3.0, 4.0, 3.0, 4.0, 3.0, 4.0, 3.0, 4.0];
    let b = b_value(&mags).unwrap();
    assert!((b - 1.0 / (0.5 * std::f64::consts::LN_10)).abs() < 1e-12);
    assert!(!b.is_nan());
  }

  #[test]
  fn non_finite_input_never_yields_nan() {
    let mut mags = vec![f64::NAN; 12];
    mags.extend([3.0, 3.2]);
    assert_eq!(b_value(&mags), None);
  }

  #[test]
  fn summary_distributions_cover_every_class() {
    let events = vec![
      event("a", 12.0, 123.0, Some(2.5), 5.0, 0.0),
      event("b", 12.0, 123.0, Some(4.5), 35.0, 0.0),
      event("c", 12.0, 123.0, None, 320.0, 0.0),
      event("d", 12.0, 123.0, Some(6.1), 12.0, 0.0),
    ];
    let s = summarize(&events);
    assert_eq!(s.event_count, 4);
    assert_eq!(s.measured_count, 3);
    assert_eq!(s.min_magnitude, Some(2.5));
    assert_eq!(s.max_magnitude, Some(6.1));
    assert_eq!(s.min_depth_km, Some(5.0));
    assert_eq!(s.max_depth_km, Some(320.0));
    assert_eq!(s.significant_count, 2);
    assert_eq!(s.magnitude_distribution.len(), 7);
    assert_eq!(s.magnitude_distribution[&MagnitudeClass::Micro], 1);
    assert_eq!(s.magnitude_distribution[&MagnitudeClass::Light], 1);
    assert_eq!(s.magnitude_distribution[&MagnitudeClass::Strong], 1);
    assert_eq!(s.magnitude_distribution[&MagnitudeClass::Great], 0);
    assert_eq!(s.depth_distribution[&DepthClass::Deep], 1);
    assert_eq!(s.depth_distribution[&DepthClass::Moderate], 1);
    assert_eq!(s.b_value, None);
    assert!(s.total_energy_joules > 0.0);
  }
}
