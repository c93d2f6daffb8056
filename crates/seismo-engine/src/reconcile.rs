//! Matching a run's candidates against the live insight set.
//!
//! The result is a [`Plan`]: the writes one run hands to the store. Planning
//! is pure, so the whole decision can be tested without a backend.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use seismo_core::{
  insight::{Insight, InsightKey, NewInsight},
  lifecycle::InsightRevision,
  run::{PlannedEvolution, PlannedInvalidation, PlannedRevision},
};

pub const REFRESH_REASON: &str = "refreshed by analysis";
pub const EXPIRY_REASON: &str = "expired";

#[derive(Debug, Default)]
pub struct Plan {
  pub creates:       Vec<NewInsight>,
  pub revisions:     Vec<PlannedRevision>,
  pub evolutions:    Vec<PlannedEvolution>,
  pub invalidations: Vec<PlannedInvalidation>,
  /// Candidates below the confidence threshold.
  pub discarded:     usize,
  /// Candidates dropped for a stronger one with the same key.
  pub superseded:    usize,
}

/// Reconcile `candidates` with `live` (non-invalidated) insights.
///
/// Candidates below `threshold` are discarded. Of several candidates with the
/// same key the most confident wins, the earliest on ties. A surviving
/// candidate revises its live match when the severity is unchanged, evolves
/// it when the severity moved, and is created otherwise. Live insights that
/// no candidate matched are invalidated once past `valid_until`.
pub fn plan(
  candidates: Vec<NewInsight>,
  live: &[Insight],
  threshold: f64,
  now: DateTime<Utc>,
) -> Plan {
  let mut out = Plan::default();

  let mut best: BTreeMap<InsightKey, NewInsight> = BTreeMap::new();
  for candidate in candidates {
    if candidate.confidence_score < threshold {
      out.discarded += 1;
      continue;
    }
    match best.get_mut(&candidate.key()) {
      Some(kept) => {
        out.superseded += 1;
        if candidate.confidence_score > kept.confidence_score {
          *kept = candidate;
        }
      }
      None => {
        best.insert(candidate.key(), candidate);
      }
    }
  }

  // `live` arrives most recently updated first; the first of a key wins.
  let mut by_key: HashMap<InsightKey, &Insight> = HashMap::new();
  for insight in live.iter().filter(|i| i.status.is_live()) {
    by_key.entry(insight.key()).or_insert(insight);
  }

  for (key, candidate) in best {
    match by_key.remove(&key) {
      None => out.creates.push(candidate),
      Some(current) if current.severity == candidate.severity => {
        out.revisions.push(PlannedRevision {
          insight_id:       current.id,
          expected_version: current.version,
          revision:         InsightRevision::from(candidate),
          reason:           REFRESH_REASON.to_owned(),
        });
      }
      Some(current) => {
        let reason =
          format!("severity changed from {} to {}", current.severity, candidate.severity);
        out.evolutions.push(PlannedEvolution {
          parent_id: current.id,
          expected_version: current.version,
          successor: candidate,
          reason,
        });
      }
    }
  }

  let unmatched: Vec<&Insight> = by_key.into_values().collect();
  out.invalidations = live
    .iter()
    .filter(|i| unmatched.iter().any(|u| u.id == i.id) && i.is_expired(now))
    .map(|i| PlannedInvalidation {
      insight_id:       i.id,
      expected_version: i.version,
      reason:           EXPIRY_REASON.to_owned(),
    })
    .collect();

  out
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};
  use seismo_core::insight::{InsightStatus, InsightType, Severity};
  use uuid::Uuid;

  use super::*;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap() }

  fn candidate(category: &str, region: &str, confidence: f64, severity: Severity) -> NewInsight {
    NewInsight {
      insight_type: InsightType::Pattern,
      category: category.into(),
      severity,
      title: format!("{category} in {region}"),
      description: String::new(),
      region: region.into(),
      location: None,
      latitude: None,
      longitude: None,
      confidence_score: confidence,
      supporting_data: serde_json::Value::Null,
      earthquake_count: 1,
      magnitude_range: None,
      depth_range: None,
      time_window_days: 7,
      valid_until: Some(now() + Duration::days(7)),
      generated_by: "test".into(),
      parent_insight_id: None,
    }
  }

  fn stored(input: NewInsight, valid_until: Option<DateTime<Utc>>) -> Insight {
    let mut i = Insight::from_new(Uuid::new_v4(), input, now() - Duration::days(10));
    i.valid_until = valid_until;
    i.version = 3;
    i
  }

  #[test]
  fn below_threshold_candidates_are_discarded() {
    let p = plan(
      vec![
        candidate("a", "Luzon", 0.5, Severity::Low),
        candidate("b", "Luzon", 0.6, Severity::Low),
      ],
      &[],
      0.6,
      now(),
    );
    assert_eq!(p.discarded, 1);
    assert_eq!(p.creates.len(), 1);
    assert_eq!(p.creates[0].category, "b");
  }

  #[test]
  fn duplicate_keys_keep_the_most_confident() {
    let mut first = candidate("a", "Luzon", 0.8, Severity::Low);
    first.title = "first".into();
    let mut tied = candidate("a", "Luzon", 0.8, Severity::Low);
    tied.title = "tied".into();
    let stronger = candidate("a", "Visayas", 0.7, Severity::Low);
    let mut best = candidate("a", "Visayas", 0.9, Severity::Low);
    best.title = "best".into();

    let p = plan(vec![first, tied, stronger, best], &[], 0.6, now());
    assert_eq!(p.superseded, 2);
    let titles: Vec<&str> = p.creates.iter().map(|c| c.title.as_str()).collect();
    assert_eq!(titles, ["first", "best"]);
  }

  #[test]
  fn matches_revise_or_evolve_by_severity() {
    let same = stored(candidate("a", "Luzon", 0.8, Severity::Low), None);
    let moved = stored(candidate("b", "Luzon", 0.8, Severity::Low), None);

    let p = plan(
      vec![
        candidate("a", "Luzon", 0.9, Severity::Low),
        candidate("b", "Luzon", 0.9, Severity::High),
      ],
      &[same.clone(), moved.clone()],
      0.6,
      now(),
    );

    assert!(p.creates.is_empty());
    assert_eq!(p.revisions.len(), 1);
    assert_eq!(p.revisions[0].insight_id, same.id);
    assert_eq!(p.revisions[0].expected_version, 3);
    assert_eq!(p.revisions[0].revision.confidence_score, 0.9);
    assert_eq!(p.evolutions.len(), 1);
    assert_eq!(p.evolutions[0].parent_id, moved.id);
    assert_eq!(p.evolutions[0].reason, "severity changed from low to high");
  }

  #[test]
  fn unmatched_expired_insights_are_invalidated() {
    let expired = stored(candidate("a", "Luzon", 0.8, Severity::Low), Some(now()));
    let fresh = stored(candidate("b", "Luzon", 0.8, Severity::Low), Some(now() + Duration::days(1)));
    let open_ended = stored(candidate("c", "Luzon", 0.8, Severity::Low), None);
    let mut dead = stored(candidate("d", "Luzon", 0.8, Severity::Low), Some(now()));
    dead.status = InsightStatus::Invalidated;
    // Expired but matched by a candidate: refreshed, not invalidated.
    let renewed = stored(candidate("e", "Luzon", 0.8, Severity::Low), Some(now()));

    let p = plan(
      vec![candidate("e", "Luzon", 0.8, Severity::Low)],
      &[expired.clone(), fresh, open_ended, dead, renewed.clone()],
      0.6,
      now(),
    );
    assert_eq!(p.invalidations.len(), 1);
    assert_eq!(p.invalidations[0].insight_id, expired.id);
    assert_eq!(p.invalidations[0].reason, EXPIRY_REASON);
    assert_eq!(p.revisions.len(), 1);
    assert_eq!(p.revisions[0].insight_id, renewed.id);
  }
}
