//! Candidate insights derived from an event set.
//!
//! Each detector turns analyzer output into a [`NewInsight`] carrying its
//! confidence. Titles and descriptions are built from computed values only.
//! Nothing here reads the clock or touches the store: `now` arrives through
//! [`AnalysisContext`].

use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};
use seismo_analytics::{
  PointOfInterest, RiskLevel, Trend, cluster, magnitude, proximity, risk, sequence, trend,
};
use seismo_core::{
  event::{Event, Region},
  insight::{InsightType, NewInsight, Severity},
};
use serde_json::json;

// ─── Tunables ────────────────────────────────────────────────────────────────

/// Regions with fewer events than this produce no pattern candidates.
const MIN_REGIONAL_EVENTS: usize = 5;

const ACTIVITY_WINDOW_DAYS: i64 = 7;
const ACTIVITY_MIN_RECENT: usize = 10;
const ACTIVITY_GROWTH: f64 = 1.5;

const SHALLOW_CLUSTER_MIN_EVENTS: usize = 5;

const ANOMALY_MIN_MAGNITUDE: f64 = 5.0;
const ANOMALY_MAX_DEPTH_KM: f64 = 5.0;

const RISK_WINDOW_DAYS: i64 = 14;

const TEMPORAL_MIN_EVENTS: usize = 20;
/// Hours are read in Philippine Standard Time.
const LOCAL_UTC_OFFSET_SECONDS: i32 = 8 * 3600;
const NIGHT_STARTS_AT: u32 = 20;
const NIGHT_ENDS_AT: u32 = 6;

const CLUSTER_WINDOW_DAYS: i64 = 30;
const CLUSTER_EPS_DEGREES: f64 = 0.3;
const CLUSTER_MIN_SAMPLES: usize = 5;
/// Cluster candidates are keyed by the grid cell of their centroid.
const CLUSTER_CELL_DEGREES: f64 = 0.5;

const LOW_B_VALUE: f64 = 0.8;

const PROXIMITY_WINDOW_DAYS: i64 = 30;
const PROXIMITY_MIN_EVENTS: usize = 3;

/// At most this many event ids are embedded in `supporting_data`.
const SUPPORTING_ID_LIMIT: usize = 10;

/// The region label for findings that span the whole feed.
pub const NATIONWIDE: &str = "Philippines";

// ─── Context ─────────────────────────────────────────────────────────────────

/// Inputs shared by every detector in one run.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
  pub now:    DateTime<Utc>,
  /// Recorded as `generated_by`.
  pub model:  String,
  pub points: Vec<PointOfInterest>,
}

impl AnalysisContext {
  fn draft(&self, insight_type: InsightType, category: &str, region: impl Into<String>) -> NewInsight {
    NewInsight {
      insight_type,
      category: category.to_owned(),
      severity: Severity::Low,
      title: String::new(),
      description: String::new(),
      region: region.into(),
      location: None,
      latitude: None,
      longitude: None,
      confidence_score: 0.0,
      supporting_data: serde_json::Value::Null,
      earthquake_count: 0,
      magnitude_range: None,
      depth_range: None,
      time_window_days: 0,
      valid_until: None,
      generated_by: self.model.clone(),
      parent_insight_id: None,
    }
  }

  fn valid_for(&self, days: i64) -> Option<DateTime<Utc>> { Some(self.now + Duration::days(days)) }

  /// Events no older than `days` (future-dated events included).
  fn within(&self, events: &[Event], days: i64) -> Vec<Event> {
    let since = self.now - Duration::days(days);
    events.iter().filter(|e| e.time >= since).cloned().collect()
  }

  /// Events older than `from_days` and no older than `to_days`.
  fn aged(&self, events: &[Event], from_days: i64, to_days: i64) -> Vec<Event> {
    let newest = self.now - Duration::days(from_days);
    let oldest = self.now - Duration::days(to_days);
    events.iter().filter(|e| e.time < newest && e.time >= oldest).cloned().collect()
  }
}

// ─── Entry points ────────────────────────────────────────────────────────────

/// Candidates computed from one region's events.
pub fn regional(region: Region, events: &[Event], ctx: &AnalysisContext) -> Vec<NewInsight> {
  let mut out = Vec::new();
  if events.len() >= MIN_REGIONAL_EVENTS {
    out.extend(activity_increase(region, events, ctx));
    out.extend(shallow_clustering(region, events, ctx));
  }
  out.extend(regional_risk(region, events, ctx));
  out.extend(spatial_clusters(events, ctx));
  out.extend(aftershock_sequences(region, events, ctx));
  out.extend(rising_trend(region, events, ctx));
  out.extend(low_b_value(region, events, ctx));
  out
}

/// Candidates computed from the whole feed.
pub fn nationwide(events: &[Event], ctx: &AnalysisContext) -> Vec<NewInsight> {
  let mut out = shallow_strong_anomalies(events, ctx);
  out.extend(temporal_distribution(events, ctx));
  out.extend(volcanic_proximity(events, ctx));
  out
}

// ─── Formatting helpers ──────────────────────────────────────────────────────

fn ids(events: &[Event], limit: usize) -> Vec<&str> {
  events.iter().take(limit).map(|e| e.id.as_str()).collect()
}

fn magnitude_range(events: &[Event]) -> Option<String> {
  let mut mags = events.iter().filter_map(|e| e.magnitude);
  let first = mags.next()?;
  let (lo, hi) = mags.fold((first, first), |(lo, hi), m| (lo.min(m), hi.max(m)));
  Some(if lo == hi { format!("M{lo:.1}") } else { format!("M{lo:.1} - M{hi:.1}") })
}

fn depth_range(events: &[Event]) -> Option<String> {
  let mut depths = events.iter().map(|e| e.depth_km);
  let first = depths.next()?;
  let (lo, hi) = depths.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
  Some(format!("{lo:.1}km - {hi:.1}km"))
}

fn max_magnitude(events: &[Event]) -> f64 {
  events.iter().filter_map(|e| e.magnitude).reduce(f64::max).unwrap_or(0.0)
}

fn count_u32(n: usize) -> u32 { u32::try_from(n).unwrap_or(u32::MAX) }

// ─── Regional detectors ──────────────────────────────────────────────────────

fn activity_increase(region: Region, events: &[Event], ctx: &AnalysisContext) -> Option<NewInsight> {
  let recent = ctx.within(events, ACTIVITY_WINDOW_DAYS);
  let previous = ctx.aged(events, ACTIVITY_WINDOW_DAYS, 2 * ACTIVITY_WINDOW_DAYS);
  let (n, p) = (recent.len(), previous.len());
  if (n as f64) <= p as f64 * ACTIVITY_GROWTH || n < ACTIVITY_MIN_RECENT {
    return None;
  }

  let mags: Vec<f64> = recent.iter().filter_map(|e| e.magnitude).collect();
  let avg = if mags.is_empty() { 0.0 } else { mags.iter().sum::<f64>() / mags.len() as f64 };
  let max = max_magnitude(&recent);
  let change = if p == 0 {
    "with none the previous week".to_owned()
  } else {
    format!("up {:.0}% from the previous week", (n - p) as f64 / p as f64 * 100.0)
  };

  Some(NewInsight {
    severity: Severity::from_activity(max, n),
    title: format!("Increased Seismic Activity in {region}"),
    description: format!(
      "{region} has experienced {n} earthquakes in the past 7 days, {change}. Average \
       magnitude: M{avg:.1}, maximum: M{max:.1}. This elevated activity warrants continued \
       monitoring."
    ),
    confidence_score: (0.7 + n as f64 / 50.0).min(0.95),
    supporting_data: json!({
      "recent_count": n,
      "previous_count": p,
      "earthquake_ids": ids(&recent, SUPPORTING_ID_LIMIT),
    }),
    earthquake_count: count_u32(n),
    magnitude_range: magnitude_range(&recent),
    time_window_days: 7,
    valid_until: ctx.valid_for(7),
    ..ctx.draft(InsightType::Pattern, "increasing_activity", region.to_string())
  })
}

fn shallow_clustering(region: Region, events: &[Event], ctx: &AnalysisContext) -> Option<NewInsight> {
  let shallow: Vec<Event> = ctx
    .within(events, ACTIVITY_WINDOW_DAYS)
    .into_iter()
    .filter(|e| e.depth_km < 10.0)
    .collect();
  if shallow.len() < SHALLOW_CLUSTER_MIN_EVENTS {
    return None;
  }

  let n = shallow.len();
  Some(NewInsight {
    severity: Severity::Moderate,
    title: format!("Shallow Earthquake Cluster in {region}"),
    description: format!(
      "{n} shallow earthquakes (depth < 10km) detected in {region} within 7 days. Shallow \
       earthquakes have higher potential for surface damage."
    ),
    confidence_score: 0.75,
    supporting_data: json!({
      "shallow_count": n,
      "earthquake_ids": ids(&shallow, n),
    }),
    earthquake_count: count_u32(n),
    magnitude_range: magnitude_range(&shallow),
    depth_range: depth_range(&shallow),
    time_window_days: 7,
    valid_until: ctx.valid_for(5),
    ..ctx.draft(InsightType::Pattern, "shallow_clustering", region.to_string())
  })
}

fn regional_risk(region: Region, events: &[Event], ctx: &AnalysisContext) -> Option<NewInsight> {
  let recent = ctx.within(events, RISK_WINDOW_DAYS);
  if recent.is_empty() {
    return None;
  }
  let assessed = risk::score(region, &recent);
  let (severity, label) = match assessed.level {
    RiskLevel::High => (Severity::High, "High"),
    RiskLevel::Elevated => (Severity::Moderate, "Elevated"),
    RiskLevel::Moderate | RiskLevel::Low => return None,
  };
  let f = &assessed.factors;

  Some(NewInsight {
    severity,
    title: format!("{label} Seismic Risk in {region}"),
    description: format!(
      "Based on the last 14 days, {region} has {} seismic risk. Factors: {} significant \
       earthquakes (M≥4.5), {:.0}% shallow events, average magnitude M{:.1}. Risk score: \
       {:.0}/100.",
      assessed.level,
      f.significant_count,
      f.shallow_ratio * 100.0,
      f.average_magnitude,
      assessed.score,
    ),
    confidence_score: 0.70,
    supporting_data: json!({
      "risk_score": assessed.score,
      "level": assessed.level,
      "factors": f,
    }),
    earthquake_count: count_u32(recent.len()),
    magnitude_range: magnitude_range(&recent),
    time_window_days: 14,
    valid_until: ctx.valid_for(7),
    ..ctx.draft(InsightType::Risk, "regional_risk_assessment", region.to_string())
  })
}

fn grid_cell(latitude: f64, longitude: f64) -> String {
  let snap = |v: f64| (v / CLUSTER_CELL_DEGREES).floor() * CLUSTER_CELL_DEGREES;
  format!("cell {:.1},{:.1}", snap(latitude), snap(longitude))
}

fn spatial_clusters(events: &[Event], ctx: &AnalysisContext) -> Vec<NewInsight> {
  let recent = ctx.within(events, CLUSTER_WINDOW_DAYS);
  cluster::cluster(&recent, CLUSTER_EPS_DEGREES, CLUSTER_MIN_SAMPLES)
    .into_iter()
    .map(|c| {
      let n = c.member_count();
      let region = c.region;
      NewInsight {
        severity: Severity::from_activity(c.max_magnitude, n),
        title: format!("Earthquake Cluster of {n} Events in {region}"),
        description: format!(
          "{n} earthquakes within {CLUSTER_EPS_DEGREES}° of ({:.2}, {:.2}) over the last 30 days, \
           magnitudes M{:.1} to M{:.1}.",
          c.centroid_latitude, c.centroid_longitude, c.min_magnitude, c.max_magnitude,
        ),
        location: Some(grid_cell(c.centroid_latitude, c.centroid_longitude)),
        latitude: Some(c.centroid_latitude),
        longitude: Some(c.centroid_longitude),
        confidence_score: (0.6 + n as f64 / 50.0).min(0.9),
        supporting_data: json!({
          "member_count": n,
          "earthquake_ids": c.member_ids.iter().take(SUPPORTING_ID_LIMIT).collect::<Vec<_>>(),
        }),
        earthquake_count: count_u32(n),
        magnitude_range: Some(format!("M{:.1} - M{:.1}", c.min_magnitude, c.max_magnitude)),
        time_window_days: 30,
        valid_until: ctx.valid_for(7),
        ..ctx.draft(InsightType::Pattern, "spatial_cluster", region.to_string())
      }
    })
    .collect()
}

fn aftershock_sequences(region: Region, events: &[Event], ctx: &AnalysisContext) -> Vec<NewInsight> {
  sequence::detect(
    events,
    sequence::DEFAULT_TIME_WINDOW_DAYS,
    sequence::DEFAULT_DISTANCE_THRESHOLD_DEGREES,
  )
  .into_iter()
  .map(|s| {
    let n = s.aftershock_count();
    let main = &s.mainshock;
    let main_mag = main.magnitude.unwrap_or(0.0);
    let largest = s.largest_aftershock().unwrap_or(0.0);
    let place = main.place.as_deref().unwrap_or("an unnamed location");
    NewInsight {
      severity: Severity::from_activity(main_mag, n + 1),
      title: format!("Aftershock Sequence Following M{main_mag:.1} in {region}"),
      description: format!(
        "A M{main_mag:.1} mainshock near {place} was followed by {n} aftershocks over {:.1} \
         days; the largest was M{largest:.1}.",
        s.duration_days(),
      ),
      location: Some(format!("mainshock {}", main.id)),
      latitude: main.latitude,
      longitude: main.longitude,
      confidence_score: (0.65 + n as f64 / 40.0).min(0.9),
      supporting_data: json!({
        "mainshock_id": main.id,
        "aftershock_count": n,
        "duration_days": s.duration_days(),
        "earthquake_ids": ids(&s.aftershocks, SUPPORTING_ID_LIMIT),
      }),
      earthquake_count: count_u32(n + 1),
      magnitude_range: Some(format!("M{largest:.1} - M{main_mag:.1}")),
      time_window_days: 30,
      valid_until: ctx.valid_for(7),
      ..ctx.draft(InsightType::Pattern, "aftershock_sequence", region.to_string())
    }
  })
  .collect()
}

fn rising_trend(region: Region, events: &[Event], ctx: &AnalysisContext) -> Option<NewInsight> {
  let report = trend::analyze(events, ctx.now, trend::DEFAULT_PERIOD_DAYS, trend::DEFAULT_SEGMENT_DAYS);
  if report.overall_trend != Trend::Increasing {
    return None;
  }
  let first = report.segments.first()?.count;
  let last = report.segments.last()?.count;
  let ratio = report.change_ratio();
  let counts: Vec<usize> = report.segments.iter().map(|s| s.count).collect();

  Some(NewInsight {
    severity: if ratio.is_none_or(|r| r >= 2.0) { Severity::Moderate } else { Severity::Low },
    title: format!("Rising Earthquake Trend in {region}"),
    description: format!(
      "Monthly event counts in {region} rose from {first} to {last} over the last 90 days."
    ),
    confidence_score: (0.5 + last as f64 / 100.0).min(0.8),
    supporting_data: json!({
      "segment_counts": counts,
      "change_ratio": ratio,
      "trend": report.overall_trend,
    }),
    earthquake_count: count_u32(counts.iter().sum()),
    time_window_days: trend::DEFAULT_PERIOD_DAYS,
    valid_until: ctx.valid_for(7),
    ..ctx.draft(InsightType::Pattern, "rising_trend", region.to_string())
  })
}

fn low_b_value(region: Region, events: &[Event], ctx: &AnalysisContext) -> Option<NewInsight> {
  let window = ctx.within(events, i64::from(trend::DEFAULT_PERIOD_DAYS));
  let mags = seismo_analytics::magnitudes(&window);
  let b = magnitude::b_value(&mags)?;
  if b >= LOW_B_VALUE {
    return None;
  }
  let samples = mags.iter().filter(|&&m| m >= magnitude::B_VALUE_MIN_MAGNITUDE).count();

  Some(NewInsight {
    severity: Severity::Moderate,
    title: format!("Low b-value in {region}"),
    description: format!(
      "The magnitude distribution in {region} over 90 days gives b = {b:.2} from {samples} \
       events of M3.0 or larger, below the typical value of about 1.0. A low b-value means a \
       larger share of stronger events."
    ),
    confidence_score: (0.5 + samples as f64 / 200.0).min(0.75),
    supporting_data: json!({ "b_value": b, "samples": samples }),
    earthquake_count: count_u32(samples),
    magnitude_range: magnitude_range(&window),
    time_window_days: trend::DEFAULT_PERIOD_DAYS,
    valid_until: ctx.valid_for(7),
    ..ctx.draft(InsightType::Anomaly, "low_b_value", region.to_string())
  })
}

// ─── Nationwide detectors ────────────────────────────────────────────────────

fn shallow_strong_anomalies(events: &[Event], ctx: &AnalysisContext) -> Vec<NewInsight> {
  events
    .iter()
    .filter_map(|e| {
      let mag = e.magnitude.filter(|&m| m >= ANOMALY_MIN_MAGNITUDE)?;
      if e.depth_km >= ANOMALY_MAX_DEPTH_KM {
        return None;
      }
      let place = e.place.as_deref().unwrap_or("an unnamed location");
      Some(NewInsight {
        severity: if mag >= 6.0 { Severity::High } else { Severity::Moderate },
        title: format!("Unusually Shallow M{mag:.1} Earthquake"),
        description: format!(
          "A magnitude {mag:.1} earthquake at only {:.1}km depth occurred near {place}. \
           Shallow strong events may produce stronger ground shaking than typical; \
           aftershocks are likely.",
          e.depth_km,
        ),
        // Place text is not unique per event; the id is.
        location: Some(format!("event {}", e.id)),
        latitude: e.latitude,
        longitude: e.longitude,
        confidence_score: 0.85,
        supporting_data: json!({ "earthquake_id": e.id, "place": e.place, "time": e.time }),
        earthquake_count: 1,
        magnitude_range: Some(format!("M{mag:.1}")),
        depth_range: Some(format!("{:.1}km", e.depth_km)),
        time_window_days: 1,
        valid_until: ctx.valid_for(3),
        ..ctx.draft(InsightType::Anomaly, "unusual_shallow_strong", e.region.to_string())
      })
    })
    .collect()
}

fn is_night(time: DateTime<Utc>) -> bool {
  let hour = match FixedOffset::east_opt(LOCAL_UTC_OFFSET_SECONDS) {
    Some(offset) => time.with_timezone(&offset).hour(),
    None => time.hour(),
  };
  !(NIGHT_ENDS_AT..NIGHT_STARTS_AT).contains(&hour)
}

fn temporal_distribution(events: &[Event], ctx: &AnalysisContext) -> Option<NewInsight> {
  if events.len() < TEMPORAL_MIN_EVENTS {
    return None;
  }
  let night = events.iter().filter(|e| is_night(e.time)).count();
  let day = events.len() - night;
  let night_pct = night as f64 / events.len() as f64 * 100.0;
  if (40.0..=60.0).contains(&night_pct) {
    return None;
  }

  Some(NewInsight {
    severity: Severity::Low,
    title: "Temporal Distribution Pattern Observed".to_owned(),
    description: format!(
      "Recent earthquake activity shows {night_pct:.0}% occurring during night hours \
       (8PM-6AM local time). This is an observational pattern and does not indicate \
       predictive capability."
    ),
    confidence_score: 0.55,
    supporting_data: json!({
      "night_count": night,
      "day_count": day,
      "night_percentage": night_pct,
    }),
    earthquake_count: count_u32(events.len()),
    time_window_days: 14,
    valid_until: ctx.valid_for(7),
    ..ctx.draft(InsightType::Correlation, "temporal_distribution", NATIONWIDE)
  })
}

fn volcanic_proximity(events: &[Event], ctx: &AnalysisContext) -> Vec<NewInsight> {
  if ctx.points.is_empty() {
    return Vec::new();
  }
  let recent = ctx.within(events, PROXIMITY_WINDOW_DAYS);
  let stats = proximity::correlate(&recent, &ctx.points, proximity::DEFAULT_THRESHOLD_DEGREES);

  ctx
    .points
    .iter()
    .filter_map(|point| {
      let s = stats.get(&point.name).filter(|s| s.count >= PROXIMITY_MIN_EVENTS)?;
      let region = Region::classify(Some(point.latitude), Some(point.longitude));
      let max = s.max_magnitude.unwrap_or(0.0);
      Some(NewInsight {
        severity: Severity::from_activity(max, s.count),
        title: format!("Seismic Activity Near {}", point.name),
        description: format!(
          "{} earthquakes within {}° of {} in the last 30 days ({} of M4.0 or larger, maximum \
           M{max:.1}).",
          s.count,
          proximity::DEFAULT_THRESHOLD_DEGREES,
          point.name,
          s.strong_count,
        ),
        location: Some(point.name.clone()),
        latitude: Some(point.latitude),
        longitude: Some(point.longitude),
        confidence_score: (0.55 + s.count as f64 / 50.0).min(0.8),
        supporting_data: json!({
          "count": s.count,
          "strong_count": s.strong_count,
          "average_magnitude": s.average_magnitude,
          "earthquake_ids": s.event_ids.iter().take(SUPPORTING_ID_LIMIT).collect::<Vec<_>>(),
        }),
        earthquake_count: count_u32(s.count),
        time_window_days: 30,
        valid_until: ctx.valid_for(7),
        ..ctx.draft(InsightType::Correlation, "volcanic_proximity", region.to_string())
      })
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;
  use seismo_core::event::RawEvent;

  use super::*;

  fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2025, 6, 1, 14, 0, 0).unwrap() }

  fn ctx() -> AnalysisContext {
    AnalysisContext {
      now:    now(),
      model:  "test-model".into(),
      points: vec![PointOfInterest::new("Taal", 14.0, 121.0)],
    }
  }

  /// An event `hours` before [`now`].
  fn ev(id: &str, lat: f64, lon: f64, mag: Option<f64>, depth: f64, hours: i64) -> Event {
    Event::from_raw(RawEvent {
      id:        id.into(),
      magnitude: mag,
      place:     Some(format!("near {id}")),
      time:      (now() - Duration::hours(hours)).timestamp_millis(),
      latitude:  Some(lat),
      longitude: Some(lon),
      depth_km:  depth,
    })
    .unwrap()
  }

  /// `n` spread-out deep events in Luzon, `hours` ago.
  fn spread(prefix: &str, n: usize, mag: f64, hours: i64) -> Vec<Event> {
    (0..n)
      .map(|i| ev(&format!("{prefix}{i}"), 15.5 + i as f64 * 0.5, 121.0, Some(mag), 50.0, hours))
      .collect()
  }

  fn by_category<'a>(c: &'a [NewInsight], category: &str) -> Vec<&'a NewInsight> {
    c.iter().filter(|i| i.category == category).collect()
  }

  #[test]
  fn activity_increase_requires_growth_and_volume() {
    let mut events = spread("r", 12, 3.5, 24);
    events.extend(spread("p", 4, 3.5, 24 * 10));
    let out = regional(Region::Luzon, &events, &ctx());
    let found = by_category(&out, "increasing_activity");
    assert_eq!(found.len(), 1);
    let i = found[0];
    assert_eq!(i.earthquake_count, 12);
    assert!((i.confidence_score - 0.94).abs() < 1e-9);
    assert_eq!(i.severity, Severity::Low);
    assert_eq!(i.region, "Luzon");
    assert_eq!(i.supporting_data["previous_count"], 4);
    assert_eq!(i.valid_until, Some(now() + Duration::days(7)));
    assert_eq!(i.generated_by, "test-model");

    // 12 recent vs 8 previous is exactly 1.5x: not an increase.
    let mut events = spread("r", 12, 3.5, 24);
    events.extend(spread("p", 8, 3.5, 24 * 10));
    assert!(by_category(&regional(Region::Luzon, &events, &ctx()), "increasing_activity").is_empty());
  }

  #[test]
  fn shallow_events_form_a_cluster_candidate() {
    let events: Vec<Event> = (0..5)
      .map(|i| ev(&format!("s{i}"), 16.0 + i as f64, 121.0, Some(3.0), 4.0, 12))
      .collect();
    let out = regional(Region::Luzon, &events, &ctx());
    let found = by_category(&out, "shallow_clustering");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].confidence_score, 0.75);
    assert_eq!(found[0].depth_range.as_deref(), Some("4.0km - 4.0km"));
  }

  #[test]
  fn elevated_risk_maps_to_moderate_severity() {
    // Six shallow M5 events: 0.6 + 25 + 25 + 20 = 70.6, High.
    let events: Vec<Event> = (0..6)
      .map(|i| ev(&format!("h{i}"), 16.0 + i as f64, 121.0, Some(5.0), 8.0, 48))
      .collect();
    let out = regional(Region::Luzon, &events, &ctx());
    let risk = by_category(&out, "regional_risk_assessment");
    assert_eq!(risk.len(), 1);
    assert_eq!(risk[0].severity, Severity::High);
    assert_eq!(risk[0].insight_type, InsightType::Risk);

    // Deep moderate events stay below Elevated.
    let quiet = spread("q", 6, 3.0, 48);
    assert!(by_category(&regional(Region::Luzon, &quiet, &ctx()), "regional_risk_assessment").is_empty());
  }

  #[test]
  fn tight_group_yields_spatial_cluster_keyed_by_cell() {
    let events: Vec<Event> = (0..6)
      .map(|i| ev(&format!("c{i}"), 16.01 + i as f64 * 0.01, 121.01, Some(3.2), 40.0, 72))
      .collect();
    let out = regional(Region::Luzon, &events, &ctx());
    let found = by_category(&out, "spatial_cluster");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].location.as_deref(), Some("cell 16.0,121.0"));
    assert!((found[0].confidence_score - 0.72).abs() < 1e-9);
  }

  #[test]
  fn sequence_candidate_names_its_mainshock() {
    let mut events = vec![ev("main", 16.0, 121.0, Some(5.6), 20.0, 100)];
    for i in 0..4 {
      events.push(ev(&format!("a{i}"), 16.1, 121.2 + i as f64 * 0.1, Some(3.4), 20.0, 90 - i));
    }
    let out = regional(Region::Luzon, &events, &ctx());
    let found = by_category(&out, "aftershock_sequence");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].location.as_deref(), Some("mainshock main"));
    assert!((found[0].confidence_score - 0.75).abs() < 1e-9);
    assert_eq!(found[0].severity, Severity::High);
    assert_eq!(found[0].earthquake_count, 5);
  }

  #[test]
  fn shallow_strong_event_is_an_anomaly_in_its_own_region() {
    let events = vec![
      ev("x", 13.0, 123.0, Some(5.0), 3.0, 1),
      ev("y", 13.0, 123.0, Some(4.9), 3.0, 1),
      ev("z", 13.0, 123.0, Some(6.2), 5.0, 1),
    ];
    let out = nationwide(&events, &ctx());
    let found = by_category(&out, "unusual_shallow_strong");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].region, "Visayas");
    assert_eq!(found[0].severity, Severity::Moderate);
    assert_eq!(found[0].confidence_score, 0.85);
    assert_eq!(found[0].location.as_deref(), Some("event x"));
    assert!(found[0].description.contains("near x"));
  }

  #[test]
  fn shallow_strong_events_sharing_a_place_stay_distinct() {
    let place = "10 km N of Davao";
    let events: Vec<Event> = ["d1", "d2"]
      .into_iter()
      .map(|id| Event { place: Some(place.into()), ..ev(id, 7.2, 125.6, Some(5.4), 4.0, 2) })
      .collect();
    let out = nationwide(&events, &ctx());
    let found = by_category(&out, "unusual_shallow_strong");
    assert_eq!(found.len(), 2);
    assert_ne!(found[0].key(), found[1].key());
    assert!(found.iter().all(|c| c.description.contains(place)));

    let plan = crate::reconcile::plan(out.clone(), &[], 0.6, now());
    let created = plan.creates.iter().filter(|c| c.category == "unusual_shallow_strong").count();
    assert_eq!(created, 2);
    assert_eq!(plan.superseded, 0);
  }

  #[test]
  fn night_heavy_feed_yields_low_confidence_correlation() {
    // now() is 14:00 UTC = 22:00 local.
    let events = spread("n", 20, 3.0, 24 * 3);
    let out = nationwide(&events, &ctx());
    let found = by_category(&out, "temporal_distribution");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].region, NATIONWIDE);
    assert_eq!(found[0].confidence_score, 0.55);
    assert_eq!(found[0].supporting_data["night_count"], 20);

    assert!(is_night(Utc.with_ymd_and_hms(2025, 6, 1, 21, 59, 0).unwrap()));
    assert!(!is_night(Utc.with_ymd_and_hms(2025, 6, 1, 22, 0, 0).unwrap()));
    assert!(is_night(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()));
  }

  #[test]
  fn proximity_needs_three_nearby_events() {
    let near: Vec<Event> = (0..3)
      .map(|i| ev(&format!("t{i}"), 14.1, 121.0 + i as f64 * 0.1, Some(4.1), 10.0, 24))
      .collect();
    let out = nationwide(&near, &ctx());
    let found = by_category(&out, "volcanic_proximity");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].location.as_deref(), Some("Taal"));
    assert_eq!(found[0].region, "Visayas");
    assert!((found[0].confidence_score - 0.61).abs() < 1e-9);

    assert!(by_category(&nationwide(&near[..2], &ctx()), "volcanic_proximity").is_empty());
  }
}
