//! Events: normalized earthquake observations.
//!
//! The feed collaborator hands us [`RawEvent`]s, usually as a [`Feed`] parsed
//! record by record. [`normalize_batch`] turns them into immutable
//! [`Event`]s, classifying the region and computing the radiated energy once.
//! Records that cannot be trusted are dropped and reported, never fatal to
//! the batch.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Events at or above this latitude are in Luzon.
pub const LUZON_MIN_LATITUDE: f64 = 15.0;
/// Events at or above this latitude (and below Luzon's) are in the Visayas.
/// Everything further south is Mindanao.
pub const VISAYAS_MIN_LATITUDE: f64 = 10.0;

/// Magnitude at which an event counts as "significant" (inclusive).
pub const SIGNIFICANT_MAGNITUDE: f64 = 4.5;

// ─── Region ──────────────────────────────────────────────────────────────────

/// The island group an event is attributed to.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
pub enum Region {
  Luzon,
  Visayas,
  Mindanao,
  Unknown,
}

impl Region {
  /// The regions analyzed individually by the engine.
  pub const ANALYZED: [Region; 3] = [Region::Luzon, Region::Visayas, Region::Mindanao];

  /// Classify by latitude. Missing coordinates yield [`Region::Unknown`].
  pub fn classify(latitude: Option<f64>, longitude: Option<f64>) -> Self {
    match (latitude, longitude) {
      (Some(lat), Some(_)) if lat >= LUZON_MIN_LATITUDE => Self::Luzon,
      (Some(lat), Some(_)) if lat >= VISAYAS_MIN_LATITUDE => Self::Visayas,
      (Some(_), Some(_)) => Self::Mindanao,
      _ => Self::Unknown,
    }
  }
}

// ─── Depth and magnitude classes ─────────────────────────────────────────────

/// Hypocentre depth bands, in kilometres. Lower bounds are inclusive.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DepthClass {
  /// < 10 km
  VeryShallow,
  /// 10–30 km
  Shallow,
  /// 30–70 km
  Moderate,
  /// 70–300 km
  Intermediate,
  /// ≥ 300 km
  Deep,
}

impl DepthClass {
  pub fn of(depth_km: f64) -> Self {
    match depth_km {
      d if d < 10.0 => Self::VeryShallow,
      d if d < 30.0 => Self::Shallow,
      d if d < 70.0 => Self::Moderate,
      d if d < 300.0 => Self::Intermediate,
      _ => Self::Deep,
    }
  }

  /// Very shallow and shallow events; these drive surface damage potential.
  pub fn is_shallow(self) -> bool { matches!(self, Self::VeryShallow | Self::Shallow) }
}

/// Descriptive magnitude bands. Lower bounds are inclusive.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MagnitudeClass {
  Micro,
  Minor,
  Light,
  Moderate,
  Strong,
  Major,
  Great,
}

impl MagnitudeClass {
  pub fn of(magnitude: f64) -> Self {
    match magnitude {
      m if m < 3.0 => Self::Micro,
      m if m < 4.0 => Self::Minor,
      m if m < 5.0 => Self::Light,
      m if m < 6.0 => Self::Moderate,
      m if m < 7.0 => Self::Strong,
      m if m < 8.0 => Self::Major,
      _ => Self::Great,
    }
  }
}

// ─── Raw input ───────────────────────────────────────────────────────────────

/// A record as delivered by the feed collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
  pub id:        String,
  pub magnitude: Option<f64>,
  #[serde(default)]
  pub place:     Option<String>,
  /// Origin time, epoch milliseconds.
  pub time:      i64,
  pub latitude:  Option<f64>,
  pub longitude: Option<f64>,
  #[serde(alias = "depth")]
  pub depth_km:  f64,
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// A normalized, immutable earthquake observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
  pub id:            String,
  pub magnitude:     Option<f64>,
  pub place:         Option<String>,
  pub latitude:      Option<f64>,
  pub longitude:     Option<f64>,
  pub depth_km:      f64,
  pub time:          DateTime<Utc>,
  pub region:        Region,
  pub energy_joules: f64,
}

impl Event {
  /// Validate a raw record and derive region and energy.
  pub fn from_raw(raw: RawEvent) -> Result<Self, DropReason> {
    if raw.id.trim().is_empty() {
      return Err(DropReason::MissingId);
    }
    let time =
      DateTime::from_timestamp_millis(raw.time).ok_or(DropReason::InvalidTimestamp(raw.time))?;
    if let Some(lat) = raw.latitude
      && !(lat.is_finite() && (-90.0..=90.0).contains(&lat))
    {
      return Err(DropReason::LatitudeOutOfRange(lat));
    }
    if let Some(lon) = raw.longitude
      && !(lon.is_finite() && (-180.0..=180.0).contains(&lon))
    {
      return Err(DropReason::LongitudeOutOfRange(lon));
    }
    if !raw.depth_km.is_finite() || raw.depth_km < 0.0 {
      return Err(DropReason::InvalidDepth(raw.depth_km));
    }
    if let Some(m) = raw.magnitude
      && !m.is_finite()
    {
      return Err(DropReason::InvalidMagnitude);
    }

    Ok(Self {
      region: Region::classify(raw.latitude, raw.longitude),
      energy_joules: energy_joules(raw.magnitude),
      id: raw.id,
      magnitude: raw.magnitude,
      place: raw.place,
      latitude: raw.latitude,
      longitude: raw.longitude,
      depth_km: raw.depth_km,
      time,
    })
  }

  pub fn coordinates(&self) -> Option<(f64, f64)> { self.latitude.zip(self.longitude) }

  pub fn depth_class(&self) -> DepthClass { DepthClass::of(self.depth_km) }

  /// Magnitude ≥ [`SIGNIFICANT_MAGNITUDE`]. Unknown magnitude is never
  /// significant.
  pub fn is_significant(&self) -> bool {
    self.magnitude.is_some_and(|m| m >= SIGNIFICANT_MAGNITUDE)
  }

  /// Planar distance in degrees to another event, if both are located.
  pub fn degrees_to(&self, other: &Event) -> Option<f64> {
    Some(degree_distance(self.coordinates()?, other.coordinates()?))
  }
}

/// Radiated energy, `10^(1.5·M + 4.8)` joules. Unknown magnitude yields 0.
pub fn energy_joules(magnitude: Option<f64>) -> f64 {
  magnitude.map_or(0.0, |m| 10f64.powf(1.5 * m + 4.8))
}

/// Euclidean distance in lat/lon degree space. Not geodesic; adequate over
/// the small bounding region the feed covers.
pub fn degree_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
  ((a.0 - b.0).powi(2) + (a.1 - b.1).powi(2)).sqrt()
}

// ─── Batch normalization ─────────────────────────────────────────────────────

/// Why a raw record was left out of the analysis set.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "reason", content = "value", rename_all = "snake_case")]
pub enum DropReason {
  #[error("record has no id")]
  MissingId,
  #[error("duplicate record id")]
  Duplicate,
  #[error("timestamp {0} is not representable")]
  InvalidTimestamp(i64),
  #[error("latitude {0} is out of range")]
  LatitudeOutOfRange(f64),
  #[error("longitude {0} is out of range")]
  LongitudeOutOfRange(f64),
  #[error("depth {0} is invalid")]
  InvalidDepth(f64),
  #[error("magnitude is not a finite number")]
  InvalidMagnitude,
  #[error("record could not be parsed: {0}")]
  Unparseable(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedRecord {
  pub id:     String,
  pub reason: DropReason,
}

/// The outcome of [`normalize_batch`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Normalized {
  pub events:  Vec<Event>,
  pub dropped: Vec<DroppedRecord>,
}

/// A feed document, split into the records that deserialized and the ones
/// that did not.
#[derive(Debug, Clone, Default)]
pub struct Feed {
  pub records:  Vec<RawEvent>,
  pub rejected: Vec<DroppedRecord>,
}

impl Feed {
  /// Parse a JSON array of records. Each element is deserialized on its own,
  /// so a malformed element is rejected without failing its neighbours. Only
  /// a document that is not a JSON array is an error.
  pub fn from_json(json: &str) -> serde_json::Result<Self> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    Ok(values.into_iter().collect())
  }

  /// Records in the document, parsed or not.
  pub fn len(&self) -> usize { self.records.len() + self.rejected.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

impl FromIterator<serde_json::Value> for Feed {
  fn from_iter<I: IntoIterator<Item = serde_json::Value>>(values: I) -> Self {
    let mut feed = Feed::default();
    for value in values {
      let id = match value.get("id") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
      };
      match serde_json::from_value::<RawEvent>(value) {
        Ok(raw) => feed.records.push(raw),
        Err(e) => feed
          .rejected
          .push(DroppedRecord { id, reason: DropReason::Unparseable(e.to_string()) }),
      }
    }
    feed
  }
}

impl From<Vec<RawEvent>> for Feed {
  fn from(records: Vec<RawEvent>) -> Self { Self { records, rejected: Vec::new() } }
}

/// Normalize a parsed feed. Rejected records are reported ahead of the
/// records [`normalize_batch`] drops.
pub fn normalize_feed(feed: Feed) -> Normalized {
  let mut out = normalize_batch(feed.records);
  let mut dropped = feed.rejected;
  dropped.append(&mut out.dropped);
  out.dropped = dropped;
  out
}

/// Normalize a batch, dropping malformed records and repeated ids. The first
/// occurrence of an id wins; input order is otherwise preserved.
pub fn normalize_batch(records: impl IntoIterator<Item = RawEvent>) -> Normalized {
  let mut seen = HashSet::new();
  let mut out = Normalized::default();

  for raw in records {
    let id = raw.id.clone();
    if !id.is_empty() && seen.contains(&id) {
      out.dropped.push(DroppedRecord { id, reason: DropReason::Duplicate });
      continue;
    }
    match Event::from_raw(raw) {
      Ok(event) => {
        seen.insert(id);
        out.events.push(event);
      }
      Err(reason) => out.dropped.push(DroppedRecord { id, reason }),
    }
  }

  out
}
