//! Subcommand handlers. Structured results go to stdout as JSON, listings as
//! one line per record; logs go to stderr.

use std::path::Path;

use anyhow::{Context as _, bail};
use chrono::Utc;
use seismo_analytics::{group_by_region, magnitude, risk, trend, yearly};
use seismo_core::{
  config::ConfigUpdate,
  event::{Feed, Region, normalize_feed},
  insight::InsightQuery,
  store::InsightStore,
};
use seismo_engine::InsightEngine;
use seismo_store_sqlite::SqliteStore;
use serde::Serialize;
use serde_json::json;

use crate::{Command, settings::Settings};

const RECENT_RUNS: usize = 5;
const WORST_YEARS: usize = 5;

pub async fn dispatch(command: Command, settings: Settings) -> anyhow::Result<()> {
  match command {
    Command::Run { events, force } => {
      let records = read_events(&events)?;
      let engine = InsightEngine::new(open(&settings).await?, settings.api_key)
        .with_points_of_interest(settings.points_of_interest);
      let result = if force {
        engine.trigger_manual_run(records).await
      } else {
        engine.run_analysis(records).await
      };
      print_json(&result)?;
      if !result.success && result.not_run.is_none() {
        bail!("analysis run failed: {}", result.error.unwrap_or_default());
      }
    }

    Command::Status => {
      let engine = InsightEngine::new(open(&settings).await?, settings.api_key);
      let status = engine.get_status().await.context("failed to read engine status")?;
      let statistics = engine.store().insight_statistics().await?;
      let recent_runs = engine.store().recent_triggers(RECENT_RUNS).await?;
      print_json(&json!({
        "engine": status,
        "insights": statistics,
        "recent_runs": recent_runs,
      }))?;
    }

    Command::Insights { status, region, insight_type, limit } => {
      let query = InsightQuery {
        status,
        live_only: false,
        insight_type,
        region,
        limit: Some(limit),
        offset: None,
      };
      let insights = open(&settings).await?.list_insights(&query).await?;
      if insights.is_empty() {
        println!("No insights.");
      }
      for i in insights {
        println!(
          "{}  v{:<3} {:<11} {:<8} {:.2}  {:<11} {}",
          i.id,
          i.version,
          i.status.as_ref(),
          i.severity.as_ref(),
          i.confidence_score,
          i.region,
          i.title,
        );
      }
    }

    Command::History { id } => {
      let store = open(&settings).await?;
      if store.get_insight(id).await?.is_none() {
        bail!("insight {id} not found");
      }
      for h in store.history(id).await? {
        println!(
          "{}  {:<11} {}{}",
          h.recorded_at.to_rfc3339(),
          h.action.as_ref(),
          h.reason,
          h.triggered_by.map(|t| format!("  (run {t})")).unwrap_or_default(),
        );
      }
    }

    Command::Invalidate { id, reason } => {
      let store = open(&settings).await?;
      let Some(current) = store.get_insight(id).await? else {
        bail!("insight {id} not found");
      };
      let retired = store
        .invalidate_insight(id, current.version, reason)
        .await
        .with_context(|| format!("failed to invalidate {id}"))?;
      println!("Invalidated {} at version {}", retired.id, retired.version);
    }

    Command::Configure { enabled, frequency_hours, model, min_confidence } => {
      let update = ConfigUpdate {
        enabled,
        analysis_frequency_hours: frequency_hours,
        ai_model: model,
        min_confidence_threshold: min_confidence,
      };
      let store = open(&settings).await?;
      let config = if update == ConfigUpdate::default() {
        store.engine_config().await?
      } else {
        store.update_engine_config(update).await.context("configuration rejected")?
      };
      print_json(&config)?;
    }

    Command::Stats { events, year, month } => stats(&events, year, month)?,
  }

  Ok(())
}

async fn open(settings: &Settings) -> anyhow::Result<SqliteStore> {
  SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))
}

/// Read a feed file. Only an unreadable file or a document that is not a
/// JSON array fails; bad records are rejected one by one.
fn read_events(path: &Path) -> anyhow::Result<Feed> {
  let raw = std::fs::read_to_string(path)
    .with_context(|| format!("reading event file {}", path.display()))?;
  let feed =
    Feed::from_json(&raw).with_context(|| format!("parsing event file {}", path.display()))?;
  if !feed.rejected.is_empty() {
    tracing::warn!(
      rejected = feed.rejected.len(),
      path = %path.display(),
      "Skipping unparseable event records"
    );
  }
  Ok(feed)
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn stats(path: &Path, year: Option<i32>, month: Option<u32>) -> anyhow::Result<()> {
  let normalized = normalize_feed(read_events(path)?);
  if !normalized.dropped.is_empty() {
    tracing::warn!(dropped = normalized.dropped.len(), "Dropped malformed event records");
  }
  let events = normalized.events;

  // Trends are measured back from the newest event, so old feeds still
  // produce segments.
  let end = events.iter().map(|e| e.time).max().unwrap_or_else(Utc::now);
  let groups = group_by_region(&events);
  let risk: Vec<_> = Region::ANALYZED
    .iter()
    .map(|&r| risk::score(r, groups.get(&r).map_or(&[][..], Vec::as_slice)))
    .collect();

  print_json(&json!({
    "records_dropped": normalized.dropped.len(),
    "summary": magnitude::summarize(&events),
    "trend": trend::analyze(&events, end, trend::DEFAULT_PERIOD_DAYS, trend::DEFAULT_SEGMENT_DAYS),
    "risk": risk,
    "years": yearly::year_statistics(&events),
    "worst_years": yearly::worst_years(&events, WORST_YEARS),
    "calendar": year.map(|y| yearly::calendar(&events, y, month)),
  }))
}

#[cfg(test)]
mod tests {
  use seismo_core::event::DropReason;

  use super::*;

  #[test]
  fn one_bad_record_does_not_sink_the_file() {
    let path = std::env::temp_dir().join(format!("seismo-feed-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(
      &path,
      r#"[
        {"id":"ok","magnitude":3.2,"time":1700000000000,"latitude":14.1,"longitude":121.0,"depth":12.0},
        {"id":"late","magnitude":3.0,"time":"not-a-time","latitude":14.2,"longitude":121.0,"depth":8.0}
      ]"#,
    )
    .unwrap();

    let feed = read_events(&path).unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(feed.records.len(), 1);
    assert_eq!(feed.records[0].id, "ok");
    assert_eq!(feed.rejected.len(), 1);
    assert_eq!(feed.rejected[0].id, "late");
    assert!(matches!(feed.rejected[0].reason, DropReason::Unparseable(_)));

    let normalized = normalize_feed(feed);
    assert_eq!(normalized.events.len(), 1);
    assert_eq!(normalized.dropped.len(), 1);
  }

  #[test]
  fn non_array_document_is_an_error() {
    let path = std::env::temp_dir().join(format!("seismo-feed-{}.json", uuid::Uuid::new_v4()));
    std::fs::write(&path, r#"{"events":[]}"#).unwrap();
    let err = read_events(&path).unwrap_err();
    std::fs::remove_file(&path).ok();
    assert!(err.to_string().starts_with("parsing event file"), "{err}");
  }
}
