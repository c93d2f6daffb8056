//! [`InsightEngine`]: the run protocol.
//!
//! A run passes its guards, normalizes the input, fans the analyzers out over
//! blocking tasks, plans against the live insight set and hands the store a
//! single [`RunCommit`]. Nothing is written before every analyzer finishes,
//! and a failed commit leaves the store as it was.

use std::{sync::Arc, time::Instant};

use chrono::{DateTime, Utc};
use seismo_analytics::{PointOfInterest, group_by_region};
use seismo_core::{
  config::EngineConfig,
  event::{Event, Feed, Region, normalize_feed},
  insight::{InsightQuery, NewInsight},
  run::{NotRunReason, RunCommit, RunResult, RunTrigger, TRIGGER_SAMPLE_SIZE, TriggerType},
  store::InsightStore,
};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
  Error, Result,
  candidates::{self, AnalysisContext},
  reconcile,
};

/// How a run was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
  /// Runs only when the schedule says it is due.
  Scheduled,
  /// Skips the schedule check. Still respects the enabled flag and the
  /// credential.
  Manual,
}

impl RunMode {
  fn trigger_type(self) -> TriggerType {
    match self {
      Self::Scheduled => TriggerType::ScheduledAnalysis,
      Self::Manual => TriggerType::ManualAnalysis,
    }
  }
}

/// A snapshot of the engine for operators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStatus {
  pub enabled:                  bool,
  pub api_key_present:          bool,
  pub should_run:               bool,
  pub status_message:           String,
  pub last_run_at:              Option<DateTime<Utc>>,
  pub next_run_at:              Option<DateTime<Utc>>,
  pub total_runs:               u64,
  pub total_insights_generated: u64,
  /// Active and updated insights.
  pub live_insights:            u64,
  pub analysis_frequency_hours: u32,
  pub ai_model:                 String,
  pub min_confidence_threshold: f64,
}

pub struct InsightEngine<S> {
  store:               S,
  api_key:             Option<String>,
  points:              Vec<PointOfInterest>,
  pub(crate) run_lock: Mutex<()>,
}

impl<S: InsightStore> InsightEngine<S> {
  /// `api_key` is the analysis credential; runs refuse to start without a
  /// non-blank one.
  pub fn new(store: S, api_key: Option<String>) -> Self {
    Self { store, api_key, points: Vec::new(), run_lock: Mutex::new(()) }
  }

  /// Named locations (volcanoes, faults) to correlate activity against.
  pub fn with_points_of_interest(mut self, points: Vec<PointOfInterest>) -> Self {
    self.points = points;
    self
  }

  pub fn store(&self) -> &S { &self.store }

  fn has_credential(&self) -> bool {
    self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
  }

  /// The reason a run requested now in `mode` would not execute, if any.
  fn blocked_by(&self, config: &EngineConfig, now: DateTime<Utc>, mode: RunMode) -> Option<NotRunReason> {
    if !config.enabled {
      return Some(NotRunReason::Disabled);
    }
    if !self.has_credential() {
      return Some(NotRunReason::MissingCredential);
    }
    match config.next_run_at {
      Some(next_run_at) if mode == RunMode::Scheduled && now < next_run_at => {
        Some(NotRunReason::NotDue { next_run_at })
      }
      _ => None,
    }
  }

  // ── Runs ────────────────────────────────────────────────────────────────

  /// Run if the schedule says a run is due.
  pub async fn run_analysis(&self, records: impl Into<Feed>) -> RunResult {
    self.run_at(records, Utc::now(), RunMode::Scheduled).await
  }

  /// Run now regardless of the schedule.
  pub async fn trigger_manual_run(&self, records: impl Into<Feed>) -> RunResult {
    self.run_at(records, Utc::now(), RunMode::Manual).await
  }

  /// Run with an explicit clock. Never returns an error: guard refusals come
  /// back as not-run results and failures as `success = false`. Records the
  /// feed could not parse count as dropped.
  pub async fn run_at(&self, records: impl Into<Feed>, now: DateTime<Utc>, mode: RunMode) -> RunResult {
    let feed: Feed = records.into();
    let Ok(_guard) = self.run_lock.try_lock() else {
      tracing::info!("Skipping analysis run: another run is in progress");
      return RunResult::not_run(NotRunReason::RunInProgress);
    };
    let started = Instant::now();

    let config = match self.store.engine_config().await {
      Ok(config) => config,
      Err(e) => {
        tracing::error!(error = %e, "Could not load engine configuration");
        return RunResult::failed(Error::store(e), started.elapsed().as_secs_f64());
      }
    };
    if let Some(reason) = self.blocked_by(&config, now, mode) {
      tracing::info!(%reason, "Analysis run not started");
      return RunResult::not_run(reason);
    }

    tracing::info!(records = feed.len(), ?mode, "Starting analysis run");
    match self.execute(feed, now, mode, &config, started).await {
      Ok(result) => {
        tracing::info!(
          generated = result.insights_generated,
          updated = result.insights_updated,
          invalidated = result.insights_invalidated,
          discarded = result.candidates_discarded,
          seconds = result.duration_seconds,
          "Analysis run complete"
        );
        result
      }
      Err(e) => {
        if e.is_conflict() {
          tracing::warn!(error = %e, "Analysis run lost a write race; nothing was committed");
        } else {
          tracing::error!(error = %e, "Analysis run failed; nothing was committed");
        }
        RunResult::failed(e, started.elapsed().as_secs_f64())
      }
    }
  }

  async fn execute(
    &self,
    feed: Feed,
    now: DateTime<Utc>,
    mode: RunMode,
    config: &EngineConfig,
    started: Instant,
  ) -> Result<RunResult> {
    let normalized = normalize_feed(feed);
    if !normalized.dropped.is_empty() {
      tracing::warn!(dropped = normalized.dropped.len(), "Dropped malformed event records");
      for d in &normalized.dropped {
        tracing::debug!(id = %d.id, reason = %d.reason, "Dropped record");
      }
    }
    let records_dropped = count(normalized.dropped.len());
    let events: Arc<[Event]> = normalized.events.into();

    let next_run_at = now
      .checked_add_signed(config.frequency())
      .ok_or(Error::Unschedulable { from: now, hours: config.analysis_frequency_hours })?;

    let ctx = Arc::new(AnalysisContext {
      now,
      model: config.ai_model.clone(),
      points: self.points.clone(),
    });
    let candidates = analyze(Arc::clone(&events), ctx).await?;
    for c in &candidates {
      tracing::debug!(
        category = %c.category,
        region = %c.region,
        confidence = c.confidence_score,
        severity = %c.severity,
        "Candidate insight"
      );
    }

    let live = self.store.list_insights(&InsightQuery::live()).await.map_err(Error::store)?;
    let plan = reconcile::plan(candidates, &live, config.min_confidence_threshold, now);
    if plan.superseded > 0 {
      tracing::debug!(superseded = plan.superseded, "Merged duplicate candidates");
    }

    let trigger = RunTrigger {
      trigger_id:         Uuid::new_v4(),
      trigger_type:       mode.trigger_type(),
      description:        format!("Analyzed {} earthquakes", events.len()),
      earthquake_ids:     events.iter().take(TRIGGER_SAMPLE_SIZE).map(|e| e.id.clone()).collect(),
      insights_generated: count(plan.creates.len() + plan.evolutions.len()),
      duration_seconds:   started.elapsed().as_secs_f64(),
      recorded_at:        now,
    };
    let commit = RunCommit {
      ran_at: now,
      expected_next_run_at: config.next_run_at,
      next_run_at,
      creates: plan.creates,
      revisions: plan.revisions,
      evolutions: plan.evolutions,
      invalidations: plan.invalidations,
      trigger,
    };
    let summary = self.store.commit_run(commit).await.map_err(Error::store)?;

    Ok(RunResult {
      success: true,
      not_run: None,
      insights_generated: count(summary.created.len()),
      insights_updated: count(summary.updated.len()),
      insights_invalidated: count(summary.invalidated.len()),
      candidates_discarded: count(plan.discarded),
      records_dropped,
      duration_seconds: started.elapsed().as_secs_f64(),
      earthquakes_analyzed: count(events.len()),
      error: None,
    })
  }

  // ── Status ──────────────────────────────────────────────────────────────

  pub async fn get_status(&self) -> Result<EngineStatus> { self.status_at(Utc::now()).await }

  pub async fn status_at(&self, now: DateTime<Utc>) -> Result<EngineStatus> {
    let config = self.store.engine_config().await.map_err(Error::store)?;
    let stats = self.store.insight_statistics().await.map_err(Error::store)?;

    let blocked = if self.run_lock.try_lock().is_err() {
      Some(NotRunReason::RunInProgress)
    } else {
      self.blocked_by(&config, now, RunMode::Scheduled)
    };

    Ok(EngineStatus {
      enabled:                  config.enabled,
      api_key_present:          self.has_credential(),
      should_run:               blocked.is_none(),
      status_message:           blocked.map_or_else(|| "Ready to run".to_owned(), |r| r.to_string()),
      last_run_at:              config.last_run_at,
      next_run_at:              config.next_run_at,
      total_runs:               config.total_runs,
      total_insights_generated: config.total_insights_generated,
      live_insights:            stats.active + stats.updated,
      analysis_frequency_hours: config.analysis_frequency_hours,
      ai_model:                 config.ai_model,
      min_confidence_threshold: config.min_confidence_threshold,
    })
  }
}

fn count(n: usize) -> u32 { u32::try_from(n).unwrap_or(u32::MAX) }

/// Run every detector: one blocking task per analyzed region plus one over
/// the whole set. Output order is fixed (regions in order, then nationwide).
async fn analyze(events: Arc<[Event]>, ctx: Arc<AnalysisContext>) -> Result<Vec<NewInsight>> {
  let mut tasks = Vec::new();
  for (region, members) in group_by_region(&events) {
    if region == Region::Unknown {
      continue;
    }
    let ctx = Arc::clone(&ctx);
    tasks.push(tokio::task::spawn_blocking(move || candidates::regional(region, &members, &ctx)));
  }
  tasks.push(tokio::task::spawn_blocking(move || candidates::nationwide(&events, &ctx)));

  let mut out = Vec::new();
  for task in tasks {
    out.extend(task.await?);
  }
  Ok(out)
}
