//! [`SqliteStore`], the SQLite implementation of [`InsightStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use seismo_core::{
  config::{ConfigUpdate, EngineConfig},
  insight::{Insight, InsightQuery, InsightStatistics, InsightStatus, NewInsight},
  lifecycle::{HistoryAction, InsightHistory, InsightRevision},
  run::{CommitSummary, RunCommit, RunTrigger},
  store::InsightStore,
};

use crate::{
  Error, Result,
  encode::{
    INSIGHT_COLUMNS, RawConfig, RawHistory, RawInsight, RawTrigger, encode_count, encode_dt,
    encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// An insight store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` inside an immediate transaction. The transaction commits only
  /// if `f` succeeds; on error it is dropped and rolled back.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&tx) {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(e) => Ok(Err(e)),
        }
      })
      .await?
  }

  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(conn))).await?
  }
}

// ─── Row operations ──────────────────────────────────────────────────────────
//
// Synchronous helpers run on the connection thread, always inside the
// transaction opened by `SqliteStore::write`.

fn load_config(conn: &Connection, now: DateTime<Utc>) -> Result<EngineConfig> {
  let raw = conn
    .query_row(
      "SELECT enabled, analysis_frequency_hours, next_run_at, last_run_at, total_runs,
              total_insights_generated, ai_model, min_confidence_threshold, updated_at
       FROM engine_config WHERE id = 1",
      [],
      |row| {
        Ok(RawConfig {
          enabled:                  row.get(0)?,
          analysis_frequency_hours: row.get(1)?,
          next_run_at:              row.get(2)?,
          last_run_at:              row.get(3)?,
          total_runs:               row.get(4)?,
          total_insights_generated: row.get(5)?,
          ai_model:                 row.get(6)?,
          min_confidence_threshold: row.get(7)?,
          updated_at:               row.get(8)?,
        })
      },
    )
    .optional()?;

  match raw {
    Some(raw) => raw.into_config(),
    None => {
      let config = EngineConfig::defaults(now);
      save_config(conn, &config)?;
      Ok(config)
    }
  }
}

fn save_config(conn: &Connection, config: &EngineConfig) -> Result<()> {
  conn.execute(
    "INSERT INTO engine_config (
       id, enabled, analysis_frequency_hours, next_run_at, last_run_at, total_runs,
       total_insights_generated, ai_model, min_confidence_threshold, updated_at
     ) VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
     ON CONFLICT (id) DO UPDATE SET
       enabled                  = excluded.enabled,
       analysis_frequency_hours = excluded.analysis_frequency_hours,
       next_run_at              = excluded.next_run_at,
       last_run_at              = excluded.last_run_at,
       total_runs               = excluded.total_runs,
       total_insights_generated = excluded.total_insights_generated,
       ai_model                 = excluded.ai_model,
       min_confidence_threshold = excluded.min_confidence_threshold,
       updated_at               = excluded.updated_at",
    rusqlite::params![
      config.enabled,
      config.analysis_frequency_hours,
      config.next_run_at.map(encode_dt),
      config.last_run_at.map(encode_dt),
      encode_count(config.total_runs),
      encode_count(config.total_insights_generated),
      config.ai_model,
      config.min_confidence_threshold,
      encode_dt(config.updated_at),
    ],
  )?;
  Ok(())
}

fn fetch_insight(conn: &Connection, id: Uuid) -> Result<Option<Insight>> {
  let raw = conn
    .query_row(
      &format!("SELECT {INSIGHT_COLUMNS} FROM insights WHERE id = ?1"),
      rusqlite::params![encode_uuid(id)],
      RawInsight::from_row,
    )
    .optional()?;
  raw.map(RawInsight::into_insight).transpose()
}

fn require_insight(conn: &Connection, id: Uuid) -> Result<Insight> {
  fetch_insight(conn, id)?.ok_or(Error::Core(seismo_core::Error::InsightNotFound(id)))
}

fn insert_insight(conn: &Connection, i: &Insight) -> Result<()> {
  conn.execute(
    &format!(
      "INSERT INTO insights ({INSIGHT_COLUMNS}) VALUES
       (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18,
        ?19, ?20, ?21, ?22, ?23)"
    ),
    rusqlite::params![
      encode_uuid(i.id),
      i.version,
      i.parent_insight_id.map(encode_uuid),
      i.insight_type.to_string(),
      i.category,
      i.severity.to_string(),
      i.title,
      i.description,
      i.region,
      i.location,
      i.latitude,
      i.longitude,
      i.confidence_score,
      i.supporting_data.to_string(),
      i.earthquake_count,
      i.magnitude_range,
      i.depth_range,
      i.time_window_days,
      i.status.to_string(),
      encode_dt(i.created_at),
      encode_dt(i.updated_at),
      i.valid_until.map(encode_dt),
      i.generated_by,
    ],
  )?;
  Ok(())
}

/// Overwrite the mutable columns, guarded by the version the caller read.
fn update_insight(conn: &Connection, i: &Insight, expected_version: u32) -> Result<()> {
  let changed = conn.execute(
    "UPDATE insights SET
       version = ?2, severity = ?3, title = ?4, description = ?5, latitude = ?6,
       longitude = ?7, confidence_score = ?8, supporting_data = ?9, earthquake_count = ?10,
       magnitude_range = ?11, depth_range = ?12, time_window_days = ?13, status = ?14,
       updated_at = ?15, valid_until = ?16, generated_by = ?17
     WHERE id = ?1 AND version = ?18",
    rusqlite::params![
      encode_uuid(i.id),
      i.version,
      i.severity.to_string(),
      i.title,
      i.description,
      i.latitude,
      i.longitude,
      i.confidence_score,
      i.supporting_data.to_string(),
      i.earthquake_count,
      i.magnitude_range,
      i.depth_range,
      i.time_window_days,
      i.status.to_string(),
      encode_dt(i.updated_at),
      i.valid_until.map(encode_dt),
      i.generated_by,
      expected_version,
    ],
  )?;
  if changed == 0 {
    let actual: u32 = conn.query_row(
      "SELECT version FROM insights WHERE id = ?1",
      rusqlite::params![encode_uuid(i.id)],
      |row| row.get(0),
    )?;
    return Err(Error::Core(seismo_core::Error::VersionConflict {
      id: i.id,
      expected: expected_version,
      actual,
    }));
  }
  Ok(())
}

fn append_history(conn: &Connection, h: &InsightHistory) -> Result<()> {
  conn.execute(
    "INSERT INTO insight_history (
       history_id, insight_id, action, previous_json, current_json, reason,
       triggered_by, recorded_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    rusqlite::params![
      encode_uuid(h.history_id),
      encode_uuid(h.insight_id),
      h.action.to_string(),
      h.previous.as_ref().map(|v| v.to_string()),
      h.current.to_string(),
      h.reason,
      h.triggered_by,
      encode_dt(h.recorded_at),
    ],
  )?;
  Ok(())
}

/// Everything a single write shares: the clock reading, the confidence
/// floor, and the trigger the history rows are attributed to.
struct WriteContext {
  now:          DateTime<Utc>,
  threshold:    f64,
  triggered_by: Option<String>,
}

impl WriteContext {
  fn history(
    &self,
    action: HistoryAction,
    previous: Option<&Insight>,
    current: &Insight,
    reason: &str,
  ) -> Result<InsightHistory> {
    Ok(InsightHistory::record(action, previous, current, reason, self.triggered_by.clone())?)
  }

  fn create(&self, conn: &Connection, input: NewInsight, reason: &str) -> Result<Insight> {
    if input.confidence_score < self.threshold {
      return Err(Error::Core(seismo_core::Error::BelowThreshold {
        confidence: input.confidence_score,
        threshold:  self.threshold,
      }));
    }
    let insight = Insight::from_new(Uuid::new_v4(), input, self.now);
    insert_insight(conn, &insight)?;
    append_history(conn, &self.history(HistoryAction::Created, None, &insight, reason)?)?;
    Ok(insight)
  }

  fn revise(
    &self,
    conn: &Connection,
    id: Uuid,
    expected_version: u32,
    revision: InsightRevision,
    reason: &str,
  ) -> Result<Insight> {
    let current = require_insight(conn, id)?;
    current.check_version(expected_version)?;
    let next = current.revised(revision, self.now)?;
    update_insight(conn, &next, expected_version)?;
    append_history(conn, &self.history(HistoryAction::Updated, Some(&current), &next, reason)?)?;
    Ok(next)
  }

  fn retire(
    &self,
    conn: &Connection,
    id: Uuid,
    expected_version: u32,
    action: HistoryAction,
    reason: &str,
  ) -> Result<Insight> {
    let current = require_insight(conn, id)?;
    current.check_version(expected_version)?;
    let next = current.invalidated(self.now)?;
    update_insight(conn, &next, expected_version)?;
    append_history(conn, &self.history(action, Some(&current), &next, reason)?)?;
    Ok(next)
  }

  /// Returns `(retired parent, successor)`.
  fn evolve(
    &self,
    conn: &Connection,
    parent_id: Uuid,
    expected_version: u32,
    mut successor: NewInsight,
    reason: &str,
  ) -> Result<(Insight, Insight)> {
    let parent = self.retire(conn, parent_id, expected_version, HistoryAction::Evolved, reason)?;
    successor.parent_insight_id = Some(parent_id);
    let child = self.create(conn, successor, reason)?;
    Ok((parent, child))
  }
}

fn insert_trigger(conn: &Connection, t: &RunTrigger) -> Result<()> {
  conn.execute(
    "INSERT INTO run_triggers (
       trigger_id, trigger_type, description, earthquake_ids, insights_generated,
       duration_seconds, recorded_at
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    rusqlite::params![
      encode_uuid(t.trigger_id),
      t.trigger_type.to_string(),
      t.description,
      serde_json::to_string(&t.earthquake_ids)?,
      t.insights_generated,
      t.duration_seconds,
      encode_dt(t.recorded_at),
    ],
  )?;
  Ok(())
}

fn count_by(conn: &Connection, column: &str) -> Result<Vec<(String, u64)>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {column}, COUNT(*) FROM insights GROUP BY {column} ORDER BY {column}"
  ))?;
  let rows = stmt
    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows.into_iter().map(|(k, n)| (k, u64::try_from(n).unwrap_or(0))).collect())
}

// ─── InsightStore impl ───────────────────────────────────────────────────────

impl InsightStore for SqliteStore {
  type Error = Error;

  // ── Engine configuration ──────────────────────────────────────────────────

  async fn engine_config(&self) -> Result<EngineConfig> {
    self.write(|conn| load_config(conn, Utc::now())).await
  }

  async fn update_engine_config(&self, update: ConfigUpdate) -> Result<EngineConfig> {
    self
      .write(move |conn| {
        let now = Utc::now();
        let next = load_config(conn, now)?.apply(&update, now)?;
        save_config(conn, &next)?;
        Ok(next)
      })
      .await
  }

  // ── Insights: writes ─────────────────────────────────────────────────────

  async fn create_insight(&self, input: NewInsight, reason: String) -> Result<Insight> {
    self
      .write(move |conn| {
        let now = Utc::now();
        let threshold = load_config(conn, now)?.min_confidence_threshold;
        WriteContext { now, threshold, triggered_by: None }.create(conn, input, &reason)
      })
      .await
  }

  async fn revise_insight(
    &self,
    id: Uuid,
    expected_version: u32,
    revision: InsightRevision,
    reason: String,
  ) -> Result<Insight> {
    self
      .write(move |conn| {
        let ctx = WriteContext { now: Utc::now(), threshold: 0.0, triggered_by: None };
        ctx.revise(conn, id, expected_version, revision, &reason)
      })
      .await
  }

  async fn invalidate_insight(
    &self,
    id: Uuid,
    expected_version: u32,
    reason: String,
  ) -> Result<Insight> {
    self
      .write(move |conn| {
        let ctx = WriteContext { now: Utc::now(), threshold: 0.0, triggered_by: None };
        ctx.retire(conn, id, expected_version, HistoryAction::Invalidated, &reason)
      })
      .await
  }

  async fn evolve_insight(
    &self,
    parent_id: Uuid,
    expected_version: u32,
    successor: NewInsight,
    reason: String,
  ) -> Result<Insight> {
    self
      .write(move |conn| {
        let now = Utc::now();
        let threshold = load_config(conn, now)?.min_confidence_threshold;
        let ctx = WriteContext { now, threshold, triggered_by: None };
        let (_, child) = ctx.evolve(conn, parent_id, expected_version, successor, &reason)?;
        Ok(child)
      })
      .await
  }

  async fn commit_run(&self, commit: RunCommit) -> Result<CommitSummary> {
    self
      .write(move |conn| {
        let mut config = load_config(conn, commit.ran_at)?;
        if config.next_run_at != commit.expected_next_run_at {
          return Err(Error::Core(seismo_core::Error::ScheduleConflict));
        }

        let generated = commit.generated() as u64;
        let ctx = WriteContext {
          now:          commit.ran_at,
          threshold:    config.min_confidence_threshold,
          triggered_by: Some(encode_uuid(commit.trigger.trigger_id)),
        };
        let mut summary = CommitSummary::default();

        for input in commit.creates {
          let reason = format!("new {} finding", input.category);
          summary.created.push(ctx.create(conn, input, &reason)?);
        }
        for r in commit.revisions {
          summary
            .updated
            .push(ctx.revise(conn, r.insight_id, r.expected_version, r.revision, &r.reason)?);
        }
        for e in commit.evolutions {
          let (parent, child) =
            ctx.evolve(conn, e.parent_id, e.expected_version, e.successor, &e.reason)?;
          summary.invalidated.push(parent);
          summary.created.push(child);
        }
        for i in commit.invalidations {
          summary.invalidated.push(ctx.retire(
            conn,
            i.insight_id,
            i.expected_version,
            HistoryAction::Invalidated,
            &i.reason,
          )?);
        }

        config.last_run_at = Some(commit.ran_at);
        config.next_run_at = Some(commit.next_run_at);
        config.total_runs += 1;
        config.total_insights_generated += generated;
        config.updated_at = commit.ran_at;
        save_config(conn, &config)?;
        insert_trigger(conn, &commit.trigger)?;

        Ok(summary)
      })
      .await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_insight(&self, id: Uuid) -> Result<Option<Insight>> {
    self.read(move |conn| fetch_insight(conn, id)).await
  }

  async fn list_insights<'a>(&'a self, query: &'a InsightQuery) -> Result<Vec<Insight>> {
    let status = query.status.map(|s| s.to_string());
    let live_only = query.live_only && query.status.is_none();
    let insight_type = query.insight_type.map(|t| t.to_string());
    let region = query.region.clone();
    // SQLite treats a negative LIMIT as unbounded.
    let limit = query.limit.map_or(-1, |l| i64::try_from(l).unwrap_or(i64::MAX));
    let offset = query.offset.map_or(0, |o| i64::try_from(o).unwrap_or(i64::MAX));
    let invalidated = InsightStatus::Invalidated.to_string();

    let raws: Vec<RawInsight> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {INSIGHT_COLUMNS} FROM insights
           WHERE (?1 IS NULL OR status = ?1)
             AND (?2 = 0 OR status != ?3)
             AND (?4 IS NULL OR insight_type = ?4)
             AND (?5 IS NULL OR region = ?5)
           ORDER BY updated_at DESC, id
           LIMIT ?6 OFFSET ?7"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![status, live_only, invalidated, insight_type, region, limit, offset],
            RawInsight::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawInsight::into_insight).collect()
  }

  async fn history(&self, insight_id: Uuid) -> Result<Vec<InsightHistory>> {
    let id_str = encode_uuid(insight_id);

    let raws: Vec<RawHistory> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT history_id, insight_id, action, previous_json, current_json, reason,
                  triggered_by, recorded_at
           FROM insight_history
           WHERE insight_id = ?1
           ORDER BY rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawHistory {
              history_id:    row.get(0)?,
              insight_id:    row.get(1)?,
              action:        row.get(2)?,
              previous_json: row.get(3)?,
              current_json:  row.get(4)?,
              reason:        row.get(5)?,
              triggered_by:  row.get(6)?,
              recorded_at:   row.get(7)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawHistory::into_history).collect()
  }

  async fn recent_triggers(&self, limit: usize) -> Result<Vec<RunTrigger>> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    let raws: Vec<RawTrigger> = self
      .read(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT trigger_id, trigger_type, description, earthquake_ids, insights_generated,
                  duration_seconds, recorded_at
           FROM run_triggers
           ORDER BY recorded_at DESC, rowid DESC
           LIMIT ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit], |row| {
            Ok(RawTrigger {
              trigger_id:         row.get(0)?,
              trigger_type:       row.get(1)?,
              description:        row.get(2)?,
              earthquake_ids:     row.get(3)?,
              insights_generated: row.get(4)?,
              duration_seconds:   row.get(5)?,
              recorded_at:        row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTrigger::into_trigger).collect()
  }

  async fn insight_statistics(&self) -> Result<InsightStatistics> {
    self
      .read(|conn| {
        let mut stats = InsightStatistics::default();
        for (status, n) in count_by(conn, "status")? {
          stats.total += n;
          match status.parse::<InsightStatus>() {
            Ok(InsightStatus::Active) => stats.active = n,
            Ok(InsightStatus::Updated) => stats.updated = n,
            Ok(InsightStatus::Invalidated) => stats.invalidated = n,
            Err(_) => return Err(Error::Decode(format!("unknown status: {status:?}"))),
          }
        }
        stats.by_type = count_by(conn, "insight_type")?.into_iter().collect();
        stats.by_severity = count_by(conn, "severity")?.into_iter().collect();
        Ok(stats)
      })
      .await
  }
}
