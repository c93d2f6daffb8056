//! SQL schema for the insight store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS insights (
    id                TEXT PRIMARY KEY,
    version           INTEGER NOT NULL CHECK (version >= 1),
    parent_insight_id TEXT REFERENCES insights(id),
    insight_type      TEXT NOT NULL,   -- pattern | anomaly | risk | correlation | prediction
    category          TEXT NOT NULL,
    severity          TEXT NOT NULL,   -- low | moderate | high | critical
    title             TEXT NOT NULL,
    description       TEXT NOT NULL,
    region            TEXT NOT NULL,
    location          TEXT,
    latitude          REAL,
    longitude         REAL,
    confidence_score  REAL NOT NULL CHECK (confidence_score BETWEEN 0.0 AND 1.0),
    supporting_data   TEXT NOT NULL,   -- JSON
    earthquake_count  INTEGER NOT NULL,
    magnitude_range   TEXT,
    depth_range       TEXT,
    time_window_days  INTEGER NOT NULL,
    status            TEXT NOT NULL,   -- active | updated | invalidated
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL,
    valid_until       TEXT,
    generated_by      TEXT NOT NULL
);

-- Append-only. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS insight_history (
    history_id    TEXT PRIMARY KEY,
    insight_id    TEXT NOT NULL REFERENCES insights(id),
    action        TEXT NOT NULL,       -- created | updated | invalidated | evolved
    previous_json TEXT,
    current_json  TEXT NOT NULL,
    reason        TEXT NOT NULL,
    triggered_by  TEXT,
    recorded_at   TEXT NOT NULL
);

-- Singleton row.
CREATE TABLE IF NOT EXISTS engine_config (
    id                       INTEGER PRIMARY KEY CHECK (id = 1),
    enabled                  INTEGER NOT NULL,
    analysis_frequency_hours INTEGER NOT NULL CHECK (analysis_frequency_hours >= 1),
    next_run_at              TEXT,
    last_run_at              TEXT,
    total_runs               INTEGER NOT NULL DEFAULT 0,
    total_insights_generated INTEGER NOT NULL DEFAULT 0,
    ai_model                 TEXT NOT NULL,
    min_confidence_threshold REAL NOT NULL,
    updated_at               TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS run_triggers (
    trigger_id         TEXT PRIMARY KEY,
    trigger_type       TEXT NOT NULL,  -- scheduled_analysis | manual_analysis
    description        TEXT NOT NULL,
    earthquake_ids     TEXT NOT NULL,  -- JSON array
    insights_generated INTEGER NOT NULL,
    duration_seconds   REAL NOT NULL,
    recorded_at        TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS insights_status_idx  ON insights(status);
CREATE INDEX IF NOT EXISTS insights_region_idx  ON insights(region);
CREATE INDEX IF NOT EXISTS insights_updated_idx ON insights(updated_at);
CREATE INDEX IF NOT EXISTS history_insight_idx  ON insight_history(insight_id);
CREATE INDEX IF NOT EXISTS triggers_recorded_idx ON run_triggers(recorded_at);

PRAGMA user_version = 1;
";
