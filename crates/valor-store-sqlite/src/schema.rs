//! SQL schema for the Valor SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Owned by the classification-capture flow; read-only to scoring.
CREATE TABLE IF NOT EXISTS task_classifications (
    task_id      TEXT PRIMARY KEY,
    record_json  TEXT NOT NULL,   -- ClassificationRecord; fields may be absent
    updated_at   TEXT NOT NULL
);

-- Completed sessions, as handed over by session tracking. Never updated.
CREATE TABLE IF NOT EXISTS sessions (
    session_id        TEXT PRIMARY KEY,
    task_id           TEXT NOT NULL,
    user_id           TEXT NOT NULL,
    duration_minutes  REAL NOT NULL,
    events_json       TEXT NOT NULL DEFAULT '[]',
    self_report_json  TEXT,            -- NULL when no self-report was given
    completed_at      TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

-- XP awards are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
-- session_id is not a foreign key: batches may be scored from sessions the
-- store never held.
CREATE TABLE IF NOT EXISTS xp_ledger (
    entry_id        TEXT PRIMARY KEY,
    session_id      TEXT NOT NULL,
    task_id         TEXT NOT NULL,
    user_id         TEXT NOT NULL,
    trait           TEXT NOT NULL,
    base_xp         INTEGER NOT NULL CHECK (base_xp >= 0),
    breakdown_json  TEXT NOT NULL,     -- MultiplierBreakdown
    final_xp        INTEGER NOT NULL CHECK (final_xp > 0),
    narrative_seed  TEXT NOT NULL DEFAULT '',
    recorded_at     TEXT NOT NULL,
    UNIQUE (session_id, trait)
);

-- Append-only; every row is matched by a wallet increment in the same
-- transaction.
CREATE TABLE IF NOT EXISTS mint_events (
    mint_id      TEXT PRIMARY KEY,
    user_id      TEXT NOT NULL,
    amount       INTEGER NOT NULL CHECK (amount > 0),
    meta_json    TEXT NOT NULL,        -- MintMeta
    recorded_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS wallets (
    user_id     TEXT PRIMARY KEY,
    balance     INTEGER NOT NULL DEFAULT 0 CHECK (balance >= 0),
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_task_idx     ON sessions(task_id);
CREATE INDEX IF NOT EXISTS xp_ledger_user_idx    ON xp_ledger(user_id);
CREATE INDEX IF NOT EXISTS mint_events_user_idx  ON mint_events(user_id);

PRAGMA user_version = 1;
";
