//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. Structured fields
//! (classification records, events, self-reports, multiplier breakdowns, mint
//! metadata) are stored as compact JSON. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;
use valor_core::{
  Trait,
  ledger::{MintEvent, XpLedgerEntry},
  session::{SessionSummary, StoredSession},
};

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── JSON columns ────────────────────────────────────────────────────────────

pub fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_json<T: DeserializeOwned>(s: &str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `sessions` row.
pub struct RawSession {
  pub session_id:       String,
  pub task_id:          String,
  pub user_id:          String,
  pub duration_minutes: f64,
  pub events_json:      String,
  pub self_report_json: Option<String>,
  pub completed_at:     String,
}

impl RawSession {
  pub const COLUMNS: &'static str = "session_id, task_id, user_id, \
    duration_minutes, events_json, self_report_json, completed_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      session_id:       row.get(0)?,
      task_id:          row.get(1)?,
      user_id:          row.get(2)?,
      duration_minutes: row.get(3)?,
      events_json:      row.get(4)?,
      self_report_json: row.get(5)?,
      completed_at:     row.get(6)?,
    })
  }

  pub fn into_stored(self) -> Result<StoredSession> {
    let self_report = self
      .self_report_json
      .as_deref()
      .map(decode_json)
      .transpose()?;

    Ok(StoredSession {
      task_id:      decode_uuid(&self.task_id)?,
      user_id:      decode_uuid(&self.user_id)?,
      completed_at: decode_dt(&self.completed_at)?,
      summary:      SessionSummary {
        session_id: decode_uuid(&self.session_id)?,
        duration_minutes: self.duration_minutes,
        events: decode_json(&self.events_json)?,
        self_report,
      },
    })
  }
}

/// Raw values read directly from an `xp_ledger` row.
pub struct RawLedgerEntry {
  pub entry_id:       String,
  pub session_id:     String,
  pub task_id:        String,
  pub user_id:        String,
  pub r#trait:        String,
  pub base_xp:        u32,
  pub breakdown_json: String,
  pub final_xp:       u32,
  pub narrative_seed: String,
  pub recorded_at:    String,
}

impl RawLedgerEntry {
  pub const COLUMNS: &'static str = "entry_id, session_id, task_id, user_id, \
    trait, base_xp, breakdown_json, final_xp, narrative_seed, recorded_at";

  pub fn encode(entry: &XpLedgerEntry) -> Result<Self> {
    Ok(Self {
      entry_id:       encode_uuid(entry.entry_id),
      session_id:     encode_uuid(entry.session_id),
      task_id:        encode_uuid(entry.task_id),
      user_id:        encode_uuid(entry.user_id),
      r#trait:        entry.r#trait.as_str().to_owned(),
      base_xp:        entry.base_xp,
      breakdown_json: encode_json(&entry.multiplier_breakdown)?,
      final_xp:       entry.final_xp,
      narrative_seed: entry.narrative_seed.clone(),
      recorded_at:    encode_dt(entry.recorded_at),
    })
  }

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      entry_id:       row.get(0)?,
      session_id:     row.get(1)?,
      task_id:        row.get(2)?,
      user_id:        row.get(3)?,
      r#trait:        row.get(4)?,
      base_xp:        row.get(5)?,
      breakdown_json: row.get(6)?,
      final_xp:       row.get(7)?,
      narrative_seed: row.get(8)?,
      recorded_at:    row.get(9)?,
    })
  }

  pub fn into_entry(self) -> Result<XpLedgerEntry> {
    Ok(XpLedgerEntry {
      entry_id:             decode_uuid(&self.entry_id)?,
      session_id:           decode_uuid(&self.session_id)?,
      task_id:              decode_uuid(&self.task_id)?,
      user_id:              decode_uuid(&self.user_id)?,
      r#trait:              Trait::parse(&self.r#trait)?,
      base_xp:              self.base_xp,
      multiplier_breakdown: decode_json(&self.breakdown_json)?,
      final_xp:             self.final_xp,
      narrative_seed:       self.narrative_seed,
      recorded_at:          decode_dt(&self.recorded_at)?,
    })
  }
}

/// Raw values read directly from a `mint_events` row.
pub struct RawMintEvent {
  pub mint_id:     String,
  pub user_id:     String,
  pub amount:      i64,
  pub meta_json:   String,
  pub recorded_at: String,
}

impl RawMintEvent {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      mint_id:     row.get(0)?,
      user_id:     row.get(1)?,
      amount:      row.get(2)?,
      meta_json:   row.get(3)?,
      recorded_at: row.get(4)?,
    })
  }

  pub fn into_event(self) -> Result<MintEvent> {
    Ok(MintEvent {
      mint_id:   decode_uuid(&self.mint_id)?,
      user_id:   decode_uuid(&self.user_id)?,
      amount:    u64::try_from(self.amount)
        .map_err(|_| Error::AmountOutOfRange(self.amount.to_string()))?,
      meta:      decode_json(&self.meta_json)?,
      timestamp: decode_dt(&self.recorded_at)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn dt_roundtrip_preserves_instant() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
  }

  #[test]
  fn bad_date_is_a_parse_error() {
    assert!(matches!(decode_dt("yesterday"), Err(Error::DateParse(_))));
  }

  #[test]
  fn unknown_trait_column_is_a_core_error() {
    let raw = RawLedgerEntry {
      entry_id:       encode_uuid(Uuid::new_v4()),
      session_id:     encode_uuid(Uuid::new_v4()),
      task_id:        encode_uuid(Uuid::new_v4()),
      user_id:        encode_uuid(Uuid::new_v4()),
      r#trait:        "charisma".into(),
      base_xp:        1,
      breakdown_json: r#"{"friction":1.0,"stakes":1.0,"discomfort":1.0,"total":1.0}"#.into(),
      final_xp:       1,
      narrative_seed: String::new(),
      recorded_at:    encode_dt(Utc::now()),
    };
    assert!(matches!(raw.into_entry(), Err(Error::Core(_))));
  }
}
