//! [`SqliteStore`], the SQLite implementation of [`RewardStore`].

use std::{collections::HashSet, path::Path};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use tracing::debug;
use uuid::Uuid;

use valor_core::{
  Trait,
  classification::ClassificationRecord,
  ledger::{
    AppendOutcome, MintEvent, NewLedgerEntry, NewMint, TraitTotals, XpLedgerEntry,
  },
  session::{RecordOutcome, SessionSummary, StoredSession},
  store::RewardStore,
};

use crate::{
  Error, Result,
  encode::{
    RawLedgerEntry, RawMintEvent, RawSession, decode_json, decode_uuid, encode_dt,
    encode_json, encode_uuid,
  },
  schema::SCHEMA,
};

/// Largest number of ids bound into a single `IN (...)` list.
const IN_CHUNK: usize = 500;

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Valor reward store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Every clone
/// shares one connection, so statements from concurrent callers are
/// serialised and each `call` closure runs without interleaving.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store for tests.
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
}

/// Whether `e` is a UNIQUE or PRIMARY KEY violation.
fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        || f.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
  )
}

// ─── RewardStore impl ────────────────────────────────────────────────────────

impl RewardStore for SqliteStore {
  type Error = Error;

  // ── Classification ────────────────────────────────────────────────────────

  async fn put_classification(
    &self,
    task_id: Uuid,
    record:  ClassificationRecord,
  ) -> Result<()> {
    let task_str    = encode_uuid(task_id);
    let record_json = encode_json(&record)?;
    let at_str      = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO task_classifications (task_id, record_json, updated_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (task_id) DO UPDATE
             SET record_json = excluded.record_json,
                 updated_at  = excluded.updated_at",
          rusqlite::params![task_str, record_json, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_classification(
    &self,
    task_id: Uuid,
  ) -> Result<Option<ClassificationRecord>> {
    let task_str = encode_uuid(task_id);

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT record_json FROM task_classifications WHERE task_id = ?1",
            rusqlite::params![task_str],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    raw.as_deref().map(decode_json).transpose()
  }

  // ── Sessions ──────────────────────────────────────────────────────────────

  async fn record_session(
    &self,
    task_id: Uuid,
    user_id: Uuid,
    session: SessionSummary,
  ) -> Result<RecordOutcome> {
    let stored = StoredSession {
      task_id,
      user_id,
      completed_at: Utc::now(),
      summary: session,
    };

    let session_id       = stored.summary.session_id;
    let session_str      = encode_uuid(session_id);
    let task_str         = encode_uuid(task_id);
    let user_str         = encode_uuid(user_id);
    let duration         = stored.summary.duration_minutes;
    let events_json      = encode_json(&stored.summary.events)?;
    let self_report_json = stored
      .summary
      .self_report
      .as_ref()
      .map(encode_json)
      .transpose()?;
    let at_str           = encode_dt(stored.completed_at);

    let inserted = self
      .conn
      .call(move |conn| {
        let res = conn.execute(
          &format!(
            "INSERT INTO sessions ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            RawSession::COLUMNS
          ),
          rusqlite::params![
            session_str,
            task_str,
            user_str,
            duration,
            events_json,
            self_report_json,
            at_str,
          ],
        );
        match res {
          Ok(_) => Ok(true),
          Err(e) if is_unique_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      debug!(%session_id, "session already recorded");
      return Ok(RecordOutcome::AlreadyRecorded);
    }
    Ok(RecordOutcome::Recorded(stored))
  }

  async fn get_session(&self, session_id: Uuid) -> Result<Option<StoredSession>> {
    let session_str = encode_uuid(session_id);

    let raw: Option<RawSession> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!(
              "SELECT {} FROM sessions WHERE session_id = ?1",
              RawSession::COLUMNS
            ),
            rusqlite::params![session_str],
            RawSession::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSession::into_stored).transpose()
  }

  async fn completed_sessions(&self, task_id: Uuid) -> Result<Vec<SessionSummary>> {
    let task_str = encode_uuid(task_id);

    let raws: Vec<RawSession> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM sessions WHERE task_id = ?1
           ORDER BY completed_at, rowid",
          RawSession::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![task_str], RawSession::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(|raw| raw.into_stored().map(|s| s.summary))
      .collect()
  }

  // ── Ledger ────────────────────────────────────────────────────────────────

  async fn scored_session_ids<'a>(
    &'a self,
    session_ids: &'a [Uuid],
  ) -> Result<HashSet<Uuid>> {
    if session_ids.is_empty() {
      return Ok(HashSet::new());
    }
    let ids: Vec<String> = session_ids.iter().copied().map(encode_uuid).collect();

    let found: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut found = Vec::new();
        for chunk in ids.chunks(IN_CHUNK) {
          let placeholders = vec!["?"; chunk.len()].join(", ");
          let mut stmt = conn.prepare(&format!(
            "SELECT DISTINCT session_id FROM xp_ledger
             WHERE session_id IN ({placeholders})"
          ))?;
          let rows = stmt
            .query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
              row.get::<_, String>(0)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          found.extend(rows);
        }
        Ok(found)
      })
      .await?;

    found.iter().map(|s| decode_uuid(s)).collect()
  }

  async fn append_session_entries(
    &self,
    session_id: Uuid,
    entries:    Vec<NewLedgerEntry>,
  ) -> Result<AppendOutcome> {
    let recorded_at = Utc::now();
    let rows: Vec<XpLedgerEntry> = entries
      .into_iter()
      .map(|e| XpLedgerEntry {
        entry_id: Uuid::new_v4(),
        session_id,
        task_id: e.task_id,
        user_id: e.user_id,
        r#trait: e.r#trait,
        base_xp: e.base_xp,
        multiplier_breakdown: e.multiplier_breakdown,
        final_xp: e.final_xp,
        narrative_seed: e.narrative_seed,
        recorded_at,
      })
      .collect();
    if rows.is_empty() {
      return Ok(AppendOutcome::Appended(rows));
    }

    let raws = rows
      .iter()
      .map(RawLedgerEntry::encode)
      .collect::<Result<Vec<_>>>()?;
    let session_str = encode_uuid(session_id);

    let appended = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let already: bool = tx.query_row(
          "SELECT EXISTS (SELECT 1 FROM xp_ledger WHERE session_id = ?1)",
          rusqlite::params![session_str],
          |row| row.get(0),
        )?;
        if already {
          return Ok(false);
        }

        {
          let mut stmt = tx.prepare(&format!(
            "INSERT INTO xp_ledger ({})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            RawLedgerEntry::COLUMNS
          ))?;
          for raw in &raws {
            let res = stmt.execute(rusqlite::params![
              raw.entry_id,
              raw.session_id,
              raw.task_id,
              raw.user_id,
              raw.r#trait,
              raw.base_xp,
              raw.breakdown_json,
              raw.final_xp,
              raw.narrative_seed,
              raw.recorded_at,
            ]);
            match res {
              Ok(_) => {}
              // Dropping `tx` rolls back the rows already inserted.
              Err(e) if is_unique_violation(&e) => return Ok(false),
              Err(e) => return Err(e.into()),
            }
          }
        }

        tx.commit()?;
        Ok(true)
      })
      .await?;

    if appended {
      Ok(AppendOutcome::Appended(rows))
    } else {
      debug!(%session_id, "ledger rows rejected; session already scored");
      Ok(AppendOutcome::AlreadyScored)
    }
  }

  async fn ledger_for_session(&self, session_id: Uuid) -> Result<Vec<XpLedgerEntry>> {
    let session_str = encode_uuid(session_id);

    let raws: Vec<RawLedgerEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM xp_ledger WHERE session_id = ?1 ORDER BY rowid",
          RawLedgerEntry::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![session_str], RawLedgerEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLedgerEntry::into_entry).collect()
  }

  async fn trait_totals(&self, user_id: Uuid) -> Result<TraitTotals> {
    let user_str = encode_uuid(user_id);

    let sums: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT trait, SUM(final_xp) FROM xp_ledger
           WHERE user_id = ?1
           GROUP BY trait",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    sums
      .into_iter()
      .map(|(name, sum)| -> Result<(Trait, u64)> {
        let earned = u64::try_from(sum).map_err(|_| Error::AmountOutOfRange(sum.to_string()))?;
        Ok((Trait::parse(&name)?, earned))
      })
      .collect()
  }

  // ── Tokens ────────────────────────────────────────────────────────────────

  async fn mint(&self, mint: NewMint) -> Result<MintEvent> {
    let event = MintEvent {
      mint_id:   Uuid::new_v4(),
      user_id:   mint.user_id,
      amount:    mint.amount,
      meta:      mint.meta,
      timestamp: Utc::now(),
    };

    let mint_str  = encode_uuid(event.mint_id);
    let user_str  = encode_uuid(event.user_id);
    let amount    = i64::try_from(event.amount)
      .map_err(|_| Error::AmountOutOfRange(event.amount.to_string()))?;
    let meta_json = encode_json(&event.meta)?;
    let at_str    = encode_dt(event.timestamp);

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        tx.execute(
          "INSERT INTO mint_events (mint_id, user_id, amount, meta_json, recorded_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![mint_str, user_str, amount, meta_json, at_str],
        )?;
        tx.execute(
          "INSERT INTO wallets (user_id, balance, updated_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (user_id) DO UPDATE
             SET balance    = balance + excluded.balance,
                 updated_at = excluded.updated_at",
          rusqlite::params![user_str, amount, at_str],
        )?;
        tx.commit()?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  async fn wallet_balance(&self, user_id: Uuid) -> Result<u64> {
    let user_str = encode_uuid(user_id);

    let balance: Option<i64> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT balance FROM wallets WHERE user_id = ?1",
            rusqlite::params![user_str],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;

    Ok(balance.map_or(0, |b| u64::try_from(b).unwrap_or(0)))
  }

  async fn mint_events(&self, user_id: Uuid) -> Result<Vec<MintEvent>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawMintEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT mint_id, user_id, amount, meta_json, recorded_at
           FROM mint_events
           WHERE user_id = ?1
           ORDER BY recorded_at, rowid",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], RawMintEvent::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMintEvent::into_event).collect()
  }
}
