//! The `RewardStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `valor-store-sqlite`).
//! The engine and the HTTP layer depend on this abstraction, not on any
//! concrete backend.

use std::{collections::HashSet, future::Future};

use uuid::Uuid;

use crate::{
  classification::ClassificationRecord,
  ledger::{AppendOutcome, MintEvent, NewLedgerEntry, NewMint, TraitTotals, XpLedgerEntry},
  session::{RecordOutcome, SessionSummary, StoredSession},
};

/// Abstraction over the persistence the scoring engine needs.
///
/// Ledger and mint tables are append-only. Implementations must enforce
/// uniqueness of `(session_id, trait)` in the ledger and must apply each mint
/// and its wallet increment atomically.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait RewardStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Classification ────────────────────────────────────────────────────

  /// Insert or replace the classification record for a task.
  fn put_classification(
    &self,
    task_id: Uuid,
    record: ClassificationRecord,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The raw (possibly partial) classification of a task, if one was
  /// captured.
  fn get_classification(
    &self,
    task_id: Uuid,
  ) -> impl Future<Output = Result<Option<ClassificationRecord>, Self::Error>>
  + Send
  + '_;

  // ── Sessions ──────────────────────────────────────────────────────────

  /// Record a completed session.
  ///
  /// The check for an existing session id and the insert are one atomic
  /// step; a taken id yields [`RecordOutcome::AlreadyRecorded`].
  fn record_session(
    &self,
    task_id: Uuid,
    user_id: Uuid,
    session: SessionSummary,
  ) -> impl Future<Output = Result<RecordOutcome, Self::Error>> + Send + '_;

  fn get_session(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Option<StoredSession>, Self::Error>> + Send + '_;

  /// Every completed session of a task, oldest first.
  fn completed_sessions(
    &self,
    task_id: Uuid,
  ) -> impl Future<Output = Result<Vec<SessionSummary>, Self::Error>> + Send + '_;

  // ── Ledger ────────────────────────────────────────────────────────────

  /// The subset of `session_ids` that already have at least one ledger row.
  fn scored_session_ids<'a>(
    &'a self,
    session_ids: &'a [Uuid],
  ) -> impl Future<Output = Result<HashSet<Uuid>, Self::Error>> + Send + 'a;

  /// Append every row for one session as a single unit.
  ///
  /// If the session already has any ledger row the whole unit is rejected
  /// and [`AppendOutcome::AlreadyScored`] is returned instead of an error.
  fn append_session_entries(
    &self,
    session_id: Uuid,
    entries: Vec<NewLedgerEntry>,
  ) -> impl Future<Output = Result<AppendOutcome, Self::Error>> + Send + '_;

  fn ledger_for_session(
    &self,
    session_id: Uuid,
  ) -> impl Future<Output = Result<Vec<XpLedgerEntry>, Self::Error>> + Send + '_;

  /// Lifetime XP per trait for a user. Traits with no XP are absent.
  fn trait_totals(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<TraitTotals, Self::Error>> + Send + '_;

  // ── Tokens ────────────────────────────────────────────────────────────

  /// Record a mint event and credit the wallet in one atomic step.
  fn mint(
    &self,
    mint: NewMint,
  ) -> impl Future<Output = Result<MintEvent, Self::Error>> + Send + '_;

  /// Sum of every mint for the user; zero if they never received any.
  fn wallet_balance(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Mint history for a user, oldest first.
  fn mint_events(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<MintEvent>, Self::Error>> + Send + '_;
}
