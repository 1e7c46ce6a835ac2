//! Ledger rows, mint events, and the results handed back to callers.
//!
//! The XP ledger is append-only. The presence of any ledger row for a session
//! is the only record that the session has been scored; there is no separate
//! flag.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{classification::MultiplierBreakdown, scoring::TraitAward, taxonomy::Trait};

/// Per-trait XP sums. Wider than a single award so that many large awards
/// can be summed.
pub type TraitTotals = BTreeMap<Trait, u64>;

// ─── Ledger ──────────────────────────────────────────────────────────────────

/// One trait's award for one session. At most one row exists per
/// `(session_id, trait)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XpLedgerEntry {
  pub entry_id:             Uuid,
  pub session_id:           Uuid,
  pub task_id:              Uuid,
  pub user_id:              Uuid,
  pub r#trait:              Trait,
  pub base_xp:              u32,
  pub multiplier_breakdown: MultiplierBreakdown,
  pub final_xp:             u32,
  pub narrative_seed:       String,
  /// Server-assigned; never changes after creation.
  pub recorded_at:          DateTime<Utc>,
}

/// Input to [`crate::store::RewardStore::append_session_entries`].
/// `entry_id` and `recorded_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
  pub session_id:           Uuid,
  pub task_id:              Uuid,
  pub user_id:              Uuid,
  pub r#trait:              Trait,
  pub base_xp:              u32,
  pub multiplier_breakdown: MultiplierBreakdown,
  pub final_xp:             u32,
  pub narrative_seed:       String,
}

impl NewLedgerEntry {
  pub fn from_award(
    session_id: Uuid,
    task_id: Uuid,
    user_id: Uuid,
    breakdown: MultiplierBreakdown,
    award: &TraitAward,
  ) -> Self {
    Self {
      session_id,
      task_id,
      user_id,
      r#trait: award.r#trait,
      base_xp: award.base_xp,
      multiplier_breakdown: breakdown,
      final_xp: award.final_xp,
      narrative_seed: award.narrative_seed.clone(),
    }
  }
}

/// What happened when a session's rows were offered to the ledger.
#[derive(Debug, Clone)]
pub enum AppendOutcome {
  /// Every row was written.
  Appended(Vec<XpLedgerEntry>),
  /// The session already had ledger rows; nothing was written.
  AlreadyScored,
}

// ─── Tokens ──────────────────────────────────────────────────────────────────

/// Provenance attached to a mint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintMeta {
  pub session_ids:      Vec<Uuid>,
  pub per_trait_totals: TraitTotals,
  pub source_task_id:   Uuid,
}

/// Input to [`crate::store::RewardStore::mint`].
#[derive(Debug, Clone)]
pub struct NewMint {
  pub user_id: Uuid,
  pub amount:  u64,
  pub meta:    MintMeta,
}

/// A recorded credit of tokens to a user's wallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintEvent {
  pub mint_id:   Uuid,
  pub user_id:   Uuid,
  pub amount:    u64,
  pub meta:      MintMeta,
  pub timestamp: DateTime<Utc>,
}

// ─── Results ─────────────────────────────────────────────────────────────────

/// A trait award tagged with the session that earned it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitResult {
  pub session_id: Uuid,
  #[serde(flatten)]
  pub award:      TraitAward,
}

/// The outcome of one scoring run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringResult {
  pub per_trait_results: Vec<TraitResult>,
  pub total_xp:          u64,
  pub tokens:            u64,
  pub per_trait_totals:  TraitTotals,
  /// Sessions whose ledger rows this run wrote.
  pub session_ids:       Vec<Uuid>,
  /// Set when the run minted tokens.
  pub mint_id:           Option<Uuid>,
}

impl ScoringResult {
  /// Fold one session's awards into the running totals.
  pub(crate) fn absorb(&mut self, session_id: Uuid, awards: Vec<TraitAward>) {
    for award in awards {
      let earned = u64::from(award.final_xp);
      self.total_xp = self.total_xp.saturating_add(earned);
      let slot = self.per_trait_totals.entry(award.r#trait).or_default();
      *slot = slot.saturating_add(earned);
      self.per_trait_results.push(TraitResult { session_id, award });
    }
    self.session_ids.push(session_id);
  }

  pub fn is_empty(&self) -> bool { self.session_ids.is_empty() }
}

/// Per-task result of a multi-task sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskOutcome {
  Scored { task_id: Uuid, result: ScoringResult },
  Failed { task_id: Uuid, error: String },
}

impl TaskOutcome {
  pub fn task_id(&self) -> Uuid {
    match self {
      Self::Scored { task_id, .. } | Self::Failed { task_id, .. } => *task_id,
    }
  }

  pub fn is_scored(&self) -> bool { matches!(self, Self::Scored { .. }) }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn award(t: Trait, xp: u32) -> TraitAward {
    TraitAward { r#trait: t, base_xp: xp, final_xp: xp, narrative_seed: String::new() }
  }

  #[test]
  fn absorb_accumulates_across_sessions() {
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
    let mut result = ScoringResult::default();
    assert!(result.is_empty());

    result.absorb(a, vec![award(Trait::Initiative, 12), award(Trait::Courage, 15)]);
    result.absorb(b, vec![award(Trait::Initiative, 20)]);

    assert_eq!(result.total_xp, 47);
    assert_eq!(result.per_trait_totals[&Trait::Initiative], 32);
    assert_eq!(result.per_trait_totals[&Trait::Courage], 15);
    assert_eq!(result.session_ids, vec![a, b]);
    assert_eq!(result.per_trait_results.len(), 3);
  }

  #[test]
  fn absorb_sums_awards_beyond_u32() {
    let mut result = ScoringResult::default();
    result.absorb(Uuid::new_v4(), vec![
      award(Trait::Discipline, u32::MAX),
      award(Trait::Perseverance, u32::MAX),
    ]);
    result.absorb(Uuid::new_v4(), vec![award(Trait::Discipline, u32::MAX)]);

    let max = u64::from(u32::MAX);
    assert_eq!(result.total_xp, 3 * max);
    assert_eq!(result.per_trait_totals[&Trait::Discipline], 2 * max);
    assert_eq!(result.per_trait_totals[&Trait::Perseverance], max);
  }

  #[test]
  fn trait_result_serialises_flat() {
    let r = TraitResult { session_id: Uuid::nil(), award: award(Trait::Courage, 15) };
    let json = serde_json::to_value(&r).unwrap();
    assert_eq!(json["trait"], "courage");
    assert_eq!(json["final_xp"], 15);
  }

  #[test]
  fn per_trait_totals_use_trait_names_as_keys() {
    let mut totals = TraitTotals::new();
    totals.insert(Trait::Endurance, 10);
    let json = serde_json::to_string(&totals).unwrap();
    assert_eq!(json, r#"{"endurance":10}"#);
  }
}
