//! Scoring orchestration: idempotent batch awards, the immediate single
//! session scorer, and multi-task sweeps.
//!
//! A session contributes to the ledger and to the token supply at most once.
//! The idempotency filter below is only an optimistic pre-check; the
//! guarantee comes from the store rejecting a second set of rows for a
//! session ([`AppendOutcome::AlreadyScored`]). Rejected sessions are left out
//! of the run's totals, so their tokens are never minted twice.
//!
//! Ledger rows are written before the mint. A run interrupted between the two
//! leaves XP recorded without tokens, which is a valid final state.

use std::collections::HashSet;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  classification::{MultiplierBreakdown, TaskClassification},
  ledger::{AppendOutcome, NewLedgerEntry, NewMint, MintMeta, ScoringResult, TaskOutcome},
  scoring::{TraitAward, score_traits, tokens_for},
  session::SessionSummary,
  store::RewardStore,
};

/// Sessions from `sessions` that are not in `scored`, in their original
/// order. A session id repeated within the batch is kept once.
pub fn unscored(
  sessions: Vec<SessionSummary>,
  scored: &HashSet<Uuid>,
) -> Vec<SessionSummary> {
  let mut seen = HashSet::new();
  sessions
    .into_iter()
    .filter(|s| !scored.contains(&s.session_id) && seen.insert(s.session_id))
    .collect()
}

/// Resolve a task's classification, filling gaps with defaults.
pub async fn classification_for<S: RewardStore>(
  store: &S,
  task_id: Uuid,
) -> Result<TaskClassification, S::Error> {
  Ok(store.get_classification(task_id).await?.into())
}

/// Score every session in `sessions` that has no ledger rows yet and mint
/// once for the whole batch.
pub async fn score<S: RewardStore>(
  store: &S,
  task_id: Uuid,
  user_id: Uuid,
  sessions: Vec<SessionSummary>,
) -> Result<ScoringResult, S::Error> {
  let classification = classification_for(store, task_id).await?;

  let ids: Vec<Uuid> = sessions.iter().map(|s| s.session_id).collect();
  let already = store.scored_session_ids(&ids).await?;
  let pending = unscored(sessions, &already);
  if pending.is_empty() {
    debug!(%task_id, offered = ids.len(), "no unscored sessions");
    return Ok(ScoringResult::default());
  }

  let breakdown = classification.multiplier();
  let batch: Vec<(Uuid, Vec<TraitAward>)> = pending
    .iter()
    .map(|s| (s.session_id, score_traits(s, &classification, breakdown.total)))
    .collect();

  let mut result = ScoringResult::default();
  for (session_id, awards) in batch {
    if append(store, task_id, user_id, session_id, breakdown, &awards).await? {
      result.absorb(session_id, awards);
    }
  }

  mint_for(store, task_id, user_id, result).await
}

/// Run [`score`] over every completed session the store holds for a task.
pub async fn award_task<S: RewardStore>(
  store: &S,
  task_id: Uuid,
  user_id: Uuid,
) -> Result<ScoringResult, S::Error> {
  let sessions = store.completed_sessions(task_id).await?;
  score(store, task_id, user_id, sessions).await
}

/// Score one freshly completed session and mint for its XP alone.
///
/// Unlike [`score`] this does not consult the ledger before scoring. The
/// store's per-session uniqueness still applies: if the session was already
/// scored its rows are rejected and the result is empty.
pub async fn score_session<S: RewardStore>(
  store: &S,
  task_id: Uuid,
  user_id: Uuid,
  session: &SessionSummary,
) -> Result<ScoringResult, S::Error> {
  let classification = classification_for(store, task_id).await?;
  let breakdown = classification.multiplier();
  let awards = score_traits(session, &classification, breakdown.total);

  let mut result = ScoringResult::default();
  if append(store, task_id, user_id, session.session_id, breakdown, &awards).await? {
    result.absorb(session.session_id, awards);
  }

  mint_for(store, task_id, user_id, result).await
}

/// Award every task in `task_ids` independently. A failing task is reported
/// in its outcome and does not stop the others.
pub async fn sweep<S: RewardStore>(
  store: &S,
  user_id: Uuid,
  task_ids: &[Uuid],
) -> Vec<TaskOutcome> {
  let mut outcomes = Vec::with_capacity(task_ids.len());
  for &task_id in task_ids {
    let outcome = match award_task(store, task_id, user_id).await {
      Ok(result) => TaskOutcome::Scored { task_id, result },
      Err(e) => {
        warn!(%task_id, error = %e, "task scoring failed");
        TaskOutcome::Failed { task_id, error: e.to_string() }
      }
    };
    outcomes.push(outcome);
  }
  outcomes
}

/// Offer one session's awards to the ledger. Returns whether this call wrote
/// them.
async fn append<S: RewardStore>(
  store: &S,
  task_id: Uuid,
  user_id: Uuid,
  session_id: Uuid,
  breakdown: MultiplierBreakdown,
  awards: &[TraitAward],
) -> Result<bool, S::Error> {
  if awards.is_empty() {
    return Ok(false);
  }

  let entries = awards
    .iter()
    .map(|a| NewLedgerEntry::from_award(session_id, task_id, user_id, breakdown, a))
    .collect();

  match store.append_session_entries(session_id, entries).await? {
    AppendOutcome::Appended(rows) => {
      debug!(%session_id, rows = rows.len(), "session scored");
      Ok(true)
    }
    AppendOutcome::AlreadyScored => {
      warn!(%session_id, "session already scored; skipping");
      Ok(false)
    }
  }
}

async fn mint_for<S: RewardStore>(
  store: &S,
  task_id: Uuid,
  user_id: Uuid,
  mut result: ScoringResult,
) -> Result<ScoringResult, S::Error> {
  result.tokens = tokens_for(result.total_xp);
  if result.tokens == 0 {
    return Ok(result);
  }

  let event = store
    .mint(NewMint {
      user_id,
      amount: result.tokens,
      meta: MintMeta {
        session_ids:      result.session_ids.clone(),
        per_trait_totals: result.per_trait_totals.clone(),
        source_task_id:   task_id,
      },
    })
    .await?;

  info!(
    %task_id,
    %user_id,
    sessions = result.session_ids.len(),
    total_xp = result.total_xp,
    tokens = result.tokens,
    "minted tokens"
  );
  result.mint_id = Some(event.mint_id);
  Ok(result)
}
