//! Handlers for `/sessions` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/sessions/:id/score` | Immediate scorer for one recorded session |
//! | `GET`  | `/sessions/:id/ledger` | Ledger rows written for the session |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use uuid::Uuid;
use valor_core::{
  engine,
  ledger::{ScoringResult, XpLedgerEntry},
  store::RewardStore,
};

use crate::error::ApiError;

/// `POST /sessions/:id/score`
///
/// Scores the session as soon as it stops, without sweeping the rest of the
/// task's history. A session that was already scored yields an empty result.
pub async fn score<S>(
  State(store): State<Arc<S>>,
  Path(session_id): Path<Uuid>,
) -> Result<Json<ScoringResult>, ApiError>
where
  S: RewardStore,
{
  let stored = store
    .get_session(session_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("session {session_id} not found")))?;

  let result =
    engine::score_session(store.as_ref(), stored.task_id, stored.user_id, &stored.summary)
      .await
      .map_err(ApiError::store)?;
  Ok(Json(result))
}

/// `GET /sessions/:id/ledger`
pub async fn ledger<S>(
  State(store): State<Arc<S>>,
  Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<XpLedgerEntry>>, ApiError>
where
  S: RewardStore,
{
  let rows = store
    .ledger_for_session(session_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(rows))
}
