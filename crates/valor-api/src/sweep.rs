//! Handler for `POST /sweep`.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::Deserialize;
use uuid::Uuid;
use valor_core::{engine, ledger::TaskOutcome, store::RewardStore};

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SweepBody {
  pub user_id:  Uuid,
  pub task_ids: Vec<Uuid>,
}

/// `POST /sweep`: award each listed task. Always 200 once the body is valid;
/// tasks that failed are reported individually in the response.
pub async fn handler<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<SweepBody>,
) -> Result<Json<Vec<TaskOutcome>>, ApiError>
where
  S: RewardStore,
{
  if body.task_ids.is_empty() {
    return Err(ApiError::BadRequest("task_ids must not be empty".into()));
  }
  Ok(Json(engine::sweep(store.as_ref(), body.user_id, &body.task_ids).await))
}
