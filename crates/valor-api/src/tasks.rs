//! Handlers for `/tasks` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/tasks/:id/classification` | Resolved classification + multiplier |
//! | `PUT`  | `/tasks/:id/classification` | Body: [`ClassificationRecord`] |
//! | `POST` | `/tasks/:id/sessions` | Body: [`RecordSessionBody`]; 201, or 409 for a known session id |
//! | `POST` | `/tasks/:id/score` | Body: [`ScoreBody`]; awards stored history |
//! | `POST` | `/tasks/:id/score-batch` | Body: [`ScoreBatchBody`]; awards the given sessions |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use valor_core::{
  classification::{ClassificationRecord, MultiplierBreakdown, TaskClassification},
  engine,
  ledger::ScoringResult,
  session::{RecordOutcome, SessionSummary},
  store::RewardStore,
};

use crate::error::ApiError;

// ─── Classification ───────────────────────────────────────────────────────────

/// A task's classification as captured and as the engine will use it.
#[derive(Debug, Serialize)]
pub struct ClassificationView {
  pub task_id:        Uuid,
  /// `None` when the task was never classified.
  pub record:         Option<ClassificationRecord>,
  pub classification: TaskClassification,
  pub multiplier:     MultiplierBreakdown,
}

impl ClassificationView {
  fn new(task_id: Uuid, record: Option<ClassificationRecord>) -> Self {
    let classification = TaskClassification::from(record.clone());
    Self {
      task_id,
      record,
      multiplier: classification.multiplier(),
      classification,
    }
  }
}

/// `GET /tasks/:id/classification`
pub async fn get_classification<S>(
  State(store): State<Arc<S>>,
  Path(task_id): Path<Uuid>,
) -> Result<Json<ClassificationView>, ApiError>
where
  S: RewardStore,
{
  let record = store
    .get_classification(task_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(ClassificationView::new(task_id, record)))
}

/// `PUT /tasks/:id/classification`: replaces any earlier record.
pub async fn put_classification<S>(
  State(store): State<Arc<S>>,
  Path(task_id): Path<Uuid>,
  Json(record): Json<ClassificationRecord>,
) -> Result<Json<ClassificationView>, ApiError>
where
  S: RewardStore,
{
  store
    .put_classification(task_id, record.clone())
    .await
    .map_err(ApiError::store)?;
  Ok(Json(ClassificationView::new(task_id, Some(record))))
}

// ─── Session intake ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RecordSessionBody {
  pub user_id: Uuid,
  #[serde(flatten)]
  pub session: SessionSummary,
}

/// `POST /tasks/:id/sessions`: returns 201 + the stored session.
pub async fn record_session<S>(
  State(store): State<Arc<S>>,
  Path(task_id): Path<Uuid>,
  Json(body): Json<RecordSessionBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: RewardStore,
{
  let session_id = body.session.session_id;
  match store
    .record_session(task_id, body.user_id, body.session)
    .await
    .map_err(ApiError::store)?
  {
    RecordOutcome::Recorded(stored) => Ok((StatusCode::CREATED, Json(stored))),
    RecordOutcome::AlreadyRecorded => Err(ApiError::Conflict(format!(
      "session {session_id} already recorded"
    ))),
  }
}

// ─── Scoring ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScoreBody {
  pub user_id: Uuid,
}

/// `POST /tasks/:id/score`: award every stored session not yet scored.
pub async fn score<S>(
  State(store): State<Arc<S>>,
  Path(task_id): Path<Uuid>,
  Json(body): Json<ScoreBody>,
) -> Result<Json<ScoringResult>, ApiError>
where
  S: RewardStore,
{
  let result = engine::award_task(store.as_ref(), task_id, body.user_id)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct ScoreBatchBody {
  pub user_id:  Uuid,
  pub sessions: Vec<SessionSummary>,
}

/// `POST /tasks/:id/score-batch`: award the supplied sessions, skipping any
/// already in the ledger.
pub async fn score_batch<S>(
  State(store): State<Arc<S>>,
  Path(task_id): Path<Uuid>,
  Json(body): Json<ScoreBatchBody>,
) -> Result<Json<ScoringResult>, ApiError>
where
  S: RewardStore,
{
  let result = engine::score(store.as_ref(), task_id, body.user_id, body.sessions)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(result))
}
