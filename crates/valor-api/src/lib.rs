//! JSON REST API for Valor.
//!
//! Exposes an axum [`Router`] backed by any [`valor_core::store::RewardStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", valor_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod sessions;
pub mod sweep;
pub mod tasks;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use valor_core::store::RewardStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: RewardStore + 'static,
{
  Router::new()
    // Tasks
    .route(
      "/tasks/{id}/classification",
      get(tasks::get_classification::<S>).put(tasks::put_classification::<S>),
    )
    .route("/tasks/{id}/sessions", post(tasks::record_session::<S>))
    .route("/tasks/{id}/score", post(tasks::score::<S>))
    .route("/tasks/{id}/score-batch", post(tasks::score_batch::<S>))
    // Sessions
    .route("/sessions/{id}/score", post(sessions::score::<S>))
    .route("/sessions/{id}/ledger", get(sessions::ledger::<S>))
    // Users
    .route("/users/{id}/wallet", get(users::wallet::<S>))
    .route("/users/{id}/traits", get(users::traits::<S>))
    // Sweep
    .route("/sweep", post(sweep::handler::<S>))
    .with_state(store)
}
