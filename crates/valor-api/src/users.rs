//! Handlers for `/users` endpoints.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
};
use serde::Serialize;
use uuid::Uuid;
use valor_core::{
  Trait,
  ledger::{MintEvent, TraitTotals},
  store::RewardStore,
};

use crate::error::ApiError;

#[derive(Debug, Serialize)]
pub struct WalletView {
  pub user_id: Uuid,
  pub balance: u64,
  pub mints:   Vec<MintEvent>,
}

/// `GET /users/:id/wallet`: balance plus the mint history behind it.
pub async fn wallet<S>(
  State(store): State<Arc<S>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<WalletView>, ApiError>
where
  S: RewardStore,
{
  let balance = store.wallet_balance(user_id).await.map_err(ApiError::store)?;
  let mints = store.mint_events(user_id).await.map_err(ApiError::store)?;
  Ok(Json(WalletView { user_id, balance, mints }))
}

/// `GET /users/:id/traits`: lifetime XP for all nine traits, zeros included.
pub async fn traits<S>(
  State(store): State<Arc<S>>,
  Path(user_id): Path<Uuid>,
) -> Result<Json<TraitTotals>, ApiError>
where
  S: RewardStore,
{
  let earned = store.trait_totals(user_id).await.map_err(ApiError::store)?;
  let totals = Trait::all()
    .map(|t| (t, earned.get(&t).copied().unwrap_or(0)))
    .collect();
  Ok(Json(totals))
}
