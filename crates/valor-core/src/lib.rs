//! Core types, scoring formulas, and orchestration for the Valor trait XP
//! engine.
//!
//! This crate has no HTTP or database dependencies. Persistence is reached
//! only through [`store::RewardStore`].

// Backends implement `RewardStore` with native `async fn`.
#![allow(async_fn_in_trait)]

pub mod classification;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod scoring;
pub mod session;
pub mod store;
pub mod taxonomy;

pub use error::{Error, Result};
pub use taxonomy::Trait;
