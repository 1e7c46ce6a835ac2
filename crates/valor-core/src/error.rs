//! Error types for `valor-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown trait discriminant: {0:?}")]
  UnknownTrait(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
