//! The fixed nine-trait taxonomy.
//!
//! Traits are a closed set. Every scoring formula matches on [`Trait`]
//! exhaustively, so adding a variant without a formula fails to compile.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr, IntoEnumIterator as _};

use crate::{Error, Result};

/// A character-development dimension that accrues XP.
///
/// Variant order is the canonical display and scoring order.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  PartialOrd,
  Ord,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumIter,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Trait {
  Initiative,
  Courage,
  Discipline,
  Adaptability,
  Endurance,
  Proactiveness,
  Determination,
  Resilience,
  Perseverance,
}

impl Trait {
  /// All nine traits in canonical order.
  pub fn all() -> impl Iterator<Item = Trait> { Self::iter() }

  /// The discriminant string stored in the `trait` ledger column.
  pub fn as_str(self) -> &'static str { self.into() }

  /// Parse a stored discriminant back into a trait.
  pub fn parse(s: &str) -> Result<Self> {
    s.parse().map_err(|_| Error::UnknownTrait(s.to_owned()))
  }

  /// Whether the task-difficulty multiplier scales this trait.
  ///
  /// Behaviour-fact traits (when you started, whether you came back, how long
  /// you sat) are independent of how hard the task was.
  pub fn is_effort_scaled(self) -> bool {
    match self {
      Self::Discipline
      | Self::Adaptability
      | Self::Perseverance
      | Self::Determination
      | Self::Courage => true,
      Self::Initiative
      | Self::Endurance
      | Self::Proactiveness
      | Self::Resilience => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn taxonomy_has_nine_traits_in_order() {
    let all: Vec<Trait> = Trait::all().collect();
    assert_eq!(all.len(), 9);
    assert_eq!(all.first(), Some(&Trait::Initiative));
    assert_eq!(all.last(), Some(&Trait::Perseverance));
  }

  #[test]
  fn discriminant_matches_serde_name() {
    for t in Trait::all() {
      let json = serde_json::to_value(t).unwrap();
      assert_eq!(json.as_str(), Some(t.as_str()));
      assert_eq!(Trait::parse(t.as_str()).unwrap(), t);
    }
  }

  #[test]
  fn unknown_discriminant_errors() {
    let err = Trait::parse("charisma").unwrap_err();
    assert!(matches!(err, Error::UnknownTrait(ref s) if s == "charisma"));
  }

  #[test]
  fn five_traits_are_effort_scaled() {
    assert_eq!(Trait::all().filter(|t| t.is_effort_scaled()).count(), 5);
  }
}
