//! Static per-task classification and the difficulty multiplier derived from
//! it.
//!
//! Classification is captured by a separate flow and is read-only here. Any
//! field that was never captured resolves to its lowest-impact value, so
//! lookup never fails.

use serde::{Deserialize, Serialize};

// ─── Classification axes ─────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
  #[default]
  Scheduled,
  Opportunity,
}

/// How hard it is to get going on the task.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FrictionLevel {
  #[default]
  Low,
  Medium,
  High,
}

/// What rides on the outcome.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Stakes {
  #[default]
  Low,
  Medium,
  High,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DiscomfortLevel {
  #[default]
  None,
  Mild,
  Moderate,
  High,
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A classification as captured, with any field possibly missing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRecord {
  pub task_type:        Option<TaskType>,
  pub friction_level:   Option<FrictionLevel>,
  pub stakes:           Option<Stakes>,
  pub discomfort_level: Option<DiscomfortLevel>,
}

impl ClassificationRecord {
  /// Fill every missing field with its default.
  pub fn resolve(&self) -> TaskClassification {
    TaskClassification {
      task_type:        self.task_type.unwrap_or_default(),
      friction_level:   self.friction_level.unwrap_or_default(),
      stakes:           self.stakes.unwrap_or_default(),
      discomfort_level: self.discomfort_level.unwrap_or_default(),
    }
  }
}

/// A fully resolved classification. `Default` is the classification of a
/// task nobody classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskClassification {
  pub task_type:        TaskType,
  pub friction_level:   FrictionLevel,
  pub stakes:           Stakes,
  pub discomfort_level: DiscomfortLevel,
}

impl From<Option<ClassificationRecord>> for TaskClassification {
  fn from(record: Option<ClassificationRecord>) -> Self {
    record.map(|r| r.resolve()).unwrap_or_default()
  }
}

// ─── Multiplier ──────────────────────────────────────────────────────────────

/// The factors behind a multiplier. Stored on every ledger row for audit; it
/// plays no further part in scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplierBreakdown {
  pub friction:   f64,
  pub stakes:     f64,
  pub discomfort: f64,
  /// Product of the three factors, rounded to two decimals.
  pub total:      f64,
}

impl TaskClassification {
  /// The difficulty multiplier for this classification, in `[1.0, 2.34]`.
  pub fn multiplier(&self) -> MultiplierBreakdown {
    let friction = match self.friction_level {
      FrictionLevel::High => 1.5,
      FrictionLevel::Medium => 1.2,
      FrictionLevel::Low => 1.0,
    };
    let stakes = match self.stakes {
      Stakes::High => 1.2,
      Stakes::Medium => 1.1,
      Stakes::Low => 1.0,
    };
    let discomfort = match self.discomfort_level {
      DiscomfortLevel::High => 1.3,
      DiscomfortLevel::Moderate => 1.2,
      DiscomfortLevel::Mild => 1.1,
      DiscomfortLevel::None => 1.0,
    };

    MultiplierBreakdown {
      friction,
      stakes,
      discomfort,
      total: round2(friction * stakes * discomfort),
    }
  }
}

fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_fields_resolve_to_lowest_impact() {
    let resolved = ClassificationRecord {
      stakes: Some(Stakes::High),
      ..Default::default()
    }
    .resolve();

    assert_eq!(resolved.task_type, TaskType::Scheduled);
    assert_eq!(resolved.friction_level, FrictionLevel::Low);
    assert_eq!(resolved.stakes, Stakes::High);
    assert_eq!(resolved.discomfort_level, DiscomfortLevel::None);
  }

  #[test]
  fn absent_record_is_default() {
    assert_eq!(TaskClassification::from(None), TaskClassification::default());
  }

  #[test]
  fn multiplier_bounds() {
    let low = TaskClassification::default().multiplier();
    assert_eq!(low.total, 1.0);

    let high = TaskClassification {
      task_type:        TaskType::Opportunity,
      friction_level:   FrictionLevel::High,
      stakes:           Stakes::High,
      discomfort_level: DiscomfortLevel::High,
    }
    .multiplier();
    assert_eq!(high.total, 2.34);
    assert_eq!(high.friction, 1.5);
  }

  #[test]
  fn multiplier_rounds_to_two_decimals() {
    let m = TaskClassification {
      friction_level: FrictionLevel::Medium,
      stakes: Stakes::Medium,
      discomfort_level: DiscomfortLevel::Mild,
      ..Default::default()
    }
    .multiplier();
    // 1.2 * 1.1 * 1.1 = 1.452
    assert_eq!(m.total, 1.45);
  }

  #[test]
  fn partial_record_deserialises() {
    let record: ClassificationRecord =
      serde_json::from_str(r#"{"friction_level":"high"}"#).unwrap();
    assert_eq!(record.friction_level, Some(FrictionLevel::High));
    assert_eq!(record.discomfort_level, None);
  }
}
