//! Completed focus sessions: micro-events, the optional self-report, and the
//! per-kind event tally used for scoring.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Micro-events ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
  Distraction,
  MethodSwitch,
  UrgeOvercome,
  ApproachChange,
  Break,
  LocationSwitch,
}

/// A timestamped in-session occurrence. Only the kind matters for scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicroEvent {
  pub kind:        EventKind,
  pub timestamp:   DateTime<Utc>,
  pub description: Option<String>,
}

/// Occurrence counts per [`EventKind`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTally {
  pub distraction:     u32,
  pub method_switch:   u32,
  pub urge_overcome:   u32,
  pub approach_change: u32,
  pub breaks:          u32,
  pub location_switch: u32,
}

impl EventTally {
  pub fn count(&self, kind: EventKind) -> u32 {
    match kind {
      EventKind::Distraction => self.distraction,
      EventKind::MethodSwitch => self.method_switch,
      EventKind::UrgeOvercome => self.urge_overcome,
      EventKind::ApproachChange => self.approach_change,
      EventKind::Break => self.breaks,
      EventKind::LocationSwitch => self.location_switch,
    }
  }

  fn slot(&mut self, kind: EventKind) -> &mut u32 {
    match kind {
      EventKind::Distraction => &mut self.distraction,
      EventKind::MethodSwitch => &mut self.method_switch,
      EventKind::UrgeOvercome => &mut self.urge_overcome,
      EventKind::ApproachChange => &mut self.approach_change,
      EventKind::Break => &mut self.breaks,
      EventKind::LocationSwitch => &mut self.location_switch,
    }
  }
}

impl<'a> FromIterator<&'a MicroEvent> for EventTally {
  fn from_iter<I: IntoIterator<Item = &'a MicroEvent>>(iter: I) -> Self {
    let mut tally = Self::default();
    for event in iter {
      *tally.slot(event.kind) += 1;
    }
    tally
  }
}

// ─── Self-report ─────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum UrgeLevel {
  #[default]
  None,
  Medium,
  High,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum StartTiming {
  Early,
  #[default]
  OnTime,
  Delayed,
}

/// End-of-session answers. Any field left out takes its neutral value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelfReport {
  /// How strong the urge to quit was.
  pub urge_level:        UrgeLevel,
  /// Switching method got the user unstuck.
  pub switch_unblocked:  bool,
  /// Days since the user last worked on this task.
  pub return_gap_days:   u32,
  pub planned_day_match: bool,
  pub start_timing:      StartTiming,
  /// The session was started from a reminder rather than unprompted.
  pub prompted:          bool,
}

// ─── Session summary ─────────────────────────────────────────────────────────

/// The telemetry of one completed session. Immutable once the session is
/// complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
  pub session_id:       Uuid,
  pub duration_minutes: f64,
  #[serde(default)]
  pub events:           Vec<MicroEvent>,
  pub self_report:      Option<SelfReport>,
}

impl SessionSummary {
  /// A session with no events and no self-report.
  pub fn new(session_id: Uuid, duration_minutes: f64) -> Self {
    Self {
      session_id,
      duration_minutes,
      events: Vec::new(),
      self_report: None,
    }
  }

  /// Duration with negative (and non-finite) values clamped to zero.
  pub fn minutes(&self) -> f64 {
    if self.duration_minutes.is_finite() {
      self.duration_minutes.max(0.0)
    } else {
      0.0
    }
  }

  pub fn tally(&self) -> EventTally { self.events.iter().collect() }

  /// The self-report, or the all-neutral report when none was given.
  pub fn report(&self) -> SelfReport {
    self.self_report.clone().unwrap_or_default()
  }
}

/// A session as held by a store, with its ownership attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
  pub task_id:      Uuid,
  pub user_id:      Uuid,
  /// Server-assigned when the session was recorded.
  pub completed_at: DateTime<Utc>,
  pub summary:      SessionSummary,
}

/// What happened when a completed session was handed to the store.
#[derive(Debug, Clone)]
pub enum RecordOutcome {
  Recorded(StoredSession),
  /// A session with this id was already held; nothing was written.
  AlreadyRecorded,
}
