//! Trait XP formulas and XP-to-token conversion.
//!
//! Everything here is pure. Persistence and idempotency live in
//! [`crate::engine`].
//!
//! | Trait | Scaled by multiplier | Signal |
//! |-------|----------------------|--------|
//! | Discipline | yes | focus time, urges overcome, distractions |
//! | Adaptability | base term only | approach changes, unblocking switch |
//! | Perseverance | yes | focus time, long-run bonus |
//! | Endurance | no | minutes sat |
//! | Determination | yes, when urged | self-reported urge to quit |
//! | Resilience | no | days since last return |
//! | Initiative | no | start timing |
//! | Proactiveness | no | prompted or not |
//! | Courage | yes | discomfort, stakes, friction |

use serde::{Deserialize, Serialize};

use crate::{
  classification::{DiscomfortLevel, FrictionLevel, Stakes, TaskClassification},
  session::{EventKind, SelfReport, SessionSummary, StartTiming, UrgeLevel},
  taxonomy::Trait,
};

/// XP that buys one token.
pub const XP_PER_TOKEN: u32 = 10;

/// Minutes of focus that earn one point of base XP.
const MINUTES_PER_BASE_XP: f64 = 5.0;

/// Sessions at least this long earn the Perseverance long-run bonus.
const LONG_RUN_MINUTES: f64 = 25.0;

const ENDURANCE_CAP: u32 = 20;

const COURAGE_BASE: u32 = 12;

/// The XP a single trait earned from a single session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitAward {
  pub r#trait:        Trait,
  /// XP before the multiplier and bonuses. Traits without a base term report
  /// their final value here.
  pub base_xp:        u32,
  pub final_xp:       u32,
  /// Free text for the narrative generator; empty for most traits.
  pub narrative_seed: String,
}

/// Signals extracted once per session and shared by every formula.
struct Signals {
  minutes:      f64,
  base_xp:      u32,
  urges:        u32,
  approaches:   u32,
  distractions: u32,
  report:       SelfReport,
}

impl Signals {
  fn of(session: &SessionSummary) -> Self {
    let minutes = session.minutes();
    let tally = session.tally();
    Self {
      minutes,
      base_xp: (minutes / MINUTES_PER_BASE_XP).floor() as u32,
      urges: tally.count(EventKind::UrgeOvercome),
      approaches: tally.count(EventKind::ApproachChange),
      distractions: tally.count(EventKind::Distraction),
      report: session.report(),
    }
  }
}

/// `floor(minutes / 5)`, with negative durations counting as zero.
pub fn base_xp(session: &SessionSummary) -> u32 { Signals::of(session).base_xp }

/// Score one session against every trait. Traits that earned nothing are
/// left out; the rest come back in canonical trait order.
pub fn score_traits(
  session: &SessionSummary,
  classification: &TaskClassification,
  multiplier: f64,
) -> Vec<TraitAward> {
  let signals = Signals::of(session);
  Trait::all()
    .map(|t| award(t, &signals, classification, multiplier))
    .filter(|a| a.final_xp > 0)
    .collect()
}

/// Whole tokens earned by `total_xp`; the remainder is not carried over.
pub fn tokens_for(total_xp: u64) -> u64 { total_xp / u64::from(XP_PER_TOKEN) }

fn award(
  t: Trait,
  s: &Signals,
  c: &TaskClassification,
  m: f64,
) -> TraitAward {
  let (base_xp, final_xp, narrative_seed) = match t {
    Trait::Discipline => {
      let penalty = s.base_xp.min(s.distractions);
      let raw = f64::from(s.base_xp) * m + f64::from(s.urges.saturating_mul(3))
        - f64::from(penalty);
      (s.base_xp, xp(raw), discipline_seed(s))
    }
    Trait::Adaptability => {
      let base = xp(f64::from(s.base_xp) * 0.6);
      let unblocked = if s.report.switch_unblocked { 6 } else { 0 };
      let scaled = xp(f64::from(base) * m + f64::from(s.approaches.saturating_mul(4)));
      (base, scaled.saturating_add(unblocked), adaptability_seed(s))
    }
    Trait::Perseverance => {
      let base = xp(f64::from(s.base_xp) * 0.8);
      let bonus = if s.minutes >= LONG_RUN_MINUTES { 5.0 } else { 0.0 };
      (base, xp(f64::from(base) * m + bonus), perseverance_seed(s))
    }
    Trait::Endurance => {
      let earned =
        ((s.minutes / 10.0).floor() as u32).saturating_mul(5).min(ENDURANCE_CAP);
      (earned, earned, String::new())
    }
    Trait::Determination => {
      let base = match s.report.urge_level {
        UrgeLevel::High => 16,
        UrgeLevel::Medium => 8,
        UrgeLevel::None => 0,
      };
      let scaled = if base > 0 { xp(f64::from(base) * m) } else { 0 };
      (base, scaled, String::new())
    }
    Trait::Resilience => {
      let earned = match s.report.return_gap_days {
        7.. => 25,
        3..=6 => 20,
        1..=2 => 15,
        0 => 0,
      };
      (earned, earned, String::new())
    }
    Trait::Initiative => {
      let earned = match s.report.start_timing {
        StartTiming::Early => 20,
        StartTiming::OnTime => 12,
        StartTiming::Delayed => 6,
      };
      (earned, earned, String::new())
    }
    Trait::Proactiveness => {
      let earned = if s.report.prompted { 2 } else { 6 };
      (earned, earned, String::new())
    }
    Trait::Courage => {
      let discomfort = match c.discomfort_level {
        DiscomfortLevel::High => 12,
        DiscomfortLevel::Moderate => 6,
        DiscomfortLevel::Mild | DiscomfortLevel::None => 0,
      };
      let stakes = match c.stakes {
        Stakes::High => 12,
        Stakes::Medium => 6,
        Stakes::Low => 3,
      };
      let friction = match c.friction_level {
        FrictionLevel::High => 6,
        FrictionLevel::Medium | FrictionLevel::Low => 0,
      };
      let raw = f64::from(COURAGE_BASE + discomfort + stakes + friction) * m;
      (COURAGE_BASE, xp(raw), String::new())
    }
  };

  TraitAward { r#trait: t, base_xp, final_xp, narrative_seed }
}

/// Round to the nearest whole XP, never below zero.
fn xp(raw: f64) -> u32 {
  let rounded = raw.round();
  if rounded.is_finite() && rounded > 0.0 {
    rounded as u32
  } else {
    0
  }
}

// ─── Narrative seeds ─────────────────────────────────────────────────────────

fn plural(n: u32, word: &str) -> String {
  if n == 1 { format!("1 {word}") } else { format!("{n} {word}s") }
}

fn discipline_seed(s: &Signals) -> String {
  let mut seed = format!("Held focus for {:.0} minutes", s.minutes);
  if s.urges > 0 {
    seed.push_str(&format!(", overcame {}", plural(s.urges, "urge")));
  }
  if s.distractions > 0 {
    seed.push_str(&format!(
      ", logged {}",
      plural(s.distractions, "distraction")
    ));
  }
  seed
}

fn adaptability_seed(s: &Signals) -> String {
  let mut seed = match s.approaches {
    0 => "Kept to one approach".to_owned(),
    n => format!("Changed approach {}", plural(n, "time")),
  };
  if s.report.switch_unblocked {
    seed.push_str(", and a switch got things moving again");
  }
  seed
}

fn perseverance_seed(s: &Signals) -> String {
  if s.minutes >= LONG_RUN_MINUTES {
    format!("Stayed with it for a full {:.0}-minute run", s.minutes)
  } else {
    format!("Stayed with it for {:.0} minutes", s.minutes)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;
  use uuid::Uuid;

  use super::*;
  use crate::{
    classification::TaskType,
    session::MicroEvent,
  };

  fn session(minutes: f64) -> SessionSummary {
    SessionSummary::new(Uuid::new_v4(), minutes)
  }

  fn event(kind: EventKind) -> MicroEvent {
    MicroEvent { kind, timestamp: Utc::now(), description: None }
  }

  fn xp_of(awards: &[TraitAward], t: Trait) -> Option<u32> {
    awards.iter().find(|a| a.r#trait == t).map(|a| a.final_xp)
  }

  fn total(awards: &[TraitAward]) -> u64 {
    awards.iter().map(|a| u64::from(a.final_xp)).sum()
  }

  #[test]
  fn twenty_five_minutes_default_classification() {
    let c = TaskClassification::default();
    let m = c.multiplier().total;
    assert_eq!(m, 1.0);

    let s = session(25.0);
    assert_eq!(base_xp(&s), 5);

    let awards = score_traits(&s, &c, m);
    assert_eq!(xp_of(&awards, Trait::Discipline), Some(5));
    assert_eq!(xp_of(&awards, Trait::Adaptability), Some(3));
    assert_eq!(xp_of(&awards, Trait::Perseverance), Some(9));
    assert_eq!(xp_of(&awards, Trait::Endurance), Some(10));
    assert_eq!(xp_of(&awards, Trait::Initiative), Some(12));
    assert_eq!(xp_of(&awards, Trait::Proactiveness), Some(6));
    assert_eq!(xp_of(&awards, Trait::Courage), Some(15));
    assert_eq!(xp_of(&awards, Trait::Determination), None);
    assert_eq!(xp_of(&awards, Trait::Resilience), None);

    assert_eq!(total(&awards), 60);
    assert_eq!(tokens_for(total(&awards)), 6);
  }

  #[test]
  fn negative_duration_keeps_only_behaviour_and_courage() {
    let c = TaskClassification::default();
    let s = session(-10.0);
    assert_eq!(base_xp(&s), 0);

    let awards = score_traits(&s, &c, c.multiplier().total);
    let traits: Vec<Trait> = awards.iter().map(|a| a.r#trait).collect();
    assert_eq!(traits, vec![
      Trait::Initiative,
      Trait::Courage,
      Trait::Proactiveness
    ]);
    assert_eq!(total(&awards), 33);
    assert_eq!(tokens_for(33), 3);
  }

  #[test]
  fn zero_awards_are_pruned_and_rest_non_negative() {
    for minutes in [0.0, 1.0, 4.9, 5.0, 9.99, 24.0, 25.0, 61.0, 240.0] {
      let awards = score_traits(&session(minutes), &TaskClassification::default(), 1.0);
      assert!(awards.iter().all(|a| a.final_xp > 0));
      assert!(awards.iter().any(|a| a.r#trait == Trait::Initiative));
      assert!(awards.iter().any(|a| a.r#trait == Trait::Proactiveness));
    }
  }

  #[test]
  fn distractions_cannot_exceed_base() {
    let mut s = session(10.0);
    s.events = (0..5).map(|_| event(EventKind::Distraction)).collect();
    let awards = score_traits(&s, &TaskClassification::default(), 1.0);
    // base 2, penalty capped at 2
    assert_eq!(xp_of(&awards, Trait::Discipline), None);
  }

  #[test]
  fn urges_and_approach_changes_add_flat_bonuses() {
    let mut s = session(25.0);
    s.events = vec![
      event(EventKind::UrgeOvercome),
      event(EventKind::UrgeOvercome),
      event(EventKind::ApproachChange),
      event(EventKind::Distraction),
    ];
    s.self_report = Some(SelfReport {
      switch_unblocked: true,
      ..Default::default()
    });

    let awards = score_traits(&s, &TaskClassification::default(), 1.0);
    // 5 + 2*3 - 1
    assert_eq!(xp_of(&awards, Trait::Discipline), Some(10));
    // 3 + 4, then +6 unblocked
    assert_eq!(xp_of(&awards, Trait::Adaptability), Some(13));
  }

  #[test]
  fn multiplier_scales_effort_traits_only() {
    let c = TaskClassification {
      task_type:        TaskType::Opportunity,
      friction_level:   FrictionLevel::High,
      stakes:           Stakes::High,
      discomfort_level: DiscomfortLevel::High,
    };
    let m = c.multiplier().total;
    let mut s = session(40.0);
    s.self_report = Some(SelfReport {
      urge_level: UrgeLevel::High,
      return_gap_days: 3,
      start_timing: StartTiming::Early,
      prompted: true,
      ..Default::default()
    });

    let awards = score_traits(&s, &c, m);
    // base 8 * 2.34 = 18.72
    assert_eq!(xp_of(&awards, Trait::Discipline), Some(19));
    // round(8*0.8)=6, 6*2.34+5 = 19.04
    assert_eq!(xp_of(&awards, Trait::Perseverance), Some(19));
    // 16 * 2.34 = 37.44
    assert_eq!(xp_of(&awards, Trait::Determination), Some(37));
    // (12+12+12+6) * 2.34 = 98.28
    assert_eq!(xp_of(&awards, Trait::Courage), Some(98));

    assert_eq!(xp_of(&awards, Trait::Endurance), Some(20));
    assert_eq!(xp_of(&awards, Trait::Resilience), Some(20));
    assert_eq!(xp_of(&awards, Trait::Initiative), Some(20));
    assert_eq!(xp_of(&awards, Trait::Proactiveness), Some(2));
  }

  #[test]
  fn resilience_tiers() {
    let tier = |days: u32| {
      let mut s = session(0.0);
      s.self_report = Some(SelfReport { return_gap_days: days, ..Default::default() });
      xp_of(&score_traits(&s, &TaskClassification::default(), 1.0), Trait::Resilience)
    };
    assert_eq!(tier(0), None);
    assert_eq!(tier(1), Some(15));
    assert_eq!(tier(2), Some(15));
    assert_eq!(tier(3), Some(20));
    assert_eq!(tier(6), Some(20));
    assert_eq!(tier(7), Some(25));
    assert_eq!(tier(30), Some(25));
  }

  #[test]
  fn medium_urge_determination_is_scaled() {
    let c = TaskClassification {
      friction_level: FrictionLevel::High,
      stakes: Stakes::Medium,
      ..Default::default()
    };
    let m = c.multiplier().total;
    assert_eq!(m, 1.65);
    let mut s = session(10.0);
    s.self_report = Some(SelfReport { urge_level: UrgeLevel::Medium, ..Default::default() });

    // 8 * 1.65 = 13.2
    let awards = score_traits(&s, &c, m);
    assert_eq!(xp_of(&awards, Trait::Determination), Some(13));
    assert_eq!(
      xp_of(&score_traits(&s, &TaskClassification::default(), 1.0), Trait::Determination),
      Some(8)
    );
  }

  #[test]
  fn initiative_by_start_timing() {
    let initiative = |start_timing: StartTiming| {
      let mut s = session(0.0);
      s.self_report = Some(SelfReport { start_timing, ..Default::default() });
      xp_of(&score_traits(&s, &TaskClassification::default(), 1.0), Trait::Initiative)
    };
    assert_eq!(initiative(StartTiming::Early), Some(20));
    assert_eq!(initiative(StartTiming::OnTime), Some(12));
    assert_eq!(initiative(StartTiming::Delayed), Some(6));
  }

  #[test]
  fn enormous_sessions_saturate_instead_of_overflowing() {
    let c = TaskClassification {
      friction_level:   FrictionLevel::High,
      stakes:           Stakes::High,
      discomfort_level: DiscomfortLevel::High,
      ..Default::default()
    };
    let mut s = session(1.0e12);
    s.events = vec![event(EventKind::ApproachChange)];
    s.self_report = Some(SelfReport { switch_unblocked: true, ..Default::default() });

    let awards = score_traits(&s, &c, c.multiplier().total);
    assert_eq!(base_xp(&s), u32::MAX);
    assert_eq!(xp_of(&awards, Trait::Adaptability), Some(u32::MAX));
    assert_eq!(xp_of(&awards, Trait::Discipline), Some(u32::MAX));
    assert_eq!(xp_of(&awards, Trait::Endurance), Some(ENDURANCE_CAP));
    assert!(total(&awards) > u64::from(u32::MAX));
  }

  #[test]
  fn only_effort_traits_carry_narrative_seeds() {
    let awards = score_traits(&session(30.0), &TaskClassification::default(), 1.0);
    for a in &awards {
      let seeded = matches!(
        a.r#trait,
        Trait::Discipline | Trait::Adaptability | Trait::Perseverance
      );
      assert_eq!(!a.narrative_seed.is_empty(), seeded, "{:?}", a.r#trait);
    }
  }

  #[test]
  fn token_conversion_is_a_step_function() {
    assert_eq!(tokens_for(0), 0);
    assert_eq!(tokens_for(9), 0);
    assert_eq!(tokens_for(10), 1);
    assert_eq!(tokens_for(19), 1);
    assert_eq!(tokens_for(20), 2);

    let mut last = 0;
    for xp in 0..500 {
      let t = tokens_for(xp);
      assert!(t >= last);
      last = t;
    }
  }
}
