/// Daily brick capacity derived from plan and energy audit
///
/// Every user has a maximum number of bricks that may be *active today*
/// (incomplete and dated today). The limit depends on the subscription plan:
///
/// **Trial Plan:** fixed at 3 bricks
///
/// **Builder Plan:** derived from today's energy audit
/// - Low energy: 1 brick
/// - Medium energy: 2 bricks
/// - High energy: 3 bricks
///
/// **Architect Plan:** unlimited
///
/// # Energy Score
///
/// The three audit answers are each normalized onto a 0-10 scale where 10
/// means "plenty of energy", then averaged:
///
/// - sleep: `hours / 8 * 10` (8 hours or more scores 10)
/// - meetings: `10 - 2 * count` (5 or more meetings scores 0)
/// - dread: `(10 - dread) * 10 / 9` on the 1-10 dread scale
///
/// An average of 7.0 or more is high energy, 4.0 or more is medium,
/// anything lower is low.
///
/// # Example
///
/// ```
/// use buildnotburn_shared::capacity::{capacity_for, AuditAnswers, Capacity};
/// use buildnotburn_shared::models::user::Plan;
///
/// let answers = AuditAnswers { sleep_hours: 8, meetings: 2, dread: 3 };
/// assert_eq!(capacity_for(Some(Plan::Builder), Some(&answers)), Capacity::Limited(3));
/// assert_eq!(capacity_for(Some(Plan::Trial), None), Capacity::Limited(3));
/// assert_eq!(capacity_for(Some(Plan::Architect), None), Capacity::Unlimited);
/// ```

use crate::models::user::Plan;
use serde::{Deserialize, Serialize};

/// Fixed brick limit for the trial plan
pub const TRIAL_BRICKS: u32 = 3;

/// Average energy score at or above which the day is high energy
pub const HIGH_ENERGY_THRESHOLD: f64 = 7.0;

/// Average energy score at or above which the day is medium energy
pub const MEDIUM_ENERGY_THRESHOLD: f64 = 4.0;

/// Answers to the energy audit quiz
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditAnswers {
    /// Hours slept last night
    pub sleep_hours: i32,

    /// Number of meetings scheduled today
    pub meetings: i32,

    /// Project dread level (1 = none, 10 = maximum)
    pub dread: i32,
}

impl AuditAnswers {
    /// Averaged energy score on a 0-10 scale
    ///
    /// Each input is clamped onto the 0-10 range before averaging, so
    /// out-of-range answers saturate instead of skewing the result.
    pub fn energy_score(&self) -> f64 {
        let sleep = normalize(self.sleep_hours as f64 / 8.0 * 10.0);
        let meetings = normalize(10.0 - 2.0 * self.meetings as f64);
        let dread = normalize((10.0 - self.dread as f64) * 10.0 / 9.0);

        (sleep + meetings + dread) / 3.0
    }

    /// Buckets the energy score into a level
    pub fn energy_level(&self) -> EnergyLevel {
        EnergyLevel::from_score(self.energy_score())
    }
}

fn normalize(score: f64) -> f64 {
    score.clamp(0.0, 10.0)
}

/// Energy bucket produced by the audit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyLevel {
    Low,
    Medium,
    High,
}

impl EnergyLevel {
    /// Buckets a 0-10 energy score
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_ENERGY_THRESHOLD {
            EnergyLevel::High
        } else if score >= MEDIUM_ENERGY_THRESHOLD {
            EnergyLevel::Medium
        } else {
            EnergyLevel::Low
        }
    }

    /// Number of bricks a builder may lay at this energy level
    pub fn bricks(&self) -> u32 {
        match self {
            EnergyLevel::Low => 1,
            EnergyLevel::Medium => 2,
            EnergyLevel::High => 3,
        }
    }
}

/// Maximum number of bricks that may be active today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capacity {
    /// At most this many active bricks
    Limited(u32),

    /// No limit (architect plan)
    Unlimited,
}

impl Capacity {
    /// Whether one more brick fits next to `active` active bricks
    pub fn allows(&self, active: usize) -> bool {
        match self {
            Capacity::Limited(limit) => active < *limit as usize,
            Capacity::Unlimited => true,
        }
    }

    /// Whether `active` bricks already fill the capacity
    pub fn is_full(&self, active: usize) -> bool {
        !self.allows(active)
    }

    /// The numeric limit, `None` when unlimited
    pub fn limit(&self) -> Option<u32> {
        match self {
            Capacity::Limited(limit) => Some(*limit),
            Capacity::Unlimited => None,
        }
    }

    /// Raises a limited capacity by `extra` bricks
    pub fn with_bonus(self, extra: u32) -> Self {
        match self {
            Capacity::Limited(limit) => Capacity::Limited(limit.saturating_add(extra)),
            Capacity::Unlimited => Capacity::Unlimited,
        }
    }
}

/// Base capacity for a plan and (for builders) today's audit
///
/// A user without a plan, or a builder who has not taken today's audit,
/// has no capacity at all.
pub fn capacity_for(plan: Option<Plan>, audit: Option<&AuditAnswers>) -> Capacity {
    match plan {
        None => Capacity::Limited(0),
        Some(Plan::Trial) => Capacity::Limited(TRIAL_BRICKS),
        Some(Plan::Builder) => match audit {
            Some(answers) => Capacity::Limited(answers.energy_level().bricks()),
            None => Capacity::Limited(0),
        },
        Some(Plan::Architect) => Capacity::Unlimited,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_capacity_is_always_three() {
        let exhausted = AuditAnswers { sleep_hours: 2, meetings: 9, dread: 10 };

        assert_eq!(capacity_for(Some(Plan::Trial), None), Capacity::Limited(3));
        assert_eq!(capacity_for(Some(Plan::Trial), Some(&exhausted)), Capacity::Limited(3));
    }

    #[test]
    fn test_rested_builder_gets_high_capacity() {
        let answers = AuditAnswers { sleep_hours: 8, meetings: 2, dread: 3 };

        assert!(answers.energy_score() >= HIGH_ENERGY_THRESHOLD);
        assert_eq!(answers.energy_level(), EnergyLevel::High);
        assert_eq!(capacity_for(Some(Plan::Builder), Some(&answers)), Capacity::Limited(3));
    }

    #[test]
    fn test_exhausted_builder_gets_low_capacity() {
        let answers = AuditAnswers { sleep_hours: 3, meetings: 6, dread: 10 };

        assert_eq!(answers.energy_level(), EnergyLevel::Low);
        assert_eq!(capacity_for(Some(Plan::Builder), Some(&answers)), Capacity::Limited(1));
    }

    #[test]
    fn test_medium_energy() {
        // sleep 7.5, meetings 4, dread ~5.6 => average ~5.7
        let answers = AuditAnswers { sleep_hours: 6, meetings: 3, dread: 5 };

        assert_eq!(answers.energy_level(), EnergyLevel::Medium);
        assert_eq!(answers.energy_level().bricks(), 2);
    }

    #[test]
    fn test_builder_without_audit_has_no_capacity() {
        assert_eq!(capacity_for(Some(Plan::Builder), None), Capacity::Limited(0));
        assert_eq!(capacity_for(None, None), Capacity::Limited(0));
    }

    #[test]
    fn test_architect_is_unlimited() {
        let capacity = capacity_for(Some(Plan::Architect), None);
        assert_eq!(capacity, Capacity::Unlimited);
        assert!(capacity.allows(10_000));
        assert_eq!(capacity.limit(), None);
    }

    #[test]
    fn test_out_of_range_answers_saturate() {
        let wild = AuditAnswers { sleep_hours: 40, meetings: -5, dread: -20 };
        assert_eq!(wild.energy_score(), 10.0);

        let worst = AuditAnswers { sleep_hours: -3, meetings: 50, dread: 99 };
        assert_eq!(worst.energy_score(), 0.0);
    }

    #[test]
    fn test_capacity_allows_and_bonus() {
        let capacity = Capacity::Limited(2);
        assert!(capacity.allows(1));
        assert!(!capacity.allows(2));
        assert!(capacity.is_full(2));

        let raised = capacity.with_bonus(1);
        assert_eq!(raised, Capacity::Limited(3));
        assert!(raised.allows(2));

        assert_eq!(Capacity::Unlimited.with_bonus(5), Capacity::Unlimited);
    }
}
