/// Screen selection for the app shell
///
/// Decides what a signed-in user sees: the paywall until they choose a
/// plan, the energy audit for builders who have not audited today, the
/// firebreak once today's capacity is full, and the workspace otherwise.

use crate::capacity::Capacity;
use crate::models::user::Plan;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// No plan yet
    Paywall,

    /// Builder who has not taken today's energy audit
    Audit,

    /// Active bricks fill today's capacity
    Firebreak,

    /// Normal build list
    Workspace,
}

/// Picks the screen for a plan, audit status, capacity, and active count
pub fn screen_for(
    plan: Option<Plan>,
    audited_today: bool,
    capacity: Capacity,
    active: usize,
) -> Screen {
    let Some(plan) = plan else {
        return Screen::Paywall;
    };

    if plan == Plan::Builder && !audited_today {
        return Screen::Audit;
    }

    if capacity.is_full(active) {
        return Screen::Firebreak;
    }

    Screen::Workspace
}
