/// Brick lifecycle operations over a user's list
///
/// These are the pure rules behind adding, completing, burning, reordering
/// and annotating bricks. They work on in-memory [`Brick`] values and leave
/// persistence to the caller, so the API handlers load the relevant bricks,
/// apply one operation here, and write back whatever changed.
///
/// Rejections (blank text, full capacity) are ordinary outcomes, not errors.
///
/// # Example
///
/// ```
/// use buildnotburn_shared::build_list::{BuildList, Rejection};
/// use buildnotburn_shared::capacity::Capacity;
/// use chrono::NaiveDate;
/// use uuid::Uuid;
///
/// let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let user_id = Uuid::new_v4();
/// let mut list = BuildList::new(today, Vec::new());
///
/// let brick = list.add(user_id, "  write the report ", Capacity::Limited(1)).unwrap();
/// assert_eq!(brick.text, "WRITE THE REPORT");
///
/// let full = list.add(user_id, "another", Capacity::Limited(1));
/// assert_eq!(full, Err(Rejection::AtCapacity { limit: 1 }));
/// ```

use crate::capacity::Capacity;
use crate::models::brick::Brick;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Why an add was refused
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
    #[error("Brick text cannot be blank")]
    BlankText,

    #[error("Today's wall is full ({limit} bricks). Finish or burn one first")]
    AtCapacity { limit: u32 },

    #[error("Choose a plan before laying bricks")]
    PlanRequired,

    #[error("Take today's energy audit before laying bricks")]
    AuditRequired,
}

/// Result of completing a brick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    Completed,
    AlreadyCompleted,
}

/// Result of burning a brick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnOutcome {
    Burned,

    /// Completed bricks stay on the wall
    AlreadyCompleted,

    /// Already on the burn pile (or not dated today)
    NotActiveToday,
}

/// Uppercases and trims brick text; `None` when nothing is left
pub fn normalize_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_uppercase())
    }
}

/// A user's bricks for one day, in display order
#[derive(Debug, Clone)]
pub struct BuildList {
    today: NaiveDate,
    bricks: Vec<Brick>,
}

impl BuildList {
    /// Wraps the bricks dated `today` (any order; sorted by position)
    pub fn new(today: NaiveDate, mut bricks: Vec<Brick>) -> Self {
        bricks.sort_by_key(|b| b.position);
        Self { today, bricks }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    pub fn bricks(&self) -> &[Brick] {
        &self.bricks
    }

    /// Bricks counting against today's capacity
    pub fn active(&self) -> impl Iterator<Item = &Brick> {
        let today = self.today;
        self.bricks.iter().filter(move |b| b.is_active_on(today))
    }

    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Appends a new active brick dated today
    ///
    /// The brick gets a fresh id and the position after the current last
    /// one. Nothing changes when the text is blank or capacity is full.
    pub fn add(&mut self, user_id: Uuid, text: &str, capacity: Capacity) -> Result<Brick, Rejection> {
        let text = normalize_text(text).ok_or(Rejection::BlankText)?;

        if capacity.is_full(self.active_count()) {
            return Err(Rejection::AtCapacity {
                limit: capacity.limit().unwrap_or_default(),
            });
        }

        let position = self.bricks.iter().map(|b| b.position + 1).max().unwrap_or(0);
        let now = Utc::now();
        let brick = Brick {
            id: Uuid::new_v4(),
            user_id,
            text,
            is_completed: false,
            date: self.today,
            position,
            notes: None,
            created_at: now,
            updated_at: now,
        };

        self.bricks.push(brick.clone());
        Ok(brick)
    }

    /// Moves `from` to the slot of `to`; both must be active today
    ///
    /// Every brick dated today is renumbered `0..n`, completed ones
    /// included, so no two bricks share a position. Completed bricks keep
    /// their place relative to the others. Returns the new `(id, position)`
    /// pairs, or `None` if either id is not active today.
    pub fn reorder(&mut self, from: Uuid, to: Uuid) -> Option<Vec<(Uuid, i32)>> {
        let today = self.today;
        let is_active = |id: Uuid| self.bricks.iter().any(|b| b.id == id && b.is_active_on(today));
        if !is_active(from) || !is_active(to) {
            return None;
        }

        let mut order: Vec<Uuid> = self.bricks.iter().map(|b| b.id).collect();
        let from_index = order.iter().position(|id| *id == from)?;
        let to_index = order.iter().position(|id| *id == to)?;

        let moved = order.remove(from_index);
        order.insert(to_index, moved);

        let positions: Vec<(Uuid, i32)> = order
            .into_iter()
            .enumerate()
            .map(|(index, id)| (id, index as i32))
            .collect();

        for (id, position) in &positions {
            if let Some(brick) = self.bricks.iter_mut().find(|b| b.id == *id) {
                brick.position = *position;
            }
        }
        self.bricks.sort_by_key(|b| b.position);

        Some(positions)
    }
}

/// Marks a brick complete and stamps the completion day
///
/// Completing a completed brick changes nothing. A brick pulled from the
/// burn pile is re-dated to `today` when it is finally done.
pub fn complete(brick: &mut Brick, today: NaiveDate) -> Completion {
    if brick.is_completed {
        return Completion::AlreadyCompleted;
    }

    brick.is_completed = true;
    brick.date = today;
    Completion::Completed
}

/// Defers an active brick to yesterday
///
/// The brick stays incomplete and keeps its text and notes; it simply no
/// longer counts as one of today's bricks.
pub fn burn(brick: &mut Brick, today: NaiveDate) -> BurnOutcome {
    if brick.is_completed {
        return BurnOutcome::AlreadyCompleted;
    }
    if brick.date != today {
        return BurnOutcome::NotActiveToday;
    }

    match today.pred_opt() {
        Some(yesterday) => {
            brick.date = yesterday;
            BurnOutcome::Burned
        }
        None => BurnOutcome::NotActiveToday,
    }
}

/// Sets or clears brick notes; whitespace-only notes clear them
pub fn set_notes(brick: &mut Brick, notes: Option<&str>) {
    brick.notes = notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);
}
