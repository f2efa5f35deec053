/// The Wall: completed bricks grouped by day over a trailing window
///
/// One entry per calendar day, oldest first and ending at `today`. Each day
/// reports how many bricks were completed and up to
/// [`MAX_BRICKS_PER_DAY`] of them for display.

use crate::models::brick::Brick;
use chrono::{Duration, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

/// Window used when the caller does not ask for one
pub const DEFAULT_WALL_DAYS: u32 = 90;

/// Largest window accepted
pub const MAX_WALL_DAYS: u32 = 365;

/// Bricks drawn per day on the wall
pub const MAX_BRICKS_PER_DAY: usize = 3;

/// One column of the wall
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WallDay {
    pub date: NaiveDate,

    /// All completions on this day, including those not drawn
    pub total_completed: usize,

    /// At most [`MAX_BRICKS_PER_DAY`] completed bricks
    pub bricks: Vec<Brick>,
}

/// Builds the wall for the `days` days ending at `today`
///
/// `days` is clamped to `1..=MAX_WALL_DAYS`. Incomplete bricks are ignored.
pub fn build_wall(bricks: &[Brick], today: NaiveDate, days: u32) -> Vec<WallDay> {
    let days = days.clamp(1, MAX_WALL_DAYS) as i64;
    let start = today - Duration::days(days - 1);

    let mut by_day: HashMap<NaiveDate, Vec<&Brick>> = HashMap::new();
    for brick in bricks.iter().filter(|b| b.is_completed) {
        if brick.date >= start && brick.date <= today {
            by_day.entry(brick.date).or_default().push(brick);
        }
    }

    (0..days)
        .map(|offset| {
            let date = start + Duration::days(offset);
            let completed = by_day.remove(&date).unwrap_or_default();

            WallDay {
                date,
                total_completed: completed.len(),
                bricks: completed
                    .into_iter()
                    .take(MAX_BRICKS_PER_DAY)
                    .cloned()
                    .collect(),
            }
        })
        .collect()
}
