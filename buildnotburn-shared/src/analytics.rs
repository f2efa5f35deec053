/// Review analytics computed from a user's full brick history
///
/// - longest streak of consecutive days with at least one completion
/// - total completed bricks
/// - bricks built vs. left burning over the trailing week
/// - completions per weekday, Sunday first
///
/// # Example
///
/// ```
/// use buildnotburn_shared::analytics::longest_streak;
/// use chrono::NaiveDate;
///
/// let days = ["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-05"]
///     .iter()
///     .map(|d| d.parse::<NaiveDate>().unwrap())
///     .collect::<Vec<_>>();
///
/// assert_eq!(longest_streak(days), 3);
/// ```

use crate::models::brick::Brick;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::BTreeSet;

/// Days in the trailing build/burn window, today included
pub const WEEKLY_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analytics {
    pub longest_streak: u32,
    pub total_bricks: usize,
    pub weekly_build_burn: BuildBurn,
    pub daily_productivity: Vec<WeekdayCount>,

    /// Share of this week's bricks that were built, 0-100
    pub weekly_focus_percent: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuildBurn {
    pub built: usize,
    pub burned: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayCount {
    /// Short weekday name (`Sun`, `Mon`, ...)
    pub name: &'static str,
    pub built: usize,
}

const WEEKDAYS: [(Weekday, &str); 7] = [
    (Weekday::Sun, "Sun"),
    (Weekday::Mon, "Mon"),
    (Weekday::Tue, "Tue"),
    (Weekday::Wed, "Wed"),
    (Weekday::Thu, "Thu"),
    (Weekday::Fri, "Fri"),
    (Weekday::Sat, "Sat"),
];

/// Longest run of consecutive calendar days in `dates`
///
/// Duplicates are ignored; an empty input has a streak of 0.
pub fn longest_streak<I>(dates: I) -> u32
where
    I: IntoIterator<Item = NaiveDate>,
{
    let distinct: BTreeSet<NaiveDate> = dates.into_iter().collect();

    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;

    for date in distinct {
        current = match previous {
            Some(prev) if date - prev == Duration::days(1) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(date);
    }

    longest
}

/// Completions per weekday, all seven days present, Sunday first
pub fn weekday_histogram<'a, I>(completed: I) -> Vec<WeekdayCount>
where
    I: IntoIterator<Item = &'a Brick>,
{
    let mut counts = [0usize; 7];
    for brick in completed {
        counts[brick.date.weekday().num_days_from_sunday() as usize] += 1;
    }

    WEEKDAYS
        .iter()
        .map(|&(day, name)| WeekdayCount {
            name,
            built: counts[day.num_days_from_sunday() as usize],
        })
        .collect()
}

/// Computes every analytics figure as of `today`
pub fn calculate(bricks: &[Brick], today: NaiveDate) -> Analytics {
    let week_start = today - Duration::days(WEEKLY_WINDOW_DAYS - 1);
    let in_week = |b: &&Brick| b.date >= week_start && b.date <= today;

    let completed: Vec<&Brick> = bricks.iter().filter(|b| b.is_completed).collect();

    let built = completed.iter().copied().filter(in_week).count();
    let burned = bricks
        .iter()
        .filter(|b| !b.is_completed)
        .filter(in_week)
        .count();

    let weekly_focus_percent = if built == 0 {
        0
    } else {
        (built * 100 / (built + burned)) as u32
    };

    Analytics {
        longest_streak: longest_streak(completed.iter().map(|b| b.date)),
        total_bricks: completed.len(),
        weekly_build_burn: BuildBurn { built, burned },
        daily_productivity: weekday_histogram(completed.iter().copied()),
        weekly_focus_percent,
    }
}
