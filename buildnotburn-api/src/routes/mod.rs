/// API route handlers, one module per resource
///
/// - `health`: liveness and database check
/// - `auth`: register, login, token refresh
/// - `profile`: plan, energy audit, bonus bricks, shell screen
/// - `bricks`: today's build list, burn pile, history, live stream
/// - `wall`: completed-brick calendar
/// - `analytics`: streaks and weekly stats (paid plans)
/// - `checkout`: paid checkout and newsletter signup
/// - `webhooks`: payment provider events

pub mod analytics;
pub mod auth;
pub mod bricks;
pub mod checkout;
pub mod health;
pub mod profile;
pub mod wall;
pub mod webhooks;

use chrono::{NaiveDate, Utc};

/// The current day; every day boundary in the API is UTC
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
