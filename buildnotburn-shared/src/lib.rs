//! # BuildNotBurn Shared Library
//!
//! Domain types, rules and persistence shared by the BuildNotBurn API.
//!
//! ## Module Organization
//!
//! - `models`: database models (users, bricks, checkouts)
//! - `capacity`: daily brick limits from plan and energy audit
//! - `build_list`: add / complete / burn / reorder / notes rules
//! - `wall`: completed bricks grouped by day
//! - `analytics`: streaks, weekly build/burn, weekday histogram
//! - `shell`: which screen a user should see
//! - `feed`: live per-user change feed
//! - `billing`: payment webhook verification and parsing
//! - `auth`: passwords, JWTs, bearer authentication
//! - `db`: connection pool and migrations

pub mod analytics;
pub mod auth;
pub mod billing;
pub mod build_list;
pub mod capacity;
pub mod db;
pub mod feed;
pub mod models;
pub mod shell;
pub mod wall;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
