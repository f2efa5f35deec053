/// User model and database operations
///
/// A user profile carries identity, the subscription plan, and the inputs
/// that determine today's brick capacity (the latest energy audit and any
/// "lay one more brick" bonus granted at the firebreak).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email CITEXT NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     name VARCHAR(255),
///     plan VARCHAR(20),
///     audit_sleep_hours INTEGER,
///     audit_meetings INTEGER,
///     audit_dread INTEGER,
///     audit_date DATE,
///     bonus_bricks INTEGER NOT NULL DEFAULT 0,
///     bonus_date DATE,
///     stripe_customer_id VARCHAR(255),
///     lemonsqueezy_customer_id VARCHAR(255),
///     subscription_status VARCHAR(50),
///     renews_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use buildnotburn_shared::models::user::{User, CreateUser, Plan};
/// use buildnotburn_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "builder@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: None,
/// }).await?;
///
/// User::set_plan(&pool, user.id, Plan::Trial).await?;
/// # Ok(())
/// # }
/// ```

use crate::capacity::{capacity_for, AuditAnswers, Capacity};
use crate::shell::{screen_for, Screen};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// Free trial: fixed capacity of 3, no analytics
    Trial,

    /// Capacity from the daily energy audit, analytics included
    Builder,

    /// Unlimited capacity, analytics included
    Architect,
}

impl Plan {
    /// Database and wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Trial => "trial",
            Plan::Builder => "builder",
            Plan::Architect => "architect",
        }
    }

    /// Whether the review analytics are available on this plan
    pub fn has_analytics(&self) -> bool {
        !matches!(self, Plan::Trial)
    }

    /// Whether a user may pick this plan without paying
    pub fn is_free(&self) -> bool {
        matches!(self, Plan::Trial | Plan::Builder)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trial" => Ok(Plan::Trial),
            "builder" => Ok(Plan::Builder),
            "architect" => Ok(Plan::Architect),
            other => Err(format!("unknown plan: {}", other)),
        }
    }
}

/// User profile
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address (case-insensitive via CITEXT)
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Optional display name
    pub name: Option<String>,

    /// Plan name; `None` until the user chooses at the paywall
    pub plan: Option<String>,

    pub audit_sleep_hours: Option<i32>,
    pub audit_meetings: Option<i32>,
    pub audit_dread: Option<i32>,

    /// Day the stored audit answers were given
    pub audit_date: Option<NaiveDate>,

    /// Extra bricks granted for `bonus_date`
    pub bonus_bricks: i32,
    pub bonus_date: Option<NaiveDate>,

    pub stripe_customer_id: Option<String>,
    pub lemonsqueezy_customer_id: Option<String>,
    pub subscription_status: Option<String>,
    pub renews_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub name: Option<String>,
}

/// Subscription state reported by a payment provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubscriptionUpdate {
    pub plan: Option<Plan>,
    pub stripe_customer_id: Option<String>,
    pub lemonsqueezy_customer_id: Option<String>,
    pub subscription_status: Option<String>,
    pub renews_at: Option<DateTime<Utc>>,
}

const USER_COLUMNS: &str = "id, email, password_hash, name, plan, \
     audit_sleep_hours, audit_meetings, audit_dread, audit_date, \
     bonus_bricks, bonus_date, stripe_customer_id, lemonsqueezy_customer_id, \
     subscription_status, renews_at, created_at, updated_at, last_login_at";

impl User {
    /// Parsed plan, `None` if unset or unrecognized
    pub fn plan(&self) -> Option<Plan> {
        self.plan.as_deref().and_then(|p| p.parse().ok())
    }

    /// Audit answers, but only if they were given on `today`
    ///
    /// Yesterday's audit does not carry over; a builder re-audits daily.
    pub fn audit_for(&self, today: NaiveDate) -> Option<AuditAnswers> {
        if self.audit_date != Some(today) {
            return None;
        }

        match (self.audit_sleep_hours, self.audit_meetings, self.audit_dread) {
            (Some(sleep_hours), Some(meetings), Some(dread)) => Some(AuditAnswers {
                sleep_hours,
                meetings,
                dread,
            }),
            _ => None,
        }
    }

    /// Bonus bricks granted for `today`
    pub fn bonus_for(&self, today: NaiveDate) -> u32 {
        if self.bonus_date == Some(today) {
            self.bonus_bricks.max(0) as u32
        } else {
            0
        }
    }

    /// Today's capacity: plan base (with audit for builders) plus bonus
    pub fn capacity_on(&self, today: NaiveDate) -> Capacity {
        let audit = self.audit_for(today);
        capacity_for(self.plan(), audit.as_ref()).with_bonus(self.bonus_for(today))
    }

    /// Which screen the app shell should show given `active` bricks today
    pub fn screen(&self, today: NaiveDate, active: usize) -> Screen {
        screen_for(self.plan(), self.audit_for(today).is_some(), self.capacity_on(today), active)
    }

    /// Creates a new user with no plan
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists or the database fails.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (email, password_hash, name) VALUES ($1, $2, $3) RETURNING {}",
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(data.email)
            .bind(data.password_hash)
            .bind(data.name)
            .fetch_one(pool)
            .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Loads a user and locks the row until the transaction ends
    ///
    /// Serializes writes that check a per-user limit before inserting.
    pub async fn lock_for_update(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE id = $1 FOR UPDATE", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Finds a user by email address (case-insensitive via CITEXT)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE email = $1::citext", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    /// Finds the user linked to a Stripe customer
    pub async fn find_by_stripe_customer(
        pool: &PgPool,
        customer_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM users WHERE stripe_customer_id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(customer_id)
            .fetch_optional(pool)
            .await
    }

    /// Records a successful login
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET last_login_at = NOW(), updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Sets the user's plan
    pub async fn set_plan(pool: &PgPool, id: Uuid, plan: Plan) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET plan = $2, updated_at = NOW() WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(plan.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Stores today's energy audit answers
    pub async fn record_audit(
        pool: &PgPool,
        id: Uuid,
        answers: AuditAnswers,
        today: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET audit_sleep_hours = $2, audit_meetings = $3, audit_dread = $4,
                audit_date = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(answers.sleep_hours)
            .bind(answers.meetings)
            .bind(answers.dread)
            .bind(today)
            .fetch_optional(pool)
            .await
    }

    /// Grants one extra brick for `today`
    ///
    /// A bonus from a previous day is discarded rather than accumulated.
    pub async fn add_bonus_brick(
        pool: &PgPool,
        id: Uuid,
        today: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET bonus_bricks = CASE WHEN bonus_date = $2 THEN bonus_bricks + 1 ELSE 1 END,
                bonus_date = $2,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(today)
            .fetch_optional(pool)
            .await
    }

    /// Applies a provider-reported subscription change
    ///
    /// Fields left as `None` in `update` keep their stored value.
    pub async fn apply_subscription(
        pool: &PgPool,
        id: Uuid,
        update: SubscriptionUpdate,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE users
            SET plan = COALESCE($2, plan),
                stripe_customer_id = COALESCE($3, stripe_customer_id),
                lemonsqueezy_customer_id = COALESCE($4, lemonsqueezy_customer_id),
                subscription_status = COALESCE($5, subscription_status),
                renews_at = COALESCE($6, renews_at),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(update.plan.map(|p| p.as_str()))
            .bind(update.stripe_customer_id)
            .bind(update.lemonsqueezy_customer_id)
            .bind(update.subscription_status)
            .bind(update.renews_at)
            .fetch_optional(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(plan: Option<&str>) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "builder@example.com".to_string(),
            password_hash: "$argon2id$test".to_string(),
            name: None,
            plan: plan.map(str::to_string),
            audit_sleep_hours: None,
            audit_meetings: None,
            audit_dread: None,
            audit_date: None,
            bonus_bricks: 0,
            bonus_date: None,
            stripe_customer_id: None,
            lemonsqueezy_customer_id: None,
            subscription_status: None,
            renews_at: None,
            created_at: now,
            updated_at: now,
            last_login_at: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_plan_round_trip() {
        assert_eq!("builder".parse::<Plan>(), Ok(Plan::Builder));
        assert_eq!("ARCHITECT".parse::<Plan>(), Ok(Plan::Architect));
        assert!("newsletter".parse::<Plan>().is_err());
        assert_eq!(Plan::Trial.to_string(), "trial");
    }

    #[test]
    fn test_plan_flags() {
        assert!(!Plan::Trial.has_analytics());
        assert!(Plan::Builder.has_analytics());
        assert!(Plan::Architect.has_analytics());

        assert!(Plan::Trial.is_free());
        assert!(Plan::Builder.is_free());
        assert!(!Plan::Architect.is_free());
    }

    #[test]
    fn test_audit_only_counts_for_its_day() {
        let mut u = user(Some("builder"));
        u.audit_sleep_hours = Some(8);
        u.audit_meetings = Some(2);
        u.audit_dread = Some(3);
        u.audit_date = Some(day(10));

        assert!(u.audit_for(day(10)).is_some());
        assert!(u.audit_for(day(11)).is_none());
        assert_eq!(u.capacity_on(day(10)), Capacity::Limited(3));
        assert_eq!(u.capacity_on(day(11)), Capacity::Limited(0));
    }

    #[test]
    fn test_bonus_applies_only_on_its_day() {
        let mut u = user(Some("trial"));
        u.bonus_bricks = 2;
        u.bonus_date = Some(day(10));

        assert_eq!(u.capacity_on(day(10)), Capacity::Limited(5));
        assert_eq!(u.capacity_on(day(11)), Capacity::Limited(3));
    }

    #[test]
    fn test_unknown_plan_is_treated_as_none() {
        let u = user(Some("platinum"));
        assert_eq!(u.plan(), None);
        assert_eq!(u.screen(day(1), 0), Screen::Paywall);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let json = serde_json::to_value(user(None)).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
