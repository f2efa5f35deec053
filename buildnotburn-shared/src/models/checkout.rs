/// Checkout session records
///
/// Every checkout we open with a payment provider is recorded against the
/// buyer, so a later webhook or support request can be traced back to who
/// started it and for which plan.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE checkouts (
///     id VARCHAR(255) PRIMARY KEY,       -- provider session id
///     provider VARCHAR(20) NOT NULL,     -- 'stripe' | 'lemonsqueezy'
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     email CITEXT NOT NULL,
///     plan VARCHAR(20) NOT NULL,
///     price_id VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CheckoutSession {
    /// Provider-assigned session id
    pub id: String,
    pub provider: String,
    pub user_id: Uuid,
    pub email: String,
    pub plan: String,

    /// Stripe price id or Lemon Squeezy variant id
    pub price_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CreateCheckoutSession {
    pub id: String,
    pub provider: String,
    pub user_id: Uuid,
    pub email: String,
    pub plan: String,
    pub price_id: String,
}

impl CheckoutSession {
    /// Records a checkout; re-recording the same session id is a no-op
    pub async fn create(pool: &PgPool, data: CreateCheckoutSession) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, CheckoutSession>(
            r#"
            INSERT INTO checkouts (id, provider, user_id, email, plan, price_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET id = EXCLUDED.id
            RETURNING id, provider, user_id, email, plan, price_id, created_at
            "#,
        )
        .bind(data.id)
        .bind(data.provider)
        .bind(data.user_id)
        .bind(data.email)
        .bind(data.plan)
        .bind(data.price_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, CheckoutSession>(
            "SELECT id, provider, user_id, email, plan, price_id, created_at FROM checkouts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}
