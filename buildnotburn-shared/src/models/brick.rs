/// Brick model and database operations
///
/// A brick is a single daily task. Bricks are never hard-deleted: completing
/// one stamps the completion day, burning one moves its `date` into the past
/// so it drops out of today's active set while staying in the history.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE bricks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     text VARCHAR(500) NOT NULL,
///     is_completed BOOLEAN NOT NULL DEFAULT FALSE,
///     date DATE NOT NULL,
///     position INTEGER NOT NULL DEFAULT 0,
///     notes TEXT,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use buildnotburn_shared::models::brick::Brick;
/// use chrono::Utc;
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, user_id: Uuid) -> Result<(), sqlx::Error> {
/// let today = Utc::now().date_naive();
/// let active = Brick::list_for_day(&pool, user_id, today).await?;
/// println!("{} bricks on the list today", active.len());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool};
use uuid::Uuid;

/// A single daily task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Brick {
    pub id: Uuid,

    /// Owner
    pub user_id: Uuid,

    /// Uppercase task text
    pub text: String,

    /// One-way: once true, never false again
    pub is_completed: bool,

    /// Day the brick belongs to (creation, completion, or burn-deferred day)
    pub date: NaiveDate,

    /// Display order within the owner's list
    pub position: i32,

    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Brick {
    /// Whether this brick counts against the capacity of `today`
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        !self.is_completed && self.date == today
    }

    /// Whether this brick sits on the burn pile as of `today`
    pub fn is_burned_as_of(&self, today: NaiveDate) -> bool {
        !self.is_completed && self.date < today
    }

    /// Persists a brick built by the reducer
    ///
    /// The id generated in memory is kept so the caller and the feed agree
    /// on it.
    pub async fn insert<'e, E>(executor: E, brick: &Brick) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Brick>(
            r#"
            INSERT INTO bricks (id, user_id, text, is_completed, date, position, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, text, is_completed, date, position, notes,
                      created_at, updated_at
            "#,
        )
        .bind(brick.id)
        .bind(brick.user_id)
        .bind(&brick.text)
        .bind(brick.is_completed)
        .bind(brick.date)
        .bind(brick.position)
        .bind(&brick.notes)
        .fetch_one(executor)
        .await
    }

    /// Finds a brick owned by `user_id`
    ///
    /// Bricks of other users are reported as not found.
    pub async fn find_by_id_and_user(
        pool: &PgPool,
        id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Brick>(
            r#"
            SELECT id, user_id, text, is_completed, date, position, notes,
                   created_at, updated_at
            FROM bricks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Full history of a user, oldest first
    pub async fn list_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Brick>(
            r#"
            SELECT id, user_id, text, is_completed, date, position, notes,
                   created_at, updated_at
            FROM bricks
            WHERE user_id = $1
            ORDER BY date ASC, position ASC, created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// All bricks dated `day` (active and completed), in display order
    pub async fn list_for_day<'e, E>(
        executor: E,
        user_id: Uuid,
        day: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        sqlx::query_as::<_, Brick>(
            r#"
            SELECT id, user_id, text, is_completed, date, position, notes,
                   created_at, updated_at
            FROM bricks
            WHERE user_id = $1 AND date = $2
            ORDER BY position ASC, created_at ASC
            "#,
        )
        .bind(user_id)
        .bind(day)
        .fetch_all(executor)
        .await
    }

    /// Incomplete bricks dated before `today`, most recently deferred first
    pub async fn list_burn_pile(
        pool: &PgPool,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Brick>(
            r#"
            SELECT id, user_id, text, is_completed, date, position, notes,
                   created_at, updated_at
            FROM bricks
            WHERE user_id = $1 AND is_completed = FALSE AND date < $2
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(today)
        .fetch_all(pool)
        .await
    }

    /// Writes back the mutable fields of a brick
    ///
    /// Completion stays one-way even under concurrent writers: a stored
    /// `TRUE` is never overwritten with `FALSE`.
    pub async fn update(pool: &PgPool, brick: &Brick) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Brick>(
            r#"
            UPDATE bricks
            SET is_completed = is_completed OR $3,
                date = $4,
                notes = $5,
                position = $6,
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, text, is_completed, date, position, notes,
                      created_at, updated_at
            "#,
        )
        .bind(brick.id)
        .bind(brick.user_id)
        .bind(brick.is_completed)
        .bind(brick.date)
        .bind(&brick.notes)
        .bind(brick.position)
        .fetch_optional(pool)
        .await
    }

    /// Stores new display positions in one transaction
    pub async fn update_positions(
        pool: &PgPool,
        user_id: Uuid,
        positions: &[(Uuid, i32)],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        for (id, position) in positions {
            sqlx::query(
                "UPDATE bricks SET position = $3, updated_at = NOW() WHERE id = $1 AND user_id = $2",
            )
            .bind(id)
            .bind(user_id)
            .bind(position)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brick(is_completed: bool, date: NaiveDate) -> Brick {
        let now = Utc::now();
        Brick {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            text: "SHIP IT".to_string(),
            is_completed,
            date,
            position: 0,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_active_and_burned_flags() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        let yesterday = today.pred_opt().unwrap();

        assert!(brick(false, today).is_active_on(today));
        assert!(!brick(true, today).is_active_on(today));
        assert!(!brick(false, yesterday).is_active_on(today));

        assert!(brick(false, yesterday).is_burned_as_of(today));
        assert!(!brick(true, yesterday).is_burned_as_of(today));
        assert!(!brick(false, today).is_burned_as_of(today));
    }
}
