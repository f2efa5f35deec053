/// Database models
///
/// Each model owns its SQL: plain `query_as` calls returning
/// `Result<_, sqlx::Error>`, with no business rules beyond what the schema
/// enforces. The rules themselves live in [`crate::capacity`],
/// [`crate::build_list`] and friends.
///
/// # Models
///
/// - `user`: profile, plan, audit answers, subscription state
/// - `brick`: daily tasks
/// - `checkout`: payment checkout sessions
///
/// # Example
///
/// ```no_run
/// use buildnotburn_shared::models::user::{User, CreateUser};
/// use buildnotburn_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let user = User::create(&pool, CreateUser {
///     email: "builder@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     name: Some("Builder".to_string()),
/// }).await?;
/// # Ok(())
/// # }
/// ```

pub mod brick;
pub mod checkout;
pub mod user;
