/// Database connection pool and migrations
///
/// # Modules
///
/// - `pool`: PostgreSQL pool creation and health checks
/// - `migrations`: embedded schema migrations
///
/// Models are in the `models` module at crate root level.

pub mod migrations;
pub mod pool;
