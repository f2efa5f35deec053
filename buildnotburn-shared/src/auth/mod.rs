/// Authentication primitives
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: access/refresh token issue and validation
/// - [`middleware`]: bearer-token extraction into an [`middleware::AuthContext`]

pub mod jwt;
pub mod middleware;
pub mod password;
