/// Payment provider integration shared by the API
///
/// # Modules
///
/// - [`signature`]: webhook signature verification (Stripe and Lemon Squeezy)
/// - [`events`]: webhook payload parsing into subscription updates
///
/// Checkout session creation talks HTTP and lives in the API crate.

pub mod events;
pub mod signature;
