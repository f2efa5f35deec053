/// Bearer authentication layer
///
/// Validates the access token and stores the [`AuthContext`] in request
/// extensions; handlers take `Extension<AuthContext>`.

use crate::{app::AppState, error::ApiError};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use buildnotburn_shared::auth::middleware::{authenticate, AuthContext};

pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context: AuthContext = authenticate(req.headers(), state.jwt_secret())?;

    tracing::debug!(user_id = %context.user_id, "Authenticated request");
    req.extensions_mut().insert(context);

    Ok(next.run(req).await)
}
