/// Review analytics
///
/// ```text
/// GET /v1/analytics
/// ```
///
/// Paid plans only; trial users (and users without a plan) get a `403`
/// pointing them at an upgrade.

use super::{profile::current_user, today};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use buildnotburn_shared::{
    analytics::{self, Analytics},
    auth::middleware::AuthContext,
    models::brick::Brick,
};

pub async fn get_analytics(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Analytics>> {
    let user = current_user(&state, &auth).await?;

    if !user.plan().map(|plan| plan.has_analytics()).unwrap_or(false) {
        tracing::debug!(user_id = %user.id, "Analytics refused for plan");
        return Err(ApiError::Forbidden(
            "Analytics are part of the Builder and Architect plans. Upgrade to unlock them".to_string(),
        ));
    }

    let bricks = Brick::list_by_user(&state.db, user.id).await?;

    Ok(Json(analytics::calculate(&bricks, today())))
}
