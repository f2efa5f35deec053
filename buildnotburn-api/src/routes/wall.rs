/// The Wall
///
/// ```text
/// GET /v1/wall?days=90
/// ```
///
/// One entry per day, oldest first, ending today. `days` defaults to 90
/// and is clamped to 1..=365.

use super::today;
use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use buildnotburn_shared::{
    auth::middleware::AuthContext,
    models::brick::Brick,
    wall::{build_wall, WallDay, DEFAULT_WALL_DAYS, MAX_WALL_DAYS},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize)]
pub struct WallQuery {
    pub days: Option<u32>,
}

impl WallQuery {
    pub fn window(&self) -> u32 {
        self.days.unwrap_or(DEFAULT_WALL_DAYS).clamp(1, MAX_WALL_DAYS)
    }
}

#[derive(Debug, Serialize)]
pub struct WallResponse {
    pub days: u32,
    pub total_completed: usize,
    pub wall: Vec<WallDay>,
}

pub async fn get_wall(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<WallQuery>,
) -> ApiResult<Json<WallResponse>> {
    let days = query.window();
    let bricks = Brick::list_by_user(&state.db, auth.user_id).await?;
    let wall = build_wall(&bricks, today(), days);

    Ok(Json(WallResponse {
        days,
        total_completed: wall.iter().map(|day| day.total_completed).sum(),
        wall,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_defaults_and_clamps() {
        assert_eq!(WallQuery::default().window(), 90);
        assert_eq!(WallQuery { days: Some(0) }.window(), 1);
        assert_eq!(WallQuery { days: Some(30) }.window(), 30);
        assert_eq!(WallQuery { days: Some(5000) }.window(), 365);
    }
}
