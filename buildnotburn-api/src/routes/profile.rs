/// Profile endpoints
///
/// - `GET /v1/me`: plan, today's capacity and screen, feature flags
/// - `POST /v1/me/plan`: pick a free plan (trial or builder)
/// - `POST /v1/me/audit`: submit today's energy audit
/// - `POST /v1/me/lay-more`: one bonus brick for today after a firebreak
///
/// Every write publishes `profile_updated` on the feed and answers with
/// the refreshed profile.

use super::today;
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use buildnotburn_shared::{
    auth::middleware::AuthContext,
    build_list::BuildList,
    capacity::{AuditAnswers, EnergyLevel},
    feed::BrickChange,
    models::{
        brick::Brick,
        user::{Plan, User},
    },
    shell::Screen,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Serialize)]
pub struct Features {
    pub analytics: bool,
    pub unlimited_bricks: bool,
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub plan: Option<Plan>,
    pub subscription_status: Option<String>,
    pub today: NaiveDate,
    pub audited_today: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_level: Option<EnergyLevel>,

    /// `null` when unlimited
    pub capacity: Option<u32>,
    pub bonus_bricks: u32,
    pub active_count: usize,
    pub screen: Screen,
    pub features: Features,
}

impl ProfileResponse {
    pub fn build(user: &User, today: NaiveDate, active_count: usize) -> Self {
        let plan = user.plan();
        let audit = user.audit_for(today);

        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            plan,
            subscription_status: user.subscription_status.clone(),
            today,
            audited_today: audit.is_some(),
            energy_level: audit.map(|answers| answers.energy_level()),
            capacity: user.capacity_on(today).limit(),
            bonus_bricks: user.bonus_for(today),
            active_count,
            screen: user.screen(today, active_count),
            features: Features {
                analytics: plan.map(|p| p.has_analytics()).unwrap_or(false),
                unlimited_bricks: plan == Some(Plan::Architect),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChoosePlanRequest {
    pub plan: Plan,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AuditRequest {
    #[validate(range(min = 0, max = 24, message = "Sleep must be between 0 and 24 hours"))]
    pub sleep_hours: i32,

    #[validate(range(min = 0, max = 24, message = "Meetings must be between 0 and 24"))]
    pub meetings: i32,

    #[validate(range(min = 1, max = 10, message = "Dread must be between 1 and 10"))]
    pub dread: i32,
}

/// Loads the signed-in user; a deleted account is a 404
pub(crate) async fn current_user(state: &AppState, auth: &AuthContext) -> ApiResult<User> {
    User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

async fn profile_of(state: &AppState, user: &User) -> ApiResult<ProfileResponse> {
    let today = today();
    let list = BuildList::new(today, Brick::list_for_day(&state.db, user.id, today).await?);

    Ok(ProfileResponse::build(user, today, list.active_count()))
}

fn updated(user: Option<User>) -> ApiResult<User> {
    user.ok_or_else(|| ApiError::NotFound("User not found".to_string()))
}

pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = current_user(&state, &auth).await?;
    Ok(Json(profile_of(&state, &user).await?))
}

/// Pick a free plan
///
/// Architect is only granted by a completed checkout, so asking for it
/// here is a `403`.
pub async fn choose_plan(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ChoosePlanRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    if !req.plan.is_free() {
        return Err(ApiError::Forbidden(format!(
            "The {} plan requires a subscription; start a checkout instead",
            req.plan
        )));
    }

    let user = updated(User::set_plan(&state.db, auth.user_id, req.plan).await?)?;

    tracing::info!(user_id = %user.id, plan = %req.plan, "Plan chosen");
    state.feed.publish(user.id, BrickChange::ProfileUpdated);

    Ok(Json(profile_of(&state, &user).await?))
}

/// Record today's energy audit
///
/// Any plan may submit one, but only builders' capacity depends on it.
pub async fn submit_audit(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<AuditRequest>,
) -> ApiResult<Json<ProfileResponse>> {
    req.validate()?;

    let answers = AuditAnswers {
        sleep_hours: req.sleep_hours,
        meetings: req.meetings,
        dread: req.dread,
    };
    let today = today();

    let user = updated(User::record_audit(&state.db, auth.user_id, answers, today).await?)?;

    tracing::info!(
        user_id = %user.id,
        energy = ?answers.energy_level(),
        "Energy audit recorded"
    );
    state.feed.publish(user.id, BrickChange::ProfileUpdated);

    Ok(Json(profile_of(&state, &user).await?))
}

/// Lay one more brick today
///
/// Adds a same-day bonus to a limited capacity. Unlimited plans have
/// nothing to raise, and a user without capacity yet must pick a plan or
/// take the audit first.
pub async fn lay_more(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<ProfileResponse>> {
    let user = current_user(&state, &auth).await?;
    let today = today();

    match user.screen(today, 0) {
        Screen::Paywall => {
            return Err(ApiError::Forbidden("Choose a plan before laying bricks".to_string()))
        }
        Screen::Audit => {
            return Err(ApiError::Forbidden(
                "Take today's energy audit before laying bricks".to_string(),
            ))
        }
        _ => {}
    }

    if user.capacity_on(today).limit().is_none() {
        return Err(ApiError::Conflict("Your plan has no brick limit".to_string()));
    }

    let user = updated(User::add_bonus_brick(&state.db, user.id, today).await?)?;

    tracing::info!(user_id = %user.id, bonus = user.bonus_for(today), "Bonus brick granted");
    state.feed.publish(user.id, BrickChange::ProfileUpdated);

    Ok(Json(profile_of(&state, &user).await?))
}
