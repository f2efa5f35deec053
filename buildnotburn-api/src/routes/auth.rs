/// Authentication endpoints
///
/// - `POST /v1/auth/register`: create an account (no plan yet) and sign in
/// - `POST /v1/auth/login`: exchange email and password for tokens
/// - `POST /v1/auth/refresh`: exchange a refresh token for an access token
///
/// New accounts start without a plan, so the first `/v1/me` after
/// registering routes them to the paywall.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use buildnotburn_shared::{
    auth::{jwt, password},
    models::user::{CreateUser, User},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Tokens plus the signed-in user id
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub user_id: String,

    #[serde(flatten)]
    pub tokens: jwt::TokenPair,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// Register a new user
///
/// # Errors
///
/// - `422`: malformed email, short or weak password
/// - `409`: email already registered
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    req.validate()?;

    password::validate_password_strength(&req.password)
        .map_err(|msg| ApiError::invalid_field("password", msg))?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email.trim().to_string(),
            password_hash,
            name: req.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered");

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    Ok((
        StatusCode::CREATED,
        Json(SessionResponse {
            user_id: user.id.to_string(),
            tokens,
        }),
    ))
}

/// Log in with email and password
///
/// Unknown email and wrong password give the same `401`.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<SessionResponse>> {
    req.validate()?;

    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, req.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(invalid());
    }

    User::update_last_login(&state.db, user.id).await?;

    let tokens = jwt::issue_token_pair(user.id, state.jwt_secret())?;

    Ok(Json(SessionResponse {
        user_id: user.id.to_string(),
        tokens,
    }))
}

/// Exchange a refresh token for a new access token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let access_token = jwt::refresh_access_token(&req.refresh_token, state.jwt_secret())?;

    Ok(Json(RefreshResponse { access_token }))
}
