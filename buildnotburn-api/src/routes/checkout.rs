/// Checkout endpoints
///
/// - `POST /v1/checkout` (signed in): hosted checkout for the architect plan
/// - `POST /v1/newsletter` (public): free newsletter signup through Lemon Squeezy
///
/// The plan itself changes only when the provider's webhook arrives.

use super::profile::current_user;
use crate::{
    app::AppState,
    billing::{
        self, BillingCycle, CheckoutLink, CheckoutProvider, CheckoutRequest, LemonSqueezyCheckout, Provider,
    },
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Extension, Json};
use buildnotburn_shared::{
    auth::middleware::AuthContext,
    models::{
        checkout::{CheckoutSession, CreateCheckoutSession},
        user::Plan,
    },
};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct CheckoutBody {
    pub provider: Provider,
    pub plan: Plan,

    #[serde(default = "default_cycle")]
    pub cycle: BillingCycle,
}

fn default_cycle() -> BillingCycle {
    BillingCycle::Monthly
}

#[derive(Debug, Deserialize, Validate)]
pub struct NewsletterBody {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Anonymous buyer id for a newsletter signup
pub fn newsletter_buyer_id(now_millis: i64) -> String {
    format!("newsletter-{}", now_millis)
}

/// Start a checkout for a paid plan
///
/// # Errors
///
/// - `400`: the plan is not for sale
/// - `500 configuration_error`: provider key or price id missing
/// - `502`: the provider refused or could not be reached
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(body): Json<CheckoutBody>,
) -> ApiResult<Json<CheckoutLink>> {
    if body.plan != Plan::Architect {
        return Err(ApiError::BadRequest(format!(
            "The {} plan cannot be purchased",
            body.plan
        )));
    }

    let provider = billing::provider_for(body.provider, &state.config, state.http.clone())?;
    let price_id = provider.price_for(body.plan, body.cycle)?;
    let user = current_user(&state, &auth).await?;

    let request = CheckoutRequest::for_user(user.id, &user.email, user.name.as_deref(), body.plan, price_id);
    let link = provider.create_checkout(&request).await?;

    if let Some(session_id) = &link.session_id {
        CheckoutSession::create(
            &state.db,
            CreateCheckoutSession {
                id: session_id.clone(),
                provider: provider.provider().as_str().to_string(),
                user_id: user.id,
                email: user.email.clone(),
                plan: request.plan.clone(),
                price_id: request.price_id.clone(),
            },
        )
        .await?;
    }

    tracing::info!(
        user_id = %user.id,
        provider = provider.provider().as_str(),
        cycle = ?body.cycle,
        "Checkout started"
    );

    Ok(Json(link))
}

/// Sign up for the newsletter
pub async fn newsletter_signup(
    State(state): State<AppState>,
    Json(body): Json<NewsletterBody>,
) -> ApiResult<Json<CheckoutLink>> {
    body.validate()?;

    let provider = LemonSqueezyCheckout::from_config(&state.config, state.http.clone())?;

    let request = CheckoutRequest {
        buyer_id: newsletter_buyer_id(Utc::now().timestamp_millis()),
        email: body.email.trim().to_string(),
        name: Some("Newsletter Subscriber".to_string()),
        plan: "newsletter".to_string(),
        price_id: provider.newsletter_variant()?,
    };

    let link = provider.create_checkout(&request).await?;

    tracing::info!(buyer_id = %request.buyer_id, "Newsletter checkout started");

    Ok(Json(link))
}
