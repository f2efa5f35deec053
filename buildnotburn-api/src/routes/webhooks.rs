/// Payment provider webhooks
///
/// - `POST /webhooks/lemonsqueezy`: `X-Signature` is the hex HMAC-SHA256 of
///   the raw body
/// - `POST /webhooks/stripe`: `Stripe-Signature: t=<ts>,v1=<hex>` over
///   `"{t}.{body}"`, five minutes of tolerance
///
/// The raw body is verified before it is parsed. Statuses:
///
/// | Case                               | Status |
/// |------------------------------------|--------|
/// | secret not configured              | 500    |
/// | signature missing or wrong         | 401    |
/// | malformed payload, unknown user    | 400    |
/// | handled or ignored                 | 200 `{"received": true}` |
///
/// A plan change publishes `profile_updated` so open clients refresh.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::HeaderMap, Json};
use buildnotburn_shared::{
    billing::{
        events::{parse_lemonsqueezy, parse_stripe, WebhookAction},
        signature::{verify_lemonsqueezy_signature, verify_stripe_signature},
    },
    feed::BrickChange,
    models::user::User,
};
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;

pub const LEMONSQUEEZY_SIGNATURE_HEADER: &str = "x-signature";
pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

#[derive(Debug, Serialize)]
pub struct WebhookReceipt {
    pub received: bool,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn secret<'a>(value: &'a Option<String>, setting: &str) -> ApiResult<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| ApiError::ConfigurationError(format!("{} is not set", setting)))
}

/// Applies a parsed webhook; an unknown user changes nothing
async fn apply(state: &AppState, provider: &str, action: WebhookAction) -> ApiResult<()> {
    let (user_id, update) = match action {
        WebhookAction::UpdateUser { user_id, update } => (user_id, update),
        WebhookAction::UpdateStripeCustomer { customer_id, update } => {
            let user = User::find_by_stripe_customer(&state.db, &customer_id)
                .await?
                .ok_or_else(|| {
                    tracing::warn!(provider, customer_id = %customer_id, "Webhook for unknown customer");
                    ApiError::BadRequest("No user for this customer".to_string())
                })?;
            (user.id, update)
        }
        WebhookAction::Ignore { event } => {
            tracing::debug!(provider, event = %event, "Webhook event ignored");
            return Ok(());
        }
    };

    let plan = update.plan;
    let user = User::apply_subscription(&state.db, user_id, update)
        .await?
        .ok_or_else(|| {
            tracing::warn!(provider, user_id = %user_id, "Webhook for unknown user");
            ApiError::BadRequest("Unknown user".to_string())
        })?;

    tracing::info!(
        provider,
        user_id = %user.id,
        plan = ?plan,
        status = ?user.subscription_status,
        "Subscription updated"
    );
    state.feed.publish(user.id, BrickChange::ProfileUpdated);

    Ok(())
}

pub async fn lemonsqueezy_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookReceipt>> {
    let secret = secret(
        &state.config.billing.lemonsqueezy.webhook_secret,
        "LEMONSQUEEZY_WEBHOOK_SECRET",
    )?;

    verify_lemonsqueezy_signature(secret, &body, header(&headers, LEMONSQUEEZY_SIGNATURE_HEADER))
        .map_err(|e| {
            tracing::warn!(error = %e, "Lemon Squeezy webhook rejected");
            e
        })?;

    let action = parse_lemonsqueezy(&body)?;
    apply(&state, "lemonsqueezy", action).await?;

    Ok(Json(WebhookReceipt { received: true }))
}

pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<WebhookReceipt>> {
    let secret = secret(&state.config.billing.stripe.webhook_secret, "STRIPE_WEBHOOK_SECRET")?;

    verify_stripe_signature(
        secret,
        &body,
        header(&headers, STRIPE_SIGNATURE_HEADER),
        Utc::now().timestamp(),
    )
    .map_err(|e| {
        tracing::warn!(error = %e, "Stripe webhook rejected");
        e
    })?;

    let action = parse_stripe(&body)?;
    apply(&state, "stripe", action).await?;

    Ok(Json(WebhookReceipt { received: true }))
}
