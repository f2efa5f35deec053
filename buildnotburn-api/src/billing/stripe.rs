/// Stripe Checkout sessions
///
/// Sessions are created with a form-encoded `POST /v1/checkout/sessions`
/// in subscription mode. The buyer's id and plan ride along as metadata and
/// come back in the `checkout.session.completed` webhook.

use super::{configured_price, ensure_success, BillingCycle, CheckoutLink, CheckoutProvider, CheckoutRequest, Provider};
use crate::{
    config::Config,
    error::{ApiError, ApiResult},
};
use async_trait::async_trait;
use buildnotburn_shared::models::user::Plan;
use serde::Deserialize;

pub const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

pub struct StripeCheckout {
    client: reqwest::Client,
    secret_key: String,
    price_monthly: Option<String>,
    price_annual: Option<String>,
    app_url: String,
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

impl StripeCheckout {
    /// Fails with a configuration error when `STRIPE_SECRET_KEY` is unset
    pub fn from_config(config: &Config, client: reqwest::Client) -> ApiResult<Self> {
        let stripe = &config.billing.stripe;
        let secret_key = stripe
            .secret_key
            .clone()
            .ok_or_else(|| ApiError::ConfigurationError("STRIPE_SECRET_KEY is not set".to_string()))?;

        Ok(Self {
            client,
            secret_key,
            price_monthly: stripe.price_architect_monthly.clone(),
            price_annual: stripe.price_architect_annual.clone(),
            app_url: config.app_url.clone(),
        })
    }
}

/// Form fields for a subscription checkout session
///
/// `{CHECKOUT_SESSION_ID}` is left literal; Stripe substitutes it.
pub fn session_form(request: &CheckoutRequest, app_url: &str) -> Vec<(String, String)> {
    vec![
        ("mode".to_string(), "subscription".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("line_items[0][price]".to_string(), request.price_id.clone()),
        ("line_items[0][quantity]".to_string(), "1".to_string()),
        (
            "success_url".to_string(),
            format!("{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}", app_url),
        ),
        ("cancel_url".to_string(), format!("{}/", app_url)),
        ("customer_email".to_string(), request.email.clone()),
        ("metadata[user_id]".to_string(), request.buyer_id.clone()),
        ("metadata[plan]".to_string(), request.plan.clone()),
    ]
}

#[async_trait]
impl CheckoutProvider for StripeCheckout {
    fn provider(&self) -> Provider {
        Provider::Stripe
    }

    fn price_for(&self, plan: Plan, cycle: BillingCycle) -> ApiResult<String> {
        configured_price(
            plan,
            cycle,
            self.price_monthly.as_deref(),
            self.price_annual.as_deref(),
            "STRIPE_PRICE",
        )
    }

    async fn create_checkout(&self, request: &CheckoutRequest) -> ApiResult<CheckoutLink> {
        let response = self
            .client
            .post(format!("{}/checkout/sessions", STRIPE_API_BASE))
            .bearer_auth(&self.secret_key)
            .form(&session_form(request, &self.app_url))
            .send()
            .await?;

        let session: SessionResponse = ensure_success(Provider::Stripe, response).await?.json().await?;

        let url = session
            .url
            .ok_or_else(|| ApiError::PaymentProvider("Stripe session has no URL".to_string()))?;

        tracing::info!(session_id = %session.id, plan = %request.plan, "Stripe checkout session created");

        Ok(CheckoutLink {
            url,
            session_id: Some(session.id),
        })
    }
}
