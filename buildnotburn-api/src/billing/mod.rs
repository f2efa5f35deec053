/// Hosted checkout with the payment providers
///
/// Both providers sit behind [`CheckoutProvider`], so the checkout route only
/// picks one and forwards the buyer. Payloads are built by pure functions
/// (`stripe::session_form`, `lemonsqueezy::checkout_payload`) and tested
/// without the network.
///
/// Keys and price ids are optional in [`Config`]; a provider is only built
/// when the route needs it, and a missing value surfaces as
/// [`ApiError::ConfigurationError`].

pub mod lemonsqueezy;
pub mod stripe;

use crate::{
    config::Config,
    error::{ApiError, ApiResult},
};
use async_trait::async_trait;
use buildnotburn_shared::models::user::Plan;
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use uuid::Uuid;

pub use lemonsqueezy::LemonSqueezyCheckout;
pub use stripe::StripeCheckout;

/// Timeout for provider API calls
pub const PROVIDER_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Stripe,
    LemonSqueezy,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Stripe => "stripe",
            Provider::LemonSqueezy => "lemonsqueezy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingCycle {
    Monthly,
    Annually,
}

/// Who is buying what
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    /// Account id, or an anonymous tag for newsletter signups
    pub buyer_id: String,
    pub email: String,
    pub name: Option<String>,

    /// Plan name echoed back in the webhook (`newsletter` for signups)
    pub plan: String,

    /// Stripe price id or Lemon Squeezy variant id
    pub price_id: String,
}

impl CheckoutRequest {
    pub fn for_user(user_id: Uuid, email: &str, name: Option<&str>, plan: Plan, price_id: String) -> Self {
        Self {
            buyer_id: user_id.to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
            plan: plan.as_str().to_string(),
            price_id,
        }
    }
}

/// Where to send the buyer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutLink {
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// A provider able to open a hosted checkout page
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    fn provider(&self) -> Provider;

    /// Price id (or variant id) for `plan` billed every `cycle`
    ///
    /// Only architect is sold; asking for anything else is a bad request,
    /// and an unconfigured id is a configuration error.
    fn price_for(&self, plan: Plan, cycle: BillingCycle) -> ApiResult<String>;

    /// Opens the checkout and returns its hosted URL
    async fn create_checkout(&self, request: &CheckoutRequest) -> ApiResult<CheckoutLink>;
}

/// HTTP client shared by the providers
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(PROVIDER_TIMEOUT)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Builds the provider named in a checkout request
pub fn provider_for(
    provider: Provider,
    config: &Config,
    client: reqwest::Client,
) -> ApiResult<Arc<dyn CheckoutProvider>> {
    Ok(match provider {
        Provider::Stripe => Arc::new(StripeCheckout::from_config(config, client)?),
        Provider::LemonSqueezy => Arc::new(LemonSqueezyCheckout::from_config(config, client)?),
    })
}

/// Picks the configured id for a cycle
pub(crate) fn configured_price(
    plan: Plan,
    cycle: BillingCycle,
    monthly: Option<&str>,
    annual: Option<&str>,
    setting: &str,
) -> ApiResult<String> {
    if plan != Plan::Architect {
        return Err(ApiError::BadRequest(format!(
            "The {} plan cannot be purchased",
            plan
        )));
    }

    let (id, suffix) = match cycle {
        BillingCycle::Monthly => (monthly, "MONTHLY"),
        BillingCycle::Annually => (annual, "ANNUAL"),
    };

    id.map(str::to_string)
        .ok_or_else(|| ApiError::ConfigurationError(format!("{}_ARCHITECT_{} is not set", setting, suffix)))
}

/// Turns a non-2xx provider answer into a 502
pub(crate) async fn ensure_success(
    provider: Provider,
    response: reqwest::Response,
) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(provider = provider.as_str(), status = %status, body = %body, "Checkout request rejected");

    Err(ApiError::PaymentProvider(format!(
        "{} answered {}",
        provider.as_str(),
        status
    )))
}
