/// Lemon Squeezy hosted checkouts
///
/// Checkouts are JSON:API documents posted to `/v1/checkouts` with the
/// store and variant as relationships. The buyer id and plan go into
/// `checkout_data.custom` and come back as `meta.custom_data` on webhooks.

use super::{configured_price, ensure_success, BillingCycle, CheckoutLink, CheckoutProvider, CheckoutRequest, Provider};
use crate::{
    config::Config,
    error::{ApiError, ApiResult},
};
use async_trait::async_trait;
use buildnotburn_shared::models::user::Plan;
use reqwest::header;
use serde::Deserialize;
use serde_json::{json, Value};

pub const LEMONSQUEEZY_API_BASE: &str = "https://api.lemonsqueezy.com/v1";

const JSON_API: &str = "application/vnd.api+json";

pub struct LemonSqueezyCheckout {
    client: reqwest::Client,
    api_key: String,
    store_id: String,
    variant_monthly: Option<String>,
    variant_annual: Option<String>,
    newsletter_variant: Option<String>,
    app_url: String,
}

#[derive(Debug, Deserialize)]
struct CheckoutDocument {
    data: CheckoutData,
}

#[derive(Debug, Deserialize)]
struct CheckoutData {
    id: String,
    attributes: CheckoutAttributes,
}

#[derive(Debug, Deserialize)]
struct CheckoutAttributes {
    url: String,
}

impl LemonSqueezyCheckout {
    /// Needs both `LEMONSQUEEZY_API_KEY` and `LEMONSQUEEZY_STORE_ID`
    pub fn from_config(config: &Config, client: reqwest::Client) -> ApiResult<Self> {
        let ls = &config.billing.lemonsqueezy;

        let (api_key, store_id) = match (&ls.api_key, &ls.store_id) {
            (Some(key), Some(store)) => (key.clone(), store.clone()),
            _ => {
                return Err(ApiError::ConfigurationError(
                    "LEMONSQUEEZY_API_KEY and LEMONSQUEEZY_STORE_ID must be set".to_string(),
                ))
            }
        };

        Ok(Self {
            client,
            api_key,
            store_id,
            variant_monthly: ls.variant_architect_monthly.clone(),
            variant_annual: ls.variant_architect_annual.clone(),
            newsletter_variant: ls.newsletter_variant_id.clone(),
            app_url: config.app_url.clone(),
        })
    }

    /// Variant for the free newsletter product
    pub fn newsletter_variant(&self) -> ApiResult<String> {
        self.newsletter_variant.clone().ok_or_else(|| {
            ApiError::ConfigurationError("LEMONSQUEEZY_NEWSLETTER_VARIANT_ID is not set".to_string())
        })
    }
}

/// JSON:API body for `POST /v1/checkouts`
pub fn checkout_payload(request: &CheckoutRequest, store_id: &str, app_url: &str) -> Value {
    let mut checkout_data = json!({
        "email": request.email,
        "custom": {
            "user_id": request.buyer_id,
            "plan": request.plan,
        },
    });
    if let Some(name) = &request.name {
        checkout_data["name"] = json!(name);
    }

    json!({
        "data": {
            "type": "checkouts",
            "attributes": {
                "checkout_data": checkout_data,
                "product_options": {
                    "redirect_url": format!("{}/checkout/success", app_url),
                },
            },
            "relationships": {
                "store": { "data": { "type": "stores", "id": store_id } },
                "variant": { "data": { "type": "variants", "id": request.price_id } },
            },
        },
    })
}

#[async_trait]
impl CheckoutProvider for LemonSqueezyCheckout {
    fn provider(&self) -> Provider {
        Provider::LemonSqueezy
    }

    fn price_for(&self, plan: Plan, cycle: BillingCycle) -> ApiResult<String> {
        configured_price(
            plan,
            cycle,
            self.variant_monthly.as_deref(),
            self.variant_annual.as_deref(),
            "LEMONSQUEEZY_VARIANT",
        )
    }

    async fn create_checkout(&self, request: &CheckoutRequest) -> ApiResult<CheckoutLink> {
        let body = checkout_payload(request, &self.store_id, &self.app_url);

        let response = self
            .client
            .post(format!("{}/checkouts", LEMONSQUEEZY_API_BASE))
            .bearer_auth(&self.api_key)
            .header(header::ACCEPT, JSON_API)
            .header(header::CONTENT_TYPE, JSON_API)
            .body(body.to_string())
            .send()
            .await?;

        let document: CheckoutDocument = ensure_success(Provider::LemonSqueezy, response)
            .await?
            .json()
            .await?;

        tracing::info!(checkout_id = %document.data.id, plan = %request.plan, "Lemon Squeezy checkout created");

        Ok(CheckoutLink {
            url: document.data.attributes.url,
            session_id: Some(document.data.id),
        })
    }
}
