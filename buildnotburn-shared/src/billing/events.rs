/// Webhook payload parsing
///
/// Turns a verified provider event into a [`WebhookAction`]: which user (or
/// Stripe customer) to update and with what [`SubscriptionUpdate`]. Parsing
/// is separate from signature checks and from the database so each step
/// maps onto its own HTTP status.
///
/// # Handled events
///
/// | Provider      | Event                            | Effect                               |
/// |---------------|----------------------------------|--------------------------------------|
/// | Lemon Squeezy | `subscription_created`/`_updated`| plan (custom or builder), customer, status, renewal |
/// | Lemon Squeezy | `subscription_expired`           | plan back to trial                   |
/// | Stripe        | `checkout.session.completed`     | plan from metadata, Stripe customer  |
/// | Stripe        | `customer.subscription.deleted`  | plan back to trial for that customer |
///
/// Everything else is acknowledged and ignored.

use crate::models::user::{Plan, SubscriptionUpdate};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    #[error("Malformed webhook payload: {0}")]
    Malformed(String),

    #[error("Webhook payload missing {0}")]
    MissingField(&'static str),

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Unknown plan: {0}")]
    UnknownPlan(String),
}

/// What a webhook asks us to change
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookAction {
    /// Update the user with this id
    UpdateUser {
        user_id: Uuid,
        update: SubscriptionUpdate,
    },

    /// Update whichever user is linked to this Stripe customer
    UpdateStripeCustomer {
        customer_id: String,
        update: SubscriptionUpdate,
    },

    /// Acknowledged without changes
    Ignore { event: String },
}

impl WebhookAction {
    pub fn update(&self) -> Option<&SubscriptionUpdate> {
        match self {
            WebhookAction::UpdateUser { update, .. }
            | WebhookAction::UpdateStripeCustomer { update, .. } => Some(update),
            WebhookAction::Ignore { .. } => None,
        }
    }
}

fn parse_user_id(raw: &str) -> Result<Uuid, WebhookError> {
    Uuid::parse_str(raw).map_err(|_| WebhookError::InvalidUserId(raw.to_string()))
}

fn parse_plan(raw: &str) -> Result<Plan, WebhookError> {
    raw.parse().map_err(|_| WebhookError::UnknownPlan(raw.to_string()))
}

#[derive(Debug, Deserialize)]
struct LemonSqueezyEvent {
    meta: LemonSqueezyMeta,
    #[serde(default)]
    data: Option<LemonSqueezyData>,
}

#[derive(Debug, Deserialize)]
struct LemonSqueezyMeta {
    event_name: String,
    #[serde(default)]
    custom_data: Option<LemonSqueezyCustom>,
}

#[derive(Debug, Deserialize)]
struct LemonSqueezyCustom {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    plan: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LemonSqueezyData {
    #[serde(default)]
    attributes: LemonSqueezyAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct LemonSqueezyAttributes {
    /// Numeric in practice; kept loose so a string id also works
    #[serde(default)]
    customer_id: Option<Value>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    renews_at: Option<DateTime<Utc>>,
}

fn value_to_id(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parses a Lemon Squeezy webhook body
///
/// Every event must carry `meta.custom_data.user_id` (checkouts are created
/// with it). The id only has to be a valid user id for events that change a
/// user; anonymous newsletter checkouts are acknowledged as-is.
pub fn parse_lemonsqueezy(body: &[u8]) -> Result<WebhookAction, WebhookError> {
    let event: LemonSqueezyEvent =
        serde_json::from_slice(body).map_err(|e| WebhookError::Malformed(e.to_string()))?;

    let custom = event
        .meta
        .custom_data
        .ok_or(WebhookError::MissingField("meta.custom_data.user_id"))?;
    let raw_user_id = custom
        .user_id
        .filter(|id| !id.is_empty())
        .ok_or(WebhookError::MissingField("meta.custom_data.user_id"))?;

    let attributes = event.data.map(|d| d.attributes).unwrap_or_default();

    match event.meta.event_name.as_str() {
        "subscription_created" | "subscription_updated" => {
            let plan = match custom.plan.as_deref() {
                Some(plan) if !plan.is_empty() => parse_plan(plan)?,
                _ => Plan::Builder,
            };

            Ok(WebhookAction::UpdateUser {
                user_id: parse_user_id(&raw_user_id)?,
                update: SubscriptionUpdate {
                    plan: Some(plan),
                    lemonsqueezy_customer_id: attributes.customer_id.as_ref().and_then(value_to_id),
                    subscription_status: attributes.status,
                    renews_at: attributes.renews_at,
                    ..Default::default()
                },
            })
        }
        "subscription_expired" => Ok(WebhookAction::UpdateUser {
            user_id: parse_user_id(&raw_user_id)?,
            update: SubscriptionUpdate {
                plan: Some(Plan::Trial),
                subscription_status: attributes.status.or_else(|| Some("expired".to_string())),
                ..Default::default()
            },
        }),
        other => Ok(WebhookAction::Ignore {
            event: other.to_string(),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: Value,
}

#[derive(Debug, Deserialize)]
struct StripeCheckoutSession {
    #[serde(default)]
    metadata: Option<StripeMetadata>,
    #[serde(default)]
    customer: Option<String>,
    #[serde(default)]
    customer_details: Option<StripeCustomerDetails>,
}

#[derive(Debug, Default, Deserialize)]
struct StripeMetadata {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    plan: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeCustomerDetails {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeSubscription {
    customer: String,
    #[serde(default)]
    status: Option<String>,
}

/// Parses a Stripe webhook body
pub fn parse_stripe(body: &[u8]) -> Result<WebhookAction, WebhookError> {
    let event: StripeEvent =
        serde_json::from_slice(body).map_err(|e| WebhookError::Malformed(e.to_string()))?;

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: StripeCheckoutSession = serde_json::from_value(event.data.object)
                .map_err(|e| WebhookError::Malformed(e.to_string()))?;

            let metadata = session.metadata.unwrap_or_default();
            let user_id = metadata
                .user_id
                .filter(|id| !id.is_empty())
                .ok_or(WebhookError::MissingField("metadata.user_id"))?;
            let plan = metadata
                .plan
                .filter(|plan| !plan.is_empty())
                .ok_or(WebhookError::MissingField("metadata.plan"))?;
            session
                .customer_details
                .and_then(|details| details.email)
                .filter(|email| !email.is_empty())
                .ok_or(WebhookError::MissingField("customer_details.email"))?;

            Ok(WebhookAction::UpdateUser {
                user_id: parse_user_id(&user_id)?,
                update: SubscriptionUpdate {
                    plan: Some(parse_plan(&plan)?),
                    stripe_customer_id: session.customer,
                    subscription_status: Some("active".to_string()),
                    ..Default::default()
                },
            })
        }
        "customer.subscription.deleted" => {
            let subscription: StripeSubscription = serde_json::from_value(event.data.object)
                .map_err(|e| WebhookError::Malformed(e.to_string()))?;

            Ok(WebhookAction::UpdateStripeCustomer {
                customer_id: subscription.customer,
                update: SubscriptionUpdate {
                    plan: Some(Plan::Trial),
                    subscription_status: subscription.status.or_else(|| Some("canceled".to_string())),
                    ..Default::default()
                },
            })
        }
        other => Ok(WebhookAction::Ignore {
            event: other.to_string(),
        }),
    }
}
