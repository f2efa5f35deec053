/// Application state and router builder
///
/// # Example
///
/// ```no_run
/// use buildnotburn_api::{app::{build_router, AppState}, config::Config};
/// use sqlx::PgPool;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let app = build_router(AppState::new(pool, config));
///
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```

use crate::{
    billing,
    config::Config,
    middleware::{auth::require_auth, security::security_headers},
    routes,
};
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use buildnotburn_shared::feed::BrickFeed;
use sqlx::PgPool;
use std::{sync::Arc, time::Duration};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state, cloned into every handler
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<Config>,

    /// Live brick changes per user
    pub feed: BrickFeed,

    /// Client for payment provider calls
    pub http: reqwest::Client,
}

impl AppState {
    pub fn new(db: PgPool, config: Config) -> Self {
        Self {
            db,
            config: Arc::new(config),
            feed: BrickFeed::new(),
            http: billing::http_client(),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the router with all routes and middleware
///
/// ```text
/// /health                           public
/// /webhooks/{stripe,lemonsqueezy}   public, signature checked
/// /v1/auth/{register,login,refresh} public
/// /v1/newsletter                    public
/// /v1/me, /v1/bricks, /v1/wall,
/// /v1/analytics, /v1/checkout       bearer token
/// ```
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    let brick_routes = Router::new()
        .route("/", get(routes::bricks::list_history).post(routes::bricks::create_brick))
        .route("/today", get(routes::bricks::list_today))
        .route("/burn-pile", get(routes::bricks::list_burn_pile))
        .route("/reorder", post(routes::bricks::reorder_bricks))
        .route("/stream", get(routes::bricks::stream_bricks))
        .route("/:id/complete", post(routes::bricks::complete_brick))
        .route("/:id/burn", post(routes::bricks::burn_brick))
        .route("/:id/notes", put(routes::bricks::save_notes));

    let protected_routes = Router::new()
        .route("/me", get(routes::profile::get_profile))
        .route("/me/plan", post(routes::profile::choose_plan))
        .route("/me/audit", post(routes::profile::submit_audit))
        .route("/me/lay-more", post(routes::profile::lay_more))
        .nest("/bricks", brick_routes)
        .route("/wall", get(routes::wall::get_wall))
        .route("/analytics", get(routes::analytics::get_analytics))
        .route("/checkout", post(routes::checkout::create_checkout))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let v1_routes = Router::new()
        .nest("/auth", auth_routes)
        .route("/newsletter", post(routes::checkout::newsletter_signup))
        .merge(protected_routes);

    let webhook_routes = Router::new()
        .route("/stripe", post(routes::webhooks::stripe_webhook))
        .route("/lemonsqueezy", post(routes::webhooks::lemonsqueezy_webhook));

    let cors = cors_layer(&state.config);
    let production = state.config.api.production;

    Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/v1", v1_routes)
        .nest("/webhooks", webhook_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(from_fn_with_state(production, security_headers))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .api
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}
