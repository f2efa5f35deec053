//! Shared helpers for the API integration tests
//!
//! - [`offline_app`]: router over a lazily connected pool pointed at a
//!   closed port, for paths that never reach Postgres
//! - [`TestContext`]: router over a real database (`DATABASE_URL`) with a
//!   freshly registered user
//! - request and body helpers

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use buildnotburn_api::{
    app::{build_router, AppState},
    config::Config,
};
use buildnotburn_shared::{
    auth::jwt::issue_token_pair,
    db::{
        migrations::run_migrations,
        pool::{create_lazy_pool, create_pool, DatabaseConfig},
    },
    models::user::{CreateUser, User},
};
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;
use tower::ServiceExt;
use uuid::Uuid;

pub const JWT_SECRET: &str = "integration-secret-key-at-least-32-bytes";
pub const STRIPE_WEBHOOK_SECRET: &str = "whsec_integration";
pub const LEMONSQUEEZY_WEBHOOK_SECRET: &str = "ls_integration_secret";

const UNREACHABLE_DATABASE: &str = "postgresql://nobody@127.0.0.1:1/none";

/// Config from a fixed set of variables layered over test defaults
pub fn config_with(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("DATABASE_URL".to_string(), UNREACHABLE_DATABASE.to_string()),
        ("JWT_SECRET".to_string(), JWT_SECRET.to_string()),
        ("STRIPE_WEBHOOK_SECRET".to_string(), STRIPE_WEBHOOK_SECRET.to_string()),
        (
            "LEMONSQUEEZY_WEBHOOK_SECRET".to_string(),
            LEMONSQUEEZY_WEBHOOK_SECRET.to_string(),
        ),
    ]);
    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }

    Config::from_lookup(|key| vars.get(key).cloned()).expect("test config")
}

/// Router whose database is unreachable
pub fn offline_app(config: Config) -> Router {
    let pool = create_lazy_pool(&DatabaseConfig {
        url: config.database.url.clone(),
        min_connections: 0,
        connect_timeout_seconds: 1,
        ..Default::default()
    })
    .expect("lazy pool");

    build_router(AppState::new(pool, config))
}

pub fn bearer_for(user_id: Uuid) -> String {
    let tokens = issue_token_pair(user_id, JWT_SECRET).expect("token pair");
    format!("Bearer {}", tokens.access_token)
}

pub fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post_json(uri: &str, auth: Option<&str>, body: &Value) -> Request<Body> {
    send_json("POST", uri, auth, body)
}

pub fn send_json(method: &str, uri: &str, auth: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn post_raw(uri: &str, headers: &[(&str, &str)], body: &[u8]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    builder.body(Body::from(body.to_vec())).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response: Response<Body> = app.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()))
    };

    (status, body)
}

/// A migrated database, a router over it, and one registered user
pub struct TestContext {
    pub db: PgPool,
    pub app: Router,
    pub user: User,
    pub auth: String,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        let url = std::env::var("DATABASE_URL")?;
        let config = config_with(&[("DATABASE_URL", &url)]);

        let db = create_pool(DatabaseConfig {
            url,
            max_connections: 5,
            ..Default::default()
        })
        .await?;
        run_migrations(&db).await?;

        let user = User::create(
            &db,
            CreateUser {
                email: format!("test-{}@example.com", Uuid::new_v4()),
                password_hash: "unused".to_string(),
                name: Some("Test Builder".to_string()),
            },
        )
        .await?;

        let app = build_router(AppState::new(db.clone(), config));
        let auth = bearer_for(user.id);

        Ok(Self { db, app, user, auth })
    }

    pub async fn cleanup(&self) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(self.user.id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
