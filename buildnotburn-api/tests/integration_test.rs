/// End-to-end tests against a real database
///
/// Run with `DATABASE_URL` pointing at a scratch Postgres:
///
/// ```bash
/// cargo test -p buildnotburn-api --test integration_test -- --ignored
/// ```

mod common;

use axum::http::StatusCode;
use buildnotburn_shared::{billing::signature::sign, models::user::User};
use common::*;
use serde_json::{json, Value};

async fn choose_plan(ctx: &TestContext, plan: &str) -> Value {
    let (status, body) = send(&ctx.app, post_json("/v1/me/plan", Some(&ctx.auth), &json!({ "plan": plan }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

async fn lay(ctx: &TestContext, text: &str) -> Value {
    let (status, body) = send(&ctx.app, post_json("/v1/bricks", Some(&ctx.auth), &json!({ "text": text }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body
}

#[tokio::test]
#[ignore]
async fn test_register_and_login() {
    let ctx = TestContext::new().await.unwrap();
    let email = format!("mason-{}@example.com", uuid::Uuid::new_v4());

    let (status, body) = send(
        &ctx.app,
        post_json(
            "/v1/auth/register",
            None,
            &json!({ "email": email, "password": "bricks4days", "name": "Mason" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let auth = format!("Bearer {}", body["access_token"].as_str().unwrap());

    let (status, profile) = send(&ctx.app, get("/v1/me", Some(&auth))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["screen"], "paywall");
    assert!(profile["plan"].is_null());

    let (status, _) = send(
        &ctx.app,
        post_json("/v1/auth/login", None, &json!({ "email": email, "password": "wrong-pass1" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &ctx.app,
        post_json("/v1/auth/login", None, &json!({ "email": email, "password": "bricks4days" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");

    let (status, _) = send(
        &ctx.app,
        post_json(
            "/v1/auth/login",
            None,
            &json!({ "email": email.to_uppercase(), "password": "bricks4days" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &ctx.app,
        post_json("/v1/auth/register", None, &json!({ "email": email, "password": "bricks4days" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(&email)
        .execute(&ctx.db)
        .await
        .unwrap();
    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_trial_capacity_and_firebreak() {
    let ctx = TestContext::new().await.unwrap();

    let body = lay(&ctx, "before a plan").await;
    assert_eq!(body["outcome"], "rejected");
    assert_eq!(body["reason"], "plan_required");

    choose_plan(&ctx, "trial").await;

    for text in ["one", "two", "three"] {
        assert_eq!(lay(&ctx, text).await["outcome"], "added");
    }

    let body = lay(&ctx, "four").await;
    assert_eq!(body["outcome"], "rejected");
    assert_eq!(body["reason"], "at_capacity");
    assert_eq!(body["limit"], 3);

    let body = lay(&ctx, "   ").await;
    assert_eq!(body["reason"], "blank_text");

    let (_, profile) = send(&ctx.app, get("/v1/me", Some(&ctx.auth))).await;
    assert_eq!(profile["screen"], "firebreak");
    assert_eq!(profile["active_count"], 3);

    let (status, profile) = send(&ctx.app, post_json("/v1/me/lay-more", Some(&ctx.auth), &json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["capacity"], 4);
    assert_eq!(profile["screen"], "workspace");
    assert_eq!(lay(&ctx, "four").await["outcome"], "added");

    ctx.cleanup().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore]
async fn test_concurrent_adds_respect_capacity() {
    let ctx = TestContext::new().await.unwrap();
    choose_plan(&ctx, "trial").await;

    let requests: Vec<_> = (0..10)
        .map(|n| {
            let app = ctx.app.clone();
            let auth = ctx.auth.clone();
            tokio::spawn(async move {
                let request = post_json("/v1/bricks", Some(&auth), &json!({ "text": format!("brick {n}") }));
                send(&app, request).await
            })
        })
        .collect();

    let mut added = 0;
    for request in requests {
        let (status, body) = request.await.unwrap();
        assert_eq!(status, StatusCode::OK, "{body}");
        if body["outcome"] == "added" {
            added += 1;
        } else {
            assert_eq!(body["reason"], "at_capacity");
        }
    }
    assert_eq!(added, 3);

    let (_, today) = send(&ctx.app, get("/v1/bricks/today", Some(&ctx.auth))).await;
    assert_eq!(today["active_count"], 3);

    let mut positions: Vec<i64> = today["bricks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["position"].as_i64().unwrap())
        .collect();
    positions.dedup();
    assert_eq!(positions.len(), 3);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_complete_burn_and_history() {
    let ctx = TestContext::new().await.unwrap();
    choose_plan(&ctx, "trial").await;

    let first = lay(&ctx, "write tests").await["brick"]["id"].as_str().unwrap().to_string();
    let second = lay(&ctx, "review").await["brick"]["id"].as_str().unwrap().to_string();
    assert_eq!(lay(&ctx, "  ship it ").await["brick"]["text"], "SHIP IT");

    let uri = format!("/v1/bricks/{}/complete", first);
    let (_, body) = send(&ctx.app, post_json(&uri, Some(&ctx.auth), &json!({}))).await;
    assert_eq!(body["outcome"], "completed");
    let (_, body) = send(&ctx.app, post_json(&uri, Some(&ctx.auth), &json!({}))).await;
    assert_eq!(body["outcome"], "already_completed");

    let uri = format!("/v1/bricks/{}/burn", second);
    let (_, body) = send(&ctx.app, post_json(&uri, Some(&ctx.auth), &json!({}))).await;
    assert_eq!(body["outcome"], "burned");
    assert_eq!(body["burned"], true);
    let (_, body) = send(&ctx.app, post_json(&uri, Some(&ctx.auth), &json!({}))).await;
    assert_eq!(body["burned"], false);

    let (_, today) = send(&ctx.app, get("/v1/bricks/today", Some(&ctx.auth))).await;
    assert_eq!(today["active_count"], 1);

    let (_, pile) = send(&ctx.app, get("/v1/bricks/burn-pile", Some(&ctx.auth))).await;
    assert_eq!(pile.as_array().unwrap().len(), 1);
    assert_eq!(pile[0]["id"], second.as_str());

    let (_, history) = send(&ctx.app, get("/v1/bricks", Some(&ctx.auth))).await;
    assert_eq!(history.as_array().unwrap().len(), 3);

    let (_, wall) = send(&ctx.app, get("/v1/wall?days=7", Some(&ctx.auth))).await;
    assert_eq!(wall["days"], 7);
    assert_eq!(wall["total_completed"], 1);

    let (status, _) = send(
        &ctx.app,
        post_json(
            &format!("/v1/bricks/{}/complete", uuid::Uuid::new_v4()),
            Some(&ctx.auth),
            &json!({}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_notes_and_reorder() {
    let ctx = TestContext::new().await.unwrap();
    choose_plan(&ctx, "trial").await;

    let mut ids = Vec::new();
    for text in ["a", "b", "c"] {
        ids.push(lay(&ctx, text).await["brick"]["id"].as_str().unwrap().to_string());
    }

    let (status, body) = send(
        &ctx.app,
        post_json(
            "/v1/bricks/reorder",
            Some(&ctx.auth),
            &json!({ "from_id": ids[2], "to_id": ids[0] }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["order"], json!([ids[2], ids[0], ids[1]]));

    let (_, today) = send(&ctx.app, get("/v1/bricks/today", Some(&ctx.auth))).await;
    assert_eq!(today["bricks"][0]["id"], ids[2].as_str());

    let uri = format!("/v1/bricks/{}/notes", ids[0]);
    let (status, brick) = send(
        &ctx.app,
        send_json("PUT", &uri, Some(&ctx.auth), &json!({ "notes": "  outline first  " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(brick["notes"], "outline first");

    let (_, brick) = send(&ctx.app, send_json("PUT", &uri, Some(&ctx.auth), &json!({ "notes": null }))).await;
    assert!(brick["notes"].is_null());

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_analytics_gated_by_plan() {
    let ctx = TestContext::new().await.unwrap();
    choose_plan(&ctx, "trial").await;

    let (status, body) = send(&ctx.app, get("/v1/analytics", Some(&ctx.auth))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("Upgrade"));

    choose_plan(&ctx, "builder").await;
    let (status, body) = send(&ctx.app, get("/v1/analytics", Some(&ctx.auth))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["daily_productivity"].as_array().unwrap().len(), 7);

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_builder_audit_sets_capacity() {
    let ctx = TestContext::new().await.unwrap();

    let profile = choose_plan(&ctx, "builder").await;
    assert_eq!(profile["screen"], "audit");
    assert_eq!(lay(&ctx, "too early").await["reason"], "audit_required");

    let (status, profile) = send(
        &ctx.app,
        post_json(
            "/v1/me/audit",
            Some(&ctx.auth),
            &json!({ "sleep_hours": 3, "meetings": 8, "dread": 10 }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["capacity"], 1);
    assert_eq!(profile["energy_level"], "low");

    assert_eq!(lay(&ctx, "one thing").await["outcome"], "added");
    assert_eq!(lay(&ctx, "another").await["reason"], "at_capacity");

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_lemonsqueezy_webhook_upgrades_user() {
    let ctx = TestContext::new().await.unwrap();
    choose_plan(&ctx, "trial").await;

    let body = json!({
        "meta": {
            "event_name": "subscription_created",
            "custom_data": { "user_id": ctx.user.id.to_string(), "plan": "architect" }
        },
        "data": { "attributes": { "status": "active", "customer_id": 4242 } }
    })
    .to_string()
    .into_bytes();
    let signature = sign(LEMONSQUEEZY_WEBHOOK_SECRET, &body).unwrap();

    let (status, reply) = send(&ctx.app, post_raw("/webhooks/lemonsqueezy", &[("x-signature", &signature)], &body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["received"], true);

    let user = User::find_by_id(&ctx.db, ctx.user.id).await.unwrap().unwrap();
    assert_eq!(user.plan.as_deref(), Some("architect"));
    assert_eq!(user.lemonsqueezy_customer_id.as_deref(), Some("4242"));
    assert_eq!(user.subscription_status.as_deref(), Some("active"));

    ctx.cleanup().await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_webhook_for_unknown_user_changes_nothing() {
    let ctx = TestContext::new().await.unwrap();

    let body = json!({
        "meta": {
            "event_name": "subscription_created",
            "custom_data": { "user_id": uuid::Uuid::new_v4().to_string() }
        }
    })
    .to_string()
    .into_bytes();
    let signature = sign(LEMONSQUEEZY_WEBHOOK_SECRET, &body).unwrap();

    let (status, _) = send(&ctx.app, post_raw("/webhooks/lemonsqueezy", &[("x-signature", &signature)], &body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let user = User::find_by_id(&ctx.db, ctx.user.id).await.unwrap().unwrap();
    assert!(user.plan.is_none());

    ctx.cleanup().await.unwrap();
}
