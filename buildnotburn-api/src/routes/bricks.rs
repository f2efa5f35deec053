/// Brick endpoints
///
/// ```text
/// GET  /v1/bricks                 full history, oldest first
/// GET  /v1/bricks/today           today's list with capacity
/// GET  /v1/bricks/burn-pile       deferred bricks, newest first
/// POST /v1/bricks                 lay a brick
/// POST /v1/bricks/:id/complete
/// POST /v1/bricks/:id/burn
/// PUT  /v1/bricks/:id/notes
/// POST /v1/bricks/reorder
/// GET  /v1/bricks/stream          SSE: snapshot, then live changes
/// ```
///
/// A refused add (blank text, full capacity, no plan or audit) is an
/// ordinary `200` with `"outcome": "rejected"` and a toast-ready message.
/// Ids that do not belong to the caller are `404`.

use super::{profile::current_user, today};
use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    Extension, Json,
};
use buildnotburn_shared::{
    auth::middleware::AuthContext,
    build_list::{self, BuildList, BurnOutcome, Completion, Rejection},
    feed::{BrickChange, Subscription},
    models::{
        brick::Brick,
        user::{Plan, User},
    },
};
use chrono::NaiveDate;
use futures::stream::{self, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, time::Duration};
use uuid::Uuid;
use validator::Validate;

/// SSE keep-alive interval
pub const KEEP_ALIVE_SECS: u64 = 25;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBrickRequest {
    #[validate(length(max = 500, message = "Brick text must be at most 500 characters"))]
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SaveNotesRequest {
    #[validate(length(max = 10000, message = "Notes must be at most 10000 characters"))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    pub from_id: Uuid,
    pub to_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CreateOutcome {
    Added {
        brick: Brick,
    },
    Rejected {
        #[serde(flatten)]
        rejection: Rejection,
        message: String,
    },
}

impl From<Rejection> for CreateOutcome {
    fn from(rejection: Rejection) -> Self {
        CreateOutcome::Rejected {
            message: rejection.to_string(),
            rejection,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub outcome: Completion,
    pub brick: Brick,
}

#[derive(Debug, Serialize)]
pub struct BurnResponse {
    pub outcome: BurnOutcome,

    /// True when the brick actually moved to the burn pile
    pub burned: bool,
    pub brick: Brick,
}

#[derive(Debug, Serialize)]
pub struct TodayResponse {
    pub date: NaiveDate,

    /// `null` when unlimited
    pub capacity: Option<u32>,
    pub active_count: usize,

    /// Active and completed bricks dated today, in display order
    pub bricks: Vec<Brick>,
}

#[derive(Debug, Serialize)]
pub struct ReorderResponse {
    pub order: Vec<Uuid>,
}

async fn owned_brick(state: &AppState, id: Uuid, user_id: Uuid) -> ApiResult<Brick> {
    Brick::find_by_id_and_user(&state.db, id, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Brick not found".to_string()))
}

async fn save(state: &AppState, brick: &Brick) -> ApiResult<Brick> {
    Brick::update(&state.db, brick)
        .await?
        .ok_or_else(|| ApiError::NotFound("Brick not found".to_string()))
}

pub async fn list_history(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Brick>>> {
    Ok(Json(Brick::list_by_user(&state.db, auth.user_id).await?))
}

pub async fn list_today(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<TodayResponse>> {
    let user = current_user(&state, &auth).await?;
    let today = today();
    let list = BuildList::new(today, Brick::list_for_day(&state.db, user.id, today).await?);

    Ok(Json(TodayResponse {
        date: today,
        capacity: user.capacity_on(today).limit(),
        active_count: list.active_count(),
        bricks: list.bricks().to_vec(),
    }))
}

pub async fn list_burn_pile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Brick>>> {
    Ok(Json(Brick::list_burn_pile(&state.db, auth.user_id, today()).await?))
}

/// Lay a new brick on today's list
pub async fn create_brick(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateBrickRequest>,
) -> ApiResult<Json<CreateOutcome>> {
    req.validate()?;

    // The owner row stays locked until commit, so concurrent adds see each
    // other's bricks when they count today's list.
    let mut tx = state.db.begin().await?;
    let user = User::lock_for_update(&mut *tx, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let today = today();

    let gate = match user.plan() {
        None => Some(Rejection::PlanRequired),
        Some(Plan::Builder) if user.audit_for(today).is_none() => Some(Rejection::AuditRequired),
        _ => None,
    };
    if let Some(rejection) = gate {
        tracing::debug!(user_id = %user.id, reason = %rejection, "Brick rejected");
        return Ok(Json(rejection.into()));
    }

    let mut list = BuildList::new(today, Brick::list_for_day(&mut *tx, user.id, today).await?);

    let brick = match list.add(user.id, &req.text, user.capacity_on(today)) {
        Ok(brick) => brick,
        Err(rejection) => {
            tracing::debug!(user_id = %user.id, reason = %rejection, "Brick rejected");
            return Ok(Json(rejection.into()));
        }
    };

    let brick = Brick::insert(&mut *tx, &brick).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, brick_id = %brick.id, "Brick laid");
    state.feed.publish(user.id, BrickChange::Added { brick: brick.clone() });

    Ok(Json(CreateOutcome::Added { brick }))
}

/// Mark a brick complete; completing twice changes nothing
pub async fn complete_brick(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<CompleteResponse>> {
    let mut brick = owned_brick(&state, id, auth.user_id).await?;

    let outcome = build_list::complete(&mut brick, today());
    if outcome == Completion::Completed {
        brick = save(&state, &brick).await?;

        tracing::info!(user_id = %auth.user_id, brick_id = %brick.id, "Brick completed");
        state.feed.publish(auth.user_id, BrickChange::Completed { brick: brick.clone() });
    }

    Ok(Json(CompleteResponse { outcome, brick }))
}

/// Move an active brick to the burn pile
pub async fn burn_brick(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<BurnResponse>> {
    let mut brick = owned_brick(&state, id, auth.user_id).await?;

    let outcome = build_list::burn(&mut brick, today());
    let burned = outcome == BurnOutcome::Burned;
    if burned {
        brick = save(&state, &brick).await?;

        tracing::info!(user_id = %auth.user_id, brick_id = %brick.id, "Brick burned");
        state.feed.publish(auth.user_id, BrickChange::Burned { brick: brick.clone() });
    }

    Ok(Json(BurnResponse { outcome, burned, brick }))
}

/// Set or clear a brick's notes
pub async fn save_notes(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<SaveNotesRequest>,
) -> ApiResult<Json<Brick>> {
    req.validate()?;

    let mut brick = owned_brick(&state, id, auth.user_id).await?;
    build_list::set_notes(&mut brick, req.notes.as_deref());
    let brick = save(&state, &brick).await?;

    tracing::debug!(user_id = %auth.user_id, brick_id = %brick.id, "Brick notes saved");
    state.feed.publish(auth.user_id, BrickChange::NotesUpdated { brick: brick.clone() });

    Ok(Json(brick))
}

/// Move `from_id` to the slot of `to_id` on today's list
pub async fn reorder_bricks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<ReorderRequest>,
) -> ApiResult<Json<ReorderResponse>> {
    let today = today();
    let mut list = BuildList::new(today, Brick::list_for_day(&state.db, auth.user_id, today).await?);

    let positions = list
        .reorder(req.from_id, req.to_id)
        .ok_or_else(|| ApiError::NotFound("Brick not on today's list".to_string()))?;

    Brick::update_positions(&state.db, auth.user_id, &positions).await?;

    let order: Vec<Uuid> = list.active().map(|b| b.id).collect();

    tracing::debug!(user_id = %auth.user_id, count = order.len(), "Bricks reordered");
    state.feed.publish(auth.user_id, BrickChange::Reordered { order: order.clone() });

    Ok(Json(ReorderResponse { order }))
}

fn change_event(change: &BrickChange) -> Event {
    Event::default()
        .event("change")
        .json_data(change)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, kind = change.kind(), "Failed to encode brick change");
            Event::default().comment("dropped change")
        })
}

fn live_changes(subscription: Subscription) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(subscription, |mut subscription| async move {
        let change = subscription.recv().await?;
        Some((Ok(change_event(&change)), subscription))
    })
}

/// Stream today's bricks and every later change
///
/// The first event is `snapshot` with today's active bricks; each change
/// after that arrives as a `change` event. The subscription is taken
/// before the snapshot is read, so nothing published in between is lost.
/// Closing the connection drops the subscription.
pub async fn stream_bricks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let subscription = state.feed.subscribe(auth.user_id);

    let today = today();
    let list = BuildList::new(today, Brick::list_for_day(&state.db, auth.user_id, today).await?);
    let active: Vec<&Brick> = list.active().collect();

    let snapshot = Event::default()
        .event("snapshot")
        .json_data(&active)
        .map_err(|e| ApiError::InternalError(format!("Failed to encode snapshot: {}", e)))?;

    tracing::debug!(user_id = %auth.user_id, active = active.len(), "Brick stream opened");

    let events = stream::once(async move { Ok::<_, Infallible>(snapshot) }).chain(live_changes(subscription));

    Ok(Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(KEEP_ALIVE_SECS))))
}
