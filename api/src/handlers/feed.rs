//! Feed session handlers
//!
//! Endpoints the article page uses to drive its continuous feed: open a
//! session on the landing article, fire the viewport trigger, and report
//! which article is on screen.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::app::{AdvanceOutcome, FeedController, FeedSnapshot, SessionId};
use crate::domain::entities::{AddressBarUpdate, ArticleBounds, Slug};
use crate::domain::ports::ContentSource;
use crate::error::AppError;
use crate::AppState;

/// Request body for POST /feed/sessions
#[derive(Deserialize)]
pub struct OpenSessionRequest {
    pub slug: String,
}

/// Feed state plus what the page needs to place the viewport trigger
#[derive(Serialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
    #[serde(flatten)]
    pub feed: FeedSnapshot,
    pub prefetch_margin_px: u32,
}

#[derive(Serialize)]
pub struct AdvanceResponse {
    pub outcome: AdvanceOutcome,
    pub snapshot: SessionResponse,
}

/// One rendered article's position relative to the viewport
#[derive(Deserialize)]
pub struct RenderedArticle {
    pub slug: String,
    pub top: f64,
    pub bottom: f64,
}

/// Request body for POST /feed/sessions/:id/visibility
#[derive(Deserialize)]
pub struct VisibilityRequest {
    pub viewport_height: f64,
    #[serde(default)]
    pub articles: Vec<RenderedArticle>,
}

#[derive(Serialize)]
pub struct VisibilityResponse {
    pub update: Option<AddressBarUpdate>,
}

async fn session_response(
    id: SessionId,
    controller: &FeedController<dyn ContentSource>,
) -> SessionResponse {
    SessionResponse {
        session_id: id,
        feed: controller.snapshot().await,
        prefetch_margin_px: controller.settings().prefetch_margin_px,
    }
}

/// POST /feed/sessions
///
/// Open a feed on the article the reader landed on.
pub async fn open_session(
    State(state): State<AppState>,
    Json(body): Json<OpenSessionRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), AppError> {
    let slug = Slug::parse(&body.slug)?;
    let (id, controller) = state.feed_sessions.open(&slug).await?;

    Ok((
        StatusCode::CREATED,
        Json(session_response(id, &controller).await),
    ))
}

/// GET /feed/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let id = SessionId::from(id);
    let controller = state.feed_sessions.get(id).await?;
    Ok(Json(session_response(id, &controller).await))
}

/// DELETE /feed/sessions/:id
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.feed_sessions.close(SessionId::from(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /feed/sessions/:id/advance
///
/// The reader scrolled near the end of the feed.
pub async fn advance_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AdvanceResponse>, AppError> {
    let id = SessionId::from(id);
    let controller = state.feed_sessions.get(id).await?;
    let outcome = controller.on_viewport_trigger().await;

    Ok(Json(AdvanceResponse {
        outcome,
        snapshot: session_response(id, &controller).await,
    }))
}

/// POST /feed/sessions/:id/visibility
///
/// Report rendered article positions; answers with the address bar change,
/// if any.
pub async fn report_visibility(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<VisibilityRequest>,
) -> Result<Json<VisibilityResponse>, AppError> {
    let controller = state.feed_sessions.get(SessionId::from(id)).await?;

    let bounds = body
        .articles
        .into_iter()
        .map(|a| {
            Ok(ArticleBounds {
                slug: Slug::parse(&a.slug)?,
                top: a.top,
                bottom: a.bottom,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let update = controller
        .track_visibility(body.viewport_height, &bounds)
        .await;
    Ok(Json(VisibilityResponse { update }))
}
