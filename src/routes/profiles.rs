use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{ItemId, MediaKind, ProfileSummary, UserProfile, Verdict},
    routes::AppState,
    services::{friends, profiles, profiles::RegisterRequest},
    session::Session,
};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    username: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfilePictureBody {
    url: String,
}

#[derive(Debug, Deserialize)]
pub struct SwipeBody {
    kind: MediaKind,
    item_id: ItemId,
    verdict: Verdict,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    session: Session,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<UserProfile>)> {
    tracing::info!(
        request_id = %request_id,
        user_id = %session.user_id,
        "Processing registration"
    );

    let profile = profiles::register(state.store.as_ref(), &session, request).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

/// Another user's public summary
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Path(user_id): Path<String>,
) -> AppResult<Json<ProfileSummary>> {
    let profile = profiles::get_profile(state.store.as_ref(), &user_id).await?;
    Ok(Json(ProfileSummary::from(&profile)))
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    _session: Session,
    Query(params): Query<SearchQuery>,
) -> AppResult<Json<ProfileSummary>> {
    let summary = friends::search_by_username(state.store.as_ref(), &params.username).await?;
    Ok(Json(summary))
}

pub async fn me(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> AppResult<Json<UserProfile>> {
    let profile = profiles::get_profile(state.store.as_ref(), &session.user_id).await?;
    Ok(Json(profile))
}

pub async fn set_profile_picture(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(body): Json<ProfilePictureBody>,
) -> AppResult<Json<UserProfile>> {
    let profile = profiles::set_profile_picture(state.store.as_ref(), &session, &body.url).await?;
    Ok(Json(profile))
}

pub async fn delete_account(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    session: Session,
) -> AppResult<StatusCode> {
    tracing::info!(
        request_id = %request_id,
        user_id = %session.user_id,
        "Processing account deletion"
    );

    profiles::delete_account(state.store.as_ref(), &session).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn record_swipe(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(body): Json<SwipeBody>,
) -> AppResult<Json<UserProfile>> {
    let profile = profiles::record_swipe(
        state.store.as_ref(),
        &session,
        body.kind,
        body.item_id,
        body.verdict,
    )
    .await?;
    Ok(Json(profile))
}
