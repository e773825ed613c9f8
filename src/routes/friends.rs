use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{FriendRequest, ProfileSummary},
    routes::AppState,
    services::friends::{self, SendRequestBody},
    session::Session,
};

pub async fn list(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> AppResult<Json<Vec<ProfileSummary>>> {
    let friends = friends::list_friends(state.store.as_ref(), &session, state.concurrency).await?;
    Ok(Json(friends))
}

pub async fn remove(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(friend_id): Path<String>,
) -> AppResult<StatusCode> {
    friends::remove_friend(state.store.as_ref(), &session, &friend_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn send(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(body): Json<SendRequestBody>,
) -> AppResult<(StatusCode, Json<FriendRequest>)> {
    let request =
        friends::send_request(state.store.as_ref(), &session, &body.receiver_user_id).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn incoming(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> AppResult<Json<Vec<ProfileSummary>>> {
    let senders =
        friends::incoming_requests(state.store.as_ref(), &session, state.concurrency).await?;
    Ok(Json(senders))
}

pub async fn outgoing(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> AppResult<Json<Vec<ProfileSummary>>> {
    let receivers =
        friends::outgoing_requests(state.store.as_ref(), &session, state.concurrency).await?;
    Ok(Json(receivers))
}

pub async fn accept(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(sender_id): Path<String>,
) -> AppResult<StatusCode> {
    friends::accept_request(state.store.as_ref(), &session, &sender_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn decline(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(sender_id): Path<String>,
) -> AppResult<StatusCode> {
    friends::decline_request(state.store.as_ref(), &session, &sender_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
