use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{MatchReport, MediaKind},
    routes::AppState,
    session::Session,
};

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    /// Restrict to items this friend liked
    #[serde(default)]
    with: Option<String>,
}

/// Handler for the match endpoint
pub async fn find(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    session: Session,
    Path(kind): Path<String>,
    Query(params): Query<MatchQuery>,
) -> AppResult<Json<MatchReport>> {
    let kind: MediaKind = kind.parse()?;
    let with_friend = params.with.as_deref().map(str::trim).filter(|s| !s.is_empty());

    tracing::info!(
        request_id = %request_id,
        user_id = %session.user_id,
        kind = %kind,
        with_friend = ?with_friend,
        "Processing match request"
    );

    let report = state
        .match_finder
        .find_matches(&session, kind, with_friend)
        .await?;

    tracing::info!(
        request_id = %request_id,
        matches = report.matches.len(),
        "Match request completed"
    );

    Ok(Json(report))
}
