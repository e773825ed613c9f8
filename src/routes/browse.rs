use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{DiscoverQuery, ItemMetadata, MediaKind},
    routes::AppState,
    session::Session,
};

/// Handler for the swipe deck
pub async fn deck(
    State(state): State<Arc<AppState>>,
    session: Session,
    Path(kind): Path<String>,
    Query(query): Query<DiscoverQuery>,
) -> AppResult<Json<Vec<ItemMetadata>>> {
    let kind: MediaKind = kind.parse()?;
    let cards = state.deck_builder.deck(&session, kind, &query).await?;
    Ok(Json(cards))
}
