use axum::{
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{
    config::Config,
    db::ProfileStore,
    middleware::request_id::{make_span_with_request_id, request_id_middleware},
    services::{ContentCatalog, DeckBuilder, MatchFinder},
};

pub mod browse;
pub mod friends;
pub mod matches;
pub mod profiles;

/// Shared application state
pub struct AppState {
    pub store: Arc<dyn ProfileStore>,
    pub match_finder: MatchFinder,
    pub deck_builder: DeckBuilder,
    /// Cap on concurrent profile loads when listing friends and requests
    pub concurrency: usize,
}

impl AppState {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        catalog: Arc<dyn ContentCatalog>,
        concurrency: usize,
    ) -> Self {
        Self {
            match_finder: MatchFinder::new(store.clone(), catalog.clone(), concurrency),
            deck_builder: DeckBuilder::new(store.clone(), catalog, concurrency),
            store,
            concurrency,
        }
    }

    pub fn from_config(
        config: &Config,
        store: Arc<dyn ProfileStore>,
        catalog: Arc<dyn ContentCatalog>,
    ) -> Self {
        Self::new(store, catalog, config.match_concurrency)
    }
}

/// Creates the application router with all routes
///
/// The request ID layer is outermost so the trace span can see the ID.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(make_span_with_request_id))
        .layer(middleware::from_fn(request_id_middleware))
}

/// API routes under /api/v1
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(profiles::register))
        .route("/users/search", get(profiles::search))
        .route("/users/:user_id", get(profiles::get_user))
        .route("/me", get(profiles::me).delete(profiles::delete_account))
        .route("/me/profile-picture", put(profiles::set_profile_picture))
        .route("/me/swipes", post(profiles::record_swipe))
        .route("/me/friends", get(friends::list))
        .route("/me/friends/:friend_id", delete(friends::remove))
        .route("/me/friend-requests", post(friends::send))
        .route("/me/friend-requests/incoming", get(friends::incoming))
        .route("/me/friend-requests/outgoing", get(friends::outgoing))
        .route("/me/friend-requests/:sender_id/accept", post(friends::accept))
        .route("/me/friend-requests/:sender_id/decline", post(friends::decline))
        .route("/me/matches/:kind", get(matches::find))
        .route("/browse/:kind", get(browse::deck))
}

/// Health check endpoint
async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}
