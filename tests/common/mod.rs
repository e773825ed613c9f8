#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use media_match::{
    db::{MemoryProfileStore, ProfileStore},
    error::{AppError, AppResult},
    models::{DiscoverQuery, ItemId, MediaKind, TmdbItemDetails},
    routes::{create_router, AppState},
    services::ContentCatalog,
    session::USER_ID_HEADER,
};

/// Item IDs the stub catalog fails on
pub const BROKEN_ITEM: i64 = 999;

/// Catalog serving canned details, no network
pub struct StubCatalog {
    titles: HashMap<(MediaKind, i64), &'static str>,
    discover: Vec<ItemId>,
}

impl StubCatalog {
    pub fn new() -> Self {
        let titles = HashMap::from([
            ((MediaKind::Movie, 101), "Alien"),
            ((MediaKind::Movie, 202), "Heat"),
            ((MediaKind::Movie, 303), "Ran"),
            ((MediaKind::Movie, 404), "Up"),
            ((MediaKind::Tv, 1396), "Breaking Bad"),
        ]);

        Self {
            titles,
            discover: vec![ItemId(101), ItemId(202), ItemId(303), ItemId(BROKEN_ITEM), ItemId(404)],
        }
    }
}

#[async_trait::async_trait]
impl ContentCatalog for StubCatalog {
    async fn item_details(&self, kind: MediaKind, item_id: ItemId) -> AppResult<TmdbItemDetails> {
        if item_id.0 == BROKEN_ITEM {
            return Err(AppError::ExternalApi("TMDB API returned status 500".into()));
        }

        let title = self.titles.get(&(kind, item_id.0)).map(|t| t.to_string());
        let (title, name) = match kind {
            MediaKind::Movie => (title, None),
            MediaKind::Tv => (None, title),
        };

        Ok(TmdbItemDetails {
            id: item_id.0,
            title,
            name,
            overview: Some(format!("Overview of {}", item_id)),
            poster_path: Some(format!("/{}.jpg", item_id)),
            vote_average: Some(7.5),
            release_date: Some("1995-12-15".to_string()),
            first_air_date: Some("2008-01-20".to_string()),
        })
    }

    async fn certification(&self, _kind: MediaKind, item_id: ItemId) -> AppResult<Option<String>> {
        if item_id.0 == 303 {
            return Err(AppError::ExternalApi("certification lookup timed out".into()));
        }
        Ok(Some("15".to_string()))
    }

    async fn discover(&self, _kind: MediaKind, _query: &DiscoverQuery) -> AppResult<Vec<ItemId>> {
        Ok(self.discover.clone())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

pub fn create_state() -> (Arc<AppState>, Arc<MemoryProfileStore>) {
    let store = Arc::new(MemoryProfileStore::new());
    let state = Arc::new(AppState::new(
        store.clone() as Arc<dyn ProfileStore>,
        Arc::new(StubCatalog::new()),
        4,
    ));
    (state, store)
}

pub fn create_test_server() -> (TestServer, Arc<MemoryProfileStore>) {
    let (state, store) = create_state();
    let server = TestServer::new(create_router(state)).unwrap();
    (server, store)
}

pub fn user_header(user_id: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(USER_ID_HEADER),
        HeaderValue::from_str(user_id).unwrap(),
    )
}
