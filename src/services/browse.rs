use std::collections::HashSet;
use std::sync::Arc;

use tracing::instrument;

use crate::{
    db::ProfileStore,
    error::AppResult,
    models::{DiscoverQuery, ItemId, ItemMetadata, MediaKind},
    services::{catalog::ContentCatalog, fanout::fan_out},
    session::Session,
};

/// Builds decks of swipeable cards from the catalog's discover feed
#[derive(Clone)]
pub struct DeckBuilder {
    store: Arc<dyn ProfileStore>,
    catalog: Arc<dyn ContentCatalog>,
    concurrency: usize,
}

impl DeckBuilder {
    pub fn new(
        store: Arc<dyn ProfileStore>,
        catalog: Arc<dyn ContentCatalog>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            catalog,
            concurrency: concurrency.max(1),
        }
    }

    /// One page of cards the caller has not swiped yet, in discover order
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn deck(
        &self,
        session: &Session,
        kind: MediaKind,
        query: &DiscoverQuery,
    ) -> AppResult<Vec<ItemMetadata>> {
        let (profile, discovered) = tokio::join!(
            self.store.get_profile(&session.user_id),
            self.catalog.discover(kind, query)
        );
        let profile = profile?;
        let discovered = discovered?;

        let seen: HashSet<ItemId> = profile
            .liked(kind)
            .iter()
            .chain(profile.disliked(kind))
            .copied()
            .collect();
        let unseen: Vec<ItemId> = discovered
            .into_iter()
            .filter(|id| !seen.contains(id))
            .collect();

        let mut cards = fan_out(
            unseen.iter().copied().enumerate(),
            self.concurrency,
            |(index, item_id)| async move {
                (index, item_id, self.catalog.item_metadata(kind, item_id).await)
            },
        )
        .await;
        cards.sort_by_key(|(index, _, _)| *index);

        let cards: Vec<ItemMetadata> = cards
            .into_iter()
            .filter_map(|(_, item_id, result)| match result {
                Ok(card) => Some(card),
                Err(e) => {
                    tracing::warn!(
                        item_id = %item_id,
                        catalog = self.catalog.name(),
                        error = %e,
                        "Dropping card without metadata"
                    );
                    None
                }
            })
            .collect();

        tracing::info!(
            kind = %kind,
            page = query.page,
            unseen = unseen.len(),
            cards = cards.len(),
            "Deck built"
        );

        Ok(cards)
    }
}
