//! Content catalog abstraction
//!
//! The catalog is the external source of movie and TV metadata. Match results
//! and browse decks are enriched through it; the profile store only ever holds
//! catalog IDs.
use crate::{
    error::AppResult,
    models::{DiscoverQuery, ItemId, ItemMetadata, MediaKind, TmdbItemDetails},
};

pub mod tmdb;

pub use tmdb::TmdbCatalog;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ContentCatalog: Send + Sync {
    /// Raw details of one item; `NotFound` if the catalog does not know it
    async fn item_details(&self, kind: MediaKind, item_id: ItemId) -> AppResult<TmdbItemDetails>;

    /// Age rating of one item in the configured region, if it has one
    async fn certification(&self, kind: MediaKind, item_id: ItemId) -> AppResult<Option<String>>;

    /// IDs on one page of the discover feed, most popular first
    async fn discover(&self, kind: MediaKind, query: &DiscoverQuery) -> AppResult<Vec<ItemId>>;

    /// Display-ready metadata for one item
    ///
    /// Details and certification are fetched concurrently. A failed
    /// certification lookup only costs the age rating; a failed details lookup
    /// fails the item.
    async fn item_metadata(&self, kind: MediaKind, item_id: ItemId) -> AppResult<ItemMetadata> {
        let (details, certification) = tokio::join!(
            self.item_details(kind, item_id),
            self.certification(kind, item_id)
        );

        let details = details?;
        let certification = certification.unwrap_or_else(|e| {
            tracing::warn!(
                error = %e,
                kind = %kind,
                item_id = %item_id,
                "Certification lookup failed, using placeholder"
            );
            None
        });

        Ok(ItemMetadata::from_details(kind, details, certification))
    }

    /// Catalog name for logging and debugging
    fn name(&self) -> &'static str;
}
