//! TMDB catalog client
//!
//! Serves item details, regional certifications and discover pages from TMDB's
//! v3 API. Every response is cached through Redis when caching is enabled.
//!
//! API Flow:
//! 1. Details: /movie/{id} or /tv/{id}
//! 2. Certification: /movie/{id}/release_dates (movies) or /tv/{id}/content_ratings (TV)
//! 3. Browse: /discover/movie or /discover/tv, popularity descending
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{
        item::non_empty, DiscoverQuery, ItemId, MediaKind, TmdbContentRatings, TmdbDiscoverPage,
        TmdbItemDetails, TmdbReleaseDates,
    },
    services::catalog::ContentCatalog,
};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const DETAILS_CACHE_TTL: u64 = 86400; // 1 day
const CERTIFICATION_CACHE_TTL: u64 = 86400; // 1 day
const DISCOVER_CACHE_TTL: u64 = 3600; // 1 hour

#[derive(Clone)]
pub struct TmdbCatalog {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    language: String,
    /// ISO 3166-1 code whose certification is reported
    region: String,
    cache: Cache,
}

impl TmdbCatalog {
    pub fn new(
        cache: Cache,
        api_key: String,
        api_url: String,
        language: String,
        region: String,
        timeout: Duration,
    ) -> AppResult<Self> {
        let http_client = HttpClient::builder().timeout(timeout).build()?;

        tracing::info!(
            api_url = %api_url,
            region = %region,
            caching = cache.is_enabled(),
            "TMDB catalog configured"
        );

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            language,
            region,
            cache,
        })
    }

    /// Issues a GET against `path` and decodes the JSON body
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}/{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!("TMDB resource {}", path)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                path = %path,
                status = %status,
                body = %body,
                "TMDB request failed"
            );
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let response_text = response.text().await?;
        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                path = %path,
                response = %response_text,
                "Failed to deserialize TMDB response"
            );
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        })
    }

    async fn fetch_certification(
        &self,
        kind: MediaKind,
        item_id: ItemId,
    ) -> AppResult<Option<String>> {
        let certification = match kind {
            MediaKind::Movie => {
                let path = format!("movie/{}/release_dates", item_id);
                let dates: TmdbReleaseDates = self.get_json(&path, &[]).await?;
                movie_certification(&dates, &self.region)
            }
            MediaKind::Tv => {
                let path = format!("tv/{}/content_ratings", item_id);
                let ratings: TmdbContentRatings = self.get_json(&path, &[]).await?;
                tv_rating(&ratings, &self.region)
            }
        };

        tracing::debug!(
            kind = %kind,
            item_id = %item_id,
            region = %self.region,
            certification = ?certification,
            "Certification fetched"
        );

        Ok(certification)
    }
}

/// First non-empty certification among the region's release dates
fn movie_certification(dates: &TmdbReleaseDates, region: &str) -> Option<String> {
    dates
        .results
        .iter()
        .find(|r| r.iso_3166_1.eq_ignore_ascii_case(region))?
        .release_dates
        .iter()
        .find_map(|d| non_empty(d.certification.clone()))
}

fn tv_rating(ratings: &TmdbContentRatings, region: &str) -> Option<String> {
    ratings
        .results
        .iter()
        .filter(|r| r.iso_3166_1.eq_ignore_ascii_case(region))
        .find_map(|r| non_empty(r.rating.clone()))
}

/// Query parameters for a discover request
fn discover_params(query: &DiscoverQuery) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("sort_by", "popularity.desc".to_string()),
        ("page", query.page.max(1).to_string()),
    ];

    if let Some(genres) = query.genres.as_ref().filter(|g| !g.is_empty()) {
        params.push(("with_genres", genres.clone()));
    }
    if let Some(provider) = query.provider.as_ref().filter(|p| !p.is_empty()) {
        params.push(("with_watch_providers", provider.clone()));
    }
    if let Some(region) = query.region.as_ref().filter(|r| !r.is_empty()) {
        params.push(("watch_region", region.clone()));
    }

    params
}

#[async_trait::async_trait]
impl ContentCatalog for TmdbCatalog {
    async fn item_details(&self, kind: MediaKind, item_id: ItemId) -> AppResult<TmdbItemDetails> {
        cached!(
            self.cache,
            CacheKey::ItemDetails(kind, item_id),
            DETAILS_CACHE_TTL,
            async move {
                let path = format!("{}/{}", kind.path_segment(), item_id);
                let details: TmdbItemDetails = self.get_json(&path, &[]).await?;

                tracing::info!(
                    kind = %kind,
                    item_id = %item_id,
                    catalog = "tmdb",
                    "Item details fetched"
                );

                Ok::<_, AppError>(details)
            }
        )
    }

    async fn certification(&self, kind: MediaKind, item_id: ItemId) -> AppResult<Option<String>> {
        cached!(
            self.cache,
            CacheKey::Certification(kind, item_id, self.region.clone()),
            CERTIFICATION_CACHE_TTL,
            self.fetch_certification(kind, item_id)
        )
    }

    async fn discover(&self, kind: MediaKind, query: &DiscoverQuery) -> AppResult<Vec<ItemId>> {
        cached!(
            self.cache,
            CacheKey::Discover(kind, query.cache_fragment()),
            DISCOVER_CACHE_TTL,
            async move {
                let path = format!("discover/{}", kind.path_segment());
                let page: TmdbDiscoverPage = self.get_json(&path, &discover_params(query)).await?;

                let ids: Vec<ItemId> = page.results.iter().map(|r| ItemId(r.id)).collect();

                tracing::info!(
                    kind = %kind,
                    page = page.page,
                    results = ids.len(),
                    catalog = "tmdb",
                    "Discover page fetched"
                );

                Ok::<_, AppError>(ids)
            }
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn release_dates(json: &str) -> TmdbReleaseDates {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_movie_certification_picks_region() {
        let dates = release_dates(
            r#"{
                "id": 27205,
                "results": [
                    {"iso_3166_1": "US", "release_dates": [{"certification": "PG-13", "type": 3}]},
                    {"iso_3166_1": "GB", "release_dates": [{"certification": "12A", "type": 3}]}
                ]
            }"#,
        );

        assert_eq!(movie_certification(&dates, "GB"), Some("12A".to_string()));
        assert_eq!(movie_certification(&dates, "us"), Some("PG-13".to_string()));
    }

    #[test]
    fn test_movie_certification_skips_blank_entries() {
        let dates = release_dates(
            r#"{
                "results": [
                    {"iso_3166_1": "GB", "release_dates": [
                        {"certification": "", "type": 1},
                        {"certification": "15", "type": 3}
                    ]}
                ]
            }"#,
        );

        assert_eq!(movie_certification(&dates, "GB"), Some("15".to_string()));
    }

    #[test]
    fn test_movie_certification_missing_region() {
        let dates = release_dates(
            r#"{"results": [{"iso_3166_1": "FR", "release_dates": [{"certification": "U"}]}]}"#,
        );
        assert_eq!(movie_certification(&dates, "GB"), None);
    }

    #[test]
    fn test_tv_rating_picks_region() {
        let ratings: TmdbContentRatings = serde_json::from_str(
            r#"{
                "results": [
                    {"iso_3166_1": "US", "rating": "TV-MA"},
                    {"iso_3166_1": "GB", "rating": "18"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(tv_rating(&ratings, "GB"), Some("18".to_string()));
        assert_eq!(tv_rating(&ratings, "DE"), None);
    }

    #[test]
    fn test_discover_params_defaults() {
        let params = discover_params(&DiscoverQuery::page(2));
        assert_eq!(
            params,
            vec![
                ("sort_by", "popularity.desc".to_string()),
                ("page", "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_discover_params_filters() {
        let query = DiscoverQuery {
            page: 0,
            genres: Some("28".into()),
            provider: Some("8".into()),
            region: Some("GB".into()),
        };

        let params = discover_params(&query);
        assert!(params.contains(&("page", "1".to_string())));
        assert!(params.contains(&("with_genres", "28".to_string())));
        assert!(params.contains(&("with_watch_providers", "8".to_string())));
        assert!(params.contains(&("watch_region", "GB".to_string())));
    }

    #[test]
    fn test_discover_params_ignore_empty_filters() {
        let query = DiscoverQuery {
            page: 1,
            genres: Some(String::new()),
            provider: None,
            region: Some(String::new()),
        };

        assert_eq!(discover_params(&query).len(), 2);
    }

    #[tokio::test]
    async fn test_new_trims_trailing_slash() {
        let (cache, _handle) = Cache::disabled();
        let catalog = TmdbCatalog::new(
            cache,
            "key".into(),
            "https://api.themoviedb.org/3/".into(),
            "en-US".into(),
            "GB".into(),
            Duration::from_secs(5),
        )
        .unwrap();

        assert_eq!(catalog.api_url, "https://api.themoviedb.org/3");
        assert_eq!(catalog.name(), "tmdb");
    }
}
