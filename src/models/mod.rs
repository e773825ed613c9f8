use serde::{Deserialize, Serialize};

pub mod item;
pub mod matched;
pub mod profile;

pub use item::{ItemId, ItemMetadata, MediaKind, Verdict};
pub use matched::{FetchOutcome, FriendOutcome, ItemOutcome, MatchReport, MatchedItem};
pub use profile::{FriendRequest, ProfileSummary, UserProfile};

/// Filters for one page of the catalog's discover feed
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DiscoverQuery {
    #[serde(default = "default_page")]
    pub page: u32,
    /// Comma-separated TMDB genre IDs
    #[serde(default)]
    pub genres: Option<String>,
    /// TMDB watch provider ID
    #[serde(default)]
    pub provider: Option<String>,
    /// ISO 3166-1 region the provider filter applies to
    #[serde(default)]
    pub region: Option<String>,
}

fn default_page() -> u32 {
    1
}

impl DiscoverQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            ..Default::default()
        }
    }

    /// Stable textual form, used as a cache key
    pub fn cache_fragment(&self) -> String {
        format!(
            "p{}:g{}:w{}:r{}",
            self.page,
            self.genres.as_deref().unwrap_or(""),
            self.provider.as_deref().unwrap_or(""),
            self.region.as_deref().unwrap_or("")
        )
    }
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Response from GET /movie/{id} and GET /tv/{id}
///
/// Movies carry `title`/`release_date`, shows carry `name`/`first_air_date`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TmdbItemDetails {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
}

/// Response from GET /discover/movie and GET /discover/tv
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbDiscoverPage {
    #[serde(default)]
    pub page: u32,
    pub results: Vec<TmdbDiscoverResult>,
    #[serde(default)]
    pub total_pages: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmdbDiscoverResult {
    pub id: i64,
}

/// Response from GET /movie/{id}/release_dates
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbReleaseDates {
    pub results: Vec<TmdbReleaseDatesResult>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbReleaseDatesResult {
    pub iso_3166_1: String,
    #[serde(default)]
    pub release_dates: Vec<TmdbReleaseDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbReleaseDate {
    #[serde(default)]
    pub certification: Option<String>,
}

/// Response from GET /tv/{id}/content_ratings
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbContentRatings {
    pub results: Vec<TmdbContentRating>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TmdbContentRating {
    pub iso_3166_1: String,
    #[serde(default)]
    pub rating: Option<String>,
}
