use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::TmdbItemDetails;

pub const TITLE_PLACEHOLDER: &str = "Title Not Found";
pub const OVERVIEW_PLACEHOLDER: &str = "No overview available";
pub const RELEASE_DATE_PLACEHOLDER: &str = "Release Date Not Found";
pub const AGE_RATING_PLACEHOLDER: &str = "Age Rating Not Found";

/// Catalog identifier of a movie or TV show
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Which half of the catalog an item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    #[serde(alias = "show")]
    Tv,
}

impl MediaKind {
    /// Path segment used by the catalog API (`/movie/{id}`, `/tv/{id}`)
    pub fn path_segment(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl std::str::FromStr for MediaKind {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movie" | "movies" => Ok(MediaKind::Movie),
            "tv" | "show" | "shows" => Ok(MediaKind::Tv),
            other => Err(crate::error::AppError::InvalidInput(format!(
                "Unknown media kind '{}', expected movie or tv",
                other
            ))),
        }
    }
}

/// Direction of a swipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Like,
    Dislike,
}

/// Display-ready description of a catalog item
///
/// Every text field is filled: missing upstream values become placeholders.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemMetadata {
    pub item_id: ItemId,
    pub kind: MediaKind,
    pub title: String,
    pub overview: String,
    pub poster_path: Option<String>,
    pub release_date: String,
    pub score: f64,
    pub age_rating: String,
}

impl ItemMetadata {
    /// Builds metadata from raw details plus an optional certification
    pub fn from_details(
        kind: MediaKind,
        details: TmdbItemDetails,
        certification: Option<String>,
    ) -> Self {
        let release_date = match kind {
            MediaKind::Movie => details.release_date,
            MediaKind::Tv => details.first_air_date,
        };

        Self {
            item_id: ItemId(details.id),
            kind,
            title: non_empty(details.title.or(details.name))
                .unwrap_or_else(|| TITLE_PLACEHOLDER.to_string()),
            overview: non_empty(details.overview)
                .unwrap_or_else(|| OVERVIEW_PLACEHOLDER.to_string()),
            poster_path: non_empty(details.poster_path),
            release_date: non_empty(release_date)
                .unwrap_or_else(|| RELEASE_DATE_PLACEHOLDER.to_string()),
            score: details.vote_average.unwrap_or(0.0),
            age_rating: non_empty(certification)
                .unwrap_or_else(|| AGE_RATING_PLACEHOLDER.to_string()),
        }
    }
}

/// Treats blank strings the same as absent ones
pub(crate) fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}
