use serde::{Deserialize, Serialize};

use super::{ItemId, ItemMetadata, MediaKind};

/// An item liked by the current user and at least one friend
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchedItem {
    #[serde(flatten)]
    pub metadata: ItemMetadata,
    /// Usernames of every friend who also liked the item
    pub friends: Vec<String>,
}

/// Result of one fan-out fetch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum FetchOutcome {
    Found,
    /// The source exists but had nothing to contribute
    Empty,
    Failed(String),
}

impl FetchOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, FetchOutcome::Failed(_))
    }
}

/// Per-friend liked-list fetch result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FriendOutcome {
    pub friend_id: String,
    pub outcome: FetchOutcome,
}

/// Per-item metadata fetch result
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemOutcome {
    pub item_id: ItemId,
    pub outcome: FetchOutcome,
}

/// Everything a match computation produced
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchReport {
    pub kind: MediaKind,
    /// Enriched matches, ascending by item ID
    pub matches: Vec<MatchedItem>,
    pub friend_outcomes: Vec<FriendOutcome>,
    pub item_outcomes: Vec<ItemOutcome>,
}

impl MatchReport {
    pub fn empty(kind: MediaKind) -> Self {
        Self {
            kind,
            matches: Vec::new(),
            friend_outcomes: Vec::new(),
            item_outcomes: Vec::new(),
        }
    }
}
