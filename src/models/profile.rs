use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemId, MediaKind, Verdict};

/// A user's document in the profile store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    #[serde(default)]
    pub liked_movies: Vec<ItemId>,
    #[serde(default)]
    pub disliked_movies: Vec<ItemId>,
    #[serde(default)]
    pub liked_shows: Vec<ItemId>,
    #[serde(default)]
    pub disliked_shows: Vec<ItemId>,
    #[serde(default)]
    pub friends: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Creates a fresh profile with empty lists
    pub fn new(user_id: String, username: String, email: Option<String>) -> Self {
        Self {
            user_id,
            username,
            email,
            profile_picture_url: None,
            liked_movies: Vec::new(),
            disliked_movies: Vec::new(),
            liked_shows: Vec::new(),
            disliked_shows: Vec::new(),
            friends: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn liked(&self, kind: MediaKind) -> &[ItemId] {
        match kind {
            MediaKind::Movie => &self.liked_movies,
            MediaKind::Tv => &self.liked_shows,
        }
    }

    pub fn disliked(&self, kind: MediaKind) -> &[ItemId] {
        match kind {
            MediaKind::Movie => &self.disliked_movies,
            MediaKind::Tv => &self.disliked_shows,
        }
    }

    /// Adds an item to the list selected by `kind` and `verdict`
    ///
    /// Returns false when the item was already recorded.
    pub fn record_swipe(&mut self, kind: MediaKind, item_id: ItemId, verdict: Verdict) -> bool {
        let list = match (kind, verdict) {
            (MediaKind::Movie, Verdict::Like) => &mut self.liked_movies,
            (MediaKind::Movie, Verdict::Dislike) => &mut self.disliked_movies,
            (MediaKind::Tv, Verdict::Like) => &mut self.liked_shows,
            (MediaKind::Tv, Verdict::Dislike) => &mut self.disliked_shows,
        };
        push_unique(list, item_id)
    }

    pub fn is_friend(&self, user_id: &str) -> bool {
        self.friends.iter().any(|f| f == user_id)
    }

    pub fn add_friend(&mut self, user_id: &str) -> bool {
        push_unique(&mut self.friends, user_id.to_string())
    }

    pub fn remove_friend(&mut self, user_id: &str) -> bool {
        let before = self.friends.len();
        self.friends.retain(|f| f != user_id);
        before != self.friends.len()
    }
}

/// Array-union of a single value
fn push_unique<T: PartialEq>(list: &mut Vec<T>, value: T) -> bool {
    if list.contains(&value) {
        false
    } else {
        list.push(value);
        true
    }
}

/// Public view of another user, as shown in friend lists and search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProfileSummary {
    pub user_id: String,
    pub username: String,
    pub profile_picture_url: Option<String>,
}

impl From<&UserProfile> for ProfileSummary {
    fn from(profile: &UserProfile) -> Self {
        Self {
            user_id: profile.user_id.clone(),
            username: profile.username.clone(),
            profile_picture_url: profile.profile_picture_url.clone(),
        }
    }
}

/// Pending, directional friendship proposal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FriendRequest {
    pub sender_user_id: String,
    pub receiver_user_id: String,
    pub created_at: DateTime<Utc>,
}

impl FriendRequest {
    pub fn new(sender_user_id: String, receiver_user_id: String) -> Self {
        Self {
            sender_user_id,
            receiver_user_id,
            created_at: Utc::now(),
        }
    }
}
