//! Profile store abstraction
//!
//! Profiles and friend requests live in a document-shaped store. The service only
//! ever talks to it through this trait, so the backing engine (PostgreSQL in
//! production, memory in tests and local runs) is chosen at startup.
use crate::{
    error::AppResult,
    models::{FriendRequest, ItemId, MediaKind, UserProfile, Verdict},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    /// Inserts a new profile
    ///
    /// Fails with `Conflict` when the user ID or the username is taken.
    async fn create_profile(&self, profile: UserProfile) -> AppResult<()>;

    /// Loads a profile, `NotFound` if there is none
    async fn get_profile(&self, user_id: &str) -> AppResult<UserProfile>;

    /// Exact-match lookup by username
    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserProfile>>;

    async fn set_profile_picture(&self, user_id: &str, url: &str) -> AppResult<()>;

    /// Array-union of `item_id` into the list selected by `kind` and `verdict`
    async fn record_swipe(
        &self,
        user_id: &str,
        kind: MediaKind,
        item_id: ItemId,
        verdict: Verdict,
    ) -> AppResult<()>;

    /// Deletes a profile along with every friend reference and pending request
    /// that points at it
    async fn delete_profile(&self, user_id: &str) -> AppResult<()>;

    /// Creates or refreshes the request keyed by (sender, receiver)
    async fn put_friend_request(&self, request: FriendRequest) -> AppResult<()>;

    async fn get_friend_request(
        &self,
        sender_id: &str,
        receiver_id: &str,
    ) -> AppResult<Option<FriendRequest>>;

    /// Returns whether a request was deleted
    async fn delete_friend_request(&self, sender_id: &str, receiver_id: &str) -> AppResult<bool>;

    async fn requests_sent_by(&self, user_id: &str) -> AppResult<Vec<FriendRequest>>;

    async fn requests_received_by(&self, user_id: &str) -> AppResult<Vec<FriendRequest>>;

    /// Atomically befriends both users and deletes the pending request
    ///
    /// Fails with `NotFound` if the request or either profile is missing; in that
    /// case nothing is changed.
    async fn accept_friend_request(&self, sender_id: &str, receiver_id: &str) -> AppResult<()>;

    /// Atomically removes each user from the other's friend list
    async fn remove_friendship(&self, user_id: &str, friend_id: &str) -> AppResult<()>;

    /// Liked items of one kind; an absent list is empty
    async fn liked_items(&self, user_id: &str, kind: MediaKind) -> AppResult<Vec<ItemId>> {
        let profile = self.get_profile(user_id).await?;
        Ok(profile.liked(kind).to_vec())
    }

    async fn username(&self, user_id: &str) -> AppResult<String> {
        let profile = self.get_profile(user_id).await?;
        Ok(profile.username)
    }

    /// Store name for logging
    fn name(&self) -> &'static str;
}
