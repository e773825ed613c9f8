use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::{
    db::ProfileStore,
    error::{AppError, AppResult},
    models::{FriendRequest, ItemId, MediaKind, UserProfile, Verdict},
};

/// Profile store held entirely in process memory
///
/// A single lock guards profiles and requests together, which is what makes
/// accept/remove/delete atomic here.
#[derive(Default)]
pub struct MemoryProfileStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    profiles: HashMap<String, UserProfile>,
    /// Keyed by (sender, receiver)
    requests: HashMap<(String, String), FriendRequest>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn profile_not_found(user_id: &str) -> AppError {
    AppError::NotFound(format!("User profile {}", user_id))
}

#[async_trait::async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn create_profile(&self, profile: UserProfile) -> AppResult<()> {
        let mut inner = self.inner.write().await;

        if inner.profiles.contains_key(&profile.user_id) {
            return Err(AppError::Conflict(format!(
                "User {} already has a profile",
                profile.user_id
            )));
        }
        if inner
            .profiles
            .values()
            .any(|p| p.username == profile.username)
        {
            return Err(AppError::Conflict(format!(
                "Username {} is already taken",
                profile.username
            )));
        }

        inner.profiles.insert(profile.user_id.clone(), profile);
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> AppResult<UserProfile> {
        let inner = self.inner.read().await;
        inner
            .profiles
            .get(user_id)
            .cloned()
            .ok_or_else(|| profile_not_found(user_id))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserProfile>> {
        let inner = self.inner.read().await;
        Ok(inner
            .profiles
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn set_profile_picture(&self, user_id: &str, url: &str) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let profile = inner
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| profile_not_found(user_id))?;
        profile.profile_picture_url = Some(url.to_string());
        Ok(())
    }

    async fn record_swipe(
        &self,
        user_id: &str,
        kind: MediaKind,
        item_id: ItemId,
        verdict: Verdict,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let profile = inner
            .profiles
            .get_mut(user_id)
            .ok_or_else(|| profile_not_found(user_id))?;
        profile.record_swipe(kind, item_id, verdict);
        Ok(())
    }

    async fn delete_profile(&self, user_id: &str) -> AppResult<()> {
        let mut inner = self.inner.write().await;

        if inner.profiles.remove(user_id).is_none() {
            return Err(profile_not_found(user_id));
        }
        for profile in inner.profiles.values_mut() {
            profile.remove_friend(user_id);
        }
        inner
            .requests
            .retain(|(sender, receiver), _| sender != user_id && receiver != user_id);

        Ok(())
    }

    async fn put_friend_request(&self, request: FriendRequest) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let key = (
            request.sender_user_id.clone(),
            request.receiver_user_id.clone(),
        );
        inner.requests.insert(key, request);
        Ok(())
    }

    async fn get_friend_request(
        &self,
        sender_id: &str,
        receiver_id: &str,
    ) -> AppResult<Option<FriendRequest>> {
        let inner = self.inner.read().await;
        Ok(inner
            .requests
            .get(&(sender_id.to_string(), receiver_id.to_string()))
            .cloned())
    }

    async fn delete_friend_request(&self, sender_id: &str, receiver_id: &str) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner
            .requests
            .remove(&(sender_id.to_string(), receiver_id.to_string()))
            .is_some())
    }

    async fn requests_sent_by(&self, user_id: &str) -> AppResult<Vec<FriendRequest>> {
        let inner = self.inner.read().await;
        let mut requests: Vec<FriendRequest> = inner
            .requests
            .values()
            .filter(|r| r.sender_user_id == user_id)
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn requests_received_by(&self, user_id: &str) -> AppResult<Vec<FriendRequest>> {
        let inner = self.inner.read().await;
        let mut requests: Vec<FriendRequest> = inner
            .requests
            .values()
            .filter(|r| r.receiver_user_id == user_id)
            .cloned()
            .collect();
        requests.sort_by_key(|r| r.created_at);
        Ok(requests)
    }

    async fn accept_friend_request(&self, sender_id: &str, receiver_id: &str) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let key = (sender_id.to_string(), receiver_id.to_string());

        // Validate everything before mutating anything
        if !inner.requests.contains_key(&key) {
            return Err(AppError::NotFound(format!(
                "Friend request from {} to {}",
                sender_id, receiver_id
            )));
        }
        for user_id in [sender_id, receiver_id] {
            if !inner.profiles.contains_key(user_id) {
                return Err(profile_not_found(user_id));
            }
        }

        if let Some(sender) = inner.profiles.get_mut(sender_id) {
            sender.add_friend(receiver_id);
        }
        if let Some(receiver) = inner.profiles.get_mut(receiver_id) {
            receiver.add_friend(sender_id);
        }
        inner.requests.remove(&key);
        inner
            .requests
            .remove(&(receiver_id.to_string(), sender_id.to_string()));

        Ok(())
    }

    async fn remove_friendship(&self, user_id: &str, friend_id: &str) -> AppResult<()> {
        let mut inner = self.inner.write().await;

        if !inner.profiles.contains_key(user_id) {
            return Err(profile_not_found(user_id));
        }
        if let Some(profile) = inner.profiles.get_mut(user_id) {
            profile.remove_friend(friend_id);
        }
        // The friend may have deleted their account already
        if let Some(friend) = inner.profiles.get_mut(friend_id) {
            friend.remove_friend(user_id);
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
