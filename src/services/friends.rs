use serde::Deserialize;
use tracing::instrument;

use crate::{
    db::ProfileStore,
    error::{AppError, AppResult},
    models::{FriendRequest, ProfileSummary},
    services::fanout::fan_out,
    session::Session,
};

#[derive(Debug, Deserialize)]
pub struct SendRequestBody {
    pub receiver_user_id: String,
}

/// Sends a friend request from the caller to `receiver_id`
///
/// Sending the same request twice refreshes it. A request the receiver already
/// sent the other way must be answered instead.
#[instrument(skip(store, session), fields(user_id = %session.user_id))]
pub async fn send_request(
    store: &dyn ProfileStore,
    session: &Session,
    receiver_id: &str,
) -> AppResult<FriendRequest> {
    let receiver_id = receiver_id.trim();
    if receiver_id.is_empty() {
        return Err(AppError::InvalidInput("Receiver user ID is required".into()));
    }
    if receiver_id == session.user_id {
        return Err(AppError::InvalidInput(
            "Cannot send a friend request to yourself".into(),
        ));
    }

    let sender = store.get_profile(&session.user_id).await?;
    store.get_profile(receiver_id).await?;

    if sender.is_friend(receiver_id) {
        return Err(AppError::Conflict(format!(
            "{} is already your friend",
            receiver_id
        )));
    }
    if store
        .get_friend_request(receiver_id, &session.user_id)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!(
            "{} has already sent you a friend request",
            receiver_id
        )));
    }

    let request = FriendRequest::new(session.user_id.clone(), receiver_id.to_string());
    store.put_friend_request(request.clone()).await?;

    tracing::info!(receiver_id = %receiver_id, "Friend request sent");
    Ok(request)
}

#[instrument(skip(store, session), fields(user_id = %session.user_id))]
pub async fn accept_request(
    store: &dyn ProfileStore,
    session: &Session,
    sender_id: &str,
) -> AppResult<()> {
    store
        .accept_friend_request(sender_id, &session.user_id)
        .await?;
    tracing::info!(sender_id = %sender_id, "Friend request accepted");
    Ok(())
}

#[instrument(skip(store, session), fields(user_id = %session.user_id))]
pub async fn decline_request(
    store: &dyn ProfileStore,
    session: &Session,
    sender_id: &str,
) -> AppResult<()> {
    if !store
        .delete_friend_request(sender_id, &session.user_id)
        .await?
    {
        return Err(AppError::NotFound(format!(
            "Friend request from {}",
            sender_id
        )));
    }
    tracing::info!(sender_id = %sender_id, "Friend request declined");
    Ok(())
}

#[instrument(skip(store, session), fields(user_id = %session.user_id))]
pub async fn remove_friend(
    store: &dyn ProfileStore,
    session: &Session,
    friend_id: &str,
) -> AppResult<()> {
    store.remove_friendship(&session.user_id, friend_id).await?;
    tracing::info!(friend_id = %friend_id, "Friend removed");
    Ok(())
}

pub async fn list_friends(
    store: &dyn ProfileStore,
    session: &Session,
    concurrency: usize,
) -> AppResult<Vec<ProfileSummary>> {
    let profile = store.get_profile(&session.user_id).await?;
    Ok(load_summaries(store, &profile.friends, concurrency).await)
}

pub async fn incoming_requests(
    store: &dyn ProfileStore,
    session: &Session,
    concurrency: usize,
) -> AppResult<Vec<ProfileSummary>> {
    let senders: Vec<String> = store
        .requests_received_by(&session.user_id)
        .await?
        .into_iter()
        .map(|r| r.sender_user_id)
        .collect();
    Ok(load_summaries(store, &senders, concurrency).await)
}

pub async fn outgoing_requests(
    store: &dyn ProfileStore,
    session: &Session,
    concurrency: usize,
) -> AppResult<Vec<ProfileSummary>> {
    let receivers: Vec<String> = store
        .requests_sent_by(&session.user_id)
        .await?
        .into_iter()
        .map(|r| r.receiver_user_id)
        .collect();
    Ok(load_summaries(store, &receivers, concurrency).await)
}

/// Exact username lookup
pub async fn search_by_username(
    store: &dyn ProfileStore,
    username: &str,
) -> AppResult<ProfileSummary> {
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::InvalidInput("Username is required".into()));
    }

    store
        .find_by_username(username)
        .await?
        .map(|p| ProfileSummary::from(&p))
        .ok_or_else(|| AppError::NotFound(format!("No user named {}", username)))
}

/// Loads summaries in the order of `user_ids`, skipping profiles that fail to load
async fn load_summaries(
    store: &dyn ProfileStore,
    user_ids: &[String],
    concurrency: usize,
) -> Vec<ProfileSummary> {
    let mut loaded = fan_out(
        user_ids.iter().cloned().enumerate(),
        concurrency,
        |(index, user_id)| async move {
            let result = store.get_profile(&user_id).await;
            (index, user_id, result)
        },
    )
    .await;
    loaded.sort_by_key(|(index, _, _)| *index);

    loaded
        .into_iter()
        .filter_map(|(_, user_id, result)| match result {
            Ok(profile) => Some(ProfileSummary::from(&profile)),
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Skipping unloadable profile");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryProfileStore;
    use crate::models::UserProfile;

    async fn store_with(users: &[(&str, &str)]) -> MemoryProfileStore {
        let store = MemoryProfileStore::new();
        for (id, name) in users {
            store
                .create_profile(UserProfile::new(id.to_string(), name.to_string(), None))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_send_validations() {
        let store = store_with(&[("a", "alice"), ("b", "bob")]).await;
        let alice = Session::new("a");

        assert!(matches!(
            send_request(&store, &alice, " ").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(matches!(
            send_request(&store, &alice, "a").await,
            Err(AppError::InvalidInput(_))
        ));
        assert!(send_request(&store, &alice, "zed")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_send_keeps_one_request() {
        let store = store_with(&[("a", "alice"), ("b", "bob")]).await;
        let alice = Session::new("a");

        send_request(&store, &alice, "b").await.unwrap();
        send_request(&store, &alice, "b").await.unwrap();

        assert_eq!(store.requests_sent_by("a").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reverse_pending_request_conflicts() {
        let store = store_with(&[("a", "alice"), ("b", "bob")]).await;
        send_request(&store, &Session::new("a"), "b").await.unwrap();

        let result = send_request(&store, &Session::new("b"), "a").await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_accept_then_list() {
        let store = store_with(&[("a", "alice"), ("b", "bob")]).await;
        send_request(&store, &Session::new("a"), "b").await.unwrap();

        let bob = Session::new("b");
        let incoming = incoming_requests(&store, &bob, 4).await.unwrap();
        assert_eq!(incoming[0].username, "alice");

        accept_request(&store, &bob, "a").await.unwrap();

        let alice_friends = list_friends(&store, &Session::new("a"), 4).await.unwrap();
        let bob_friends = list_friends(&store, &bob, 4).await.unwrap();
        assert_eq!(alice_friends[0].user_id, "b");
        assert_eq!(bob_friends[0].user_id, "a");
        assert!(incoming_requests(&store, &bob, 4).await.unwrap().is_empty());

        let again = send_request(&store, &Session::new("a"), "b").await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_decline_deletes_only_request() {
        let store = store_with(&[("a", "alice"), ("b", "bob")]).await;
        send_request(&store, &Session::new("a"), "b").await.unwrap();

        decline_request(&store, &Session::new("b"), "a").await.unwrap();

        assert!(store.get_profile("a").await.unwrap().friends.is_empty());
        assert!(store.get_profile("b").await.unwrap().friends.is_empty());
        assert!(outgoing_requests(&store, &Session::new("a"), 4)
            .await
            .unwrap()
            .is_empty());
        assert!(decline_request(&store, &Session::new("b"), "a")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_remove_friend_is_symmetric() {
        let store = store_with(&[("a", "alice"), ("b", "bob")]).await;
        send_request(&store, &Session::new("a"), "b").await.unwrap();
        accept_request(&store, &Session::new("b"), "a").await.unwrap();

        remove_friend(&store, &Session::new("b"), "a").await.unwrap();

        assert!(!store.get_profile("a").await.unwrap().is_friend("b"));
        assert!(!store.get_profile("b").await.unwrap().is_friend("a"));
    }

    #[tokio::test]
    async fn test_list_skips_missing_profiles() {
        let store = store_with(&[("a", "alice"), ("b", "bob")]).await;
        let mut alice = store.get_profile("a").await.unwrap();
        alice.user_id = "x".into();
        alice.username = "xavier".into();
        alice.friends = vec!["ghost".into(), "b".into()];
        store.create_profile(alice).await.unwrap();

        let friends = list_friends(&store, &Session::new("x"), 2).await.unwrap();
        assert_eq!(friends.len(), 1);
        assert_eq!(friends[0].username, "bob");
    }

    #[tokio::test]
    async fn test_search_by_username() {
        let store = store_with(&[("a", "alice")]).await;

        assert_eq!(search_by_username(&store, "alice").await.unwrap().user_id, "a");
        assert!(search_by_username(&store, "Alice")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(matches!(
            search_by_username(&store, "").await,
            Err(AppError::InvalidInput(_))
        ));
    }
}
