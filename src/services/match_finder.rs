use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use tracing::instrument;

use crate::{
    db::ProfileStore,
    error::{AppError, AppResult},
    models::{
        FetchOutcome, FriendOutcome, ItemId, ItemMetadata, ItemOutcome, MatchReport, MatchedItem,
        MediaKind,
    },
    services::{catalog::ContentCatalog, fanout::fan_out},
    session::Session,
};

/// Display name used when a friend's username cannot be resolved
pub const UNKNOWN_USERNAME: &str = "Unknown";

/// Intersects the user's likes with each friend's likes
///
/// Maps every item liked by the user and at least one friend to the friends who
/// liked it. Attribution accumulates: an item liked by several friends lists all
/// of them, in the order `friend_likes` gives them, each at most once.
pub fn intersect_likes(
    liked: &[ItemId],
    friend_likes: &[(String, Vec<ItemId>)],
) -> BTreeMap<ItemId, Vec<String>> {
    let liked: HashSet<ItemId> = liked.iter().copied().collect();
    let mut matches: BTreeMap<ItemId, Vec<String>> = BTreeMap::new();

    for (friend_id, friend_liked) in friend_likes {
        for item_id in friend_liked {
            if !liked.contains(item_id) {
                continue;
            }
            let friends = matches.entry(*item_id).or_default();
            if !friends.contains(friend_id) {
                friends.push(friend_id.clone());
            }
        }
    }

    matches
}

/// Finds the items a user and their friends both liked
///
/// Every remote lookup fans out with a bounded number of requests in flight.
/// Per-friend and per-item failures never fail the computation; they are
/// reported in the returned [`MatchReport`].
#[derive(Clone)]
pub struct MatchFinder {
    store: Arc<dyn ProfileStore>,
    catalog: Arc<dyn ContentCatalog>,
    concurrency: usize,
}

impl MatchFinder {
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

    /// Computes the caller's matches for one kind of item
    ///
    /// With `with_friend`, only items that friend liked are returned, each still
    /// attributed to every friend who liked it.
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub async fn find_matches(
        &self,
        session: &Session,
        kind: MediaKind,
        with_friend: Option<&str>,
    ) -> AppResult<MatchReport> {
        let profile = self.store.get_profile(&session.user_id).await?;

        if let Some(friend_id) = with_friend {
            if !profile.is_friend(friend_id) {
                return Err(AppError::InvalidInput(format!(
                    "{} is not in your friends list",
                    friend_id
                )));
            }
        }

        let liked = profile.liked(kind);
        if liked.is_empty() || profile.friends.is_empty() {
            tracing::debug!(
                liked = liked.len(),
                friends = profile.friends.len(),
                "Nothing to match"
            );
            return Ok(MatchReport::empty(kind));
        }

        let mut friend_ids: Vec<String> = Vec::with_capacity(profile.friends.len());
        for friend_id in &profile.friends {
            if !friend_ids.contains(friend_id) {
                friend_ids.push(friend_id.clone());
            }
        }

        // 1. Every friend's liked list, joined before anything else happens
        let (friend_likes, friend_outcomes) = self.fetch_friend_likes(&friend_ids, kind).await;

        // 2. Intersection with accumulated attribution
        let mut matched = intersect_likes(liked, &friend_likes);
        if let Some(friend_id) = with_friend {
            matched.retain(|_, friends| friends.iter().any(|f| f == friend_id));
        }

        if matched.is_empty() {
            tracing::info!(
                friends = friend_ids.len(),
                failed_friends = friend_outcomes.iter().filter(|o| o.outcome.is_failed()).count(),
                "No matches found"
            );
            return Ok(MatchReport {
                kind,
                matches: Vec::new(),
                friend_outcomes,
                item_outcomes: Vec::new(),
            });
        }

        // 3. Metadata and usernames, both fanned out concurrently
        let matched_friend_ids: Vec<String> = friend_ids
            .iter()
            .filter(|id| matched.values().any(|friends| friends.contains(id)))
            .cloned()
            .collect();
        let item_ids: Vec<ItemId> = matched.keys().copied().collect();

        let ((metadata, item_outcomes), usernames) = tokio::join!(
            self.fetch_metadata(&item_ids, kind),
            self.resolve_usernames(&matched_friend_ids)
        );

        // 4. Assemble; items without metadata are dropped
        let matches: Vec<MatchedItem> = matched
            .into_iter()
            .filter_map(|(item_id, friends)| {
                let metadata = metadata.get(&item_id)?.clone();
                let friends = friends
                    .iter()
                    .map(|id| {
                        usernames
                            .get(id)
                            .cloned()
                            .unwrap_or_else(|| UNKNOWN_USERNAME.to_string())
                    })
                    .collect();
                Some(MatchedItem { metadata, friends })
            })
            .collect();

        tracing::info!(
            kind = %kind,
            friends = friend_ids.len(),
            failed_friends = friend_outcomes.iter().filter(|o| o.outcome.is_failed()).count(),
            matched = item_ids.len(),
            enriched = matches.len(),
            "Matches computed"
        );

        Ok(MatchReport {
            kind,
            matches,
            friend_outcomes,
            item_outcomes,
        })
    }

    /// Fetches each friend's liked list for `kind`
    ///
    /// Returns the lists that loaded, plus one outcome per friend in input order.
    async fn fetch_friend_likes(
        &self,
        friend_ids: &[String],
        kind: MediaKind,
    ) -> (Vec<(String, Vec<ItemId>)>, Vec<FriendOutcome>) {
        let mut fetched = fan_out(
            friend_ids.iter().cloned().enumerate(),
            self.concurrency,
            |(index, friend_id)| async move {
                let result = self.store.liked_items(&friend_id, kind).await;
                (index, friend_id, result)
            },
        )
        .await;
        fetched.sort_by_key(|(index, _, _)| *index);

        let mut friend_likes = Vec::new();
        let mut outcomes = Vec::with_capacity(fetched.len());

        for (_, friend_id, result) in fetched {
            let outcome = match result {
                Ok(items) if items.is_empty() => FetchOutcome::Empty,
                Ok(items) => {
                    friend_likes.push((friend_id.clone(), items));
                    FetchOutcome::Found
                }
                Err(e) => {
                    tracing::warn!(
                        friend_id = %friend_id,
                        error = %e,
                        "Friend liked items unavailable, skipping"
                    );
                    FetchOutcome::Failed(e.to_string())
                }
            };
            outcomes.push(FriendOutcome { friend_id, outcome });
        }

        (friend_likes, outcomes)
    }

    /// Fetches metadata for every matched item
    async fn fetch_metadata(
        &self,
        item_ids: &[ItemId],
        kind: MediaKind,
    ) -> (HashMap<ItemId, ItemMetadata>, Vec<ItemOutcome>) {
        let fetched = fan_out(item_ids.iter().copied(), self.concurrency, |item_id| async move {
            (item_id, self.catalog.item_metadata(kind, item_id).await)
        })
        .await;

        let mut metadata = HashMap::with_capacity(fetched.len());
        let mut outcomes = Vec::with_capacity(fetched.len());

        for (item_id, result) in fetched {
            let outcome = match result {
                Ok(item) => {
                    metadata.insert(item_id, item);
                    FetchOutcome::Found
                }
                Err(e) => {
                    tracing::warn!(
                        item_id = %item_id,
                        catalog = self.catalog.name(),
                        error = %e,
                        "Item metadata unavailable, dropping match"
                    );
                    FetchOutcome::Failed(e.to_string())
                }
            };
            outcomes.push(ItemOutcome { item_id, outcome });
        }
        outcomes.sort_by_key(|o| o.item_id);

        (metadata, outcomes)
    }

    /// Resolves each friend's username once, falling back to [`UNKNOWN_USERNAME`]
    async fn resolve_usernames(&self, friend_ids: &[String]) -> HashMap<String, String> {
        fan_out(friend_ids.iter().cloned(), self.concurrency, |friend_id| async move {
            let username = match self.store.username(&friend_id).await {
                Ok(username) => username,
                Err(e) => {
                    tracing::warn!(
                        friend_id = %friend_id,
                        error = %e,
                        "Username lookup failed"
                    );
                    UNKNOWN_USERNAME.to_string()
                }
            };
            (friend_id, username)
        })
        .await
        .into_iter()
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MockProfileStore;
    use crate::models::UserProfile;
    use crate::services::catalog::MockContentCatalog;

    fn ids(raw: &[i64]) -> Vec<ItemId> {
        raw.iter().copied().map(ItemId).collect()
    }

    fn metadata(kind: MediaKind, item_id: ItemId) -> ItemMetadata {
        ItemMetadata {
            item_id,
            kind,
            title: format!("Title {}", item_id),
            overview: "Overview".into(),
            poster_path: None,
            release_date: "2020-01-01".into(),
            score: 7.0,
            age_rating: "15".into(),
        }
    }

    fn user_a(friends: &[&str]) -> UserProfile {
        let mut profile = UserProfile::new("a".into(), "alice".into(), None);
        profile.liked_movies = ids(&[101, 202]);
        profile.friends = friends.iter().map(|f| f.to_string()).collect();
        profile
    }

    /// Store where b likes [202, 303], c likes [202], d likes [101, 202],
    /// e has no likes and anyone else is missing
    fn store_for(profile: UserProfile) -> MockProfileStore {
        let mut store = MockProfileStore::new();
        store
            .expect_get_profile()
            .returning(move |_| Ok(profile.clone()));
        store.expect_liked_items().returning(|user_id, _| match user_id {
            "b" => Ok(ids(&[202, 303])),
            "c" => Ok(ids(&[202])),
            "d" => Ok(ids(&[101, 202])),
            "e" => Ok(vec![]),
            "down" => Err(AppError::ExternalApi("connection reset".into())),
            other => Err(AppError::NotFound(format!("User profile {}", other))),
        });
        store.expect_username().returning(|user_id| match user_id {
            "b" => Ok("bob".to_string()),
            "c" => Ok("carol".to_string()),
            "d" => Ok("dave".to_string()),
            other => Err(AppError::NotFound(other.to_string())),
        });
        store
    }

    fn working_catalog() -> MockContentCatalog {
        let mut catalog = MockContentCatalog::new();
        catalog
            .expect_item_metadata()
            .returning(|kind, item_id| Ok(metadata(kind, item_id)));
        catalog.expect_name().return_const("mock");
        catalog
    }

    fn finder(store: MockProfileStore, catalog: MockContentCatalog) -> MatchFinder {
        MatchFinder::new(Arc::new(store), Arc::new(catalog), 4)
    }

    #[test]
    fn test_intersect_example() {
        let friend_likes = vec![
            ("B".to_string(), ids(&[202, 303])),
            ("C".to_string(), ids(&[202])),
        ];

        let result = intersect_likes(&ids(&[101, 202]), &friend_likes);

        assert_eq!(result.len(), 1);
        assert_eq!(result[&ItemId(202)], vec!["B".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_intersect_no_friends_is_empty() {
        assert!(intersect_likes(&ids(&[1, 2, 3]), &[]).is_empty());
    }

    #[test]
    fn test_intersect_ignores_duplicate_likes() {
        let friend_likes = vec![("B".to_string(), ids(&[5, 5, 5]))];
        let result = intersect_likes(&ids(&[5]), &friend_likes);
        assert_eq!(result[&ItemId(5)], vec!["B".to_string()]);
    }

    #[test]
    fn test_intersect_key_set_is_exact() {
        let liked = ids(&[1, 2, 3, 4]);
        let friend_likes = vec![
            ("x".to_string(), ids(&[2, 9])),
            ("y".to_string(), ids(&[4, 8, 2])),
        ];

        let keys: Vec<ItemId> = intersect_likes(&liked, &friend_likes)
            .into_keys()
            .collect();
        assert_eq!(keys, ids(&[2, 4]));
    }

    #[test]
    fn test_intersect_large_liked_list_with_repeats() {
        let mut liked: Vec<ItemId> = (0..50_000).map(ItemId).collect();
        liked.extend(ids(&[7, 7, 49_999]));
        let friend_likes = vec![
            ("x".to_string(), ids(&[49_999, 60_000, 7])),
            ("y".to_string(), ids(&[7])),
        ];

        let result = intersect_likes(&liked, &friend_likes);

        assert_eq!(result.len(), 2);
        assert_eq!(result[&ItemId(7)], vec!["x".to_string(), "y".to_string()]);
        assert_eq!(result[&ItemId(49_999)], vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn test_end_to_end_example() {
        let finder = finder(store_for(user_a(&["b", "c"])), working_catalog());

        let report = finder
            .find_matches(&Session::new("a"), MediaKind::Movie, None)
            .await
            .unwrap();

        assert_eq!(report.matches.len(), 1);
        let item = &report.matches[0];
        assert_eq!(item.metadata.item_id, ItemId(202));
        assert_eq!(item.friends, vec!["bob".to_string(), "carol".to_string()]);
        assert!(report
            .friend_outcomes
            .iter()
            .all(|o| o.outcome == FetchOutcome::Found));
    }

    #[tokio::test]
    async fn test_no_friends_yields_empty_report() {
        let mut store = MockProfileStore::new();
        store
            .expect_get_profile()
            .returning(|_| Ok(user_a(&[])));
        store.expect_liked_items().never();

        let report = finder(store, MockContentCatalog::new())
            .find_matches(&Session::new("a"), MediaKind::Movie, None)
            .await
            .unwrap();

        assert!(report.matches.is_empty());
        assert!(report.friend_outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_failed_friend_does_not_fail_computation() {
        let finder = finder(store_for(user_a(&["down", "c", "ghost"])), working_catalog());

        let report = finder
            .find_matches(&Session::new("a"), MediaKind::Movie, None)
            .await
            .unwrap();

        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].friends, vec!["carol".to_string()]);

        let outcomes: Vec<(&str, bool)> = report
            .friend_outcomes
            .iter()
            .map(|o| (o.friend_id.as_str(), o.outcome.is_failed()))
            .collect();
        assert_eq!(outcomes, vec![("down", true), ("c", false), ("ghost", true)]);
    }

    #[tokio::test]
    async fn test_friend_without_likes_reports_empty() {
        let finder = finder(store_for(user_a(&["e"])), working_catalog());

        let report = finder
            .find_matches(&Session::new("a"), MediaKind::Movie, None)
            .await
            .unwrap();

        assert!(report.matches.is_empty());
        assert_eq!(report.friend_outcomes[0].outcome, FetchOutcome::Empty);
    }

    #[tokio::test]
    async fn test_attribution_accumulates_across_friends() {
        let finder = finder(store_for(user_a(&["b", "c", "d"])), working_catalog());

        let report = finder
            .find_matches(&Session::new("a"), MediaKind::Movie, None)
            .await
            .unwrap();

        let by_id: HashMap<ItemId, Vec<String>> = report
            .matches
            .iter()
            .map(|m| (m.metadata.item_id, m.friends.clone()))
            .collect();

        assert_eq!(by_id[&ItemId(101)], vec!["dave".to_string()]);
        assert_eq!(
            by_id[&ItemId(202)],
            vec!["bob".to_string(), "carol".to_string(), "dave".to_string()]
        );
    }

    #[tokio::test]
    async fn test_with_friend_filters_items_but_keeps_attribution() {
        let finder = finder(store_for(user_a(&["b", "d"])), working_catalog());

        let report = finder
            .find_matches(&Session::new("a"), MediaKind::Movie, Some("b"))
            .await
            .unwrap();

        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].metadata.item_id, ItemId(202));
        assert_eq!(
            report.matches[0].friends,
            vec!["bob".to_string(), "dave".to_string()]
        );
    }

    #[tokio::test]
    async fn test_with_stranger_is_invalid() {
        let finder = finder(store_for(user_a(&["b"])), working_catalog());

        let result = finder
            .find_matches(&Session::new("a"), MediaKind::Movie, Some("zed"))
            .await;

        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_metadata_failure_drops_only_that_item() {
        let mut catalog = MockContentCatalog::new();
        catalog.expect_item_metadata().returning(|kind, item_id| {
            if item_id == ItemId(101) {
                Err(AppError::ExternalApi("TMDB API returned status 500".into()))
            } else {
                Ok(metadata(kind, item_id))
            }
        });
        catalog.expect_name().return_const("mock");

        let finder = finder(store_for(user_a(&["d"])), catalog);
        let report = finder
            .find_matches(&Session::new("a"), MediaKind::Movie, None)
            .await
            .unwrap();

        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].metadata.item_id, ItemId(202));
        assert_eq!(report.item_outcomes.len(), 2);
        assert!(report.item_outcomes[0].outcome.is_failed());
        assert_eq!(report.item_outcomes[1].outcome, FetchOutcome::Found);
    }

    #[tokio::test]
    async fn test_unresolvable_username_falls_back() {
        let mut store = MockProfileStore::new();
        store
            .expect_get_profile()
            .returning(|_| Ok(user_a(&["nameless"])));
        store
            .expect_liked_items()
            .returning(|_, _| Ok(ids(&[202])));
        store
            .expect_username()
            .returning(|_| Err(AppError::ExternalApi("timeout".into())));

        let report = finder(store, working_catalog())
            .find_matches(&Session::new("a"), MediaKind::Movie, None)
            .await
            .unwrap();

        assert_eq!(report.matches[0].friends, vec![UNKNOWN_USERNAME.to_string()]);
    }

    #[tokio::test]
    async fn test_missing_own_profile_is_not_found() {
        let mut store = MockProfileStore::new();
        store
            .expect_get_profile()
            .returning(|id| Err(AppError::NotFound(id.to_string())));

        let result = finder(store, MockContentCatalog::new())
            .find_matches(&Session::new("nobody"), MediaKind::Tv, None)
            .await;

        assert!(result.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_repeated_runs_are_identical() {
        let finder = finder(store_for(user_a(&["b", "c", "d"])), working_catalog());
        let session = Session::new("a");

        let first = finder
            .find_matches(&session, MediaKind::Movie, None)
            .await
            .unwrap();
        let second = finder
            .find_matches(&session, MediaKind::Movie, None)
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_duplicate_friend_entries_fetch_once() {
        let mut store = MockProfileStore::new();
        store
            .expect_get_profile()
            .returning(|_| Ok(user_a(&["c", "c"])));
        store
            .expect_liked_items()
            .times(1)
            .returning(|_, _| Ok(ids(&[202])));
        store
            .expect_username()
            .times(1)
            .returning(|_| Ok("carol".to_string()));

        let report = finder(store, working_catalog())
            .find_matches(&Session::new("a"), MediaKind::Movie, None)
            .await
            .unwrap();

        assert_eq!(report.friend_outcomes.len(), 1);
        assert_eq!(report.matches[0].friends, vec!["carol".to_string()]);
    }
}
