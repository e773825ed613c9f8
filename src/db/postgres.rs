use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::ProfileStore,
    error::{AppError, AppResult},
    models::{FriendRequest, ItemId, MediaKind, UserProfile, Verdict},
};

/// Creates a PostgreSQL connection pool and applies pending migrations
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

const PROFILE_COLUMNS: &str = "user_id, username, email, profile_picture_url, liked_movies, \
     disliked_movies, liked_shows, disliked_shows, friends, created_at";

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    username: String,
    email: Option<String>,
    profile_picture_url: Option<String>,
    liked_movies: Vec<i64>,
    disliked_movies: Vec<i64>,
    liked_shows: Vec<i64>,
    disliked_shows: Vec<i64>,
    friends: Vec<String>,
    created_at: DateTime<Utc>,
}

fn to_item_ids(ids: Vec<i64>) -> Vec<ItemId> {
    ids.into_iter().map(ItemId).collect()
}

fn from_item_ids(ids: &[ItemId]) -> Vec<i64> {
    ids.iter().map(|id| id.0).collect()
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        Self {
            user_id: row.user_id,
            username: row.username,
            email: row.email,
            profile_picture_url: row.profile_picture_url,
            liked_movies: to_item_ids(row.liked_movies),
            disliked_movies: to_item_ids(row.disliked_movies),
            liked_shows: to_item_ids(row.liked_shows),
            disliked_shows: to_item_ids(row.disliked_shows),
            friends: row.friends,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FriendRequestRow {
    sender_user_id: String,
    receiver_user_id: String,
    created_at: DateTime<Utc>,
}

impl From<FriendRequestRow> for FriendRequest {
    fn from(row: FriendRequestRow) -> Self {
        Self {
            sender_user_id: row.sender_user_id,
            receiver_user_id: row.receiver_user_id,
            created_at: row.created_at,
        }
    }
}

/// Column holding the list a swipe lands in
fn swipe_column(kind: MediaKind, verdict: Verdict) -> &'static str {
    match (kind, verdict) {
        (MediaKind::Movie, Verdict::Like) => "liked_movies",
        (MediaKind::Movie, Verdict::Dislike) => "disliked_movies",
        (MediaKind::Tv, Verdict::Like) => "liked_shows",
        (MediaKind::Tv, Verdict::Dislike) => "disliked_shows",
    }
}

fn profile_not_found(user_id: &str) -> AppError {
    AppError::NotFound(format!("User profile {}", user_id))
}

/// Profile store backed by PostgreSQL array columns
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProfileStore for PgProfileStore {
    async fn create_profile(&self, profile: UserProfile) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_profiles
                (user_id, username, email, profile_picture_url, liked_movies,
                 disliked_movies, liked_shows, disliked_shows, friends, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(&profile.user_id)
        .bind(&profile.username)
        .bind(&profile.email)
        .bind(&profile.profile_picture_url)
        .bind(from_item_ids(&profile.liked_movies))
        .bind(from_item_ids(&profile.disliked_movies))
        .bind(from_item_ids(&profile.liked_shows))
        .bind(from_item_ids(&profile.disliked_shows))
        .bind(&profile.friends)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                tracing::debug!(
                    user_id = %profile.user_id,
                    username = %profile.username,
                    constraint = ?e.constraint(),
                    "Profile insert hit unique constraint"
                );
                Err(AppError::Conflict(format!(
                    "User {} or username {} already exists",
                    profile.user_id, profile.username
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_profile(&self, user_id: &str) -> AppResult<UserProfile> {
        let sql = format!(
            "SELECT {} FROM user_profiles WHERE user_id = $1",
            PROFILE_COLUMNS
        );
        sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .map(UserProfile::from)
            .ok_or_else(|| profile_not_found(user_id))
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserProfile>> {
        let sql = format!(
            "SELECT {} FROM user_profiles WHERE username = $1",
            PROFILE_COLUMNS
        );
        let row = sqlx::query_as::<_, ProfileRow>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(UserProfile::from))
    }

    async fn set_profile_picture(&self, user_id: &str, url: &str) -> AppResult<()> {
        let result =
            sqlx::query("UPDATE user_profiles SET profile_picture_url = $2 WHERE user_id = $1")
                .bind(user_id)
                .bind(url)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(profile_not_found(user_id));
        }
        Ok(())
    }

    async fn record_swipe(
        &self,
        user_id: &str,
        kind: MediaKind,
        item_id: ItemId,
        verdict: Verdict,
    ) -> AppResult<()> {
        let column = swipe_column(kind, verdict);
        let sql = format!(
            "UPDATE user_profiles \
             SET {col} = CASE WHEN $2 = ANY({col}) THEN {col} ELSE array_append({col}, $2) END \
             WHERE user_id = $1",
            col = column
        );

        let result = sqlx::query(&sql)
            .bind(user_id)
            .bind(item_id.0)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(profile_not_found(user_id));
        }
        Ok(())
    }

    async fn delete_profile(&self, user_id: &str) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE user_profiles SET friends = array_remove(friends, $1) WHERE $1 = ANY(friends)",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM friend_requests WHERE sender_user_id = $1 OR receiver_user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let deleted = sqlx::query("DELETE FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            // Dropping the transaction rolls it back
            return Err(profile_not_found(user_id));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn put_friend_request(&self, request: FriendRequest) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO friend_requests (sender_user_id, receiver_user_id, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (sender_user_id, receiver_user_id)
            DO UPDATE SET created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&request.sender_user_id)
        .bind(&request.receiver_user_id)
        .bind(request.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_friend_request(
        &self,
        sender_id: &str,
        receiver_id: &str,
    ) -> AppResult<Option<FriendRequest>> {
        let row = sqlx::query_as::<_, FriendRequestRow>(
            r#"
            SELECT sender_user_id, receiver_user_id, created_at
            FROM friend_requests
            WHERE sender_user_id = $1 AND receiver_user_id = $2
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(FriendRequest::from))
    }

    async fn delete_friend_request(&self, sender_id: &str, receiver_id: &str) -> AppResult<bool> {
        let result = sqlx::query(
            "DELETE FROM friend_requests WHERE sender_user_id = $1 AND receiver_user_id = $2",
        )
        .bind(sender_id)
        .bind(receiver_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn requests_sent_by(&self, user_id: &str) -> AppResult<Vec<FriendRequest>> {
        let rows = sqlx::query_as::<_, FriendRequestRow>(
            r#"
            SELECT sender_user_id, receiver_user_id, created_at
            FROM friend_requests
            WHERE sender_user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(FriendRequest::from).collect())
    }

    async fn requests_received_by(&self, user_id: &str) -> AppResult<Vec<FriendRequest>> {
        let rows = sqlx::query_as::<_, FriendRequestRow>(
            r#"
            SELECT sender_user_id, receiver_user_id, created_at
            FROM friend_requests
            WHERE receiver_user_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(FriendRequest::from).collect())
    }

    async fn accept_friend_request(&self, sender_id: &str, receiver_id: &str) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let consumed = sqlx::query(
            "DELETE FROM friend_requests WHERE sender_user_id = $1 AND receiver_user_id = $2",
        )
        .bind(sender_id)
        .bind(receiver_id)
        .execute(&mut *tx)
        .await?;

        if consumed.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Friend request from {} to {}",
                sender_id, receiver_id
            )));
        }

        sqlx::query(
            "DELETE FROM friend_requests WHERE sender_user_id = $1 AND receiver_user_id = $2",
        )
        .bind(receiver_id)
        .bind(sender_id)
        .execute(&mut *tx)
        .await?;

        for (user_id, friend_id) in [(sender_id, receiver_id), (receiver_id, sender_id)] {
            let updated = sqlx::query(
                "UPDATE user_profiles \
                 SET friends = CASE WHEN $2 = ANY(friends) THEN friends ELSE array_append(friends, $2) END \
                 WHERE user_id = $1",
            )
            .bind(user_id)
            .bind(friend_id)
            .execute(&mut *tx)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(profile_not_found(user_id));
            }
        }

        tx.commit().await?;
        Ok(())
    }

    async fn remove_friendship(&self, user_id: &str, friend_id: &str) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated =
            sqlx::query("UPDATE user_profiles SET friends = array_remove(friends, $2) WHERE user_id = $1")
                .bind(user_id)
                .bind(friend_id)
                .execute(&mut *tx)
                .await?;

        if updated.rows_affected() == 0 {
            return Err(profile_not_found(user_id));
        }

        sqlx::query("UPDATE user_profiles SET friends = array_remove(friends, $2) WHERE user_id = $1")
            .bind(friend_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn liked_items(&self, user_id: &str, kind: MediaKind) -> AppResult<Vec<ItemId>> {
        let sql = format!(
            "SELECT {} FROM user_profiles WHERE user_id = $1",
            swipe_column(kind, Verdict::Like)
        );
        let liked: Option<Vec<i64>> = sqlx::query_scalar(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        liked
            .map(to_item_ids)
            .ok_or_else(|| profile_not_found(user_id))
    }

    async fn username(&self, user_id: &str) -> AppResult<String> {
        sqlx::query_scalar::<_, String>("SELECT username FROM user_profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| profile_not_found(user_id))
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
