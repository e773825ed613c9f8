use reqwest::Url;
use serde::Deserialize;
use tracing::instrument;

use crate::{
    db::ProfileStore,
    error::{AppError, AppResult},
    models::{ItemId, MediaKind, UserProfile, Verdict},
    session::Session,
};

const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 20;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Usernames are 3 to 20 ASCII letters, digits, underscores or dots
pub fn validate_username(username: &str) -> AppResult<()> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(AppError::InvalidInput(format!(
            "Username must be between {} and {} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }

    if let Some(c) = username
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '.'))
    {
        return Err(AppError::InvalidInput(format!(
            "Username contains invalid character '{}'",
            c
        )));
    }

    Ok(())
}

/// Accepts `local@domain.tld` shaped addresses
pub fn validate_email(email: &str) -> AppResult<()> {
    let invalid = || AppError::InvalidInput(format!("Invalid email address: {}", email));

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }

    let (host, tld) = domain.rsplit_once('.').ok_or_else(invalid)?;
    if host.is_empty() || tld.len() < 2 || !tld.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }

    Ok(())
}

/// Profile pictures must be absolute http(s) URLs
pub fn validate_picture_url(url: &str) -> AppResult<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| AppError::InvalidInput(format!("Invalid profile picture URL: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(AppError::InvalidInput(format!(
            "Unsupported profile picture URL scheme: {}",
            scheme
        ))),
    }
}

/// Creates the caller's profile
#[instrument(skip(store, session, request), fields(user_id = %session.user_id))]
pub async fn register(
    store: &dyn ProfileStore,
    session: &Session,
    request: RegisterRequest,
) -> AppResult<UserProfile> {
    let username = request.username.trim().to_string();
    validate_username(&username)?;

    let email = request
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    if let Some(email) = &email {
        validate_email(email)?;
    }

    let profile = UserProfile::new(session.user_id.clone(), username, email);
    store.create_profile(profile.clone()).await?;

    tracing::info!(
        username = %profile.username,
        store = store.name(),
        "Profile registered"
    );

    Ok(profile)
}

pub async fn get_profile(store: &dyn ProfileStore, user_id: &str) -> AppResult<UserProfile> {
    store.get_profile(user_id).await
}

#[instrument(skip(store, session), fields(user_id = %session.user_id))]
pub async fn set_profile_picture(
    store: &dyn ProfileStore,
    session: &Session,
    url: &str,
) -> AppResult<UserProfile> {
    let url = validate_picture_url(url.trim())?;
    store
        .set_profile_picture(&session.user_id, url.as_str())
        .await?;

    tracing::info!("Profile picture updated");
    store.get_profile(&session.user_id).await
}

/// Deletes the caller's profile, their friendships and any pending requests
#[instrument(skip(store, session), fields(user_id = %session.user_id))]
pub async fn delete_account(store: &dyn ProfileStore, session: &Session) -> AppResult<()> {
    store.delete_profile(&session.user_id).await?;
    tracing::info!(store = store.name(), "Account deleted");
    Ok(())
}

/// Records a like or dislike; repeating a swipe changes nothing
#[instrument(skip(store, session), fields(user_id = %session.user_id))]
pub async fn record_swipe(
    store: &dyn ProfileStore,
    session: &Session,
    kind: MediaKind,
    item_id: ItemId,
    verdict: Verdict,
) -> AppResult<UserProfile> {
    store
        .record_swipe(&session.user_id, kind, item_id, verdict)
        .await?;

    tracing::debug!("Swipe recorded");
    store.get_profile(&session.user_id).await
}
