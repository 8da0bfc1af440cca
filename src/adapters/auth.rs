//! OAuth bearer token cache shared by the Creator and Inventory clients.
//!
//! A [`TokenManager`] hands out the cached token while it is still fresh and
//! asks its [`TokenSource`] for a new one otherwise.

use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Zoho access tokens live for one hour unless the token endpoint says otherwise.
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

pub const AUTH_SCHEME: &str = "Zoho-oauthtoken";

#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// True while `now + margin` is still before the expiry instant.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        now + margin < self.expires_at
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch_token(&self) -> Result<AccessToken>;
}

/// Client credentials of a Zoho self-client (`login`/`password`/`refresh_token`).
#[derive(Clone, Deserialize)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"***")
            .field("refresh_token", &"***")
            .finish()
    }
}

/// Exchanges a long-lived refresh token for an access token.
pub struct RefreshTokenGrant {
    client: Client,
    token_url: String,
    credentials: OAuthCredentials,
}

impl RefreshTokenGrant {
    pub fn new(client: Client, token_url: impl Into<String>, credentials: OAuthCredentials) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            credentials,
        }
    }
}

#[async_trait]
impl TokenSource for RefreshTokenGrant {
    async fn fetch_token(&self) -> Result<AccessToken> {
        tracing::debug!("Requesting access token from {}", self.token_url);

        let response = self
            .client
            .post(&self.token_url)
            .query(&[
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
                ("grant_type", "refresh_token"),
                ("client_id", self.credentials.client_id.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body: Value = response.json().await?;

        let access_token = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| EtlError::AuthError {
                message: format!(
                    "token endpoint returned {}: {}",
                    status,
                    body.get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("no access_token in response")
                ),
            })?;

        let lifetime = body
            .get("expires_in")
            .and_then(Value::as_i64)
            .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS);

        Ok(AccessToken::new(access_token, expiry_after(Utc::now(), lifetime)?))
    }
}

/// `expires_in` 來自網路，超出範圍或為負數都視為授權錯誤
fn expiry_after(now: DateTime<Utc>, lifetime_secs: i64) -> Result<DateTime<Utc>> {
    if lifetime_secs < 0 {
        return Err(EtlError::AuthError {
            message: format!("token endpoint returned negative expires_in: {}", lifetime_secs),
        });
    }
    chrono::TimeDelta::try_seconds(lifetime_secs)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .ok_or_else(|| EtlError::AuthError {
            message: format!("token endpoint returned out-of-range expires_in: {}", lifetime_secs),
        })
}

#[derive(Deserialize)]
struct StoredToken {
    token: String,
    expires_at: String,
}

/// Reads a token that an external credential store exported to disk.
///
/// Expected shape: `{"token": "...", "expires_at": "2024-03-01 10:15:00.000000"}`
/// (UTC). RFC 3339 timestamps are accepted too.
pub struct StoredTokenFile {
    path: PathBuf,
}

impl StoredTokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

pub(crate) fn parse_expiry(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| EtlError::AuthError {
            message: format!("invalid token expiry '{}': {}", raw, e),
        })
}

#[async_trait]
impl TokenSource for StoredTokenFile {
    async fn fetch_token(&self) -> Result<AccessToken> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let stored: StoredToken = serde_json::from_str(&content)?;
        let expires_at = parse_expiry(&stored.expires_at)?;
        Ok(AccessToken::new(stored.token, expires_at))
    }
}

/// Per-API token cache.
pub struct TokenManager {
    name: String,
    source: Arc<dyn TokenSource>,
    cached: Mutex<Option<AccessToken>>,
    refresh_margin: chrono::Duration,
}

impl TokenManager {
    pub fn new(
        name: impl Into<String>,
        source: Arc<dyn TokenSource>,
        refresh_margin: chrono::Duration,
    ) -> Self {
        Self {
            name: name.into(),
            source,
            cached: Mutex::new(None),
            refresh_margin,
        }
    }

    /// Returns a fresh token, refreshing at most once per expiry window.
    pub async fn token(&self) -> Result<String> {
        // lock 期間完成刷新，避免同時多次刷新
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.is_fresh_at(Utc::now(), self.refresh_margin) {
                return Ok(token.token().to_string());
            }
        }

        tracing::info!("🔑 Acquiring OAuth token for {}", self.name);
        let token = self.source.fetch_token().await?;
        tracing::debug!("🔑 {} token valid until {}", self.name, token.expires_at());

        let value = token.token().to_string();
        *cached = Some(token);
        Ok(value)
    }

    pub async fn invalidate(&self) {
        tracing::debug!("🔑 Dropping cached {} token", self.name);
        *self.cached.lock().await = None;
    }

    pub async fn authorization_header(&self) -> Result<String> {
        Ok(format!("{} {}", AUTH_SCHEME, self.token().await?))
    }
}
