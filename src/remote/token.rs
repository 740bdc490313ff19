//! Access tokens for authenticated remote stores
//!
//! A `TokenCache` is a plain value handed to the store that uses it; there is
//! no process-wide token state. When the cached token expires the store asks
//! its `TokenSource` for a new one. How the source obtains tokens (OAuth
//! flows, service accounts) is outside this crate.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use super::traits::{RemoteError, RemoteResult};

/// Tokens this close to expiry are treated as expired
const EXPIRY_SKEW_SECS: i64 = 60;

/// A bearer token and its expiry
#[derive(Clone, PartialEq, Eq)]
pub struct TokenCache {
    token: String,
    expires_at: DateTime<Utc>,
}

impl TokenCache {
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

    /// Whether the token can still be used at `now`
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_SKEW_SECS) < self.expires_at
    }
}

impl std::fmt::Debug for TokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCache")
            .field("token", &"***")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Supplies fresh access tokens
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self) -> RemoteResult<TokenCache>;
}

/// A token provided by the operator, e.g. through `STOREVAULT_DRIVE_TOKEN`
pub struct StaticTokenSource {
    token: Option<String>,
    lifetime: Duration,
}

impl StaticTokenSource {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.filter(|t| !t.is_empty()),
            lifetime: Duration::hours(1),
        }
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn fetch(&self) -> RemoteResult<TokenCache> {
        let token = self.token.as_ref().ok_or_else(|| {
            RemoteError::Unauthorized("no access token configured for the remote store".into())
        })?;
        Ok(TokenCache::new(token.clone(), Utc::now() + self.lifetime))
    }
}
