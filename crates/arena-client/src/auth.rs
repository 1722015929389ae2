//! Trade-confirmation session tokens.
//!
//! Placing an order requires a session token. Tokens are cached on disk
//! with an expiry; a missing or expired token means the caller must run the
//! confirmation step, which manufactures a fresh token. This is a paper
//! venue: confirmation always succeeds, the ceremony exists so the flow
//! matches a real one.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::config::AuthConfig;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to read token cache {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write token cache {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("token cache is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error(transparent)]
    Api(#[from] ApiError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedToken {
    token: String,
    user_id: i64,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Disk-backed session token manager.
#[derive(Debug)]
pub struct SessionAuth {
    token_path: PathBuf,
    ttl: Duration,
    cached: Option<CachedToken>,
}

impl SessionAuth {
    /// Load from disk. An unreadable or expired cache starts empty rather
    /// than failing.
    pub fn load(config: &AuthConfig) -> Self {
        let cached = match std::fs::read_to_string(&config.token_path) {
            Ok(raw) => match serde_json::from_str::<CachedToken>(&raw) {
                Ok(token) if !token.is_expired(Utc::now()) => Some(token),
                Ok(_) => {
                    debug!("cached session token expired, discarding");
                    None
                }
                Err(err) => {
                    warn!(error = %err, "token cache is corrupt, discarding");
                    None
                }
            },
            Err(_) => None,
        };
        Self {
            token_path: config.token_path.clone(),
            ttl: config.ttl,
            cached,
        }
    }

    /// The current token, if one is cached and unexpired.
    pub fn token(&self) -> Option<&str> {
        self.cached
            .as_ref()
            .filter(|t| !t.is_expired(Utc::now()))
            .map(|t| t.token.as_str())
    }

    /// True when an order can go out without the confirmation step.
    pub fn has_valid_token(&self) -> bool {
        self.token().is_some()
    }

    /// Check the cached token against the backend. A token the backend no
    /// longer recognizes is cleared.
    pub async fn verify(&mut self, api: &ApiClient) -> Result<bool, AuthError> {
        let Some(token) = self.token().map(str::to_string) else {
            return Ok(false);
        };
        let valid = api.verify_session(&token).await?;
        if !valid {
            debug!("backend rejected cached session token, clearing");
            self.clear()?;
        }
        Ok(valid)
    }

    /// Run the confirmation step: manufacture a token, cache it, return it.
    /// Always succeeds on this venue.
    pub fn confirm_intent(&mut self, user_id: i64) -> Result<String, AuthError> {
        let ttl = chrono::TimeDelta::from_std(self.ttl).unwrap_or(chrono::TimeDelta::hours(24));
        let token = CachedToken {
            token: uuid::Uuid::new_v4().to_string(),
            user_id,
            expires_at: Utc::now() + ttl,
        };
        self.persist(&token)?;
        let value = token.token.clone();
        self.cached = Some(token);
        Ok(value)
    }

    /// Drop the token from memory and disk.
    pub fn clear(&mut self) -> Result<(), AuthError> {
        self.cached = None;
        match std::fs::remove_file(&self.token_path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(AuthError::Write {
                path: self.token_path.display().to_string(),
                source,
            }),
        }
    }

    fn persist(&self, token: &CachedToken) -> Result<(), AuthError> {
        if let Some(parent) = self.token_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| AuthError::Write {
                    path: parent.display().to_string(),
                    source,
                })?;
            }
        }
        let raw = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.token_path, raw).map_err(|source| AuthError::Write {
            path: self.token_path.display().to_string(),
            source,
        })
    }
}
