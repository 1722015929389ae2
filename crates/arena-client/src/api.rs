//! HTTP surface of the venue.
//!
//! The WebSocket carries the hot path; these endpoints cover everything
//! request/response shaped: account management, order cancellation, the
//! symbol directory and session-token verification.

use reqwest::Url;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use arena_common::Account;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid server url {url}: {reason}")]
    BadUrl { url: String, reason: String },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// A tradable symbol from the directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SymbolInfo {
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    pub market: String,
}

#[derive(Debug, Serialize)]
struct CreateAccountBody<'a> {
    user_id: i64,
    name: &'a str,
    initial_capital: Decimal,
}

#[derive(Debug, Serialize)]
struct RenameAccountBody<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct VerifyTokenBody<'a> {
    token: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyTokenResponse {
    valid: bool,
}

/// Thin typed wrapper over the venue's REST endpoints.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(server_url: &str) -> Result<Self, ApiError> {
        let base = Url::parse(server_url).map_err(|err| ApiError::BadUrl {
            url: server_url.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    /// WebSocket endpoint derived from the HTTP base: scheme flips to
    /// ws/wss, path is `/ws`.
    pub fn ws_url(&self) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        // set_scheme only rejects invalid transitions; ws(s) from http(s) is fine
        if url.set_scheme(scheme).is_err() {
            return Err(ApiError::BadUrl {
                url: self.base.to_string(),
                reason: format!("cannot switch scheme to {}", scheme),
            });
        }
        url.set_path("/ws");
        Ok(url)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base.join(path).map_err(|err| ApiError::BadUrl {
            url: format!("{}{}", self.base, path),
            reason: err.to_string(),
        })
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::Status { status, body })
        }
    }

    /// All accounts visible to the current user.
    pub async fn get_accounts(&self, user_id: i64) -> Result<Vec<Account>, ApiError> {
        let url = self.endpoint("/api/accounts")?;
        let response = self
            .http
            .get(url)
            .query(&[("user_id", user_id)])
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn create_account(
        &self,
        user_id: i64,
        name: &str,
        initial_capital: Decimal,
    ) -> Result<Account, ApiError> {
        let url = self.endpoint("/api/accounts")?;
        let body = CreateAccountBody {
            user_id,
            name,
            initial_capital,
        };
        let response = self.http.post(url).json(&body).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    pub async fn rename_account(&self, account_id: i64, name: &str) -> Result<Account, ApiError> {
        let url = self.endpoint(&format!("/api/accounts/{}", account_id))?;
        let response = self
            .http
            .put(url)
            .json(&RenameAccountBody { name })
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Cancel a pending order. State catches up via the next snapshot.
    pub async fn cancel_order(&self, order_id: i64) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("/api/orders/{}/cancel", order_id))?;
        let response = self.http.post(url).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    /// The tradable symbol directory.
    pub async fn get_symbols(&self) -> Result<Vec<SymbolInfo>, ApiError> {
        let url = self.endpoint("/api/crypto/symbols")?;
        let response = self.http.get(url).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    /// Ask the venue whether a cached session token is still good.
    pub async fn verify_session(&self, token: &str) -> Result<bool, ApiError> {
        let url = self.endpoint("/api/account/auth/verify")?;
        let response = self
            .http
            .post(url)
            .json(&VerifyTokenBody { token })
            .send()
            .await?;
        let body: VerifyTokenResponse = Self::check(response).await?.json().await?;
        Ok(body.valid)
    }
}
