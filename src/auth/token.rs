//! OAuth2 client-credentials token exchange against Azure Active Directory.
//!
//! Tokens are cached and reused until they come within [`REFRESH_WINDOW`] of
//! expiry. Token requests follow the same [`RetryConfig`] as ARM requests.

use std::time::{Duration, Instant};

use reqwest::header::CONTENT_TYPE;
use reqwest::Response;
use serde::{Deserialize, Deserializer};
use tokio::sync::Mutex;
use tracing::debug;

use super::{AuthError, Authentication};
use crate::retry::{self, RetryConfig};

/// Tokens are refreshed once they are this close to expiring.
pub const REFRESH_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_LIFETIME: Duration = Duration::from_secs(3600);

/// URL-encode a string for use in a form body.
fn url_encode(s: &str) -> String {
    let mut encoded = String::new();
    for c in s.chars() {
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' | '~' => encoded.push(c),
            _ => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).as_bytes() {
                    encoded.push_str(&format!("%{:02X}", byte));
                }
            }
        }
    }
    encoded
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default, deserialize_with = "seconds")]
    expires_in: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

/// AAD returns `expires_in` as a string on the v1 endpoint and as a number on v2.
fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(u64),
        Text(String),
    }

    Ok(match Option::<Seconds>::deserialize(deserializer)? {
        Some(Seconds::Number(n)) => Some(n),
        Some(Seconds::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + REFRESH_WINDOW < self.expires_at
    }
}

/// Acquires and caches bearer tokens for a service principal.
#[derive(Debug)]
pub struct TokenSource {
    http_client: reqwest::Client,
    token_url: String,
    form: String,
    retry: RetryConfig,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenSource {
    /// Creates a token source for `auth`, scoped to its Resource Manager endpoint.
    ///
    /// Token requests are not retried until a policy is set with [`Self::with_retry`].
    pub fn new(http_client: reqwest::Client, auth: &Authentication) -> Self {
        let token_url = format!(
            "{}/{}/oauth2/token?api-version=1.0",
            auth.active_directory_endpoint.trim_end_matches('/'),
            auth.tenant_id
        );
        let form = format!(
            "grant_type=client_credentials&client_id={}&client_secret={}&resource={}",
            url_encode(&auth.client_id),
            url_encode(&auth.client_secret),
            url_encode(&auth.resource_manager_endpoint)
        );

        Self {
            http_client,
            token_url,
            form,
            retry: RetryConfig::none(),
            cached: Mutex::new(None),
        }
    }

    /// Retries transient token endpoint failures according to `retry`.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Returns a valid access token, fetching a new one if needed.
    pub async fn token(&self) -> Result<String, AuthError> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.access_token.clone());
        }

        let token = self.fetch().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }

    /// Drops the cached token so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        self.cached.lock().await.take();
    }

    async fn fetch(&self) -> Result<CachedToken, AuthError> {
        let mut attempt = 0;

        loop {
            debug!(url = %self.token_url, attempt, "requesting access token");

            let outcome = self
                .http_client
                .post(&self.token_url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(self.form.clone())
                .send()
                .await;
            let (retryable, retry_after) = match &outcome {
                Ok(response) => (
                    RetryConfig::should_retry_status(response.status()),
                    retry::retry_after(response.status(), response.headers()),
                ),
                Err(err) => (RetryConfig::should_retry_error(err), None),
            };

            if !retryable || !self.retry.can_retry(attempt) {
                return Self::parse(outcome?).await;
            }

            let wait = self.retry.backoff(attempt, retry_after);
            debug!(
                attempt = attempt + 1,
                wait_ms = wait.as_millis() as u64,
                "retrying token request"
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }

    async fn parse(response: Response) -> Result<CachedToken, AuthError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed: TokenErrorResponse = serde_json::from_str(&body).unwrap_or_default();
            let message = match (parsed.error.is_empty(), parsed.error_description.is_empty()) {
                (false, false) => format!("{}: {}", parsed.error, parsed.error_description),
                (false, true) => parsed.error,
                _ => body,
            };
            return Err(AuthError::Token {
                status: status.as_u16(),
                message,
            });
        }

        let response: TokenResponse = response.json().await?;
        let lifetime = response
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LIFETIME);

        Ok(CachedToken {
            access_token: response.access_token,
            expires_at: expiry(Instant::now(), lifetime),
        })
    }
}

/// `now + lifetime`, falling back to [`DEFAULT_LIFETIME`] when that overflows.
fn expiry(now: Instant, lifetime: Duration) -> Instant {
    now.checked_add(lifetime).unwrap_or(now + DEFAULT_LIFETIME)
}
