//! Authenticated, retrying transport for Azure Resource Manager.
//!
//! Service clients ([`crate::resourcegroups::Client`], [`crate::network::Client`])
//! wrap this type and only deal with paths, api-versions and models.

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::auth::{AuthError, Authentication, TokenSource};
use crate::retry::{self, RetryConfig};
use crate::HttpClientConfig;

/// Prefix of the `User-Agent` header sent with every request.
pub const USER_AGENT_PREFIX: &str = concat!("azure-aci-rs/", env!("CARGO_PKG_VERSION"));

/// Errors that may occur when calling Azure Resource Manager.
#[derive(Debug, Error)]
pub enum ApiError {
    /// An HTTP request error occurred.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The bearer token could not be acquired.
    #[error("authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Failed to serialize/deserialize.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found")]
    NotFound,

    /// ARM rejected the request.
    #[error("API error ({status}): {code}: {message}")]
    Api {
        status: StatusCode,
        code: String,
        message: String,
    },
}

impl ApiError {
    /// Returns `true` if the resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }
}

/// ARM error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Base ARM client shared by the service clients.
#[derive(Debug, Clone)]
pub struct Client {
    http_client: reqwest::Client,
    auth: Arc<Authentication>,
    tokens: Arc<TokenSource>,
    retry: RetryConfig,
    base_url: String,
}

impl Client {
    /// Creates a new client.
    ///
    /// # Arguments
    ///
    /// * `auth` - Shared service-principal credentials
    /// * `user_agent` - Appended to the crate's user agent
    /// * `retry` - Retry policy for every request made by this client
    pub fn new(
        auth: Arc<Authentication>,
        user_agent: &str,
        retry: RetryConfig,
    ) -> Result<Self, ApiError> {
        Self::with_config(auth, user_agent, retry, HttpClientConfig::default())
    }

    /// Creates a new client with custom HTTP configuration.
    pub fn with_config(
        auth: Arc<Authentication>,
        user_agent: &str,
        retry: RetryConfig,
        config: HttpClientConfig,
    ) -> Result<Self, ApiError> {
        let user_agent = if user_agent.is_empty() {
            USER_AGENT_PREFIX.to_string()
        } else {
            format!("{} {}", USER_AGENT_PREFIX, user_agent)
        };

        let http_client = config.builder().user_agent(user_agent).build()?;
        let tokens = Arc::new(TokenSource::new(http_client.clone(), &auth).with_retry(retry));
        let base_url = auth.resource_manager_base().to_string();

        Ok(Self {
            http_client,
            auth,
            tokens,
            retry,
            base_url,
        })
    }

    pub fn authentication(&self) -> &Authentication {
        &self.auth
    }

    pub fn retry_config(&self) -> RetryConfig {
        self.retry
    }

    pub fn subscription_id(&self) -> &str {
        &self.auth.subscription_id
    }

    /// Builds a full URL for a subscription-relative path.
    pub(crate) fn url(&self, path: &str, api_version: &str) -> String {
        format!(
            "{}/subscriptions/{}{}?api-version={}",
            self.base_url, self.auth.subscription_id, path, api_version
        )
    }

    /// Sends a request, retrying according to the client's [`RetryConfig`].
    ///
    /// A 401 drops the cached token and the request is resent once with a
    /// fresh one. The final response is returned whatever its status; callers
    /// check it with [`check`].
    pub(crate) async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Response, ApiError> {
        let mut attempt = 0;
        let mut reauthenticated = false;

        loop {
            let token = self.tokens.token().await?;
            let mut request = self
                .http_client
                .request(method.clone(), url)
                .bearer_auth(token);
            if let Some(ref body) = body {
                request = request
                    .header(CONTENT_TYPE, "application/json")
                    .body(body.clone());
            }

            let outcome = request.send().await;

            if let Ok(response) = &outcome {
                if response.status() == StatusCode::UNAUTHORIZED && !reauthenticated {
                    debug!(%method, url, "access token rejected, refreshing");
                    self.tokens.invalidate().await;
                    reauthenticated = true;
                    continue;
                }
            }

            let (retryable, retry_after) = match &outcome {
                Ok(response) => (
                    RetryConfig::should_retry_status(response.status()),
                    retry::retry_after(response.status(), response.headers()),
                ),
                Err(err) => (RetryConfig::should_retry_error(err), None),
            };

            if !retryable || !self.retry.can_retry(attempt) {
                return outcome.map_err(ApiError::from);
            }

            let wait = self.retry.backoff(attempt, retry_after);
            debug!(
                %method,
                url,
                attempt = attempt + 1,
                wait_ms = wait.as_millis() as u64,
                "retrying request"
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, ApiError> {
        let response = self.send(Method::GET, url, None).await?;
        let response = check(response, &[StatusCode::OK]).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_vec(body)?;
        let response = self.send(Method::PUT, url, Some(body)).await?;
        let response = check(response, &[StatusCode::OK, StatusCode::CREATED]).await?;
        Ok(response.json().await?)
    }

    pub(crate) async fn delete(&self, url: &str) -> Result<(), ApiError> {
        let response = self.send(Method::DELETE, url, None).await?;
        check(
            response,
            &[StatusCode::OK, StatusCode::ACCEPTED, StatusCode::NO_CONTENT],
        )
        .await
        .map(|_| ())
    }

    /// Issues a HEAD request and reports whether the resource exists.
    pub(crate) async fn exists(&self, url: &str) -> Result<bool, ApiError> {
        let response = self.send(Method::HEAD, url, None).await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(false),
            status if status.is_success() => Ok(true),
            _ => check(response, &[]).await.map(|_| true),
        }
    }
}

/// Passes through responses with an expected status and decodes the ARM
/// error envelope for everything else.
pub(crate) async fn check(response: Response, expected: &[StatusCode]) -> Result<Response, ApiError> {
    let status = response.status();
    if expected.contains(&status) {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => return Err(ApiError::NotFound),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => return Err(ApiError::Unauthorized),
        _ => {}
    }

    let body = response.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorResponse>(&body) {
        Ok(parsed) => (parsed.error.code, parsed.error.message),
        Err(_) => (String::new(), body),
    };

    Err(ApiError::Api {
        status,
        code,
        message,
    })
}
