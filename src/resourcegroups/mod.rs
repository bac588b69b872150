//! Azure resource groups.
//!
//! A resource group is the named, region-scoped container every other ARM
//! resource lives in. Deleting a group deletes everything inside it, which is
//! what the test fixture relies on for cleanup.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use azure_aci::auth::Authentication;
//! use azure_aci::resourcegroups::{Client, Group};
//! use azure_aci::RetryConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = Arc::new(Authentication::from_env()?);
//! let client = Client::new(auth, "example", RetryConfig::default())?;
//!
//! if !client.resource_group_exists("scratch").await? {
//!     client
//!         .create_resource_group("scratch", &Group::new("scratch", "westus"))
//!         .await?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;

use std::sync::Arc;

pub use api::{Group, GroupProperties, API_VERSION};

use crate::auth::Authentication;
use crate::client::{self, ApiError};
use crate::{HttpClientConfig, RetryConfig};

/// Resource group API client.
#[derive(Debug, Clone)]
pub struct Client {
    inner: client::Client,
}

impl Client {
    /// Creates a new resource group client.
    pub fn new(
        auth: Arc<Authentication>,
        user_agent: &str,
        retry: RetryConfig,
    ) -> Result<Self, ApiError> {
        Self::with_config(auth, user_agent, retry, HttpClientConfig::default())
    }

    /// Creates a new resource group client with custom HTTP configuration.
    pub fn with_config(
        auth: Arc<Authentication>,
        user_agent: &str,
        retry: RetryConfig,
        config: HttpClientConfig,
    ) -> Result<Self, ApiError> {
        Ok(Self {
            inner: client::Client::with_config(auth, user_agent, retry, config)?,
        })
    }

    /// Creates or updates the resource group `name`.
    pub async fn create_resource_group(&self, name: &str, group: &Group) -> Result<Group, ApiError> {
        let url = self.inner.url(&api::group_path(name), API_VERSION);
        self.inner.put_json(&url, group).await
    }

    /// Fetches the resource group `name`.
    pub async fn get_resource_group(&self, name: &str) -> Result<Group, ApiError> {
        let url = self.inner.url(&api::group_path(name), API_VERSION);
        self.inner.get_json(&url).await
    }

    /// Checks whether the resource group `name` exists.
    pub async fn resource_group_exists(&self, name: &str) -> Result<bool, ApiError> {
        let url = self.inner.url(&api::group_path(name), API_VERSION);
        self.inner.exists(&url).await
    }

    /// Deletes the resource group `name` and everything in it.
    ///
    /// ARM accepts the deletion asynchronously; this returns once the request
    /// is accepted, not when the group is gone.
    pub async fn delete_resource_group(&self, name: &str) -> Result<(), ApiError> {
        let url = self.inner.url(&api::group_path(name), API_VERSION);
        self.inner.delete(&url).await
    }
}
