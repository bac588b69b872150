//! Azure Resource Manager client for the container-instance virtual node.
//!
//! The crate wraps the handful of ARM endpoints the virtual node needs and
//! ships the fixture used to run the live network test suite against a
//! throwaway resource group.
//!
//! # Modules
//!
//! - [`auth`] - SDK auth file parsing and the client-credentials token exchange
//! - [`retry`] - Backoff policy shared by every API client
//! - [`client`] - Authenticated, retrying ARM transport
//! - [`resourcegroups`] - Resource group create/get/delete
//! - [`network`] - Virtual networks and subnets
//! - [`fixture`] - Test fixture lifecycle (feature `fixture`)
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use azure_aci::auth::Authentication;
//! use azure_aci::resourcegroups::{self, Group};
//! use azure_aci::RetryConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = Arc::new(Authentication::from_env()?);
//! let client = resourcegroups::Client::new(auth, "my-tool", RetryConfig::default())?;
//!
//! let group = client
//!     .create_resource_group("my-group", &Group::new("my-group", "westus"))
//!     .await?;
//! println!("created {}", group.name);
//!
//! client.delete_resource_group("my-group").await?;
//! # Ok(())
//! # }
//! ```

use std::net::IpAddr;
use std::time::Duration;

pub mod auth;
pub mod client;
pub mod network;
pub mod resourcegroups;
pub mod retry;

#[cfg(feature = "fixture")]
pub mod fixture;

pub use client::ApiError;
pub use retry::RetryConfig;

/// Default request timeout applied when [`HttpClientConfig::timeout`] is unset.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client configuration shared by every API client in the crate.
///
/// Allows binding outgoing connections to a specific local address or
/// network interface, and overriding the request timeout.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use azure_aci::HttpClientConfig;
///
/// let config = HttpClientConfig::new()
///     .timeout(Duration::from_secs(10))
///     .local_address("127.0.0.1".parse().unwrap());
/// assert_eq!(config.timeout, Some(Duration::from_secs(10)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Local IP address to bind outgoing connections to.
    pub local_address: Option<IpAddr>,
    /// Per-request timeout. Defaults to [`DEFAULT_TIMEOUT`].
    pub timeout: Option<Duration>,
    /// Network interface to bind to (Linux/macOS family only).
    pub interface: Option<String>,
}

impl HttpClientConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds outgoing connections to `addr`.
    pub fn local_address(mut self, addr: IpAddr) -> Self {
        self.local_address = Some(addr);
        self
    }

    /// Sets the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Binds outgoing connections to the named interface.
    pub fn interface(mut self, iface: impl Into<String>) -> Self {
        self.interface = Some(iface.into());
        self
    }

    /// Returns a reqwest builder with this configuration applied.
    pub(crate) fn builder(&self) -> reqwest::ClientBuilder {
        let mut builder = reqwest::Client::builder().timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT));

        if let Some(addr) = self.local_address {
            builder = builder.local_address(addr);
        }

        #[cfg(any(
            target_os = "android",
            target_os = "fuchsia",
            target_os = "linux",
            target_os = "macos",
            target_os = "ios",
            target_os = "tvos",
            target_os = "watchos",
            target_os = "illumos",
            target_os = "solaris",
        ))]
        if let Some(ref iface) = self.interface {
            builder = builder.interface(iface);
        }

        builder
    }
}
