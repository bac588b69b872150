//! Azure virtual networks and subnets.
//!
//! Container groups deployed into a virtual network need a subnet delegated
//! to `Microsoft.ContainerInstance/containerGroups`. This client creates and
//! inspects those networks.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use azure_aci::auth::Authentication;
//! use azure_aci::network::{Client, Subnet, VirtualNetwork, CONTAINER_GROUP_SERVICE};
//! use azure_aci::RetryConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let auth = Arc::new(Authentication::from_env()?);
//! let client = Client::new(auth, "example", RetryConfig::default())?;
//!
//! let vnet = VirtualNetwork::new("vnet", "westus", vec!["10.0.0.0/16".into()]);
//! client.create_or_update_vnet("my-group", &vnet).await?;
//!
//! let subnet = Subnet::new("aci", "10.0.1.0/24").with_delegation("aci", CONTAINER_GROUP_SERVICE);
//! client.create_or_update_subnet("my-group", "vnet", &subnet).await?;
//! # Ok(())
//! # }
//! ```

pub mod api;

use std::sync::Arc;

pub use api::{
    AddressSpace, Delegation, DelegationProperties, Subnet, SubnetProperties, VirtualNetwork,
    VirtualNetworkProperties, API_VERSION, CONTAINER_GROUP_SERVICE,
};

use crate::auth::Authentication;
use crate::client::{self, ApiError};
use crate::{HttpClientConfig, RetryConfig};

/// Network API client.
#[derive(Debug, Clone)]
pub struct Client {
    inner: client::Client,
}

impl Client {
    /// Creates a new network client.
    pub fn new(
        auth: Arc<Authentication>,
        user_agent: &str,
        retry: RetryConfig,
    ) -> Result<Self, ApiError> {
        Self::with_config(auth, user_agent, retry, HttpClientConfig::default())
    }

    /// Creates a new network client with custom HTTP configuration.
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

    pub fn retry_config(&self) -> RetryConfig {
        self.inner.retry_config()
    }

    pub async fn create_or_update_vnet(
        &self,
        group: &str,
        vnet: &VirtualNetwork,
    ) -> Result<VirtualNetwork, ApiError> {
        let url = self.inner.url(&api::vnet_path(group, &vnet.name), API_VERSION);
        self.inner.put_json(&url, vnet).await
    }

    pub async fn get_vnet(&self, group: &str, name: &str) -> Result<VirtualNetwork, ApiError> {
        let url = self.inner.url(&api::vnet_path(group, name), API_VERSION);
        self.inner.get_json(&url).await
    }

    pub async fn delete_vnet(&self, group: &str, name: &str) -> Result<(), ApiError> {
        let url = self.inner.url(&api::vnet_path(group, name), API_VERSION);
        self.inner.delete(&url).await
    }

    pub async fn create_or_update_subnet(
        &self,
        group: &str,
        vnet: &str,
        subnet: &Subnet,
    ) -> Result<Subnet, ApiError> {
        let url = self
            .inner
            .url(&api::subnet_path(group, vnet, &subnet.name), API_VERSION);
        self.inner.put_json(&url, subnet).await
    }

    pub async fn get_subnet(&self, group: &str, vnet: &str, name: &str) -> Result<Subnet, ApiError> {
        let url = self.inner.url(&api::subnet_path(group, vnet, name), API_VERSION);
        self.inner.get_json(&url).await
    }
}
