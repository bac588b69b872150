//! Virtual network and subnet wire models.
//!
//! # API Reference
//!
//! - [Virtual Networks](https://learn.microsoft.com/rest/api/virtualnetwork/virtual-networks)
//! - [Subnets](https://learn.microsoft.com/rest/api/virtualnetwork/subnets)

use serde::{Deserialize, Serialize};

/// Network api-version.
pub const API_VERSION: &str = "2018-08-01";

/// Delegation service name for container groups.
pub const CONTAINER_GROUP_SERVICE: &str = "Microsoft.ContainerInstance/containerGroups";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetwork {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default)]
    pub properties: VirtualNetworkProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    #[serde(default)]
    pub address_space: AddressSpace,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subnets: Vec<Subnet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subnet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: SubnetProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    #[serde(default)]
    pub address_prefix: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delegations: Vec<Delegation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub properties: DelegationProperties,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationProperties {
    #[serde(default)]
    pub service_name: String,
}

impl VirtualNetwork {
    /// Creates a virtual network definition covering `prefixes`.
    pub fn new(name: &str, location: &str, prefixes: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            location: location.to_string(),
            properties: VirtualNetworkProperties {
                address_space: AddressSpace {
                    address_prefixes: prefixes,
                },
                ..VirtualNetworkProperties::default()
            },
            ..Self::default()
        }
    }

    /// Looks up an embedded subnet by name.
    pub fn subnet(&self, name: &str) -> Option<&Subnet> {
        self.properties.subnets.iter().find(|s| s.name == name)
    }
}

impl Subnet {
    pub fn new(name: &str, address_prefix: &str) -> Self {
        Self {
            name: name.to_string(),
            properties: SubnetProperties {
                address_prefix: address_prefix.to_string(),
                ..SubnetProperties::default()
            },
            ..Self::default()
        }
    }

    /// Delegates the subnet to `service_name`.
    pub fn with_delegation(mut self, name: &str, service_name: &str) -> Self {
        self.properties.delegations.push(Delegation {
            name: name.to_string(),
            properties: DelegationProperties {
                service_name: service_name.to_string(),
            },
        });
        self
    }

    /// Returns `true` if the subnet is delegated to `service_name`.
    pub fn is_delegated_to(&self, service_name: &str) -> bool {
        self.properties
            .delegations
            .iter()
            .any(|d| d.properties.service_name.eq_ignore_ascii_case(service_name))
    }
}

pub(crate) fn vnet_path(group: &str, name: &str) -> String {
    format!(
        "/resourceGroups/{}/providers/Microsoft.Network/virtualNetworks/{}",
        group, name
    )
}

pub(crate) fn subnet_path(group: &str, vnet: &str, name: &str) -> String {
    format!("{}/subnets/{}", vnet_path(group, vnet), name)
}
