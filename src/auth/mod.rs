//! Azure service-principal authentication.
//!
//! Credentials come from the SDK auth file produced by
//! `az ad sp create-for-rbac --sdk-auth`, located through the
//! `AZURE_AUTH_LOCATION` environment variable. The file is JSON with
//! camelCase keys, and the Azure CLI on Windows writes it as UTF-16, so both
//! encodings are accepted.
//!
//! # Example
//!
//! ```no_run
//! use azure_aci::auth::Authentication;
//!
//! let auth = Authentication::from_file("/path/to/azure-auth.json").unwrap();
//! println!("subscription: {}", auth.subscription_id);
//! ```

pub mod token;

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use token::TokenSource;

/// Environment variable holding the auth file path.
pub const AUTH_LOCATION_ENV: &str = "AZURE_AUTH_LOCATION";

/// Azure public cloud Active Directory endpoint.
pub const PUBLIC_ACTIVE_DIRECTORY_ENDPOINT: &str = "https://login.microsoftonline.com";

/// Azure public cloud Resource Manager endpoint.
pub const PUBLIC_RESOURCE_MANAGER_ENDPOINT: &str = "https://management.azure.com/";

/// Errors raised while loading credentials or acquiring a token.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("environment variable {0} is not set")]
    MissingLocation(&'static str),

    #[error("failed to read authentication file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode authentication file: {0}")]
    Decode(String),

    #[error("failed to parse authentication file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("authentication file is missing required field `{0}`")]
    MissingField(&'static str),

    #[error("token request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("token endpoint returned {status}: {message}")]
    Token { status: u16, message: String },
}

/// Service-principal credentials and the cloud endpoints they apply to.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub subscription_id: String,
    #[serde(default)]
    pub tenant_id: String,
    #[serde(rename = "activeDirectoryEndpointUrl", default = "default_ad_endpoint")]
    pub active_directory_endpoint: String,
    #[serde(rename = "resourceManagerEndpointUrl", default = "default_rm_endpoint")]
    pub resource_manager_endpoint: String,
    #[serde(
        rename = "activeDirectoryGraphResourceId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub graph_resource_id: Option<String>,
    #[serde(
        rename = "sqlManagementEndpointUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sql_management_endpoint: Option<String>,
    #[serde(
        rename = "galleryEndpointUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub gallery_endpoint: Option<String>,
    #[serde(
        rename = "managementEndpointUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub management_endpoint: Option<String>,
}

fn default_ad_endpoint() -> String {
    PUBLIC_ACTIVE_DIRECTORY_ENDPOINT.to_string()
}

fn default_rm_endpoint() -> String {
    PUBLIC_RESOURCE_MANAGER_ENDPOINT.to_string()
}

impl fmt::Debug for Authentication {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authentication")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("active_directory_endpoint", &self.active_directory_endpoint)
            .field("resource_manager_endpoint", &self.resource_manager_endpoint)
            .finish_non_exhaustive()
    }
}

impl Authentication {
    /// Creates credentials for the Azure public cloud.
    pub fn new(client_id: &str, client_secret: &str, subscription_id: &str, tenant_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            subscription_id: subscription_id.to_string(),
            tenant_id: tenant_id.to_string(),
            active_directory_endpoint: default_ad_endpoint(),
            resource_manager_endpoint: default_rm_endpoint(),
            graph_resource_id: None,
            sql_management_endpoint: None,
            gallery_endpoint: None,
            management_endpoint: None,
        }
    }

    /// Loads credentials from the file named by `AZURE_AUTH_LOCATION`.
    pub fn from_env() -> Result<Self, AuthError> {
        match std::env::var_os(AUTH_LOCATION_ENV) {
            Some(path) if !path.is_empty() => Self::from_file(path),
            _ => Err(AuthError::MissingLocation(AUTH_LOCATION_ENV)),
        }
    }

    /// Loads credentials from an SDK auth file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| AuthError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    /// Parses the raw contents of an SDK auth file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AuthError> {
        let text = decode(bytes)?;
        let auth: Self = serde_json::from_str(&text)?;
        auth.validate()?;
        Ok(auth)
    }

    fn validate(&self) -> Result<(), AuthError> {
        let required = [
            ("clientId", &self.client_id),
            ("clientSecret", &self.client_secret),
            ("subscriptionId", &self.subscription_id),
            ("tenantId", &self.tenant_id),
        ];
        match required.into_iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(AuthError::MissingField(field)),
            None => Ok(()),
        }
    }

    /// Resource Manager endpoint without a trailing slash.
    pub fn resource_manager_base(&self) -> &str {
        self.resource_manager_endpoint.trim_end_matches('/')
    }
}

/// Decodes UTF-8 (with or without BOM) and BOM-prefixed UTF-16.
fn decode(bytes: &[u8]) -> Result<String, AuthError> {
    match bytes {
        [0xEF, 0xBB, 0xBF, rest @ ..] => utf8(rest),
        [0xFF, 0xFE, rest @ ..] => utf16(rest, u16::from_le_bytes),
        [0xFE, 0xFF, rest @ ..] => utf16(rest, u16::from_be_bytes),
        _ => utf8(bytes),
    }
}

fn utf8(bytes: &[u8]) -> Result<String, AuthError> {
    String::from_utf8(bytes.to_vec()).map_err(|e| AuthError::Decode(e.to_string()))
}

fn utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, AuthError> {
    if bytes.len() % 2 != 0 {
        return Err(AuthError::Decode("odd number of bytes in UTF-16 input".into()));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| AuthError::Decode(e.to_string()))
}
