//! Configuration Management
//!
//! Typed experiment configuration and secrets for chaosvm. Both are read from
//! JSON or YAML documents (or the environment) and validated once, here, so the
//! actions never deal with missing keys.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};

/// Environment variable consulted when no subscription is configured
pub const SUBSCRIPTION_ENV: &str = "AZURE_SUBSCRIPTION_ID";

/// Experiment configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Configuration {
    pub azure: AzureConfig,
}

/// Azure section of the experiment configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AzureConfig {
    pub subscription_id: String,
}

/// Shape accepted on the wire before validation
#[derive(Debug, Default, Deserialize)]
struct RawConfiguration {
    #[serde(default)]
    azure: Option<RawAzureConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAzureConfig {
    #[serde(default)]
    subscription_id: Option<String>,
}

impl Configuration {
    /// Build a configuration for a single subscription
    pub fn new(subscription_id: &str) -> Self {
        Self {
            azure: AzureConfig {
                subscription_id: subscription_id.to_string(),
            },
        }
    }

    /// Subscription the actions run against
    pub fn subscription_id(&self) -> &str {
        &self.azure.subscription_id
    }

    /// Validate an untyped configuration mapping
    ///
    /// Keys other than `azure.subscription_id` are ignored.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let raw: RawConfiguration =
            serde_json::from_value(value).map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let subscription_id = raw
            .azure
            .and_then(|azure| azure.subscription_id)
            .filter(|id| !id.trim().is_empty())
            .ok_or(ConfigError::MissingKey("azure.subscription_id"))?;

        Ok(Self::new(subscription_id.trim()))
    }

    /// Parse a JSON document
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Self::from_value(value)
    }

    /// Parse a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Self::from_value(value)
    }

    /// Read the subscription from `AZURE_SUBSCRIPTION_ID`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Read the subscription through a variable lookup
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(SUBSCRIPTION_ENV) {
            Some(id) if !id.trim().is_empty() => Ok(Self::new(id.trim())),
            _ => Err(ConfigError::MissingKey("azure.subscription_id")),
        }
    }

    /// Load configuration from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = Format::from_path(path)?;
        let content = read_file(path)?;
        match format {
            Format::Json => Self::from_json_str(&content),
            Format::Yaml => Self::from_yaml_str(&content),
        }
    }

    /// Resolve configuration: explicit file > default file > environment
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        if let Some(path) = default_config_path() {
            tracing::debug!("Loading configuration from {:?}", path);
            return Self::load(&path);
        }

        Self::from_env()
    }
}

/// Default config file location, if one exists
fn default_config_path() -> Option<PathBuf> {
    let dir = dirs::config_dir()?.join("chaosvm");
    ["config.yaml", "config.yml", "config.json"]
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.exists())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Format::Json),
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

// =============================================================================
// Clouds
// =============================================================================

/// Azure sovereign cloud selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AzureCloud {
    #[default]
    Public,
    China,
    UsGov,
    German,
}

impl AzureCloud {
    /// Parse the `azure_cloud` secrets value
    pub fn parse(name: &str) -> Result<Self, ConfigError> {
        match name.trim().to_ascii_uppercase().as_str() {
            "AZURE_PUBLIC_CLOUD" | "" => Ok(AzureCloud::Public),
            "AZURE_CHINA_CLOUD" => Ok(AzureCloud::China),
            "AZURE_US_GOV_CLOUD" => Ok(AzureCloud::UsGov),
            "AZURE_GERMAN_CLOUD" => Ok(AzureCloud::German),
            other => Err(ConfigError::Invalid(format!("unknown azure_cloud: {}", other))),
        }
    }

    /// Login and management endpoints for this cloud
    pub fn endpoints(&self) -> AzureEndpoints {
        let (authority, management) = match self {
            AzureCloud::Public => (
                "https://login.microsoftonline.com",
                "https://management.azure.com",
            ),
            AzureCloud::China => (
                "https://login.chinacloudapi.cn",
                "https://management.chinacloudapi.cn",
            ),
            AzureCloud::UsGov => (
                "https://login.microsoftonline.us",
                "https://management.usgovcloudapi.net",
            ),
            AzureCloud::German => (
                "https://login.microsoftonline.de",
                "https://management.microsoftazure.de",
            ),
        };
        AzureEndpoints::new(authority, management)
    }
}

/// Base URLs used to reach a cloud
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureEndpoints {
    /// Token authority host, e.g. `https://login.microsoftonline.com`
    pub authority: String,
    /// Resource manager host, e.g. `https://management.azure.com`
    pub management: String,
}

impl AzureEndpoints {
    pub fn new(authority: &str, management: &str) -> Self {
        Self {
            authority: authority.trim_end_matches('/').to_string(),
            management: management.trim_end_matches('/').to_string(),
        }
    }

    /// OAuth2 scope covering the management API
    pub fn management_scope(&self) -> String {
        format!("{}/.default", self.management)
    }
}

// =============================================================================
// Secrets
// =============================================================================

/// Credentials the authenticator turns into a bearer token
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Service principal, exchanged through the client-credentials grant
    ServicePrincipal {
        client_id: String,
        client_secret: String,
        tenant_id: String,
    },
    /// Pre-issued bearer token, used as-is
    Token { access_token: String },
}

/// Secrets bundle for one experiment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Secrets {
    pub credentials: Credentials,
    pub cloud: AzureCloud,
}

/// Never print secret material
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::ServicePrincipal {
                client_id,
                tenant_id,
                ..
            } => f
                .debug_struct("ServicePrincipal")
                .field("client_id", client_id)
                .field("tenant_id", tenant_id)
                .finish_non_exhaustive(),
            Credentials::Token { .. } => f.debug_struct("Token").finish_non_exhaustive(),
        }
    }
}

#[derive(Default, Deserialize)]
struct RawSecrets {
    #[serde(default)]
    client_id: Option<String>,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    tenant_id: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    azure_cloud: Option<String>,
}

impl Secrets {
    /// Service principal secrets for the public cloud
    pub fn service_principal(client_id: &str, client_secret: &str, tenant_id: &str) -> Self {
        Self {
            credentials: Credentials::ServicePrincipal {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
                tenant_id: tenant_id.to_string(),
            },
            cloud: AzureCloud::Public,
        }
    }

    /// Token secrets for the public cloud
    pub fn token(access_token: &str) -> Self {
        Self {
            credentials: Credentials::Token {
                access_token: access_token.to_string(),
            },
            cloud: AzureCloud::Public,
        }
    }

    /// Validate an untyped secrets mapping
    ///
    /// An `access_token` wins over service principal fields.
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let raw: RawSecrets =
            serde_json::from_value(value).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Parse a JSON document
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_json::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Self::from_value(value)
    }

    /// Parse a YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let value: Value =
            serde_yaml::from_str(content).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Self::from_value(value)
    }

    /// Load secrets from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let format = Format::from_path(path)?;
        let content = read_file(path)?;
        match format {
            Format::Json => Self::from_json_str(&content),
            Format::Yaml => Self::from_yaml_str(&content),
        }
    }

    /// Read secrets from the `AZURE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Read secrets through a variable lookup keyed by the `AZURE_*` names
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::from_raw(RawSecrets {
            client_id: lookup("AZURE_CLIENT_ID"),
            client_secret: lookup("AZURE_CLIENT_SECRET"),
            tenant_id: lookup("AZURE_TENANT_ID"),
            access_token: lookup("AZURE_ACCESS_TOKEN"),
            azure_cloud: lookup("AZURE_CLOUD"),
        })
    }

    fn from_raw(raw: RawSecrets) -> Result<Self, ConfigError> {
        let cloud = match raw.azure_cloud.as_deref() {
            Some(name) => AzureCloud::parse(name)?,
            None => AzureCloud::default(),
        };

        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        if let Some(access_token) = non_empty(raw.access_token) {
            return Ok(Self {
                credentials: Credentials::Token { access_token },
                cloud,
            });
        }

        let client_id = non_empty(raw.client_id).ok_or(ConfigError::MissingKey("client_id"))?;
        let client_secret =
            non_empty(raw.client_secret).ok_or(ConfigError::MissingKey("client_secret"))?;
        let tenant_id = non_empty(raw.tenant_id).ok_or(ConfigError::MissingKey("tenant_id"))?;

        Ok(Self {
            credentials: Credentials::ServicePrincipal {
                client_id,
                client_secret,
                tenant_id,
            },
            cloud,
        })
    }

    /// Resolve secrets: explicit file > environment
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Self::from_env(),
        }
    }
}
