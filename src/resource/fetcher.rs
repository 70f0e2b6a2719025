//! Resource Fetcher
//!
//! Descriptor type and the seam through which candidates are fetched.

use crate::config::{Configuration, Secrets};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One resource returned by a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    pub name: String,
    #[serde(rename = "resourceGroup")]
    pub resource_group: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

impl ResourceDescriptor {
    pub fn new(resource_group: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            resource_group: resource_group.to_string(),
            id: None,
            location: None,
            resource_type: None,
        }
    }
}

impl fmt::Display for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource_group, self.name)
    }
}

/// Resolves a filter expression into matching resources
///
/// Implementations return an empty vector, not an error, when nothing matches.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    async fn fetch(
        &self,
        filter: Option<&str>,
        resource_type: &str,
        secrets: &Secrets,
        configuration: &Configuration,
    ) -> Result<Vec<ResourceDescriptor>>;
}
