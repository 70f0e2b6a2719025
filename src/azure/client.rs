//! Azure Compute Client
//!
//! Virtual machine lifecycle calls against the Azure Resource Manager REST API.

use super::auth::{Authenticator, CredentialScope};
use super::http::AzureHttpClient;
use crate::config::{Configuration, Secrets};
use crate::machine::status::InstanceStatus;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;

/// Compute API version used for every virtual machine call
pub const COMPUTE_API_VERSION: &str = "2023-03-01";

/// Lifecycle operations on one virtual machine, keyed by resource group and name
#[async_trait]
pub trait VirtualMachines: Send + Sync {
    async fn delete(&self, resource_group: &str, name: &str) -> Result<()>;
    async fn power_off(&self, resource_group: &str, name: &str) -> Result<()>;
    async fn restart(&self, resource_group: &str, name: &str) -> Result<()>;
    async fn start(&self, resource_group: &str, name: &str) -> Result<()>;
    async fn instance_view(&self, resource_group: &str, name: &str) -> Result<Vec<InstanceStatus>>;
}

/// Builds a management client from secrets and configuration
#[async_trait]
pub trait ClientProvider: Send + Sync {
    type Client: VirtualMachines;

    async fn client(&self, secrets: &Secrets, configuration: &Configuration) -> Result<Self::Client>;
}

/// Compute client bound to one subscription
#[derive(Clone)]
pub struct ComputeClient {
    http: AzureHttpClient,
    token: String,
    management: String,
    subscription_id: String,
}

impl ComputeClient {
    /// Bind a client to a subscription using a scoped credential
    ///
    /// The client copies the bearer token, so the scope may be dropped afterwards.
    pub fn new(http: AzureHttpClient, credential: &CredentialScope, subscription_id: &str) -> Self {
        Self {
            http,
            token: credential.token().to_string(),
            management: credential.endpoints().management.clone(),
            subscription_id: subscription_id.to_string(),
        }
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Build the ARM URL of a virtual machine, with an optional action suffix
    pub fn machine_url(&self, resource_group: &str, name: &str, action: Option<&str>) -> String {
        let base = format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/virtualMachines/{}",
            self.management,
            urlencoding::encode(&self.subscription_id),
            urlencoding::encode(resource_group),
            urlencoding::encode(name)
        );

        match action {
            Some(action) => format!("{}/{}?api-version={}", base, action, COMPUTE_API_VERSION),
            None => format!("{}?api-version={}", base, COMPUTE_API_VERSION),
        }
    }

    /// POST to `action` on the machine; `verb` names the operation in errors
    async fn post_action(
        &self,
        resource_group: &str,
        name: &str,
        action: &str,
        verb: &str,
    ) -> Result<()> {
        let url = self.machine_url(resource_group, name, Some(action));
        self.http
            .post(&url, &self.token, None)
            .await
            .with_context(|| format!("Failed to {} machine {}/{}", verb, resource_group, name))?;
        Ok(())
    }
}

#[async_trait]
impl VirtualMachines for ComputeClient {
    async fn delete(&self, resource_group: &str, name: &str) -> Result<()> {
        let url = self.machine_url(resource_group, name, None);
        self.http
            .delete(&url, &self.token)
            .await
            .with_context(|| format!("Failed to delete machine {}/{}", resource_group, name))?;
        Ok(())
    }

    async fn power_off(&self, resource_group: &str, name: &str) -> Result<()> {
        self.post_action(resource_group, name, "powerOff", "power off")
            .await
    }

    async fn restart(&self, resource_group: &str, name: &str) -> Result<()> {
        self.post_action(resource_group, name, "restart", "restart")
            .await
    }

    async fn start(&self, resource_group: &str, name: &str) -> Result<()> {
        self.post_action(resource_group, name, "start", "start")
            .await
    }

    async fn instance_view(&self, resource_group: &str, name: &str) -> Result<Vec<InstanceStatus>> {
        let url = self.machine_url(resource_group, name, Some("instanceView"));
        let response = self.http.get(&url, &self.token).await.with_context(|| {
            format!("Failed to get instance view of {}/{}", resource_group, name)
        })?;

        Ok(parse_statuses(&response))
    }
}

/// Extract `statuses[].code` from an instance view response
fn parse_statuses(response: &Value) -> Vec<InstanceStatus> {
    response
        .get("statuses")
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|s| s.get("code").and_then(|c| c.as_str()))
                .map(InstanceStatus::new)
                .collect()
        })
        .unwrap_or_default()
}

/// Provider wiring [`AzureAuthenticator`](super::auth::AzureAuthenticator) to [`ComputeClient`]
#[derive(Clone)]
pub struct AzureClientProvider<A> {
    http: AzureHttpClient,
    authenticator: A,
}

impl<A: Authenticator> AzureClientProvider<A> {
    pub fn new(http: AzureHttpClient, authenticator: A) -> Self {
        Self {
            http,
            authenticator,
        }
    }
}

#[async_trait]
impl<A: Authenticator> ClientProvider for AzureClientProvider<A> {
    type Client = ComputeClient;

    async fn client(&self, secrets: &Secrets, configuration: &Configuration) -> Result<ComputeClient> {
        let client = {
            let credential = self.authenticator.acquire(secrets).await?;
            ComputeClient::new(self.http.clone(), &credential, configuration.subscription_id())
        };

        tracing::debug!(
            "Compute client ready for subscription {}",
            client.subscription_id()
        );
        Ok(client)
    }
}
