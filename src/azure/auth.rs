//! Azure Authentication
//!
//! Turns [`Secrets`] into a short-lived bearer token. The token is handed out
//! inside a [`CredentialScope`]; callers build their client from it and let the
//! scope drop right after.

use super::http::AzureHttpClient;
use crate::config::{AzureEndpoints, Credentials, Secrets};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// Scoped credential. Released when dropped.
pub struct CredentialScope {
    token: String,
    expires_on: Option<DateTime<Utc>>,
    endpoints: AzureEndpoints,
}

impl CredentialScope {
    pub fn new(token: &str, expires_on: Option<DateTime<Utc>>, endpoints: AzureEndpoints) -> Self {
        Self {
            token: token.to_string(),
            expires_on,
            endpoints,
        }
    }

    /// Bearer token for the management API
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Expiry reported by the token endpoint, if known
    pub fn expires_on(&self) -> Option<DateTime<Utc>> {
        self.expires_on
    }

    /// Endpoints of the cloud this credential was issued for
    pub fn endpoints(&self) -> &AzureEndpoints {
        &self.endpoints
    }

    /// Tokens without a known expiry never count as expired
    pub fn is_expired(&self) -> bool {
        self.expires_on.map(|at| at <= Utc::now()).unwrap_or(false)
    }
}

impl Drop for CredentialScope {
    fn drop(&mut self) {
        tracing::debug!("Credential scope released");
    }
}

/// Acquires scoped credentials from secrets
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn acquire(&self, secrets: &Secrets) -> Result<CredentialScope>;
}

/// Authenticator backed by the Microsoft identity platform
#[derive(Clone)]
pub struct AzureAuthenticator {
    http: AzureHttpClient,
    endpoints: Option<AzureEndpoints>,
}

impl AzureAuthenticator {
    /// Authenticate against the cloud named in the secrets
    pub fn new(http: AzureHttpClient) -> Self {
        Self {
            http,
            endpoints: None,
        }
    }

    /// Authenticate against fixed endpoints, whatever cloud the secrets name
    pub fn with_endpoints(http: AzureHttpClient, endpoints: AzureEndpoints) -> Self {
        Self {
            http,
            endpoints: Some(endpoints),
        }
    }

    fn endpoints_for(&self, secrets: &Secrets) -> AzureEndpoints {
        self.endpoints
            .clone()
            .unwrap_or_else(|| secrets.cloud.endpoints())
    }

    /// Client-credentials grant against `<authority>/<tenant>/oauth2/v2.0/token`
    async fn request_token(
        &self,
        endpoints: &AzureEndpoints,
        client_id: &str,
        client_secret: &str,
        tenant_id: &str,
    ) -> Result<CredentialScope> {
        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            endpoints.authority,
            urlencoding::encode(tenant_id)
        );
        let scope = endpoints.management_scope();

        let response = self
            .http
            .post_form(
                &url,
                &[
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                    ("scope", &scope),
                ],
            )
            .await
            .context("Failed to acquire Azure access token")?;

        let token = response
            .get("access_token")
            .and_then(|v| v.as_str())
            .context("Token response has no access_token")?;

        let expires_on = expires_in_seconds(&response)
            .map(|secs| Utc::now() + Duration::seconds(secs));

        tracing::debug!(
            "Acquired token for client {}, expires {:?}",
            client_id,
            expires_on
        );

        let credential = CredentialScope::new(token, expires_on, endpoints.clone());
        if credential.is_expired() {
            anyhow::bail!("Token endpoint returned an expired token");
        }
        Ok(credential)
    }
}

/// `expires_in` is a number on v2 endpoints and a string on some v1 ones
fn expires_in_seconds(response: &Value) -> Option<i64> {
    match response.get("expires_in")? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[async_trait]
impl Authenticator for AzureAuthenticator {
    async fn acquire(&self, secrets: &Secrets) -> Result<CredentialScope> {
        let endpoints = self.endpoints_for(secrets);

        match &secrets.credentials {
            Credentials::Token { access_token } => {
                tracing::debug!("Using pre-issued access token");
                Ok(CredentialScope::new(access_token, None, endpoints))
            }
            Credentials::ServicePrincipal {
                client_id,
                client_secret,
                tenant_id,
            } => {
                self.request_token(&endpoints, client_id, client_secret, tenant_id)
                    .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expires_in_number_or_string() {
        assert_eq!(expires_in_seconds(&json!({"expires_in": 3599})), Some(3599));
        assert_eq!(expires_in_seconds(&json!({"expires_in": "3600"})), Some(3600));
        assert_eq!(expires_in_seconds(&json!({})), None);
    }

    #[test]
    fn test_scope_without_expiry_never_expires() {
        let scope = CredentialScope::new("tok", None, crate::config::AzureCloud::Public.endpoints());
        assert!(!scope.is_expired());
        assert_eq!(scope.token(), "tok");
    }

    #[test]
    fn test_scope_past_expiry() {
        let scope = CredentialScope::new(
            "tok",
            Some(Utc::now() - Duration::seconds(5)),
            crate::config::AzureCloud::Public.endpoints(),
        );
        assert!(scope.is_expired());
    }

    #[tokio::test]
    async fn test_token_secrets_skip_the_network() {
        let auth = AzureAuthenticator::new(AzureHttpClient::new().unwrap());
        let scope = auth.acquire(&Secrets::token("pre-issued")).await.unwrap();
        assert_eq!(scope.token(), "pre-issued");
        assert_eq!(scope.endpoints().management, "https://management.azure.com");
    }
}
