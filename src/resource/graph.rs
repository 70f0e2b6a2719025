//! Azure Resource Graph fetcher
//!
//! Runs `where type=~'<type>' | <filter>` against the subscription and follows
//! `$skipToken` until every row has been read.

use super::fetcher::{ResourceDescriptor, ResourceFetcher};
use crate::azure::auth::Authenticator;
use crate::azure::http::AzureHttpClient;
use crate::config::{Configuration, Secrets};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

pub const RESOURCE_GRAPH_API_VERSION: &str = "2021-03-01";

/// Build the Resource Graph query for a resource type and optional filter
///
/// The filter text is appended verbatim.
pub fn build_query(resource_type: &str, filter: Option<&str>) -> String {
    let query = format!("where type=~'{}'", resource_type);
    match filter {
        Some(filter) if !filter.trim().is_empty() => format!("{} | {}", query, filter),
        _ => query,
    }
}

/// One page of query results
struct QueryPage {
    items: Vec<ResourceDescriptor>,
    skip_token: Option<String>,
}

/// Fetcher backed by Azure Resource Graph
#[derive(Clone)]
pub struct ResourceGraph<A> {
    http: AzureHttpClient,
    authenticator: A,
}

impl<A: Authenticator> ResourceGraph<A> {
    pub fn new(http: AzureHttpClient, authenticator: A) -> Self {
        Self {
            http,
            authenticator,
        }
    }

    async fn query_page(
        &self,
        url: &str,
        token: &str,
        subscription_id: &str,
        query: &str,
        skip_token: Option<&str>,
    ) -> Result<QueryPage> {
        let mut options = serde_json::Map::new();
        options.insert("resultFormat".to_string(), json!("objectArray"));
        if let Some(skip) = skip_token {
            options.insert("$skipToken".to_string(), Value::String(skip.to_string()));
        }

        let body = json!({
            "subscriptions": [subscription_id],
            "query": query,
            "options": Value::Object(options),
        });

        let response = self
            .http
            .post(url, token, Some(&body))
            .await
            .context("Resource Graph query failed")?;

        let items = extract_items(&response);
        let skip_token = response
            .get("$skipToken")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        Ok(QueryPage { items, skip_token })
    }
}

/// Rows missing `name` or `resourceGroup` are skipped
fn extract_items(response: &Value) -> Vec<ResourceDescriptor> {
    let Some(rows) = response.get("data").and_then(|v| v.as_array()) else {
        return vec![];
    };

    rows.iter()
        .filter_map(|row| match serde_json::from_value(row.clone()) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                tracing::warn!("Skipping resource graph row: {}", e);
                None
            }
        })
        .collect()
}

#[async_trait]
impl<A: Authenticator> ResourceFetcher for ResourceGraph<A> {
    async fn fetch(
        &self,
        filter: Option<&str>,
        resource_type: &str,
        secrets: &Secrets,
        configuration: &Configuration,
    ) -> Result<Vec<ResourceDescriptor>> {
        let query = build_query(resource_type, filter);
        tracing::debug!("Resource graph query: {}", query);

        let credential = self.authenticator.acquire(secrets).await?;
        let url = format!(
            "{}/providers/Microsoft.ResourceGraph/resources?api-version={}",
            credential.endpoints().management,
            RESOURCE_GRAPH_API_VERSION
        );

        let mut all_items = Vec::new();
        let mut skip_token: Option<String> = None;

        loop {
            let page = self
                .query_page(
                    &url,
                    credential.token(),
                    configuration.subscription_id(),
                    &query,
                    skip_token.as_deref(),
                )
                .await?;
            all_items.extend(page.items);

            match page.skip_token {
                None => break,
                Some(next) if skip_token.as_deref() == Some(next.as_str()) => {
                    tracing::warn!("Resource graph repeated skip token, stopping pagination");
                    break;
                }
                next => skip_token = next,
            }
        }

        Ok(all_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_without_filter() {
        assert_eq!(
            build_query("Microsoft.Compute/virtualMachines", None),
            "where type=~'Microsoft.Compute/virtualMachines'"
        );
    }

    #[test]
    fn test_query_appends_filter_verbatim() {
        let filter = "where resourceGroup==\"rg1\" and name==\"vm-a\"";
        assert_eq!(
            build_query("Microsoft.Compute/virtualMachines", Some(filter)),
            format!("where type=~'Microsoft.Compute/virtualMachines' | {}", filter)
        );
    }

    #[test]
    fn test_blank_filter_is_ignored() {
        assert_eq!(build_query("t", Some("  ")), "where type=~'t'");
    }

    #[test]
    fn test_extract_items_skips_incomplete_rows() {
        let response = json!({
            "data": [
                {"name": "vm-a", "resourceGroup": "rg1"},
                {"name": "orphan"},
                {"name": "vm-b", "resourceGroup": "rg2"}
            ]
        });
        let items = extract_items(&response);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], ResourceDescriptor::new("rg2", "vm-b"));
    }

    #[test]
    fn test_extract_items_without_data() {
        assert!(extract_items(&json!({"count": 0})).is_empty());
    }
}
