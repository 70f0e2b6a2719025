//! HTTP utilities for Azure REST API calls

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Header Azure echoes back so a request can be traced in activity logs
const CLIENT_REQUEST_ID_HEADER: &str = "x-ms-client-request-id";

/// Leading text of the error returned for non-success responses
const API_FAILURE_PREFIX: &str = "API request failed";

/// Sanitize response body for logging
/// Truncates long responses and drops non-printable characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut cut = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP client wrapper for Azure API calls
#[derive(Clone)]
pub struct AzureHttpClient {
    client: Client,
}

impl AzureHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("chaosvm/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// Make a GET request
    pub async fn get(&self, url: &str, token: &str) -> Result<Value> {
        tracing::debug!("GET {}", url);
        let request = self.client.get(url).bearer_auth(token);
        self.send(request).await
    }

    /// Make a POST request with an optional JSON body
    pub async fn post(&self, url: &str, token: &str, body: Option<&Value>) -> Result<Value> {
        tracing::debug!("POST {}", url);

        let mut request = self.client.post(url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        self.send(request).await
    }

    /// Make an unauthenticated form POST (token endpoint)
    pub async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<Value> {
        tracing::debug!("POST {} (form)", url);
        let request = self.client.post(url).form(form);
        self.send(request).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, url: &str, token: &str) -> Result<Value> {
        tracing::debug!("DELETE {}", url);
        let request = self.client.delete(url).bearer_auth(token);
        self.send(request).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value> {
        let request_id = uuid::Uuid::new_v4().to_string();

        let response = request
            .header(CLIENT_REQUEST_ID_HEADER, &request_id)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Only the sanitized, truncated body is logged
            tracing::error!(
                "API error: {} (request id {}) - {}",
                status,
                request_id,
                sanitize_for_log(&body)
            );
            return Err(anyhow::anyhow!("{}: {}", API_FAILURE_PREFIX, status));
        }

        // 202 Accepted and 204 No Content come back without a body
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).context("Failed to parse response JSON")
    }
}

/// Format an Azure API error for display
/// Maps common status codes to short hints without echoing API details
///
/// Call sites wrap HTTP failures in context, so the status line is looked up
/// anywhere in the error chain.
pub fn format_azure_error(error: &anyhow::Error) -> String {
    let api_failure = error
        .chain()
        .map(|cause| cause.to_string())
        .find(|message| message.starts_with(API_FAILURE_PREFIX));

    if let Some(message) = api_failure {
        return format_api_failure(&message);
    }

    let error_str = format!("{:#}", error);
    let sanitized = error_str
        .chars()
        .filter(|c| c.is_ascii_graphic() || *c == ' ')
        .take(80)
        .collect::<String>();

    if sanitized.len() < error_str.len() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}

/// Short hint for an `API request failed: <status>` message
fn format_api_failure(error_str: &str) -> String {
    if error_str.contains("403") {
        return "Permission denied. Check the role assignments of your service principal."
            .to_string();
    }
    if error_str.contains("401") {
        return "Authentication failed. Check client_id, client_secret and tenant_id.".to_string();
    }
    if error_str.contains("404") {
        return "Resource not found.".to_string();
    }
    if error_str.contains("429") {
        return "Rate limit exceeded. Please try again later.".to_string();
    }
    if error_str.contains("400") {
        return "Invalid request. Check your filter expression.".to_string();
    }
    if error_str.contains("409") {
        return "Conflict. The machine may be in a transitional state.".to_string();
    }
    if error_str.contains("500") || error_str.contains("503") {
        return "Azure service temporarily unavailable. Please try again.".to_string();
    }
    "Request failed. Check your network connection and try again.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(MAX_LOG_BODY_LENGTH)));
        assert!(sanitized.contains("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("a\nb\tc d"), "abc d");
    }

    #[test]
    fn test_format_permission_denied() {
        let err = anyhow::anyhow!("API request failed: 403 Forbidden");
        assert!(format_azure_error(&err).starts_with("Permission denied"));
    }

    #[test]
    fn test_format_finds_status_behind_context() {
        let err = anyhow::anyhow!("API request failed: 403 Forbidden")
            .context("Failed to restart machine rg1/vm-a");
        assert!(format_azure_error(&err).starts_with("Permission denied"));
    }

    #[test]
    fn test_format_ignores_digits_in_context() {
        let err = anyhow::anyhow!("API request failed: 409 Conflict")
            .context("Failed to delete machine rg-403/vm-404");
        assert!(format_azure_error(&err).starts_with("Conflict"));
    }

    #[test]
    fn test_format_unknown_status_falls_back_to_generic_hint() {
        let err = anyhow::anyhow!("API request failed: 418 I'm a teapot").context("outer");
        assert!(format_azure_error(&err).starts_with("Request failed"));
    }

    #[test]
    fn test_format_unknown_error_is_truncated() {
        let err = anyhow::anyhow!("{}", "e".repeat(120));
        let formatted = format_azure_error(&err);
        assert!(formatted.ends_with("..."));
        assert_eq!(formatted.len(), 83);
    }
}
