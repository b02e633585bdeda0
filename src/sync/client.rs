//! HTTP client for the sync server.

use serde::de::DeserializeOwned;

use super::protocol::{FeedResponse, PullResponse, PushResponse, SyncRequest};
use super::SyncTransport;
use crate::config::SyncConfig;
use crate::models::ChangeRecord;

/// Errors that can occur while talking to the sync server.
#[derive(Debug, thiserror::Error)]
pub enum SyncClientError {
    #[error("Sync not configured. Set sync.server_url in config or JAGDLOG_SYNC_URL.")]
    NotConfigured,

    #[error("Connection error: {0}")]
    Connection(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Sync client for a single server.
#[derive(Debug, Clone)]
pub struct SyncClient {
    base_url: String,
    http: reqwest::Client,
}

impl SyncClient {
    /// Creates a client from config.
    ///
    /// Returns an error if no server URL is configured.
    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncClientError> {
        let server_url = config
            .server_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(SyncClientError::NotConfigured)?;
        Ok(Self::new(server_url))
    }

    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&server_url.into()),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Returns true if `GET /health` answers with a success status.
    pub async fn check_server(&self) -> bool {
        match self.http.get(self.endpoint("/health")).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(url = %self.base_url, "health check failed: {}", e);
                false
            }
        }
    }

    /// Stateless read of recent changes via `GET /api/sync`.
    pub async fn feed(&self, since: Option<&str>) -> Result<FeedResponse, SyncClientError> {
        let mut request = self.http.get(self.endpoint("/api/sync"));
        if let Some(since) = since {
            request = request.query(&[("since", since)]);
        }
        decode(request.send().await?).await
    }

    async fn post_sync<T: DeserializeOwned>(&self, body: &SyncRequest) -> Result<T, SyncClientError> {
        let response = self
            .http
            .post(self.endpoint("/api/sync"))
            .json(body)
            .send()
            .await?;
        decode(response).await
    }
}

impl SyncTransport for SyncClient {
    async fn push(&self, changes: &[ChangeRecord]) -> Result<PushResponse, SyncClientError> {
        tracing::debug!(count = changes.len(), "pushing changes");
        self.post_sync(&SyncRequest::push(changes.to_vec())).await
    }

    async fn pull(&self, since: Option<&str>) -> Result<PullResponse, SyncClientError> {
        tracing::debug!(since = since.unwrap_or("-"), "pulling changes");
        self.post_sync(&SyncRequest::pull(since)).await
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, SyncClientError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SyncClientError::Http {
            status: status.as_u16(),
            body,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|e| SyncClientError::Decode(e.to_string()))
}

/// Adds a scheme to bare hosts and drops trailing slashes.
fn normalize_base_url(server_url: &str) -> String {
    let trimmed = server_url.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_with_http() {
        let client = SyncClient::new("http://localhost:8080");
        assert_eq!(client.endpoint("/api/sync"), "http://localhost:8080/api/sync");
    }

    #[test]
    fn test_endpoint_with_https_and_trailing_slash() {
        let client = SyncClient::new("https://sync.example.com/");
        assert_eq!(
            client.endpoint("/health"),
            "https://sync.example.com/health"
        );
    }

    #[test]
    fn test_endpoint_bare_host() {
        let client = SyncClient::new("localhost:8080");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_from_config_requires_server_url() {
        let mut config = SyncConfig::default();
        assert!(matches!(
            SyncClient::from_config(&config),
            Err(SyncClientError::NotConfigured)
        ));

        config.server_url = Some("  ".to_string());
        assert!(SyncClient::from_config(&config).is_err());

        config.server_url = Some("http://jagd.example.com".to_string());
        let client = SyncClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://jagd.example.com");
    }

    #[tokio::test]
    async fn test_check_server_unreachable() {
        // Port 9 (discard) is closed on test machines.
        let client = SyncClient::new("http://127.0.0.1:9");
        assert!(!client.check_server().await);
    }
}
