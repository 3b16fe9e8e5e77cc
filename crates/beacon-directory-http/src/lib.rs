// # HTTP Directory Client
//
// This crate provides the HTTP implementation of `DirectoryClient`.
//
// Every directory operation is a single GET against the configured endpoint:
//
// ```http
// GET /melo/discover.php?action=add_device&serial=aa:bb:cc:dd:ee:ff&name=player&hostname=melo&port=8080
// User-Agent: beacon
// ```
//
// Only the status code matters; the response body is never read.
//
// ## Delivery
//
// - `send`: one awaited request, outcome returned to the caller
// - `submit`: spawned on the current tokio runtime, outcome logged
//
// No retries are performed in either mode.

use async_trait::async_trait;
use beacon_core::config::DirectoryConfig;
use beacon_core::traits::{DirectoryClient, DirectoryRequest};
use beacon_core::{Error, Result};
use std::time::Duration;

/// Directory client speaking the `action=...` GET protocol
///
/// Holds one reusable HTTP session; cloning is cheap and shares it.
#[derive(Clone)]
pub struct HttpDirectoryClient {
    /// Directory endpoint
    url: String,

    /// HTTP session (connection pool, timeout, user agent)
    client: reqwest::Client,
}

impl std::fmt::Debug for HttpDirectoryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpDirectoryClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl HttpDirectoryClient {
    /// Create a new client from the directory configuration
    ///
    /// # Errors
    ///
    /// - `Error::Config`: invalid configuration or the HTTP session could not
    ///   be built
    pub fn new(config: &DirectoryConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: config.url.clone(),
            client,
        })
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn send(&self, request: &DirectoryRequest) -> Result<()> {
        let action = request.action();
        tracing::debug!("Directory request: {} for {}", action, request.serial());

        let response = self
            .client
            .get(&self.url)
            .query(&request.query_pairs())
            .send()
            .await
            .map_err(|e| Error::transport(format!("{} request failed: {}", action, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::rejected(action, status.as_u16()));
        }

        tracing::debug!("Directory accepted {} ({})", action, status);
        Ok(())
    }

    fn submit(&self, request: DirectoryRequest) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(
                "No async runtime available, dropping {} request",
                request.action()
            );
            return;
        };

        // One task per submission; no ordering between submissions
        let client = self.clone();
        handle.spawn(async move {
            if let Err(e) = client.send(&request).await {
                tracing::warn!("Directory {} failed: {}", request.action(), e);
            }
        });
    }

    fn client_name(&self) -> &'static str {
        "http"
    }
}
