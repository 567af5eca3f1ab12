//! GitHub backend implementation.
//!
//! Plain unauthenticated GETs against github.com pages and
//! raw.githubusercontent.com.  Timeouts come from the shared
//! [`reqwest::Client`]; nothing is retried.

use std::time::Duration;

use anyhow::Context as _;
use bytes::Bytes;
use tracing::{debug, warn};

use super::ForgeBackend;
use crate::config::UpstreamConfig;
use crate::gist::GistError;
use crate::metrics::{FetchKind, FetchLabels, FetchOutcome, MetricsRegistry};

// ---------------------------------------------------------------------------
// Client construction
// ---------------------------------------------------------------------------

/// Build the upstream HTTP client with connect and request timeouts applied.
pub fn build_http_client(config: &UpstreamConfig) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .context("failed to build reqwest client")
}

// ---------------------------------------------------------------------------
// Backend struct
// ---------------------------------------------------------------------------

pub struct GitHubBackend {
    http_client: reqwest::Client,
    metrics: MetricsRegistry,
}

impl GitHubBackend {
    pub fn new(http_client: reqwest::Client, metrics: MetricsRegistry) -> Self {
        Self {
            http_client,
            metrics,
        }
    }

    async fn get(&self, url: &str, kind: FetchKind) -> Result<reqwest::Response, GistError> {
        let result = self.send(url).await;
        let outcome = if result.is_ok() {
            FetchOutcome::Ok
        } else {
            FetchOutcome::Error
        };
        self.metrics
            .metrics
            .upstream_fetches
            .get_or_create(&FetchLabels { kind, outcome })
            .inc();
        result
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, GistError> {
        debug!(%url, "fetching upstream");
        let resp = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|source| GistError::UpstreamFetch {
                url: url.to_owned(),
                source,
            })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%url, %status, "upstream returned non-success status");
            return Err(GistError::UpstreamStatus {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }
        Ok(resp)
    }
}

// ---------------------------------------------------------------------------
// Trait implementation
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
impl ForgeBackend for GitHubBackend {
    async fn fetch_page(&self, url: &str) -> Result<String, GistError> {
        let resp = self.get(url, FetchKind::Page).await?;
        resp.text().await.map_err(|source| GistError::UpstreamFetch {
            url: url.to_owned(),
            source,
        })
    }

    async fn fetch_raw(&self, url: &str) -> Result<Bytes, GistError> {
        let resp = self.get(url, FetchKind::Raw).await?;
        resp.bytes().await.map_err(|source| GistError::UpstreamFetch {
            url: url.to_owned(),
            source,
        })
    }
}
