//! REST client for the remote ticket table (PostgREST conventions).

use std::time::Duration;

use andon_core::ticket::{Ticket, TicketPatch};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::RemoteError;
use crate::realtime;
use crate::remote::{RemoteBackend, RemoteChange};

/// HTTP request timeout for a single backend call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for the remote backend.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project base URL, e.g. `https://abc.example.co`.
    pub url: String,
    /// Public API key sent as `apikey` and bearer token.
    pub anon_key: String,
    /// Ticket table name.
    pub table: String,
}

impl RestConfig {
    /// Build a config when both URL and key are present.
    ///
    /// Empty values and the literal `"undefined"` (left behind by some
    /// deployment tooling) count as absent.
    pub fn from_parts(url: Option<String>, anon_key: Option<String>, table: String) -> Option<Self> {
        let usable = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty() && s != "undefined")
        };
        Some(Self {
            url: usable(url)?,
            anon_key: usable(anon_key)?,
            table,
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.url.trim_end_matches('/'), self.table)
    }
}

/// [`RemoteBackend`] over REST plus the realtime WebSocket feed.
pub struct RestBackend {
    client: reqwest::Client,
    config: RestConfig,
}

impl RestBackend {
    pub fn new(config: RestConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RestConfig {
        &self.config
    }

    fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .bearer_auth(&self.config.anon_key)
    }

    /// Ensure the response has a success status code.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

#[async_trait]
impl RemoteBackend for RestBackend {
    async fn fetch_recent(&self, limit: usize) -> Result<Vec<Value>, RemoteError> {
        let limit = limit.to_string();
        let response = self
            .request(reqwest::Method::GET, self.config.table_url())
            .query(&[
                ("select", "*"),
                ("order", "createdAt.desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await?;

        let rows = Self::ensure_success(response).await?.json::<Vec<Value>>().await?;
        tracing::debug!(count = rows.len(), "Fetched tickets from remote backend");
        Ok(rows)
    }

    async fn insert(&self, ticket: &Ticket) -> Result<(), RemoteError> {
        let response = self
            .request(reqwest::Method::POST, self.config.table_url())
            .header("Prefer", "return=minimal")
            .json(&[ticket])
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn update(&self, id: &str, patch: &TicketPatch) -> Result<(), RemoteError> {
        let filter = format!("eq.{id}");
        let response = self
            .request(reqwest::Method::PATCH, self.config.table_url())
            .query(&[("id", filter.as_str())])
            .header("Prefer", "return=minimal")
            .json(patch)
            .send()
            .await?;

        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn subscribe(
        &self,
        cancel: CancellationToken,
    ) -> Result<mpsc::Receiver<RemoteChange>, RemoteError> {
        realtime::connect(&self.config, cancel).await
    }
}
