//! Factory I/O adapter using the Web API.
//!
//! Factory I/O exposes its tags over HTTP, by default on port 7410.
//!
//! ## Endpoints Used
//!
//! - `GET /api/tags?name=&type=&kind=` - the tag catalog
//! - `GET /api/tag/values` with a JSON array of ids as body - current values
//!
//! The write endpoints (`/tag/values`, `/tag/values-force`, ...) are not used;
//! this adapter only observes.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::collections::BTreeSet;
//! use tagwatch_adapters::factoryio::FactoryIoClient;
//! use tagwatch_adapters::{TagFilter, TagSource, ValueKind};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = FactoryIoClient::builder()
//!         .endpoint("http://localhost:7410/api")
//!         .build()?;
//!
//!     let sensors = client
//!         .list_tags(&TagFilter::default().kind(ValueKind::Bit))
//!         .await?;
//!
//!     for tag in &sensors {
//!         println!("{} ({}) = {}", tag.name, tag.id, tag.value);
//!     }
//!
//!     let ids: BTreeSet<String> = sensors.into_iter().map(|t| t.id).collect();
//!     let samples = client.fetch_values(&ids).await?;
//!     println!("{} samples", samples.len());
//!     Ok(())
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tagwatch_types::{now_ms, FailureOverrides, Sample, Tag, TagId, TagValue};

use crate::{collect_samples, SourceError, TagFilter, TagSource};

/// Default Web API base URL.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:7410/api";

/// Factory I/O Web API client.
#[derive(Debug, Clone)]
pub struct FactoryIoClient {
    client: Client,
    endpoint: String,
    description: String,
}

impl FactoryIoClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> FactoryIoClientBuilder {
        FactoryIoClientBuilder::default()
    }

    /// The base URL requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_catalog(&self, filter: &TagFilter) -> Result<Vec<Tag>, SourceError> {
        let url = format!("{}/tags", self.endpoint);

        let response = self
            .client
            .get(&url)
            .query(&catalog_query(filter))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        let tags: Vec<Tag> = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))?;

        // Re-apply locally so name matching is the same substring match for every source
        Ok(tags.into_iter().filter(|t| filter.matches(t)).collect())
    }

    async fn fetch_raw_values(&self, ids: &BTreeSet<TagId>) -> Result<Vec<ValueInfo>, SourceError> {
        let url = format!("{}/tag/values", self.endpoint);
        let body: Vec<&TagId> = ids.iter().collect();

        let response = self.client.get(&url).json(&body).send().await?;

        if !response.status().is_success() {
            return Err(SourceError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }
}

#[async_trait]
impl TagSource for FactoryIoClient {
    async fn list_tags(&self, filter: &TagFilter) -> Result<Vec<Tag>, SourceError> {
        let tags = self.fetch_catalog(filter).await?;
        tracing::debug!(endpoint = %self.endpoint, tag_count = tags.len(), "Fetched tag catalog");
        Ok(tags)
    }

    async fn fetch_values(
        &self,
        ids: &BTreeSet<TagId>,
    ) -> Result<BTreeMap<TagId, Sample>, SourceError> {
        let values = self.fetch_raw_values(ids).await?;
        let captured = now_ms();
        collect_samples(ids, values.into_iter().map(|v| v.into_sample(captured)))
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Builder for FactoryIoClient.
#[derive(Debug, Default)]
pub struct FactoryIoClientBuilder {
    endpoint: Option<String>,
    timeout: Option<Duration>,
}

impl FactoryIoClientBuilder {
    /// Set the Web API base URL (e.g., "http://localhost:7410/api").
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<FactoryIoClient, SourceError> {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Http(format!("Failed to build HTTP client: {e}")))?;

        let endpoint = self
            .endpoint
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(FactoryIoClient {
            client,
            description: format!("factoryio: {endpoint}"),
            endpoint,
        })
    }
}

fn catalog_query(filter: &TagFilter) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if let Some(name) = &filter.name {
        query.push(("name", name.clone()));
    }
    if let Some(kind) = filter.kind {
        query.push(("type", kind.as_str().to_string()));
    }
    if let Some(direction) = filter.direction {
        query.push(("kind", direction.as_str().to_string()));
    }
    query
}

/// Value record returned by `GET /tag/values`.
///
/// Newer API versions return whole tag records here; the failure flags are
/// picked up when present.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValueInfo {
    id: TagId,
    value: TagValue,
    open_circuit: Option<bool>,
    short_circuit: Option<bool>,
    is_forced: Option<bool>,
    forced_value: Option<TagValue>,
}

impl ValueInfo {
    fn into_sample(self, timestamp_ms: u64) -> Sample {
        let reports_flags =
            self.open_circuit.is_some() || self.short_circuit.is_some() || self.is_forced.is_some();
        let sample = Sample::new(self.id, self.value, timestamp_ms);
        if !reports_flags {
            return sample;
        }
        sample.with_overrides(FailureOverrides {
            open_circuit: self.open_circuit.unwrap_or(false),
            short_circuit: self.short_circuit.unwrap_or(false),
            is_forced: self.is_forced.unwrap_or(false),
            forced_value: self.forced_value.unwrap_or_default(),
        })
    }
}
