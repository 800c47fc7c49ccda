//! Collaborator (vector service) HTTP surface.
//!
//! Only three endpoints are consumed: `GET /health`, `GET /collections` and
//! `POST /add_context`. Everything else the service offers (retrieval, billing,
//! email) is outside the vault.

use crate::error::{VaultError, VaultResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A named collection as reported by the collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    pub name: String,
    #[serde(default)]
    pub count: u64,
    /// Small metadata dictionary (domain tag); `null` when the collection has none.
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Body of `GET /health`. Every field is optional; only the status code decides liveness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceHealth {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub persistent_storage: Option<String>,
    #[serde(default)]
    pub storage_exists: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct CollectionsResponse {
    #[serde(default)]
    collections: Vec<CollectionDescriptor>,
}

/// Body of `POST /add_context`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddContextRequest {
    pub documents: Vec<String>,
    pub metadatas: Vec<serde_json::Map<String, serde_json::Value>>,
    pub collection_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ids: Vec<String>,
}

/// Lenient view of the `add_context` reply; overall success is what matters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AddContextResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub added_count: Option<u64>,
    #[serde(default)]
    pub collection: Option<String>,
    #[serde(default)]
    pub ids: Vec<String>,
}

/// Narrow interface to the collaborator store.
#[async_trait]
pub trait StoreClient: Send + Sync {
    /// Liveness check. `Err` for transport failures and non-success statuses.
    async fn health(&self) -> VaultResult<ServiceHealth>;

    /// All collections with their document counts.
    async fn list_collections(&self) -> VaultResult<Vec<CollectionDescriptor>>;

    /// Add/upsert a batch. No partial-batch status exists: the batch succeeds or fails as a whole.
    async fn add_context(&self, request: &AddContextRequest) -> VaultResult<AddContextResponse>;

    /// Address recorded in backup manifests.
    fn base_url(&self) -> &str;
}

/// reqwest-backed [`StoreClient`].
pub struct HttpStoreClient {
    base_url: String,
    client: reqwest::Client,
    probe_timeout: Duration,
}

impl HttpStoreClient {
    pub fn new(
        base_url: impl Into<String>,
        probe_timeout: Duration,
        request_timeout: Duration,
    ) -> VaultResult<Self> {
        let client = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            probe_timeout,
        })
    }

    /// Builds a client from the vault configuration.
    pub fn from_config(config: &crate::VaultConfig) -> VaultResult<Self> {
        Self::new(
            config.base_url(),
            config.probe_timeout(),
            config.request_timeout(),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl StoreClient for HttpStoreClient {
    async fn health(&self) -> VaultResult<ServiceHealth> {
        let response = self
            .client
            .get(self.url("/health"))
            .timeout(self.probe_timeout)
            .send()
            .await
            .map_err(|e| VaultError::ServiceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VaultError::ServiceUnavailable(format!(
                "Unexpected status: {}",
                response.status()
            )));
        }
        // A healthy service with an unexpected body is still healthy.
        Ok(response.json::<ServiceHealth>().await.unwrap_or_default())
    }

    async fn list_collections(&self) -> VaultResult<Vec<CollectionDescriptor>> {
        let response = self
            .client
            .get(self.url("/collections"))
            .send()
            .await
            .map_err(|e| VaultError::ServiceUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(VaultError::ServiceUnavailable(format!(
                "GET /collections returned {}",
                response.status()
            )));
        }
        let body: CollectionsResponse = response.json().await?;
        Ok(body.collections)
    }

    async fn add_context(&self, request: &AddContextRequest) -> VaultResult<AddContextResponse> {
        let failure = |reason: String| VaultError::RemoteWriteFailure {
            collection: request.collection_name.clone(),
            reason,
        };

        let response = self
            .client
            .post(self.url("/add_context"))
            .json(request)
            .send()
            .await
            .map_err(|e| failure(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(failure(format!("HTTP {}: {}", status, body.trim())));
        }
        Ok(response.json::<AddContextResponse>().await.unwrap_or_default())
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}
