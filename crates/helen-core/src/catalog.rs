//! Read-only view of the collaborator's collections.
//!
//! Catalog data is advisory (reports, backup manifests), so failures are logged
//! and degrade to empty results instead of propagating.

use crate::archive::BackupManifest;
use crate::client::{CollectionDescriptor, StoreClient};
use std::sync::Arc;

#[derive(Clone)]
pub struct CollectionCatalog {
    client: Arc<dyn StoreClient>,
}

impl CollectionCatalog {
    pub fn new(client: Arc<dyn StoreClient>) -> Self {
        Self { client }
    }

    /// All collections, or an empty list when the service is unreachable.
    pub async fn list_collections(&self) -> Vec<CollectionDescriptor> {
        match self.client.list_collections().await {
            Ok(collections) => collections,
            Err(e) => {
                tracing::warn!(
                    target: "helen::catalog",
                    service = self.client.base_url(),
                    error = %e,
                    "Error getting collections"
                );
                Vec::new()
            }
        }
    }

    /// Document count for `name`; 0 when the collection is absent or the service is down.
    pub async fn get_count(&self, name: &str) -> u64 {
        self.list_collections()
            .await
            .into_iter()
            .find(|c| c.name == name)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// Snapshot of collection names and counts for a backup manifest.
    pub async fn manifest(&self) -> BackupManifest {
        let collections = self.list_collections().await;
        let manifest = BackupManifest::from_collections(self.client.base_url(), collections);
        tracing::info!(
            target: "helen::catalog",
            collections = manifest.collections.len(),
            total_documents = manifest.total_documents,
            "📊 Collected collection metadata"
        );
        manifest
    }
}
