use crate::client::CollectionDescriptor;
use serde::{Deserialize, Serialize};

/// Container entry holding the manifest.
pub const MANIFEST_ENTRY: &str = "backup_metadata.json";
/// Container subtree holding the copy of persistent storage.
pub const STORAGE_ENTRY: &str = "chroma_db";
/// Container entry holding the seed ledger snapshot.
pub const LEDGER_ENTRY: &str = "seeded_content.json";

fn default_true() -> bool {
    true
}

/// Contents of `backup_metadata.json`.
///
/// `service_reachable` and `storage_included` were added after the first archives
/// were written; older manifests deserialize with both set to `true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupManifest {
    pub backup_timestamp: String,
    pub service_url: String,
    #[serde(default)]
    pub collections: Vec<CollectionDescriptor>,
    #[serde(default)]
    pub total_documents: u64,
    #[serde(default = "default_true")]
    pub service_reachable: bool,
    #[serde(default = "default_true")]
    pub storage_included: bool,
}

impl BackupManifest {
    /// Manifest for a live service: counts are summed into `total_documents`.
    pub fn from_collections(service_url: &str, collections: Vec<CollectionDescriptor>) -> Self {
        let total_documents = collections.iter().map(|c| c.count).sum();
        Self {
            backup_timestamp: now_iso(),
            service_url: service_url.to_string(),
            collections,
            total_documents,
            service_reachable: true,
            storage_included: true,
        }
    }

    /// Manifest written when the service could not be reached; storage files only.
    pub fn unreachable(service_url: &str) -> Self {
        Self {
            service_reachable: false,
            ..Self::from_collections(service_url, Vec::new())
        }
    }
}

fn now_iso() -> String {
    chrono::Local::now()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn totals_are_summed() {
        let manifest = BackupManifest::from_collections(
            "http://localhost:8000",
            vec![
                CollectionDescriptor {
                    name: "therapeutic_responses".into(),
                    count: 40,
                    metadata: None,
                },
                CollectionDescriptor {
                    name: "user_patterns".into(),
                    count: 15,
                    metadata: None,
                },
            ],
        );
        assert_eq!(manifest.total_documents, 55);
        assert!(manifest.service_reachable);
    }

    #[test]
    fn legacy_manifest_defaults_new_fields() {
        let json = r#"{
            "backup_timestamp": "2025-01-12T09:30:00.000000",
            "service_url": "http://localhost:8000",
            "collections": [{"name": "user_patterns", "count": 15, "metadata": {"type": "user_modeling"}}],
            "total_documents": 15
        }"#;
        let manifest: BackupManifest = serde_json::from_str(json).unwrap();
        assert!(manifest.service_reachable);
        assert!(manifest.storage_included);
        assert_eq!(manifest.collections[0].name, "user_patterns");
    }
}
