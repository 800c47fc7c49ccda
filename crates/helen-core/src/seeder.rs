//! Idempotent content seeding.
//!
//! Each batch is filtered against the [`SeedLedger`], only unseen items are sent to
//! the collaborator in a single `add_context` call, and the ledger is updated and
//! flushed strictly after that call succeeds.
//!
//! Delivery is at-least-once on the remote side and exactly-once-per-run in the
//! ledger: a crash between the remote write and the ledger flush resends the same
//! items next run. Each item carries a deterministic id, so the collaborator's
//! upsert overwrites instead of duplicating.

use crate::catalog::CollectionCatalog;
use crate::client::{AddContextRequest, StoreClient};
use crate::error::{ErrorKind, VaultError, VaultResult};
use crate::knowledge::KnowledgeDomain;
use crate::ledger::{Fingerprinter, PrefixFingerprint, SeedLedger};
use crate::probe::StoreProbe;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;

/// One document and its structured metadata, destined for a single collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeedItem {
    pub document: String,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl SeedItem {
    /// Builds an item from a document and a JSON object literal. Non-object metadata is dropped.
    pub fn new(document: impl Into<String>, metadata: serde_json::Value) -> Self {
        let metadata = match metadata {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            document: document.into(),
            metadata,
        }
    }
}

/// Result of one [`ContentSeeder::seed`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedOutcome {
    /// Items newly written to the collaborator.
    pub added: usize,
    /// Items already in the ledger (or repeated within the batch).
    pub skipped: usize,
}

/// Per-batch status inside a [`DomainReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchStatus {
    Seeded(SeedOutcome),
    Failed { kind: ErrorKind, message: String },
}

#[derive(Debug, Clone)]
pub struct BatchReport {
    pub label: String,
    pub collection: String,
    pub status: BatchStatus,
}

/// What happened when a whole knowledge domain was seeded.
#[derive(Debug, Clone)]
pub struct DomainReport {
    pub domain: String,
    pub batches: Vec<BatchReport>,
}

impl DomainReport {
    pub fn added(&self) -> usize {
        self.batches
            .iter()
            .map(|b| match b.status {
                BatchStatus::Seeded(outcome) => outcome.added,
                BatchStatus::Failed { .. } => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> usize {
        self.batches
            .iter()
            .filter(|b| matches!(b.status, BatchStatus::Failed { .. }))
            .count()
    }
}

/// Pushes curated items into named collections, consulting and updating the ledger.
pub struct ContentSeeder<'l> {
    client: Arc<dyn StoreClient>,
    probe: StoreProbe,
    catalog: CollectionCatalog,
    ledger: &'l mut SeedLedger,
    fingerprinter: Box<dyn Fingerprinter>,
}

impl<'l> ContentSeeder<'l> {
    pub fn new(client: Arc<dyn StoreClient>, ledger: &'l mut SeedLedger) -> Self {
        Self {
            probe: StoreProbe::new(Arc::clone(&client)),
            catalog: CollectionCatalog::new(Arc::clone(&client)),
            client,
            ledger,
            fingerprinter: Box::new(PrefixFingerprint::default()),
        }
    }

    /// Replaces the fingerprint scheme. Existing ledgers only match the scheme that wrote them.
    pub fn with_fingerprinter(mut self, fingerprinter: Box<dyn Fingerprinter>) -> Self {
        self.fingerprinter = fingerprinter;
        self
    }

    pub fn ledger(&self) -> &SeedLedger {
        &*self.ledger
    }

    pub fn catalog(&self) -> &CollectionCatalog {
        &self.catalog
    }

    /// Seeds `items` into `collection`, returning how many were newly written.
    ///
    /// `ServiceUnavailable` when the collaborator is down; `RemoteWriteFailure` when the
    /// batch is rejected. In both cases the ledger is untouched, so a retry resends the
    /// same items.
    pub async fn seed(&mut self, collection: &str, items: &[SeedItem]) -> VaultResult<SeedOutcome> {
        if !self.probe.is_healthy().await {
            return Err(VaultError::ServiceUnavailable(format!(
                "{} did not answer /health",
                self.probe.service_url()
            )));
        }

        let mut batch_seen = HashSet::new();
        let mut fresh: Vec<(&SeedItem, String)> = Vec::new();
        for item in items {
            let fp = self.fingerprinter.fingerprint(&item.document);
            if self.ledger.is_seeded(collection, &fp) || !batch_seen.insert(fp.clone()) {
                continue;
            }
            fresh.push((item, fp));
        }
        let skipped = items.len() - fresh.len();

        if fresh.is_empty() {
            tracing::info!(
                target: "helen::seeder",
                collection,
                "⏭️  All content already exists in {}",
                collection
            );
            return Ok(SeedOutcome { added: 0, skipped });
        }

        let request = AddContextRequest {
            documents: fresh.iter().map(|(item, _)| item.document.clone()).collect(),
            metadatas: fresh.iter().map(|(item, _)| item.metadata.clone()).collect(),
            collection_name: collection.to_string(),
            ids: fresh
                .iter()
                .map(|(item, _)| item_id(collection, &item.document))
                .collect(),
        };
        self.client.add_context(&request).await?;

        for (_, fp) in &fresh {
            self.ledger.mark_seeded(collection, fp.clone());
        }
        self.ledger.save()?;

        tracing::info!(
            target: "helen::seeder",
            collection,
            added = fresh.len(),
            skipped,
            "✅ Added {} new item(s) to {}",
            fresh.len(),
            collection
        );
        Ok(SeedOutcome {
            added: fresh.len(),
            skipped,
        })
    }

    /// Seeds every batch of `domain`. Per-batch failures are recorded and the run moves on;
    /// only an unreachable collaborator at the start aborts the whole domain.
    ///
    /// Does not lock the ledger; load it with [`SeedLedger::lock_and_load`] for that.
    pub async fn seed_domain(&mut self, domain: &dyn KnowledgeDomain) -> VaultResult<DomainReport> {
        if !self.probe.is_healthy().await {
            return Err(VaultError::ServiceUnavailable(format!(
                "{} did not answer /health",
                self.probe.service_url()
            )));
        }

        tracing::info!(target: "helen::seeder", domain = domain.name(), "🌱 Seeding {}", domain.name());
        let mut batches = Vec::new();
        for batch in domain.batches() {
            let status = match self.seed(&batch.collection, &batch.items).await {
                Ok(outcome) => BatchStatus::Seeded(outcome),
                Err(e) => {
                    tracing::warn!(
                        target: "helen::seeder",
                        batch = %batch.label,
                        collection = %batch.collection,
                        error = %e,
                        "❌ Failed to seed batch"
                    );
                    BatchStatus::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            };
            batches.push(BatchReport {
                label: batch.label,
                collection: batch.collection,
                status,
            });
        }

        Ok(DomainReport {
            domain: domain.name().to_string(),
            batches,
        })
    }
}

/// Deterministic collaborator id: `<collection>-<first 16 hex chars of sha256(document)>`.
pub fn item_id(collection: &str, document: &str) -> String {
    let digest = Sha256::digest(document.as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{:02x}", b)).collect();
    format!("{}-{}", collection, hex)
}
