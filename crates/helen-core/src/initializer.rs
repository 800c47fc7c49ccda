//! First-run setup: seed every knowledge domain, report what the store holds, and
//! take the `initial_system_setup` backup.

use crate::archive::{ArchiveManager, ArchiveRef};
use crate::catalog::CollectionCatalog;
use crate::client::{CollectionDescriptor, ServiceHealth, StoreClient};
use crate::config::VaultConfig;
use crate::error::{ErrorKind, VaultError, VaultResult};
use crate::knowledge::{
    ConversationGuide, KnowledgeDomain, TherapeuticKnowledge, HELEN_CONTEXTS, SEEDED_COLLECTIONS,
};
use crate::ledger::SeedLedger;
use crate::probe::StoreProbe;
use crate::seeder::{ContentSeeder, DomainReport};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

pub const INITIAL_BACKUP_NAME: &str = "initial_system_setup";

/// Snapshot of the collaborator for status output.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub service_url: String,
    pub health: Option<ServiceHealth>,
    pub collections: Vec<CollectionDescriptor>,
    pub total_documents: u64,
}

impl SystemStatus {
    pub fn is_live(&self) -> bool {
        self.health.is_some()
    }

    /// Documents in the service's conversation memory collection.
    pub fn conversation_contexts(&self) -> u64 {
        self.collections
            .iter()
            .find(|c| c.name == HELEN_CONTEXTS)
            .map(|c| c.count)
            .unwrap_or(0)
    }
}

/// A domain that was not seeded at all.
#[derive(Debug, Clone)]
pub struct SkippedDomain {
    pub domain: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default)]
pub struct SeedRun {
    pub domains: Vec<DomainReport>,
    pub skipped: Vec<SkippedDomain>,
    /// Document counts of the seeded collections before the run.
    pub counts_before: BTreeMap<String, u64>,
    /// Document counts of the seeded collections after the run.
    pub counts_after: BTreeMap<String, u64>,
}

impl SeedRun {
    pub fn added(&self) -> usize {
        self.domains.iter().map(|d| d.added()).sum()
    }

    pub fn failures(&self) -> usize {
        self.domains.iter().map(|d| d.failures()).sum()
    }
}

#[derive(Debug, Clone)]
pub enum InitialBackup {
    Created(ArchiveRef),
    AlreadyPresent(PathBuf),
    NotRequested,
    Failed { kind: ErrorKind, message: String },
}

#[derive(Debug, Clone)]
pub struct InitReport {
    pub seeding: SeedRun,
    pub status: SystemStatus,
    pub backup: InitialBackup,
}

pub struct SystemInitializer {
    config: VaultConfig,
    client: Arc<dyn StoreClient>,
    probe: StoreProbe,
    catalog: CollectionCatalog,
}

impl SystemInitializer {
    pub fn new(config: VaultConfig, client: Arc<dyn StoreClient>) -> Self {
        Self {
            probe: StoreProbe::new(Arc::clone(&client)),
            catalog: CollectionCatalog::new(Arc::clone(&client)),
            config,
            client,
        }
    }

    /// Seeds the built-in therapeutic content and, when the guide file exists, the
    /// conversation guide. Only an unreachable service or a held ledger lock is an error.
    pub async fn seed_all(&self) -> VaultResult<SeedRun> {
        self.require_service().await?;

        let (_ledger_lock, mut ledger) = SeedLedger::lock_and_load(self.config.ledger_path())?;
        let mut run = SeedRun {
            counts_before: self.seeded_counts().await,
            ..SeedRun::default()
        };
        let mut seeder = ContentSeeder::new(Arc::clone(&self.client), &mut ledger);

        let therapeutic = TherapeuticKnowledge;
        run.domains.push(seeder.seed_domain(&therapeutic).await?);

        let guide_path = &self.config.guide_path;
        if guide_path.is_file() {
            match ConversationGuide::load(guide_path) {
                Ok(guide) => run.domains.push(seeder.seed_domain(&guide).await?),
                Err(e) => {
                    tracing::warn!(target: "helen::init", error = %e, "⚠️  Skipping conversation guide");
                    run.skipped.push(SkippedDomain {
                        domain: ConversationGuide::default().name().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        } else {
            tracing::warn!(
                target: "helen::init",
                path = %guide_path.display(),
                "⚠️  Conversation guide not found, skipping"
            );
            run.skipped.push(SkippedDomain {
                domain: ConversationGuide::default().name().to_string(),
                reason: format!("{} not found", guide_path.display()),
            });
        }

        run.counts_after = self.seeded_counts().await;
        for (collection, after) in &run.counts_after {
            let before = run.counts_before.get(collection).copied().unwrap_or(0);
            tracing::info!(target: "helen::init", collection = %collection, before, after, "📚 Collection count");
        }
        tracing::info!(
            target: "helen::init",
            added = run.added(),
            failures = run.failures(),
            ledger_entries = seeder.ledger().len(),
            "🌱 Seeding finished"
        );
        Ok(run)
    }

    async fn seeded_counts(&self) -> BTreeMap<String, u64> {
        let mut counts = BTreeMap::new();
        for name in SEEDED_COLLECTIONS {
            counts.insert(name.to_string(), self.catalog.get_count(name).await);
        }
        counts
    }

    /// Health plus collection counts. Never fails.
    pub async fn status(&self) -> SystemStatus {
        let health = self.probe.health_details().await;
        let collections = if health.is_some() {
            self.catalog.list_collections().await
        } else {
            Vec::new()
        };
        SystemStatus {
            service_url: self.probe.service_url().to_string(),
            health,
            total_documents: collections.iter().map(|c| c.count).sum(),
            collections,
        }
    }

    /// Seed, report, then back up as `initial_system_setup` when `create_backup` is set.
    pub async fn initialize(&self, create_backup: bool) -> VaultResult<InitReport> {
        tracing::info!(target: "helen::init", service = self.probe.service_url(), "🚀 Initializing Helen knowledge store");
        let seeding = self.seed_all().await?;
        let status = self.status().await;

        let backup = if create_backup {
            self.initial_backup().await
        } else {
            InitialBackup::NotRequested
        };

        Ok(InitReport {
            seeding,
            status,
            backup,
        })
    }

    async fn initial_backup(&self) -> InitialBackup {
        let archives = ArchiveManager::from_config(&self.config, Arc::clone(&self.client));
        match archives.create(Some(INITIAL_BACKUP_NAME)).await {
            Ok(archive) => InitialBackup::Created(archive),
            Err(VaultError::ArchiveExists(path)) => {
                tracing::info!(target: "helen::init", path = %path.display(), "⏭️  Initial backup already present");
                InitialBackup::AlreadyPresent(path)
            }
            Err(e) => {
                tracing::warn!(target: "helen::init", error = %e, "⚠️  Initial backup failed");
                InitialBackup::Failed {
                    kind: e.kind(),
                    message: e.to_string(),
                }
            }
        }
    }

    async fn require_service(&self) -> VaultResult<()> {
        if self.probe.is_healthy().await {
            Ok(())
        } else {
            Err(VaultError::ServiceUnavailable(format!(
                "{} did not answer /health",
                self.probe.service_url()
            )))
        }
    }
}
