//! helen-core: durable knowledge store for the Helen assistant.
//!
//! Idempotent seeding of curated therapeutic content into the vector service, and
//! point-in-time backup/restore of its persistent storage and seed ledger.

mod catalog;
mod client;
mod config;
mod error;
mod initializer;
mod ledger;
mod lock;
mod probe;
mod seeder;
pub mod archive;
pub mod knowledge;

// Configuration and errors
pub use config::VaultConfig;
pub use error::{ErrorKind, VaultError, VaultResult};

// Collaborator surface
pub use catalog::CollectionCatalog;
pub use client::{
    AddContextRequest, AddContextResponse, CollectionDescriptor, HttpStoreClient, ServiceHealth,
    StoreClient,
};
pub use probe::StoreProbe;

// Seeding
pub use ledger::{fingerprint, Fingerprinter, PrefixFingerprint, SeedLedger, FINGERPRINT_PREFIX_CHARS};
pub use seeder::{item_id, BatchReport, BatchStatus, ContentSeeder, DomainReport, SeedItem, SeedOutcome};

// Archives
pub use archive::{
    AlwaysConfirm, ArchiveConfig, ArchiveManager, ArchiveRef, ArchiveStatus, ArchiveSummary,
    BackupManifest, NeverConfirm, RestoreGate, RestoreReport,
};
pub use lock::ResourceLock;

// First-run setup
pub use initializer::{
    InitReport, InitialBackup, SeedRun, SkippedDomain, SystemInitializer, SystemStatus,
    INITIAL_BACKUP_NAME,
};
