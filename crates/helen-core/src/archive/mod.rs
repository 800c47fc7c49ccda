//! Point-in-time archives of the persistent store and the seed ledger.
//!
//! A backup is a single `.zip` under `backup_dir`:
//!
//! ```text
//! <name>.zip
//! ├── backup_metadata.json
//! ├── chroma_db/...
//! └── seeded_content.json
//! ```
//!
//! Both `create` and `restore` stage their work in a hidden directory next to the
//! archives and only commit at the end. A finished archive is written as
//! `<name>.zip.partial` and renamed into place, so an archive that exists under its
//! final name is always complete. Restore never deletes the live store: it is moved
//! aside to a timestamped sidecar directory first.

mod container;
mod manifest;

pub use manifest::{BackupManifest, LEDGER_ENTRY, MANIFEST_ENTRY, STORAGE_ENTRY};

use crate::catalog::CollectionCatalog;
use crate::client::StoreClient;
use crate::config::VaultConfig;
use crate::error::{VaultError, VaultResult};
use crate::lock::ResourceLock;
use crate::probe::StoreProbe;
use chrono::{DateTime, Local};
use container::Inspection;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const ARCHIVE_EXTENSION: &str = "zip";
const DEFAULT_NAME_PREFIX: &str = "helen_backup";

/// Filesystem locations the archive manager works with.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub backup_dir: PathBuf,
    pub storage_dir: PathBuf,
    pub ledger_path: PathBuf,
}

impl From<&VaultConfig> for ArchiveConfig {
    fn from(config: &VaultConfig) -> Self {
        Self {
            backup_dir: config.backup_dir.clone(),
            storage_dir: config.storage_dir(),
            ledger_path: config.ledger_path(),
        }
    }
}

/// A finalized archive returned by [`ArchiveManager::create`].
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveRef {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub manifest: BackupManifest,
}

/// How an archive looked when it was listed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArchiveStatus {
    Indexed {
        collections: usize,
        total_documents: u64,
        backup_timestamp: String,
    },
    /// No manifest inside; written by an older tool or by hand.
    Legacy,
    Corrupt {
        reason: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveSummary {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified: DateTime<Local>,
    pub status: ArchiveStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub archive: PathBuf,
    pub manifest: Option<BackupManifest>,
    pub storage_restored: bool,
    pub ledger_restored: bool,
    /// Where the previous live store was moved, if there was one.
    pub sidecar: Option<PathBuf>,
}

/// Asked before overwriting the store of a running service.
pub trait RestoreGate: Send + Sync {
    fn confirm(&self, archive: &Path) -> bool;
}

/// Gate that always proceeds (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl RestoreGate for AlwaysConfirm {
    fn confirm(&self, _archive: &Path) -> bool {
        true
    }
}

/// Gate that always declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl RestoreGate for NeverConfirm {
    fn confirm(&self, _archive: &Path) -> bool {
        false
    }
}

/// Creates, lists and restores archives.
pub struct ArchiveManager {
    config: ArchiveConfig,
    probe: StoreProbe,
    catalog: CollectionCatalog,
}

impl ArchiveManager {
    pub fn new(config: ArchiveConfig, client: Arc<dyn StoreClient>) -> Self {
        Self {
            config,
            probe: StoreProbe::new(Arc::clone(&client)),
            catalog: CollectionCatalog::new(client),
        }
    }

    pub fn from_config(config: &VaultConfig, client: Arc<dyn StoreClient>) -> Self {
        Self::new(ArchiveConfig::from(config), client)
    }

    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Path an archive called `name` has (or would have).
    pub fn archive_path(&self, name: &str) -> PathBuf {
        self.config
            .backup_dir
            .join(format!("{}.{}", name, ARCHIVE_EXTENSION))
    }

    /// Snapshots the store and the ledger into a new archive.
    ///
    /// The name defaults to `helen_backup_YYYYMMDD_HHMMSS`. An existing archive is
    /// never overwritten. When the service is down the archive still captures the
    /// storage files, with an empty collection list in the manifest.
    pub async fn create(&self, name: Option<&str>) -> VaultResult<ArchiveRef> {
        let name = match name {
            Some(name) => validate_name(name)?,
            None => format!("{}_{}", DEFAULT_NAME_PREFIX, stamp()),
        };
        let backup_dir = &self.config.backup_dir;
        fs::create_dir_all(backup_dir)
            .map_err(|e| VaultError::io(format!("create {}", backup_dir.display()), e))?;

        let final_path = self.archive_path(&name);
        if final_path.exists() {
            return Err(VaultError::ArchiveExists(final_path));
        }

        let _lock = ResourceLock::acquire(&self.config.storage_dir)?;
        tracing::info!(target: "helen::archive", name = %name, "📦 Creating backup");

        let mut manifest = if self.probe.is_healthy().await {
            self.catalog.manifest().await
        } else {
            tracing::warn!(
                target: "helen::archive",
                service = self.probe.service_url(),
                "⚠️  Vector service not reachable, backing up storage files only"
            );
            BackupManifest::unreachable(self.probe.service_url())
        };

        let staging = backup_dir.join(format!(".staging-{}", name));
        let partial = backup_dir.join(format!("{}.{}.partial", name, ARCHIVE_EXTENSION));
        let result = self.assemble(&staging, &partial, &final_path, &mut manifest);

        if staging.exists() {
            if let Err(e) = fs::remove_dir_all(&staging) {
                tracing::warn!(target: "helen::archive", path = %staging.display(), error = %e, "Could not remove staging directory");
            }
        }

        match result {
            Ok(size_bytes) => {
                tracing::info!(
                    target: "helen::archive",
                    path = %final_path.display(),
                    size_bytes,
                    total_documents = manifest.total_documents,
                    "✅ Backup created"
                );
                Ok(ArchiveRef {
                    name,
                    path: final_path,
                    size_bytes,
                    manifest,
                })
            }
            Err(e) => {
                if partial.is_file() {
                    let _ = fs::remove_file(&partial);
                }
                tracing::error!(target: "helen::archive", name = %name, error = %e, "❌ Backup failed");
                Err(e)
            }
        }
    }

    /// Stage, pack and finalize. Returns the archive size.
    fn assemble(
        &self,
        staging: &Path,
        partial: &Path,
        final_path: &Path,
        manifest: &mut BackupManifest,
    ) -> VaultResult<u64> {
        if staging.exists() {
            fs::remove_dir_all(staging)
                .map_err(|e| VaultError::io(format!("clear stale {}", staging.display()), e))?;
        }
        fs::create_dir_all(staging)
            .map_err(|e| VaultError::io(format!("create {}", staging.display()), e))?;

        let storage = &self.config.storage_dir;
        if storage.is_dir() {
            let files = container::copy_tree(storage, &staging.join(STORAGE_ENTRY))?;
            tracing::debug!(target: "helen::archive", files, "Copied storage tree");
        } else {
            tracing::warn!(target: "helen::archive", path = %storage.display(), "⚠️  No persistent storage found");
            manifest.storage_included = false;
        }

        let ledger = &self.config.ledger_path;
        if ledger.exists() {
            fs::copy(ledger, staging.join(LEDGER_ENTRY))
                .map_err(|e| VaultError::io(format!("copy {}", ledger.display()), e))?;
        }

        let body = serde_json::to_vec_pretty(manifest)
            .map_err(|e| VaultError::io("encode manifest", std::io::Error::other(e)))?;
        fs::write(staging.join(MANIFEST_ENTRY), body)
            .map_err(|e| VaultError::io("write manifest", e))?;

        container::pack(staging, partial)?;
        let size = fs::metadata(partial)
            .map(|m| m.len())
            .map_err(|e| VaultError::io(format!("stat {}", partial.display()), e))?;
        fs::rename(partial, final_path)
            .map_err(|e| VaultError::io(format!("finalize {}", final_path.display()), e))?;
        Ok(size)
    }

    /// All archives in `backup_dir`, newest first. Never fails: unreadable entries are
    /// reported as `Corrupt`, an unreadable directory as an empty list.
    pub fn list(&self) -> Vec<ArchiveSummary> {
        let backup_dir = &self.config.backup_dir;
        let entries = match fs::read_dir(backup_dir) {
            Ok(entries) => entries,
            Err(e) => {
                if backup_dir.exists() {
                    tracing::warn!(target: "helen::archive", path = %backup_dir.display(), error = %e, "⚠️  Could not read backup directory");
                }
                return Vec::new();
            }
        };

        let mut summaries: Vec<ArchiveSummary> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path.extension().and_then(|e| e.to_str()) == Some(ARCHIVE_EXTENSION)
            })
            .map(|path| summarize(&path))
            .collect();

        summaries.sort_by(|a, b| b.modified.cmp(&a.modified).then_with(|| a.name.cmp(&b.name)));
        summaries
    }

    /// Replaces the live store and ledger with the contents of an archive.
    ///
    /// `name_or_path` is an archive name (with or without `.zip`) under `backup_dir`, or
    /// a path to an archive file. When the service is running, `gate` is asked first and
    /// a refusal returns [`VaultError::RestoreDeclined`] with nothing touched.
    pub async fn restore(&self, name_or_path: &str, gate: &dyn RestoreGate) -> VaultResult<RestoreReport> {
        let archive = self.resolve(name_or_path)?;

        if self.probe.is_healthy().await {
            tracing::warn!(
                target: "helen::archive",
                service = self.probe.service_url(),
                "⚠️  Vector service is running; restoring under it may confuse it"
            );
            if !gate.confirm(&archive) {
                tracing::info!(target: "helen::archive", "Restore cancelled");
                return Err(VaultError::RestoreDeclined);
            }
        }

        let _storage_lock = ResourceLock::acquire(&self.config.storage_dir)?;
        let _ledger_lock = ResourceLock::acquire(&self.config.ledger_path)?;
        tracing::info!(target: "helen::archive", archive = %archive.display(), "🔄 Restoring backup");

        let staging = self
            .config
            .backup_dir
            .join(format!(".restore-{}", stamp()));
        let result = self.apply(&archive, &staging);

        if staging.exists() {
            if let Err(e) = fs::remove_dir_all(&staging) {
                tracing::warn!(target: "helen::archive", path = %staging.display(), error = %e, "Could not remove restore staging");
            }
        }

        match &result {
            Ok(report) => tracing::info!(
                target: "helen::archive",
                storage_restored = report.storage_restored,
                ledger_restored = report.ledger_restored,
                "✅ Restore completed"
            ),
            Err(e) => tracing::error!(target: "helen::archive", error = %e, "❌ Restore failed"),
        }
        result
    }

    fn apply(&self, archive: &Path, staging: &Path) -> VaultResult<RestoreReport> {
        fs::create_dir_all(staging)
            .map_err(|e| VaultError::io(format!("create {}", staging.display()), e))?;
        container::unpack(archive, staging)?;

        let manifest = read_staged_manifest(&staging.join(MANIFEST_ENTRY));
        if let Some(m) = &manifest {
            tracing::info!(
                target: "helen::archive",
                backup_timestamp = %m.backup_timestamp,
                collections = m.collections.len(),
                total_documents = m.total_documents,
                "📋 Backup metadata"
            );
        }

        let mut report = RestoreReport {
            archive: archive.to_path_buf(),
            manifest,
            storage_restored: false,
            ledger_restored: false,
            sidecar: None,
        };

        let staged_storage = staging.join(STORAGE_ENTRY);
        if staged_storage.is_dir() {
            report.sidecar = self.install_storage(&staged_storage)?;
            report.storage_restored = true;
        }

        let staged_ledger = staging.join(LEDGER_ENTRY);
        if staged_ledger.is_file() {
            restore_file(&staged_ledger, &self.config.ledger_path)?;
            report.ledger_restored = true;
        }

        Ok(report)
    }

    /// Copies the staged tree next to the live store, moves the live store to a sidecar,
    /// then renames the copy into place. Returns the sidecar, if there was a live store.
    fn install_storage(&self, staged: &Path) -> VaultResult<Option<PathBuf>> {
        let live = &self.config.storage_dir;
        let incoming = incoming_path(live);
        if incoming.is_dir() {
            fs::remove_dir_all(&incoming)
                .map_err(|e| VaultError::io(format!("clear stale {}", incoming.display()), e))?;
        }
        if let Err(e) = container::copy_tree(staged, &incoming) {
            if incoming.is_dir() {
                let _ = fs::remove_dir_all(&incoming);
            }
            return Err(e);
        }

        let sidecar = if live.exists() {
            let sidecar = sidecar_path(live);
            if let Err(e) = fs::rename(live, &sidecar) {
                let _ = fs::remove_dir_all(&incoming);
                return Err(VaultError::io(format!("move {} aside", live.display()), e));
            }
            tracing::info!(target: "helen::archive", sidecar = %sidecar.display(), "💾 Current storage moved aside");
            Some(sidecar)
        } else {
            None
        };

        if let Err(e) = fs::rename(&incoming, live) {
            let _ = fs::remove_dir_all(&incoming);
            if let Some(sidecar) = &sidecar {
                if fs::rename(sidecar, live).is_err() {
                    tracing::error!(
                        target: "helen::archive",
                        sidecar = %sidecar.display(),
                        "Previous storage is preserved in the sidecar directory"
                    );
                }
            }
            return Err(VaultError::io(format!("install {}", live.display()), e));
        }
        Ok(sidecar)
    }

    fn resolve(&self, name_or_path: &str) -> VaultResult<PathBuf> {
        let trimmed = name_or_path.trim();
        if trimmed.is_empty() {
            return Err(VaultError::InvalidArchiveName(name_or_path.to_string()));
        }

        let direct = Path::new(trimmed);
        if direct.components().count() > 1 {
            return if direct.is_file() {
                Ok(direct.to_path_buf())
            } else {
                Err(VaultError::ArchiveNotFound(direct.to_path_buf()))
            };
        }

        let file_name = if direct.extension().and_then(|e| e.to_str()) == Some(ARCHIVE_EXTENSION) {
            trimmed.to_string()
        } else {
            format!("{}.{}", trimmed, ARCHIVE_EXTENSION)
        };
        let path = self.config.backup_dir.join(file_name);
        if path.is_file() {
            Ok(path)
        } else {
            Err(VaultError::ArchiveNotFound(path))
        }
    }
}

fn summarize(path: &Path) -> ArchiveSummary {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (size_bytes, modified) = match fs::metadata(path) {
        Ok(meta) => (
            meta.len(),
            meta.modified().map(DateTime::<Local>::from).unwrap_or_else(|_| Local::now()),
        ),
        Err(_) => (0, DateTime::<Local>::from(std::time::UNIX_EPOCH)),
    };
    let status = match container::inspect(path) {
        Inspection::Indexed(m) => ArchiveStatus::Indexed {
            collections: m.collections.len(),
            total_documents: m.total_documents,
            backup_timestamp: m.backup_timestamp,
        },
        Inspection::Legacy => ArchiveStatus::Legacy,
        Inspection::Corrupt(reason) => {
            tracing::warn!(target: "helen::archive", path = %path.display(), reason = %reason, "⚠️  Unreadable backup");
            ArchiveStatus::Corrupt { reason }
        }
    };
    ArchiveSummary {
        name,
        path: path.to_path_buf(),
        size_bytes,
        modified,
        status,
    }
}

fn read_staged_manifest(path: &Path) -> Option<BackupManifest> {
    let raw = fs::read(path).ok()?;
    match serde_json::from_slice(&raw) {
        Ok(manifest) => Some(manifest),
        Err(e) => {
            tracing::warn!(target: "helen::archive", error = %e, "⚠️  Backup metadata unreadable, continuing without it");
            None
        }
    }
}

/// Copies `src` over `dest` through a temporary file in the destination directory.
fn restore_file(src: &Path, dest: &Path) -> VaultResult<()> {
    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| VaultError::io(format!("create {}", parent.display()), e))?;
    }
    let tmp = dest.with_extension("json.tmp");
    fs::copy(src, &tmp).map_err(|e| VaultError::io(format!("write {}", tmp.display()), e))?;
    fs::rename(&tmp, dest).map_err(|e| VaultError::io(format!("replace {}", dest.display()), e))?;
    Ok(())
}

/// `<parent>/.<storage name>.incoming`, where a restored tree is assembled before it goes live.
fn incoming_path(live: &Path) -> PathBuf {
    let base = live
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| STORAGE_ENTRY.to_string());
    live.with_file_name(format!(".{}.incoming", base))
}

/// `<parent>/<storage name>_backup_YYYYMMDD_HHMMSS`, with `_N` appended if taken.
fn sidecar_path(live: &Path) -> PathBuf {
    let base = live
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| STORAGE_ENTRY.to_string());
    let candidate = live.with_file_name(format!("{}_backup_{}", base, stamp()));
    if !candidate.exists() {
        return candidate;
    }
    let mut n = 1;
    loop {
        let next = live.with_file_name(format!(
            "{}_{}",
            candidate.file_name().map(|s| s.to_string_lossy()).unwrap_or_default(),
            n
        ));
        if !next.exists() {
            return next;
        }
        n += 1;
    }
}

fn validate_name(name: &str) -> VaultResult<String> {
    let name = name.trim();
    let name = name.strip_suffix(".zip").unwrap_or(name);
    let invalid = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.starts_with('.')
        || name.chars().any(|c| c.is_control());
    if invalid {
        return Err(VaultError::InvalidArchiveName(name.to_string()));
    }
    Ok(name.to_string())
}

fn stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_validated() {
        assert_eq!(validate_name("nightly").unwrap(), "nightly");
        assert_eq!(validate_name("nightly.zip").unwrap(), "nightly");
        for bad in ["", "  ", "../escape", "a/b", "a\\b", ".hidden", "x..y"] {
            let err = validate_name(bad).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::InvalidArchiveName, "{bad:?}");
        }
    }

    #[test]
    fn sidecar_gets_a_suffix_when_taken() {
        let dir = tempfile::tempdir().unwrap();
        let live = dir.path().join("chroma_db");
        let first = sidecar_path(&live);
        assert!(first
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("chroma_db_backup_"));
        assert_eq!(first.parent(), live.parent());

        fs::create_dir_all(&first).unwrap();
        let second = sidecar_path(&live);
        assert_ne!(first, second);
        assert!(!second.exists());
    }

    #[test]
    fn archive_status_serializes_with_tag() {
        let json = serde_json::to_value(ArchiveStatus::Legacy).unwrap();
        assert_eq!(json["status"], "legacy");
    }
}
