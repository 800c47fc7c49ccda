//! Integration test: backup archives on a real filesystem.
//!
//! Verifies that:
//! 1. Backup then restore reproduces the storage tree and the ledger byte for byte.
//! 2. A failed backup leaves no archive, partial file or staging directory.
//! 3. Listing survives corrupt and legacy archives.
//! 4. Restore moves the live store aside instead of deleting it, and a declined or
//!    failed restore leaves it where it was.
//! 6. A restore that cannot install the new tree leaves no half-populated store.
//! 5. Backup and restore refuse to run while the storage lock is held.

mod common;

use common::FakeStore;
use helen_core::{
    AddContextRequest, AlwaysConfirm, ArchiveManager, ArchiveStatus, ErrorKind, NeverConfirm,
    ResourceLock, StoreClient, VaultConfig,
};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

struct Fixture {
    _dir: tempfile::TempDir,
    config: VaultConfig,
    store: Arc<FakeStore>,
    archives: ArchiveManager,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = VaultConfig {
            data_dir: dir.path().join("data"),
            backup_dir: dir.path().join("backups"),
            ..VaultConfig::default()
        };

        let storage = config.storage_dir();
        fs::create_dir_all(storage.join("0a1b2c")).unwrap();
        fs::write(storage.join("chroma.sqlite3"), b"sqlite v1").unwrap();
        fs::write(storage.join("0a1b2c/data_level0.bin"), [1u8, 2, 3, 4]).unwrap();
        fs::write(
            config.ledger_path(),
            br#"{"user_patterns":["Late-night messages"]}"#,
        )
        .unwrap();

        let store = Arc::new(FakeStore::new());
        let client: Arc<dyn StoreClient> = store.clone();
        let archives = ArchiveManager::from_config(&config, client);
        Self {
            _dir: dir,
            config,
            store,
            archives,
        }
    }

    fn storage(&self) -> PathBuf {
        self.config.storage_dir()
    }

    fn sidecars(&self) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = fs::read_dir(&self.config.data_dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.starts_with("chroma_db_backup_"))
                    .unwrap_or(false)
            })
            .collect();
        found.sort();
        found
    }

    fn backup_dir_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.config.backup_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}

fn mutate(storage: &Path, ledger: &Path) {
    fs::write(storage.join("chroma.sqlite3"), b"sqlite v2").unwrap();
    fs::write(storage.join("added_later.bin"), b"new").unwrap();
    fs::write(ledger, br#"{"user_patterns":["Late-night messages","Skipped meals"]}"#).unwrap();
}

#[tokio::test]
async fn backup_then_restore_round_trips() {
    let fx = Fixture::new();
    fx.store
        .add_context(&AddContextRequest {
            documents: vec!["Late-night messages".into()],
            metadatas: vec![serde_json::Map::new()],
            collection_name: "user_patterns".into(),
            ids: vec![],
        })
        .await
        .unwrap();

    let archive = fx.archives.create(Some("nightly")).await.unwrap();
    assert_eq!(archive.path, fx.config.backup_dir.join("nightly.zip"));
    assert!(archive.size_bytes > 0);
    assert_eq!(archive.size_bytes, fs::metadata(&archive.path).unwrap().len());
    assert!(archive.manifest.service_reachable);
    assert!(archive.manifest.storage_included);
    assert_eq!(archive.manifest.total_documents, 1);
    assert_eq!(archive.manifest.service_url, "http://fake.local:8000");

    let original_ledger = fs::read(fx.config.ledger_path()).unwrap();
    mutate(&fx.storage(), &fx.config.ledger_path());

    let report = fx.archives.restore("nightly", &AlwaysConfirm).await.unwrap();
    assert!(report.storage_restored);
    assert!(report.ledger_restored);
    assert_eq!(report.manifest.unwrap().total_documents, 1);

    assert_eq!(fs::read(fx.storage().join("chroma.sqlite3")).unwrap(), b"sqlite v1");
    assert_eq!(
        fs::read(fx.storage().join("0a1b2c/data_level0.bin")).unwrap(),
        vec![1u8, 2, 3, 4]
    );
    assert!(!fx.storage().join("added_later.bin").exists());
    assert_eq!(fs::read(fx.config.ledger_path()).unwrap(), original_ledger);

    // The store that was live before the restore is kept beside it.
    let sidecar = report.sidecar.expect("live storage should be moved aside");
    assert_eq!(fx.sidecars(), vec![sidecar.clone()]);
    assert_eq!(fs::read(sidecar.join("chroma.sqlite3")).unwrap(), b"sqlite v2");
    assert!(sidecar.join("added_later.bin").exists());

    // No staging directories survive either operation.
    assert_eq!(fx.backup_dir_entries(), vec!["nightly.zip".to_string()]);
}

#[tokio::test]
async fn backup_with_service_down_keeps_the_files() {
    let fx = Fixture::new();
    fx.store.set_down(true);

    let archive = fx.archives.create(None).await.unwrap();
    assert!(archive.name.starts_with("helen_backup_"));
    assert!(!archive.manifest.service_reachable);
    assert!(archive.manifest.collections.is_empty());

    mutate(&fx.storage(), &fx.config.ledger_path());
    // Service is down, so no confirmation is asked for.
    let report = fx.archives.restore(&archive.name, &NeverConfirm).await.unwrap();
    assert!(report.storage_restored);
    assert_eq!(fs::read(fx.storage().join("chroma.sqlite3")).unwrap(), b"sqlite v1");
}

#[tokio::test]
async fn backup_without_storage_is_flagged() {
    let fx = Fixture::new();
    fx.store.set_down(true);
    fs::remove_dir_all(fx.storage()).unwrap();

    let archive = fx.archives.create(Some("empty")).await.unwrap();
    assert!(!archive.manifest.storage_included);

    let report = fx.archives.restore("empty.zip", &NeverConfirm).await.unwrap();
    assert!(!report.storage_restored);
    assert!(report.ledger_restored);
    assert!(report.sidecar.is_none());
}

#[tokio::test]
async fn failed_backup_leaves_nothing_behind() {
    let mut fx = Fixture::new();
    fx.store.set_down(true);

    // A directory where the ledger file should be makes the ledger copy fail after
    // staging has started.
    let bad_ledger = fx.config.data_dir.join("ledger_dir");
    fs::create_dir_all(&bad_ledger).unwrap();
    fx.config.ledger_path = Some(bad_ledger);
    let client: Arc<dyn StoreClient> = fx.store.clone();
    fx.archives = ArchiveManager::from_config(&fx.config, client);

    let err = fx.archives.create(Some("broken")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert!(fx.backup_dir_entries().is_empty(), "left behind: {:?}", fx.backup_dir_entries());
    assert!(fx.archives.list().is_empty());
}

#[tokio::test]
async fn existing_archive_is_never_overwritten() {
    let fx = Fixture::new();
    fx.store.set_down(true);
    let first = fx.archives.create(Some("weekly")).await.unwrap();
    let before = fs::read(&first.path).unwrap();

    let err = fx.archives.create(Some("weekly")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArchiveExists);
    assert_eq!(fs::read(&first.path).unwrap(), before);
}

#[tokio::test]
async fn invalid_names_are_rejected() {
    let fx = Fixture::new();
    let err = fx.archives.create(Some("../outside")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArchiveName);
    assert!(fx.backup_dir_entries().is_empty());
}

#[tokio::test]
async fn listing_survives_corrupt_and_legacy_archives() {
    let fx = Fixture::new();
    fx.store.set_down(true);
    fx.archives.create(Some("good")).await.unwrap();

    let backups = &fx.config.backup_dir;
    fs::write(backups.join("junk.zip"), b"this is not a zip file").unwrap();

    let mut legacy = zip::ZipWriter::new(fs::File::create(backups.join("legacy.zip")).unwrap());
    legacy
        .start_file("chroma_db/chroma.sqlite3", zip::write::FileOptions::default())
        .unwrap();
    legacy.write_all(b"old").unwrap();
    legacy.finish().unwrap();

    // Leftovers from an interrupted run are not archives.
    fs::write(backups.join("crashed.zip.partial"), b"half").unwrap();
    fs::create_dir_all(backups.join(".staging-crashed")).unwrap();

    let summaries = fx.archives.list();
    assert_eq!(summaries.len(), 3);
    for pair in summaries.windows(2) {
        assert!(pair[0].modified >= pair[1].modified, "newest first");
    }

    let status_of = |name: &str| {
        summaries
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.status.clone())
            .unwrap()
    };
    assert!(matches!(status_of("good"), ArchiveStatus::Indexed { collections: 0, .. }));
    assert_eq!(status_of("legacy"), ArchiveStatus::Legacy);
    assert!(matches!(status_of("junk"), ArchiveStatus::Corrupt { .. }));
}

#[tokio::test]
async fn listing_a_missing_directory_is_empty() {
    let fx = Fixture::new();
    assert!(!fx.config.backup_dir.exists());
    assert!(fx.archives.list().is_empty());
}

#[tokio::test]
async fn declined_restore_changes_nothing() {
    let fx = Fixture::new();
    fx.archives.create(Some("nightly")).await.unwrap();
    mutate(&fx.storage(), &fx.config.ledger_path());
    let ledger_before = fs::read(fx.config.ledger_path()).unwrap();

    let err = fx.archives.restore("nightly", &NeverConfirm).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RestoreDeclined);
    assert_eq!(err.to_string(), "Restore cancelled");

    assert_eq!(fs::read(fx.storage().join("chroma.sqlite3")).unwrap(), b"sqlite v2");
    assert_eq!(fs::read(fx.config.ledger_path()).unwrap(), ledger_before);
    assert!(fx.sidecars().is_empty());
}

#[tokio::test]
async fn missing_archive_is_reported() {
    let fx = Fixture::new();
    let err = fx.archives.restore("does_not_exist", &AlwaysConfirm).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArchiveNotFound);
}

#[tokio::test]
async fn corrupt_archive_leaves_live_storage_in_place() {
    let fx = Fixture::new();
    fx.store.set_down(true);
    fs::create_dir_all(&fx.config.backup_dir).unwrap();
    fs::write(fx.config.backup_dir.join("truncated.zip"), b"PK\x03\x04 truncated").unwrap();

    let err = fx.archives.restore("truncated", &AlwaysConfirm).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ArchiveCorrupt);
    assert_eq!(fs::read(fx.storage().join("chroma.sqlite3")).unwrap(), b"sqlite v1");
    assert!(fx.sidecars().is_empty());
    assert_eq!(fx.backup_dir_entries(), vec!["truncated.zip".to_string()]);
}

#[tokio::test]
async fn restore_accepts_an_explicit_path() {
    let fx = Fixture::new();
    fx.store.set_down(true);
    let archive = fx.archives.create(Some("portable")).await.unwrap();

    let moved = fx.config.data_dir.join("portable-copy.zip");
    fs::copy(&archive.path, &moved).unwrap();
    mutate(&fx.storage(), &fx.config.ledger_path());

    let report = fx
        .archives
        .restore(moved.to_str().unwrap(), &AlwaysConfirm)
        .await
        .unwrap();
    assert_eq!(report.archive, moved);
    assert_eq!(fs::read(fx.storage().join("chroma.sqlite3")).unwrap(), b"sqlite v1");
}

#[tokio::test]
async fn held_storage_lock_makes_both_operations_busy() {
    let fx = Fixture::new();
    fx.store.set_down(true);
    fx.archives.create(Some("before-lock")).await.unwrap();

    let guard = ResourceLock::acquire(&fx.storage()).unwrap();
    let err = fx.archives.create(Some("while-locked")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceBusy);
    assert!(err.is_retryable());
    let err = fx.archives.restore("before-lock", &AlwaysConfirm).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ResourceBusy);
    assert!(fx.sidecars().is_empty());

    drop(guard);
    assert!(fx.archives.create(Some("after-lock")).await.is_ok());
}

#[tokio::test]
async fn failed_install_keeps_the_live_store_whole() {
    let fx = Fixture::new();
    fx.store.set_down(true);
    fx.archives.create(Some("snapshot")).await.unwrap();
    mutate(&fx.storage(), &fx.config.ledger_path());

    // A plain file where the restored tree is assembled.
    let blocker = fx.config.data_dir.join(".chroma_db.incoming");
    fs::write(&blocker, b"in the way").unwrap();

    let err = fx.archives.restore("snapshot", &AlwaysConfirm).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(fs::read(fx.storage().join("chroma.sqlite3")).unwrap(), b"sqlite v2");
    assert!(fx.storage().join("added_later.bin").exists());
    assert!(fx.sidecars().is_empty());
    assert_eq!(
        fs::read_to_string(fx.config.ledger_path()).unwrap(),
        r#"{"user_patterns":["Late-night messages","Skipped meals"]}"#
    );
    assert_eq!(fx.backup_dir_entries(), vec!["snapshot.zip".to_string()]);

    fs::remove_file(&blocker).unwrap();
    let report = fx.archives.restore("snapshot", &AlwaysConfirm).await.unwrap();
    let sidecar = report.sidecar.unwrap();
    assert_eq!(fs::read(sidecar.join("chroma.sqlite3")).unwrap(), b"sqlite v2");
    assert_eq!(fs::read(fx.storage().join("chroma.sqlite3")).unwrap(), b"sqlite v1");
    assert!(!fx.storage().join("added_later.bin").exists());
    assert!(!blocker.exists());
}
