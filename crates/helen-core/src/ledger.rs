//! Seed ledger: per-collection record of content fingerprints already written.
//!
//! ## File format
//!
//! A single JSON object mapping collection name to an ordered list of fingerprints:
//!
//! ```json
//! { "user_patterns": ["User shows attention fade pattern: short responses,...", "..."] }
//! ```
//!
//! The ledger is the sole source of truth for "already seeded". Fingerprints are only
//! ever added by seeding; restoring an archive replaces the whole file.
//!
//! Seeding runs hold the `<path>.lock` lock from load to last save (see
//! [`SeedLedger::lock_and_load`]). `save` also folds in whatever is on disk, so a
//! ledger loaded earlier never drops fingerprints another writer recorded.

use crate::error::{VaultError, VaultResult};
use crate::lock::ResourceLock;
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Prefix length used by the persisted fingerprint scheme.
pub const FINGERPRINT_PREFIX_CHARS: usize = 50;

/// Derives the identifier stored in the ledger for a piece of content.
///
/// Swapping the scheme changes what existing ledgers mean: a ledger written with one
/// scheme does not recognise content under another, so a migration has to rewrite it.
pub trait Fingerprinter: Send + Sync {
    fn fingerprint(&self, text: &str) -> String;
}

/// `text[:50] + "..."` when the text is longer than 50 characters, the text itself otherwise.
///
/// Human-auditable but weak: two documents sharing their first 50 characters collide,
/// and the second is treated as already seeded. Lengths count `char`s, so a cut never
/// lands inside a UTF-8 sequence.
#[derive(Debug, Clone, Copy)]
pub struct PrefixFingerprint {
    pub prefix_chars: usize,
}

impl Default for PrefixFingerprint {
    fn default() -> Self {
        Self {
            prefix_chars: FINGERPRINT_PREFIX_CHARS,
        }
    }
}

impl Fingerprinter for PrefixFingerprint {
    fn fingerprint(&self, text: &str) -> String {
        match text.char_indices().nth(self.prefix_chars) {
            Some((cut, _)) => format!("{}...", &text[..cut]),
            None => text.to_string(),
        }
    }
}

/// Fingerprint with the default 50-character prefix scheme.
pub fn fingerprint(text: &str) -> String {
    PrefixFingerprint::default().fingerprint(text)
}

#[derive(Debug, Clone, Default)]
struct CollectionEntries {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl CollectionEntries {
    fn from_list(list: Vec<String>) -> Self {
        let mut entries = Self::default();
        for fp in list {
            entries.insert(fp);
        }
        entries
    }

    fn insert(&mut self, fp: String) -> bool {
        if self.seen.insert(fp.clone()) {
            self.order.push(fp);
            true
        } else {
            false
        }
    }
}

/// Persisted collection -> fingerprint-set mapping.
#[derive(Debug, Clone)]
pub struct SeedLedger {
    path: PathBuf,
    entries: BTreeMap<String, CollectionEntries>,
}

impl SeedLedger {
    /// Empty ledger bound to `path` (nothing is read or written).
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Reads the ledger at `path`. A missing file is a first run and yields an empty ledger;
    /// a file that exists but cannot be read or parsed is a `LedgerIOFailure`.
    pub fn load(path: impl Into<PathBuf>) -> VaultResult<Self> {
        let path = path.into();
        if !path.exists() {
            tracing::debug!(target: "helen::ledger", path = %path.display(), "No seed ledger yet; starting empty");
            return Ok(Self::empty(path));
        }

        let entries = read_entries(&path)?;

        let ledger = Self { path, entries };
        tracing::debug!(
            target: "helen::ledger",
            path = %ledger.path.display(),
            collections = ledger.entries.len(),
            fingerprints = ledger.len(),
            "Loaded seed ledger"
        );
        Ok(ledger)
    }

    /// Takes the ledger lock, then loads. Keep the guard alive until the last `save`.
    pub fn lock_and_load(path: impl Into<PathBuf>) -> VaultResult<(ResourceLock, Self)> {
        let path = path.into();
        let guard = ResourceLock::acquire(&path)?;
        let ledger = Self::load(path)?;
        Ok((guard, ledger))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_seeded(&self, collection: &str, fingerprint: &str) -> bool {
        self.entries
            .get(collection)
            .is_some_and(|e| e.seen.contains(fingerprint))
    }

    /// Records `fingerprint` for `collection` in memory. Returns false if it was already present.
    pub fn mark_seeded(&mut self, collection: &str, fingerprint: impl Into<String>) -> bool {
        self.entries
            .entry(collection.to_string())
            .or_default()
            .insert(fingerprint.into())
    }

    /// Persists the full mapping: write `<path>.tmp`, fsync, then rename over the target.
    ///
    /// Fingerprints already in the file are merged in first (and kept in memory), so the
    /// persisted set only grows.
    pub fn save(&mut self) -> VaultResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| VaultError::ledger(&self.path, e))?;
        }
        if self.path.exists() {
            self.merge_from_disk()?;
        }

        let snapshot: BTreeMap<&str, &Vec<String>> = self
            .entries
            .iter()
            .map(|(k, v)| (k.as_str(), &v.order))
            .collect();
        let json = serde_json::to_vec_pretty(&snapshot).map_err(|e| VaultError::ledger(&self.path, e))?;

        let tmp = tmp_path(&self.path);
        let write = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(&json)?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        if let Err(e) = write() {
            let _ = fs::remove_file(&tmp);
            return Err(VaultError::ledger(&self.path, e));
        }
        Ok(())
    }

    fn merge_from_disk(&mut self) -> VaultResult<()> {
        let mut merged = read_entries(&self.path)?;
        for (collection, mine) in std::mem::take(&mut self.entries) {
            let entries = merged.entry(collection).or_default();
            for fp in mine.order {
                entries.insert(fp);
            }
        }
        self.entries = merged;
        Ok(())
    }

    /// Collections with at least one recorded fingerprint.
    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Fingerprints for `collection`, in the order they were recorded.
    pub fn fingerprints(&self, collection: &str) -> &[String] {
        self.entries
            .get(collection)
            .map(|e| e.order.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of fingerprints across all collections.
    pub fn len(&self) -> usize {
        self.entries.values().map(|e| e.order.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn read_entries(path: &Path) -> VaultResult<BTreeMap<String, CollectionEntries>> {
    let bytes = fs::read(path).map_err(|e| VaultError::ledger(path, e))?;
    let raw: BTreeMap<String, Vec<String>> =
        serde_json::from_slice(&bytes).map_err(|e| VaultError::ledger(path, e))?;
    Ok(raw
        .into_iter()
        .map(|(collection, list)| (collection, CollectionEntries::from_list(list)))
        .collect())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
