//! Filesystem and zip plumbing behind the archive manager.

use super::manifest::{BackupManifest, MANIFEST_ENTRY};
use crate::error::{VaultError, VaultResult};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

/// What a container on disk turned out to be.
#[derive(Debug)]
pub(crate) enum Inspection {
    Indexed(BackupManifest),
    Legacy,
    Corrupt(String),
}

/// Recursively copies `src` into `dst`, returning the number of files copied.
/// Anything that is neither a file nor a directory is skipped.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> VaultResult<u64> {
    let mut copied = 0;
    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| VaultError::io(format!("walk {}", src.display()), e.into()))?;
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| VaultError::io("strip prefix", io::Error::other(e)))?;
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .map_err(|e| VaultError::io(format!("create {}", target.display()), e))?;
        } else if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| VaultError::io(format!("create {}", parent.display()), e))?;
            }
            fs::copy(entry.path(), &target).map_err(|e| {
                VaultError::io(format!("copy {}", entry.path().display()), e)
            })?;
            copied += 1;
        } else {
            tracing::debug!(target: "helen::archive", path = %entry.path().display(), "Skipping special file");
        }
    }
    Ok(copied)
}

/// Zips the contents of `staging` into a new file at `dest` and fsyncs it.
pub(crate) fn pack(staging: &Path, dest: &Path) -> VaultResult<()> {
    let zip_err = |e: zip::result::ZipError| VaultError::io(format!("write {}", dest.display()), io::Error::other(e));

    let file = File::create(dest).map_err(|e| VaultError::io(format!("create {}", dest.display()), e))?;
    let mut zip = ZipWriter::new(file);
    let options = entry_options(0);

    for entry in WalkDir::new(staging).sort_by_file_name() {
        let entry = entry.map_err(|e| VaultError::io(format!("walk {}", staging.display()), e.into()))?;
        let rel = match entry.path().strip_prefix(staging) {
            Ok(rel) if !rel.as_os_str().is_empty() => rel,
            _ => continue,
        };
        let name = entry_name(rel);

        if entry.file_type().is_dir() {
            zip.add_directory(name, options).map_err(zip_err)?;
        } else if entry.file_type().is_file() {
            let len = entry
                .metadata()
                .map_err(|e| VaultError::io(format!("stat {}", entry.path().display()), e.into()))?
                .len();
            zip.start_file(name, entry_options(len)).map_err(zip_err)?;
            let mut src = File::open(entry.path())
                .map_err(|e| VaultError::io(format!("open {}", entry.path().display()), e))?;
            io::copy(&mut src, &mut zip)
                .map_err(|e| VaultError::io(format!("compress {}", entry.path().display()), e))?;
        }
    }

    let file = zip.finish().map_err(zip_err)?;
    file.sync_all()
        .map_err(|e| VaultError::io(format!("sync {}", dest.display()), e))?;
    Ok(())
}

/// Deflate, 0o644, and Zip64 headers for entries too big for the classic format.
fn entry_options(len: u64) -> FileOptions {
    FileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644)
        .large_file(needs_zip64(len))
}

fn needs_zip64(len: u64) -> bool {
    len >= u64::from(u32::MAX)
}

/// Extracts `archive` into `dest`. Failures reading the archive, including entries
/// that would land outside `dest`, are `ArchiveCorrupt`; failures writing `dest` are `Io`.
pub(crate) fn unpack(archive: &Path, dest: &Path) -> VaultResult<()> {
    let file = File::open(archive).map_err(|e| VaultError::corrupt(archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| VaultError::corrupt(archive, e))?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| VaultError::corrupt(archive, e))?;
        let rel = match entry.enclosed_name() {
            Some(rel) => rel.to_path_buf(),
            None => {
                return Err(VaultError::corrupt(
                    archive,
                    format!("entry {:?} escapes the archive root", entry.name()),
                ))
            }
        };
        let out = dest.join(&rel);

        if entry.is_dir() {
            fs::create_dir_all(&out)
                .map_err(|e| VaultError::io(format!("create {}", out.display()), e))?;
            continue;
        }
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| VaultError::io(format!("create {}", parent.display()), e))?;
        }
        let mut out_file = File::create(&out)
            .map_err(|e| VaultError::io(format!("create {}", out.display()), e))?;
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = entry
                .read(&mut buf)
                .map_err(|e| VaultError::corrupt(archive, format!("{}: {}", rel.display(), e)))?;
            if n == 0 {
                break;
            }
            out_file
                .write_all(&buf[..n])
                .map_err(|e| VaultError::io(format!("write {}", out.display()), e))?;
        }
    }
    Ok(())
}

/// Reads just the manifest entry, without extracting anything.
pub(crate) fn inspect(archive: &Path) -> Inspection {
    let file = match File::open(archive) {
        Ok(f) => f,
        Err(e) => return Inspection::Corrupt(e.to_string()),
    };
    let mut zip = match ZipArchive::new(file) {
        Ok(z) => z,
        Err(e) => return Inspection::Corrupt(e.to_string()),
    };
    let mut entry = match zip.by_name(MANIFEST_ENTRY) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Inspection::Legacy,
        Err(e) => return Inspection::Corrupt(e.to_string()),
    };

    let mut raw = String::new();
    if let Err(e) = entry.read_to_string(&mut raw) {
        return Inspection::Corrupt(format!("Metadata read error: {}", e));
    }
    match serde_json::from_str::<BackupManifest>(&raw) {
        Ok(manifest) => Inspection::Indexed(manifest),
        Err(e) => Inspection::Corrupt(format!("Metadata read error: {}", e)),
    }
}

fn entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_and_unpack_preserve_tree() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging");
        fs::create_dir_all(staging.join("chroma_db/index")).unwrap();
        fs::write(staging.join("chroma_db/chroma.sqlite3"), b"sqlite").unwrap();
        fs::write(staging.join("chroma_db/index/data_level0.bin"), [0u8, 1, 2]).unwrap();
        fs::write(staging.join("seeded_content.json"), b"{}").unwrap();

        let zip_path = dir.path().join("a.zip");
        pack(&staging, &zip_path).unwrap();

        let out = dir.path().join("out");
        unpack(&zip_path, &out).unwrap();
        assert_eq!(fs::read(out.join("chroma_db/chroma.sqlite3")).unwrap(), b"sqlite");
        assert_eq!(
            fs::read(out.join("chroma_db/index/data_level0.bin")).unwrap(),
            vec![0u8, 1, 2]
        );
        assert!(matches!(inspect(&zip_path), Inspection::Legacy));
    }

    #[test]
    fn unpack_rejects_escaping_entries() {
        let dir = tempfile::tempdir().unwrap();
        let zip_path = dir.path().join("evil.zip");
        let mut zip = ZipWriter::new(File::create(&zip_path).unwrap());
        zip.start_file("../outside.txt", FileOptions::default()).unwrap();
        zip.write_all(b"nope").unwrap();
        zip.finish().unwrap();

        let err = unpack(&zip_path, &dir.path().join("out")).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ArchiveCorrupt);
        assert!(!dir.path().join("outside.txt").exists());
    }

    #[test]
    fn zip64_kicks_in_at_the_classic_size_limit() {
        assert!(!needs_zip64(0));
        assert!(!needs_zip64(u64::from(u32::MAX) - 1));
        assert!(needs_zip64(u64::from(u32::MAX)));
        assert!(needs_zip64((1 << 32) + 17));
    }

    #[test]
    #[ignore = "compresses a 4 GiB sparse file"]
    fn pack_handles_entries_over_four_gib() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging");
        fs::create_dir_all(staging.join("chroma_db")).unwrap();
        let big = File::create(staging.join("chroma_db/chroma.sqlite3")).unwrap();
        big.set_len((1 << 32) + 17).unwrap();
        drop(big);

        let zip_path = dir.path().join("big.zip");
        pack(&staging, &zip_path).unwrap();

        let mut zip = ZipArchive::new(File::open(&zip_path).unwrap()).unwrap();
        let entry = zip.by_name("chroma_db/chroma.sqlite3").unwrap();
        assert_eq!(entry.size(), (1 << 32) + 17);
    }

    #[test]
    fn unpack_into_an_unwritable_destination_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging");
        fs::create_dir_all(staging.join("chroma_db")).unwrap();
        fs::write(staging.join("chroma_db/chroma.sqlite3"), b"sqlite").unwrap();
        let zip_path = dir.path().join("a.zip");
        pack(&staging, &zip_path).unwrap();

        // A plain file where the extraction root should be.
        let dest = dir.path().join("out");
        fs::write(&dest, b"in the way").unwrap();
        let err = unpack(&zip_path, &dest).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Io);
    }

    #[test]
    fn inspect_flags_garbage_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.zip");
        fs::write(&path, b"definitely not a zip").unwrap();
        assert!(matches!(inspect(&path), Inspection::Corrupt(_)));
    }

    #[test]
    fn copy_tree_counts_files() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        fs::create_dir_all(src.join("nested/deeper")).unwrap();
        fs::write(src.join("a"), b"a").unwrap();
        fs::write(src.join("nested/deeper/b"), b"b").unwrap();

        let copied = copy_tree(&src, &dir.path().join("dst")).unwrap();
        assert_eq!(copied, 2);
        assert_eq!(fs::read(dir.path().join("dst/nested/deeper/b")).unwrap(), b"b");
    }
}
