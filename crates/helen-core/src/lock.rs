//! Exclusive advisory locks over vault resources.
//!
//! The lock file is a sibling of the guarded path (`<path>.lock`), never a child:
//! restore renames the storage directory, and a lock inside it would move with it.
//! On Unix the file is held with `flock(LOCK_EX | LOCK_NB)`, so a crashed holder
//! never leaves a stale lock behind. Elsewhere the file is created exclusively and
//! removed on drop.

use crate::error::{VaultError, VaultResult};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Held lock; released when dropped.
#[derive(Debug)]
pub struct ResourceLock {
    guarded: PathBuf,
    lock_path: PathBuf,
    #[allow(dead_code)]
    file: File,
}

impl ResourceLock {
    /// Try to take the lock for `guarded` without blocking. `ResourceBusy` if another holder exists.
    pub fn acquire(guarded: &Path) -> VaultResult<Self> {
        let lock_path = lock_path_for(guarded);
        if let Some(parent) = lock_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| VaultError::io(format!("create {}", parent.display()), e))?;
        }

        let file = open_exclusive(&lock_path, guarded)?;
        tracing::debug!(target: "helen::lock", path = %lock_path.display(), "Lock acquired");
        Ok(Self {
            guarded: guarded.to_path_buf(),
            lock_path,
            file,
        })
    }

    pub fn guarded(&self) -> &Path {
        &self.guarded
    }
}

impl Drop for ResourceLock {
    fn drop(&mut self) {
        #[cfg(not(unix))]
        {
            let _ = fs::remove_file(&self.lock_path);
        }
        tracing::debug!(target: "helen::lock", path = %self.lock_path.display(), "Lock released");
    }
}

fn lock_path_for(guarded: &Path) -> PathBuf {
    let mut name = guarded
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "vault".into());
    name.push(".lock");
    guarded.with_file_name(name)
}

#[cfg(unix)]
fn open_exclusive(lock_path: &Path, guarded: &Path) -> VaultResult<File> {
    use std::os::unix::io::AsRawFd;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(lock_path)
        .map_err(|e| VaultError::io(format!("open {}", lock_path.display()), e))?;

    // SAFETY: the descriptor belongs to `file`, which outlives the call.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB) };
    if rc == 0 {
        return Ok(file);
    }
    let err = std::io::Error::last_os_error();
    if err.raw_os_error() == Some(libc::EWOULDBLOCK) {
        Err(VaultError::ResourceBusy(guarded.to_path_buf()))
    } else {
        Err(VaultError::io(format!("flock {}", lock_path.display()), err))
    }
}

#[cfg(not(unix))]
fn open_exclusive(lock_path: &Path, guarded: &Path) -> VaultResult<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(lock_path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                VaultError::ResourceBusy(guarded.to_path_buf())
            } else {
                VaultError::io(format!("create {}", lock_path.display()), e)
            }
        })
}
