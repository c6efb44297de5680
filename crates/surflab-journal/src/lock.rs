//! Single-session journal lock.
//!
//! Exactly one session may own a scene's journal at a time. The lock is a
//! sibling file created with `create_new`; a second open fails with
//! `AlreadyOpen` instead of risking interleaved appends.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::JournalError;

/// Held for the lifetime of a journal session; removes the lock file on
/// drop.
#[derive(Debug)]
pub struct SessionLock {
    path: PathBuf,
}

impl SessionLock {
    /// Acquire the lock beside the given journal path.
    pub fn acquire(journal_path: &Path) -> Result<Self, JournalError> {
        let path = journal_path.with_extension("lock");
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                // Advisory only: the pid helps an operator clear a stale
                // lock after a hard crash.
                let _ = write!(file, "{}", std::process::id());
                Ok(Self { path })
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(JournalError::AlreadyOpen(path))
            }
            Err(e) => Err(JournalError::Io(e)),
        }
    }

    /// The lock file's path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SessionLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove journal lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let journal = tmp.path().join("history.jsonl");

        let lock = SessionLock::acquire(&journal).unwrap();
        let err = SessionLock::acquire(&journal).unwrap_err();
        assert!(matches!(err, JournalError::AlreadyOpen(_)));

        drop(lock);
        // Released: can acquire again.
        SessionLock::acquire(&journal).unwrap();
    }

    #[test]
    fn test_lock_file_removed_on_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let journal = tmp.path().join("history.jsonl");
        let lock_path = {
            let lock = SessionLock::acquire(&journal).unwrap();
            assert!(lock.path().exists());
            lock.path().to_path_buf()
        };
        assert!(!lock_path.exists());
    }
}
