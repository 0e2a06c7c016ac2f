//! File-based package locks
//!
//! One advisory `flock` per package at `<lock_dir>/<name>.lock`, taken
//! without blocking so that a second build run touching the same package
//! fails fast instead of waiting.

use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::core::lock::LockManager;
use crate::error::LockError;

/// Package locks backed by lock files
#[derive(Debug)]
pub struct FileLockManager {
    lock_dir: PathBuf,
    held: Mutex<HashMap<String, File>>,
}

impl FileLockManager {
    /// Create a lock manager storing lock files in `lock_dir`
    pub fn new(lock_dir: PathBuf) -> Self {
        Self {
            lock_dir,
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Lock file path for a package
    pub fn lock_path(&self, package: &str) -> PathBuf {
        self.lock_dir.join(format!("{package}.lock"))
    }

    fn io_error(path: &Path, e: impl ToString) -> LockError {
        LockError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        }
    }
}

impl LockManager for FileLockManager {
    fn acquire(&self, package: &str) -> Result<(), LockError> {
        let path = self.lock_path(package);
        let mut held = self.held.lock().map_err(|e| Self::io_error(&path, e))?;

        if held.contains_key(package) {
            return Err(LockError::Contention {
                package: package.to_string(),
                path,
            });
        }

        std::fs::create_dir_all(&self.lock_dir).map_err(|e| Self::io_error(&self.lock_dir, e))?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Self::io_error(&path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                held.insert(package.to_string(), file);
                Ok(())
            }
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                Err(LockError::Contention {
                    package: package.to_string(),
                    path,
                })
            }
            Err(e) => Err(Self::io_error(&path, e)),
        }
    }

    fn release(&self, package: &str) -> Result<(), LockError> {
        let path = self.lock_path(package);
        let file = self
            .held
            .lock()
            .map_err(|e| Self::io_error(&path, e))?
            .remove(package);

        match file {
            Some(file) => FileExt::unlock(&file).map_err(|e| Self::io_error(&path, e)),
            None => Err(Self::io_error(&path, "lock is not held")),
        }
    }
}
