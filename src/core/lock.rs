//! Per-package build locks
//!
//! A package is locked before its source tree is touched and unlocked as
//! soon as sources are prepared. [`PackageLock`] releases exactly once:
//! either explicitly through [`PackageLock::release`] or, on early exit,
//! when dropped.

use crate::error::LockError;

/// Exclusive locks keyed by package name
pub trait LockManager: Send + Sync {
    /// Take the lock for `package`, failing if it is held elsewhere
    fn acquire(&self, package: &str) -> Result<(), LockError>;

    /// Give up the lock for `package`
    fn release(&self, package: &str) -> Result<(), LockError>;
}

/// A held package lock
#[must_use = "dropping the guard releases the lock immediately"]
pub struct PackageLock<'a> {
    manager: &'a dyn LockManager,
    package: String,
    held: bool,
}

impl<'a> PackageLock<'a> {
    /// Acquire the lock for `package`
    pub fn acquire(manager: &'a dyn LockManager, package: &str) -> Result<Self, LockError> {
        manager.acquire(package)?;
        tracing::info!("{package}: Locked.");
        Ok(Self {
            manager,
            package: package.to_string(),
            held: true,
        })
    }

    /// Release the lock
    pub fn release(mut self) -> Result<(), LockError> {
        self.held = false;
        tracing::info!("{}: Unlocked.", self.package);
        self.manager.release(&self.package)
    }
}

impl Drop for PackageLock<'_> {
    fn drop(&mut self) {
        if self.held {
            self.held = false;
            tracing::info!("{}: Unlocked.", self.package);
            if let Err(e) = self.manager.release(&self.package) {
                tracing::warn!("{}: failed to release lock: {e}", self.package);
            }
        }
    }
}

impl std::fmt::Debug for PackageLock<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageLock")
            .field("package", &self.package)
            .field("held", &self.held)
            .finish()
    }
}
