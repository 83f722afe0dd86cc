//! Suspend blockers
//!
//! Android-style wake locks written to `/sys/power/wake_lock` and
//! `/sys/power/wake_unlock`. Kernels without the interface make every call a
//! logged no-op.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Keeps the system awake while held
pub trait WakeLock: Send + Sync {
    fn name(&self) -> &str;

    /// Hold until [`WakeLock::unlock`]
    fn lock(&self);

    /// Hold for at most `timeout`
    fn lock_timeout(&self, timeout: Duration);

    fn unlock(&self);
}

/// Wake lock backed by the sysfs suspend-blocker interface
#[derive(Debug, Clone)]
pub struct SysfsWakeLock {
    name: String,
    lock_path: PathBuf,
    unlock_path: PathBuf,
}

impl SysfsWakeLock {
    /// Create a wake lock using the interface files under `power_dir`
    pub fn new(name: impl Into<String>, power_dir: &Path) -> Self {
        Self {
            name: name.into(),
            lock_path: power_dir.join("wake_lock"),
            unlock_path: power_dir.join("wake_unlock"),
        }
    }

    fn write(&self, path: &Path, contents: &str) {
        if let Err(e) = fs::write(path, contents) {
            tracing::debug!("wake lock {}: {} ({})", self.name, e, path.display());
        }
    }
}

impl WakeLock for SysfsWakeLock {
    fn name(&self) -> &str {
        &self.name
    }

    fn lock(&self) {
        self.write(&self.lock_path, &self.name);
    }

    fn lock_timeout(&self, timeout: Duration) {
        let contents = format!("{} {}", self.name, timeout.as_nanos());
        self.write(&self.lock_path, &contents);
    }

    fn unlock(&self) {
        self.write(&self.unlock_path, &self.name);
    }
}
