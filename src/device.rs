//! Block device name lookup through sysfs.
//!
//! The stats payload identifies block devices only by their kernel
//! `major:minor` numbers. Names come from `/sys/dev/block/<major>:<minor>/uevent`,
//! which carries a `DEVNAME=` line. Lookups are cached because every block I/O
//! metric touches the same handful of devices on every poll.

use ahash::AHashMap as HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, trace};

use crate::error::DeviceLookupError;

/// Default sysfs mount point.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys";

const DEVNAME_PREFIX: &str = "DEVNAME=";

/// Caching resolver from `(major, minor)` to device name.
///
/// Shared between containers of one poll cycle; a single mutex guards the
/// cache. The lock is not held while reading sysfs.
#[derive(Debug)]
pub struct DeviceNameResolver {
    root: PathBuf,
    cache: Mutex<HashMap<(u64, u64), String>>,
}

impl Default for DeviceNameResolver {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_ROOT)
    }
}

impl DeviceNameResolver {
    /// Creates a resolver reading `dev/block/*/uevent` below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the device name for `major:minor`, reading sysfs on a cache miss.
    pub fn resolve(&self, major: u64, minor: u64) -> Result<String, DeviceLookupError> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(name) = cache.get(&(major, minor)) {
                trace!("Device {}:{} resolved from cache: {}", major, minor, name);
                return Ok(name.clone());
            }
        }

        let name = self.read_devname(major, minor)?;
        debug!("Resolved device {}:{} to {}", major, minor, name);

        if let Ok(mut cache) = self.cache.lock() {
            cache.insert((major, minor), name.clone());
        }
        Ok(name)
    }

    /// Drops every cached entry. The next lookup of any device reads sysfs again.
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            debug!("Clearing {} cached device names", cache.len());
            cache.clear();
        }
    }

    /// Number of cached device names.
    pub fn len(&self) -> usize {
        self.cache.lock().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn uevent_path(&self, major: u64, minor: u64) -> PathBuf {
        self.root
            .join("dev")
            .join("block")
            .join(format!("{}:{}", major, minor))
            .join("uevent")
    }

    fn read_devname(&self, major: u64, minor: u64) -> Result<String, DeviceLookupError> {
        let path = self.uevent_path(major, minor);
        let content = fs::read_to_string(&path).map_err(|source| DeviceLookupError::Unreadable {
            major,
            minor,
            path: path.clone(),
            source,
        })?;

        content
            .lines()
            .find_map(|line| line.strip_prefix(DEVNAME_PREFIX))
            .map(str::to_string)
            .ok_or(DeviceLookupError::MissingDevName { major, minor })
    }
}
