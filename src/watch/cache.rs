// src/watch/cache.rs

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::fs::FileSystem;
use crate::watch::hash::{Digest, compute_file_digest};

/// Last-known content digest per monitored file.
///
/// Keys are path strings exactly as the caller passed them; the monitoring
/// strategies always use absolute paths, so the same file maps to one key.
///
/// The map sits behind a mutex: `changed` hashes and updates under a single
/// lock acquisition, so callers on different threads never interleave a
/// read-compare-store for the same path.
pub struct ChangeCache {
    fs: Arc<dyn FileSystem>,
    digests: Mutex<HashMap<String, Digest>>,
}

impl fmt::Debug for ChangeCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeCache")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

impl ChangeCache {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self::from_entries(fs, HashMap::new())
    }

    /// Rebuild a cache from persisted `path -> digest` entries.
    pub fn from_entries<I>(fs: Arc<dyn FileSystem>, entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Digest)>,
    {
        Self {
            fs,
            digests: Mutex::new(entries.into_iter().collect()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Digest>> {
        self.digests.lock().unwrap_or_else(|poisoned| {
            warn!("change cache mutex poisoned; recovering");
            poisoned.into_inner()
        })
    }

    /// Hash `path` and record the fresh digest.
    ///
    /// Returns true if the digest differs from the stored one, or if the path
    /// has never been seen before. Calling it again without modifying the file
    /// returns false.
    pub fn changed(&self, path: &Path) -> bool {
        let key = path.to_string_lossy().into_owned();
        let mut digests = self.lock();

        let current = compute_file_digest(self.fs.as_ref(), path);
        let previous = digests.insert(key, current.clone());

        let changed = previous.as_ref() != Some(&current);
        if changed {
            debug!(path = ?path, "content changed");
        }
        changed
    }

    /// Stored digest for `path`, without rehashing.
    pub fn digest_of(&self, path: &Path) -> Option<Digest> {
        self.lock().get(path.to_string_lossy().as_ref()).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Consistent, sorted copy of every entry, for persistence.
    pub fn snapshot(&self) -> BTreeMap<String, Digest> {
        self.lock()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
