//! On-disk cache tier
//!
//! Each value is stored with `bincode` in its own file, named by the SHA-256
//! of the resource URL. File I/O runs as jobs on the general-purpose executor.

use crate::loader::ResourceLoader;
use cascade_core::{Async, CascadeError, ExecutorRef, Executors, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const ENTRY_EXTENSION: &str = "bin";

/// Directory of serialized cache entries
#[derive(Clone)]
pub struct DiskCache {
    directory: PathBuf,
    general: ExecutorRef,
}

impl fmt::Debug for DiskCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiskCache")
            .field("directory", &self.directory)
            .field("general", &self.general.label())
            .finish()
    }
}

impl DiskCache {
    /// Open (creating if needed) the cache directory `directory`
    pub fn open<P: AsRef<Path>>(directory: P, executors: &Executors) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory).map_err(|e| {
            CascadeError::io(format!("create {}: {}", directory.display(), e))
        })?;
        debug!(directory = %directory.display(), "opened disk cache");
        Ok(Self {
            directory,
            general: executors.general().clone(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// File holding the entry for `url`
    pub fn entry_path(&self, url: &str) -> PathBuf {
        let digest = Sha256::digest(url.as_bytes());
        self.directory
            .join(format!("{}.{}", hex::encode(digest), ENTRY_EXTENSION))
    }

    /// Loader view: a missing file is `Err(CacheMiss)`, an unreadable one
    /// `Err(Decode)`
    pub fn loader<T>(&self) -> ResourceLoader<T>
    where
        T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let reader = self.clone();
        let writer = self.clone();
        ResourceLoader::new(
            move |resource| reader.read(resource.url()),
            move |resource, value| writer.write(resource.url(), value),
        )
    }

    pub fn read<T>(&self, url: &str) -> Async<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let path = self.entry_path(url);
        let url = url.to_string();
        Async::spawn(&self.general, move || read_entry(&path, &url))
    }

    pub fn write<T>(&self, url: &str, value: T) -> Async<()>
    where
        T: Serialize + Send + Sync + 'static,
    {
        let path = self.entry_path(url);
        Async::spawn(&self.general, move || write_entry(&path, &value))
    }

    /// Delete the entry for `url`; removing a missing entry succeeds
    pub fn remove(&self, url: &str) -> Async<()> {
        let path = self.entry_path(url);
        Async::spawn(&self.general, move || match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        })
    }
}

fn read_entry<T: DeserializeOwned>(path: &Path, url: &str) -> Result<T> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(CascadeError::cache_miss(url)),
        Err(e) => return Err(e.into()),
    };
    bincode::deserialize(&bytes)
        .map_err(|e| CascadeError::decode(format!("corrupt cache entry for {url}: {e}")))
}

fn write_entry<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = bincode::serialize(value).map_err(|e| CascadeError::encode(e.to_string()))?;
    // Readers never see a half-written entry: write aside, then rename over.
    let staging = path.with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
    let stored = fs::write(&staging, bytes).and_then(|()| fs::rename(&staging, path));
    if let Err(e) = stored {
        if let Err(cleanup) = fs::remove_file(&staging) {
            if cleanup.kind() != ErrorKind::NotFound {
                warn!(staging = %staging.display(), error = %cleanup, "failed to remove staging file");
            }
        }
        return Err(CascadeError::io(format!("write {}: {}", path.display(), e)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_path_is_stable_per_url() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), &Executors::inline()).unwrap();

        let first = cache.entry_path("https://example.com/a");
        assert_eq!(first, cache.entry_path("https://example.com/a"));
        assert_ne!(first, cache.entry_path("https://example.com/b"));
        assert_eq!(first.parent(), Some(dir.path()));
        assert_eq!(first.extension().and_then(|e| e.to_str()), Some("bin"));
    }

    #[test]
    fn test_missing_entry_is_cache_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), &Executors::inline()).unwrap();
        assert_eq!(
            cache.read::<String>("https://example.com/a").wait(),
            Err(CascadeError::cache_miss("https://example.com/a"))
        );
    }

    #[test]
    fn test_corrupt_entry_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), &Executors::inline()).unwrap();
        fs::write(cache.entry_path("https://example.com/a"), [0xff]).unwrap();

        let outcome = cache.read::<String>("https://example.com/a").wait();
        assert!(matches!(outcome, Err(CascadeError::Decode { .. })));
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refuses to serialize"))
        }
    }

    #[test]
    fn test_unencodable_value_is_encode_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), &Executors::inline()).unwrap();
        let outcome = cache.write("https://example.com/a", Unencodable).wait();
        assert!(matches!(outcome, Err(CascadeError::Encode { .. })));
    }

    #[test]
    fn test_failed_rename_leaves_no_staging_file() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), &Executors::inline()).unwrap();
        // A non-empty directory where the entry belongs makes the rename fail.
        let entry = cache.entry_path("https://example.com/a");
        fs::create_dir(&entry).unwrap();
        fs::write(entry.join("occupant"), b"x").unwrap();

        let outcome = cache.write("https://example.com/a", 5u64).wait();
        assert!(matches!(outcome, Err(CascadeError::Io { .. })));

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|path| path.to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "staging files left behind: {leftovers:?}");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path(), &Executors::inline()).unwrap();
        cache.write("https://example.com/a", 5u64).wait().unwrap();
        cache.remove("https://example.com/a").wait().unwrap();
        cache.remove("https://example.com/a").wait().unwrap();
        assert!(cache
            .read::<u64>("https://example.com/a")
            .wait()
            .unwrap_err()
            .is_cache_miss());
    }
}
