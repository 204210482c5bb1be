//! Disk-backed image cache keyed by source URL.
//!
//! Entries live in one directory, one file per URL, named by the SHA-256
//! of the URL. There is no eviction; `clear` empties the directory.
//!
//! Concurrent misses for the same URL are not coalesced: each caller
//! fetches and writes, and the last write wins.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::source::ImageFetcher;

/// Directory name of the image cache inside the application cache dir
pub const IMAGE_CACHE_DIR: &str = "place-images";

pub struct ImageCache {
    dir: PathBuf,
    fetcher: Arc<dyn ImageFetcher>,
    write_lock: Mutex<()>,
}

impl ImageCache {
    pub fn new(dir: PathBuf, fetcher: Arc<dyn ImageFetcher>) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create image cache directory: {}", dir.display()))?;
        Ok(Self {
            dir,
            fetcher,
            write_lock: Mutex::new(()),
        })
    }

    /// File name for a URL: lowercase hex SHA-256 of the URL string.
    pub fn key_for(url: &str) -> String {
        hex::encode(Sha256::digest(url.as_bytes()))
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        self.dir.join(Self::key_for(url))
    }

    /// Image bytes for `url`, from disk when present, otherwise fetched and
    /// stored. Fetch failures propagate and leave the cache untouched.
    pub async fn image(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        if let Some(bytes) = self.lookup(url) {
            debug!(url = url, "Image cache hit");
            return Ok(bytes);
        }

        debug!(url = url, "Image cache miss, fetching");
        let bytes = self.fetcher.fetch(url).await?;

        if let Err(e) = self.store(url, &bytes) {
            warn!(url = url, error = %e, "Failed to write image cache entry");
        }
        Ok(bytes)
    }

    /// Cached bytes, or `None` when absent or unreadable.
    pub fn lookup(&self, url: &str) -> Option<Vec<u8>> {
        match std::fs::read(self.entry_path(url)) {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => None,
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                debug!(url = url, error = %e, "Failed to read image cache entry");
                None
            }
        }
    }

    /// True when `image(url)` would be served without a fetch.
    pub fn contains(&self, url: &str) -> bool {
        self.lookup(url).is_some()
    }

    fn store(&self, url: &str, bytes: &[u8]) -> Result<()> {
        let path = self.entry_path(url);
        let tmp_path = path.with_extension("tmp");

        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Image cache write lock poisoned"))?;
        std::fs::write(&tmp_path, bytes)
            .with_context(|| format!("Failed to write image cache entry for {}", url))?;
        std::fs::rename(&tmp_path, &path)
            .with_context(|| format!("Failed to replace image cache entry for {}", url))?;
        Ok(())
    }

    pub fn remove(&self, url: &str) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Image cache write lock poisoned"))?;
        match std::fs::remove_file(self.entry_path(url)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove image cache entry for {}", url)),
        }
    }

    /// Delete every entry. Returns how many files were removed.
    pub fn clear(&self) -> Result<usize> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("Image cache write lock poisoned"))?;

        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to list image cache: {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove {}", path.display()))?;
                removed += 1;
            }
        }
        debug!(removed = removed, "Cleared image cache");
        Ok(removed)
    }
}
