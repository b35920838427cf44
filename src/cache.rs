//! Freshness-windowed file cache for parsed feed items.
//!
//! One JSON file per feed URL, keyed by the host + path + query of the
//! originally requested URL. A read returns the cached items only when the
//! file's mtime falls inside the configured lifetime; anything else — stale
//! entry, unreadable file, corrupt JSON — is a cache miss, never an error.
//! Writes go through a temp file and an atomic rename so a concurrent
//! reader never sees a partial entry.

use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use url::Url;

use crate::feed::ItemRecord;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache directory '{0}' does not exist or is not a directory")]
    BadDirectory(PathBuf),

    #[error("failed to write cache file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize cached items: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// File cache with a fixed freshness window.
pub struct FeedCache {
    dir: PathBuf,
    lifetime: Duration,
}

impl FeedCache {
    /// The directory must already exist; it is never created implicitly.
    pub fn new(dir: impl Into<PathBuf>, lifetime: Duration) -> Result<Self, CacheError> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(CacheError::BadDirectory(dir));
        }
        Ok(FeedCache { dir, lifetime })
    }

    /// Items for `url` if a fresh, readable, well-formed entry exists.
    pub fn read(&self, url: &Url) -> Option<Vec<ItemRecord>> {
        let path = self.file_path(url);
        let meta = std::fs::metadata(&path).ok()?;
        let modified = meta.modified().ok()?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);

        if age >= self.lifetime {
            tracing::debug!(path = %path.display(), age_secs = age.as_secs(), "cache entry stale");
            return None;
        }

        let bytes = std::fs::read(&path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(items) => {
                tracing::debug!(path = %path.display(), "cache hit");
                Some(items)
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "corrupt cache entry ignored");
                None
            }
        }
    }

    /// Persist the items for `url`, replacing any existing entry.
    pub fn write(&self, url: &Url, items: &[ItemRecord]) -> Result<(), CacheError> {
        let path = self.file_path(url);
        let bytes = serde_json::to_vec(items)?;

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp = path.with_extension(format!("tmp.{nanos:016x}"));

        if let Err(e) = write_then_rename(&temp, &path, &bytes) {
            let _ = std::fs::remove_file(&temp);
            return Err(e.into());
        }

        tracing::debug!(path = %path.display(), items = items.len(), "cache entry written");
        Ok(())
    }

    /// Cache filename: sanitized host for legibility, digest prefix for
    /// uniqueness across paths and queries.
    fn file_path(&self, url: &Url) -> PathBuf {
        let key = cache_key(url);
        let digest = format!("{:x}", Sha256::digest(key.as_bytes()));

        let host: String = url
            .host_str()
            .unwrap_or("feed")
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        self.dir.join(format!("{host}-{}.json", &digest[..16]))
    }
}

/// host + path + query of the originally requested URL. Fragments and any
/// post-redirect URL play no part in the key.
fn cache_key(url: &Url) -> String {
    format!(
        "{}{}?{}",
        url.host_str().unwrap_or_default(),
        url.path(),
        url.query().unwrap_or_default()
    )
}

fn write_then_rename(temp: &Path, dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(temp)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    std::fs::rename(temp, dest)
}
