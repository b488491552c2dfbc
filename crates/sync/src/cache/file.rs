// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;

use kb_core::ClockSource;

use super::{Cache, CacheEntry};

const CACHE_DIR_NAME: &str = "kerbside";

/// The platform cache directory for kerbside, e.g. `~/.cache/kerbside`.
///
/// `None` when the platform has no cache directory.
pub fn default_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join(CACHE_DIR_NAME))
}

/// Persistent cache storing one JSON file per key.
pub struct FileCache<T> {
    dir: PathBuf,
    clock: Arc<dyn ClockSource>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> FileCache<T> {
    pub fn new(dir: impl Into<PathBuf>, clock: Arc<dyn ClockSource>) -> Self {
        FileCache {
            dir: dir.into(),
            clock,
            _marker: PhantomData,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding `key`. Characters outside `[A-Za-z0-9_-]` become `_`.
    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", name))
    }

    /// Write through a sibling temp file so readers never see a partial entry.
    fn replace_file(&self, path: &Path, content: &str) -> io::Result<()> {
        let tmp = path.with_extension(format!("json.{:016x}.tmp", rand::random::<u64>()));
        fs::write(&tmp, content)?;
        fs::rename(&tmp, path).inspect_err(|_| {
            let _ = fs::remove_file(&tmp);
        })
    }

    fn remove_file(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove cache file");
            }
        }
    }
}

impl<T: Serialize + DeserializeOwned> Cache<T> for FileCache<T> {
    fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        let path = self.path_for(key);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::debug!(key, error = %e, "unreadable cache file");
                return None;
            }
        };
        let entry: CacheEntry<T> = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(key, error = %e, "corrupt cache file");
                return None;
            }
        };
        if entry.is_expired(self.clock.now_ms()) {
            tracing::debug!(key, "cache entry expired");
            self.remove_file(&path);
            return None;
        }
        Some(entry)
    }

    fn put(&self, key: &str, value: T, ttl: Duration) {
        let entry = CacheEntry::new(value, self.clock.now_ms(), ttl);
        let result = fs::create_dir_all(&self.dir)
            .and_then(|()| serde_json::to_string(&entry).map_err(io::Error::from))
            .and_then(|json| self.replace_file(&self.path_for(key), &json));
        if let Err(e) = result {
            tracing::warn!(key, error = %e, "failed to write cache file");
        }
    }

    fn remove(&self, key: &str) {
        self.remove_file(&self.path_for(key));
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
