//! Cache storage module
//!
//! This module provides persistent caching functionality below a cache
//! directory. Data is serialized to JSON format for storage, one file per
//! identifier.

use serde::{Deserialize, Serialize};
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    /// Failed to determine cache directory location
    #[error("Failed to determine cache directory location")]
    CacheDirectoryNotFound,

    /// Failed to create or access cache directory
    #[error("Failed to create cache directory at {path}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to read cached data
    #[error("Failed to read cache file {path}: {source}")]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write cached data
    #[error("Failed to write cache file {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to remove a cache file
    #[error("Failed to remove cache file {path}: {source}")]
    RemoveFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to deserialize cached data
    #[error("Failed to deserialize cache file {path}: {source}")]
    DeserializationFailed {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// Failed to serialize data for caching
    #[error("Failed to serialize data: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// A generic cache storage for serializable data
///
/// This structure provides persistent caching of data that implements
/// `Serialize` and `Deserialize`. Entries older than the optional time to
/// live are treated as missing.
pub(crate) struct CacheStorage<T> {
    /// The directory where cached data is stored
    cache_dir: PathBuf,
    /// Maximum age of an entry
    ttl: Option<Duration>,
    /// Phantom data for the generic type
    _phantom: PhantomData<T>,
}

impl<T> CacheStorage<T>
where
    T: Serialize + for<'de> Deserialize<'de>,
{
    /// Opens or creates a cache storage named `name` below `base_dir`
    ///
    /// The name will be sanitized (lowercased, non-alphanumeric characters
    /// replaced with underscores).
    ///
    /// # Examples
    ///
    /// ```ignore
    /// let cache: CacheStorage<Show> = CacheStorage::open_in(dir, "shows", None)?;
    /// ```
    pub fn open_in(base_dir: &Path, name: &str, ttl: Option<Duration>) -> Result<Self, CacheError> {
        let cache_dir = base_dir.join(sanitize_name(name));

        // Create the directory if it doesn't exist
        fs::create_dir_all(&cache_dir).map_err(|e| CacheError::DirectoryCreationFailed {
            path: cache_dir.clone(),
            source: e,
        })?;

        Ok(Self {
            cache_dir,
            ttl,
            _phantom: PhantomData,
        })
    }

    fn entry_path(&self, identifier: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", sanitize_name(identifier)))
    }

    /// Returns true if the file is older than the time to live
    fn is_expired(&self, file_path: &Path) -> bool {
        let Some(ttl) = self.ttl else {
            return false;
        };

        fs::metadata(file_path)
            .and_then(|metadata| metadata.modified())
            .ok()
            .and_then(|modified| SystemTime::now().duration_since(modified).ok())
            .is_some_and(|age| age > ttl)
    }

    /// Loads cached data for the given identifier
    ///
    /// Returns `None` if the data doesn't exist or has expired. Returns an
    /// error if the data exists but cannot be read or deserialized.
    pub fn load(&self, identifier: &str) -> Result<Option<T>, CacheError> {
        let file_path = self.entry_path(identifier);

        // If file doesn't exist, return None
        if !file_path.exists() {
            return Ok(None);
        }

        if self.is_expired(&file_path) {
            debug!(path = %file_path.display(), "cache entry expired");
            return Ok(None);
        }

        // Read the file
        let content = fs::read_to_string(&file_path).map_err(|e| CacheError::ReadFailed {
            path: file_path.clone(),
            source: e,
        })?;

        // Deserialize the JSON
        let data =
            serde_json::from_str(&content).map_err(|e| CacheError::DeserializationFailed {
                path: file_path,
                source: e,
            })?;

        Ok(Some(data))
    }

    /// Stores data in the cache with the given identifier
    ///
    /// An existing entry under the same identifier is replaced.
    pub fn store(&self, identifier: &str, data: &T) -> Result<(), CacheError> {
        let file_path = self.entry_path(identifier);

        // Serialize to JSON
        let content = serde_json::to_string_pretty(data)?;

        // Write to file
        fs::write(&file_path, content).map_err(|e| CacheError::WriteFailed {
            path: file_path,
            source: e,
        })?;

        Ok(())
    }

    /// Removes every entry whose identifier starts with `prefix`
    ///
    /// Returns the number of removed entries.
    pub fn remove_prefixed(&self, prefix: &str) -> Result<usize, CacheError> {
        let prefix = sanitize_name(prefix);
        let read_failed = |e| CacheError::ReadFailed {
            path: self.cache_dir.clone(),
            source: e,
        };

        let mut removed = 0;
        for entry in fs::read_dir(&self.cache_dir).map_err(read_failed)? {
            let path = entry.map_err(read_failed)?.path();
            let matches = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.starts_with(prefix.as_str()) && name.ends_with(".json"));
            if !matches {
                continue;
            }

            fs::remove_file(&path).map_err(|e| CacheError::RemoveFailed {
                path: path.clone(),
                source: e,
            })?;
            removed += 1;
        }

        Ok(removed)
    }
}

/// Sanitizes a name for use in file paths
///
/// Converts to lowercase and replaces all characters that are not
/// a-z, 0-9, or hyphen with underscores.
fn sanitize_name(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
