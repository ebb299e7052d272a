//! Cache tiers consulted before any source
//!
//! Stores are ordered: the first one is the in-process [`MemoryStore`], later
//! ones are durable tiers such as the [`JsonFileStore`]. Every record a
//! source produces is written into all of them.

mod json;
mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;

use crate::cache::CacheError;
use crate::model::{Episode, Film, MediaQuery, SearchResult, Season, Show};
use thiserror::Error;

/// Errors that can occur while reading or writing a store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The on-disk cache failed
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// The store cannot serve requests at the moment
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A cache tier for metadata records
///
/// Lookups return `Ok(None)` on a miss. Writing a record replaces any record
/// stored under the same key.
pub trait Store {
    /// Human readable name used in log messages
    fn name(&self) -> &str;

    fn cache_show(&mut self, show: &Show) -> Result<(), StoreError>;

    /// Caches a season, replacing the previously cached one wholesale
    fn cache_season(&mut self, season: &Season) -> Result<(), StoreError>;

    fn cache_episode(&mut self, episode: &Episode) -> Result<(), StoreError>;

    fn cache_film(&mut self, film: &Film) -> Result<(), StoreError>;

    fn cache_search(&mut self, query: &MediaQuery, result: &SearchResult)
    -> Result<(), StoreError>;

    fn get_show(&self, source_id: &str, show_id: &str) -> Result<Option<Show>, StoreError>;

    fn get_season(
        &self,
        source_id: &str,
        show_id: &str,
        season: u32,
    ) -> Result<Option<Season>, StoreError>;

    fn get_episode(
        &self,
        source_id: &str,
        show_id: &str,
        season: u32,
        episode: u32,
    ) -> Result<Option<Episode>, StoreError>;

    fn get_special(
        &self,
        source_id: &str,
        show_id: &str,
        season: u32,
        special: u32,
    ) -> Result<Option<Episode>, StoreError>;

    fn get_film(&self, source_id: &str, film_id: &str) -> Result<Option<Film>, StoreError>;

    /// Looks up the result of an earlier search with the same query
    fn search_media(&self, query: &MediaQuery) -> Result<Option<SearchResult>, StoreError>;
}
