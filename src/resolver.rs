//! Read-through resolution of metadata over stores and sources
//!
//! A [`MetadataResolver`] owns an ordered list of stores and an ordered list
//! of sources. Lookups try the stores first; on a miss the source named in
//! the request is asked and its answer is written back into every store.
//!
//! With `refresh` set only the first store (the in-process tier) is read, so
//! records fetched earlier in the same run are reused while durable caches
//! are bypassed.

use crate::metadata_retrieval::{Source, SourceError};
use crate::model::{Episode, Film, MediaQuery, SearchResult, Season, Show};
use crate::store::{Store, StoreError};
use tracing::{debug, warn};

/// Resolves metadata records through the store chain and the sources
pub struct MetadataResolver {
    stores: Vec<Box<dyn Store>>,
    sources: Vec<Box<dyn Source>>,
}

impl MetadataResolver {
    /// Creates a resolver
    ///
    /// `stores` are consulted in order, so the cheapest tier comes first.
    pub fn new(stores: Vec<Box<dyn Store>>, sources: Vec<Box<dyn Source>>) -> Self {
        Self { stores, sources }
    }

    /// Ids of the configured sources, in order
    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|source| source.source_id())
    }

    pub fn get_show(
        &mut self,
        source_id: &str,
        show_id: &str,
        refresh: bool,
    ) -> Result<Option<Show>, SourceError> {
        self.resolve(
            "show",
            source_id,
            refresh,
            |store| store.get_show(source_id, show_id),
            |source| source.get_show(show_id),
            |store, show| store.cache_show(show),
        )
    }

    /// Resolves a season
    ///
    /// When the season comes from a source, its episodes and specials are
    /// cached as well.
    pub fn get_season(
        &mut self,
        source_id: &str,
        show_id: &str,
        season: u32,
        refresh: bool,
    ) -> Result<Option<Season>, SourceError> {
        self.resolve(
            "season",
            source_id,
            refresh,
            |store| store.get_season(source_id, show_id, season),
            |source| source.get_season(show_id, season),
            |store, season| {
                store.cache_season(season)?;
                season
                    .episodes
                    .iter()
                    .chain(&season.specials)
                    .try_for_each(|episode| store.cache_episode(episode))
            },
        )
    }

    /// Resolves an episode
    ///
    /// On a store miss the whole season is resolved, so the other episodes
    /// of that season are cached along the way.
    pub fn get_episode(
        &mut self,
        source_id: &str,
        show_id: &str,
        season: u32,
        episode: u32,
        refresh: bool,
    ) -> Result<Option<Episode>, SourceError> {
        let cached = self.read_stores(
            "episode",
            refresh,
            |store| store.get_episode(source_id, show_id, season, episode),
            |store, episode| store.cache_episode(episode),
        );
        if cached.is_some() {
            return Ok(cached);
        }
        Ok(self
            .get_season(source_id, show_id, season, refresh)?
            .and_then(|season| season.episode(episode).cloned()))
    }

    pub fn get_special(
        &mut self,
        source_id: &str,
        show_id: &str,
        season: u32,
        special: u32,
        refresh: bool,
    ) -> Result<Option<Episode>, SourceError> {
        let cached = self.read_stores(
            "special",
            refresh,
            |store| store.get_special(source_id, show_id, season, special),
            |store, special| store.cache_episode(special),
        );
        if cached.is_some() {
            return Ok(cached);
        }
        Ok(self
            .get_season(source_id, show_id, season, refresh)?
            .and_then(|season| season.special(special).cloned()))
    }

    pub fn get_film(
        &mut self,
        source_id: &str,
        film_id: &str,
        refresh: bool,
    ) -> Result<Option<Film>, SourceError> {
        self.resolve(
            "film",
            source_id,
            refresh,
            |store| store.get_film(source_id, film_id),
            |source| source.get_film(film_id),
            |store, film| store.cache_film(film),
        )
    }

    /// Searches for the identity of a show or film
    ///
    /// Stores are consulted first, but only results from one of
    /// `allowed_sources` count. Sources are then asked in order, skipping
    /// those not allowed; the first hit is cached in every store.
    pub fn search_media(
        &mut self,
        query: &MediaQuery,
        allowed_sources: &[String],
        refresh: bool,
    ) -> Result<Option<SearchResult>, SourceError> {
        let allowed = |source_id: &str| allowed_sources.iter().any(|id| id == source_id);

        let tiers = self.readable_tiers(refresh);
        for index in 0..tiers {
            let store = &self.stores[index];
            match store.search_media(query) {
                Ok(Some(result)) if allowed(&result.source_id) => {
                    debug!(store = store.name(), term = %query.term, "search cache hit");
                    self.populate(index, "search", &result, |store, result| {
                        store.cache_search(query, result)
                    });
                    return Ok(Some(result));
                }
                Ok(_) => debug!(store = store.name(), term = %query.term, "search cache miss"),
                Err(e) => warn!(store = store.name(), error = %e, "failed to read search cache"),
            }
        }

        let mut found = None;
        for source in self.sources.iter().filter(|source| allowed(source.source_id())) {
            debug!(source = source.source_id(), term = %query.term, mode = ?query.mode, "searching source");
            if let Some(result) = source.search_media(query)? {
                found = Some(result);
                break;
            }
        }

        match &found {
            Some(result) => {
                let stores = self.stores.len();
                self.populate(stores, "search", result, |store, result| {
                    store.cache_search(query, result)
                });
            }
            None => debug!(term = %query.term, "no source found a match"),
        }
        Ok(found)
    }

    fn readable_tiers(&self, refresh: bool) -> usize {
        if refresh {
            self.stores.len().min(1)
        } else {
            self.stores.len()
        }
    }

    /// Writes a record into the first `count` stores
    ///
    /// Failing writes are logged and do not stop the remaining ones.
    fn populate<T>(
        &mut self,
        count: usize,
        kind: &str,
        value: &T,
        write: impl Fn(&mut dyn Store, &T) -> Result<(), StoreError>,
    ) {
        for store in self.stores.iter_mut().take(count) {
            if let Err(e) = write(store.as_mut(), value) {
                warn!(store = store.name(), kind, error = %e, "failed to cache record");
            }
        }
    }

    /// Reads a record from the readable stores
    ///
    /// A hit in a later store is copied into the stores before it.
    fn read_stores<T>(
        &mut self,
        kind: &str,
        refresh: bool,
        read: impl Fn(&dyn Store) -> Result<Option<T>, StoreError>,
        write: impl Fn(&mut dyn Store, &T) -> Result<(), StoreError>,
    ) -> Option<T> {
        let tiers = self.readable_tiers(refresh);
        for index in 0..tiers {
            let store = &self.stores[index];
            match read(store.as_ref()) {
                Ok(Some(value)) => {
                    debug!(store = store.name(), kind, "cache hit");
                    self.populate(index, kind, &value, &write);
                    return Some(value);
                }
                Ok(None) => debug!(store = store.name(), kind, "cache miss"),
                Err(e) => warn!(store = store.name(), kind, error = %e, "failed to read cache"),
            }
        }
        None
    }

    /// Shared store-then-source lookup
    ///
    /// A record from a source is written into every store. A source id
    /// nobody answers to resolves to nothing.
    fn resolve<T>(
        &mut self,
        kind: &str,
        source_id: &str,
        refresh: bool,
        read: impl Fn(&dyn Store) -> Result<Option<T>, StoreError>,
        fetch: impl FnOnce(&dyn Source) -> Result<Option<T>, SourceError>,
        write: impl Fn(&mut dyn Store, &T) -> Result<(), StoreError>,
    ) -> Result<Option<T>, SourceError> {
        if let Some(value) = self.read_stores(kind, refresh, read, &write) {
            return Ok(Some(value));
        }

        let Some(source) = self
            .sources
            .iter()
            .find(|source| source.source_id() == source_id)
        else {
            warn!(source = source_id, kind, "no source with this id is configured");
            return Ok(None);
        };

        debug!(source = source_id, kind, refresh, "fetching from source");
        let Some(value) = fetch(source.as_ref())? else {
            debug!(source = source_id, kind, "source has no record");
            return Ok(None);
        };

        let stores = self.stores.len();
        self.populate(stores, kind, &value, &write);
        Ok(Some(value))
    }
}
