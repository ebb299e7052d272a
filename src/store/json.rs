//! Durable store keeping records as JSON files

use super::{Store, StoreError};
use crate::cache::{CacheError, CacheStorage};
use crate::config::project_dirs;
use crate::model::{Episode, Film, MediaQuery, SearchResult, Season, Show};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// A store persisting records in the cache directory
///
/// Each record kind lives in its own subdirectory, one JSON file per record.
/// Entries older than the optional time to live count as misses.
pub struct JsonFileStore {
    shows: CacheStorage<Show>,
    seasons: CacheStorage<Season>,
    episodes: CacheStorage<Episode>,
    films: CacheStorage<Film>,
    searches: CacheStorage<SearchResult>,
}

impl JsonFileStore {
    /// Opens the store in the system cache directory
    pub fn open(ttl: Option<Duration>) -> Result<Self, StoreError> {
        let proj_dirs = project_dirs().ok_or(CacheError::CacheDirectoryNotFound)?;
        Self::open_in(proj_dirs.cache_dir(), ttl)
    }

    /// Opens the store below the given directory
    pub fn open_in(dir: &Path, ttl: Option<Duration>) -> Result<Self, StoreError> {
        Ok(Self {
            shows: CacheStorage::open_in(dir, "shows", ttl)?,
            seasons: CacheStorage::open_in(dir, "seasons", ttl)?,
            episodes: CacheStorage::open_in(dir, "episodes", ttl)?,
            films: CacheStorage::open_in(dir, "films", ttl)?,
            searches: CacheStorage::open_in(dir, "searches", ttl)?,
        })
    }

    fn episode_key(source_id: &str, show_id: &str, season: u32, special: bool, number: u32) -> String {
        let kind = if special { "special" } else { "episode" };
        format!("{source_id}/{show_id}/{season}/{kind}/{number}")
    }

    fn find_episode(
        &self,
        source_id: &str,
        show_id: &str,
        season: u32,
        special: bool,
        number: u32,
    ) -> Result<Option<Episode>, StoreError> {
        let key = Self::episode_key(source_id, show_id, season, special, number);
        if let Some(episode) = self.episodes.load(&key)? {
            return Ok(Some(episode));
        }

        let Some(season) = self.get_season(source_id, show_id, season)? else {
            return Ok(None);
        };
        let episode = if special {
            season.special(number)
        } else {
            season.episode(number)
        };
        Ok(episode.cloned())
    }
}

impl Store for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    fn cache_show(&mut self, show: &Show) -> Result<(), StoreError> {
        let key = format!("{}/{}", show.source_id, show.show_id);
        Ok(self.shows.store(&key, show)?)
    }

    /// Replaces a season; episode records cached for it before are dropped
    fn cache_season(&mut self, season: &Season) -> Result<(), StoreError> {
        let key = format!(
            "{}/{}/{}",
            season.source_id, season.show_id, season.season_number
        );
        for kind in ["episode", "special"] {
            let removed = self.episodes.remove_prefixed(&format!("{key}/{kind}/"))?;
            if removed > 0 {
                debug!(season = %key, kind, removed, "dropped cached episodes of replaced season");
            }
        }
        Ok(self.seasons.store(&key, season)?)
    }

    fn cache_episode(&mut self, episode: &Episode) -> Result<(), StoreError> {
        for &number in &episode.episode_numbers {
            let key = Self::episode_key(
                &episode.source_id,
                &episode.show_id,
                episode.season_number,
                episode.special,
                number,
            );
            self.episodes.store(&key, episode)?;
        }
        Ok(())
    }

    fn cache_film(&mut self, film: &Film) -> Result<(), StoreError> {
        let key = format!("{}/{}", film.source_id, film.film_id);
        Ok(self.films.store(&key, film)?)
    }

    fn cache_search(
        &mut self,
        query: &MediaQuery,
        result: &SearchResult,
    ) -> Result<(), StoreError> {
        Ok(self.searches.store(&query.cache_key(), result)?)
    }

    fn get_show(&self, source_id: &str, show_id: &str) -> Result<Option<Show>, StoreError> {
        Ok(self.shows.load(&format!("{source_id}/{show_id}"))?)
    }

    fn get_season(
        &self,
        source_id: &str,
        show_id: &str,
        season: u32,
    ) -> Result<Option<Season>, StoreError> {
        Ok(self.seasons.load(&format!("{source_id}/{show_id}/{season}"))?)
    }

    fn get_episode(
        &self,
        source_id: &str,
        show_id: &str,
        season: u32,
        episode: u32,
    ) -> Result<Option<Episode>, StoreError> {
        self.find_episode(source_id, show_id, season, false, episode)
    }

    fn get_special(
        &self,
        source_id: &str,
        show_id: &str,
        season: u32,
        special: u32,
    ) -> Result<Option<Episode>, StoreError> {
        self.find_episode(source_id, show_id, season, true, special)
    }

    fn get_film(&self, source_id: &str, film_id: &str) -> Result<Option<Film>, StoreError> {
        Ok(self.films.load(&format!("{source_id}/{film_id}"))?)
    }

    fn search_media(&self, query: &MediaQuery) -> Result<Option<SearchResult>, StoreError> {
        Ok(self.searches.load(&query.cache_key())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mode;
    use crate::model::fixtures::{episode, search_result, season, show};
    use tempfile::TempDir;

    #[test]
    fn test_records_survive_reopening() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = JsonFileStore::open_in(dir.path(), None).unwrap();
            store.cache_show(&show("82", "Heroes")).unwrap();
            store.cache_season(&season("82", 1, 2)).unwrap();
        }

        let store = JsonFileStore::open_in(dir.path(), None).unwrap();
        assert_eq!(
            store.get_show("tvmaze", "82").unwrap().map(|s| s.name),
            Some("Heroes".to_string())
        );
        let cached = store.get_episode("tvmaze", "82", 1, 2).unwrap().unwrap();
        assert_eq!(cached.title, "Episode 2");
    }

    #[test]
    fn test_episode_record_wins_over_season() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::open_in(dir.path(), None).unwrap();
        store.cache_season(&season("82", 1, 2)).unwrap();
        store
            .cache_episode(&episode("82", 1, 2, "Don't Look Back"))
            .unwrap();

        let cached = store.get_episode("tvmaze", "82", 1, 2).unwrap().unwrap();
        assert_eq!(cached.title, "Don't Look Back");
        assert!(store.get_special("tvmaze", "82", 1, 1).unwrap().is_some());
        assert!(store.get_special("tvmaze", "82", 2, 1).unwrap().is_none());
    }

    #[test]
    fn test_searches_are_cached() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::open_in(dir.path(), None).unwrap();
        let query = MediaQuery::new("heroes", Mode::TvShow);

        store
            .cache_search(&query, &search_result("82", Mode::TvShow))
            .unwrap();
        assert_eq!(
            store.search_media(&query).unwrap().map(|r| r.id),
            Some("82".to_string())
        );
    }

    #[test]
    fn test_corrupt_file_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open_in(dir.path(), None).unwrap();
        std::fs::write(dir.path().join("shows").join("tvmaze_82.json"), "{").unwrap();

        assert!(matches!(
            store.get_show("tvmaze", "82"),
            Err(StoreError::Cache(_))
        ));
    }

    #[test]
    fn test_recached_season_drops_stale_episodes() {
        let dir = TempDir::new().unwrap();
        let mut store = JsonFileStore::open_in(dir.path(), None).unwrap();
        store.cache_season(&season("82", 1, 3)).unwrap();
        store.cache_episode(&episode("82", 1, 3, "Withdrawn")).unwrap();
        store.cache_episode(&episode("82", 2, 1, "Four Months Later")).unwrap();

        store.cache_season(&season("82", 1, 2)).unwrap();

        assert_eq!(store.get_episode("tvmaze", "82", 1, 3).unwrap(), None);
        assert!(store.get_episode("tvmaze", "82", 1, 2).unwrap().is_some());
        assert!(store.get_episode("tvmaze", "82", 2, 1).unwrap().is_some());
    }
}
