//! In-process store, always the first tier of a resolver

use super::{Store, StoreError};
use crate::model::{Episode, Film, MediaQuery, SearchResult, Season, Show};
use std::collections::HashMap;

type ShowKey = (String, String);
type SeasonKey = (String, String, u32);
/// Source, show, season, special flag and the episode number
type EpisodeKey = (String, String, u32, bool, u32);

/// A store keeping every record in hash maps for the lifetime of the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    shows: HashMap<ShowKey, Show>,
    seasons: HashMap<SeasonKey, Season>,
    episodes: HashMap<EpisodeKey, Episode>,
    films: HashMap<ShowKey, Film>,
    searches: HashMap<String, SearchResult>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_episode(
        &self,
        source_id: &str,
        show_id: &str,
        season: u32,
        special: bool,
        number: u32,
    ) -> Option<Episode> {
        let key = (
            source_id.to_string(),
            show_id.to_string(),
            season,
            special,
            number,
        );
        if let Some(episode) = self.episodes.get(&key) {
            return Some(episode.clone());
        }

        let season = self
            .seasons
            .get(&(source_id.to_string(), show_id.to_string(), season))?;
        let episode = if special {
            season.special(number)
        } else {
            season.episode(number)
        };
        episode.cloned()
    }
}

impl Store for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn cache_show(&mut self, show: &Show) -> Result<(), StoreError> {
        let key = (show.source_id.clone(), show.show_id.clone());
        self.shows.remove(&key);
        self.shows.insert(key, show.clone());
        Ok(())
    }

    fn cache_season(&mut self, season: &Season) -> Result<(), StoreError> {
        let key = (
            season.source_id.clone(),
            season.show_id.clone(),
            season.season_number,
        );

        // Episodes of the old season record go with it
        self.episodes
            .retain(|(source_id, show_id, number, _, _), _| {
                (source_id, show_id, number) != (&key.0, &key.1, &key.2)
            });

        self.seasons.remove(&key);
        self.seasons.insert(key, season.clone());
        Ok(())
    }

    fn cache_episode(&mut self, episode: &Episode) -> Result<(), StoreError> {
        for &number in &episode.episode_numbers {
            let key = (
                episode.source_id.clone(),
                episode.show_id.clone(),
                episode.season_number,
                episode.special,
                number,
            );
            self.episodes.remove(&key);
            self.episodes.insert(key, episode.clone());
        }
        Ok(())
    }

    fn cache_film(&mut self, film: &Film) -> Result<(), StoreError> {
        let key = (film.source_id.clone(), film.film_id.clone());
        self.films.remove(&key);
        self.films.insert(key, film.clone());
        Ok(())
    }

    fn cache_search(
        &mut self,
        query: &MediaQuery,
        result: &SearchResult,
    ) -> Result<(), StoreError> {
        self.searches.insert(query.cache_key(), result.clone());
        Ok(())
    }

    fn get_show(&self, source_id: &str, show_id: &str) -> Result<Option<Show>, StoreError> {
        Ok(self
            .shows
            .get(&(source_id.to_string(), show_id.to_string()))
            .cloned())
    }

    fn get_season(
        &self,
        source_id: &str,
        show_id: &str,
        season: u32,
    ) -> Result<Option<Season>, StoreError> {
        Ok(self
            .seasons
            .get(&(source_id.to_string(), show_id.to_string(), season))
            .cloned())
    }

    fn get_episode(
        &self,
        source_id: &str,
        show_id: &str,
        season: u32,
        episode: u32,
    ) -> Result<Option<Episode>, StoreError> {
        Ok(self.find_episode(source_id, show_id, season, false, episode))
    }

    fn get_special(
        &self,
        source_id: &str,
        show_id: &str,
        season: u32,
        special: u32,
    ) -> Result<Option<Episode>, StoreError> {
        Ok(self.find_episode(source_id, show_id, season, true, special))
    }

    fn get_film(&self, source_id: &str, film_id: &str) -> Result<Option<Film>, StoreError> {
        Ok(self
            .films
            .get(&(source_id.to_string(), film_id.to_string()))
            .cloned())
    }

    fn search_media(&self, query: &MediaQuery) -> Result<Option<SearchResult>, StoreError> {
        Ok(self.searches.get(&query.cache_key()).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Mode;
    use crate::model::fixtures::{episode, film, search_result, season, show};

    #[test]
    fn test_show_replaced_under_same_key() {
        let mut store = MemoryStore::new();
        store.cache_show(&show("82", "Heroes")).unwrap();
        store.cache_show(&show("82", "Heroes (2006)")).unwrap();

        let cached = store.get_show("tvmaze", "82").unwrap().unwrap();
        assert_eq!(cached.name, "Heroes (2006)");
        assert!(store.get_show("other", "82").unwrap().is_none());
    }

    #[test]
    fn test_episode_falls_back_to_season() {
        let mut store = MemoryStore::new();
        store.cache_season(&season("82", 1, 3)).unwrap();

        let cached = store.get_episode("tvmaze", "82", 1, 2).unwrap().unwrap();
        assert_eq!(cached.title, "Episode 2");
        assert!(store.get_special("tvmaze", "82", 1, 1).unwrap().is_some());
        assert!(store.get_episode("tvmaze", "82", 1, 4).unwrap().is_none());
    }

    #[test]
    fn test_recaching_season_evicts_episodes() {
        let mut store = MemoryStore::new();
        store
            .cache_episode(&episode("82", 1, 5, "Stale Title"))
            .unwrap();
        assert!(store.get_episode("tvmaze", "82", 1, 5).unwrap().is_some());

        store.cache_season(&season("82", 1, 3)).unwrap();
        assert!(store.get_episode("tvmaze", "82", 1, 5).unwrap().is_none());
    }

    #[test]
    fn test_multi_episode_cached_under_each_number() {
        let mut store = MemoryStore::new();
        let mut two_parter = episode("82", 4, 25, "Two Parter");
        two_parter.episode_numbers = vec![25, 26];
        store.cache_episode(&two_parter).unwrap();

        assert_eq!(store.get_episode("tvmaze", "82", 4, 26).unwrap(), Some(two_parter));
    }

    #[test]
    fn test_film_and_search() {
        let mut store = MemoryStore::new();
        store.cache_film(&film("1", "Heat", Some(1995))).unwrap();
        assert!(store.get_film("tvmaze", "1").unwrap().is_some());

        let query = MediaQuery::new("Heroes", Mode::TvShow);
        assert!(store.search_media(&query).unwrap().is_none());
        store
            .cache_search(&query, &search_result("82", Mode::TvShow))
            .unwrap();

        let lower = MediaQuery::new("heroes", Mode::TvShow);
        assert_eq!(store.search_media(&lower).unwrap().map(|r| r.id), Some("82".to_string()));
    }
}
