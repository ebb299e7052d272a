//! TVMaze metadata source implementation.
use super::tvmaze_types::{TvMazeEpisode, TvMazeSearchHit, TvMazeShow};
use super::{Source, SourceError};
use crate::model::{Episode, MediaQuery, Mode, SearchResult, Season, Show};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Metadata source for the TVMaze API.
///
/// This source fetches TV show information from https://api.tvmaze.com. It
/// does not know about films, so film lookups always come back empty.
pub struct TvMazeSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl TvMazeSource {
    /// The id stored in records produced by this source
    pub const ID: &'static str = "tvmaze";

    /// Creates a new TVMaze source instance.
    pub fn new() -> Self {
        Self::with_base_url("https://api.tvmaze.com")
    }

    /// Creates a source talking to a different API host.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Performs a GET request and parses the JSON body
    ///
    /// A 404 response is reported as `Ok(None)`.
    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "querying TVMaze");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .map_err(|e| SourceError::RequestError(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        // Ensure request was successful
        if !response.status().is_success() {
            return Err(SourceError::RequestError(format!(
                "HTTP {} {}",
                response.status().as_u16(),
                response.status().canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json()
            .map(Some)
            .map_err(|e| SourceError::ParseError(e.to_string()))
    }

    fn convert_show(tvmaze_show: TvMazeShow) -> Show {
        Show {
            source_id: Self::ID.to_string(),
            show_id: tvmaze_show.id.to_string(),
            name: tvmaze_show.name,
            url: tvmaze_show.url,
            summary: html_to_text(tvmaze_show.summary),
            premiered: tvmaze_show.premiered,
            genres: tvmaze_show.genres,
        }
    }

    /// Converts a TVMaze episode to our internal Episode structure.
    fn convert_episode(show_id: &str, number: u32, tvmaze_episode: TvMazeEpisode) -> Episode {
        Episode {
            source_id: Self::ID.to_string(),
            show_id: show_id.to_string(),
            season_number: tvmaze_episode.season,
            episode_numbers: vec![number],
            special: tvmaze_episode.is_special(),
            title: tvmaze_episode.name.unwrap_or_else(|| "Unknown".to_string()),
            summary: html_to_text(tvmaze_episode.summary),
            air_date: tvmaze_episode.airdate.filter(|date| !date.is_empty()),
            url: tvmaze_episode.url,
        }
    }

    /// Builds a season from the full episode list of a show.
    ///
    /// Specials have no number on TVMaze, so they are numbered in airing
    /// order within their season starting at 1.
    fn convert_season(
        show_id: &str,
        season_number: u32,
        tvmaze_episodes: Vec<TvMazeEpisode>,
    ) -> Option<Season> {
        let mut episodes = Vec::new();
        let mut specials = Vec::new();

        for tvmaze_episode in tvmaze_episodes
            .into_iter()
            .filter(|episode| episode.season == season_number)
        {
            if tvmaze_episode.is_special() {
                let number = specials.len() as u32 + 1;
                specials.push(Self::convert_episode(show_id, number, tvmaze_episode));
            } else if let Some(number) = tvmaze_episode.number {
                episodes.push(Self::convert_episode(show_id, number, tvmaze_episode));
            }
        }

        if episodes.is_empty() && specials.is_empty() {
            return None;
        }

        episodes.sort_by_key(|episode| episode.episode_numbers.first().copied());

        Some(Season {
            source_id: Self::ID.to_string(),
            show_id: show_id.to_string(),
            season_number,
            url: None,
            episodes,
            specials,
        })
    }

    /// Picks the best search hit
    ///
    /// With a year, the highest scored show premiering that year wins.
    /// Otherwise (or if none matches the year) the highest score wins.
    fn pick_hit(mut hits: Vec<TvMazeSearchHit>, year: Option<&str>) -> Option<TvMazeShow> {
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));

        let position = year
            .and_then(|year| {
                hits.iter().position(|hit| {
                    hit.show
                        .premiered
                        .as_deref()
                        .is_some_and(|premiered| premiered.starts_with(year))
                })
            })
            .unwrap_or(0);

        (position < hits.len()).then(|| hits.swap_remove(position).show)
    }
}

impl Default for TvMazeSource {
    fn default() -> Self {
        Self::new()
    }
}

fn html_to_text(html: Option<String>) -> String {
    html.map(|s| nanohtml2text::html2text(&s).trim().to_string())
        .unwrap_or_default()
}

impl Source for TvMazeSource {
    fn source_id(&self) -> &str {
        Self::ID
    }

    fn get_show(&self, show_id: &str) -> Result<Option<Show>, SourceError> {
        let show: Option<TvMazeShow> = self.get_json(&format!("/shows/{show_id}"), &[])?;
        Ok(show.map(Self::convert_show))
    }

    fn get_season(&self, show_id: &str, season: u32) -> Result<Option<Season>, SourceError> {
        let episodes: Option<Vec<TvMazeEpisode>> =
            self.get_json(&format!("/shows/{show_id}/episodes"), &[("specials", "1")])?;
        Ok(episodes.and_then(|episodes| Self::convert_season(show_id, season, episodes)))
    }

    fn search_media(&self, query: &MediaQuery) -> Result<Option<SearchResult>, SourceError> {
        if query.mode != Mode::TvShow {
            return Ok(None);
        }

        let hits: Vec<TvMazeSearchHit> = self
            .get_json("/search/shows", &[("q", query.term.as_str())])?
            .unwrap_or_default();

        Ok(
            Self::pick_hit(hits, query.year.as_deref()).map(|show| SearchResult {
                id: show.id.to_string(),
                source_id: Self::ID.to_string(),
                url: show.url,
                part: query.part,
                mode: Mode::TvShow,
            }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPISODES_JSON: &str = r#"[
        {"url": "https://www.tvmaze.com/episodes/1", "season": 1, "number": 2, "name": "Don't Look Back",
         "type": "regular", "airdate": "2006-10-02", "summary": "<p>Claire runs.</p>"},
        {"url": "https://www.tvmaze.com/episodes/0", "season": 1, "number": 1, "name": "Genesis",
         "type": "regular", "airdate": "2006-09-25", "summary": null},
        {"url": null, "season": 1, "number": null, "name": "Countdown",
         "type": "significant_special", "airdate": "", "summary": null},
        {"url": null, "season": 2, "number": 1, "name": "Four Months Later",
         "type": "regular", "airdate": "2007-09-24", "summary": null}
    ]"#;

    const SEARCH_JSON: &str = r#"[
        {"score": 0.9, "show": {"id": 1, "name": "Heroes", "url": null, "premiered": "2006-09-25", "summary": null}},
        {"score": 0.7, "show": {"id": 2, "name": "Heroes", "url": null, "premiered": "2021-01-01", "summary": null}}
    ]"#;

    #[test]
    fn test_convert_season_splits_specials() {
        let episodes: Vec<TvMazeEpisode> = serde_json::from_str(EPISODES_JSON).unwrap();
        let season = TvMazeSource::convert_season("1", 1, episodes).unwrap();

        assert_eq!(season.season_number, 1);
        assert_eq!(season.episodes.len(), 2);
        assert_eq!(season.episodes[0].title, "Genesis");
        assert_eq!(season.episodes[1].episode_numbers, vec![2]);
        assert_eq!(season.episodes[1].summary, "Claire runs.");
        assert_eq!(season.specials.len(), 1);
        assert_eq!(season.specials[0].episode_numbers, vec![1]);
        assert!(season.specials[0].special);
        assert_eq!(season.specials[0].air_date, None);
    }

    #[test]
    fn test_convert_missing_season() {
        let episodes: Vec<TvMazeEpisode> = serde_json::from_str(EPISODES_JSON).unwrap();
        assert!(TvMazeSource::convert_season("1", 7, episodes).is_none());
    }

    #[test]
    fn test_pick_hit_prefers_year() {
        let hits: Vec<TvMazeSearchHit> = serde_json::from_str(SEARCH_JSON).unwrap();
        assert_eq!(TvMazeSource::pick_hit(hits, Some("2021")).map(|s| s.id), Some(2));

        let hits: Vec<TvMazeSearchHit> = serde_json::from_str(SEARCH_JSON).unwrap();
        assert_eq!(TvMazeSource::pick_hit(hits, None).map(|s| s.id), Some(1));

        let hits: Vec<TvMazeSearchHit> = serde_json::from_str(SEARCH_JSON).unwrap();
        assert_eq!(TvMazeSource::pick_hit(hits, Some("1999")).map(|s| s.id), Some(1));

        assert!(TvMazeSource::pick_hit(Vec::new(), None).is_none());
    }

    #[test]
    fn test_film_lookups_are_unsupported() {
        let source = TvMazeSource::with_base_url("http://localhost:1");
        let query = MediaQuery::new("Heat", Mode::Film);
        assert_eq!(source.search_media(&query).unwrap(), None);
        assert_eq!(source.get_film("1").unwrap(), None);
    }
}
