/// TVMaze API response types for deserialization.
///
/// These structures mirror the JSON response format from the TVMaze API.
use serde::Deserialize;

/// A single hit from the `/search/shows` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeSearchHit {
    /// Relevance score assigned by TVMaze
    pub score: f64,
    pub show: TvMazeShow,
}

/// A show from the `/shows/{id}` or search endpoints.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeShow {
    pub id: u64,
    /// The name of the TV show
    pub name: String,
    pub url: Option<String>,
    /// Premiere date as `YYYY-MM-DD` (may be null)
    pub premiered: Option<String>,
    /// Show summary in HTML format (may be null)
    pub summary: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
}

/// A single episode from the `/shows/{id}/episodes` endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct TvMazeEpisode {
    pub url: Option<String>,
    /// Season number
    pub season: u32,
    /// Episode number within the season (null for specials)
    pub number: Option<u32>,
    /// Episode title (may be null for episodes without a title)
    pub name: Option<String>,
    /// `regular`, `significant_special` or `insignificant_special`
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Air date as `YYYY-MM-DD` (may be empty)
    pub airdate: Option<String>,
    /// Episode summary in HTML format (may be null)
    pub summary: Option<String>,
}

impl TvMazeEpisode {
    pub fn is_special(&self) -> bool {
        self.number.is_none() || self.kind.as_deref().is_some_and(|kind| kind.contains("special"))
    }
}
