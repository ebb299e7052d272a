/// Origin providers for show, season, episode and film metadata.
///
/// A `Source` is the slowest and most authoritative tier of a lookup: the
/// resolver only calls it after every store missed. Not finding something is
/// a normal outcome (`Ok(None)`), only transport or parse failures are errors.
mod tvmaze;
mod tvmaze_types;

pub use tvmaze::TvMazeSource;

use crate::model::{Episode, Film, MediaQuery, SearchResult, Season, Show};
use thiserror::Error;

/// Errors that can occur while querying a source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Request to the source failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the source's response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The source returned invalid or unexpected data
    #[error("API returned invalid data: {0}")]
    InvalidData(String),
}

/// Trait for metadata sources.
///
/// Implementors fetch records from a remote catalog such as TVMaze. All
/// lookups return `Ok(None)` when the catalog has no matching record.
pub trait Source {
    /// Identifier of this source, stored in every record it produces
    fn source_id(&self) -> &str;

    fn get_show(&self, show_id: &str) -> Result<Option<Show>, SourceError>;

    /// Fetches a season together with its episodes and specials
    fn get_season(&self, show_id: &str, season: u32) -> Result<Option<Season>, SourceError>;

    fn get_episode(
        &self,
        show_id: &str,
        season: u32,
        episode: u32,
    ) -> Result<Option<Episode>, SourceError> {
        Ok(self
            .get_season(show_id, season)?
            .and_then(|season| season.episode(episode).cloned()))
    }

    fn get_special(
        &self,
        show_id: &str,
        season: u32,
        special: u32,
    ) -> Result<Option<Episode>, SourceError> {
        Ok(self
            .get_season(show_id, season)?
            .and_then(|season| season.special(special).cloned()))
    }

    /// Fetches a film; sources without film support never find one
    fn get_film(&self, _film_id: &str) -> Result<Option<Film>, SourceError> {
        Ok(None)
    }

    /// Searches the catalog for the show or film described by the query
    fn search_media(&self, query: &MediaQuery) -> Result<Option<SearchResult>, SourceError>;
}
