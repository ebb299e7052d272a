//! Identity entities shared by sources, stores and the resolver
//!
//! Every entity carries the id of the source it came from, so records from
//! different catalogs never collide in a store.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Whether a media directory holds TV shows or films
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    TvShow,
    Film,
}

/// A TV show as known to one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub source_id: String,
    pub show_id: String,
    pub name: String,
    pub url: Option<String>,
    /// Plain text summary
    pub summary: String,
    /// Premiere date (`YYYY-MM-DD`), if known
    pub premiered: Option<String>,
    pub genres: Vec<String>,
}

impl Show {
    /// Year the show premiered, taken from the premiere date
    pub fn year(&self) -> Option<u32> {
        self.premiered.as_deref()?.get(..4)?.parse().ok()
    }
}

/// One season of a show, including its episodes and specials
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub source_id: String,
    pub show_id: String,
    pub season_number: u32,
    pub url: Option<String>,
    pub episodes: Vec<Episode>,
    pub specials: Vec<Episode>,
}

impl Season {
    /// Finds the regular episode covering the given number
    pub fn episode(&self, number: u32) -> Option<&Episode> {
        self.episodes.iter().find(|episode| episode.covers(number))
    }

    /// Finds the special with the given number
    pub fn special(&self, number: u32) -> Option<&Episode> {
        self.specials.iter().find(|special| special.covers(number))
    }
}

/// A single episode or special
///
/// An episode aired as one file may cover several episode numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub source_id: String,
    pub show_id: String,
    pub season_number: u32,
    pub episode_numbers: Vec<u32>,
    pub title: String,
    pub summary: String,
    /// Air date (`YYYY-MM-DD`), if known
    pub air_date: Option<String>,
    pub url: Option<String>,
    /// Specials are numbered separately from regular episodes
    pub special: bool,
}

impl Episode {
    pub fn covers(&self, number: u32) -> bool {
        self.episode_numbers.contains(&number)
    }
}

/// A film as known to one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Film {
    pub source_id: String,
    pub film_id: String,
    pub title: String,
    pub year: Option<u32>,
    pub summary: String,
    pub url: Option<String>,
}

/// Parameters of a search for a show or film
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaQuery {
    /// Normalized search term
    pub term: String,
    pub year: Option<String>,
    pub mode: Mode,
    pub part: Option<u32>,
}

impl MediaQuery {
    pub fn new(term: impl Into<String>, mode: Mode) -> Self {
        Self {
            term: term.into(),
            year: None,
            mode,
            part: None,
        }
    }

    pub fn with_year(mut self, year: Option<String>) -> Self {
        self.year = year;
        self
    }

    pub fn with_part(mut self, part: Option<u32>) -> Self {
        self.part = part;
        self
    }

    /// A stable key identifying this query in caches
    ///
    /// Terms differing only in case map to the same key.
    pub fn cache_key(&self) -> String {
        let mode = match self.mode {
            Mode::TvShow => "tv",
            Mode::Film => "film",
        };
        format!(
            "{}_{}_{}",
            mode,
            self.term.to_lowercase(),
            self.year.as_deref().unwrap_or("any")
        )
    }
}

/// The identity a search resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// External id within the source
    pub id: String,
    pub source_id: String,
    pub url: Option<String>,
    pub part: Option<u32>,
    pub mode: Mode,
}

/// The entity a media file was identified as
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    Episode { show: Show, episode: Episode },
    Film(Film),
}

/// A media file linked to exactly one identity
#[derive(Debug, Clone, PartialEq)]
pub struct IdentifiedFile {
    pub path: PathBuf,
    pub identity: Identity,
    /// Part number for films split over several files
    pub part: Option<u32>,
}
