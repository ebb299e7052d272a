//! Show search for TV episode files

use super::{SearchOutcome, ShowQuery, clean_term};
use crate::config::MediaDirectory;
use crate::metadata_retrieval::SourceError;
use crate::model::SearchResult;
use crate::pattern::{ParsedFileName, strip_decorations};
use regex::Regex;
use std::path::{Component, Path};
use std::sync::LazyLock;
use tracing::debug;

static SEASON_FOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:season|series|staffel)[\s._-]*\d+$").expect("valid regex")
});

static TRAILING_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s+((?:19|20)\d{2})$").expect("valid regex"));

/// Extracts show search terms from episode files of one media directory
pub struct ShowSearcher<'a> {
    media_dir: &'a MediaDirectory,
}

impl<'a> ShowSearcher<'a> {
    pub fn new(media_dir: &'a MediaDirectory) -> Self {
        Self { media_dir }
    }

    /// Parses an episode file and asks `resolve` for the show it belongs to
    ///
    /// The show name comes from the file name if the pattern or a heuristic
    /// recovered one, otherwise from the nearest parent directory that is not
    /// a season folder. `resolve` is called exactly once when a query could
    /// be built and never otherwise.
    pub fn search<F>(
        &self,
        file: &Path,
        resolve: F,
    ) -> Result<SearchOutcome<ParsedFileName>, SourceError>
    where
        F: FnOnce(&ShowQuery) -> Result<Option<SearchResult>, SourceError>,
    {
        let relative = file.strip_prefix(&self.media_dir.root).unwrap_or(file);

        let Some(parsed) = self.media_dir.pattern.parse_episode(&to_pattern_path(relative)) else {
            debug!(file = %file.display(), "no season or episode found in file name");
            return Ok(SearchOutcome::Unparsed);
        };

        let Some(query) = self.build_query(relative, &parsed) else {
            debug!(file = %file.display(), "no show name found for file");
            return Ok(SearchOutcome::Unparsed);
        };

        debug!(file = %file.display(), term = %query.term, year = ?query.year, "searching show");
        match resolve(&query)? {
            Some(result) => Ok(SearchOutcome::Found(result, parsed)),
            None => Ok(SearchOutcome::NotFound(parsed)),
        }
    }

    fn build_query(&self, relative: &Path, parsed: &ParsedFileName) -> Option<ShowQuery> {
        let strip_tokens = &self.media_dir.strip_tokens;

        let from_file = parsed
            .term
            .as_deref()
            .map(|term| clean_term(term, strip_tokens))
            .filter(|term| !term.is_empty());

        let term = from_file.or_else(|| {
            relative
                .parent()?
                .components()
                .rev()
                .filter_map(|component| match component {
                    Component::Normal(name) => name.to_str(),
                    _ => None,
                })
                .filter(|name| !SEASON_FOLDER.is_match(name))
                .map(|name| clean_term(name, strip_tokens))
                .find(|term| !term.is_empty())
        })?;

        let (term, year) = split_year(&term);

        Some(ShowQuery {
            term,
            year,
            season: parsed.season,
            episodes: parsed.episodes.clone(),
        })
    }
}

/// Separates a trailing year from a show name
///
/// `Show (2009)` and `Show 2009` both yield `("Show", Some("2009"))`. A name
/// consisting of nothing but a year is kept as it is.
fn split_year(term: &str) -> (String, Option<String>) {
    let (stripped, year, _) = strip_decorations(term);
    if let Some(year) = year {
        let stripped = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
        if !stripped.is_empty() {
            return (stripped, Some(year));
        }
    }

    match TRAILING_YEAR.captures(term) {
        Some(captures) => (captures[1].to_string(), Some(captures[2].to_string())),
        None => (term.to_string(), None),
    }
}

/// Converts a relative path into the `/`-separated form patterns work on
pub(crate) fn to_pattern_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
