//! Film search

use super::show::to_pattern_path;
use super::{SearchOutcome, clean_term};
use crate::config::MediaDirectory;
use crate::metadata_retrieval::SourceError;
use crate::model::SearchResult;
use crate::pattern::{SearchDetails, strip_decorations};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

/// A bare year followed by more text, as in `Heat.1995.DVDRip`
static BARE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.\s_]((?:19|20)\d{2})[.\s_]").expect("valid regex"));

/// Extracts film search details from files of one media directory
pub struct FilmSearcher<'a> {
    media_dir: &'a MediaDirectory,
}

impl<'a> FilmSearcher<'a> {
    pub fn new(media_dir: &'a MediaDirectory) -> Self {
        Self { media_dir }
    }

    /// Derives search details for a film file and asks `resolve` for its identity
    ///
    /// The naming pattern is tried first. Files that do not follow it are
    /// handled by cleaning up the bare file name. `resolve` is called exactly
    /// once if a search term was found.
    pub fn search<F>(
        &self,
        file: &Path,
        resolve: F,
    ) -> Result<SearchOutcome<SearchDetails>, SourceError>
    where
        F: FnOnce(&SearchDetails) -> Result<Option<SearchResult>, SourceError>,
    {
        let Some(details) = self.details(file) else {
            debug!(file = %file.display(), "no film title found in file name");
            return Ok(SearchOutcome::Unparsed);
        };

        debug!(file = %file.display(), term = %details.term, year = ?details.year, "searching film");
        match resolve(&details)? {
            Some(result) => Ok(SearchOutcome::Found(result, details)),
            None => Ok(SearchOutcome::NotFound(details)),
        }
    }

    fn details(&self, file: &Path) -> Option<SearchDetails> {
        let relative = file.strip_prefix(&self.media_dir.root).unwrap_or(file);

        let strip_tokens = &self.media_dir.strip_tokens;

        // A release name can match a bare `%t` pattern, so the title is
        // cleaned up like a file name as well
        let literal = self
            .media_dir
            .pattern
            .match_film(&to_pattern_path(relative))
            .and_then(|details| {
                let refined = from_file_name(&details.term, strip_tokens)?;
                Some(SearchDetails {
                    term: refined.term,
                    year: details.year.or(refined.year),
                    part: details.part.or(refined.part),
                })
            });
        if literal.is_some() {
            return literal;
        }

        let stem = file.file_stem()?.to_str()?;
        from_file_name(stem, strip_tokens)
    }
}

/// Cleans a release style file name into search details
///
/// Bracketed years and part markers are removed first. A bare year ends the
/// title, since everything after it is usually release information.
fn from_file_name(stem: &str, strip_tokens: &[Regex]) -> Option<SearchDetails> {
    let (mut title, mut year, part) = strip_decorations(stem);

    if year.is_none() {
        let bare = BARE_YEAR
            .captures(&title)
            .and_then(|c| Some((c[1].to_string(), c.get(0)?.start())));
        if let Some((found, start)) = bare {
            title.truncate(start);
            year = Some(found);
        }
    }

    let term = clean_term(&title, strip_tokens);
    (!term.is_empty()).then_some(SearchDetails { term, year, part })
}
