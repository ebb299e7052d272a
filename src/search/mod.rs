//! Search term extraction
//!
//! Turns a media file on disk into a search query, hands the query to a
//! resolve callback and reports what happened. A file that cannot be parsed
//! is an ordinary outcome here, never an error.

mod film;
mod show;

pub use film::FilmSearcher;
pub use show::ShowSearcher;

use crate::model::SearchResult;
use crate::normalizer::normalize;
use crate::pattern::clean_separators;
use regex::Regex;

/// Query derived from a TV episode file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowQuery {
    /// Normalized show name
    pub term: String,
    /// Year found next to the show name, if any
    pub year: Option<String>,
    pub season: u32,
    pub episodes: Vec<u32>,
}

/// Result of searching for a single file
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome<P> {
    /// The resolver identified the file; `P` is what was parsed from its name
    Found(SearchResult, P),
    /// The file was parsed but no source knows it
    NotFound(P),
    /// Nothing usable could be extracted from the file name
    Unparsed,
}

impl<P> SearchOutcome<P> {
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(..))
    }
}

/// Removes configured junk tokens from a raw search term
///
/// Separators are cleaned up afterwards and the result is normalized.
pub(crate) fn clean_term(raw: &str, strip_tokens: &[Regex]) -> String {
    let mut term = raw.to_string();
    for token in strip_tokens {
        term = token.replace_all(&term, " ").into_owned();
    }
    normalize(&clean_separators(&term))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_term() {
        let tokens = vec![Regex::new(r"(?i)\b(?:hdtv|xvid)\b").unwrap()];
        assert_eq!(clean_term("The.Show.HDTV.XviD", &tokens), "The Show");
        assert_eq!(clean_term("Who_Else: Part_1", &[]), "Who Else- Part 1");
        assert_eq!(clean_term("hdtv", &tokens), "");
    }
}
