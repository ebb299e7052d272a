//! Naming patterns
//!
//! A naming pattern such as `%n/Season %s/%s %e - %t.%x` is compiled once into
//! a [`Pattern`] and then used in both directions: to generate a canonical
//! relative path from metadata, and to reverse-parse existing file names back
//! into season/episode numbers or film search details.
//!
//! Supported tokens:
//! - `%n` - Show name
//! - `%s` - Season number
//! - `%e` - Episode number(s)
//! - `%t` - Episode or film title
//! - `%x` - File extension
//! - `%y` - Year
//! - `%p` - Part number
//! - `%h` - Show or film id
//! - `%%` - A literal percent sign
//!
//! Text wrapped in `{ ... }` is optional: it is only rendered when every token
//! directly inside the group has a value.

mod compiler;
mod generator;
mod heuristics;
mod matcher;

pub use heuristics::Heuristic;
pub(crate) use matcher::{clean_separators, strip_decorations};

use crate::normalizer::normalize;
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while compiling a naming pattern
#[derive(Debug, Error)]
pub enum PatternSyntaxError {
    /// The pattern string is empty
    #[error("Pattern is empty")]
    Empty,

    /// A `}` without a matching `{`
    #[error("Unmatched '}}' at position {position}")]
    UnmatchedClose { position: usize },

    /// A `{` that is never closed
    #[error("Unclosed '{{' at position {position}")]
    UnclosedOptional { position: usize },

    /// A `%` followed by an unknown token character
    #[error("Unknown token '%{sigil}' at position {position}")]
    UnknownToken { sigil: char, position: usize },

    /// A `%` at the very end of the pattern
    #[error("Dangling '%' at position {position}")]
    DanglingPercent { position: usize },

    /// The reverse matcher could not be built from the pattern
    #[error("Failed to build matcher for pattern: {0}")]
    Matcher(#[from] regex::Error),
}

/// The kind of value a token stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    ShowName,
    Season,
    Episode,
    Title,
    Extension,
    Year,
    Part,
    Id,
}

impl TokenKind {
    /// Looks up a token kind by the character following `%`
    pub fn from_sigil(sigil: char) -> Option<Self> {
        let kind = match sigil {
            'n' => TokenKind::ShowName,
            's' => TokenKind::Season,
            'e' => TokenKind::Episode,
            't' => TokenKind::Title,
            'x' => TokenKind::Extension,
            'y' => TokenKind::Year,
            'p' => TokenKind::Part,
            'h' => TokenKind::Id,
            _ => return None,
        };
        Some(kind)
    }

    /// The character following `%` for this token
    pub fn sigil(self) -> char {
        match self {
            TokenKind::ShowName => 'n',
            TokenKind::Season => 's',
            TokenKind::Episode => 'e',
            TokenKind::Title => 't',
            TokenKind::Extension => 'x',
            TokenKind::Year => 'y',
            TokenKind::Part => 'p',
            TokenKind::Id => 'h',
        }
    }
}

/// A node of a compiled pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text copied verbatim
    Literal(String),
    /// A placeholder replaced by a metadata value
    Token(TokenKind),
    /// An all-or-nothing group
    Optional(Vec<Segment>),
}

/// The values available when rendering a pattern
///
/// A `None` (or an empty episode list) marks the token as unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataContext {
    pub show_name: Option<String>,
    pub season: Option<u32>,
    /// Episode numbers; more than one for multi-episode files
    pub episodes: Vec<u32>,
    pub title: Option<String>,
    /// File extension without the leading dot
    pub extension: Option<String>,
    pub year: Option<u32>,
    pub part: Option<u32>,
    pub id: Option<String>,
}

impl MetadataContext {
    pub fn with_show_name(mut self, show_name: impl Into<String>) -> Self {
        self.show_name = Some(show_name.into());
        self
    }

    pub fn with_season(mut self, season: u32) -> Self {
        self.season = Some(season);
        self
    }

    pub fn with_episodes(mut self, episodes: Vec<u32>) -> Self {
        self.episodes = episodes;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn with_year(mut self, year: Option<u32>) -> Self {
        self.year = year;
        self
    }

    pub fn with_part(mut self, part: Option<u32>) -> Self {
        self.part = part;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Which matcher recognized a file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchedBy {
    /// The configured pattern matched literally
    Pattern,
    /// A fallback heuristic matched
    Heuristic(Heuristic),
}

impl MatchedBy {
    /// Position in the matcher list: 0 for the pattern, 1..=8 for heuristics
    pub fn index(self) -> usize {
        match self {
            MatchedBy::Pattern => 0,
            MatchedBy::Heuristic(heuristic) => heuristic.index(),
        }
    }
}

/// Season and episode numbers recovered from a TV file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFileName {
    pub season: u32,
    /// Never empty; in the order the numbers were found
    pub episodes: Vec<u32>,
    pub matched_by: MatchedBy,
    /// Show name text found alongside the numbers, if any
    pub term: Option<String>,
}

impl ParsedFileName {
    pub fn matched_pattern_index(&self) -> usize {
        self.matched_by.index()
    }
}

/// Search terms recovered from a film file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDetails {
    /// Normalized search term
    pub term: String,
    pub year: Option<String>,
    pub part: Option<u32>,
}

/// A compiled naming pattern
///
/// Compilation validates the pattern and prepares the reverse matcher, so a
/// `Pattern` can be shared and reused for every generate/parse call.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct Pattern {
    source: String,
    segments: Vec<Segment>,
    reverse: Regex,
    /// Token kind of each capture group in `reverse`, in group order
    groups: Vec<TokenKind>,
}

impl Pattern {
    /// Compiles a pattern string
    ///
    /// # Errors
    ///
    /// Returns a `PatternSyntaxError` for unbalanced braces, unknown tokens
    /// or a trailing `%`.
    ///
    /// # Examples
    ///
    /// ```
    /// use media_sleuth::Pattern;
    ///
    /// let pattern = Pattern::compile("%n/Season %s/%s %e - %t.%x").unwrap();
    /// assert!(pattern.is_tv());
    /// assert!(Pattern::compile("%n {(%y").is_err());
    /// ```
    pub fn compile(pattern: &str) -> Result<Self, PatternSyntaxError> {
        let segments = compiler::compile_segments(pattern)?;
        let (reverse, groups) = matcher::build_reverse_matcher(&segments)?;

        Ok(Self {
            source: pattern.to_string(),
            segments,
            reverse,
            groups,
        })
    }

    /// The pattern string this was compiled from
    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns true if the token appears anywhere in the pattern
    pub fn contains(&self, kind: TokenKind) -> bool {
        fn walk(segments: &[Segment], kind: TokenKind) -> bool {
            segments.iter().any(|segment| match segment {
                Segment::Token(k) => *k == kind,
                Segment::Optional(children) => walk(children, kind),
                Segment::Literal(_) => false,
            })
        }
        walk(&self.segments, kind)
    }

    /// Returns true for TV patterns (those using season or episode tokens)
    pub fn is_tv(&self) -> bool {
        self.contains(TokenKind::Season) || self.contains(TokenKind::Episode)
    }

    /// Renders the pattern into a `/`-separated relative path
    pub fn generate(&self, context: &MetadataContext) -> String {
        generator::render(&self.segments, context)
    }

    /// Renders the pattern and joins the result onto a media directory root
    pub fn destination(&self, root: &Path, context: &MetadataContext) -> PathBuf {
        self.generate(context)
            .split('/')
            .filter(|component| !component.is_empty())
            .fold(root.to_path_buf(), |path, component| path.join(component))
    }

    /// Recovers season and episode numbers from a path relative to the media root
    ///
    /// The pattern is tried literally first, then the heuristic cascade is run
    /// against the file name. Returns `None` when nothing matched, which means
    /// the file should be treated as a film candidate.
    pub fn parse_episode(&self, relative_path: &str) -> Option<ParsedFileName> {
        let path = relative_path.replace('\\', "/");

        if let Some(parsed) = matcher::literal_episode(self, &path) {
            return Some(parsed);
        }

        let file_name = path.rsplit('/').next().unwrap_or(&path);
        heuristics::parse(file_name)
    }

    /// Recovers film search details by reverse-matching the pattern literally
    ///
    /// Returns `None` if the path does not follow the pattern or no title
    /// could be extracted.
    pub fn parse_film(&self, relative_path: &str) -> Option<SearchDetails> {
        let details = self.match_film(relative_path)?;
        let term = normalize(&details.term);
        (!term.is_empty()).then_some(SearchDetails { term, ..details })
    }

    /// Like [`Pattern::parse_film`], but the title is left unnormalized
    pub(crate) fn match_film(&self, relative_path: &str) -> Option<SearchDetails> {
        let path = relative_path.replace('\\', "/");
        matcher::literal_film(self, &path)
    }
}

impl FromStr for Pattern {
    type Err = PatternSyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::compile(s)
    }
}

impl TryFrom<String> for Pattern {
    type Error = PatternSyntaxError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::compile(&value)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TV_PATTERN: &str = "%n/Season %s/%s %e - %t.%x";

    #[test]
    fn test_round_trip_single_episode() {
        let pattern = Pattern::compile(TV_PATTERN).unwrap();
        let context = MetadataContext::default()
            .with_show_name("Heroes")
            .with_season(1)
            .with_episodes(vec![2])
            .with_title("Don't Look Back")
            .with_extension("avi");

        let path = pattern.generate(&context);
        assert_eq!(path, "Heroes/Season 01/01 02 - Don't Look Back.avi");

        let parsed = pattern.parse_episode(&path).unwrap();
        assert_eq!(parsed.season, 1);
        assert_eq!(parsed.episodes, vec![2]);
        assert_eq!(parsed.matched_by, MatchedBy::Pattern);
        assert_eq!(parsed.term.as_deref(), Some("Heroes"));
    }

    #[test]
    fn test_round_trip_multi_episode() {
        let pattern = Pattern::compile(TV_PATTERN).unwrap();
        let context = MetadataContext::default()
            .with_show_name("Heroes")
            .with_season(4)
            .with_episodes(vec![25, 26])
            .with_title("Two Parter")
            .with_extension("mkv");

        let path = pattern.generate(&context);
        assert_eq!(path, "Heroes/Season 04/04 25 & 26 - Two Parter.mkv");

        let parsed = pattern.parse_episode(&path).unwrap();
        assert_eq!(parsed.season, 4);
        assert_eq!(parsed.episodes, vec![25, 26]);
    }

    #[test]
    fn test_round_trip_film() {
        let pattern = Pattern::compile("%t{ (%y)}{ Part %p}.%x").unwrap();
        let context = MetadataContext::default()
            .with_title("The Usual Suspects")
            .with_year(Some(1995))
            .with_extension("m4v");

        let path = pattern.generate(&context);
        assert_eq!(path, "The Usual Suspects (1995).m4v");

        let details = pattern.parse_film(&path).unwrap();
        assert_eq!(details.term, "The Usual Suspects");
        assert_eq!(details.year.as_deref(), Some("1995"));
        assert_eq!(details.part, None);
    }

    #[test]
    fn test_round_trip_film_with_dotted_title() {
        let pattern = Pattern::compile("%t{ (%y)}.%x").unwrap();

        for (title, year) in [("E.T. the Extra-Terrestrial", Some(1982)), ("S.W.A.T.", None)] {
            let context = MetadataContext::default()
                .with_title(title)
                .with_year(year)
                .with_extension("avi");

            let path = pattern.generate(&context);
            let details = pattern.parse_film(&path).unwrap();
            assert_eq!(details.term, normalize(title), "{}", path);
            assert_eq!(details.year, year.map(|y| y.to_string()));
        }
    }

    #[test]
    fn test_destination_joins_components() {
        let pattern = Pattern::compile(TV_PATTERN).unwrap();
        let context = MetadataContext::default()
            .with_show_name("Heroes")
            .with_season(1)
            .with_episodes(vec![2])
            .with_title("Title")
            .with_extension("avi");

        let destination = pattern.destination(Path::new("/media/tv"), &context);
        assert_eq!(
            destination,
            Path::new("/media/tv")
                .join("Heroes")
                .join("Season 01")
                .join("01 02 - Title.avi")
        );
    }

    #[test]
    fn test_mode_detection() {
        assert!(Pattern::compile(TV_PATTERN).unwrap().is_tv());
        assert!(!Pattern::compile("%t{ (%y)}.%x").unwrap().is_tv());
        assert!(Pattern::compile("%t{ (%y)}.%x").unwrap().contains(TokenKind::Year));
    }

    #[test]
    fn test_parse_from_string() {
        let pattern: Pattern = TV_PATTERN.parse().unwrap();
        assert_eq!(pattern.to_string(), TV_PATTERN);
    }

    #[test]
    fn test_film_file_is_unparsed_for_tv_pattern() {
        let pattern = Pattern::compile(TV_PATTERN).unwrap();
        assert_eq!(pattern.parse_episode("A Film (2011).m4v"), None);
    }

    #[test]
    fn test_pattern_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Pattern>();
    }
}
