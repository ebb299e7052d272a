//! Fallback season/episode recognition
//!
//! Real-world file names rarely follow the configured pattern. When the
//! literal reverse match fails, the heuristics below are tried strictly in
//! order and the first one that matches decides the result.

use super::matcher::clean_separators;
use super::{MatchedBy, ParsedFileName};
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

fn compile(expression: &str) -> Regex {
    Regex::new(expression).expect("valid regex")
}

static SEASON_EPISODE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)s([0-9]+)e([0-9]+)"));
static SEASON_DOT_EPISODE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)s([0-9]+)[. ]e([0-9]+)"));
static CROSS_SEPARATED: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)(?:^|[^0-9])([0-9]{1,2})x([0-9]{1,3})(?:[^0-9]|$)"));
static LEADING_SINGLE_DIGIT: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^([0-9])\s([0-9]{2})(?:[^0-9]|$)"));
static LEADING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| compile(r"^([0-9]{1,2})\s([0-9]{2})(?:[^0-9]|$)"));
static PHRASE: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)season[\s.]*([0-9]{1,2})[\s.]*episode[\s.]*([0-9]{1,3})"));
static DIGIT_RUN: LazyLock<Regex> = LazyLock::new(|| compile(r"[0-9]+"));

// Trailing multi-episode markers, anchored at the end of the primary match
static TRAILING_EPISODE: LazyLock<Regex> = LazyLock::new(|| compile(r"(?i)^e([0-9]+)"));
static TRAILING_PAIR: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^[-+,.]?s([0-9]+)e([0-9]+)"));
static TRAILING_CROSS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?i)^[-+,.]?([0-9]{1,2})x([0-9]{1,3})(?:[^0-9]|$)"));
static TRAILING_NUMBER: LazyLock<Regex> = LazyLock::new(|| compile(r"^[+,.]([0-9]{2})(?:[^0-9]|$)"));

/// A fallback matcher in the cascade
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    /// `S04E06`
    SeasonEpisode,
    /// `S04.E06` or `S04 E06`
    SeasonDotEpisode,
    /// `4x06`
    CrossSeparated,
    /// `0406`: first two digits season, last two episode
    FourDigits,
    /// `406`: first digit season, last two episode
    ThreeDigits,
    /// `4 06` at the start of the name
    LeadingSingleDigit,
    /// `10 06` at the start of the name
    LeadingNumber,
    /// `season 4 episode 6`
    Phrase,
}

/// The cascade, in evaluation order
pub(super) const CASCADE: [Heuristic; 8] = [
    Heuristic::SeasonEpisode,
    Heuristic::SeasonDotEpisode,
    Heuristic::CrossSeparated,
    Heuristic::FourDigits,
    Heuristic::ThreeDigits,
    Heuristic::LeadingSingleDigit,
    Heuristic::LeadingNumber,
    Heuristic::Phrase,
];

/// Where a heuristic matched and what it found
struct Hit {
    season: u32,
    episode: u32,
    /// Byte offset where the match starts; text before it is the show name
    start: usize,
    /// Byte offset right after the episode number
    end: usize,
}

impl Heuristic {
    /// One-based position in the cascade
    pub fn index(self) -> usize {
        CASCADE
            .iter()
            .position(|heuristic| *heuristic == self)
            .map_or(0, |position| position + 1)
    }

    /// Whether additional episode numbers may follow the primary match
    fn scans_trailing(self) -> bool {
        matches!(
            self,
            Heuristic::SeasonEpisode | Heuristic::SeasonDotEpisode | Heuristic::CrossSeparated
        )
    }

    fn apply(self, name: &str) -> Option<Hit> {
        match self {
            Heuristic::SeasonEpisode => regex_hit(&SEASON_EPISODE, name),
            Heuristic::SeasonDotEpisode => regex_hit(&SEASON_DOT_EPISODE, name),
            Heuristic::CrossSeparated => regex_hit(&CROSS_SEPARATED, name),
            Heuristic::FourDigits => digit_run_hit(name, 4),
            Heuristic::ThreeDigits => digit_run_hit(name, 3),
            Heuristic::LeadingSingleDigit => regex_hit(&LEADING_SINGLE_DIGIT, name),
            Heuristic::LeadingNumber => regex_hit(&LEADING_NUMBER, name),
            Heuristic::Phrase => regex_hit(&PHRASE, name),
        }
    }
}

/// Runs the cascade against a file name
///
/// Returns `None` if no heuristic matched.
pub(super) fn parse(file_name: &str) -> Option<ParsedFileName> {
    let name = Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name);

    CASCADE.iter().find_map(|&heuristic| {
        let hit = heuristic.apply(name)?;

        let mut episodes = vec![hit.episode];
        if heuristic.scans_trailing() {
            episodes.extend(trailing_episodes(&name[hit.end..], hit.season));
        }

        let term = Some(clean_separators(&name[..hit.start])).filter(|term| !term.is_empty());

        debug!(
            file_name,
            ?heuristic,
            season = hit.season,
            ?episodes,
            "file name matched heuristic"
        );

        Some(ParsedFileName {
            season: hit.season,
            episodes,
            matched_by: MatchedBy::Heuristic(heuristic),
            term,
        })
    })
}

/// Extracts a hit from a regex whose groups 1 and 2 are season and episode
fn regex_hit(regex: &Regex, name: &str) -> Option<Hit> {
    let captures = regex.captures(name)?;
    let season = captures.get(1)?;
    let episode = captures.get(2)?;

    Some(Hit {
        season: season.as_str().parse().ok()?,
        episode: episode.as_str().parse().ok()?,
        start: captures.get(0)?.start(),
        end: episode.end(),
    })
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '.' | ' ' | '-' | '_')
}

fn looks_like_year(digits: &str) -> bool {
    digits.starts_with("19") || digits.starts_with("20")
}

/// Finds a delimited run of exactly `len` digits and splits it into season/episode
///
/// A run only counts when it stands on its own (start/end of the name or a
/// separator on both sides). A year-like four digit run is passed over when
/// another three or four digit run is available, and an episode of `00` is
/// never accepted.
fn digit_run_hit(name: &str, len: usize) -> Option<Hit> {
    let runs: Vec<_> = DIGIT_RUN
        .find_iter(name)
        .filter(|run| {
            let before = name[..run.start()].chars().next_back();
            let after = name[run.end()..].chars().next();
            before.is_none_or(is_delimiter) && after.is_none_or(is_delimiter)
        })
        .collect();

    let run = runs.iter().filter(|run| run.as_str().len() == len).find(|run| {
        let digits = run.as_str();
        if digits.ends_with("00") {
            return false;
        }
        let has_alternative = runs
            .iter()
            .any(|other| other.start() != run.start() && (3..=4).contains(&other.as_str().len()));
        !(len == 4 && looks_like_year(digits) && has_alternative)
    })?;

    let digits = run.as_str();
    Some(Hit {
        season: digits[..len - 2].parse().ok()?,
        episode: digits[len - 2..].parse().ok()?,
        start: run.start(),
        end: run.end(),
    })
}

/// Collects extra episode numbers directly following a primary match
fn trailing_episodes(rest: &str, season: u32) -> Vec<u32> {
    let mut episodes = Vec::new();
    let mut rest = rest;

    loop {
        if let Some((episode, end)) = single_number(&TRAILING_EPISODE, rest) {
            episodes.push(episode);
            rest = &rest[end..];
            continue;
        }

        if let Some(hit) = regex_hit(&TRAILING_PAIR, rest).or_else(|| regex_hit(&TRAILING_CROSS, rest))
        {
            if hit.season != season {
                break;
            }
            episodes.push(hit.episode);
            rest = &rest[hit.end..];
            continue;
        }

        if let Some((episode, end)) = single_number(&TRAILING_NUMBER, rest) {
            episodes.push(episode);
            rest = &rest[end..];
            continue;
        }

        break;
    }

    episodes
}

fn single_number(regex: &Regex, text: &str) -> Option<(u32, usize)> {
    let number = regex.captures(text)?.get(1)?;
    Some((number.as_str().parse().ok()?, number.end()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_episode(file_name: &str, season: u32, episodes: &[u32]) {
        let parsed = parse(file_name).unwrap_or_else(|| panic!("{file_name} was not parsed"));
        assert_eq!(parsed.season, season, "season of {file_name}");
        assert_eq!(parsed.episodes, episodes, "episodes of {file_name}");
    }

    #[test]
    fn test_year_is_not_an_episode() {
        assert_episode("show.2009.406.hdtv-lol.avi", 4, &[6]);
        let parsed = parse("show.2009.406.hdtv-lol.avi").unwrap();
        assert_eq!(parsed.term.as_deref(), Some("show 2009"));
    }

    #[test]
    fn test_season_episode_markers() {
        assert_episode("A.Show.2008.S03E01.The.Show.Title.m4v", 3, &[1]);
        assert_episode("The.Show.S04E23.The Episode (1).HDTV.XviD-BiA.avi", 4, &[23]);
        assert_episode("The.Show.S04E24.The' & 'Episode (2).HDTV.XviD-BiA.avi", 4, &[24]);
        assert_episode("Show.s09e22.hdtv.xvid-2hd.m4v", 9, &[22]);
        assert_episode("The Show Special Seriess S02E17 The Title.avi", 2, &[17]);
        assert_episode("Warehouse.13.S01E13.TheBlah.DVDRip.XviD-BLAH.avi", 1, &[13]);
        assert_episode("The Show - S3 E22 - The Blah.avi", 3, &[22]);
    }

    #[test]
    fn test_cross_separated() {
        assert_episode(
            "Sliders.4x13. Title.Episode!HiRes.DivX.TVRip.ENG.topiq.avi",
            4,
            &[13],
        );
        assert_episode("The.Show.1x30 The-Blah!.avi", 1, &[30]);
        assert_episode("The.Show.2x12The Deadly Years.avi", 2, &[12]);
        assert_episode("The show 3x01 132.m4v", 3, &[1]);
        assert_episode("The show 10x01 - A title.m4v", 10, &[1]);
    }

    #[test]
    fn test_digit_runs() {
        assert_episode("2001 - A title.m4v", 20, &[1]);
        assert_episode("The show 2001 - A title.m4v", 20, &[1]);
        assert_episode("301 - A title.m4v", 3, &[1]);
        assert_episode("The show 301 - A title.m4v", 3, &[1]);
    }

    #[test]
    fn test_leading_numbers() {
        assert_episode("5 15 - Cycle 5.avi", 5, &[15]);
        assert_episode("10 06 - 300.avi", 10, &[6]);
        assert_eq!(
            parse("10 06 - 300.avi").unwrap().matched_by,
            MatchedBy::Heuristic(Heuristic::LeadingNumber)
        );
    }

    #[test]
    fn test_phrase() {
        assert_episode("The show season 9 episode 11 - A title.m4v", 9, &[11]);
        assert_episode("The show season 20 episode 11 - A title.m4v", 20, &[11]);
    }

    #[test]
    fn test_multi_episode() {
        assert_episode("a.show.S04E25+26...avi", 4, &[25, 26]);
        assert_episode("a.show.s04e25.26...avi", 4, &[25, 26]);
        assert_episode("a.show.S04E25,26.hdtv.avi", 4, &[25, 26]);
        assert_episode("Show.S01E01E02E03.avi", 1, &[1, 2, 3]);
        assert_episode("Show.S01E01-S01E02.avi", 1, &[1, 2]);
        assert_episode("Show.1x01.1x02.avi", 1, &[1, 2]);
    }

    #[test]
    fn test_trailing_markers_are_strict() {
        assert_episode("Show.S01E01.720p.avi", 1, &[1]);
        assert_episode("Show.S01E01-S02E02.avi", 1, &[1]);
    }

    #[test]
    fn test_film_is_unparsed() {
        assert!(parse("A Film (2011).m4v").is_none());
        assert!(parse("Heat.avi").is_none());
    }

    #[test]
    fn test_dash_separated_numbers_are_unparsed() {
        // `<season>-<episode>` is not one of the recognised markers
        assert!(parse("The show 3-01 A episode title title.m4v").is_none());
    }

    #[test]
    fn test_cascade_indices() {
        assert_eq!(Heuristic::SeasonEpisode.index(), 1);
        assert_eq!(Heuristic::FourDigits.index(), 4);
        assert_eq!(Heuristic::Phrase.index(), 8);
    }
}
