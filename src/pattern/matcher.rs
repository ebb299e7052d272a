//! Literal reverse matching of compiled patterns

use super::generator::EPISODE_SEPARATOR;
use super::{MatchedBy, ParsedFileName, Pattern, SearchDetails, Segment, TokenKind};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

static YEAR_DECORATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(\[]((?:19|20)\d{2})[)\]]").expect("valid regex"));

static PART_DECORATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[\s.\-_(\[])(?:part|pt|cd)[\s.]*(\d{1,2})(?:[)\]]|\b)").expect("valid regex")
});

/// Builds the reverse matcher for a segment tree
///
/// Literals are escaped, tokens become capture groups and optional groups
/// become optional regex groups. The returned vector maps each capture group
/// (starting at group 1) to the token it captures.
pub(super) fn build_reverse_matcher(
    segments: &[Segment],
) -> Result<(Regex, Vec<TokenKind>), regex::Error> {
    let mut expression = String::from("(?i)^");
    let mut groups = Vec::new();
    push_segments(segments, &mut expression, &mut groups);
    expression.push('$');

    Ok((Regex::new(&expression)?, groups))
}

fn push_segments(segments: &[Segment], expression: &mut String, groups: &mut Vec<TokenKind>) {
    for segment in segments {
        match segment {
            Segment::Literal(text) => expression.push_str(&regex::escape(text)),
            Segment::Token(kind) => {
                groups.push(*kind);
                expression.push_str(capture_for(*kind));
            }
            Segment::Optional(children) => {
                expression.push_str("(?:");
                push_segments(children, expression, groups);
                expression.push_str(")?");
            }
        }
    }
}

fn capture_for(kind: TokenKind) -> &'static str {
    match kind {
        TokenKind::Season | TokenKind::Part => r"(\d+)",
        TokenKind::Year => r"(\d{4})",
        TokenKind::Episode => r"(\d+(?:\s*&\s*\d+)*)",
        TokenKind::Extension => r"([^./]+)",
        TokenKind::ShowName | TokenKind::Title | TokenKind::Id => r"([^/]*?)",
    }
}

/// Returns the first non-empty capture for the given token
fn capture<'h>(pattern: &Pattern, captures: &Captures<'h>, kind: TokenKind) -> Option<&'h str> {
    pattern
        .groups
        .iter()
        .enumerate()
        .filter(|(_, k)| **k == kind)
        .find_map(|(index, _)| captures.get(index + 1))
        .map(|m| m.as_str())
        .filter(|value| !value.is_empty())
}

pub(super) fn literal_episode(pattern: &Pattern, path: &str) -> Option<ParsedFileName> {
    let captures = pattern.reverse.captures(path)?;

    let season: u32 = capture(pattern, &captures, TokenKind::Season)?.parse().ok()?;
    let episodes = capture(pattern, &captures, TokenKind::Episode)?
        .split(EPISODE_SEPARATOR.trim())
        .map(|episode| episode.trim().parse())
        .collect::<Result<Vec<u32>, _>>()
        .ok()?;

    let term = capture(pattern, &captures, TokenKind::ShowName).map(str::to_string);

    debug!(path, season, ?episodes, "file name matched pattern literally");

    Some(ParsedFileName {
        season,
        episodes,
        matched_by: MatchedBy::Pattern,
        term,
    })
}

/// Reverse-matches a film path, keeping the captured title as written
pub(super) fn literal_film(pattern: &Pattern, path: &str) -> Option<SearchDetails> {
    let captures = pattern.reverse.captures(path)?;

    let title = capture(pattern, &captures, TokenKind::Title)?;
    let mut year = capture(pattern, &captures, TokenKind::Year).map(str::to_string);
    let mut part = capture(pattern, &captures, TokenKind::Part).and_then(|p| p.parse().ok());

    let (title, decorated_year, decorated_part) = strip_decorations(title);
    year = year.or(decorated_year);
    part = part.or(decorated_part);

    // Dots and underscores are kept; release names are cleaned up by the
    // film searcher
    let term = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if term.is_empty() {
        return None;
    }

    debug!(path, %term, ?year, ?part, "film name matched pattern literally");

    Some(SearchDetails { term, year, part })
}

/// Removes `(YYYY)` and `Part N` decorations from a title
///
/// Returns the remaining title with the year and part number that were found.
pub(crate) fn strip_decorations(title: &str) -> (String, Option<String>, Option<u32>) {
    let mut remaining = title.to_string();

    let found_year = YEAR_DECORATION
        .captures(&remaining)
        .and_then(|c| Some((c[1].to_string(), c.get(0)?.range())));
    let year = found_year.map(|(year, range)| {
        remaining.replace_range(range, " ");
        year
    });

    let found_part = PART_DECORATION
        .captures(&remaining)
        .and_then(|c| Some((c[1].parse::<u32>().ok()?, c.get(0)?.range())));
    let part = found_part.map(|(part, range)| {
        remaining.replace_range(range, " ");
        part
    });

    (remaining, year, part)
}

/// Turns dot/underscore separated release names into space separated text
///
/// Dots directly next to a space are kept (`Mr. Smith`). Runs of whitespace
/// are collapsed and separator junk is trimmed from both ends.
pub(crate) fn clean_separators(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut cleaned = String::with_capacity(text.len());

    for (index, &c) in chars.iter().enumerate() {
        let keep_dot = c == '.'
            && ((index > 0 && chars[index - 1] == ' ')
                || chars.get(index + 1).is_some_and(|next| *next == ' '));
        match c {
            '_' => cleaned.push(' '),
            '.' if !keep_dot => cleaned.push(' '),
            _ => cleaned.push(c),
        }
    }

    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| c == '-' || c == ' ' || c == '.' || c == ',')
        .to_string()
}
