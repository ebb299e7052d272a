//! Pattern string to segment tree compilation

use super::{PatternSyntaxError, Segment, TokenKind};
use std::mem;

/// Parses a pattern string into its segment tree
///
/// Literal text is merged into as few `Literal` segments as possible. Optional
/// groups are tracked with a stack so they can nest.
pub(super) fn compile_segments(pattern: &str) -> Result<Vec<Segment>, PatternSyntaxError> {
    if pattern.is_empty() {
        return Err(PatternSyntaxError::Empty);
    }

    // Open groups: position of the `{` and the segments collected before it
    let mut open: Vec<(usize, Vec<Segment>)> = Vec::new();
    let mut current: Vec<Segment> = Vec::new();
    let mut literal = String::new();

    let mut chars = pattern.char_indices();
    while let Some((position, c)) = chars.next() {
        match c {
            '%' => {
                let (_, sigil) = chars
                    .next()
                    .ok_or(PatternSyntaxError::DanglingPercent { position })?;

                if sigil == '%' {
                    literal.push('%');
                    continue;
                }

                let kind = TokenKind::from_sigil(sigil)
                    .ok_or(PatternSyntaxError::UnknownToken { sigil, position })?;
                flush_literal(&mut literal, &mut current);
                current.push(Segment::Token(kind));
            }
            '{' => {
                flush_literal(&mut literal, &mut current);
                open.push((position, mem::take(&mut current)));
            }
            '}' => {
                flush_literal(&mut literal, &mut current);
                let (_, parent) = open
                    .pop()
                    .ok_or(PatternSyntaxError::UnmatchedClose { position })?;
                let children = mem::replace(&mut current, parent);
                current.push(Segment::Optional(children));
            }
            _ => literal.push(c),
        }
    }

    if let Some((position, _)) = open.pop() {
        return Err(PatternSyntaxError::UnclosedOptional { position });
    }

    flush_literal(&mut literal, &mut current);
    Ok(current)
}

fn flush_literal(literal: &mut String, segments: &mut Vec<Segment>) {
    if !literal.is_empty() {
        segments.push(Segment::Literal(mem::take(literal)));
    }
}
