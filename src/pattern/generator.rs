//! Rendering of compiled patterns

use super::{MetadataContext, Segment, TokenKind};
use crate::normalizer::normalize;

/// Separator between the numbers of a multi-episode file
pub(super) const EPISODE_SEPARATOR: &str = " & ";

/// Renders segments depth-first into a relative path
pub(super) fn render(segments: &[Segment], context: &MetadataContext) -> String {
    let mut output = String::new();
    render_into(segments, context, &mut output);
    output
}

fn render_into(segments: &[Segment], context: &MetadataContext, output: &mut String) {
    for segment in segments {
        match segment {
            Segment::Literal(text) => output.push_str(text),
            Segment::Token(kind) => {
                if let Some(value) = token_value(*kind, context) {
                    output.push_str(&value);
                }
            }
            Segment::Optional(children) => {
                let resolved = children.iter().all(|child| match child {
                    Segment::Token(kind) => token_value(*kind, context).is_some(),
                    _ => true,
                });
                if resolved {
                    render_into(children, context, output);
                }
            }
        }
    }
}

/// Formats the value of a single token, or `None` if it is unresolved
fn token_value(kind: TokenKind, context: &MetadataContext) -> Option<String> {
    match kind {
        TokenKind::ShowName => context.show_name.as_deref().map(normalize),
        TokenKind::Title => context.title.as_deref().map(normalize),
        TokenKind::Id => context.id.as_deref().map(normalize),
        TokenKind::Season => context.season.map(|season| format!("{season:02}")),
        TokenKind::Episode => {
            if context.episodes.is_empty() {
                return None;
            }
            let episodes: Vec<String> = context
                .episodes
                .iter()
                .map(|episode| format!("{episode:02}"))
                .collect();
            Some(episodes.join(EPISODE_SEPARATOR))
        }
        TokenKind::Extension => context
            .extension
            .as_deref()
            .map(|ext| ext.trim_start_matches('.').to_string()),
        TokenKind::Year => context.year.map(|year| year.to_string()),
        TokenKind::Part => context.part.map(|part| part.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::super::compiler::compile_segments;
    use super::*;

    fn generate(pattern: &str, context: &MetadataContext) -> String {
        render(&compile_segments(pattern).unwrap(), context)
    }

    #[test]
    fn test_optional_dropped_when_unresolved() {
        let context = MetadataContext::default()
            .with_title("Heat")
            .with_extension("avi");
        assert_eq!(generate("%t{ (%y)}{ Part %p}.%x", &context), "Heat.avi");

        let context = context.with_year(Some(1995)).with_part(Some(2));
        assert_eq!(
            generate("%t{ (%y)}{ Part %p}.%x", &context),
            "Heat (1995) Part 2.avi"
        );
    }

    #[test]
    fn test_nested_optional_is_independent() {
        let context = MetadataContext::default()
            .with_title("Heat")
            .with_year(Some(1995))
            .with_extension("avi");
        assert_eq!(generate("%t{ (%y){ Part %p}}.%x", &context), "Heat (1995).avi");

        let context = MetadataContext::default()
            .with_title("Heat")
            .with_part(Some(1))
            .with_extension("avi");
        assert_eq!(generate("%t{ (%y){ Part %p}}.%x", &context), "Heat.avi");
    }

    #[test]
    fn test_zero_padding() {
        let context = MetadataContext::default()
            .with_season(3)
            .with_episodes(vec![9])
            .with_extension(".mkv");
        assert_eq!(generate("S%sE%e.%x", &context), "S03E09.mkv");

        let context = context.with_season(112).with_episodes(vec![104]);
        assert_eq!(generate("S%sE%e.%x", &context), "S112E104.mkv");
    }

    #[test]
    fn test_titles_are_normalized() {
        let context = MetadataContext::default()
            .with_show_name("Who: Else")
            .with_title("Finalé / Part 1")
            .with_extension("avi");
        assert_eq!(generate("%n - %t.%x", &context), "Who- Else - Finale - Part 1.avi");
    }

    #[test]
    fn test_generation_is_deterministic() {
        let context = MetadataContext::default()
            .with_show_name("Show")
            .with_season(1)
            .with_episodes(vec![1, 2])
            .with_title("Title")
            .with_extension("avi");
        let first = generate("%n/%s %e - %t.%x", &context);
        let second = generate("%n/%s %e - %t.%x", &context);
        assert_eq!(first, second);
        assert_eq!(first, "Show/01 01 & 02 - Title.avi");
    }
}
