//! Text derivation helpers shared by excerpts and headline rendering.

pub const EXCERPT_LENGTH: usize = 200;
pub const EXCERPT_CUT_MARKER: &str = "<!--more-->";
pub const EXCERPT_ALLOWED_TAGS: &[&str] = &["code", "em", "strong"];

const ELLIPSIS: char = '\u{2026}';
const FEATURE_LINE_MIN: usize = 10;
const FEATURE_LINE_MAX: usize = 20;
const TITLE_VARIATION_COUNT: usize = 6;

/// Cuts an excerpt out of a post body. Text before the first `<!--more-->`
/// marker wins; without a marker the first `max_length` characters are
/// kept, with an ellipsis appended when anything was dropped.
pub fn create_excerpt(content: &str, max_length: usize) -> String {
    match content.split_once(EXCERPT_CUT_MARKER) {
        Some((before, _)) => before.to_string(),
        None => {
            let mut excerpt: String = content.chars().take(max_length).collect();
            if content.chars().count() > max_length {
                excerpt.push(ELLIPSIS);
            }
            excerpt
        }
    }
}

/// Removes HTML tags while keeping their inner text. Tags whose name is on
/// the allow list survive untouched, attributes included; names match
/// ASCII case-insensitively. A `<` without a closing `>` is plain text.
pub fn strip_tags(html: &str, allowed_tags: &[&str]) -> String {
    let mut output = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        let (text, tail) = rest.split_at(open);
        output.push_str(text);

        let Some(close) = tail.find('>') else {
            output.push_str(tail);
            return output;
        };

        if is_allowed_tag(&tail[..=close], allowed_tags) {
            output.push('<');
            rest = &tail[1..];
        } else {
            rest = &tail[close + 1..];
        }
    }

    output.push_str(rest);
    output
}

fn is_allowed_tag(tag: &str, allowed_tags: &[&str]) -> bool {
    let inner = tag[1..].strip_prefix('/').unwrap_or(&tag[1..]);
    let end = inner
        .find(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .unwrap_or(inner.len());
    let name = &inner[..end];
    !name.is_empty() && allowed_tags.iter().any(|tag| name.eq_ignore_ascii_case(tag))
}

/// Splits a title into display lines for the oversized headline treatment.
/// Words accumulate greedily up to twenty characters per line; a trailing
/// line shorter than ten characters folds into the line before it.
pub fn generate_feature_title(title: &str) -> Vec<String> {
    if title.is_empty() {
        return Vec::new();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in title.split(' ') {
        if current.chars().count() + word.chars().count() <= FEATURE_LINE_MAX {
            current.push_str(word);
            current.push(' ');
        } else {
            lines.push(current);
            current = format!("{word} ");
        }
    }

    if current.chars().count() < FEATURE_LINE_MIN && !lines.is_empty() {
        let last = lines.len() - 1;
        lines[last].push_str(&current);
    } else {
        lines.push(current);
    }

    lines.into_iter().map(|line| line.trim().to_string()).collect()
}

/// Cycles a zero-based card index through the six title style variations.
pub fn title_variation(index: usize) -> usize {
    (index % TITLE_VARIATION_COUNT) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_prefers_text_before_cut_marker() {
        assert_eq!(
            create_excerpt("Intro text<!--more-->Rest of article", EXCERPT_LENGTH),
            "Intro text"
        );
    }

    #[test]
    fn excerpt_uses_first_marker_only() {
        assert_eq!(
            create_excerpt("a<!--more-->b<!--more-->c", EXCERPT_LENGTH),
            "a"
        );
    }

    #[test]
    fn excerpt_truncates_with_single_ellipsis_character() {
        let body = "a".repeat(250);
        let excerpt = create_excerpt(&body, EXCERPT_LENGTH);
        assert_eq!(excerpt.chars().count(), 201);
        assert_eq!(excerpt, format!("{}\u{2026}", "a".repeat(200)));
    }

    #[test]
    fn excerpt_keeps_short_bodies_untouched() {
        assert_eq!(create_excerpt("short body", EXCERPT_LENGTH), "short body");
        let exact = "b".repeat(200);
        assert_eq!(create_excerpt(&exact, EXCERPT_LENGTH), exact);
    }

    #[test]
    fn strip_tags_keeps_allow_listed_tags_verbatim() {
        let input = "<strong>Bold</strong> <script>evil()</script> <em>ok</em>";
        assert_eq!(
            strip_tags(input, EXCERPT_ALLOWED_TAGS),
            "<strong>Bold</strong> evil() <em>ok</em>"
        );
    }

    #[test]
    fn strip_tags_matches_names_case_insensitively() {
        assert_eq!(
            strip_tags("<EM>loud</EM> <DIV>gone</DIV>", EXCERPT_ALLOWED_TAGS),
            "<EM>loud</EM> gone"
        );
    }

    #[test]
    fn strip_tags_requires_a_name_boundary() {
        // "em" is allowed but "email" is a different tag.
        assert_eq!(
            strip_tags("<email>text</email>", EXCERPT_ALLOWED_TAGS),
            "text"
        );
        assert_eq!(
            strip_tags("<em class=\"x\">text</em>", EXCERPT_ALLOWED_TAGS),
            "<em class=\"x\">text</em>"
        );
    }

    #[test]
    fn strip_tags_removes_everything_with_empty_allow_list() {
        assert_eq!(strip_tags("<p>a <em>b</em></p>", &[]), "a b");
    }

    #[test]
    fn strip_tags_leaves_unclosed_angle_brackets_alone() {
        assert_eq!(strip_tags("1 < 2", EXCERPT_ALLOWED_TAGS), "1 < 2");
        // Anything bracketed by < and > reads as a tag, named or not.
        assert_eq!(strip_tags("1 < 2 and 3 > 2", EXCERPT_ALLOWED_TAGS), "1  2");
    }

    #[test]
    fn feature_title_fits_short_titles_on_one_line() {
        assert_eq!(
            generate_feature_title("The Quick Brown Fox Jumps"),
            vec!["The Quick Brown Fox Jumps"]
        );
    }

    #[test]
    fn feature_title_wraps_greedily_at_twenty_characters() {
        assert_eq!(
            generate_feature_title("Building Static Sites With Markdown Pipelines"),
            vec!["Building Static", "Sites With Markdown", "Pipelines"]
        );
    }

    #[test]
    fn feature_title_merges_short_trailing_lines() {
        assert_eq!(
            generate_feature_title("Incremental Parsing Notes"),
            vec!["Incremental Parsing Notes"]
        );
    }

    #[test]
    fn feature_title_handles_empty_and_oversized_words() {
        assert_eq!(generate_feature_title(""), Vec::<String>::new());
        assert_eq!(
            generate_feature_title("Supercalifragilisticexpialidocious"),
            vec!["", "Supercalifragilisticexpialidocious"]
        );
    }

    #[test]
    fn title_variation_cycles_through_six_styles() {
        let variations: Vec<usize> = (0..8).map(title_variation).collect();
        assert_eq!(variations, vec![1, 2, 3, 4, 5, 6, 1, 2]);
    }
}
