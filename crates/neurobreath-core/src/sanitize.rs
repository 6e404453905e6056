//! Input sanitization applied to every query before it is matched, routed or forwarded.

use once_cell::sync::Lazy;
use regex::Regex;

/// Longest query (in chars) that is kept after sanitization.
pub const MAX_QUERY_CHARS: usize = 2000;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("static regex"));
static SPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]{2,}").expect("static regex"));

/// Strips markup and control characters, normalises apostrophes and caps the length.
pub fn sanitize_input(text: &str) -> String {
    let without_tags = HTML_TAG.replace_all(text, " ");
    let cleaned: String = without_tags
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect();
    let collapsed = SPACE_RUN.replace_all(&cleaned, " ");
    let trimmed = collapsed.trim();
    if trimmed.chars().count() > MAX_QUERY_CHARS {
        trimmed.chars().take(MAX_QUERY_CHARS).collect::<String>().trim_end().to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tags_and_collapses_spaces() {
        assert_eq!(
            sanitize_input("  <b>how</b>   do I   <script>x</script>breathe "),
            "how do I x breathe"
        );
    }

    #[test]
    fn normalises_curly_apostrophes() {
        assert_eq!(sanitize_input("I can\u{2019}t cope"), "I can't cope");
    }

    #[test]
    fn drops_control_characters_but_keeps_newlines() {
        assert_eq!(sanitize_input("a\u{0007}b\nc"), "ab\nc");
    }

    #[test]
    fn caps_length() {
        let long = "a".repeat(MAX_QUERY_CHARS + 50);
        assert_eq!(sanitize_input(&long).chars().count(), MAX_QUERY_CHARS);
    }
}
