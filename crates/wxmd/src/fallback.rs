//! Degraded conversion used when the tree pipeline fails.
//!
//! Drops scripts, styles and comments, turns line breaks and closing block
//! tags into newlines, strips every remaining tag and tidies whitespace.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use wxmd_core::strip_sentinels;

static SCRIPT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("script regex is valid")
});

static STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("style regex is valid")
});

static COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment regex is valid"));

static LINE_BREAK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(?:p|div|section|article|h[1-6]|li|tr|blockquote|pre|table|ul|ol)\s*>")
        .expect("line break regex is valid")
});

static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]+>").expect("tag regex is valid"));

static ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(nbsp|lt|gt|amp|quot|#39);").expect("entity regex is valid"));

static BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("blank line regex is valid"));

/// Convert HTML to plain, tag-free text
pub fn fallback_convert(html: &str) -> String {
    let text = strip_sentinels(html).replace("\r\n", "\n");
    let text = SCRIPT.replace_all(&text, "");
    let text = STYLE.replace_all(&text, "");
    let text = COMMENT.replace_all(&text, "");
    let text = LINE_BREAK.replace_all(&text, "\n");

    // Decoding can reveal new tags, so strip and decode until stable
    let mut current = text.into_owned();
    loop {
        let stripped = TAG.replace_all(&current, "");
        let next = decode_basic_entities(&stripped);
        if next == current {
            break;
        }
        current = next;
    }

    let trimmed = current
        .lines()
        .map(|line| line.trim_matches(|c: char| c == ' ' || c == '\t' || c == '\u{a0}'))
        .collect::<Vec<_>>()
        .join("\n");

    BLANK_LINES.replace_all(&trimmed, "\n\n").trim().to_string()
}

fn decode_basic_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| match &caps[1] {
            "nbsp" => " ",
            "lt" => "<",
            "gt" => ">",
            "amp" => "&",
            "quot" => "\"",
            _ => "'",
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tags_and_blocks() {
        assert_eq!(
            fallback_convert(
                "<style>p{}</style><p>Hello <b>World</b></p><script>x()</script><!-- c --><p>Two</p>"
            ),
            "Hello World\nTwo"
        );
    }

    #[test]
    fn test_line_breaks() {
        assert_eq!(fallback_convert("a<br>b<BR/>c</div>\n\n\n\nd"), "a\nb\nc\n\nd");
    }

    #[test]
    fn test_entities_to_fixed_point() {
        assert_eq!(fallback_convert("&lt;b&gt;x&lt;/b&gt; &amp;amp; &#39;q&#39;"), "x & 'q'");
    }

    #[test]
    fn test_result_is_tag_free() {
        let out = fallback_convert("<<div>>a<</div>> &amp;lt;i&amp;gt;");
        assert!(!TAG.is_match(&out), "{out:?}");
    }
}
