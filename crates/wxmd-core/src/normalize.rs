//! Markdown text normalization
//!
//! Cleans serialized Markdown: decodes leftover character references, strips
//! stray tags, tidies whitespace and blank lines, and separates headings and
//! lists from neighbouring text. Code fences and code spans are never touched.
//!
//! The passes are idempotent: normalizing already-normalized text returns it
//! unchanged.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::entities::{decode_numeric, lookup_named};
use crate::serialize::Markup;
use crate::verbatim::{strip_sentinels, Verbatim, VerbatimError, VerbatimTable};

const HSPACE: &[char] = &[' ', '\t', '\u{a0}'];

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9A-Fa-f]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});")
        .expect("entity regex is valid")
});

static TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<[A-Za-z/!?][^<>\n\x{E000}\x{E001}]*>").expect("tag regex is valid")
});

static STAR_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*{3,}").expect("star regex is valid"));

static EXTRA_NEWLINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{4,}").expect("newline regex is valid"));

static TRIPLE_NEWLINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3}").expect("newline regex is valid"));

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#{1,6}[ \t]").expect("heading regex is valid"));

static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*(?:[-+*]|[0-9]{1,9}\.)(?:[ \t]|$)").expect("list marker regex is valid")
});

/// Normalize arbitrary Markdown text
pub fn normalize(text: &str) -> String {
    let markup = Markup {
        text: strip_sentinels(text).into_owned(),
        verbatim: VerbatimTable::new(),
    };

    match normalize_markup(markup) {
        Ok(normalized) => normalized,
        Err(err) => {
            // Input is sentinel-free, so only protection itself can fail here
            tracing::warn!(error = %err, "normalizing without code protection");
            trim_document(&clean(&text.replace("\r\n", "\n"))).to_string()
        }
    }
}

/// Normalize serialized Markdown and restore its verbatim regions
pub fn normalize_markup(markup: Markup) -> Result<String, VerbatimError> {
    let Markup { text, mut verbatim } = markup;
    let serialized = verbatim.len();

    let text = text.replace("\r\n", "\n");
    let text = protect(&text, &mut verbatim);
    tracing::debug!(
        serialized,
        protected = verbatim.len() - serialized,
        "normalizing markdown"
    );

    let text = clean(&text);
    let restored = verbatim.restore(&text)?;
    Ok(trim_document(&restored).to_string())
}

fn trim_document(text: &str) -> &str {
    text.trim_matches(|c: char| c == '\n' || HSPACE.contains(&c))
}

fn clean(text: &str) -> String {
    let text = settle_inline(text);
    let text = trim_lines(&text);
    let text = collapse_blank_lines(&text);
    space_blocks(&text)
}

/// Replace existing fences and code spans with placeholder tokens
fn protect(text: &str, table: &mut VerbatimTable) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());

    let mut i = 0;
    while i < lines.len() {
        match FenceOpen::parse(lines[i]) {
            Some(open) => {
                // An unclosed fence runs to the end of the text
                let end = (i + 1..lines.len())
                    .find(|&j| open.is_closed_by(lines[j]))
                    .unwrap_or(lines.len() - 1);
                out.push(protect_fence(&lines[i..=end], &open.prefix, table));
                i = end + 1;
            }
            None => {
                out.push(protect_code_spans(lines[i], table));
                i += 1;
            }
        }
    }

    out.join("\n")
}

/// Opening line of a backtick fence
struct FenceOpen {
    /// Indentation and quote markers before the backticks
    prefix: String,
    quote_depth: usize,
    ticks: usize,
}

impl FenceOpen {
    fn parse(line: &str) -> Option<Self> {
        let (quote_depth, rest) = split_quote_prefix(line);
        let rest = rest.trim_start_matches([' ', '\t']);
        let ticks = rest.len() - rest.trim_start_matches('`').len();
        if ticks < 3 || rest[ticks..].contains('`') {
            return None;
        }
        Some(Self {
            prefix: line[..line.len() - rest.len()].to_string(),
            quote_depth,
            ticks,
        })
    }

    fn is_closed_by(&self, line: &str) -> bool {
        let (depth, rest) = split_quote_prefix(line);
        let rest = rest.trim_start_matches([' ', '\t']);
        let ticks = rest.len() - rest.trim_start_matches('`').len();
        depth == self.quote_depth && ticks >= self.ticks && rest[ticks..].trim().is_empty()
    }
}

/// Protect a whole fence. When every line carries the opening line's prefix,
/// the prefix stays outside the token so the fence keeps its list or quote
/// position through trimming and restore.
fn protect_fence(lines: &[&str], prefix: &str, table: &mut VerbatimTable) -> String {
    let bare_prefix = prefix.trim_end();
    let stripped: Option<Vec<&str>> = lines
        .iter()
        .map(|line| match line.strip_prefix(prefix) {
            Some(rest) => Some(rest),
            None if *line == bare_prefix => Some(""),
            None => None,
        })
        .collect();

    match stripped {
        Some(stripped) if !prefix.is_empty() => {
            let token = table.insert(Verbatim::Raw(stripped.join("\n")));
            format!("{prefix}{token}")
        }
        _ => table.insert(Verbatim::Raw(lines.join("\n"))),
    }
}

fn split_quote_prefix(line: &str) -> (usize, &str) {
    let mut depth = 0;
    let mut rest = line;
    while let Some(after) = rest.strip_prefix('>') {
        depth += 1;
        rest = after.strip_prefix(' ').unwrap_or(after);
    }
    (depth, rest)
}

/// Protect code spans: a backtick run closed by a run of the same length
/// on the same line
fn protect_code_spans(line: &str, table: &mut VerbatimTable) -> String {
    let bytes = line.as_bytes();
    let mut out = String::with_capacity(line.len());
    let mut last = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'`' {
            i += 1;
            continue;
        }

        let start = i;
        while i < bytes.len() && bytes[i] == b'`' {
            i += 1;
        }
        let run = i - start;

        let mut j = i;
        let mut close = None;
        while j < bytes.len() {
            if bytes[j] != b'`' {
                j += 1;
                continue;
            }
            let run_start = j;
            while j < bytes.len() && bytes[j] == b'`' {
                j += 1;
            }
            if j - run_start == run {
                close = Some(j);
                break;
            }
        }

        if let Some(end) = close {
            out.push_str(&line[last..start]);
            out.push_str(&table.insert(Verbatim::Raw(line[start..end].to_string())));
            last = end;
            i = end;
        }
    }

    out.push_str(&line[last..]);
    out
}

/// Decode references, strip tags and collapse star runs until nothing changes.
/// Every step only shrinks the text, so this terminates.
fn settle_inline(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let decoded = decode_entities(&current);
        let stripped = TAG.replace_all(&decoded, "");
        let next = STAR_RUN.replace_all(&stripped, "**").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

fn decode_entities(text: &str) -> String {
    ENTITY
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if body.starts_with('#') {
                decode_numeric(body).map(String::from)
            } else {
                lookup_named(body).map(str::to_string)
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn is_list_line(line: &str) -> bool {
    LIST_MARKER.is_match(line)
}

fn is_heading_line(line: &str) -> bool {
    HEADING.is_match(line)
}

/// Whether `line` is part of a list, given whether the lines before it were.
/// Indented lines and blank lines continue the current item.
fn continues_list(in_list: bool, line: &str) -> bool {
    if line.is_empty() {
        return in_list;
    }
    is_list_line(line) || (in_list && line.starts_with([' ', '\t']))
}

// Leading whitespace is kept inside lists so nesting and item blocks survive.
fn trim_lines(text: &str) -> String {
    let mut in_list = false;
    text.split('\n')
        .map(|line| {
            let line = line.trim_end_matches(HSPACE);
            in_list = continues_list(in_list, line);
            if in_list {
                line
            } else {
                line.trim_start_matches(HSPACE)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn collapse_blank_lines(text: &str) -> String {
    let text = EXTRA_NEWLINES.replace_all(text, "\n\n\n");
    TRIPLE_NEWLINE.replace_all(&text, "\n\n").into_owned()
}

/// Put a blank line around headings and before the first line of a list
fn space_blocks(text: &str) -> String {
    let mut out: Vec<&str> = Vec::new();
    let mut in_list = false;
    for line in text.split('\n') {
        let blank = out
            .last()
            .is_some_and(|prev| needs_blank_between(prev, line, in_list));
        if blank {
            out.push("");
        }
        in_list = continues_list(in_list, line);
        out.push(line);
    }
    out.join("\n")
}

fn needs_blank_between(prev: &str, line: &str, prev_in_list: bool) -> bool {
    if prev.is_empty() || line.is_empty() {
        return false;
    }
    is_heading_line(prev) || is_heading_line(line) || (is_list_line(line) && !prev_in_list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, Inline};
    use crate::serialize::serialize;

    #[test]
    fn test_decodes_entities() {
        assert_eq!(
            normalize("a &amp; b &mdash; &#x4e2d;&#25991; &ldquo;q&rdquo;"),
            "a & b \u{2014} 中文 \u{201C}q\u{201D}"
        );
    }

    #[test]
    fn test_double_escaped_entities_settle() {
        assert_eq!(normalize("&amp;lt;b&amp;gt;x"), "x");
        assert_eq!(normalize("&amp;amp;"), "&");
    }

    #[test]
    fn test_unknown_entity_kept() {
        assert_eq!(normalize("&bogus; &#96;"), "&bogus; &#96;");
    }

    #[test]
    fn test_strips_tags() {
        assert_eq!(normalize("a <span>b</span> <!-- c --> d"), "a b  d");
        assert_eq!(normalize("1 < 2 and 3 > 2"), "1 < 2 and 3 > 2");
    }

    #[test]
    fn test_collapses_star_runs() {
        assert_eq!(normalize("***bold***"), "**bold**");
    }

    #[test]
    fn test_trims_lines() {
        assert_eq!(normalize("  a  \n\u{a0}b\t"), "a\nb");
    }

    #[test]
    fn test_keeps_list_indentation() {
        assert_eq!(normalize("- a\n  - b\n     1. c"), "- a\n  - b\n     1. c");
    }

    #[test]
    fn test_keeps_item_continuation_indentation() {
        let input = "- a\n  ```\n  x\n\n    y\n  ```\n- b\n\n  more\n\nafter";
        assert_eq!(normalize(input), input);
        assert_eq!(normalize("1.\n   - x\n   - y"), "1.\n   - x\n   - y");
        assert_eq!(normalize("-\n  > q\n  after"), "-\n  > q\n  after");
    }

    #[test]
    fn test_indented_fence_outside_list() {
        assert_eq!(normalize("text\n  ```\n  <b>\n  ```"), "text\n```\n<b>\n```");
    }

    #[test]
    fn test_collapses_blank_lines() {
        assert_eq!(normalize("a\n\n\n\n\n\nb\n\n\nc"), "a\n\nb\n\nc");
    }

    #[test]
    fn test_headings_get_blank_lines() {
        assert_eq!(normalize("intro\n## Title\nbody"), "intro\n\n## Title\n\nbody");
    }

    #[test]
    fn test_list_separated_from_text() {
        assert_eq!(normalize("intro\n- a\n- b\nafter"), "intro\n\n- a\n- b\nafter");
    }

    #[test]
    fn test_fence_untouched() {
        let input = "text &amp;\n```html\n<b>&amp;</b>   \n\n\n\n```\nmore";
        assert_eq!(normalize(input), "text &\n```html\n<b>&amp;</b>   \n\n\n\n```\nmore");
    }

    #[test]
    fn test_code_span_untouched() {
        assert_eq!(normalize("use `<br>` and `&amp;`"), "use `<br>` and `&amp;`");
        assert_eq!(normalize("a ``x ` y`` b <i>"), "a ``x ` y`` b");
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        assert_eq!(normalize("a\n```\n<b>  "), "a\n```\n<b>");
    }

    #[test]
    fn test_quoted_fence_untouched() {
        let input = "> ```\n> &amp;\n>\n> ```";
        assert_eq!(normalize(input), input);
    }

    #[test]
    fn test_crlf() {
        assert_eq!(normalize("a\r\nb"), "a\nb");
    }

    #[test]
    fn test_forged_tokens_are_stripped() {
        assert_eq!(normalize("a\u{E000}0\u{E001}b"), "a0b");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "intro\n## Title\nbody &amp;amp; <b>x</b>",
            "- a\n  - b\ntext\n\n\n\n1. x",
            "> quote\n>\n> more\n```\ncode &lt;\n```",
            "***a*** &#x2a;&#x2a;&#x2a;",
            "- a\n  ```\n  x\n\n   y\n ```\n  z\n\n\n\n\n  w",
            "> - a\n>   ```\n>   q\n>\n>   ```\n\n   ```\n x",
        ];
        for input in inputs {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "input: {input:?}");
        }
    }

    #[test]
    fn test_markup_code_survives_normalization() {
        let block = Block::Document(vec![
            Block::Paragraph(vec![
                Inline::Text("call ".to_string()),
                Inline::Code("a &amp; <b>".to_string()),
            ]),
            Block::CodeBlock {
                language: None,
                code: "x  \n\n\n\n***y***".to_string(),
            },
        ]);
        assert_eq!(
            normalize_markup(serialize(&block)).unwrap(),
            "call `a &amp; <b>`\n\n```\nx  \n\n\n\n***y***\n```"
        );
    }

    #[test]
    fn test_markup_quoted_code_block() {
        let block = Block::BlockQuote(vec![Block::CodeBlock {
            language: Some("sh".to_string()),
            code: "ls\n\npwd".to_string(),
        }]);
        let once = normalize_markup(serialize(&block)).unwrap();
        assert_eq!(once, "> ```sh\n> ls\n>\n> pwd\n> ```");
        assert_eq!(normalize(&once), once);
    }
}
