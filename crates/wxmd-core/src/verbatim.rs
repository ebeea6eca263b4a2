//! Verbatim side table
//!
//! Code blocks and code spans must reach the output byte-for-byte, while the
//! normalizer rewrites everything around them. Instead of stitching the code
//! into the text, the serializer stores it here and writes an opaque token
//! (`U+E000 <id> U+E001`) in its place. The normalizer works on the tokenised
//! text and finally calls [`VerbatimTable::restore`].

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// First character of a placeholder token
pub const SENTINEL_OPEN: char = '\u{E000}';
/// Last character of a placeholder token
pub const SENTINEL_CLOSE: char = '\u{E001}';

// A token at the start of an indented or quoted line keeps that prefix in group 1.
static TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)(^[ \t>]+)?\x{E000}([0-9]+)\x{E001}").expect("token regex is valid")
});

/// Errors raised when placeholders and table entries do not line up
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerbatimError {
    #[error("placeholder {0} has no entry in the verbatim table")]
    UnknownPlaceholder(usize),

    #[error("placeholder {id} resolved {count} times, expected exactly once")]
    UnresolvedPlaceholder { id: usize, count: usize },

    #[error("stray placeholder sentinel left in output")]
    StrayPlaceholder,
}

/// A region protected from normalization
#[derive(Debug, Clone, PartialEq)]
pub enum Verbatim {
    /// Fenced code block content
    Fence {
        language: Option<String>,
        code: String,
    },
    /// Inline code content
    Span(String),
    /// Already-rendered Markdown (existing fences and code spans)
    Raw(String),
}

impl Verbatim {
    /// Render the protected region as Markdown
    pub fn render(&self) -> String {
        match self {
            Verbatim::Fence { language, code } => {
                let fence = "`".repeat(longest_backtick_run(code).max(2) + 1);
                format!(
                    "{fence}{}\n{code}\n{fence}",
                    language.as_deref().unwrap_or("")
                )
            }
            Verbatim::Span(code) => {
                let ticks = "`".repeat(longest_backtick_run(code) + 1);
                let pad = if code.starts_with('`') || code.ends_with('`') {
                    " "
                } else {
                    ""
                };
                format!("{ticks}{pad}{code}{pad}{ticks}")
            }
            Verbatim::Raw(text) => text.clone(),
        }
    }
}

/// Table of protected regions, indexed by placeholder id
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerbatimTable {
    entries: Vec<Verbatim>,
}

impl VerbatimTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a region and return the token that stands in for it
    pub fn insert(&mut self, entry: Verbatim) -> String {
        let id = self.entries.len();
        self.entries.push(entry);
        format!("{SENTINEL_OPEN}{id}{SENTINEL_CLOSE}")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every token in `text` with its rendered region.
    ///
    /// Each entry must be referenced exactly once. A block token preceded by
    /// indentation or a quote prefix repeats that prefix on every rendered
    /// line.
    pub fn restore(&self, text: &str) -> Result<String, VerbatimError> {
        let mut counts = vec![0usize; self.entries.len()];
        let mut unknown = None;

        let restored = TOKEN.replace_all(text, |caps: &Captures| {
            let prefix = caps.get(1).map_or("", |m| m.as_str());
            let id = caps[2].parse::<usize>().unwrap_or(usize::MAX);
            match self.entries.get(id) {
                Some(entry) => {
                    counts[id] += 1;
                    prefix_lines(prefix, &entry.render())
                }
                None => {
                    unknown.get_or_insert(id);
                    String::new()
                }
            }
        });

        if let Some(id) = unknown {
            return Err(VerbatimError::UnknownPlaceholder(id));
        }
        if let Some((id, &count)) = counts.iter().enumerate().find(|(_, &count)| count != 1) {
            return Err(VerbatimError::UnresolvedPlaceholder { id, count });
        }
        if has_sentinels(&restored) {
            return Err(VerbatimError::StrayPlaceholder);
        }

        Ok(restored.into_owned())
    }
}

/// Check whether text contains placeholder sentinel characters
pub fn has_sentinels(text: &str) -> bool {
    text.contains(|c| c == SENTINEL_OPEN || c == SENTINEL_CLOSE)
}

/// Remove placeholder sentinel characters so input can never forge a token
pub fn strip_sentinels(text: &str) -> Cow<'_, str> {
    if has_sentinels(text) {
        Cow::Owned(
            text.chars()
                .filter(|&c| c != SENTINEL_OPEN && c != SENTINEL_CLOSE)
                .collect(),
        )
    } else {
        Cow::Borrowed(text)
    }
}

fn prefix_lines(prefix: &str, rendered: &str) -> String {
    if prefix.is_empty() {
        return rendered.to_string();
    }

    rendered
        .split('\n')
        .map(|line| {
            if line.is_empty() {
                prefix.trim_end().to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn longest_backtick_run(s: &str) -> usize {
    s.chars()
        .fold((0, 0), |(max, current), c| {
            if c == '`' {
                (max.max(current + 1), current + 1)
            } else {
                (max, 0)
            }
        })
        .0
}
