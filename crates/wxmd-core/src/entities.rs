//! HTML character references understood by the normalizer

use crate::verbatim::{SENTINEL_CLOSE, SENTINEL_OPEN};

/// Named entities decoded by the normalizer, without `&` and `;`
pub const NAMED_ENTITIES: &[(&str, &str)] = &[
    ("nbsp", " "),
    ("lt", "<"),
    ("gt", ">"),
    ("amp", "&"),
    ("quot", "\""),
    ("apos", "'"),
    ("ldquo", "\u{201C}"),
    ("rdquo", "\u{201D}"),
    ("lsquo", "\u{2018}"),
    ("rsquo", "\u{2019}"),
    ("sbquo", "\u{201A}"),
    ("bdquo", "\u{201E}"),
    ("mdash", "\u{2014}"),
    ("ndash", "\u{2013}"),
    ("hellip", "\u{2026}"),
    ("laquo", "\u{AB}"),
    ("raquo", "\u{BB}"),
    ("middot", "\u{B7}"),
    ("bull", "\u{2022}"),
    ("copy", "\u{A9}"),
    ("reg", "\u{AE}"),
    ("trade", "\u{2122}"),
];

/// Look up a named entity (case-sensitive)
pub fn lookup_named(name: &str) -> Option<&'static str> {
    NAMED_ENTITIES
        .iter()
        .find(|(entity, _)| *entity == name)
        .map(|(_, value)| *value)
}

/// Decode the body of a numeric reference such as `#8212` or `#x2014`.
///
/// Control characters, backticks and placeholder sentinels are refused so a
/// decoded reference can never change code-span pairing or forge a token.
pub fn decode_numeric(body: &str) -> Option<char> {
    let digits = body.strip_prefix('#')?;
    let code = match digits.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<u32>().ok()?,
    };

    char::from_u32(code)
        .filter(|c| !c.is_control() && *c != '`' && *c != SENTINEL_OPEN && *c != SENTINEL_CLOSE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named() {
        assert_eq!(lookup_named("mdash"), Some("\u{2014}"));
        assert_eq!(lookup_named("nbsp"), Some(" "));
        assert_eq!(lookup_named("AMP"), None);
        assert_eq!(lookup_named("bogus"), None);
    }

    #[test]
    fn test_numeric() {
        assert_eq!(decode_numeric("#65"), Some('A'));
        assert_eq!(decode_numeric("#x4e2d"), Some('中'));
        assert_eq!(decode_numeric("#X41"), Some('A'));
    }

    #[test]
    fn test_numeric_refusals() {
        assert_eq!(decode_numeric("#96"), None);
        assert_eq!(decode_numeric("#0"), None);
        assert_eq!(decode_numeric("#xD800"), None);
        assert_eq!(decode_numeric("#xE000"), None);
        assert_eq!(decode_numeric("#99999999"), None);
        assert_eq!(decode_numeric("65"), None);
    }
}
