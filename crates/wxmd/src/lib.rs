//! # wxmd
//!
//! Convert WeChat official-account article HTML to Markdown.
//!
//! ## Design
//!
//! The HTML is parsed once into an owned node tree, then passed through a
//! sequence of stages, each producing a new value:
//!
//! ```text
//! HTML ─▶ parse ─▶ sanitize ─▶ extract media ─▶ convert ─▶ serialize ─▶ normalize ─▶ Markdown
//! ```
//!
//! Image sources are routed through an image proxy so the Markdown renders
//! outside WeChat. If any stage fails the conversion falls back to plain,
//! tag-free text; [`convert`] always returns a string.
//!
//! ## Example
//!
//! ```rust
//! let markdown = wxmd::convert("<h1>Hello</h1><p>Some <strong>bold</strong> text</p>");
//! assert_eq!(markdown, "# Hello\n\nSome **bold** text");
//! ```
//!
//! ## Example (custom proxy)
//!
//! ```rust
//! use wxmd::{ImageProxy, TranscodeOptions};
//!
//! let options = TranscodeOptions {
//!     image_proxy: ImageProxy::custom(|src| format!("https://img.example/?u={src}")),
//!     ..TranscodeOptions::default()
//! };
//! let markdown = wxmd::convert_with(r#"<img src="http://x/y.png" alt="cat">"#, &options);
//! assert_eq!(markdown, "![cat](https://img.example/?u=http://x/y.png)");
//! ```

pub mod article;
mod convert;
mod fallback;
pub mod html;
mod media;
pub mod node;
mod proxy;
mod rules;
mod sanitize;
mod service;
mod utilities;

pub use article::{extract_article, validate_article_url, Article, ArticleError};
pub use convert::{to_document, ConvertContext};
pub use fallback::fallback_convert;
pub use html::parse_html;
pub use media::{format_duration, MediaExtractor, MediaKind, MediaSummary};
pub use node::{Node, NodeType};
pub use proxy::{rewrite_image_src, ImageProxy, ProxyFn, DEFAULT_PROXY_ENDPOINT};
pub use rules::{DescribeFn, Filter, MediaRule, MediaRules};
pub use sanitize::sanitize;
pub use service::{TranscodeOptions, Transcoder};
pub use wxmd_core::{normalize, VerbatimError};

/// Error type for transcoding operations
#[derive(Debug, thiserror::Error)]
pub enum TranscodeError {
    #[error("element nesting exceeds the limit of {limit}")]
    NestingTooDeep { limit: usize },

    #[error(transparent)]
    Verbatim(#[from] VerbatimError),

    #[error("conversion panicked")]
    Panicked,
}

pub type Result<T> = std::result::Result<T, TranscodeError>;

/// Convert HTML to Markdown with default options
pub fn convert(html: &str) -> String {
    Transcoder::new().convert(html)
}

/// Convert HTML to Markdown with the given options
pub fn convert_with(html: &str, options: &TranscodeOptions) -> String {
    Transcoder::with_options(options.clone()).convert(html)
}
