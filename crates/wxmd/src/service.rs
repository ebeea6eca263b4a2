//! Transcoder - the main entry point for HTML to Markdown conversion.

use std::panic::{self, AssertUnwindSafe};

use wxmd_core::{normalize_markup, serialize};

use crate::convert::{to_document, ConvertContext};
use crate::fallback::fallback_convert;
use crate::html::{parse_html, DEFAULT_MAX_DEPTH};
use crate::media::MediaExtractor;
use crate::proxy::ImageProxy;
use crate::rules::{MediaRule, MediaRules};
use crate::sanitize::sanitize;
use crate::{Result, TranscodeError};

/// Options for Transcoder
#[derive(Debug, Clone)]
pub struct TranscodeOptions {
    /// How image sources are rewritten
    pub image_proxy: ImageProxy,

    /// Alt text for images without one
    pub default_image_alt: String,

    /// Deepest element nesting accepted before falling back
    pub max_depth: usize,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            image_proxy: ImageProxy::default(),
            default_image_alt: "image".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// The main service for converting article HTML to Markdown
pub struct Transcoder {
    options: TranscodeOptions,
    rules: MediaRules,
}

impl Transcoder {
    /// Create a new Transcoder with default options
    pub fn new() -> Self {
        Self::with_options(TranscodeOptions::default())
    }

    /// Create a Transcoder with custom options
    pub fn with_options(options: TranscodeOptions) -> Self {
        Self {
            options,
            rules: MediaRules::new(),
        }
    }

    /// Convert HTML to Markdown.
    ///
    /// Never fails: if the pipeline errors or panics, the degraded plain-text
    /// conversion is returned instead.
    pub fn convert(&self, html: &str) -> String {
        match self.try_convert(html) {
            Ok(markdown) => markdown,
            Err(err) => {
                tracing::warn!(error = %err, "conversion failed, using degraded fallback");
                fallback_convert(html)
            }
        }
    }

    /// Convert HTML to Markdown, reporting pipeline failures
    pub fn try_convert(&self, html: &str) -> Result<String> {
        panic::catch_unwind(AssertUnwindSafe(|| self.run_pipeline(html)))
            .unwrap_or(Err(TranscodeError::Panicked))
    }

    fn run_pipeline(&self, html: &str) -> Result<String> {
        let tree = parse_html(html, self.options.max_depth)?;
        let tree = sanitize(&tree);
        let tree = MediaExtractor::new(&self.rules).extract(&tree);

        let context = ConvertContext {
            image_proxy: &self.options.image_proxy,
            default_image_alt: &self.options.default_image_alt,
        };
        let document = to_document(&tree, &context);

        let markup = serialize(&document);
        tracing::debug!(
            serialized = markup.text.len(),
            placeholders = markup.verbatim.len(),
            "serialized document"
        );

        let markdown = normalize_markup(markup)?;
        tracing::debug!(input = html.len(), output = markdown.len(), "converted html");
        Ok(markdown)
    }

    /// Add a multimedia rule, consulted before the built-in ones
    pub fn add_media_rule(&mut self, key: &str, rule: MediaRule) -> &mut Self {
        self.rules.add(key, rule);
        self
    }

    /// Get the current options
    pub fn options(&self) -> &TranscodeOptions {
        &self.options
    }

    /// Get mutable access to options
    pub fn options_mut(&mut self) -> &mut TranscodeOptions {
        &mut self.options
    }
}

impl Default for Transcoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{MediaKind, MediaSummary};

    #[test]
    fn test_simple_paragraph() {
        let transcoder = Transcoder::new();
        assert_eq!(transcoder.convert("<p>Hello World</p>"), "Hello World");
    }

    #[test]
    fn test_empty_input() {
        let transcoder = Transcoder::new();
        assert_eq!(transcoder.convert(""), "");
        assert_eq!(transcoder.convert("   \n"), "");
    }

    #[test]
    fn test_options_mut() {
        let mut transcoder = Transcoder::new();
        transcoder.options_mut().default_image_alt = "picture".to_string();
        transcoder.options_mut().image_proxy = ImageProxy::Off;
        assert_eq!(transcoder.options().default_image_alt, "picture");
        assert_eq!(
            transcoder.convert(r#"<img src="https://x/y.png">"#),
            "![picture](https://x/y.png)"
        );
    }

    #[test]
    fn test_nesting_limit_uses_fallback() {
        let transcoder = Transcoder::with_options(TranscodeOptions {
            max_depth: 8,
            ..TranscodeOptions::default()
        });
        let html = "<div>".repeat(12) + "<b>deep</b> &amp; text" + &"</div>".repeat(12);
        assert!(matches!(
            transcoder.try_convert(&html),
            Err(TranscodeError::NestingTooDeep { limit: 8 })
        ));
        assert_eq!(transcoder.convert(&html), "deep & text");
    }

    #[test]
    fn test_panicking_rule_uses_fallback() {
        let mut transcoder = Transcoder::new();
        transcoder.add_media_rule(
            "broken",
            MediaRule::for_tag("mpvoice", |_| panic!("rule failure")),
        );
        let html = "<p>keep</p><mpvoice name=\"x\"></mpvoice>";
        assert!(matches!(
            transcoder.try_convert(html),
            Err(TranscodeError::Panicked)
        ));
        assert_eq!(transcoder.convert(html), "keep");
    }

    #[test]
    fn test_custom_media_rule() {
        let mut transcoder = Transcoder::new();
        transcoder.add_media_rule(
            "podcast",
            MediaRule::for_tag("podcast-player", |node| {
                Some(
                    MediaSummary::new(MediaKind::Audio)
                        .with_title(node.attr("episode"))
                        .with_url(node.attr("feed")),
                )
            }),
        );
        assert_eq!(
            transcoder.convert(
                r#"<podcast-player episode="Ep 1" feed="https://pod.test/1.mp3"></podcast-player>"#
            ),
            "**Audio:** Ep 1 [Listen](https://pod.test/1.mp3)"
        );
    }

    #[test]
    fn test_transcoder_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Transcoder>();
    }
}
