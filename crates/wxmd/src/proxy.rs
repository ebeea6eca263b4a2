//! Image proxy rewriting.
//!
//! WeChat image hosts refuse hotlinked requests, so image sources are routed
//! through a fetch endpoint by default.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// Default proxy endpoint; the encoded source URL is appended to it
pub const DEFAULT_PROXY_ENDPOINT: &str = "https://image.baidu.com/search/down?thumburl=";

/// Custom URL builder for image sources
pub type ProxyFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

static PLACEHOLDER_FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|/)(?:spacer|blank|pixel|placeholder|loading)\.(?:gif|png|svg)(?:[?#].*)?$")
        .expect("placeholder regex is valid")
});

/// How image sources are rewritten
#[derive(Clone)]
pub enum ImageProxy {
    /// Prefix absolute sources with this endpoint, URL-encoding the source
    Endpoint(String),
    /// Build the URL with a caller-supplied function
    Custom(ProxyFn),
    /// Leave sources untouched
    Off,
}

impl ImageProxy {
    pub fn endpoint(base: impl Into<String>) -> Self {
        ImageProxy::Endpoint(base.into())
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        ImageProxy::Custom(Arc::new(f))
    }
}

impl Default for ImageProxy {
    fn default() -> Self {
        ImageProxy::Endpoint(DEFAULT_PROXY_ENDPOINT.to_string())
    }
}

impl fmt::Debug for ImageProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageProxy::Endpoint(base) => f.debug_tuple("Endpoint").field(base).finish(),
            ImageProxy::Custom(_) => f.write_str("Custom(..)"),
            ImageProxy::Off => f.write_str("Off"),
        }
    }
}

/// Rewrite an image source according to the proxy policy.
///
/// Returns `None` for sources that cannot be shown: empty values, `data:`
/// URIs and lazy-loading placeholders.
pub fn rewrite_image_src(src: &str, proxy: &ImageProxy) -> Option<String> {
    let src = src.trim();
    if is_unusable_source(src) {
        return None;
    }

    let src = match src.strip_prefix("//") {
        Some(rest) => format!("https://{rest}"),
        None => src.to_string(),
    };

    let rewritten = match proxy {
        ImageProxy::Endpoint(base) => {
            if !is_absolute_http(&src) || is_already_proxied(&src, base) {
                src
            } else {
                format!("{base}{}", urlencoding::encode(&src))
            }
        }
        ImageProxy::Custom(build) => build(&src),
        ImageProxy::Off => src,
    };

    Some(rewritten)
}

fn is_unusable_source(src: &str) -> bool {
    src.is_empty()
        || src == "#"
        || src.eq_ignore_ascii_case("about:blank")
        || src
            .get(..5)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
        || PLACEHOLDER_FILE.is_match(src)
}

fn is_absolute_http(src: &str) -> bool {
    Url::parse(src).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// A source is already proxied when it points at the endpoint's host and path
fn is_already_proxied(src: &str, base: &str) -> bool {
    let (Ok(src), Ok(base)) = (Url::parse(src), Url::parse(base)) else {
        return false;
    };
    src.host_str() == base.host_str() && src.path() == base.path()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_rewrite(src: &str) -> Option<String> {
        rewrite_image_src(src, &ImageProxy::default())
    }

    #[test]
    fn test_absolute_source_is_proxied() {
        assert_eq!(
            default_rewrite("http://x/y.png").as_deref(),
            Some("https://image.baidu.com/search/down?thumburl=http%3A%2F%2Fx%2Fy.png")
        );
    }

    #[test]
    fn test_protocol_relative_becomes_https() {
        assert_eq!(
            rewrite_image_src("//mmbiz.qpic.cn/a.jpg", &ImageProxy::Off).as_deref(),
            Some("https://mmbiz.qpic.cn/a.jpg")
        );
        assert_eq!(
            default_rewrite("//mmbiz.qpic.cn/a.jpg").as_deref(),
            Some(
                "https://image.baidu.com/search/down?thumburl=https%3A%2F%2Fmmbiz.qpic.cn%2Fa.jpg"
            )
        );
    }

    #[test]
    fn test_already_proxied_is_unchanged() {
        let src = "https://image.baidu.com/search/down?thumburl=http%3A%2F%2Fx%2Fy.png";
        assert_eq!(default_rewrite(src).as_deref(), Some(src));
    }

    #[test]
    fn test_proxy_word_is_not_special() {
        assert_eq!(
            default_rewrite("https://proxy.example.com/a.png").as_deref(),
            Some(
                "https://image.baidu.com/search/down?thumburl=https%3A%2F%2Fproxy.example.com%2Fa.png"
            )
        );
    }

    #[test]
    fn test_relative_source_is_unchanged() {
        assert_eq!(default_rewrite("images/a.png").as_deref(), Some("images/a.png"));
    }

    #[test]
    fn test_unusable_sources() {
        assert_eq!(default_rewrite(""), None);
        assert_eq!(default_rewrite("  "), None);
        assert_eq!(default_rewrite("#"), None);
        assert_eq!(default_rewrite("about:blank"), None);
        assert_eq!(default_rewrite("data:image/png;base64,AAAA"), None);
        assert_eq!(default_rewrite("DATA:image/gif;base64,R0"), None);
        assert_eq!(default_rewrite("https://res.wx.qq.com/img/loading.gif"), None);
        assert_eq!(default_rewrite("/static/spacer.GIF?v=2"), None);
    }

    #[test]
    fn test_custom_proxy() {
        let proxy = ImageProxy::custom(|src| format!("https://cdn.test/fetch?u={src}"));
        assert_eq!(
            rewrite_image_src("http://x/y.png", &proxy).as_deref(),
            Some("https://cdn.test/fetch?u=http://x/y.png")
        );
    }

    #[test]
    fn test_off() {
        assert_eq!(
            rewrite_image_src("http://x/y.png", &ImageProxy::Off).as_deref(),
            Some("http://x/y.png")
        );
    }

    #[test]
    fn test_debug() {
        assert_eq!(format!("{:?}", ImageProxy::Off), "Off");
        assert_eq!(format!("{:?}", ImageProxy::custom(|s| s.to_string())), "Custom(..)");
    }
}
