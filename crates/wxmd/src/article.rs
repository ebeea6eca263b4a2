//! Article extraction from a saved WeChat article page.
//!
//! Fetching the page is left to the caller; this module validates article
//! URLs and picks the body and title out of the page HTML.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

/// Host serving WeChat official-account articles
pub const ARTICLE_HOST: &str = "mp.weixin.qq.com";

macro_rules! sel {
    ($s:expr) => {
        Selector::parse($s).expect(concat!("bad selector: ", $s))
    };
}

static SEL_CONTENT: Lazy<Vec<Selector>> =
    Lazy::new(|| vec![sel!("#js_content"), sel!(".rich_media_content")]);

static SEL_TITLE: Lazy<Vec<Selector>> =
    Lazy::new(|| vec![sel!("#activity-name"), sel!(".rich_media_title")]);

static SEL_OG_TITLE: Lazy<Selector> = Lazy::new(|| sel!(r#"meta[property="og:title"]"#));
static SEL_DOC_TITLE: Lazy<Selector> = Lazy::new(|| sel!("title"));

/// Errors for article URLs
#[derive(Debug, thiserror::Error)]
pub enum ArticleError {
    #[error("invalid article URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("unsupported host {0:?}, expected mp.weixin.qq.com")]
    UnsupportedHost(String),
}

/// Body and title of an article page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Article {
    /// Inner HTML of the article body
    pub content: String,
    pub title: String,
}

/// Check that a URL points at a WeChat article
pub fn validate_article_url(input: &str) -> Result<Url, ArticleError> {
    let url = Url::parse(input.trim())?;
    match url.host_str() {
        Some(host) if host.eq_ignore_ascii_case(ARTICLE_HOST) => Ok(url),
        other => Err(ArticleError::UnsupportedHost(
            other.unwrap_or_default().to_string(),
        )),
    }
}

/// Pick the article body and title out of a full page
pub fn extract_article(page_html: &str) -> Article {
    let document = Html::parse_document(page_html);

    let content = SEL_CONTENT
        .iter()
        .find_map(|selector| document.select(selector).next())
        .map(|element| element.inner_html())
        .unwrap_or_else(|| page_html.to_string());

    let title = SEL_TITLE
        .iter()
        .filter_map(|selector| document.select(selector).next())
        .map(|element| element.text().collect::<String>())
        .chain(
            document
                .select(&SEL_OG_TITLE)
                .filter_map(|element| element.value().attr("content"))
                .map(str::to_string),
        )
        .chain(
            document
                .select(&SEL_DOC_TITLE)
                .map(|element| element.text().collect::<String>()),
        )
        .map(|title| title.trim().to_string())
        .find(|title| !title.is_empty())
        .unwrap_or_default();

    tracing::debug!(
        content = content.len(),
        title = %title,
        "extracted article"
    );

    Article { content, title }
}
