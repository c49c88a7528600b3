//! Page rendering seam for scrape-based engines
//!
//! A headless browser lives outside this crate; embedders plug one in by
//! implementing [`PageRenderer`]. [`HttpPageRenderer`] is a plain HTTP fetch
//! that works for markup served without client-side rendering.

use crate::error::SearchError;
use crate::logging::log_debug;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use std::time::Duration;

pub const DESKTOP_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Snapshot of a loaded page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    /// URL after redirects
    pub final_url: String,
    pub html: String,
    /// Visible text of `<body>`
    pub body_text: String,
}

impl RenderedPage {
    /// Build a page from raw markup, deriving `body_text`.
    pub fn from_html(final_url: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let body_text = html_to_text(body_markup(&html));
        Self {
            final_url: final_url.into(),
            html,
            body_text,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PageRenderer: Send + Sync {
    /// Load `url`, giving up after `page_load_timeout`.
    async fn render(&self, url: &str, page_load_timeout: Duration)
        -> Result<RenderedPage, SearchError>;
}

/// Fetches markup over HTTP with a desktop browser identity.
#[derive(Debug, Clone, Default)]
pub struct HttpPageRenderer {
    client: reqwest::Client,
}

impl HttpPageRenderer {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(DESKTOP_USER_AGENT));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers
    }
}

#[async_trait::async_trait]
impl PageRenderer for HttpPageRenderer {
    async fn render(
        &self,
        url: &str,
        page_load_timeout: Duration,
    ) -> Result<RenderedPage, SearchError> {
        let response = self
            .client
            .get(url)
            .headers(Self::headers())
            .timeout(page_load_timeout)
            .send()
            .await
            .map_err(render_error)?;

        // interstitials arrive with 4xx statuses and still need inspecting
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let html = response.text().await.map_err(render_error)?;

        log_debug!(
            status = status,
            html_bytes = html.len(),
            "Search page rendered"
        );

        Ok(RenderedPage::from_html(final_url, html))
    }
}

fn render_error(error: reqwest::Error) -> SearchError {
    if error.is_timeout() {
        return SearchError::Timeout;
    }
    SearchError::Render {
        message: error.without_url().to_string(),
    }
}

static BODY: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)</body>").ok());
static NON_VISIBLE: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script>|<style\b[^>]*>.*?</style>|<!--.*?-->").ok()
});
static TAG: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").ok());
static WHITESPACE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\s+").ok());

fn body_markup(html: &str) -> &str {
    BODY.as_ref()
        .and_then(|re| re.captures(html))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(html)
}

/// Visible text of a markup fragment: scripts/styles dropped, tags removed,
/// common entities decoded, whitespace collapsed.
pub fn html_to_text(markup: &str) -> String {
    let mut text = markup.to_string();
    for pattern in [&NON_VISIBLE, &TAG] {
        if let Some(re) = pattern.as_ref() {
            text = re.replace_all(&text, " ").into_owned();
        }
    }
    let text = decode_entities(&text);
    match WHITESPACE.as_ref() {
        Some(re) => re.replace_all(&text, " ").trim().to_string(),
        None => text.trim().to_string(),
    }
}

/// Decode the handful of entities that show up in result titles and links.
pub fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
