//! Google organic results via a rendered results page
//!
//! The page is loaded through a [`PageRenderer`], checked for anti-automation
//! interstitials, and then mined for `<a href><h3>title</h3></a>` result
//! blocks. The whole render-and-parse runs on a spawned task under a hard
//! wall-clock limit; on expiry the task is aborted and the fetch reports
//! `google_search_timeout`.

use super::renderer::{decode_entities, html_to_text, PageRenderer, RenderedPage};
use super::{SearchEngine, SearchResultItem};
use crate::config::SearchConfig;
use crate::error::{BlockReason, SearchError};
use crate::logging::{log_debug, log_warn};
use crate::mention::normalize_domain;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const MAX_RESULTS: usize = 10;
const MAX_SNIPPET_CHARS: usize = 600;

const BLOCK_TEXT_MARKERS: [&str; 6] = [
    "unusual traffic",
    "detected unusual traffic",
    "i'm not a robot",
    "our systems have detected",
    "enable javascript",
    "before you continue",
];

static CAPTCHA_MARKUP: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)<iframe\b[^>]*\bsrc=["'][^"']*recaptcha"#,
        r#"(?i)<input\b[^>]*\bname=["']captcha["']"#,
        r#"(?i)<form\b[^>]*\baction=["'][^"']*sorry"#,
    ]
    .into_iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static RESULT_ANCHOR: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"(?is)<a\b[^>]*?\bhref="([^"]*)"[^>]*>(.*?)</a>"#).ok());
static HEADING: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?is)<h3\b[^>]*>(.*?)</h3>").ok());
static SNIPPET: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(
        r#"(?is)<(?:div|span)\b[^>]*\bclass="[^"]*\b(?:VwiC3b|yXK7lf|IsZvec|MUxGbd)\b[^"]*"[^>]*>(.*?)</div>"#,
    )
    .ok()
});

/// One candidate block before link cleanup
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResult {
    pub title: String,
    pub href: String,
    pub snippet: String,
}

/// Anti-automation interstitial on the page, if any.
pub fn detect_block(page: &RenderedPage) -> Option<BlockReason> {
    let final_url = page.final_url.to_lowercase();
    if final_url.contains("/sorry/") {
        return Some(BlockReason::AutomationBlocked);
    }
    if final_url.contains("consent.google.") {
        return Some(BlockReason::ConsentInterstitial);
    }

    if CAPTCHA_MARKUP.iter().any(|re| re.is_match(&page.html)) {
        return Some(BlockReason::AutomationBlocked);
    }

    let body_text = page.body_text.to_lowercase();
    if BLOCK_TEXT_MARKERS
        .iter()
        .any(|marker| body_text.contains(marker))
    {
        return Some(BlockReason::AutomationBlocked);
    }

    None
}

/// Result blocks in page order: every anchor wrapping an `<h3>`, with the
/// first snippet container between it and the next result.
pub fn collect_raw_results(html: &str, limit: usize) -> Vec<RawResult> {
    let (Some(anchor), Some(heading)) = (RESULT_ANCHOR.as_ref(), HEADING.as_ref()) else {
        return Vec::new();
    };
    let max_rows = (limit * 4).max(40);

    let blocks: Vec<(usize, usize, String, String)> = anchor
        .captures_iter(html)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let href = caps.get(1)?.as_str();
            let inner = caps.get(2)?.as_str();
            let title = heading.captures(inner)?.get(1)?.as_str();
            Some((whole.start(), whole.end(), href.to_string(), html_to_text(title)))
        })
        .filter(|(_, _, _, title)| !title.is_empty())
        .take(max_rows)
        .collect();

    blocks
        .iter()
        .enumerate()
        .map(|(index, (_, end, href, title))| {
            let next_start = blocks
                .get(index + 1)
                .map(|(start, _, _, _)| *start)
                .unwrap_or(html.len());
            let snippet = SNIPPET
                .as_ref()
                .and_then(|re| re.captures(&html[*end..next_start]))
                .and_then(|caps| caps.get(1))
                .map(|m| html_to_text(m.as_str()))
                .unwrap_or_default();
            RawResult {
                title: title.clone(),
                href: decode_entities(href),
                snippet,
            }
        })
        .collect()
}

/// Outbound destination of a result href, unwrapping `/url?q=` redirects.
pub fn extract_google_link(href: &str) -> Option<String> {
    let candidate = href.trim();
    if candidate.starts_with("http://") || candidate.starts_with("https://") {
        return Some(candidate.to_string());
    }

    if candidate.starts_with("/url?") {
        let parsed = reqwest::Url::parse(&format!("https://www.google.com{candidate}")).ok()?;
        let outbound = parsed
            .query_pairs()
            .find(|(key, _)| key == "q")
            .map(|(_, value)| value.trim().to_string())?;
        if outbound.starts_with("http://") || outbound.starts_with("https://") {
            return Some(outbound);
        }
    }

    None
}

fn is_google_internal_link(link: &str) -> bool {
    let domain = normalize_domain(link);
    !domain.is_empty() && domain.contains("google.")
}

/// Clean raw blocks into result rows: outbound links only, no Google-internal
/// links, no duplicates, no blank titles, bounded snippets.
pub fn parse_google_results(raw_items: &[RawResult], limit: usize) -> Vec<SearchResultItem> {
    let mut rows = Vec::new();
    let mut seen_links = HashSet::new();

    for item in raw_items {
        let Some(link) = extract_google_link(&item.href) else {
            continue;
        };
        if is_google_internal_link(&link) || seen_links.contains(&link) {
            continue;
        }
        let title = item.title.trim();
        if title.is_empty() {
            continue;
        }

        rows.push(SearchResultItem {
            title: title.to_string(),
            link: link.clone(),
            snippet: item.snippet.trim().chars().take(MAX_SNIPPET_CHARS).collect(),
        });
        seen_links.insert(link);

        if rows.len() >= limit {
            break;
        }
    }

    rows
}

/// Scrapes Google through a [`PageRenderer`].
#[derive(Clone)]
pub struct GoogleScrapeEngine {
    renderer: Arc<dyn PageRenderer>,
    base_url: String,
    hard_timeout: Duration,
    page_load_timeout: Duration,
}

impl std::fmt::Debug for GoogleScrapeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleScrapeEngine")
            .field("base_url", &self.base_url)
            .field("hard_timeout", &self.hard_timeout)
            .field("page_load_timeout", &self.page_load_timeout)
            .finish_non_exhaustive()
    }
}

impl GoogleScrapeEngine {
    pub fn new(renderer: Arc<dyn PageRenderer>, config: &SearchConfig) -> Self {
        Self {
            renderer,
            base_url: config.google_base_url.clone(),
            hard_timeout: config.google_timeout,
            page_load_timeout: config.google_page_load_timeout,
        }
    }

    fn search_url(&self, query: &str, limit: usize) -> Result<reqwest::Url, SearchError> {
        let limit = limit.to_string();
        reqwest::Url::parse_with_params(
            &format!("{}/search", self.base_url),
            &[
                ("q", query),
                ("num", limit.as_str()),
                ("hl", "en"),
                ("gl", "us"),
                ("pws", "0"),
            ],
        )
        .map_err(|e| SearchError::Render {
            message: format!("invalid search url: {e}"),
        })
    }
}

#[async_trait::async_trait]
impl SearchEngine for GoogleScrapeEngine {
    fn name(&self) -> &'static str {
        "google"
    }

    fn requires_api_key(&self) -> bool {
        false
    }

    async fn fetch(&self, query: &str, limit: usize) -> Result<Vec<SearchResultItem>, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let target_limit = limit.clamp(1, MAX_RESULTS);
        let url = self.search_url(query, target_limit)?;
        let renderer = Arc::clone(&self.renderer);
        let page_load_timeout = self.page_load_timeout;

        let mut worker = tokio::spawn(async move {
            let page = renderer.render(url.as_str(), page_load_timeout).await?;
            if let Some(reason) = detect_block(&page) {
                log_warn!(
                    engine = "google",
                    reason = reason.as_str(),
                    "Google crawler blocked by anti-bot interstitial"
                );
                return Err(SearchError::Blocked { reason });
            }
            let raw = collect_raw_results(&page.html, target_limit);
            log_debug!(engine = "google", raw_blocks = raw.len(), "Google result blocks collected");
            Ok(parse_google_results(&raw, target_limit))
        });

        match tokio::time::timeout(self.hard_timeout, &mut worker).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => Err(SearchError::Render {
                message: format!("render worker failed: {join_error}"),
            }),
            Err(_) => {
                worker.abort();
                log_warn!(
                    engine = "google",
                    timeout_seconds = self.hard_timeout.as_secs(),
                    "Google search exceeded hard timeout, worker aborted"
                );
                Err(SearchError::Timeout)
            }
        }
    }
}
