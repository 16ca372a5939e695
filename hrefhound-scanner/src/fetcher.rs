use crate::config::BlockPolicy;
use crate::error::{FetchError, Result};
use async_trait::async_trait;
use reqwest::{Client, redirect};
use scraper::{ElementRef, Html, Node, Selector};
use std::time::Duration;
use tracing::debug;
use url::Url;

const MAX_REDIRECTS: usize = 10;
const HIDDEN_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];
/// Leading tags that mark an unlabelled body as HTML, as browsers sniff it.
const HTML_SNIFF_TAGS: [&str; 17] = [
    "<!doctype html",
    "<html",
    "<head",
    "<script",
    "<iframe",
    "<h1",
    "<div",
    "<font",
    "<table",
    "<a",
    "<style",
    "<title",
    "<b",
    "<body",
    "<br",
    "<p",
    "<!--",
];

/// When a navigation is considered finished.
///
/// Only meaningful to fetchers that run page scripts. [`HttpFetcher`] has
/// nothing left to wait for once the body is read and treats both alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    /// The document is parsed; late async content may still be loading.
    #[default]
    DomContentLoaded,
    /// No network activity for a short window.
    NetworkIdle,
}

#[derive(Debug, Clone)]
pub struct NavigateOptions {
    pub timeout: Duration,
    pub readiness: Readiness,
}

impl NavigateOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            readiness: Readiness::default(),
        }
    }
}

/// What a fetcher saw after loading a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSnapshot {
    pub status: Option<u16>,
    /// Visible text of the rendered page.
    pub text: String,
    /// Absolute anchor targets in document order, fragments intact.
    pub hrefs: Vec<String>,
}

/// A page handle that can load one URL at a time.
///
/// `Ok(None)` means the navigation produced no response at all.
/// Implementations without a script runtime may ignore
/// [`NavigateOptions::readiness`].
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn navigate(
        &self,
        url: &str,
        options: &NavigateOptions,
    ) -> std::result::Result<Option<PageSnapshot>, FetchError>;
}

/// Static HTML fetcher backed by reqwest and scraper.
///
/// Does not execute scripts; pages that render their content client-side
/// are classified from their server-delivered markup.
pub struct HttpFetcher {
    client: Client,
    policy: BlockPolicy,
}

impl HttpFetcher {
    pub fn new(policy: BlockPolicy, user_agent: &str) -> Result<Self> {
        let redirect_policy = {
            let policy = policy.clone();
            redirect::Policy::custom(move |attempt| {
                if policy.should_block(attempt.url().as_str()) {
                    attempt.stop()
                } else if attempt.previous().len() >= MAX_REDIRECTS {
                    attempt.error("too many redirects")
                } else {
                    attempt.follow()
                }
            })
        };

        let client = Client::builder()
            .user_agent(user_agent)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(redirect_policy)
            .build()?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &BlockPolicy {
        &self.policy
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn navigate(
        &self,
        url: &str,
        options: &NavigateOptions,
    ) -> std::result::Result<Option<PageSnapshot>, FetchError> {
        if self.policy.should_block(url) {
            return Err(FetchError::Aborted(url.to_string()));
        }

        let target = Url::parse(url)
            .map_err(|e| FetchError::Transport(format!("invalid URL {}: {}", url, e)))?;
        if !matches!(target.scheme(), "http" | "https") {
            return Ok(None);
        }

        debug!("Navigating to {} (wait until {:?})", url, options.readiness);

        let response = self
            .client
            .get(target)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, options.timeout))?;

        let status = response.status();
        let final_url = response.url().clone();

        // A redirect we refused to follow points at a blocked download.
        if status.is_redirection()
            && let Some(location) = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|loc| final_url.join(loc).ok())
            && self.policy.should_block(location.as_str())
        {
            return Err(FetchError::Aborted(location.to_string()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_lowercase())
            .unwrap_or_default();

        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(e, options.timeout))?;

        let mut snapshot = PageSnapshot {
            status: Some(status.as_u16()),
            ..Default::default()
        };

        let is_html = if content_type.is_empty() {
            sniff_html(&body)
        } else {
            content_type.contains("html")
        };

        if is_html {
            let (text, hrefs) = extract_page(&body, &final_url)?;
            snapshot.text = text;
            snapshot.hrefs = hrefs;
        } else if content_type.starts_with("text/") {
            snapshot.text = collapse_whitespace(&body);
        }

        Ok(Some(snapshot))
    }
}

/// Pulls visible text and resolved anchor targets out of an HTML document.
pub fn extract_page(
    html: &str,
    base: &Url,
) -> std::result::Result<(String, Vec<String>), FetchError> {
    let document = Html::parse_document(html);
    let body_selector =
        Selector::parse("body").map_err(|e| FetchError::Evaluation(e.to_string()))?;
    let link_selector =
        Selector::parse("a[href]").map_err(|e| FetchError::Evaluation(e.to_string()))?;

    let text = document
        .select(&body_selector)
        .next()
        .map(visible_text)
        .unwrap_or_default();

    let hrefs = document
        .select(&link_selector)
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| base.join(href.trim()).ok())
        .map(|url| url.to_string())
        .collect();

    Ok((text, hrefs))
}

/// True when a body sent without a Content-Type starts like an HTML document.
pub fn sniff_html(body: &str) -> bool {
    let head: String = body
        .trim_start()
        .chars()
        .take(16)
        .collect::<String>()
        .to_lowercase();
    HTML_SNIFF_TAGS.iter().any(|tag| {
        head.strip_prefix(tag).is_some_and(|rest| {
            *tag == "<!--" || rest.is_empty() || rest.starts_with([' ', '>', '\t', '\n', '\r'])
        })
    })
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut pieces = Vec::new();
    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            pieces.push(&**text);
        }
    }
    collapse_whitespace(&pieces.join(" "))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
