//! Page fetcher wrapping reqwest.
//!
//! Sends browser-like GET requests, retries transport failures with a linear
//! backoff, and rejects responses that are not usable HTML pages. A fixed
//! delay follows every successful fetch to throttle the request rate.

use std::time::Duration;

use scraper::{Html, Selector};
use tracing::{error, info, warn};

use crate::types::{HarvestError, HarvestResult};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                          AppleWebKit/537.36 (KHTML, like Gecko) \
                          Chrome/120.0.0.0 Safari/537.36";

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,\
                      image/avif,image/webp,image/apng,*/*;q=0.8";

/// A fetched page that passed content validation.
///
/// Holds raw HTML rather than a parsed tree so it can cross await points;
/// call [`Document::parse`] inside synchronous code.
#[derive(Debug, Clone)]
pub struct Document {
    /// Requested URL.
    pub url: String,
    /// URL after redirects.
    pub final_url: String,
    pub html: String,
}

impl Document {
    pub fn parse(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

/// Delay before attempt `attempt` (1-based): `base * (attempt - 1)`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base * attempt.saturating_sub(1)
}

/// HTTP client for question pages.
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Fetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> HarvestResult<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static(ACCEPT),
        );
        headers.insert(
            reqwest::header::ACCEPT_LANGUAGE,
            reqwest::header::HeaderValue::from_static("en-US,en;q=0.9"),
        );
        headers.insert(
            reqwest::header::UPGRADE_INSECURE_REQUESTS,
            reqwest::header::HeaderValue::from_static("1"),
        );
        headers.insert(
            reqwest::header::CACHE_CONTROL,
            reqwest::header::HeaderValue::from_static("max-age=0"),
        );

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()
            .map_err(|e| HarvestError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client })
    }

    /// Fetch `url`, making up to `max_retries` attempts in total.
    ///
    /// Transport errors, timeouts and non-success statuses are retried.
    /// A non-HTML response or an error page is rejected immediately.
    pub async fn fetch(
        &self,
        url: &str,
        max_retries: u32,
        base_delay: Duration,
    ) -> HarvestResult<Document> {
        let attempts = max_retries.max(1);

        for attempt in 1..=attempts {
            if attempt > 1 {
                tokio::time::sleep(backoff_delay(base_delay, attempt)).await;
            }

            info!(url, attempt, "fetching page");
            let (final_url, content_type, body) = match self.get_once(url).await {
                Ok(parts) => parts,
                Err(e) => {
                    warn!(url, attempt, error = %e, "fetch attempt failed");
                    continue;
                }
            };

            if let Err(reason) = validate_page(content_type.as_deref(), &body) {
                warn!(url, %reason, "page rejected");
                return Err(HarvestError::ContentRejected {
                    url: url.to_string(),
                    reason,
                });
            }

            tokio::time::sleep(base_delay).await;
            return Ok(Document {
                url: url.to_string(),
                final_url,
                html: body,
            });
        }

        error!(url, attempts, "giving up on page");
        Err(HarvestError::Fetch {
            url: url.to_string(),
            attempts,
        })
    }

    async fn get_once(&self, url: &str) -> reqwest::Result<(String, Option<String>, String)> {
        let resp = self.client.get(url).send().await?.error_for_status()?;
        let final_url = resp.url().to_string();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = resp.text().await?;
        Ok((final_url, content_type, body))
    }
}

/// Accept only HTML pages whose `<title>` does not announce an error.
fn validate_page(content_type: Option<&str>, body: &str) -> Result<(), String> {
    let is_html = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false);
    if !is_html {
        return Err(format!(
            "non-HTML response ({})",
            content_type.unwrap_or("no content-type")
        ));
    }

    if let Some(title) = page_title(body) {
        if title.to_lowercase().contains("error") {
            return Err(format!("error page: {title}"));
        }
    }
    Ok(())
}

fn page_title(body: &str) -> Option<String> {
    let document = Html::parse_document(body);
    let sel = Selector::parse("title").ok()?;
    document
        .select(&sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}
