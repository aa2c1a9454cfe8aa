use governor::{
    Quota, RateLimiter, clock::DefaultClock, middleware::NoOpMiddleware, state::InMemoryState,
    state::NotKeyed,
};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

use super::config::EdgarConfig;
use super::error::{EdgarError, Result};

const MAX_RETRIES: u32 = 5;
const INITIAL_BACKOFF_MS: u64 = 1000;
const PREVIEW_CHARS: usize = 200;

type Governor = RateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Rate-limited HTTP client for the SEC EDGAR archives and submissions API.
///
/// `Edgar` is the retrieval side of the crate: it lists a filer's 13F filings
/// and downloads their documents. The reconciliation logic lives in
/// [`FilingStore`](crate::FilingStore), which talks to `Edgar` only through the
/// [`HoldingsSource`](crate::HoldingsSource) trait.
///
/// # Rate Limiting
///
/// SEC.gov fair access rules cap automated clients at 10 requests per second.
/// Every request waits on a token bucket sized by [`EdgarConfig::rate_limit`]:
///
/// ```text
/// Token Bucket (capacity: rate_limit tokens)
/// ┌──────────────────────────┐
/// │ ████████████████████████ │  ← refills at rate_limit/sec
/// └──────────────────────────┘
///      ↓ one token per request
/// ```
///
/// HTTP 429 responses and network failures are retried up to five times with
/// exponential backoff and jitter. A 404 is reported as [`EdgarError::NotFound`]
/// straight away.
///
/// # Examples
///
/// ```rust
/// # use edgar13f::Edgar;
/// let edgar = Edgar::new("my_app/1.0 (my@email.com)")?;
/// # Ok::<(), edgar13f::EdgarError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Edgar {
    /// HTTP client carrying the SEC-mandated user agent
    pub(crate) client: reqwest::Client,

    /// Token bucket shared by every clone of this client
    pub(crate) rate_limiter: Arc<Governor>,

    /// Base URL for EDGAR archives
    pub(crate) edgar_archives_url: String,

    /// Base URL for EDGAR data API
    pub(crate) edgar_data_url: String,

    /// Directory holding the HTML rendering of a filing's XML documents
    pub(crate) rendered_stylesheet_dir: String,
}

impl Edgar {
    /// Creates a client with the default rate limit (10/s), a 30 second timeout
    /// and the public SEC.gov base URLs.
    ///
    /// The SEC asks for a user agent that identifies you, in the form
    /// `"AppName contact@example.com"`.
    pub fn new(user_agent: &str) -> Result<Self> {
        let config = EdgarConfig {
            user_agent: user_agent.to_string(),
            ..EdgarConfig::default()
        };
        Self::with_config(config)
    }

    /// Creates a client from explicit settings.
    ///
    /// Useful for pointing at a mock server or for a more conservative rate.
    ///
    /// # Errors
    ///
    /// Returns `EdgarError::ConfigError` if the user agent is not a valid header
    /// value, the rate limit is zero, or the HTTP client cannot be built.
    pub fn with_config(config: EdgarConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| EdgarError::ConfigError(format!("Invalid user agent: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| EdgarError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_second(
            NonZeroU32::new(config.rate_limit).ok_or_else(|| {
                EdgarError::ConfigError("Rate limit must be greater than zero".to_string())
            })?,
        )));

        Ok(Edgar {
            client,
            rate_limiter,
            edgar_archives_url: config.base_urls.archives,
            edgar_data_url: config.base_urls.data,
            rendered_stylesheet_dir: config.rendered_stylesheet_dir,
        })
    }

    /// Exponential backoff with ±10% jitter: 1s, 2s, 4s, 8s, 16s.
    fn calculate_backoff(retry: u32) -> Duration {
        let backoff_ms = INITIAL_BACKOFF_MS * (2_u64.pow(retry));
        let jitter = (backoff_ms as f64 * 0.2 * (fastrand::f64() - 0.5)) as i64;
        Duration::from_millis((backoff_ms as i64 + jitter) as u64)
    }

    /// Fetches a text resource (JSON listing, XML document, rendered HTML).
    ///
    /// # Retry Behavior
    ///
    /// - **429**: retried, honouring `Retry-After` when present
    /// - **Network errors**: retried with backoff
    /// - **404**: `EdgarError::NotFound`, no retry
    /// - **Anything else**: `EdgarError::InvalidResponse` with a body preview
    ///
    /// A `.json` URL answered with an HTML page (the SEC's error pages) is
    /// reported as `EdgarError::UnexpectedContentType`. The SEC sometimes serves
    /// real JSON as `text/html`, so the body is sniffed before giving up.
    pub async fn get(&self, url: &str) -> Result<String> {
        let mut retries = 0;

        loop {
            self.rate_limiter.until_ready().await;
            tracing::debug!("GET {}", url);

            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) => {
                    if retries >= MAX_RETRIES {
                        return Err(EdgarError::RequestError(e));
                    }
                    let backoff = Self::calculate_backoff(retries);
                    tracing::warn!(
                        "Request failed for {}: {:?}. Attempt {}/{}. Retrying in {:?}.",
                        url,
                        e,
                        retries + 1,
                        MAX_RETRIES + 1,
                        backoff
                    );
                    sleep(backoff).await;
                    retries += 1;
                    continue;
                }
            };

            let status = response.status();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|val| val.to_str().ok())
                .map(str::to_lowercase);

            match status {
                reqwest::StatusCode::OK => {
                    let body = response.text().await.map_err(EdgarError::RequestError)?;
                    let html_for_json = url.ends_with(".json")
                        && content_type
                            .as_deref()
                            .is_some_and(|ct| ct.contains("text/html"));
                    if html_for_json {
                        let trimmed = body.trim_start();
                        if trimmed.starts_with('{') || trimmed.starts_with('[') {
                            tracing::warn!(
                                "Received text/html content-type for .json URL, but content appears to be JSON: {}",
                                url
                            );
                        } else {
                            return Err(EdgarError::UnexpectedContentType {
                                url: url.to_string(),
                                expected_pattern: "application/json".to_string(),
                                got_content_type: content_type.unwrap_or_default(),
                                content_preview: body.chars().take(PREVIEW_CHARS).collect(),
                            });
                        }
                    }
                    tracing::debug!("Fetched {} bytes from {}", body.len(), url);
                    return Ok(body);
                }
                reqwest::StatusCode::NOT_FOUND => {
                    tracing::warn!("Not found: {}", url);
                    return Err(EdgarError::NotFound);
                }
                reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    if retries >= MAX_RETRIES {
                        return Err(EdgarError::RateLimitExceeded);
                    }
                    let retry_after = response
                        .headers()
                        .get("retry-after")
                        .and_then(|h| h.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .map(Duration::from_secs)
                        .unwrap_or_else(|| Self::calculate_backoff(retries));

                    tracing::warn!(
                        "Rate limit hit (429) for {}. Attempt {}/{}. Waiting for {:?} before retry.",
                        url,
                        retries + 1,
                        MAX_RETRIES + 1,
                        retry_after
                    );
                    sleep(retry_after).await;
                    retries += 1;
                }
                other => {
                    let error_body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Failed to read error body".to_string());

                    return Err(EdgarError::InvalidResponse(format!(
                        "Unexpected status code: {} for URL: {}. Response preview: {}",
                        other,
                        url,
                        error_body.chars().take(PREVIEW_CHARS).collect::<String>()
                    )));
                }
            }
        }
    }

    /// Returns the base URL for EDGAR archives.
    pub fn archives_url(&self) -> &str {
        &self.edgar_archives_url
    }

    /// Returns the base URL for the EDGAR data API.
    pub fn data_url(&self) -> &str {
        &self.edgar_data_url
    }
}
