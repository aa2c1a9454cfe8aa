use std::time::Duration;

/// Configuration for the Edgar client
#[derive(Debug, Clone)]
pub struct EdgarConfig {
    /// User agent string for HTTP requests
    pub user_agent: String,
    /// Rate limit in requests per second
    pub rate_limit: u32,
    /// HTTP request timeout
    pub timeout: Duration,
    /// Base URLs for different EDGAR services
    pub base_urls: EdgarUrls,
    /// Directory of the rendered (human-readable) form of a filing's XML documents
    pub rendered_stylesheet_dir: String,
}

/// Base URLs for different EDGAR services
#[derive(Debug, Clone)]
pub struct EdgarUrls {
    /// Base URL for EDGAR archives (filing directories and documents)
    pub archives: String,
    /// Base URL for EDGAR data (submissions API)
    pub data: String,
}

impl Default for EdgarConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("edgar13f/{}", crate::VERSION),
            rate_limit: 10,
            timeout: Duration::from_secs(30),
            base_urls: EdgarUrls::default(),
            rendered_stylesheet_dir: RENDERED_STYLESHEET_DIR.to_string(),
        }
    }
}

impl EdgarConfig {
    /// Creates a new EdgarConfig with custom settings
    ///
    /// # Basic usage
    ///
    /// ```rust
    /// use edgar13f::{Edgar, EdgarConfig};
    /// use std::time::Duration;
    ///
    /// let config = EdgarConfig::new("YourAppName contact@example.com", 5, Duration::from_secs(60), None);
    /// let edgar = Edgar::with_config(config)?;
    /// # Ok::<(), edgar13f::EdgarError>(())
    /// ```
    pub fn new(
        user_agent: impl Into<String>,
        rate_limit: u32,
        timeout: Duration,
        base_urls: Option<EdgarUrls>,
    ) -> Self {
        Self {
            user_agent: user_agent.into(),
            rate_limit,
            timeout,
            base_urls: base_urls.unwrap_or_default(),
            rendered_stylesheet_dir: RENDERED_STYLESHEET_DIR.to_string(),
        }
    }
}

impl Default for EdgarUrls {
    fn default() -> Self {
        Self {
            archives: "https://www.sec.gov/Archives/edgar".to_string(),
            data: "https://data.sec.gov".to_string(),
        }
    }
}

/// First year in which 13F filers report values in whole dollars.
///
/// Filings before this year report in thousands. Filings made during it may
/// use either convention and say which in the rendered cover page.
pub const UNIT_CUTOVER_YEAR: i32 = 2023;

/// Stylesheet directory EDGAR uses to render 13F XML documents as HTML.
pub const RENDERED_STYLESHEET_DIR: &str = "xslForm13F_X02";

/// Policy knobs for a [`FilingStore`](crate::FilingStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Pause between amendment lookups. Every candidate amendment costs an extra
    /// document fetch just to learn which period it targets.
    pub amendment_delay: Duration,
    /// Year in which the unit convention switched from thousands to dollars.
    pub unit_cutover_year: i32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            amendment_delay: Duration::from_millis(250),
            unit_cutover_year: UNIT_CUTOVER_YEAR,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_amendment_delay(mut self, delay: Duration) -> Self {
        self.amendment_delay = delay;
        self
    }

    pub fn with_unit_cutover_year(mut self, year: i32) -> Self {
        self.unit_cutover_year = year;
        self
    }
}
