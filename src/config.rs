use std::time::Duration;

use url::Url;

pub const DEFAULT_LISTING_URL: &str =
    "https://webscraper.io/test-sites/e-commerce/static/computers/laptops";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// Everything a scrape run needs. Passed into the extractor; nothing is read from globals.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub listing_urls: Vec<Url>,
    /// Cap on the number of products, applied before any detail page is fetched.
    pub limit: Option<usize>,
    pub follow_pagination: bool,
    /// Upper bound on listing pages visited per seed URL when following pagination.
    pub max_pages: usize,
    pub fetch_details: bool,
    /// Worker threads for detail-page fetches. 1 means sequential.
    pub jobs: usize,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_delay: Duration,
    pub user_agent: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            listing_urls: vec![default_listing_url()],
            limit: None,
            follow_pagination: false,
            max_pages: 50,
            fetch_details: true,
            jobs: 1,
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_delay: Duration::from_secs(2),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ScrapeConfig {
    pub fn with_listing_urls(urls: Vec<Url>) -> Self {
        Self {
            listing_urls: urls,
            ..Self::default()
        }
    }
}

pub fn default_listing_url() -> Url {
    Url::parse(DEFAULT_LISTING_URL).expect("default listing URL is valid")
}

/// Parse a user-supplied listing URL, accepting only http and https.
pub fn parse_listing_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw.trim()).map_err(|e| format!("{}: {}", raw, e))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(format!("{}: unsupported scheme '{}'", raw, other)),
    }
}
