use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use reqwest::redirect;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::ScrapeConfig;
use crate::error::{ClientError, FetchCause, FetchError};

/// Source of raw HTML. The extractor only talks to the network through this.
pub trait Fetcher: Sync {
    fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
    user_agent: String,
    max_attempts: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(config: &ScrapeConfig) -> Result<Self, ClientError> {
        let redirect_policy = redirect::Policy::custom(|attempt| {
            if attempt.previous().len() > 10 {
                attempt.error("too many redirects (>10)")
            } else {
                attempt.follow()
            }
        });

        let client = Client::builder()
            .redirect(redirect_policy)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ClientError(e.to_string()))?;

        Ok(Self {
            client,
            user_agent: config.user_agent.clone(),
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay,
        })
    }

    fn fetch_once(&self, url: &Url) -> Result<String, FetchError> {
        let resp = self
            .client
            .get(url.clone())
            .header(USER_AGENT, &self.user_agent)
            .send()
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::new(
                url.as_str(),
                FetchCause::Status(status.as_u16()),
            ));
        }

        resp.text()
            .map_err(|e| FetchError::from_reqwest(url.as_str(), e))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::new(
                url.as_str(),
                FetchCause::InvalidUrl(format!("unsupported scheme '{}'", url.scheme())),
            ));
        }

        with_retry(self.max_attempts, self.retry_delay, url, || {
            self.fetch_once(url)
        })
    }
}

/// Run `op` up to `max_attempts` times, sleeping `retry_delay * attempt` between
/// tries. Only transient failures are retried.
pub fn with_retry<F>(
    max_attempts: u32,
    retry_delay: Duration,
    url: &Url,
    mut op: F,
) -> Result<String, FetchError>
where
    F: FnMut() -> Result<String, FetchError>,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;
    loop {
        debug!(%url, attempt, "fetching");
        match op() {
            Ok(body) => {
                if attempt > 1 {
                    info!(%url, attempt, "fetch succeeded after retry");
                }
                return Ok(body);
            }
            Err(err) if err.is_transient() && attempt < max_attempts => {
                warn!(%url, attempt, max_attempts, error = %err, "fetch attempt failed, retrying");
                thread::sleep(retry_delay * attempt);
                attempt += 1;
            }
            Err(err) => {
                if err.is_transient() {
                    error!(%url, max_attempts, error = %err, "all fetch attempts exhausted");
                }
                return Err(err);
            }
        }
    }
}
