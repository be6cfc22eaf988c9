use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tracing::{debug, info, warn};
use url::Url;

use crate::config::ScrapeConfig;
use crate::error::{ClientError, FetchCause, FetchError, ParseError};
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::models::{ListingEntry, ProductRecord};
use crate::parser;

/// Something that went wrong without stopping the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    SkippedNode { page_url: String, error: ParseError },
    ListingPageFailed(FetchError),
    DescriptionFailed(FetchError),
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::SkippedNode { page_url, error } => {
                write!(f, "skipped {} on {}", error, page_url)
            }
            Warning::ListingPageFailed(err) => write!(f, "listing page unavailable: {}", err),
            Warning::DescriptionFailed(err) => write!(f, "description unavailable: {}", err),
        }
    }
}

/// Walks listing pages, visits each product's detail page once, and assembles records.
pub struct Extractor<F: Fetcher = HttpFetcher> {
    fetcher: F,
    config: ScrapeConfig,
    descriptions: HashMap<String, Result<String, FetchError>>,
    warnings: Vec<Warning>,
}

impl Extractor<HttpFetcher> {
    pub fn new(config: ScrapeConfig) -> Result<Self, ClientError> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(config, fetcher))
    }
}

impl<F: Fetcher> Extractor<F> {
    pub fn with_fetcher(config: ScrapeConfig, fetcher: F) -> Self {
        Self {
            fetcher,
            config,
            descriptions: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        self.fetcher.fetch(url)
    }

    /// Description from the product's detail page. Each URL is requested at most
    /// once per extractor; later calls return the first outcome.
    pub fn fetch_description(&mut self, product_url: &str) -> Result<String, FetchError> {
        if let Some(cached) = self.descriptions.get(product_url) {
            return cached.clone();
        }
        let outcome = load_description(&self.fetcher, product_url);
        self.descriptions
            .insert(product_url.to_string(), outcome.clone());
        outcome
    }

    /// Scrape every configured listing URL. Only a failure on the very first
    /// listing page is returned as an error; everything else becomes a warning.
    pub fn run(&mut self) -> Result<Vec<ProductRecord>, FetchError> {
        let mut entries = self.collect_listings()?;
        if let Some(limit) = self.config.limit {
            entries.truncate(limit);
        }
        info!(products = entries.len(), "collected listing entries");

        if !self.config.fetch_details {
            return Ok(entries
                .into_iter()
                .map(|entry| {
                    let snippet = entry.snippet.clone();
                    entry.into_record(snippet)
                })
                .collect());
        }

        if self.config.jobs > 1 {
            self.prefetch_descriptions(&entries);
        }

        let total = entries.len();
        let mut records = Vec::with_capacity(total);
        for (idx, entry) in entries.into_iter().enumerate() {
            let description = match self.fetch_description(&entry.product_url) {
                Ok(description) => description,
                Err(err) => {
                    warn!(url = %entry.product_url, error = %err, "using listing snippet as description");
                    self.warnings.push(Warning::DescriptionFailed(err));
                    entry.snippet.clone()
                }
            };
            records.push(entry.into_record(description));
            debug!("processed product {}/{}", idx + 1, total);
        }

        info!(
            records = records.len(),
            warnings = self.warnings.len(),
            "scrape finished"
        );
        Ok(records)
    }

    fn collect_listings(&mut self) -> Result<Vec<ListingEntry>, FetchError> {
        let seeds = self.config.listing_urls.clone();
        let limit = self.config.limit.unwrap_or(usize::MAX);
        let max_pages = if self.config.follow_pagination {
            self.config.max_pages.max(1)
        } else {
            1
        };

        let mut entries = Vec::new();
        for (seed_idx, seed) in seeds.into_iter().enumerate() {
            let mut visited = HashSet::new();
            let mut next = Some(seed);

            while let Some(page_url) = next.take() {
                // The initial listing page is fetched even under a zero limit.
                let initial = seed_idx == 0 && visited.is_empty();
                if entries.len() >= limit && !initial {
                    break;
                }
                if visited.len() >= max_pages {
                    info!(max_pages, "page limit reached");
                    break;
                }
                if !visited.insert(page_url.clone()) {
                    warn!(url = %page_url, "pagination loops back to a visited page");
                    break;
                }

                info!(url = %page_url, "fetching listing page");
                let html = match self.fetch(&page_url) {
                    Ok(html) => html,
                    Err(err) if initial => return Err(err),
                    Err(err) => {
                        warn!(error = %err, "skipping listing page");
                        self.warnings.push(Warning::ListingPageFailed(err));
                        break;
                    }
                };

                let page = parser::parse_listing(&html, &page_url);
                info!(
                    url = %page_url,
                    products = page.entries.len(),
                    skipped = page.skipped.len(),
                    "parsed listing page"
                );
                for error in page.skipped {
                    warn!(url = %page_url, %error, "skipping product node");
                    self.warnings.push(Warning::SkippedNode {
                        page_url: page_url.to_string(),
                        error,
                    });
                }
                entries.extend(page.entries);

                if self.config.follow_pagination {
                    next = parser::next_page_url(&html, &page_url);
                }
            }
        }
        Ok(entries)
    }

    /// Fill the description cache using a bounded pool of scoped threads.
    fn prefetch_descriptions(&mut self, entries: &[ListingEntry]) {
        let mut seen = HashSet::new();
        let urls: Vec<&str> = entries
            .iter()
            .map(|entry| entry.product_url.as_str())
            .filter(|url| !self.descriptions.contains_key(*url) && seen.insert(*url))
            .collect();
        if urls.is_empty() {
            return;
        }

        let jobs = self.config.jobs.min(urls.len());
        debug!(jobs, urls = urls.len(), "prefetching descriptions");

        let next_index = AtomicUsize::new(0);
        let cursor = &next_index;
        let pending = &urls;
        let fetcher = &self.fetcher;
        let results: Vec<(usize, Result<String, FetchError>)> = thread::scope(|scope| {
            let workers: Vec<_> = (0..jobs)
                .map(|_| {
                    scope.spawn(move || {
                        let mut done = Vec::new();
                        loop {
                            let i = cursor.fetch_add(1, Ordering::Relaxed);
                            let Some(url) = pending.get(i) else { break };
                            done.push((i, load_description(fetcher, url)));
                        }
                        done
                    })
                })
                .collect();
            // A panicked worker just leaves its URLs uncached; they are fetched again in order.
            workers
                .into_iter()
                .flat_map(|worker| worker.join().unwrap_or_default())
                .collect()
        });

        for (i, outcome) in results {
            self.descriptions.insert(urls[i].to_string(), outcome);
        }
    }
}

fn load_description<F: Fetcher>(fetcher: &F, product_url: &str) -> Result<String, FetchError> {
    let url = Url::parse(product_url)
        .map_err(|e| FetchError::new(product_url, FetchCause::InvalidUrl(e.to_string())))?;
    debug!(%url, "visiting product page");
    let html = fetcher.fetch(&url)?;
    Ok(parser::parse_description(&html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct StaticPages {
        pages: HashMap<String, String>,
        requests: Mutex<Vec<String>>,
    }

    impl StaticPages {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(url, body)| (url.to_string(), body.to_string()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    impl Fetcher for StaticPages {
        fn fetch(&self, url: &Url) -> Result<String, FetchError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.pages
                .get(url.as_str())
                .cloned()
                .ok_or_else(|| FetchError::new(url.as_str(), FetchCause::Status(404)))
        }
    }

    #[test]
    fn description_is_fetched_once_per_url() {
        let fetcher = StaticPages::new(&[(
            "https://shop.example/p/1",
            r#"<p itemprop="description">Fast</p>"#,
        )]);
        let mut extractor = Extractor::with_fetcher(ScrapeConfig::default(), fetcher);

        assert_eq!(extractor.fetch_description("https://shop.example/p/1").unwrap(), "Fast");
        assert_eq!(extractor.fetch_description("https://shop.example/p/1").unwrap(), "Fast");
        assert_eq!(extractor.fetcher.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn failed_description_is_not_refetched() {
        let fetcher = StaticPages::new(&[]);
        let mut extractor = Extractor::with_fetcher(ScrapeConfig::default(), fetcher);

        assert!(extractor.fetch_description("https://shop.example/gone").is_err());
        assert!(extractor.fetch_description("https://shop.example/gone").is_err());
        assert_eq!(extractor.fetcher.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn malformed_product_url_is_a_fetch_error() {
        let mut extractor = Extractor::with_fetcher(ScrapeConfig::default(), StaticPages::new(&[]));
        let err = extractor.fetch_description("not a url").unwrap_err();
        assert!(matches!(err.cause, FetchCause::InvalidUrl(_)));
    }
}
