use std::io;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use laptop_scraper::config::{self, ScrapeConfig};
use laptop_scraper::{Extractor, archiver};

#[derive(Parser, Debug)]
#[command(name = "laptop_scraper")]
#[command(about = "Scrape product listings from the webscraper.io e-commerce test site into JSON")]
struct Args {
    /// Listing page to scrape; repeat for several (default: the static laptops listing)
    #[arg(long = "url", value_parser = config::parse_listing_url)]
    urls: Vec<Url>,

    /// Output file path (default: stdout)
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Stop after this many products
    #[arg(long = "limit")]
    limit: Option<usize>,

    /// Follow "next page" links on each listing
    #[arg(long = "all-pages")]
    all_pages: bool,

    /// Maximum listing pages per URL when following pagination
    #[arg(long = "max-pages", default_value_t = 50)]
    max_pages: usize,

    /// Parallel detail-page fetches
    #[arg(short = 'j', long = "jobs", default_value_t = 1)]
    jobs: usize,

    /// Per-request timeout in seconds
    #[arg(long = "timeout", default_value_t = 30)]
    timeout: u64,

    /// Attempts per request before giving up
    #[arg(long = "retries", default_value_t = 3)]
    retries: u32,

    /// Base delay between attempts, in milliseconds
    #[arg(long = "retry-delay-ms", default_value_t = 2000)]
    retry_delay_ms: u64,

    /// Use the listing card blurb instead of visiting detail pages
    #[arg(long = "no-detail")]
    no_detail: bool,

    /// Single-line JSON
    #[arg(long = "compact")]
    compact: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

impl Args {
    fn to_config(&self) -> ScrapeConfig {
        let listing_urls = if self.urls.is_empty() {
            vec![config::default_listing_url()]
        } else {
            self.urls.clone()
        };

        ScrapeConfig {
            limit: self.limit,
            follow_pagination: self.all_pages,
            max_pages: self.max_pages,
            fetch_details: !self.no_detail,
            jobs: self.jobs.max(1),
            timeout: Duration::from_secs(self.timeout),
            max_attempts: self.retries.max(1),
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            ..ScrapeConfig::with_listing_urls(listing_urls)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,laptop_scraper=debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = args.to_config();
    let mut extractor = Extractor::new(config).context("Failed to set up HTTP client")?;
    let records = extractor
        .run()
        .context("Failed to fetch the initial listing page")?;

    let warnings = extractor.warnings();
    if !warnings.is_empty() {
        warn!(count = warnings.len(), "run finished with warnings");
        for warning in warnings {
            warn!("{}", warning);
        }
    }

    let pretty = !args.compact;
    match &args.output {
        Some(path) => {
            archiver::save_to_file(&records, path, pretty)
                .with_context(|| format!("Failed to save results to {}", path.display()))?;
            info!(records = records.len(), path = %path.display(), "saved products");
        }
        None => {
            archiver::write_to(io::stdout().lock(), &records, pretty)
                .context("Failed to write results to stdout")?;
        }
    }
    Ok(())
}
