//! Scrapes product cards from the webscraper.io e-commerce test site and
//! emits them as a JSON array.

pub mod archiver;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod models;
pub mod parser;

pub use config::ScrapeConfig;
pub use error::{ArchiveError, ClientError, FetchCause, FetchError, ParseError};
pub use extractor::{Extractor, Warning};
pub use fetcher::{Fetcher, HttpFetcher};
pub use models::{ListingEntry, ProductRecord};
