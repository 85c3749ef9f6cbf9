//! Itbooks - concurrent scraper of Russian IT publisher catalogs.
//!
//! This library provides functionality for:
//! - Crawling publisher sites (Piter, DMK Press, Eksmo) concurrently
//! - Merging all crawlers' books onto one bounded stream
//! - Persisting books into a store keyed by ISBN

pub mod book;
pub mod config;
pub mod console;
pub mod error;
pub mod fetcher;
pub mod ingest;
pub mod orchestrator;
pub mod scrapers;
pub mod storage;
pub mod utils;

// Re-export commonly used types
pub use book::{Book, StoredBook};
pub use config::Config;
pub use console::Console;
pub use error::{ConfigError, ScraperError, StorageError};
pub use orchestrator::{CrawlFailure, ScrapeReport, ScrapeRun};
pub use scrapers::{BookSink, Catalog, CrawlRegistry, SiteCrawler};
pub use storage::{BookStore, JsonBookStore};
