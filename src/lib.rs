//! # bookshelf-pipeline
//!
//! Normalizes book-rating exports into a compact JSON catalog, and keeps a
//! Douban "read" list up to date by scraping only what is new.
//!
//! Two independent pipelines share one stage contract
//! ([`pipeline::Pipeline`]):
//!
//! - **Converter**: tabular export -> row validation -> record building ->
//!   edition cross-reference and deduplication stages -> JSON payload
//!   ([`converter`]).
//! - **Scraper**: paginated interests -> stop at previously seen ids ->
//!   backfill unknown books into the tabular export -> merge ahead of the
//!   persisted read list ([`scraper`]).
//!
//! ## Example
//!
//! ```rust,ignore
//! use bookshelf_pipeline::config::{ConverterConfig, ScrapeConfig};
//! use bookshelf_pipeline::douban_api::DoubanClient;
//!
//! let summary = bookshelf_pipeline::converter::convert_catalog(&ConverterConfig::default()).await?;
//!
//! let config = ScrapeConfig::from_env()?;
//! let client = DoubanClient::new(&config.user_id)?;
//! let report = bookshelf_pipeline::scraper::run_scrape(client, &config).await?;
//! ```

// Shared building blocks
pub mod config;
pub mod error;
pub mod item;
pub mod pipeline;
pub mod utils;

// Converter
pub mod converter;
pub mod cross_reference;
pub mod deduplication;
pub mod json_writer;
pub mod normalize;
pub mod query;
pub mod record;
pub mod tabular;

// Scraper
pub mod csv_appender;
pub mod fetcher;
pub mod read_list;
pub mod scraper;

#[cfg(feature = "remote")]
pub mod douban_api;

pub use error::PipelineError;
