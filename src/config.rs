//! Run configuration with the default data layout.
//!
//! Every tool works on a small fixed set of files under `data/`; the CLI
//! overrides individual paths. The scraper's account id only comes from
//! the caller (flag or `DOUBAN_USER_ID`).

use crate::error::PipelineError;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the account to scrape.
pub const USER_ID_ENV: &str = "DOUBAN_USER_ID";
/// Interests requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 50;
/// Pause between page requests.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_secs(1);

/// Two-source catalog conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterConfig {
    pub douban_path: PathBuf,
    pub goodreads_path: PathBuf,
    /// Authoritative read list used to drop other editions. `None` disables
    /// the filter.
    pub read_list_path: Option<PathBuf>,
    pub output_path: PathBuf,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        ConverterConfig {
            douban_path: PathBuf::from("data/douban.csv"),
            goodreads_path: PathBuf::from("data/goodreads.csv"),
            read_list_path: Some(PathBuf::from("data/read.json")),
            output_path: PathBuf::from("data/books.json"),
        }
    }
}

/// Single input, single output conversions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleSourceConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl SingleSourceConfig {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        SingleSourceConfig {
            input_path: input_path.into(),
            output_path: output_path.into(),
        }
    }
}

impl Default for SingleSourceConfig {
    fn default() -> Self {
        SingleSourceConfig::new("books.csv", "books.json")
    }
}

/// Incremental read-list scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeConfig {
    pub user_id: String,
    pub read_list_path: PathBuf,
    pub tabular_path: PathBuf,
    pub page_size: usize,
    pub page_delay: Duration,
}

impl ScrapeConfig {
    pub fn new(user_id: impl Into<String>) -> Self {
        ScrapeConfig {
            user_id: user_id.into(),
            read_list_path: PathBuf::from("data/read.json"),
            tabular_path: PathBuf::from("data/douban.csv"),
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: DEFAULT_PAGE_DELAY,
        }
    }

    /// Builds a config from an optional account id, rejecting a missing or
    /// blank one.
    pub fn from_user_id(user_id: Option<String>) -> Result<Self, PipelineError> {
        match user_id.map(|id| id.trim().to_string()) {
            Some(id) if !id.is_empty() => Ok(ScrapeConfig::new(id)),
            _ => Err(PipelineError::Config(format!(
                "Please set the {} environment variable.",
                USER_ID_ENV
            ))),
        }
    }

    pub fn from_env() -> Result<Self, PipelineError> {
        Self::from_user_id(std::env::var(USER_ID_ENV).ok())
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.page_size == 0 {
            return Err(PipelineError::Config("page size must be positive".to_string()));
        }
        Ok(())
    }
}
