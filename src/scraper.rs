//! Incremental read-list scraper.
//!
//! A run walks the account's "done" interests page by page, newest first,
//! and stops as soon as it reaches an interest captured by a previous run.
//! Every accepted interest first goes through the backfill chain (which
//! appends unknown books to the tabular source) and is then recorded in a
//! [`FetchAccumulator`]. When the loop ends, for whatever reason, the
//! accumulated entries are written ahead of the prior read list.
//!
//! Stop conditions, checked in this order:
//! - the request fails or returns a non-success status ([`StopReason::Error`]);
//! - the page is empty ([`StopReason::Exhausted`]);
//! - an interest's id is already in the prior read list
//!   ([`StopReason::Duplicate`]), in which case the rest of the page is
//!   ignored;
//! - the accumulated count, or the position reached in the listing, meets
//!   the total reported on the first page ([`StopReason::TotalReached`]).
//!
//! Otherwise the offset advances by one page and the loop sleeps for the
//! configured delay before the next request.

use crate::config::ScrapeConfig;
use crate::csv_appender::CsvAppenderPipeline;
use crate::error::PipelineError;
use crate::fetcher::InterestSource;
use crate::item::{Interest, ReadEntry};
use crate::json_writer::JsonWriterPipeline;
use crate::pipeline::{Pipeline, PipelineChain};
use crate::read_list::{ReadList, READ_LIST_STYLE};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Why the fetch loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Reached an interest captured by an earlier run.
    Duplicate { id: String },
    /// The endpoint returned an empty page.
    Exhausted,
    /// Everything the endpoint reported has been walked.
    TotalReached { total: usize },
    /// The request failed; entries gathered so far are kept.
    Error(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Duplicate { id } => write!(f, "reached previously fetched book {}", id),
            StopReason::Exhausted => f.write_str("no more interests"),
            StopReason::TotalReached { total } => write!(f, "reached reported total {}", total),
            StopReason::Error(message) => write!(f, "fetch failed: {}", message),
        }
    }
}

/// Entries accepted during one run, in the order the endpoint listed them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchAccumulator {
    entries: Vec<ReadEntry>,
    ids: HashSet<String>,
    pages_requested: usize,
    total: Option<usize>,
}

impl FetchAccumulator {
    /// Records an entry. An id already accepted in this run (the listing can
    /// shift while it is being walked) is not recorded twice.
    pub fn push(&mut self, entry: ReadEntry) -> bool {
        if !self.ids.insert(entry.id.clone()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    pub fn entries(&self) -> &[ReadEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<ReadEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn pages_requested(&self) -> usize {
        self.pages_requested
    }

    /// Total reported by the first page, if any page was fetched.
    pub fn reported_total(&self) -> Option<usize> {
        self.total
    }
}

enum PageOutcome {
    Complete { accepted: usize },
    Duplicate { id: String },
}

/// Drives the fetch loop against an [`InterestSource`].
pub struct IncrementalScraper<S: InterestSource> {
    source: S,
    seen: HashSet<String>,
    page_size: usize,
    page_delay: Duration,
}

impl<S: InterestSource> IncrementalScraper<S> {
    /// `seen` holds the ids captured by earlier runs.
    pub fn new(source: S, seen: HashSet<String>) -> Self {
        IncrementalScraper {
            source,
            seen,
            page_size: crate::config::DEFAULT_PAGE_SIZE,
            page_delay: crate::config::DEFAULT_PAGE_DELAY,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Fetches everything newer than the seen-set, feeding each accepted
    /// interest through `backfill` before recording it.
    pub async fn fetch_new(
        &self,
        backfill: &PipelineChain<Interest>,
    ) -> (FetchAccumulator, StopReason) {
        let mut acc = FetchAccumulator::default();
        let mut start = 0;

        let stop = loop {
            info!(
                "Fetching batch (start={})... (collected so far: {})",
                start,
                acc.len()
            );
            acc.pages_requested += 1;
            let page = match self.source.fetch_page(start, self.page_size).await {
                Ok(page) => page,
                Err(e) => {
                    error!("An error occurred while fetching start={}: {}", start, e);
                    break StopReason::Error(e.to_string());
                }
            };

            if acc.total.is_none() {
                acc.total = page.total;
                if let Some(total) = page.total {
                    info!("API reports total items: {}", total);
                }
            }

            if page.interests.is_empty() {
                info!("No more interests found.");
                break StopReason::Exhausted;
            }

            let returned = page.interests.len();
            match self.accept_page(page.interests, backfill, &mut acc).await {
                Ok(PageOutcome::Duplicate { id }) => {
                    info!("Found existing book {}, stopping fetch.", id);
                    break StopReason::Duplicate { id };
                }
                Ok(PageOutcome::Complete { accepted }) => {
                    info!("Got {} new items this batch.", accepted);
                    if accepted < returned {
                        warn!(
                            "{} of {} interests in this batch were skipped",
                            returned - accepted,
                            returned
                        );
                    }
                }
                Err(e) => {
                    error!("Backfill failed: {}", e);
                    break StopReason::Error(e.to_string());
                }
            }

            if let Some(total) = acc.total {
                if acc.len() >= total || start + returned >= total {
                    info!("Reached API reported total: {}", total);
                    break StopReason::TotalReached { total };
                }
            }

            start += self.page_size;
            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        };

        (acc, stop)
    }

    async fn accept_page(
        &self,
        interests: Vec<Interest>,
        backfill: &PipelineChain<Interest>,
        acc: &mut FetchAccumulator,
    ) -> Result<PageOutcome, PipelineError> {
        let mut accepted = 0;
        for interest in interests {
            let Some(entry) = interest.to_read_entry() else {
                debug!("Skipping interest without subject id: {:?}", interest);
                continue;
            };
            if self.seen.contains(&entry.id) {
                return Ok(PageOutcome::Duplicate { id: entry.id });
            }
            backfill.process_item(interest).await?;
            if acc.push(entry) {
                accepted += 1;
            }
        }
        Ok(PageOutcome::Complete { accepted })
    }
}

/// Outcome of a full scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeReport {
    pub new_entries: Vec<ReadEntry>,
    pub pages_requested: usize,
    pub stop: StopReason,
    /// Length of the read list after the run.
    pub total_entries: usize,
    /// Whether the read-list file was rewritten.
    pub read_list_written: bool,
}

impl ScrapeReport {
    pub fn new_count(&self) -> usize {
        self.new_entries.len()
    }
}

/// Loads prior state, runs the fetch loop with tabular backfill, and puts
/// the new entries ahead of the persisted read list.
pub async fn run_scrape<S: InterestSource>(
    source: S,
    config: &ScrapeConfig,
) -> Result<ScrapeReport, PipelineError> {
    config.validate()?;
    let prior = ReadList::load(&config.read_list_path);
    let prior_len = prior.len();

    let backfill =
        PipelineChain::new().add_pipeline(CsvAppenderPipeline::new(&config.tabular_path)?);
    let scraper = IncrementalScraper::new(source, prior.ids())
        .with_page_size(config.page_size)
        .with_page_delay(config.page_delay);

    let (acc, stop) = scraper.fetch_new(&backfill).await;
    if let Err(e) = backfill.close().await {
        warn!("Closing the tabular source failed: {}", e);
    }
    let pages_requested = acc.pages_requested();

    let merger = JsonWriterPipeline::new(&config.read_list_path)?
        .with_style(READ_LIST_STYLE)
        .with_trailing(prior.into_entries())
        .skip_when_empty(true);
    for entry in acc.into_entries() {
        merger.process_item(entry).await?;
    }
    let new_entries = merger.collected().await;
    merger.close().await?;

    if new_entries.is_empty() {
        info!("No new books fetched. Data remains unchanged.");
    } else {
        info!(
            "Saved {} new books (Total: {}) to {:?}",
            new_entries.len(),
            new_entries.len() + prior_len,
            config.read_list_path
        );
    }

    Ok(ScrapeReport {
        total_entries: new_entries.len() + prior_len,
        read_list_written: !new_entries.is_empty(),
        new_entries,
        pages_requested,
        stop,
    })
}
