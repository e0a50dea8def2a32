use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bookshelf_pipeline::config::ScrapeConfig;
use bookshelf_pipeline::fetcher::{InterestPage, InterestSource};
use bookshelf_pipeline::item::{Interest, ReadEntry};
use bookshelf_pipeline::pipeline::PipelineChain;
use bookshelf_pipeline::scraper::{run_scrape, IncrementalScraper, StopReason};
use bookshelf_pipeline::PipelineError;
use serde_json::json;

/// Serves a fixed newest-first listing and records every requested offset.
#[derive(Clone)]
struct ScriptedListing {
    ids: Vec<String>,
    fail_from: Option<usize>,
    requests: Arc<Mutex<Vec<usize>>>,
}

impl ScriptedListing {
    fn numbered(newest: usize, oldest: usize) -> Self {
        let ids = (oldest..=newest).rev().map(|n| n.to_string()).collect();
        ScriptedListing {
            ids,
            fail_from: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// An empty id stands for an interest without `subject.id`.
    fn of(ids: &[&str]) -> Self {
        ScriptedListing {
            ids: ids.iter().map(|id| id.to_string()).collect(),
            fail_from: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing_from(mut self, start: usize) -> Self {
        self.fail_from = Some(start);
        self
    }

    fn requests(&self) -> Vec<usize> {
        self.requests.lock().unwrap().clone()
    }
}

fn interest(id: &str) -> Interest {
    let title = format!("Book {}", id);
    let id = (!id.is_empty()).then_some(id);
    serde_json::from_value(json!({
        "subject": {
            "id": id,
            "title": title,
            "rating": {"value": 8.5, "count": 100}
        },
        "rating": {"value": 4}
    }))
    .unwrap()
}

#[async_trait]
impl InterestSource for ScriptedListing {
    async fn fetch_page(&self, start: usize, count: usize) -> Result<InterestPage, PipelineError> {
        self.requests.lock().unwrap().push(start);
        if self.fail_from.is_some_and(|from| start >= from) {
            return Err(PipelineError::Status {
                status: 403,
                url: "https://m.douban.com/rexxar/api/v2/user/test/interests".to_string(),
            });
        }
        Ok(InterestPage {
            total: Some(self.ids.len()),
            interests: self.ids.iter().skip(start).take(count).map(|id| interest(id)).collect(),
        })
    }
}

fn config_in(dir: &Path) -> ScrapeConfig {
    let mut config = ScrapeConfig::new("test");
    config.read_list_path = dir.join("data/read.json");
    config.tabular_path = dir.join("data/douban.csv");
    config.page_delay = Duration::ZERO;
    config
}

fn read_ids(path: &Path) -> Vec<String> {
    let entries: Vec<ReadEntry> =
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
    entries.into_iter().map(|entry| entry.id).collect()
}

#[tokio::test]
async fn walks_pages_until_the_reported_total() {
    let listing = ScriptedListing::numbered(120, 1);
    let scraper = IncrementalScraper::new(listing.clone(), HashSet::new())
        .with_page_size(50)
        .with_page_delay(Duration::ZERO);

    let (acc, stop) = scraper.fetch_new(&PipelineChain::new()).await;

    assert_eq!(listing.requests(), vec![0, 50, 100]);
    assert_eq!(stop, StopReason::TotalReached { total: 120 });
    assert_eq!(acc.len(), 120);
    assert_eq!(acc.pages_requested(), 3);
    assert_eq!(acc.entries()[0].id, "120");
    assert_eq!(acc.entries()[119].id, "1");
}

#[tokio::test]
async fn duplicate_on_second_page_stops_the_walk() {
    let listing = ScriptedListing::numbered(150, 1);
    // position 60 of the listing (page 2, index 10) holds id 90
    let seen: HashSet<String> = (1..=90).map(|n| n.to_string()).collect();
    let scraper = IncrementalScraper::new(listing.clone(), seen)
        .with_page_size(50)
        .with_page_delay(Duration::ZERO);

    let (acc, stop) = scraper.fetch_new(&PipelineChain::new()).await;

    assert_eq!(listing.requests(), vec![0, 50]);
    assert_eq!(stop, StopReason::Duplicate { id: "90".to_string() });
    assert_eq!(acc.len(), 60);
    assert_eq!(acc.entries().last().unwrap().id, "91");
}

#[tokio::test]
async fn first_run_saves_and_backfills_everything() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    let report = run_scrape(ScriptedListing::numbered(3, 1), &config)
        .await
        .unwrap();

    assert_eq!(report.new_count(), 3);
    assert!(report.read_list_written);
    assert_eq!(report.stop, StopReason::TotalReached { total: 3 });
    assert_eq!(read_ids(&config.read_list_path), vec!["3", "2", "1"]);

    let saved = fs::read_to_string(&config.read_list_path).unwrap();
    assert!(saved.starts_with("[\n    {\n        \"id\": \"3\",\n        \"rating\": 4\n    },"));

    assert_eq!(
        fs::read_to_string(&config.tabular_path).unwrap(),
        "ID,Rating,Votes,Title\n3,8.5,100,Book 3\n2,8.5,100,Book 2\n1,8.5,100,Book 1\n"
    );
}

#[tokio::test]
async fn second_run_without_new_books_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());

    run_scrape(ScriptedListing::numbered(5, 1), &config)
        .await
        .unwrap();
    let read_before = fs::read(&config.read_list_path).unwrap();
    let csv_before = fs::read(&config.tabular_path).unwrap();

    let listing = ScriptedListing::numbered(5, 1);
    let report = run_scrape(listing.clone(), &config).await.unwrap();

    assert_eq!(report.new_count(), 0);
    assert!(!report.read_list_written);
    assert_eq!(report.stop, StopReason::Duplicate { id: "5".to_string() });
    assert_eq!(listing.requests(), vec![0]);
    assert_eq!(fs::read(&config.read_list_path).unwrap(), read_before);
    assert_eq!(fs::read(&config.tabular_path).unwrap(), csv_before);
}

#[tokio::test]
async fn new_books_go_ahead_of_the_prior_list() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(
        &config.read_list_path,
        r#"[{"id": "2", "rating": 3}, {"id": 1, "rating": null}]"#,
    )
    .unwrap();
    fs::write(&config.tabular_path, "ID,Rating,Votes,Title\n4,9.0,7,Known\n").unwrap();

    let report = run_scrape(ScriptedListing::numbered(4, 1), &config)
        .await
        .unwrap();

    assert_eq!(report.new_count(), 2);
    assert_eq!(report.total_entries, 4);
    assert_eq!(read_ids(&config.read_list_path), vec!["4", "3", "2", "1"]);
    // prior entries are rewritten as they were stored
    let saved = fs::read_to_string(&config.read_list_path).unwrap();
    assert!(saved.contains("\"id\": \"2\","));
    assert!(saved.contains("\"id\": 1,"));
    // 4 was already in the export, only 3 is backfilled
    assert_eq!(
        fs::read_to_string(&config.tabular_path).unwrap(),
        "ID,Rating,Votes,Title\n4,9.0,7,Known\n3,8.5,100,Book 3\n"
    );
}

#[tokio::test]
async fn fetch_error_keeps_partial_results() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config_in(dir.path());
    config.page_size = 2;

    let listing = ScriptedListing::numbered(6, 1).failing_from(2);
    let report = run_scrape(listing.clone(), &config).await.unwrap();

    assert!(matches!(report.stop, StopReason::Error(ref message) if message.contains("403")));
    assert_eq!(listing.requests(), vec![0, 2]);
    assert_eq!(read_ids(&config.read_list_path), vec!["6", "5"]);
    assert!(report.read_list_written);
}

#[tokio::test]
async fn corrupt_prior_state_is_treated_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(&config.read_list_path, "not json at all").unwrap();

    let report = run_scrape(ScriptedListing::numbered(2, 1), &config)
        .await
        .unwrap();
    assert_eq!(report.new_count(), 2);
    assert_eq!(read_ids(&config.read_list_path), vec!["2", "1"]);
}

#[tokio::test]
async fn skipped_interests_do_not_end_the_walk() {
    let listing = ScriptedListing::of(&["4", "", "3", "2", "1"]);
    let scraper = IncrementalScraper::new(listing.clone(), HashSet::new())
        .with_page_size(2)
        .with_page_delay(Duration::ZERO);

    let (acc, stop) = scraper.fetch_new(&PipelineChain::new()).await;

    assert_eq!(listing.requests(), vec![0, 2, 4]);
    assert_eq!(stop, StopReason::TotalReached { total: 5 });
    let ids: Vec<&str> = acc.entries().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["4", "3", "2", "1"]);
}

#[tokio::test]
async fn ids_repeated_by_a_shifting_listing_are_recorded_once() {
    // "2" slides from the end of page one to the start of page two
    let listing = ScriptedListing::of(&["3", "2", "2", "1"]);
    let scraper = IncrementalScraper::new(listing.clone(), HashSet::new())
        .with_page_size(2)
        .with_page_delay(Duration::ZERO);

    let (acc, stop) = scraper.fetch_new(&PipelineChain::new()).await;

    assert_eq!(listing.requests(), vec![0, 2]);
    assert_eq!(stop, StopReason::TotalReached { total: 4 });
    let ids: Vec<&str> = acc.entries().iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["3", "2", "1"]);
}

#[tokio::test]
async fn unwritable_tabular_source_does_not_stop_the_scrape() {
    let dir = tempfile::tempdir().unwrap();
    let config = config_in(dir.path());
    fs::create_dir_all(&config.tabular_path).unwrap();

    let listing = ScriptedListing::numbered(3, 1);
    let report = run_scrape(listing.clone(), &config).await.unwrap();

    assert_eq!(report.stop, StopReason::TotalReached { total: 3 });
    assert_eq!(report.new_count(), 3);
    assert!(report.read_list_written);
    assert_eq!(read_ids(&config.read_list_path), vec!["3", "2", "1"]);
    assert!(config.tabular_path.is_dir());
}
