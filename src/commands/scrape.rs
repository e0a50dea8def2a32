use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use bookshelf_pipeline::config::ScrapeConfig;
use bookshelf_pipeline::douban_api::DoubanClient;
use bookshelf_pipeline::scraper::{run_scrape, StopReason};

pub async fn execute(
    user_id: Option<String>,
    read: PathBuf,
    douban: PathBuf,
    page_size: usize,
    delay_ms: u64,
) -> Result<()> {
    // checked before touching any file
    let mut config = ScrapeConfig::from_user_id(user_id)?;
    config.read_list_path = read;
    config.tabular_path = douban;
    config.page_size = page_size;
    config.page_delay = Duration::from_millis(delay_ms);

    let client = DoubanClient::new(&config.user_id)?;
    let report = run_scrape(client, &config).await?;

    if let StopReason::Error(message) = &report.stop {
        eprintln!("Fetch stopped early: {}", message);
    }
    if report.read_list_written {
        println!(
            "Successfully saved {} new books (Total: {}) to {}",
            report.new_count(),
            report.total_entries,
            config.read_list_path.display()
        );
    } else {
        println!("No new books fetched. Data remains unchanged.");
    }
    Ok(())
}
