//! Catalog conversion: tabular exports in, one JSON payload out.
//!
//! Rows are validated and built into records, then pushed through a
//! [`PipelineChain`] of filters (edition cross-reference for the rating
//! site, per-source deduplication) before the survivors are serialized.

use crate::config::{ConverterConfig, SingleSourceConfig};
use crate::cross_reference::{CrossReferenceFilter, TitleIndex};
use crate::deduplication::DeduplicationPipeline;
use crate::error::PipelineError;
use crate::item::{BookRecord, DetailedRecord, ScrapedItem};
use crate::json_writer::{write_json_file, JsonStyle};
use crate::pipeline::PipelineChain;
use crate::read_list::ReadList;
use crate::record::{detailed_record, reading_tracker_record, rating_site_record, RowRejection};
use crate::tabular::TabularSource;
use chrono::{SecondsFormat, Utc};
use csv::StringRecord;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Two-source payload read by the display page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogPayload {
    pub generated_at: String,
    pub douban: Vec<BookRecord>,
    pub goodreads: Vec<BookRecord>,
}

/// Payload of the single-source conversions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleSourcePayload<T> {
    pub generated_at: String,
    pub items: Vec<T>,
    pub source: String,
}

/// Record counts of one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub douban: usize,
    pub goodreads: usize,
    pub rejected_rows: usize,
    pub output_path: PathBuf,
}

/// Current UTC time, ISO-8601 with microseconds and an explicit offset.
pub fn generated_at() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false)
}

/// Builds records from rows, skipping rejected ones. Returns the records
/// and the number of rejected rows.
fn build_records<T>(
    rows: &[StringRecord],
    build: impl Fn(&StringRecord) -> Result<T, RowRejection>,
) -> (Vec<T>, usize) {
    let mut records = Vec::with_capacity(rows.len());
    let mut rejected = 0;
    for (line, row) in rows.iter().enumerate() {
        match build(row) {
            Ok(record) => records.push(record),
            Err(reason) => {
                // +2: header row and 1-based numbering
                debug!("Skipping row {}: {}", line + 2, reason);
                rejected += 1;
            }
        }
    }
    (records, rejected)
}

async fn dedup_by<I: ScrapedItem>(
    records: Vec<I>,
    unique_field: &str,
) -> Result<Vec<I>, PipelineError> {
    PipelineChain::new()
        .add_pipeline(DeduplicationPipeline::new(&[unique_field]))
        .process_all(records)
        .await
}

/// Edition index for the rating-site rows, from the read list at
/// `read_list_path`. Missing or unreadable read lists give an empty index.
pub fn authoritative_index(douban: &TabularSource, read_list_path: Option<&Path>) -> TitleIndex {
    let Some(path) = read_list_path else {
        return TitleIndex::default();
    };
    let read_ids = ReadList::load(path).numeric_ids();
    TitleIndex::build(douban, &read_ids)
}

/// Rating-site records with other editions and duplicates removed.
pub async fn convert_rating_site(
    source: &TabularSource,
    index: TitleIndex,
) -> Result<(Vec<BookRecord>, usize), PipelineError> {
    let (records, rejected) = build_records(source.rows(), rating_site_record);

    let mut chain = PipelineChain::new();
    if !index.is_empty() {
        chain = chain.add_pipeline(CrossReferenceFilter::new(index));
    }
    let chain = chain.add_pipeline(DeduplicationPipeline::new(&["i"]));

    let kept = chain.process_all(records).await?;
    chain.close().await?;
    Ok((kept, rejected))
}

/// Reading-tracker records with duplicates removed.
pub async fn convert_reading_tracker(
    source: &TabularSource,
) -> Result<(Vec<BookRecord>, usize), PipelineError> {
    let columns = source.column_index();
    let (records, rejected) =
        build_records(source.rows(), |row| reading_tracker_record(&columns, row));
    Ok((dedup_by(records, "i").await?, rejected))
}

/// Converts both exports into the catalog payload and writes it compactly.
pub async fn convert_catalog(config: &ConverterConfig) -> Result<ConversionSummary, PipelineError> {
    let douban_source = TabularSource::open(&config.douban_path)?;
    let goodreads_source = TabularSource::open(&config.goodreads_path)?;

    let index = authoritative_index(&douban_source, config.read_list_path.as_deref());
    let (douban, douban_rejected) = convert_rating_site(&douban_source, index).await?;
    let (goodreads, goodreads_rejected) = convert_reading_tracker(&goodreads_source).await?;

    let summary = ConversionSummary {
        douban: douban.len(),
        goodreads: goodreads.len(),
        rejected_rows: douban_rejected + goodreads_rejected,
        output_path: config.output_path.clone(),
    };
    let payload = CatalogPayload {
        generated_at: generated_at(),
        douban,
        goodreads,
    };
    write_json_file(&config.output_path, &payload, JsonStyle::Compact)?;

    info!(
        "Douban: {} books, Goodreads: {} books ({} rows skipped)",
        summary.douban, summary.goodreads, summary.rejected_rows
    );
    info!("Written to {:?}", config.output_path);
    Ok(summary)
}

/// Converts one rating-site export, adding subject URLs.
pub async fn convert_single(config: &SingleSourceConfig) -> Result<usize, PipelineError> {
    let source = TabularSource::open(&config.input_path)?;
    let (records, rejected) = build_records(source.rows(), |row| {
        rating_site_record(row).map(BookRecord::with_subject_url)
    });
    let items = dedup_by(records, "i").await?;

    let payload = SingleSourcePayload {
        generated_at: generated_at(),
        source: config.input_path.display().to_string(),
        items,
    };
    write_json_file(&config.output_path, &payload, JsonStyle::Compact)?;
    info!(
        "Wrote {} books to {:?} ({} rows skipped)",
        payload.items.len(),
        config.output_path,
        rejected
    );
    Ok(payload.items.len())
}

/// Converts the legacy six-column export.
pub async fn convert_detailed(config: &SingleSourceConfig) -> Result<usize, PipelineError> {
    let source = TabularSource::open(&config.input_path)?;
    let (records, rejected): (Vec<DetailedRecord>, usize) =
        build_records(source.rows(), detailed_record);
    let items = dedup_by(records, "id").await?;

    let payload = SingleSourcePayload {
        generated_at: generated_at(),
        source: config.input_path.display().to_string(),
        items,
    };
    write_json_file(&config.output_path, &payload, JsonStyle::Pretty(2))?;
    info!(
        "Wrote {} books to {:?} ({} rows skipped)",
        payload.items.len(),
        config.output_path,
        rejected
    );
    Ok(payload.items.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::BookId;

    #[test]
    fn generated_at_has_offset_and_micros() {
        let stamp = generated_at();
        assert!(stamp.ends_with("+00:00"), "{}", stamp);
        let fraction = stamp.split('.').nth(1).unwrap();
        assert_eq!(fraction.len(), "123456+00:00".len());
    }

    #[tokio::test]
    async fn rating_site_conversion_filters_and_dedups() {
        let source = TabularSource::from_text(
            "ID,Rating,Votes,Title\n10,8.1,5,X\n30,7.2,9,X\n10,9.9,1,X again\n11,6,,Y\nbad,1,1,Z\n",
        )
        .unwrap();
        let mut index = TitleIndex::default();
        index.insert("X", 10);

        let (records, rejected) = convert_rating_site(&source, index).await.unwrap();
        let ids: Vec<BookId> = records.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec![BookId::Numeric(10), BookId::Numeric(11)]);
        assert_eq!(records[0].title, "X");
        assert_eq!(rejected, 1);
    }

    #[tokio::test]
    async fn reading_tracker_conversion_dedups_by_id() {
        let source = TabularSource::from_text(
            "id,title,author,rating,num_ratings\na,Dune,Herbert,4.5,\"1,000\"\na,Dune 2,,3,1\n,NoId,,4,1\n",
        )
        .unwrap();
        let (records, rejected) = convert_reading_tracker(&source).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].rating, 9.0);
        assert_eq!(records[0].count, 1000);
        assert_eq!(rejected, 1);
    }

    #[tokio::test]
    async fn reading_tracker_rows_short_of_the_header_are_rejected() {
        let source =
            TabularSource::from_text("id,title,author,rating,num_ratings\ngr9\n").unwrap();
        let (records, rejected) = convert_reading_tracker(&source).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(rejected, 1);
    }
}
