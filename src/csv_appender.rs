//! Backfill stage that appends newly discovered books to the tabular source.
//!
//! The rating-site export (`ID, Rating, Votes, Title`) is the converter's
//! main input. While scraping, books the account has read but which are
//! missing from that file get a row synthesized from the subject metadata
//! the remote endpoint embeds in each interest.
//!
//! Key properties:
//! - Append-only: the file is opened in append mode and every row is
//!   flushed as soon as it is written, so rows survive a killed run.
//! - Header on demand: a header row is written first when the file is new
//!   or empty.
//! - Identifiers already present in the file (or appended earlier in the
//!   run) are never appended again. A failed append is logged and the
//!   identifier is left unmarked, so a later run may append it again.

use crate::error::PipelineError;
use crate::item::Interest;
use crate::pipeline::Pipeline;
use crate::tabular::TabularSource;
use crate::utils::validate_output_dir;
use async_trait::async_trait;
use csv::Writer;
use dashmap::DashSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Column names of the rating-site export.
pub const TABULAR_HEADER: [&str; 4] = ["ID", "Rating", "Votes", "Title"];

/// Identifiers (first column) of an existing tabular source. A missing or
/// unreadable file yields an empty set.
pub fn load_tabular_ids(path: impl AsRef<Path>) -> DashSet<String> {
    let path = path.as_ref();
    let ids = DashSet::new();
    if !path.exists() {
        info!("No tabular source at {:?}; every book will be backfilled.", path);
        return ids;
    }
    match TabularSource::open(path) {
        Ok(source) => {
            for row in source.rows() {
                if let Some(id) = row.get(0).map(str::trim).filter(|id| !id.is_empty()) {
                    ids.insert(id.to_string());
                }
            }
        }
        Err(e) => warn!("Could not read tabular source {:?}: {}. Treating it as empty.", path, e),
    }
    ids
}

/// Appends one `ID, Rating, Votes, Title` row per previously unknown book.
pub struct CsvAppenderPipeline {
    path: PathBuf,
    writer: Mutex<Option<Writer<File>>>,
    seen_ids: DashSet<String>,
}

impl CsvAppenderPipeline {
    /// Creates an appender for `file_path`, seeding the known identifiers
    /// from the file's current content.
    pub fn new(file_path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        validate_output_dir(&file_path)?;
        let path = file_path.as_ref().to_path_buf();
        let seen_ids = load_tabular_ids(&path);
        info!(
            "Initializing CsvAppenderPipeline for {:?} with {} known ids",
            path,
            seen_ids.len()
        );
        Ok(CsvAppenderPipeline {
            path,
            writer: Mutex::new(None),
            seen_ids,
        })
    }

    pub fn is_known(&self, id: &str) -> bool {
        self.seen_ids.contains(id)
    }

    pub fn known_count(&self) -> usize {
        self.seen_ids.len()
    }

    fn open_writer(&self) -> Result<Writer<File>, PipelineError> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        let len = file.metadata()?.len();
        let should_write_header = len == 0;
        if len > 0 {
            // keep the first appended row off an unterminated last line
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))?;
            file.read_exact(&mut last)?;
            if last[0] != b'\n' {
                file.write_all(b"\n")?;
            }
        }

        let mut writer = Writer::from_writer(file);
        if should_write_header {
            writer.write_record(TABULAR_HEADER)?;
        }
        Ok(writer)
    }

    async fn append_row(&self, row: &[String; 4]) -> Result<(), PipelineError> {
        let mut guard = self.writer.lock().await;
        if guard.is_none() {
            *guard = Some(self.open_writer()?);
        }
        if let Some(writer) = guard.as_mut() {
            writer.write_record(row)?;
            writer.flush()?;
        }
        Ok(())
    }
}

#[async_trait]
impl Pipeline<Interest> for CsvAppenderPipeline {
    fn name(&self) -> &str {
        "CsvAppenderPipeline"
    }

    async fn process_item(&self, item: Interest) -> Result<Option<Interest>, PipelineError> {
        let Some(row) = item.to_tabular_row() else {
            debug!("Interest without subject id, nothing to backfill: {:?}", item);
            return Ok(Some(item));
        };
        if self.seen_ids.contains(&row[0]) {
            return Ok(Some(item));
        }

        match self.append_row(&row).await {
            Ok(()) => {
                info!("Backfilled {} ({}) into {:?}", row[0], row[3], self.path);
                self.seen_ids.insert(row[0].clone());
            }
            Err(e) => warn!(
                "Failed to backfill {} into {:?}: {}. Continuing without it.",
                row[0], self.path, e
            ),
        }
        Ok(Some(item))
    }

    async fn close(&self) -> Result<(), PipelineError> {
        if let Some(writer) = self.writer.lock().await.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}
