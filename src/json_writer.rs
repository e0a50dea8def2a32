//! JSON output.
//!
//! Two pieces live here:
//! - [`write_json_file`], which serializes any value to a file atomically
//!   (temp file in the same directory, then rename) in a chosen
//!   [`JsonStyle`];
//! - [`JsonWriterPipeline`], a stage that collects every item it sees and,
//!   when closed, writes them as one JSON array followed by an optional
//!   list of previously persisted items. The scraper uses it to put new
//!   read-list entries ahead of the old ones.

use crate::error::PipelineError;
use crate::item::ScrapedItem;
use crate::pipeline::Pipeline;
use crate::utils::validate_output_dir;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use log::{debug, info};

/// Output layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonStyle {
    /// No whitespace between tokens.
    Compact,
    /// One value per line, indented by the given number of spaces.
    Pretty(usize),
}

/// Serializes `value` to bytes in the given style. Non-ASCII text is
/// written verbatim.
pub fn to_json_bytes<T: Serialize + ?Sized>(
    value: &T,
    style: JsonStyle,
) -> Result<Vec<u8>, PipelineError> {
    match style {
        JsonStyle::Compact => Ok(serde_json::to_vec(value)?),
        JsonStyle::Pretty(width) => {
            let indent = vec![b' '; width];
            let mut out = Vec::new();
            let mut serializer =
                Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(&indent));
            value.serialize(&mut serializer)?;
            Ok(out)
        }
    }
}

/// Writes `value` to `path`, replacing any previous content in one rename.
pub fn write_json_file<T: Serialize + ?Sized>(
    path: impl AsRef<Path>,
    value: &T,
    style: JsonStyle,
) -> Result<(), PipelineError> {
    let path = path.as_ref();
    validate_output_dir(path)?;
    let bytes = to_json_bytes(value, style)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(&bytes)?;
    file.flush()?;
    file.persist(path)?;
    debug!("Wrote {} bytes to {:?}", bytes.len(), path);
    Ok(())
}

/// A stage that collects items and writes them as one JSON array on close.
pub struct JsonWriterPipeline<I: ScrapedItem + Clone> {
    path: PathBuf,
    style: JsonStyle,
    items: Mutex<Vec<I>>,
    trailing: Vec<I>,
    skip_when_empty: bool,
}

impl<I: ScrapedItem + Clone> JsonWriterPipeline<I> {
    /// Creates a new `JsonWriterPipeline`.
    pub fn new(file_path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        validate_output_dir(&file_path)?;
        let path = file_path.as_ref().to_path_buf();
        info!("Initializing JsonWriterPipeline for file: {:?}", path);
        Ok(JsonWriterPipeline {
            path,
            style: JsonStyle::Pretty(2),
            items: Mutex::new(Vec::new()),
            trailing: Vec::new(),
            skip_when_empty: false,
        })
    }

    pub fn with_style(mut self, style: JsonStyle) -> Self {
        self.style = style;
        self
    }

    /// Items written after the collected ones.
    pub fn with_trailing(mut self, trailing: Vec<I>) -> Self {
        self.trailing = trailing;
        self
    }

    /// Leaves the file untouched when nothing was collected.
    pub fn skip_when_empty(mut self, skip: bool) -> Self {
        self.skip_when_empty = skip;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn collected_count(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn collected(&self) -> Vec<I> {
        self.items.lock().await.clone()
    }
}

#[async_trait]
impl<I: ScrapedItem + Clone> Pipeline<I> for JsonWriterPipeline<I> {
    fn name(&self) -> &str {
        "JsonWriterPipeline"
    }

    async fn process_item(&self, item: I) -> Result<Option<I>, PipelineError> {
        self.items.lock().await.push(item.clone());
        Ok(Some(item))
    }

    async fn close(&self) -> Result<(), PipelineError> {
        let items = self.items.lock().await;
        if items.is_empty() && self.skip_when_empty {
            info!("JsonWriterPipeline collected nothing; leaving {:?} as is.", self.path);
            return Ok(());
        }
        let combined: Vec<&I> = items.iter().chain(self.trailing.iter()).collect();
        info!(
            "JsonWriterPipeline writing {} items ({} new) to {:?}.",
            combined.len(),
            items.len(),
            self.path
        );
        write_json_file(&self.path, &combined, self.style)
    }
}
