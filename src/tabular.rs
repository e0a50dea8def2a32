//! CSV reader for the rating exports.
//!
//! Files are decoded leniently (invalid UTF-8 replaced, BOM dropped) and
//! parsed with a header row, flexible record lengths and trimmed fields.
//! The rating-site export is read by position; the reading-tracker export
//! by header name through [`ColumnIndex`].

use crate::error::PipelineError;
use crate::utils::read_text_lossy;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// A fully loaded tabular export.
#[derive(Debug, Clone, Default)]
pub struct TabularSource {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl TabularSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let text = read_text_lossy(path)?;
        let source = Self::from_text(&text)?;
        info!("Loaded {} rows from {:?}", source.rows.len(), path);
        Ok(source)
    }

    pub fn from_text(text: &str) -> Result<Self, PipelineError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            match record {
                Ok(record) => rows.push(record),
                Err(e) => debug!("Skipping unreadable record {}: {}", line + 1, e),
            }
        }
        Ok(TabularSource { headers, rows })
    }

    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    pub fn column_index(&self) -> ColumnIndex {
        ColumnIndex::new(&self.headers)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Header name to column position.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn new(headers: &StringRecord) -> Self {
        let mut positions = HashMap::new();
        for (position, name) in headers.iter().enumerate() {
            // first column wins on repeated names
            positions.entry(name.to_string()).or_insert(position);
        }
        ColumnIndex { positions }
    }

    /// Number of fields a row needs to reach every column in `names`, or
    /// `None` when the header lacks one of them.
    pub fn min_columns(&self, names: &[&str]) -> Option<usize> {
        names
            .iter()
            .map(|name| self.positions.get(*name).map(|&position| position + 1))
            .try_fold(0, |needed, position| Some(needed.max(position?)))
    }

    /// The named cell, or an empty string when the column or cell is missing.
    pub fn get<'r>(&self, row: &'r StringRecord, name: &str) -> &'r str {
        self.positions
            .get(name)
            .and_then(|&position| row.get(position))
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_positional_rows_with_ragged_lengths() {
        let source =
            TabularSource::from_text("ID,Rating,Votes,Title\n1, 8.1 ,100, A \n2,7\n\n3,9,5,C,extra\n")
                .unwrap();
        assert_eq!(source.len(), 3);
        assert_eq!(&source.rows()[0][1], "8.1");
        assert_eq!(&source.rows()[0][3], "A");
        assert_eq!(source.rows()[1].len(), 2);
        assert_eq!(source.rows()[2].len(), 5);
    }

    #[test]
    fn named_access_tolerates_missing_columns() {
        let source = TabularSource::from_text("id,title,rating\nabc,Dune,4.3\n").unwrap();
        let columns = source.column_index();
        let row = &source.rows()[0];
        assert_eq!(columns.get(row, "id"), "abc");
        assert_eq!(columns.get(row, "rating"), "4.3");
        assert_eq!(columns.get(row, "author"), "");
    }

    #[test]
    fn min_columns_reaches_the_last_named_column() {
        let source = TabularSource::from_text("id,title,author,rating\n").unwrap();
        let columns = source.column_index();
        assert_eq!(columns.min_columns(&["id", "title"]), Some(2));
        assert_eq!(columns.min_columns(&["rating", "id"]), Some(4));
        assert_eq!(columns.min_columns(&["id", "num_ratings"]), None);
        assert_eq!(columns.min_columns(&[]), Some(0));
    }

    #[test]
    fn empty_text_has_no_rows() {
        let source = TabularSource::from_text("").unwrap();
        assert!(source.is_empty());
        assert!(source.headers().is_empty());
    }
}
