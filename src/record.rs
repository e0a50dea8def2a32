//! Row validation and record building.
//!
//! Each builder either returns a normalized record or a [`RowRejection`]
//! explaining why the row is skipped. Rejections are never fatal.

use crate::item::{subject_url, BookId, BookRecord, DetailedRecord};
use crate::normalize::{
    five_to_ten_point, is_not_applicable, parse_count, parse_rating, ten_point,
};
use crate::tabular::ColumnIndex;
use csv::StringRecord;
use thiserror::Error;

/// `ID, Rating, Votes, Title`
pub const RATING_SITE_COLUMNS: usize = 4;
/// `ID, Score, Rating, Votes, Date, Title`
pub const DETAILED_COLUMNS: usize = 6;
/// Named columns every reading-tracker row must reach. `author` is optional.
pub const READING_TRACKER_COLUMNS: [&str; 4] = ["id", "rating", "num_ratings", "title"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowRejection {
    #[error("expected at least {required} columns, found {found}")]
    TooFewColumns { found: usize, required: usize },
    #[error("invalid identifier {0:?}")]
    InvalidId(String),
    #[error("invalid {field} value {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}

fn require_columns(row: &StringRecord, required: usize) -> Result<(), RowRejection> {
    if row.len() < required {
        return Err(RowRejection::TooFewColumns {
            found: row.len(),
            required,
        });
    }
    Ok(())
}

fn numeric_id(raw: &str) -> Result<u64, RowRejection> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| RowRejection::InvalidId(raw.to_string()))
}

fn rating(field: &'static str, raw: &str) -> Result<f64, RowRejection> {
    parse_rating(raw).ok_or_else(|| RowRejection::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

fn count(field: &'static str, raw: &str) -> Result<u64, RowRejection> {
    parse_count(raw).ok_or_else(|| RowRejection::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

fn tracker_rating(raw: &str) -> Result<f64, RowRejection> {
    if is_not_applicable(raw) {
        return Ok(0.0);
    }
    rating("rating", raw)
}

fn tracker_count(raw: &str) -> Result<u64, RowRejection> {
    if is_not_applicable(raw) {
        return Ok(0);
    }
    count("num_ratings", raw)
}

/// Identifier and title of a rating-site row, if the row is well formed
/// enough to index.
pub fn rating_site_key(row: &StringRecord) -> Option<(u64, &str)> {
    if row.len() < RATING_SITE_COLUMNS {
        return None;
    }
    let id = numeric_id(&row[0]).ok()?;
    Some((id, row[3].trim()))
}

/// Builds a record from a positional rating-site row.
pub fn rating_site_record(row: &StringRecord) -> Result<BookRecord, RowRejection> {
    require_columns(row, RATING_SITE_COLUMNS)?;
    let id = numeric_id(&row[0])?;
    let rating = rating("Rating", &row[1])?;
    let votes = count("Votes", &row[2])?;

    Ok(BookRecord {
        id: BookId::Numeric(id),
        rating: ten_point(rating),
        count: votes,
        title: row[3].trim().to_string(),
        author: None,
        url: None,
    })
}

/// Builds a record from a header-addressed reading-tracker row.
pub fn reading_tracker_record(
    columns: &ColumnIndex,
    row: &StringRecord,
) -> Result<BookRecord, RowRejection> {
    let Some(required) = columns.min_columns(&READING_TRACKER_COLUMNS) else {
        // the header itself lacks a required column
        return Err(RowRejection::TooFewColumns {
            found: row.len(),
            required: READING_TRACKER_COLUMNS.len(),
        });
    };
    require_columns(row, required)?;

    let id = columns.get(row, "id").trim();
    if id.is_empty() {
        return Err(RowRejection::InvalidId(String::new()));
    }
    let stars = tracker_rating(columns.get(row, "rating"))?;
    let num_ratings = tracker_count(columns.get(row, "num_ratings"))?;
    let author = columns.get(row, "author").trim();

    Ok(BookRecord {
        id: BookId::Text(id.to_string()),
        rating: five_to_ten_point(stars),
        count: num_ratings,
        title: columns.get(row, "title").trim().to_string(),
        author: (!author.is_empty()).then(|| author.to_string()),
        url: None,
    })
}

/// Builds a record from the legacy six-column export. The identifier must
/// be all ASCII digits.
pub fn detailed_record(row: &StringRecord) -> Result<DetailedRecord, RowRejection> {
    require_columns(row, DETAILED_COLUMNS)?;
    let raw_id = row[0].trim();
    if raw_id.is_empty() || !raw_id.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RowRejection::InvalidId(raw_id.to_string()));
    }
    let id = numeric_id(raw_id)?;

    Ok(DetailedRecord {
        id,
        score: rating("Score", &row[1])?,
        rating: rating("Rating", &row[2])?,
        rating_count: count("Votes", &row[3])?,
        date: row[4].trim().to_string(),
        title: row[5].trim().to_string(),
        url: subject_url(raw_id),
        img: String::new(),
    })
}
