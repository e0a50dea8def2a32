//! Items that flow through the pipelines.
//!
//! The converter produces [`BookRecord`]s (and [`DetailedRecord`]s for the
//! legacy six-column export). The scraper consumes [`Interest`]s from the
//! remote endpoint and persists [`ReadEntry`]s.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Anything a [`Pipeline`](crate::pipeline::Pipeline) stage can process.
///
/// Stages that key on field values (deduplication, CSV export) look at the
/// item through its JSON form.
pub trait ScrapedItem: fmt::Debug + Serialize + Send + Sync + 'static {
    fn to_json_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Book identifier. The rating site uses integers, the reading tracker
/// uses opaque strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookId {
    Numeric(u64),
    Text(String),
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookId::Numeric(id) => write!(f, "{}", id),
            BookId::Text(id) => f.write_str(id),
        }
    }
}

/// One normalized catalog entry, serialized with the short keys the
/// display page reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    #[serde(rename = "i")]
    pub id: BookId,
    /// Rating on the 10-point scale, rounded to 2 decimals.
    #[serde(rename = "r")]
    pub rating: f64,
    #[serde(rename = "c")]
    pub count: u64,
    #[serde(rename = "t")]
    pub title: String,
    #[serde(rename = "a", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(rename = "u", default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl BookRecord {
    pub fn with_subject_url(mut self) -> Self {
        self.url = Some(subject_url(&self.id.to_string()));
        self
    }
}

impl ScrapedItem for BookRecord {}

/// A row of the legacy six-column text export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedRecord {
    pub id: u64,
    pub score: f64,
    pub rating: f64,
    pub rating_count: u64,
    pub date: String,
    pub title: String,
    pub url: String,
    pub img: String,
}

impl ScrapedItem for DetailedRecord {}

/// Canonical subject page on the rating site.
pub fn subject_url(id: &str) -> String {
    format!("https://book.douban.com/subject/{}/", id)
}

/// One persisted "done" interest. `rating` keeps the exact number the API
/// returned so re-saving does not reformat it. An id the file stored as a
/// JSON number is written back as a number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredEntry", into = "StoredEntry")]
pub struct ReadEntry {
    pub id: String,
    pub rating: Option<Number>,
    numeric_id: bool,
}

impl ReadEntry {
    pub fn new(id: impl Into<String>, rating: Option<Number>) -> Self {
        ReadEntry {
            id: id.into(),
            rating,
            numeric_id: false,
        }
    }
}

#[derive(Serialize, Deserialize)]
struct StoredEntry {
    id: RawId,
    #[serde(default)]
    rating: Option<Number>,
}

impl From<StoredEntry> for ReadEntry {
    fn from(stored: StoredEntry) -> Self {
        ReadEntry {
            numeric_id: matches!(stored.id, RawId::Number(_)),
            id: stored.id.into(),
            rating: stored.rating,
        }
    }
}

impl From<ReadEntry> for StoredEntry {
    fn from(entry: ReadEntry) -> Self {
        let id = match entry.id.parse::<u64>() {
            Ok(number) if entry.numeric_id => RawId::Number(Number::from(number)),
            _ => RawId::Text(entry.id),
        };
        StoredEntry {
            id,
            rating: entry.rating,
        }
    }
}

impl ScrapedItem for ReadEntry {}

/// One element of the remote `interests` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Interest {
    #[serde(default)]
    pub subject: Subject,
    /// The account's own rating, absent when the book was marked read
    /// without stars.
    #[serde(default)]
    pub rating: Option<UserRating>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(default, deserialize_with = "optional_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub rating: Option<SubjectRating>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubjectRating {
    #[serde(default)]
    pub value: Option<Number>,
    #[serde(default)]
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserRating {
    #[serde(default)]
    pub value: Option<Number>,
}

impl Interest {
    pub fn subject_id(&self) -> Option<&str> {
        self.subject
            .id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    /// The read-list entry for this interest, or `None` without a subject id.
    pub fn to_read_entry(&self) -> Option<ReadEntry> {
        let id = self.subject_id()?;
        Some(ReadEntry::new(
            id,
            self.rating.as_ref().and_then(|r| r.value.clone()),
        ))
    }

    /// `ID, Rating, Votes, Title` row for backfilling the tabular source.
    /// A missing subject rating is written blank, which readers treat as zero.
    pub fn to_tabular_row(&self) -> Option<[String; 4]> {
        let id = self.subject_id()?;
        let (value, count) = match &self.subject.rating {
            Some(rating) => (
                rating.value.as_ref().map(Number::to_string).unwrap_or_default(),
                rating.count.to_string(),
            ),
            None => (String::new(), "0".to_string()),
        };
        Some([
            id.to_string(),
            value,
            count,
            self.subject.title.trim().to_string(),
        ])
    }
}

impl ScrapedItem for Interest {}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(Number),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        }
    }
}

fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<RawId>::deserialize(deserializer).map(|raw| raw.map(String::from))
}
