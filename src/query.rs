//! Filter language for browsing a generated catalog.
//!
//! A query is a whitespace-separated list of `field:[op]value` conditions,
//! all of which must hold. Fields are the rating (`评分`, `rating`, `r`),
//! the rating count (`人数`, `count`, `c`) and the title (`标题`, `title`,
//! `t`). Numeric conditions take one of `>= <= = > <` (default `=`); title
//! conditions are case-insensitive substring matches and ignore the
//! operator.
//!
//! ```text
//! 评分:>=8.5 人数:>1000 标题:三体
//! ```

use crate::error::PipelineError;
use crate::item::BookRecord;
use serde::Deserialize;
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("cannot parse condition: {0}")]
    Malformed(String),
    #[error("unsupported field: {0}")]
    UnknownField(String),
    #[error("not a number in condition: {0}")]
    InvalidNumber(String),
    #[error("unknown sort mode: {0}")]
    UnknownSort(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    Rating,
    Count,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Ge,
    Le,
    Eq,
    Gt,
    Lt,
}

impl Operator {
    // longest tokens first so ">=" is not read as ">"
    const TOKENS: [(&'static str, Operator); 5] = [
        (">=", Operator::Ge),
        ("<=", Operator::Le),
        ("=", Operator::Eq),
        (">", Operator::Gt),
        ("<", Operator::Lt),
    ];

    fn split(raw: &str) -> (Operator, &str) {
        Self::TOKENS
            .iter()
            .find_map(|(token, op)| raw.strip_prefix(*token).map(|rest| (*op, rest)))
            .unwrap_or((Operator::Eq, raw))
    }

    fn holds(self, value: f64, target: f64) -> bool {
        match self {
            Operator::Ge => value >= target,
            Operator::Le => value <= target,
            Operator::Eq => value == target,
            Operator::Gt => value > target,
            Operator::Lt => value < target,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Lowercased substring of the title.
    Title(String),
    Numeric {
        field: NumericField,
        op: Operator,
        target: f64,
    },
}

enum FieldKind {
    Title,
    Numeric(NumericField),
}

fn field_kind(name: &str) -> Option<FieldKind> {
    match name.to_lowercase().as_str() {
        "评分" | "rating" | "r" => Some(FieldKind::Numeric(NumericField::Rating)),
        "人数" | "count" | "c" => Some(FieldKind::Numeric(NumericField::Count)),
        "标题" | "title" | "t" => Some(FieldKind::Title),
        _ => None,
    }
}

impl FromStr for Condition {
    type Err = QueryError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        let (name, rest) = token
            .split_once(':')
            .filter(|(name, _)| !name.is_empty())
            .ok_or_else(|| QueryError::Malformed(token.to_string()))?;
        let (op, value) = Operator::split(rest);
        if value.is_empty() {
            return Err(QueryError::Malformed(token.to_string()));
        }

        match field_kind(name).ok_or_else(|| QueryError::UnknownField(name.to_string()))? {
            FieldKind::Title => Ok(Condition::Title(value.to_lowercase())),
            FieldKind::Numeric(field) => {
                let target = value
                    .parse::<f64>()
                    .map_err(|_| QueryError::InvalidNumber(token.to_string()))?;
                Ok(Condition::Numeric { field, op, target })
            }
        }
    }
}

impl Condition {
    pub fn matches(&self, record: &BookRecord) -> bool {
        match self {
            Condition::Title(needle) => record.title.to_lowercase().contains(needle.as_str()),
            Condition::Numeric { field, op, target } => {
                let value = match field {
                    NumericField::Rating => record.rating,
                    NumericField::Count => record.count as f64,
                };
                op.holds(value, *target)
            }
        }
    }
}

/// Parses a whole query. An empty query has no conditions and matches
/// everything.
pub fn parse_query(input: &str) -> Result<Vec<Condition>, QueryError> {
    input.split_whitespace().map(str::parse).collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortMode {
    /// Rating, then count, both descending.
    #[default]
    Rating,
    /// Count, then rating, both descending.
    Count,
    /// Catalog order.
    None,
}

impl FromStr for SortMode {
    type Err = QueryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "rating" => Ok(SortMode::Rating),
            "count" => Ok(SortMode::Count),
            "none" => Ok(SortMode::None),
            other => Err(QueryError::UnknownSort(other.to_string())),
        }
    }
}

fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

/// Records matching every condition, sorted by `sort`. Ties keep catalog
/// order.
pub fn run_query(
    records: Vec<BookRecord>,
    conditions: &[Condition],
    sort: SortMode,
) -> Vec<BookRecord> {
    let mut matched: Vec<BookRecord> = records
        .into_iter()
        .filter(|record| conditions.iter().all(|condition| condition.matches(record)))
        .collect();

    match sort {
        SortMode::Rating => matched.sort_by(|a, b| {
            descending(a.rating, b.rating).then_with(|| b.count.cmp(&a.count))
        }),
        SortMode::Count => matched.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| descending(a.rating, b.rating))
        }),
        SortMode::None => {}
    }
    matched
}

/// Counts of ten thousand or more are shown in 万.
pub fn format_count(count: u64) -> String {
    if count >= 10_000 {
        format!("{:.1}万", count as f64 / 10_000.0)
    } else {
        count.to_string()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogShape {
    Bare(Vec<BookRecord>),
    Single {
        items: Vec<BookRecord>,
    },
    Catalog {
        #[serde(default)]
        douban: Vec<BookRecord>,
        #[serde(default)]
        goodreads: Vec<BookRecord>,
    },
}

/// Reads the records of a generated payload: a bare array, a single-source
/// payload, or a two-source catalog (rating site first).
pub fn load_catalog(path: impl AsRef<Path>) -> Result<Vec<BookRecord>, PipelineError> {
    let text = fs::read_to_string(path)?;
    let records = match serde_json::from_str::<CatalogShape>(&text)? {
        CatalogShape::Bare(items) | CatalogShape::Single { items } => items,
        CatalogShape::Catalog {
            mut douban,
            goodreads,
        } => {
            douban.extend(goodreads);
            douban
        }
    };
    Ok(records)
}
