//! Edition disambiguation against the read list.
//!
//! The rating site gives re-editions of a book their own identifiers under
//! the same title. When the account's read list names one of them, every
//! other identifier sharing that title is a different edition and is
//! dropped from the catalog.

use crate::error::PipelineError;
use crate::item::{BookId, BookRecord};
use crate::pipeline::Pipeline;
use crate::record::rating_site_key;
use crate::tabular::TabularSource;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Title to the authoritative identifiers carrying it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TitleIndex {
    titles: HashMap<String, HashSet<u64>>,
}

impl TitleIndex {
    /// Indexes the rows of `source` whose identifier is in `authoritative`.
    pub fn build(source: &TabularSource, authoritative: &HashSet<u64>) -> Self {
        let mut index = TitleIndex::default();
        if authoritative.is_empty() {
            return index;
        }
        for row in source.rows() {
            if let Some((id, title)) = rating_site_key(row) {
                if authoritative.contains(&id) {
                    index.insert(title, id);
                }
            }
        }
        info!(
            "Indexed {} authoritative titles from {} read ids",
            index.len(),
            authoritative.len()
        );
        index
    }

    pub fn insert(&mut self, title: &str, id: u64) {
        self.titles.entry(title.to_string()).or_default().insert(id);
    }

    pub fn ids_for(&self, title: &str) -> Option<&HashSet<u64>> {
        self.titles.get(title)
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

/// Keep a candidate unless its title is indexed under other identifiers only.
pub fn should_keep(index: &TitleIndex, id: &BookId, title: &str) -> bool {
    match index.ids_for(title) {
        None => true,
        Some(ids) => match id {
            BookId::Numeric(id) => ids.contains(id),
            BookId::Text(_) => false,
        },
    }
}

/// Stage wrapping [`should_keep`].
pub struct CrossReferenceFilter {
    index: TitleIndex,
}

impl CrossReferenceFilter {
    pub fn new(index: TitleIndex) -> Self {
        CrossReferenceFilter { index }
    }
}

#[async_trait]
impl Pipeline<BookRecord> for CrossReferenceFilter {
    fn name(&self) -> &str {
        "CrossReferenceFilter"
    }

    async fn process_item(&self, item: BookRecord) -> Result<Option<BookRecord>, PipelineError> {
        if should_keep(&self.index, &item.id, &item.title) {
            Ok(Some(item))
        } else {
            debug!("Dropping other edition {} of {:?}", item.id, item.title);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(pairs: &[(&str, u64)]) -> TitleIndex {
        let mut index = TitleIndex::default();
        for (title, id) in pairs {
            index.insert(title, *id);
        }
        index
    }

    #[test]
    fn colliding_title_with_foreign_id_is_dropped() {
        let index = index_of(&[("X", 10), ("X", 20)]);
        assert!(!should_keep(&index, &BookId::Numeric(30), "X"));
        assert!(should_keep(&index, &BookId::Numeric(10), "X"));
        assert!(should_keep(&index, &BookId::Numeric(20), "X"));
        assert!(should_keep(&index, &BookId::Numeric(30), "Y"));
    }

    #[test]
    fn build_only_indexes_authoritative_rows() {
        let source = TabularSource::from_text(
            "ID,Rating,Votes,Title\n10,8,1,X\n20,8,1,X\n30,8,1,X\n40,7,1,Z\nbad,1,1,X\n",
        )
        .unwrap();
        let authoritative: HashSet<u64> = [10, 20].into_iter().collect();

        let index = TitleIndex::build(&source, &authoritative);
        assert_eq!(index.len(), 1);
        assert_eq!(index.ids_for("X"), Some(&authoritative));
        assert_eq!(index.ids_for("Z"), None);
    }

    #[test]
    fn empty_authoritative_set_builds_empty_index() {
        let source = TabularSource::from_text("ID,Rating,Votes,Title\n10,8,1,X\n").unwrap();
        assert!(TitleIndex::build(&source, &HashSet::new()).is_empty());
    }

    #[tokio::test]
    async fn filter_stage_applies_the_rule() {
        let filter = CrossReferenceFilter::new(index_of(&[("X", 10)]));
        let candidate = |id| BookRecord {
            id: BookId::Numeric(id),
            rating: 7.0,
            count: 3,
            title: "X".to_string(),
            author: None,
            url: None,
        };
        assert!(filter.process_item(candidate(10)).await.unwrap().is_some());
        assert!(filter.process_item(candidate(30)).await.unwrap().is_none());
    }
}
