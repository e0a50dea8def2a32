//! Stage that drops repeated records within one run.
//!
//! Exports occasionally list the same book twice (re-imports, merged
//! shelves). This stage keeps the first occurrence and drops later ones:
//! - the identity of an item is a hash over a configured set of
//!   `unique_fields` of its JSON form (for catalog records, `"i"`);
//! - hashes seen so far are kept for the lifetime of the stage, so one
//!   instance must be used per source.

use crate::error::PipelineError;
use crate::item::ScrapedItem;
use crate::pipeline::Pipeline;
use async_trait::async_trait;
use dashmap::DashSet;
use seahash::SeaHasher;
use std::hash::Hasher;
use std::marker::PhantomData;
use tracing::{debug, info};

/// A pipeline that filters out duplicate items based on a configurable set of fields.
pub struct DeduplicationPipeline<I: ScrapedItem> {
    unique_fields: Vec<String>,
    seen_hashes: DashSet<u64>,
    _phantom: PhantomData<I>,
}

impl<I: ScrapedItem> DeduplicationPipeline<I> {
    /// Creates a new `DeduplicationPipeline` with a specified set of unique fields.
    pub fn new(unique_fields: &[&str]) -> Self {
        info!(
            "Initializing DeduplicationPipeline with unique fields: {:?}",
            unique_fields
        );
        DeduplicationPipeline {
            unique_fields: unique_fields.iter().map(|&s| s.to_string()).collect(),
            seen_hashes: DashSet::new(),
            _phantom: PhantomData,
        }
    }

    /// Number of distinct items passed so far.
    pub fn seen_count(&self) -> usize {
        self.seen_hashes.len()
    }

    /// Generates a hash for an item based on its unique fields.
    ///
    /// Numbers and strings hash differently (`1` is not `"1"`), which keeps
    /// numeric rating-site ids distinct from textual tracker ids.
    fn generate_hash(&self, item: &I) -> Result<u64, PipelineError> {
        let item_value = item.to_json_value();
        let map = item_value.as_object().ok_or_else(|| {
            PipelineError::ItemError("Item for deduplication must be a JSON object.".to_string())
        })?;

        let mut hasher = SeaHasher::new();
        for field_name in &self.unique_fields {
            hasher.write(field_name.as_bytes());
            match map.get(field_name) {
                Some(value) => hasher.write(value.to_string().as_bytes()),
                None => hasher.write(b""),
            }
        }
        Ok(hasher.finish())
    }
}

#[async_trait]
impl<I: ScrapedItem> Pipeline<I> for DeduplicationPipeline<I> {
    fn name(&self) -> &str {
        "DeduplicationPipeline"
    }

    async fn process_item(&self, item: I) -> Result<Option<I>, PipelineError> {
        let item_hash = self.generate_hash(&item)?;

        if self.seen_hashes.insert(item_hash) {
            Ok(Some(item))
        } else {
            debug!("Duplicate item detected, dropping: {:?}", item);
            Ok(None)
        }
    }
}
