//! The stage contract shared by both pipelines.
//!
//! A [`Pipeline`] stage receives one item at a time and either passes it on
//! (possibly transformed), drops it by returning `Ok(None)`, or fails. Stages
//! are composed into a [`PipelineChain`], which feeds each item through the
//! stages in order and stops at the first one that drops it.
//!
//! Stages take `&self`; the ones that accumulate state use interior
//! mutability so a chain can be driven through shared references.

use crate::error::PipelineError;
use crate::item::ScrapedItem;
use async_trait::async_trait;
use tracing::{debug, info};

/// A single processing stage: filtering, deduplicating, appending to a file,
/// collecting for output.
#[async_trait]
pub trait Pipeline<I: ScrapedItem>: Send + Sync + 'static {
    /// Returns the name of the pipeline.
    fn name(&self) -> &str;

    /// Processes a single item. Returning `Ok(None)` drops it.
    async fn process_item(&self, item: I) -> Result<Option<I>, PipelineError>;

    /// Called once after the last item. Writers flush or persist here.
    async fn close(&self) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// An ordered list of stages.
pub struct PipelineChain<I: ScrapedItem> {
    stages: Vec<Box<dyn Pipeline<I>>>,
}

impl<I: ScrapedItem> Default for PipelineChain<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ScrapedItem> PipelineChain<I> {
    pub fn new() -> Self {
        PipelineChain { stages: Vec::new() }
    }

    pub fn add_pipeline(mut self, stage: impl Pipeline<I>) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Runs one item through every stage. `None` means some stage dropped it.
    pub async fn process_item(&self, item: I) -> Result<Option<I>, PipelineError> {
        let mut current = item;
        for stage in &self.stages {
            match stage.process_item(current).await? {
                Some(next) => current = next,
                None => {
                    debug!("Item dropped by {}", stage.name());
                    return Ok(None);
                }
            }
        }
        Ok(Some(current))
    }

    /// Runs every item through the chain and returns the survivors in order.
    pub async fn process_all(
        &self,
        items: impl IntoIterator<Item = I>,
    ) -> Result<Vec<I>, PipelineError> {
        let mut kept = Vec::new();
        for item in items {
            if let Some(item) = self.process_item(item).await? {
                kept.push(item);
            }
        }
        Ok(kept)
    }

    /// Closes every stage in order. The first failure is returned after all
    /// stages have had a chance to close.
    pub async fn close(&self) -> Result<(), PipelineError> {
        let mut first_error = None;
        for stage in &self.stages {
            info!("Closing {}.", stage.name());
            if let Err(e) = stage.close().await {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
