//! Paginated access to an account's "done" book interests.

use crate::error::PipelineError;
use crate::item::Interest;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One page of the interests endpoint. The endpoint lists interests
/// most-recently-marked first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterestPage {
    /// Server-reported number of interests, absent on some error shapes.
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub interests: Vec<Interest>,
}

/// Something that can return the interests window `[start, start + count)`.
#[async_trait]
pub trait InterestSource: Send + Sync {
    async fn fetch_page(&self, start: usize, count: usize) -> Result<InterestPage, PipelineError>;
}
