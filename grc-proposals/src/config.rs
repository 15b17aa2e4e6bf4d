// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};

/// Configuration for a proposal manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Record a new revision of the object after a proposal got applied.
    pub(crate) record_revision_on_apply: bool,

    /// Maximum number of object ids per batch query when warming up the snapshot cache.
    pub(crate) warm_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            record_revision_on_apply: true,
            warm_batch_size: 500,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_revision_on_apply(mut self, record: bool) -> Self {
        self.record_revision_on_apply = record;
        self
    }

    pub fn warm_batch_size(mut self, batch_size: usize) -> Self {
        self.warm_batch_size = batch_size.max(1);
        self
    }

    pub fn records_revision_on_apply(&self) -> bool {
        self.record_revision_on_apply
    }

    pub fn batch_size(&self) -> usize {
        self.warm_batch_size.max(1)
    }
}
