// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diff proposed content against the latest revision of governed objects and run the proposal
//! workflow on top of it.
//!
//! A proposal holds the diff between content submitted by an author and the latest revision of
//! the targeted object at that moment. Applying a proposal writes its diff into the live state of
//! the object, declining it only records the decision.
//!
//! `ProposalManager` is the entry point. The building blocks it is made of, the `SnapshotCache`,
//! `build_diff` and `apply_diff`, are public as well.
pub mod apply;
pub mod cache;
mod config;
pub mod diff;
mod manager;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
mod utils;

pub use apply::{ApplyReport, apply_diff};
pub use cache::SnapshotCache;
pub use config::Config;
pub use diff::{DiffError, build_diff};
pub use manager::{ManagerError, ProposalDraft, ProposalManager};
