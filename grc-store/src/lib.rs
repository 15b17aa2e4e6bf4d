// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence interfaces for revision snapshots, the people directory, proposals and the live
//! state of governed objects.
//!
//! Every concern is expressed as an async trait with an associated error type. Two backends are
//! provided: `MemoryStore` for tests and development and `SqliteStore` for persistent storage.
//! Both implement `Transaction`, which groups reads and writes of one logical operation.
#[cfg(feature = "memory")]
mod checkpoint;
#[cfg(feature = "memory")]
pub mod memory;
pub mod objects;
pub mod people;
pub mod proposals;
pub mod revisions;
#[cfg(feature = "sqlite")]
pub mod sqlite;
#[cfg(any(test, feature = "test_utils"))]
mod test_utils;
pub mod traits;

#[cfg(feature = "memory")]
pub use memory::MemoryStore;
pub use objects::ObjectStore;
pub use people::PersonStore;
pub use proposals::ProposalStore;
pub use revisions::RevisionStore;
#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteError, SqliteStore, SqliteStoreBuilder};
pub use traits::Transaction;
