// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

/// Transaction provider of a store.
///
/// One logical operation (building a diff and persisting a proposal, applying a proposal) runs
/// inside one transaction: all of its reads observe the same state and all of its writes are
/// committed or rolled back together.
///
/// Holding the returned permit makes "being inside a transaction" explicit. It does not protect
/// from misuse, a permit should never be shared across unrelated operations.
pub trait Transaction {
    type Error: Error;

    type Permit;

    /// Begins a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Permit, Self::Error>>;

    /// Rolls back the transaction and with that all uncommitted changes.
    fn rollback(&self, permit: Self::Permit) -> impl Future<Output = Result<(), Self::Error>>;

    /// Commits the transaction.
    fn commit(&self, permit: Self::Permit) -> impl Future<Output = Result<(), Self::Error>>;
}
