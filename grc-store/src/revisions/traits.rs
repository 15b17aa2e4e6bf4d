// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use grc_core::{Content, ObjectId, ObjectKey, Revision, RevisionId};

/// Interface for the append-only log of revision snapshots.
///
/// Revisions are ordered by creation time, ties are broken by revision id. Stores assign
/// monotonically increasing ids, so a later insertion with the same timestamp is the later
/// revision.
pub trait RevisionStore {
    type Error: Error;

    /// Append a new revision for an object and return the id it was assigned.
    fn insert_revision(
        &self,
        resource: &ObjectKey,
        created_at: u64,
        content: &Content,
    ) -> impl Future<Output = Result<RevisionId, Self::Error>>;

    /// Returns the latest revision of an object or `None` if the object was never persisted.
    fn latest_revision(
        &self,
        resource: &ObjectKey,
    ) -> impl Future<Output = Result<Option<Revision>, Self::Error>>;

    /// Returns the latest revision for each of the given objects of one type.
    ///
    /// Objects without any revision are left out. The result needs to be identical to calling
    /// `latest_revision` for every id.
    fn latest_revisions(
        &self,
        object_type: &str,
        ids: &[ObjectId],
    ) -> impl Future<Output = Result<Vec<Revision>, Self::Error>>;

    /// Returns all revisions of an object, oldest first.
    fn revisions(
        &self,
        resource: &ObjectKey,
    ) -> impl Future<Output = Result<Vec<Revision>, Self::Error>>;
}
