// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeSet;
use std::convert::Infallible;

use grc_core::{Content, ObjectId, ObjectKey, Revision, RevisionId};

use crate::checkpoint::Checkpointed;
use crate::memory::MemoryStore;
use crate::revisions::RevisionStore;

#[derive(Clone, Debug, Default)]
struct RevisionState {
    revisions: Vec<Revision>,
    next_id: u64,
}

#[derive(Clone, Debug)]
pub struct RevisionMemoryStore {
    inner: Checkpointed<RevisionState>,
}

impl RevisionMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Checkpointed::new(),
        }
    }

    pub(crate) fn save_checkpoint(&self) {
        self.inner.save();
    }

    pub(crate) fn restore_checkpoint(&self) {
        self.inner.restore();
    }

    pub(crate) fn discard_checkpoint(&self) {
        self.inner.discard();
    }
}

impl Default for RevisionMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RevisionStore for MemoryStore {
    type Error = Infallible;

    async fn insert_revision(
        &self,
        resource: &ObjectKey,
        created_at: u64,
        content: &Content,
    ) -> Result<RevisionId, Self::Error> {
        let mut state = self.revisions.inner.state().borrow_mut();
        state.next_id += 1;
        let id = RevisionId::new(state.next_id);
        state.revisions.push(Revision {
            id,
            resource: resource.clone(),
            created_at,
            content: content.clone(),
        });
        Ok(id)
    }

    async fn latest_revision(&self, resource: &ObjectKey) -> Result<Option<Revision>, Self::Error> {
        let state = self.revisions.inner.state().borrow();
        let revisions = state
            .revisions
            .iter()
            .filter(|revision| &revision.resource == resource);
        Ok(grc_core::revision::latest(revisions).cloned())
    }

    async fn latest_revisions(
        &self,
        object_type: &str,
        ids: &[ObjectId],
    ) -> Result<Vec<Revision>, Self::Error> {
        let state = self.revisions.inner.state().borrow();
        let ids: BTreeSet<ObjectId> = ids.iter().copied().collect();

        let mut candidates: Vec<&Revision> = state
            .revisions
            .iter()
            .filter(|revision| {
                revision.resource.object_type == object_type && ids.contains(&revision.resource.id)
            })
            .collect();

        // Sort by identity first and recency second, then only keep the first row of every
        // identity.
        candidates.sort_by(|a, b| {
            a.resource
                .id
                .cmp(&b.resource.id)
                .then_with(|| a.resource.object_type.cmp(&b.resource.object_type))
                .then_with(|| b.cmp_recency(a))
        });

        let mut result: Vec<Revision> = Vec::new();
        for revision in candidates {
            if result
                .last()
                .is_some_and(|last| last.resource == revision.resource)
            {
                continue;
            }
            result.push(revision.clone());
        }

        Ok(result)
    }

    async fn revisions(&self, resource: &ObjectKey) -> Result<Vec<Revision>, Self::Error> {
        let state = self.revisions.inner.state().borrow();
        let mut revisions: Vec<Revision> = state
            .revisions
            .iter()
            .filter(|revision| &revision.resource == resource)
            .cloned()
            .collect();
        revisions.sort_by(|a, b| a.cmp_recency(b));
        Ok(revisions)
    }
}
