// SPDX-License-Identifier: MIT OR Apache-2.0

use std::convert::Infallible;

use crate::objects::ObjectMemoryStore;
use crate::people::PersonMemoryStore;
use crate::proposals::ProposalMemoryStore;
use crate::revisions::RevisionMemoryStore;
use crate::traits::Transaction;

/// In-memory store.
///
/// This does not persist data permamently, all changes are lost when the process ends. Use this
/// only in development or test contexts.
///
/// Transactions are emulated with a checkpoint of the whole state taken on `begin`, `rollback`
/// restores it. Transactions are not nested: beginning a transaction while another one is running
/// keeps the earlier checkpoint.
#[derive(Clone, Debug)]
pub struct MemoryStore {
    pub revisions: RevisionMemoryStore,
    pub people: PersonMemoryStore,
    pub proposals: ProposalMemoryStore,
    pub objects: ObjectMemoryStore,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            revisions: RevisionMemoryStore::new(),
            people: PersonMemoryStore::new(),
            proposals: ProposalMemoryStore::new(),
            objects: ObjectMemoryStore::new(),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Permit held while a transaction on the in-memory store is running.
#[derive(Debug)]
pub struct MemoryPermit {
    _private: (),
}

impl Transaction for MemoryStore {
    type Error = Infallible;

    type Permit = MemoryPermit;

    async fn begin(&self) -> Result<MemoryPermit, Infallible> {
        self.revisions.save_checkpoint();
        self.people.save_checkpoint();
        self.proposals.save_checkpoint();
        self.objects.save_checkpoint();
        Ok(MemoryPermit { _private: () })
    }

    async fn rollback(&self, permit: MemoryPermit) -> Result<(), Infallible> {
        self.revisions.restore_checkpoint();
        self.people.restore_checkpoint();
        self.proposals.restore_checkpoint();
        self.objects.restore_checkpoint();
        drop(permit);
        Ok(())
    }

    async fn commit(&self, permit: MemoryPermit) -> Result<(), Infallible> {
        self.revisions.discard_checkpoint();
        self.people.discard_checkpoint();
        self.proposals.discard_checkpoint();
        self.objects.discard_checkpoint();
        drop(permit);
        Ok(())
    }
}

// Trait implementations are in the regarding modules, see for example `revisions` or `objects`.
