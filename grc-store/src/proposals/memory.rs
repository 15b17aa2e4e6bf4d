// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;
use std::convert::Infallible;

use grc_core::{NewProposal, ObjectKey, Proposal, ProposalId, ProposalState};

use crate::checkpoint::Checkpointed;
use crate::memory::MemoryStore;
use crate::proposals::ProposalStore;

#[derive(Clone, Debug, Default)]
struct ProposalTable {
    proposals: BTreeMap<ProposalId, Proposal>,
    next_id: u64,
}

#[derive(Clone, Debug)]
pub struct ProposalMemoryStore {
    inner: Checkpointed<ProposalTable>,
}

impl ProposalMemoryStore {
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

impl Default for ProposalMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProposalStore for MemoryStore {
    type Error = Infallible;

    async fn insert_proposal(&self, proposal: NewProposal) -> Result<Proposal, Self::Error> {
        let mut table = self.proposals.inner.state().borrow_mut();
        table.next_id += 1;
        let proposal = Proposal::from_new(ProposalId::new(table.next_id), proposal);
        table.proposals.insert(proposal.id, proposal.clone());
        Ok(proposal)
    }

    async fn proposal(&self, id: ProposalId) -> Result<Option<Proposal>, Self::Error> {
        let table = self.proposals.inner.state().borrow();
        Ok(table.proposals.get(&id).cloned())
    }

    async fn proposals_for(&self, object: &ObjectKey) -> Result<Vec<Proposal>, Self::Error> {
        let table = self.proposals.inner.state().borrow();
        Ok(table
            .proposals
            .values()
            .filter(|proposal| &proposal.object == object)
            .cloned()
            .collect())
    }

    async fn update_proposal(
        &self,
        proposal: &Proposal,
        expected: ProposalState,
    ) -> Result<bool, Self::Error> {
        let mut table = self.proposals.inner.state().borrow_mut();
        let Some(stored) = table.proposals.get_mut(&proposal.id) else {
            return Ok(false);
        };

        if stored.state != expected {
            return Ok(false);
        }

        stored.state = proposal.state;
        stored.applied_by = proposal.applied_by;
        stored.apply_reason = proposal.apply_reason.clone();
        stored.declined_by = proposal.declined_by;
        stored.decline_reason = proposal.decline_reason.clone();
        Ok(true)
    }
}
