// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use grc_core::{NewProposal, ObjectKey, Proposal, ProposalId, ProposalState};

/// Interface for persisting proposals and their state.
pub trait ProposalStore {
    type Error: Error;

    /// Persist a new proposal in `PROPOSED` state and return it with its assigned id.
    fn insert_proposal(
        &self,
        proposal: NewProposal,
    ) -> impl Future<Output = Result<Proposal, Self::Error>>;

    /// Returns a proposal or `None` if it does not exist.
    fn proposal(
        &self,
        id: ProposalId,
    ) -> impl Future<Output = Result<Option<Proposal>, Self::Error>>;

    /// Returns all proposals targeting an object, ordered by id.
    fn proposals_for(
        &self,
        object: &ObjectKey,
    ) -> impl Future<Output = Result<Vec<Proposal>, Self::Error>>;

    /// Overwrite the state and transition metadata of a proposal, but only if it is currently in
    /// the `expected` state.
    ///
    /// Returns `false` if the proposal does not exist or is in another state. The diff record of
    /// a proposal is never changed.
    fn update_proposal(
        &self,
        proposal: &Proposal,
        expected: ProposalState,
    ) -> impl Future<Output = Result<bool, Self::Error>>;
}
