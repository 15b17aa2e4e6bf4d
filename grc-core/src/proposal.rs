// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change proposals and their lifecycle.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diff::DiffRecord;
use crate::identity::{ObjectKey, PersonId, ProposalId};

/// Lifecycle state of a proposal.
///
/// ```text
/// PROPOSED --> APPLIED
///     |
///     +------> DECLINED
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalState {
    Proposed,
    Applied,
    Declined,
}

impl ProposalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalState::Proposed => "proposed",
            ProposalState::Applied => "applied",
            ProposalState::Declined => "declined",
        }
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProposalState {
    type Err = ProposalStateError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "proposed" => Ok(ProposalState::Proposed),
            "applied" => Ok(ProposalState::Applied),
            "declined" => Ok(ProposalState::Declined),
            _ => Err(ProposalStateError::UnknownState(value.to_string())),
        }
    }
}

/// Proposal which did not get persisted yet and has no id assigned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewProposal {
    pub object: ObjectKey,
    pub author: PersonId,
    pub agenda: String,
    pub content: DiffRecord,
    pub created_at: u64,
}

/// Author-attributed change set awaiting application to an object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub object: ObjectKey,
    pub author: PersonId,
    /// Free-text rationale of the author.
    pub agenda: String,
    pub content: DiffRecord,
    pub state: ProposalState,
    pub created_at: u64,
    pub applied_by: Option<PersonId>,
    pub apply_reason: Option<String>,
    pub declined_by: Option<PersonId>,
    pub decline_reason: Option<String>,
}

impl Proposal {
    /// Turn a new proposal into a persisted one in `PROPOSED` state.
    pub fn from_new(id: ProposalId, proposal: NewProposal) -> Self {
        Self {
            id,
            object: proposal.object,
            author: proposal.author,
            agenda: proposal.agenda,
            content: proposal.content,
            state: ProposalState::Proposed,
            created_at: proposal.created_at,
            applied_by: None,
            apply_reason: None,
            declined_by: None,
            decline_reason: None,
        }
    }

    pub fn is_proposed(&self) -> bool {
        self.state == ProposalState::Proposed
    }

    /// Transition from `PROPOSED` to `APPLIED`.
    pub fn apply(
        &mut self,
        applied_by: PersonId,
        reason: Option<String>,
    ) -> Result<(), ProposalStateError> {
        self.transition(ProposalState::Applied)?;
        self.applied_by = Some(applied_by);
        self.apply_reason = reason;
        Ok(())
    }

    /// Transition from `PROPOSED` to `DECLINED`.
    pub fn decline(
        &mut self,
        declined_by: PersonId,
        reason: Option<String>,
    ) -> Result<(), ProposalStateError> {
        self.transition(ProposalState::Declined)?;
        self.declined_by = Some(declined_by);
        self.decline_reason = reason;
        Ok(())
    }

    fn transition(&mut self, next: ProposalState) -> Result<(), ProposalStateError> {
        if !self.is_proposed() {
            return Err(ProposalStateError::IllegalTransition {
                id: self.id,
                state: self.state,
                next,
            });
        }
        self.state = next;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ProposalStateError {
    #[error("proposal {id} is {state} and can't become {next}")]
    IllegalTransition {
        id: ProposalId,
        state: ProposalState,
        next: ProposalState,
    },

    #[error("unknown proposal state '{0}'")]
    UnknownState(String),
}
