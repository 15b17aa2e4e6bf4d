// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error as StdError;

use grc_core::{
    Content, NewProposal, ObjectKey, PersonId, Proposal, ProposalId, ProposalState,
    ProposalStateError, RevisionId, SchemaRegistry,
};
use grc_store::{ObjectStore, PersonStore, ProposalStore, RevisionStore, Transaction};
use thiserror::Error;
use tracing::{debug, warn};

use crate::apply::apply_diff;
use crate::cache::SnapshotCache;
use crate::config::Config;
use crate::diff::{DiffError, build_diff};
use crate::utils::current_timestamp;

/// Content submitted by an author to change an object.
#[derive(Clone, Debug, PartialEq)]
pub struct ProposalDraft {
    pub object: ObjectKey,
    pub author: PersonId,
    pub agenda: String,
    pub content: Content,
}

impl ProposalDraft {
    pub fn new(object: ObjectKey, author: PersonId, agenda: &str, content: Content) -> Self {
        Self {
            object,
            author,
            agenda: agenda.to_string(),
            content,
        }
    }
}

/// Create, apply and decline proposals.
///
/// Every operation runs inside its own store transaction with a fresh snapshot cache. Failing
/// operations roll back, nothing of their writes remains.
///
/// Diffs are computed once when a proposal is created. Proposals against the same object are
/// not checked against each other, applying an older proposal after a newer one may revert
/// parts of the newer one.
#[derive(Debug)]
pub struct ProposalManager<S> {
    store: S,
    schemas: SchemaRegistry,
    config: Config,
}

impl<S, E> ProposalManager<S>
where
    S: RevisionStore<Error = E>
        + PersonStore<Error = E>
        + ProposalStore<Error = E>
        + ObjectStore<Error = E>
        + Transaction<Error = E>,
    E: StdError,
{
    pub fn new(store: S, schemas: SchemaRegistry, config: Config) -> Self {
        Self {
            store,
            schemas,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compare the drafted content against the latest revision of its object and persist the
    /// resulting diff as a new proposal.
    pub async fn propose(&self, draft: ProposalDraft) -> Result<Proposal, ManagerError<E>> {
        self.transaction(async move || {
            let mut cache = SnapshotCache::new(&self.schemas, self.config.batch_size());
            self.create_proposal(&mut cache, draft).await
        })
        .await
    }

    /// Persist many proposals at once.
    ///
    /// The latest revisions of all targeted objects are loaded with batch queries before any
    /// diff is built. Either all proposals are persisted or none.
    pub async fn propose_many(
        &self,
        drafts: Vec<ProposalDraft>,
    ) -> Result<Vec<Proposal>, ManagerError<E>> {
        self.transaction(async move || {
            let mut cache = SnapshotCache::new(&self.schemas, self.config.batch_size());
            for draft in &drafts {
                cache.mark(&draft.object);
            }
            cache.rewarm(&self.store).await?;

            let mut proposals = Vec::with_capacity(drafts.len());
            for draft in drafts {
                proposals.push(self.create_proposal(&mut cache, draft).await?);
            }
            Ok(proposals)
        })
        .await
    }

    /// Apply the diff of a proposal to the live state of its object.
    ///
    /// Fails if the proposal is not in `PROPOSED` state or if the object does not exist. The
    /// diff is applied as it was computed, it is not compared against the current state again.
    pub async fn apply(
        &self,
        id: ProposalId,
        applied_by: PersonId,
        reason: Option<String>,
    ) -> Result<Proposal, ManagerError<E>> {
        self.transaction(async move || {
            let mut proposal = self.load_proposal(id).await?;
            proposal.apply(applied_by, reason)?;

            let key = proposal.object.clone();
            if self
                .store
                .object(&key)
                .await
                .map_err(ManagerError::Store)?
                .is_none()
            {
                return Err(ManagerError::UnknownObject(key));
            }

            let report = apply_diff(&self.store, &key, &proposal.content)
                .await
                .map_err(ManagerError::Store)?;

            self.update_state(&proposal).await?;

            if self.config.records_revision_on_apply() {
                self.insert_revision(&key).await?;
            }

            debug!(
                proposal = %id,
                object = %key,
                applied_by = %applied_by,
                changes = proposal.content.len(),
                noop = report.is_noop(),
                "applied proposal"
            );

            Ok(proposal)
        })
        .await
    }

    /// Reject a proposal without touching its object.
    pub async fn decline(
        &self,
        id: ProposalId,
        declined_by: PersonId,
        reason: Option<String>,
    ) -> Result<Proposal, ManagerError<E>> {
        self.transaction(async move || {
            let mut proposal = self.load_proposal(id).await?;
            proposal.decline(declined_by, reason)?;
            self.update_state(&proposal).await?;

            debug!(
                proposal = %id,
                object = %proposal.object,
                declined_by = %declined_by,
                "declined proposal"
            );

            Ok(proposal)
        })
        .await
    }

    /// Record the live state of an object as its newest revision.
    pub async fn record_revision(&self, key: &ObjectKey) -> Result<RevisionId, ManagerError<E>> {
        self.transaction(async || self.insert_revision(key).await)
            .await
    }

    async fn create_proposal(
        &self,
        cache: &mut SnapshotCache<'_>,
        draft: ProposalDraft,
    ) -> Result<Proposal, ManagerError<E>> {
        let schema = self
            .schemas
            .get(&draft.object.object_type)
            .ok_or_else(|| DiffError::UnknownObjectType(draft.object.object_type.clone()))?;

        let diff = build_diff(cache, &self.store, schema, &draft.object, &draft.content).await?;
        if diff.is_empty() {
            debug!(object = %draft.object, "proposal without changes");
        }

        let proposal = self
            .store
            .insert_proposal(NewProposal {
                object: draft.object,
                author: draft.author,
                agenda: draft.agenda,
                content: diff,
                created_at: current_timestamp(),
            })
            .await
            .map_err(ManagerError::Store)?;

        debug!(
            proposal = %proposal.id,
            object = %proposal.object,
            author = %proposal.author,
            changes = proposal.content.len(),
            "created proposal"
        );

        Ok(proposal)
    }

    async fn load_proposal(&self, id: ProposalId) -> Result<Proposal, ManagerError<E>> {
        self.store
            .proposal(id)
            .await
            .map_err(ManagerError::Store)?
            .ok_or(ManagerError::UnknownProposal(id))
    }

    /// Persist the transitioned state, given the proposal was still `PROPOSED` in the store.
    async fn update_state(&self, proposal: &Proposal) -> Result<(), ManagerError<E>> {
        let updated = self
            .store
            .update_proposal(proposal, ProposalState::Proposed)
            .await
            .map_err(ManagerError::Store)?;

        if !updated {
            return Err(ManagerError::StateConflict(proposal.id));
        }

        Ok(())
    }

    async fn insert_revision(&self, key: &ObjectKey) -> Result<RevisionId, ManagerError<E>> {
        let object = self
            .store
            .object(key)
            .await
            .map_err(ManagerError::Store)?
            .ok_or_else(|| ManagerError::UnknownObject(key.clone()))?;

        let id = self
            .store
            .insert_revision(key, current_timestamp(), &object.to_content())
            .await
            .map_err(ManagerError::Store)?;

        debug!(object = %key, revision = %id, "recorded revision");

        Ok(id)
    }

    /// Run an operation inside a transaction, commit if it succeeded and roll back otherwise.
    async fn transaction<F, R>(&self, f: F) -> Result<R, ManagerError<E>>
    where
        F: AsyncFnOnce() -> Result<R, ManagerError<E>>,
    {
        let permit = self.store.begin().await.map_err(ManagerError::Store)?;

        match f().await {
            Ok(result) => {
                self.store
                    .commit(permit)
                    .await
                    .map_err(ManagerError::Store)?;
                Ok(result)
            }
            Err(err) => {
                warn!("rolling back failed operation: {err}");
                self.store
                    .rollback(permit)
                    .await
                    .map_err(ManagerError::Store)?;
                Err(err)
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum ManagerError<E> {
    #[error("{0}")]
    Diff(#[from] DiffError<E>),

    #[error(transparent)]
    State(#[from] ProposalStateError),

    #[error("proposal {0} is not in proposed state anymore")]
    StateConflict(ProposalId),

    #[error("proposal {0} does not exist")]
    UnknownProposal(ProposalId),

    #[error("object {0} does not exist")]
    UnknownObject(ObjectKey),

    #[error("{0}")]
    Store(E),
}
