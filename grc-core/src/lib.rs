// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data types of the governance record-keeping core: governed objects and their schema metadata,
//! revision snapshots, diff records and change proposals.
//!
//! Nothing in this crate performs I/O. Persistence interfaces live in `grc-store`, the diff and
//! proposal engine in `grc-proposals`.
pub mod attribute;
pub mod content;
pub mod diff;
pub mod identity;
pub mod object;
pub mod proposal;
pub mod revision;
pub mod schema;
mod serde;

pub use attribute::{AttributeKind, CustomAttributeDefinition, NormalizedValue};
pub use content::{
    AclRecord, AttributeRecord, Content, ContentError, MappedObject, ObjectRef, PersonRef,
};
pub use diff::{AclChange, AttributeChange, DiffRecord, ListChange, Person};
pub use identity::{AttributeId, ObjectId, ObjectKey, PersonId, ProposalId, RevisionId, RoleId};
pub use object::{AccessControlEntry, AttributeValue, LiveObject};
pub use proposal::{NewProposal, Proposal, ProposalState, ProposalStateError};
pub use revision::{Revision, populate_acl, populate_reference_url};
pub use schema::{
    AccessControlRole, FieldDescriptor, FieldKind, MetaInfo, ObjectSchema, SchemaRegistry,
};
