// SPDX-License-Identifier: MIT OR Apache-2.0

//! Immutable, timestamped content snapshots of governed objects.
use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::content::{ACCESS_CONTROL_LIST, Content};
use crate::identity::{ObjectKey, PersonId, RevisionId};
use crate::schema::ObjectSchema;

/// Snapshot of the full content of an object, created every time the object gets persisted.
///
/// Revisions are never mutated and never deleted, newer revisions supersede older ones. They are
/// ordered by creation time, ties are broken by id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    pub resource: ObjectKey,
    /// Creation time in microseconds since the UNIX epoch.
    pub created_at: u64,
    pub content: Content,
}

impl Revision {
    /// Compare two revisions by recency, the greater one is the later snapshot.
    pub fn cmp_recency(&self, other: &Self) -> Ordering {
        (self.created_at, self.id).cmp(&(other.created_at, other.id))
    }
}

/// Returns the latest of the given revisions.
pub fn latest<'a, I>(revisions: I) -> Option<&'a Revision>
where
    I: IntoIterator<Item = &'a Revision>,
{
    revisions
        .into_iter()
        .max_by(|a, b| a.cmp_recency(b))
}

/// Person fields which were used before access control lists existed, with the name of the role
/// which replaced them.
pub const LEGACY_ROLE_FIELDS: [(&str, &str); 5] = [
    ("principal_assessor", "Principal Assignees"),
    ("secondary_assessor", "Secondary Assignees"),
    ("contact", "Primary Contacts"),
    ("secondary_contact", "Secondary Contacts"),
    ("owners", "Admin"),
];

/// Derive the access control list of content written before access control lists existed.
///
/// Content which already has an access control list stays untouched. Otherwise an entry is
/// created for every legacy person field holding a person id, as long as the object type
/// declares the corresponding role. Returns `true` if the content was changed.
pub fn populate_acl(content: &mut Content, resource: &ObjectKey, schema: &ObjectSchema) -> bool {
    if content.contains(ACCESS_CONTROL_LIST) {
        return false;
    }

    let mut entries = Vec::new();
    for (field, role_name) in LEGACY_ROLE_FIELDS {
        let Some(role) = schema.role_by_name(role_name) else {
            continue;
        };

        for person_id in legacy_person_ids(content.get(field)) {
            entries.push(json!({
                "display_name": role.name,
                "ac_role_id": role.id,
                "object_type": resource.object_type,
                "object_id": resource.id,
                "person_id": person_id,
                "person": {
                    "id": person_id,
                    "type": "Person",
                },
            }));
        }
    }

    content.insert(ACCESS_CONTROL_LIST, Value::Array(entries));
    true
}

/// Fields which held a single link before reference urls became documents.
pub const LEGACY_URL_FIELDS: [&str; 2] = ["url", "reference_url"];

pub const REFERENCE_URL: &str = "reference_url";

/// Convert the legacy link fields of content into a list of reference url documents.
///
/// Content which already holds a document list or has no legacy link stays untouched. Empty
/// links are skipped. The
/// documents take the creation and modification time of the content, or the given timestamps
/// of the revision if the content has none. Returns `true` if the content was changed.
pub fn populate_reference_url(content: &mut Content, created_at: u64, updated_at: u64) -> bool {
    if matches!(content.get(REFERENCE_URL), Some(Value::Array(_)))
        || !LEGACY_URL_FIELDS
            .iter()
            .any(|field| matches!(content.get(field), Some(Value::String(_))))
    {
        return false;
    }

    let timestamp = |field: &str, fallback: u64| match content.get(field) {
        Some(Value::Null) | None => json!(fallback),
        Some(Value::String(value)) if value.is_empty() => json!(fallback),
        Some(value) => value.clone(),
    };
    let created_at = timestamp("created_at", created_at);
    let updated_at = timestamp("updated_at", updated_at);

    let documents: Vec<Value> = LEGACY_URL_FIELDS
        .iter()
        .filter_map(|field| match content.get(field) {
            Some(Value::String(link)) if !link.is_empty() => Some(json!({
                "display_name": link,
                "document_type": "REFERENCE_URL",
                "id": null,
                "link": link,
                "title": link,
                "created_at": created_at,
                "updated_at": updated_at,
            })),
            _ => None,
        })
        .collect();

    content.insert(REFERENCE_URL, Value::Array(documents));
    true
}

// Legacy fields either hold one `{id}` person reference or a list of them.
fn legacy_person_ids(value: Option<&Value>) -> Vec<PersonId> {
    let person_id = |value: &Value| {
        value
            .get("id")
            .and_then(|id| PersonId::deserialize(id.clone()).ok())
    };

    match value {
        Some(Value::Array(people)) => people.iter().filter_map(person_id).collect(),
        Some(value @ Value::Object(_)) => person_id(value).into_iter().collect(),
        _ => Vec::new(),
    }
}
