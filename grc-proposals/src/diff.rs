// SPDX-License-Identifier: MIT OR Apache-2.0

//! Compare proposed content against the latest revision of an object.
//!
//! Every section of a `DiffRecord` is generated independently. The section generators only look
//! at what the object schema declares, anything else in the proposed content is ignored.
use std::collections::{BTreeMap, BTreeSet};

use grc_core::{
    AclChange, AclRecord, AttributeChange, AttributeId, AttributeRecord, Content, ContentError,
    CustomAttributeDefinition, DiffRecord, FieldDescriptor, ListChange, MappedObject, ObjectId,
    ObjectKey, ObjectRef, ObjectSchema, PersonId, RoleId,
};
use grc_store::{PersonStore, RevisionStore};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::cache::SnapshotCache;

/// Build the diff between proposed content and the latest known content of an object.
///
/// The latest content is taken from the snapshot cache. Objects which were never persisted
/// compare against empty content, the diff then holds everything which was proposed.
pub async fn build_diff<S, E>(
    cache: &mut SnapshotCache<'_>,
    store: &S,
    schema: &ObjectSchema,
    key: &ObjectKey,
    proposed: &Content,
) -> Result<DiffRecord, DiffError<E>>
where
    S: RevisionStore<Error = E> + PersonStore<Error = E>,
{
    let current = cache.latest_content(store, key).await?.clone();
    let meta = schema.classify(key.id);

    let proposed_acl = proposed.access_control_list()?;
    let current_acl = current.access_control_list()?.unwrap_or_default();
    let proposed_cavs = proposed.custom_attribute_values()?;
    let current_cavs = current.custom_attribute_values()?.unwrap_or_default();

    let diff = DiffRecord {
        fields: generate_fields(&meta.fields, proposed, &current),
        access_control_list: generate_acl_diff(
            cache,
            store,
            proposed_acl.as_deref(),
            &current_acl,
        )
        .await?,
        custom_attribute_values: generate_cav_diff(
            cache,
            store,
            &meta.cads,
            proposed_cavs.as_deref(),
            &current_cavs,
        )
        .await?,
        mapping_fields: generate_single_mappings(&meta.mapping_fields, proposed, &current)?,
        mapping_list_fields: generate_list_mappings(&meta.mapping_list_fields, proposed, &current)?,
    };

    debug!(
        object = %key,
        fields = diff.fields.len(),
        access_control_list = diff.access_control_list.len(),
        custom_attribute_values = diff.custom_attribute_values.len(),
        mapping_fields = diff.mapping_fields.len(),
        mapping_list_fields = diff.mapping_list_fields.len(),
        "built diff"
    );

    Ok(diff)
}

/// Scalar fields which are proposed and differ from their current value.
///
/// Fields missing in the proposed content are never part of the diff, fields missing in the
/// current content compare as `null`.
pub fn generate_fields(
    fields: &[&FieldDescriptor],
    proposed: &Content,
    current: &Content,
) -> BTreeMap<String, Value> {
    fields
        .iter()
        .filter_map(|field| {
            let proposed_value = proposed.get(&field.name)?;
            let current_value = current.get(&field.name).unwrap_or(&Value::Null);
            (proposed_value != current_value)
                .then(|| (field.name.clone(), proposed_value.clone()))
        })
        .collect()
}

/// People added to and removed from every role.
///
/// Roles appearing in either list are compared. Without a proposed list nothing is compared,
/// an empty proposed list removes everyone.
pub async fn generate_acl_diff<S, E>(
    cache: &mut SnapshotCache<'_>,
    store: &S,
    proposed: Option<&[AclRecord]>,
    current: &[AclRecord],
) -> Result<BTreeMap<RoleId, AclChange>, DiffError<E>>
where
    S: PersonStore<Error = E>,
{
    let Some(proposed) = proposed else {
        return Ok(BTreeMap::new());
    };

    let by_role = |records: &[AclRecord]| {
        let mut roles: BTreeMap<RoleId, BTreeSet<PersonId>> = BTreeMap::new();
        for record in records {
            roles
                .entry(record.ac_role_id)
                .or_default()
                .insert(record.person.id);
        }
        roles
    };

    let proposed = by_role(proposed);
    let current = by_role(current);
    let empty = BTreeSet::new();

    let roles: BTreeSet<RoleId> = proposed.keys().chain(current.keys()).copied().collect();

    let mut diff = BTreeMap::new();
    for role_id in roles {
        let proposed_people = proposed.get(&role_id).unwrap_or(&empty);
        let current_people = current.get(&role_id).unwrap_or(&empty);

        let added: BTreeSet<PersonId> = proposed_people
            .difference(current_people)
            .copied()
            .collect();
        let deleted: BTreeSet<PersonId> = current_people
            .difference(proposed_people)
            .copied()
            .collect();

        if added.is_empty() && deleted.is_empty() {
            continue;
        }

        diff.insert(
            role_id,
            AclChange {
                added: cache.people(store, &added).await?,
                deleted: cache.people(store, &deleted).await?,
            },
        );
    }

    Ok(diff)
}

/// New values of custom attributes applicable to the object.
///
/// Definitions without a proposed value are skipped. Values are normalized according to the
/// attribute kind on both sides, a definition without a current value compares against its
/// default.
pub async fn generate_cav_diff<S, E>(
    cache: &mut SnapshotCache<'_>,
    store: &S,
    cads: &[&CustomAttributeDefinition],
    proposed: Option<&[AttributeRecord]>,
    current: &[AttributeRecord],
) -> Result<BTreeMap<AttributeId, AttributeChange>, DiffError<E>>
where
    S: PersonStore<Error = E>,
{
    let Some(proposed) = proposed else {
        return Ok(BTreeMap::new());
    };

    // Later records win if an attribute is listed more than once.
    let proposed: BTreeMap<AttributeId, &AttributeRecord> = proposed
        .iter()
        .map(|record| (record.attribute_id, record))
        .collect();
    let current: BTreeMap<AttributeId, &AttributeRecord> = current
        .iter()
        .map(|record| (record.attribute_id, record))
        .collect();

    let mut diff = BTreeMap::new();
    for cad in cads {
        let Some(proposed_record) = proposed.get(&cad.id) else {
            continue;
        };

        let proposed_value = (
            cad.kind.normalize(&proposed_record.attribute_value),
            proposed_record.attribute_object_id,
        );
        let current_value = match current.get(&cad.id) {
            Some(record) => (
                cad.kind.normalize(&record.attribute_value),
                record.attribute_object_id,
            ),
            None => (cad.normalized_default(), None),
        };

        if proposed_value == current_value {
            continue;
        }

        let (value, person_id) = proposed_value;
        let attribute_object = match person_id {
            Some(person_id) => Some(cache.person(store, person_id).await?),
            None => None,
        };

        diff.insert(
            cad.id,
            AttributeChange {
                attribute_value: value.to_text(),
                attribute_object,
            },
        );
    }

    Ok(diff)
}

/// New targets of single mapping fields.
///
/// A missing or null target counts as "nothing mapped". Unmapping is recorded as `None`, a
/// changed target with the full proposed reference. Targets with the same id are equal.
pub fn generate_single_mappings(
    fields: &[&FieldDescriptor],
    proposed: &Content,
    current: &Content,
) -> Result<BTreeMap<String, Option<ObjectRef>>, ContentError> {
    let mut diff = BTreeMap::new();

    for field in fields {
        if !proposed.contains(&field.name) {
            continue;
        }

        let proposed_target = proposed.mapping(&field.name)?.unwrap_or_default();
        let current_target = current.mapping(&field.name)?.unwrap_or_default();

        if proposed_target == current_target {
            continue;
        }

        if proposed_target.id.is_none() {
            diff.insert(field.name.clone(), None);
        } else if current_target.id.is_none() || proposed_target.id != current_target.id {
            diff.insert(field.name.clone(), Some(proposed_target));
        }
    }

    Ok(diff)
}

/// Records added to and removed from list mapping fields, compared by id.
///
/// A null list counts as empty. The first record wins if an id is listed more than once.
pub fn generate_list_mappings(
    fields: &[&FieldDescriptor],
    proposed: &Content,
    current: &Content,
) -> Result<BTreeMap<String, ListChange>, ContentError> {
    let by_id = |records: Vec<MappedObject>| {
        let mut map: BTreeMap<ObjectId, MappedObject> = BTreeMap::new();
        for record in records {
            map.entry(record.id).or_insert(record);
        }
        map
    };

    let mut diff = BTreeMap::new();

    for field in fields {
        if !proposed.contains(&field.name) {
            continue;
        }

        let proposed_records = by_id(proposed.mapping_list(&field.name)?.unwrap_or_default());
        let current_records = by_id(current.mapping_list(&field.name)?.unwrap_or_default());

        let change = ListChange {
            added: proposed_records
                .iter()
                .filter(|(id, _)| !current_records.contains_key(id))
                .map(|(_, record)| record.clone())
                .collect(),
            deleted: current_records
                .iter()
                .filter(|(id, _)| !proposed_records.contains_key(id))
                .map(|(_, record)| record.clone())
                .collect(),
        };

        if !change.is_empty() {
            diff.insert(field.name.clone(), change);
        }
    }

    Ok(diff)
}

#[derive(Debug, Error)]
pub enum DiffError<E> {
    #[error("{0}")]
    Store(E),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("no schema known for object type '{0}'")]
    UnknownObjectType(String),

    #[error("person {0} is referenced but does not exist")]
    UnknownPerson(PersonId),
}

#[cfg(test)]
mod tests {
    use grc_core::{Content, ObjectId, ObjectRef, ObjectSchema};
    use serde_json::json;

    use super::{generate_fields, generate_list_mappings, generate_single_mappings};

    fn content(value: serde_json::Value) -> Content {
        Content::from_value(value).unwrap()
    }

    fn schema() -> ObjectSchema {
        ObjectSchema::new("Control")
            .with_field("title")
            .with_field("description")
            .with_field("status")
            .with_mapping("document")
            .with_mapping("contract")
            .with_mapping("policy")
            .with_mapping_list("documents")
            .with_mapping_list("markets")
    }

    #[test]
    fn fields() {
        let schema = schema();
        let meta = schema.classify(ObjectId::new(1));

        let current = content(json!({ "title": "Old", "status": "Draft" }));
        let proposed = content(json!({
            "title": "New",
            "status": "Draft",
            "description": null,
            "undeclared": "ignored",
        }));

        let diff = generate_fields(&meta.fields, &proposed, &current);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff["title"], json!("New"));

        // Omitted fields are never removed.
        let diff = generate_fields(&meta.fields, &content(json!({})), &current);
        assert!(diff.is_empty());
    }

    #[test]
    fn single_mappings() {
        let schema = schema();
        let meta = schema.classify(ObjectId::new(1));

        let current = content(json!({
            "document": { "id": 5, "type": "Document" },
            "contract": { "id": 1, "type": "Contract" },
        }));
        let proposed = content(json!({
            "document": { "id": null, "type": null },
            "contract": { "id": "1", "type": "Contract" },
            "policy": { "id": 3, "type": "Policy" },
        }));

        let diff = generate_single_mappings(&meta.mapping_fields, &proposed, &current).unwrap();
        assert_eq!(diff.len(), 2);
        assert_eq!(diff["document"], None);
        assert_eq!(
            diff["policy"],
            Some(ObjectRef::new("Policy", ObjectId::new(3)))
        );

        // Unmapping something which is not mapped changes nothing.
        let proposed = content(json!({ "policy": null }));
        let diff = generate_single_mappings(&meta.mapping_fields, &proposed, &current).unwrap();
        assert!(diff.is_empty());
    }

    #[test]
    fn list_mappings() {
        let schema = schema();
        let meta = schema.classify(ObjectId::new(1));

        let current = content(json!({
            "documents": [
                { "id": 3, "type": "Document" },
                { "id": 1, "type": "Document" },
            ],
            "markets": [{ "id": 7, "type": "Market" }],
        }));

        // Same ids in another order.
        let proposed = content(json!({
            "documents": [
                { "id": 1, "type": "Document" },
                { "id": 3, "type": "Document" },
            ],
        }));
        let diff = generate_list_mappings(&meta.mapping_list_fields, &proposed, &current).unwrap();
        assert!(diff.is_empty());

        let proposed = content(json!({
            "documents": [
                { "id": 9, "type": "Document", "title": "Nine" },
                { "id": 1, "type": "Document" },
                { "id": 4, "type": "Document" },
            ],
            "markets": null,
        }));
        let diff = generate_list_mappings(&meta.mapping_list_fields, &proposed, &current).unwrap();

        let ids = |records: &Vec<grc_core::MappedObject>| {
            records.iter().map(|record| record.id.as_u64()).collect::<Vec<_>>()
        };
        assert_eq!(ids(&diff["documents"].added), vec![4, 9]);
        assert_eq!(ids(&diff["documents"].deleted), vec![3]);
        assert_eq!(
            diff["documents"].added[1].extra.get("title"),
            Some(&json!("Nine"))
        );
        assert!(diff["markets"].added.is_empty());
        assert_eq!(ids(&diff["markets"].deleted), vec![7]);
    }
}
