// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mutate the live state of an object to reflect a diff record.
use grc_core::{AccessControlEntry, AttributeValue, DiffRecord, ObjectKey};
use grc_store::ObjectStore;
use tracing::{debug, trace};

/// Number of live relations which actually changed while applying a diff.
///
/// Applying the same diff a second time yields a report with only scalar fields, attribute
/// values and single mappings counted, as these are assigned unconditionally.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub fields: usize,
    pub acl_added: usize,
    pub acl_removed: usize,
    pub attribute_values: usize,
    pub mappings: usize,
    pub list_items_added: usize,
    pub list_items_removed: usize,
}

impl ApplyReport {
    /// Returns `true` if no relation was added or removed.
    pub fn is_noop(&self) -> bool {
        self.acl_added == 0
            && self.acl_removed == 0
            && self.list_items_added == 0
            && self.list_items_removed == 0
    }
}

/// Apply every section of a diff to the live state of an object.
///
/// Removals happen before additions. Adding an entry which already exists or removing one which
/// is already gone is not an error, applying a diff is idempotent.
pub async fn apply_diff<S>(
    store: &S,
    key: &ObjectKey,
    diff: &DiffRecord,
) -> Result<ApplyReport, S::Error>
where
    S: ObjectStore,
{
    let mut report = ApplyReport::default();

    for (name, value) in &diff.fields {
        store.set_field(key, name, value).await?;
        trace!(object = %key, field = name, "assign field");
        report.fields += 1;
    }

    for (role_id, change) in &diff.access_control_list {
        for person in &change.deleted {
            let entry = AccessControlEntry {
                role_id: *role_id,
                person_id: person.id,
                object: key.clone(),
            };
            if store.remove_acl_entry(&entry).await? {
                trace!(object = %key, role = %role_id, person = %person.id, "remove acl entry");
                report.acl_removed += 1;
            }
        }

        for person in &change.added {
            let entry = AccessControlEntry {
                role_id: *role_id,
                person_id: person.id,
                object: key.clone(),
            };
            if store.insert_acl_entry(&entry).await? {
                trace!(object = %key, role = %role_id, person = %person.id, "add acl entry");
                report.acl_added += 1;
            }
        }
    }

    for (attribute_id, change) in &diff.custom_attribute_values {
        let value = AttributeValue {
            attribute_id: *attribute_id,
            value: change.attribute_value.clone(),
            object_id: change.attribute_object.as_ref().map(|person| person.id),
        };
        store.set_attribute_value(key, &value).await?;
        trace!(object = %key, attribute = %attribute_id, "assign attribute value");
        report.attribute_values += 1;
    }

    for (field, target) in &diff.mapping_fields {
        store.set_mapping(key, field, target.as_ref()).await?;
        trace!(object = %key, field, unset = target.is_none(), "replace mapping");
        report.mappings += 1;
    }

    for (field, change) in &diff.mapping_list_fields {
        for item in &change.deleted {
            if store.remove_mapping_list_item(key, field, item.id).await? {
                trace!(object = %key, field, item = %item.id, "unmap list item");
                report.list_items_removed += 1;
            }
        }

        for item in &change.added {
            if store.add_mapping_list_item(key, field, item).await? {
                trace!(object = %key, field, item = %item.id, "map list item");
                report.list_items_added += 1;
            }
        }
    }

    debug!(object = %key, ?report, "applied diff");

    Ok(report)
}

#[cfg(test)]
mod tests {
    use grc_core::{
        AclChange, AttributeChange, AttributeId, DiffRecord, ListChange, LiveObject, MappedObject,
        ObjectId, ObjectKey, ObjectRef, Person, PersonId, RoleId,
    };
    use grc_store::{MemoryStore, ObjectStore};
    use serde_json::json;

    use super::apply_diff;

    fn diff() -> DiffRecord {
        let mut diff = DiffRecord::default();
        diff.fields.insert("title".into(), json!("Reviewed"));
        diff.access_control_list.insert(
            RoleId::new(1),
            AclChange {
                added: vec![Person::new(PersonId::new(2), "two@example.org")],
                deleted: vec![Person::new(PersonId::new(1), "one@example.org")],
            },
        );
        diff.custom_attribute_values.insert(
            AttributeId::new(4),
            AttributeChange {
                attribute_value: "1".into(),
                attribute_object: None,
            },
        );
        diff.mapping_fields.insert("document".into(), None);
        diff.mapping_fields.insert(
            "contract".into(),
            Some(ObjectRef::new("Contract", ObjectId::new(8))),
        );
        diff.mapping_list_fields.insert(
            "markets".into(),
            ListChange {
                added: vec![MappedObject::new("Market", ObjectId::new(3))],
                deleted: vec![MappedObject::new("Market", ObjectId::new(1))],
            },
        );
        diff
    }

    #[tokio::test]
    async fn apply_twice() {
        let store = MemoryStore::default();
        let key = ObjectKey::new("Control", 1);

        store
            .insert_object(
                &LiveObject::new(key.clone())
                    .with_field("title", json!("Draft"))
                    .with_acl(RoleId::new(1), PersonId::new(1))
                    .with_mapping("document", ObjectRef::new("Document", ObjectId::new(5)))
                    .with_mapping_list_item("markets", MappedObject::new("Market", ObjectId::new(1)))
                    .with_mapping_list_item("markets", MappedObject::new("Market", ObjectId::new(2))),
            )
            .await
            .unwrap();

        let report = apply_diff(&store, &key, &diff()).await.unwrap();
        assert_eq!(report.acl_added, 1);
        assert_eq!(report.acl_removed, 1);
        assert_eq!(report.list_items_added, 1);
        assert_eq!(report.list_items_removed, 1);

        let once = store.object(&key).await.unwrap().unwrap();

        let report = apply_diff(&store, &key, &diff()).await.unwrap();
        assert!(report.is_noop());

        let twice = store.object(&key).await.unwrap().unwrap();
        assert_eq!(once, twice);

        assert_eq!(twice.fields["title"], json!("Reviewed"));
        assert_eq!(
            twice.acl.iter().copied().collect::<Vec<_>>(),
            vec![(RoleId::new(1), PersonId::new(2))]
        );
        assert_eq!(twice.attribute_values[&AttributeId::new(4)].value, "1");
        assert!(!twice.mappings.contains_key("document"));
        assert_eq!(
            twice.mappings["contract"],
            ObjectRef::new("Contract", ObjectId::new(8))
        );
        assert_eq!(
            twice.mapping_lists["markets"]
                .keys()
                .map(|id| id.as_u64())
                .collect::<Vec<_>>(),
            vec![2, 3]
        );
    }

    #[tokio::test]
    async fn empty_diff() {
        let store = MemoryStore::default();
        let key = ObjectKey::new("Control", 1);
        store.insert_object(&LiveObject::new(key.clone())).await.unwrap();

        let report = apply_diff(&store, &key, &DiffRecord::default()).await.unwrap();
        assert_eq!(report, Default::default());
        assert_eq!(
            store.object(&key).await.unwrap(),
            Some(LiveObject::new(key))
        );
    }
}
