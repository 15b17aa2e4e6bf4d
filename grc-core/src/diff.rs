// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured delta between proposed content and the latest known content of an object.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::content::{MappedObject, ObjectRef};
use crate::identity::{AttributeId, PersonId, RoleId};

/// Person as rendered in diff records.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub email: String,
}

impl Person {
    pub fn new(id: PersonId, email: &str) -> Self {
        Self {
            id,
            email: email.to_string(),
        }
    }
}

/// Added and removed people for one access control role, both sorted ascending by id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclChange {
    pub added: Vec<Person>,
    pub deleted: Vec<Person>,
}

impl AclChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }
}

/// New value of a custom attribute.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub attribute_value: String,
    pub attribute_object: Option<Person>,
}

/// Added and removed records of a list mapping field, both sorted ascending by id.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListChange {
    pub added: Vec<MappedObject>,
    pub deleted: Vec<MappedObject>,
}

impl ListChange {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty()
    }
}

/// Result of comparing proposed content against the latest revision of an object.
///
/// All sections are independent from each other. A section without changes is empty, never
/// missing. Single mapping fields map to `None` to express an explicit "unset".
///
/// Diff records are computed once, when a proposal gets created, and never change afterwards.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiffRecord {
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    #[serde(default)]
    pub access_control_list: BTreeMap<RoleId, AclChange>,
    #[serde(default)]
    pub custom_attribute_values: BTreeMap<AttributeId, AttributeChange>,
    #[serde(default)]
    pub mapping_fields: BTreeMap<String, Option<ObjectRef>>,
    #[serde(default)]
    pub mapping_list_fields: BTreeMap<String, ListChange>,
}

impl DiffRecord {
    /// Returns `true` if no section contains any change.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
            && self.access_control_list.is_empty()
            && self.custom_attribute_values.is_empty()
            && self.mapping_fields.is_empty()
            && self.mapping_list_fields.is_empty()
    }

    /// Number of changed entries over all sections.
    pub fn len(&self) -> usize {
        self.fields.len()
            + self.access_control_list.len()
            + self.custom_attribute_values.len()
            + self.mapping_fields.len()
            + self.mapping_list_fields.len()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::content::ObjectRef;
    use crate::identity::{PersonId, RoleId};

    use super::{AclChange, DiffRecord, Person};

    #[test]
    fn json_shape() {
        let mut diff = DiffRecord::default();
        diff.fields.insert("title".into(), json!("New title"));
        diff.access_control_list.insert(
            RoleId::new(1),
            AclChange {
                added: vec![Person::new(PersonId::new(2), "two@example.org")],
                deleted: vec![],
            },
        );
        diff.mapping_fields.insert("document".into(), None);

        let value = serde_json::to_value(&diff).unwrap();
        assert_eq!(
            value,
            json!({
                "fields": { "title": "New title" },
                "access_control_list": {
                    "1": {
                        "added": [{ "id": 2, "email": "two@example.org" }],
                        "deleted": [],
                    }
                },
                "custom_attribute_values": {},
                "mapping_fields": { "document": null },
                "mapping_list_fields": {},
            })
        );

        let diff_again: DiffRecord = serde_json::from_value(value).unwrap();
        assert_eq!(diff, diff_again);
        assert_eq!(diff.len(), 3);
    }

    #[test]
    fn empty_diff() {
        let diff: DiffRecord = serde_json::from_value(json!({})).unwrap();
        assert!(diff.is_empty());

        let mut diff = DiffRecord::default();
        diff.mapping_fields
            .insert("document".into(), Some(ObjectRef::default()));
        assert!(!diff.is_empty());
    }
}
