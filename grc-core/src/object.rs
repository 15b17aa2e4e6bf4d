// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live state of a governed object: the relations a proposal mutates when it gets applied.
use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Value, json};

use crate::content::{ACCESS_CONTROL_LIST, CUSTOM_ATTRIBUTE_VALUES, Content, MappedObject, ObjectRef};
use crate::identity::{AttributeId, ObjectId, ObjectKey, PersonId, RoleId};

/// Assignment of a person to a role on an object.
///
/// There is at most one entry per (role, person, object).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AccessControlEntry {
    pub role_id: RoleId,
    pub person_id: PersonId,
    pub object: ObjectKey,
}

/// Stored value of a custom attribute on an object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeValue {
    pub attribute_id: AttributeId,
    pub value: String,
    pub object_id: Option<PersonId>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LiveObject {
    pub key: ObjectKey,
    pub fields: BTreeMap<String, Value>,
    pub acl: BTreeSet<(RoleId, PersonId)>,
    pub attribute_values: BTreeMap<AttributeId, AttributeValue>,
    pub mappings: BTreeMap<String, ObjectRef>,
    /// Records of list mapping fields keyed by their id. Fields without records are not kept.
    pub mapping_lists: BTreeMap<String, BTreeMap<ObjectId, MappedObject>>,
}

impl LiveObject {
    pub fn new(key: ObjectKey) -> Self {
        Self {
            key,
            fields: BTreeMap::new(),
            acl: BTreeSet::new(),
            attribute_values: BTreeMap::new(),
            mappings: BTreeMap::new(),
            mapping_lists: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn with_acl(mut self, role_id: RoleId, person_id: PersonId) -> Self {
        self.acl.insert((role_id, person_id));
        self
    }

    pub fn with_attribute(mut self, value: AttributeValue) -> Self {
        self.attribute_values.insert(value.attribute_id, value);
        self
    }

    pub fn with_mapping(mut self, field: &str, target: ObjectRef) -> Self {
        self.mappings.insert(field.to_string(), target);
        self
    }

    pub fn with_mapping_list_item(mut self, field: &str, item: MappedObject) -> Self {
        self.mapping_lists
            .entry(field.to_string())
            .or_default()
            .insert(item.id, item);
        self
    }

    pub fn acl_entries(&self) -> impl Iterator<Item = AccessControlEntry> + '_ {
        self.acl
            .iter()
            .map(|(role_id, person_id)| AccessControlEntry {
                role_id: *role_id,
                person_id: *person_id,
                object: self.key.clone(),
            })
    }

    /// Render the live state in the same shape as revision content.
    pub fn to_content(&self) -> Content {
        let mut content = Content::new();

        for (name, value) in &self.fields {
            content.insert(name, value.clone());
        }

        let acl = self
            .acl
            .iter()
            .map(|(role_id, person_id)| {
                json!({
                    "ac_role_id": role_id,
                    "person_id": person_id,
                    "person": { "id": person_id, "type": "Person" },
                })
            })
            .collect();
        content.insert(ACCESS_CONTROL_LIST, Value::Array(acl));

        let attribute_values = self
            .attribute_values
            .values()
            .map(|value| {
                json!({
                    "custom_attribute_id": value.attribute_id,
                    "attribute_value": value.value,
                    "attribute_object_id": value.object_id,
                })
            })
            .collect();
        content.insert(CUSTOM_ATTRIBUTE_VALUES, Value::Array(attribute_values));

        for (field, target) in &self.mappings {
            content.insert(field, json!(target));
        }

        for (field, items) in &self.mapping_lists {
            content.insert(field, json!(items.values().collect::<Vec<_>>()));
        }

        content
    }
}
