// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialized content of a governed object, as stored in revisions and submitted in proposals.
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::identity::{AttributeId, ObjectId, PersonId, RoleId};

/// Key of the access control list section in content.
pub const ACCESS_CONTROL_LIST: &str = "access_control_list";

/// Key of the custom attribute values section in content.
pub const CUSTOM_ATTRIBUTE_VALUES: &str = "custom_attribute_values";

/// Full content of an object at one point in time.
///
/// Content is a JSON object: plain fields hold arbitrary values, mapping fields hold `{id,
/// type}` references or lists of those, and the two special sections hold the access control
/// list and the custom attribute values. Typed accessors are provided for everything besides
/// plain fields.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Content(Map<String, Value>);

impl Content {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns an error if the value is not a JSON object.
    pub fn from_value(value: Value) -> Result<Self, ContentError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ContentError::NotAnObject),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: &str, value: Value) -> Option<Value> {
        self.0.insert(key.to_string(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the access control list or `None` if the section is missing or null.
    pub fn access_control_list(&self) -> Result<Option<Vec<AclRecord>>, ContentError> {
        self.section(ACCESS_CONTROL_LIST)
    }

    /// Returns the custom attribute values or `None` if the section is missing or null.
    ///
    /// Records with an attribute id which can't be parsed are skipped.
    pub fn custom_attribute_values(&self) -> Result<Option<Vec<AttributeRecord>>, ContentError> {
        let records: Option<Vec<RawAttributeRecord>> = self.section(CUSTOM_ATTRIBUTE_VALUES)?;
        Ok(records.map(|records| {
            records
                .into_iter()
                .filter_map(|record| {
                    let attribute_id = AttributeId::deserialize(record.custom_attribute_id).ok()?;
                    Some(AttributeRecord {
                        attribute_id,
                        attribute_value: record.attribute_value,
                        attribute_object_id: record.attribute_object_id,
                    })
                })
                .collect()
        }))
    }

    /// Returns the single object reference held by a mapping field or `None` if the field is
    /// missing or null.
    pub fn mapping(&self, field: &str) -> Result<Option<ObjectRef>, ContentError> {
        self.section(field)
    }

    /// Returns the object records held by a list mapping field or `None` if the field is missing
    /// or null.
    pub fn mapping_list(&self, field: &str) -> Result<Option<Vec<MappedObject>>, ContentError> {
        self.section(field)
    }

    fn section<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ContentError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|err| ContentError::Malformed(key.to_string(), err)),
        }
    }
}

impl From<Map<String, Value>> for Content {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Content {
    type Error = ContentError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(value)
    }
}

/// Person reference inside content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: PersonId,
}

/// One entry of the access control list section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclRecord {
    pub ac_role_id: RoleId,
    pub person: PersonRef,
}

impl AclRecord {
    pub fn new(role_id: RoleId, person_id: PersonId) -> Self {
        Self {
            ac_role_id: role_id,
            person: PersonRef { id: person_id },
        }
    }
}

#[derive(Deserialize)]
struct RawAttributeRecord {
    #[serde(default)]
    custom_attribute_id: Value,
    #[serde(default)]
    attribute_value: Value,
    #[serde(default)]
    attribute_object_id: Option<PersonId>,
}

/// One entry of the custom attribute values section.
#[derive(Clone, Debug, PartialEq)]
pub struct AttributeRecord {
    pub attribute_id: AttributeId,
    pub attribute_value: Value,
    pub attribute_object_id: Option<PersonId>,
}

/// Reference held by a single-object mapping field.
///
/// Both parts are optional as clients send `{id: null, type: null}` to express "nothing mapped".
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRef {
    #[serde(default)]
    pub id: Option<ObjectId>,
    #[serde(rename = "type", default)]
    pub object_type: Option<String>,
}

impl ObjectRef {
    pub fn new(object_type: &str, id: ObjectId) -> Self {
        Self {
            id: Some(id),
            object_type: Some(object_type.to_string()),
        }
    }
}

/// Full record of an object held by a list mapping field.
///
/// Records are compared by id only, any other attributes are carried along untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MappedObject {
    pub id: ObjectId,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MappedObject {
    pub fn new(object_type: &str, id: ObjectId) -> Self {
        Self {
            id,
            object_type: Some(object_type.to_string()),
            extra: Map::new(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content needs to be a JSON object")]
    NotAnObject,

    #[error("malformed '{0}' section in content: {1}")]
    Malformed(String, serde_json::Error),
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::identity::{AttributeId, ObjectId, PersonId, RoleId};

    use super::{AclRecord, Content, ContentError, ObjectRef};

    fn content(value: serde_json::Value) -> Content {
        Content::from_value(value).unwrap()
    }

    #[test]
    fn access_control_list() {
        let content = content(json!({
            "access_control_list": [
                { "ac_role_id": "1", "person": { "id": 2, "type": "Person" } },
                { "ac_role_id": 3, "person": { "id": "4" } },
            ]
        }));

        assert_eq!(
            content.access_control_list().unwrap(),
            Some(vec![
                AclRecord::new(RoleId::new(1), PersonId::new(2)),
                AclRecord::new(RoleId::new(3), PersonId::new(4)),
            ])
        );

        assert_eq!(Content::new().access_control_list().unwrap(), None);
    }

    #[test]
    fn skip_malformed_attribute_ids() {
        let content = content(json!({
            "custom_attribute_values": [
                { "custom_attribute_id": "abc", "attribute_value": "x" },
                { "attribute_value": "no id" },
                { "custom_attribute_id": null, "attribute_value": "null id" },
                { "custom_attribute_id": 5, "attribute_value": "y", "attribute_object_id": 9 },
            ]
        }));

        let records = content.custom_attribute_values().unwrap().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].attribute_id, AttributeId::new(5));
        assert_eq!(records[0].attribute_value, json!("y"));
        assert_eq!(records[0].attribute_object_id, Some(PersonId::new(9)));
    }

    #[test]
    fn mappings() {
        let content = content(json!({
            "document": { "id": 5, "type": "Document" },
            "empty": { "id": null, "type": null },
            "cleared": null,
            "documents": [
                { "id": 2, "type": "Document", "title": "Policy" },
                { "id": "1", "type": "Document" },
            ],
        }));

        assert_eq!(
            content.mapping("document").unwrap(),
            Some(ObjectRef::new("Document", ObjectId::new(5)))
        );
        assert_eq!(content.mapping("empty").unwrap(), Some(ObjectRef::default()));
        assert_eq!(content.mapping("cleared").unwrap(), None);
        assert_eq!(content.mapping("missing").unwrap(), None);

        let documents = content.mapping_list("documents").unwrap().unwrap();
        assert_eq!(documents[0].id, ObjectId::new(2));
        assert_eq!(documents[0].extra.get("title"), Some(&json!("Policy")));
        assert_eq!(documents[1].id, ObjectId::new(1));
    }

    #[test]
    fn malformed_sections() {
        let content = content(json!({ "access_control_list": "everyone" }));
        assert!(matches!(
            content.access_control_list(),
            Err(ContentError::Malformed(key, _)) if key == "access_control_list"
        ));

        assert!(matches!(
            Content::from_value(json!([1, 2])),
            Err(ContentError::NotAnObject)
        ));
    }
}
