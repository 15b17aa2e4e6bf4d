// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declared schema metadata of object types and the classification of their attributes.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::attribute::CustomAttributeDefinition;
use crate::identity::{ObjectId, RoleId};

/// How the value of a declared field is shaped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Scalar value which is compared and assigned as a whole.
    Plain,

    /// Reference to one other object.
    Mapping,

    /// List of references to other objects.
    MappingList,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

/// Access control role declared for an object type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessControlRole {
    pub id: RoleId,
    pub name: String,
}

/// Schema metadata of one object type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSchema {
    pub object_type: String,
    #[serde(default)]
    fields: Vec<FieldDescriptor>,
    #[serde(default)]
    roles: Vec<AccessControlRole>,
    #[serde(default)]
    attributes: Vec<CustomAttributeDefinition>,
}

impl ObjectSchema {
    pub fn new(object_type: &str) -> Self {
        Self {
            object_type: object_type.to_string(),
            fields: Vec::new(),
            roles: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// Declare a scalar field.
    pub fn with_field(self, name: &str) -> Self {
        self.with_descriptor(name, FieldKind::Plain)
    }

    /// Declare a field referencing one other object.
    pub fn with_mapping(self, name: &str) -> Self {
        self.with_descriptor(name, FieldKind::Mapping)
    }

    /// Declare a field holding a list of other objects.
    pub fn with_mapping_list(self, name: &str) -> Self {
        self.with_descriptor(name, FieldKind::MappingList)
    }

    pub fn with_role(mut self, id: u64, name: &str) -> Self {
        let id = RoleId::new(id);
        self.roles.retain(|role| role.id != id);
        self.roles.push(AccessControlRole {
            id,
            name: name.to_string(),
        });
        self
    }

    pub fn with_attribute(mut self, definition: CustomAttributeDefinition) -> Self {
        self.attributes
            .retain(|attribute| attribute.id != definition.id);
        self.attributes.push(definition);
        self
    }

    // Field names are unique, declaring a name again replaces the earlier declaration. This keeps
    // the classified categories disjoint.
    fn with_descriptor(mut self, name: &str, kind: FieldKind) -> Self {
        self.fields.retain(|field| field.name != name);
        self.fields.push(FieldDescriptor {
            name: name.to_string(),
            kind,
        });
        self
    }

    pub fn roles(&self) -> &[AccessControlRole] {
        &self.roles
    }

    pub fn role_by_name(&self, name: &str) -> Option<&AccessControlRole> {
        self.roles.iter().find(|role| role.name == name)
    }

    /// Partition the declared metadata into the categories relevant for a single object.
    ///
    /// Custom attribute definitions local to other objects are left out. Declaration order is
    /// kept within every category.
    pub fn classify(&self, object_id: ObjectId) -> MetaInfo<'_> {
        let by_kind = |kind: FieldKind| {
            self.fields
                .iter()
                .filter(|field| field.kind == kind)
                .collect::<Vec<_>>()
        };

        MetaInfo {
            fields: by_kind(FieldKind::Plain),
            acrs: self.roles.iter().collect(),
            cads: self
                .attributes
                .iter()
                .filter(|definition| definition.applies_to(object_id))
                .collect(),
            mapping_fields: by_kind(FieldKind::Mapping),
            mapping_list_fields: by_kind(FieldKind::MappingList),
        }
    }
}

/// Classified metadata of one object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetaInfo<'a> {
    pub fields: Vec<&'a FieldDescriptor>,
    pub acrs: Vec<&'a AccessControlRole>,
    pub cads: Vec<&'a CustomAttributeDefinition>,
    pub mapping_fields: Vec<&'a FieldDescriptor>,
    pub mapping_list_fields: Vec<&'a FieldDescriptor>,
}

/// Schema metadata for all known object types.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ObjectSchema>", into = "Vec<ObjectSchema>")]
pub struct SchemaRegistry {
    schemas: HashMap<String, ObjectSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a schema, replacing any earlier schema of the same object type.
    pub fn insert(&mut self, schema: ObjectSchema) -> Option<ObjectSchema> {
        self.schemas.insert(schema.object_type.clone(), schema)
    }

    pub fn with(mut self, schema: ObjectSchema) -> Self {
        self.insert(schema);
        self
    }

    pub fn get(&self, object_type: &str) -> Option<&ObjectSchema> {
        self.schemas.get(object_type)
    }
}

impl FromIterator<ObjectSchema> for SchemaRegistry {
    fn from_iter<T: IntoIterator<Item = ObjectSchema>>(iter: T) -> Self {
        let mut registry = Self::new();
        for schema in iter {
            registry.insert(schema);
        }
        registry
    }
}

impl From<Vec<ObjectSchema>> for SchemaRegistry {
    fn from(schemas: Vec<ObjectSchema>) -> Self {
        schemas.into_iter().collect()
    }
}

impl From<SchemaRegistry> for Vec<ObjectSchema> {
    fn from(registry: SchemaRegistry) -> Self {
        let mut schemas: Vec<ObjectSchema> = registry.schemas.into_values().collect();
        schemas.sort_by(|a, b| a.object_type.cmp(&b.object_type));
        schemas
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::attribute::{AttributeKind, CustomAttributeDefinition};
    use crate::identity::{ObjectId, RoleId};

    use super::{ObjectSchema, SchemaRegistry};

    fn control_schema() -> ObjectSchema {
        ObjectSchema::new("Control")
            .with_field("title")
            .with_field("description")
            .with_mapping("document")
            .with_mapping_list("documents")
            .with_role(1, "Admin")
            .with_attribute(CustomAttributeDefinition::new(
                1,
                "Approved",
                AttributeKind::Checkbox,
            ))
            .with_attribute(
                CustomAttributeDefinition::new(2, "Notes", AttributeKind::Text)
                    .local_to(ObjectId::new(10)),
            )
    }

    #[test]
    fn classify_fields() {
        let schema = control_schema();
        let meta = schema.classify(ObjectId::new(10));

        let names = |fields: &Vec<&super::FieldDescriptor>| {
            fields.iter().map(|field| field.name.clone()).collect::<Vec<_>>()
        };

        assert_eq!(names(&meta.fields), vec!["title", "description"]);
        assert_eq!(names(&meta.mapping_fields), vec!["document"]);
        assert_eq!(names(&meta.mapping_list_fields), vec!["documents"]);
        assert_eq!(meta.acrs.len(), 1);
        assert_eq!(meta.cads.len(), 2);

        // Local definitions of other objects are not applicable.
        assert_eq!(schema.classify(ObjectId::new(11)).cads.len(), 1);

        // Classification is deterministic.
        assert_eq!(schema.classify(ObjectId::new(10)), meta);
    }

    #[test]
    fn redeclared_fields_stay_disjoint() {
        let schema = ObjectSchema::new("Control")
            .with_field("owner")
            .with_mapping("owner");
        let meta = schema.classify(ObjectId::new(1));
        assert!(meta.fields.is_empty());
        assert_eq!(meta.mapping_fields.len(), 1);
    }

    #[test]
    fn registry_from_json() {
        let registry: SchemaRegistry = serde_json::from_value(json!([
            {
                "object_type": "Program",
                "fields": [
                    { "name": "title", "kind": "plain" },
                    { "name": "documents", "kind": "mapping_list" },
                ],
                "roles": [{ "id": "3", "name": "Program Managers" }],
            }
        ]))
        .unwrap();

        let schema = registry.get("Program").unwrap();
        assert_eq!(
            schema.role_by_name("Program Managers").map(|role| role.id),
            Some(RoleId::new(3))
        );
        assert!(registry.get("Control").is_none());
    }
}
