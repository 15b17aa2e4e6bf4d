// SPDX-License-Identifier: MIT OR Apache-2.0

//! Custom attribute definitions and how their values compare.
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::identity::{AttributeId, ObjectId};

/// Declared type of a custom attribute definition.
///
/// The type decides how values are normalized before they get compared: checkboxes compare as
/// integers, every other type compares as whitespace-trimmed text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    #[serde(rename = "Text")]
    Text,

    #[serde(rename = "Rich Text")]
    RichText,

    #[serde(rename = "Date")]
    Date,

    #[serde(rename = "Dropdown")]
    Dropdown,

    #[serde(rename = "Checkbox")]
    Checkbox,

    /// Value links to a person, the linked id is carried next to the value.
    #[serde(rename = "Map:Person")]
    Person,
}

impl AttributeKind {
    /// Normalize a raw attribute value into its comparable form.
    pub fn normalize(&self, value: &Value) -> NormalizedValue {
        match self {
            AttributeKind::Checkbox => normalize_checkbox(value),
            AttributeKind::Text
            | AttributeKind::RichText
            | AttributeKind::Date
            | AttributeKind::Dropdown
            | AttributeKind::Person => NormalizedValue::Text(normalize_text(value)),
        }
    }
}

/// Attribute value after normalization.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum NormalizedValue {
    Integer(i64),
    Text(String),
}

impl NormalizedValue {
    /// Textual representation which gets recorded in diffs and persisted as the live value.
    pub fn to_text(&self) -> String {
        match self {
            NormalizedValue::Integer(value) => value.to_string(),
            NormalizedValue::Text(value) => value.clone(),
        }
    }
}

fn normalize_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.trim().to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

fn normalize_checkbox(value: &Value) -> NormalizedValue {
    match value {
        // An unset checkbox is an unchecked one.
        Value::Null => NormalizedValue::Integer(0),
        Value::Bool(flag) => NormalizedValue::Integer(i64::from(*flag)),
        Value::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(integer), _) => NormalizedValue::Integer(integer),
            (None, Some(float)) => NormalizedValue::Integer(float.trunc() as i64),
            (None, None) => NormalizedValue::Text(number.to_string()),
        },
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                return NormalizedValue::Integer(0);
            }
            if let Ok(integer) = text.parse::<i64>() {
                return NormalizedValue::Integer(integer);
            }
            match text.to_lowercase().as_str() {
                "true" => NormalizedValue::Integer(1),
                "false" => NormalizedValue::Integer(0),
                _ => NormalizedValue::Text(text.to_string()),
            }
        }
        Value::Array(_) | Value::Object(_) => NormalizedValue::Text(value.to_string()),
    }
}

/// Definition of a custom attribute.
///
/// Definitions are either global for an object type or local to exactly one object, in which
/// case `definition_id` holds the id of that object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomAttributeDefinition {
    pub id: AttributeId,
    pub title: String,
    #[serde(rename = "attribute_type")]
    pub kind: AttributeKind,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub definition_id: Option<ObjectId>,
}

impl CustomAttributeDefinition {
    pub fn new(id: u64, title: &str, kind: AttributeKind) -> Self {
        Self {
            id: AttributeId::new(id),
            title: title.to_string(),
            kind,
            default_value: None,
            definition_id: None,
        }
    }

    pub fn with_default(mut self, default_value: &str) -> Self {
        self.default_value = Some(default_value.to_string());
        self
    }

    /// Restrict this definition to a single object.
    pub fn local_to(mut self, object_id: ObjectId) -> Self {
        self.definition_id = Some(object_id);
        self
    }

    /// Returns `true` if this definition applies to the object with the given id.
    pub fn applies_to(&self, object_id: ObjectId) -> bool {
        match self.definition_id {
            Some(definition_id) => definition_id == object_id,
            None => true,
        }
    }

    /// Normalized default value, used as comparison baseline when no value was stored yet.
    pub fn normalized_default(&self) -> NormalizedValue {
        let default = match &self.default_value {
            Some(value) => Value::String(value.clone()),
            None => Value::Null,
        };
        self.kind.normalize(&default)
    }
}
