// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use grc_core::{
    AccessControlEntry, AttributeValue, LiveObject, MappedObject, ObjectId, ObjectKey, ObjectRef,
};
use serde_json::Value;

/// Interface for the live state of governed objects.
///
/// Mutations targeting an object which does not exist yet create it.
pub trait ObjectStore {
    type Error: Error;

    /// Insert an object with all of its relations, replacing any earlier state.
    ///
    /// Returns `true` if the object did not exist before.
    fn insert_object(&self, object: &LiveObject)
    -> impl Future<Output = Result<bool, Self::Error>>;

    /// Returns the live state of an object or `None` if it does not exist.
    fn object(
        &self,
        key: &ObjectKey,
    ) -> impl Future<Output = Result<Option<LiveObject>, Self::Error>>;

    /// Assign the value of a scalar field.
    fn set_field(
        &self,
        key: &ObjectKey,
        name: &str,
        value: &Value,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Returns all access control entries of an object, sorted by role and person.
    fn acl_entries(
        &self,
        key: &ObjectKey,
    ) -> impl Future<Output = Result<Vec<AccessControlEntry>, Self::Error>>;

    /// Add an access control entry.
    ///
    /// Returns `false` if the entry already existed and nothing was inserted.
    fn insert_acl_entry(
        &self,
        entry: &AccessControlEntry,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Remove an access control entry.
    ///
    /// Returns `false` if the entry did not exist.
    fn remove_acl_entry(
        &self,
        entry: &AccessControlEntry,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Assign the value of a custom attribute.
    fn set_attribute_value(
        &self,
        key: &ObjectKey,
        value: &AttributeValue,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Replace the target of a single mapping field or clear it with `None`.
    fn set_mapping(
        &self,
        key: &ObjectKey,
        field: &str,
        target: Option<&ObjectRef>,
    ) -> impl Future<Output = Result<(), Self::Error>>;

    /// Add a record to a list mapping field.
    ///
    /// Returns `false` if a record with the same id was already mapped.
    fn add_mapping_list_item(
        &self,
        key: &ObjectKey,
        field: &str,
        item: &MappedObject,
    ) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Remove a record from a list mapping field.
    ///
    /// Returns `false` if no record with this id was mapped.
    fn remove_mapping_list_item(
        &self,
        key: &ObjectKey,
        field: &str,
        id: ObjectId,
    ) -> impl Future<Output = Result<bool, Self::Error>>;
}
