// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;
use std::convert::Infallible;

use grc_core::{
    AccessControlEntry, AttributeValue, LiveObject, MappedObject, ObjectId, ObjectKey, ObjectRef,
};
use serde_json::Value;

use crate::checkpoint::Checkpointed;
use crate::memory::MemoryStore;
use crate::objects::ObjectStore;

#[derive(Clone, Debug)]
pub struct ObjectMemoryStore {
    objects: Checkpointed<BTreeMap<ObjectKey, LiveObject>>,
}

impl ObjectMemoryStore {
    pub fn new() -> Self {
        Self {
            objects: Checkpointed::new(),
        }
    }

    pub(crate) fn save_checkpoint(&self) {
        self.objects.save();
    }

    pub(crate) fn restore_checkpoint(&self) {
        self.objects.restore();
    }

    pub(crate) fn discard_checkpoint(&self) {
        self.objects.discard();
    }

    fn update<F, R>(&self, key: &ObjectKey, f: F) -> R
    where
        F: FnOnce(&mut LiveObject) -> R,
    {
        let mut objects = self.objects.state().borrow_mut();
        let object = objects
            .entry(key.clone())
            .or_insert_with(|| LiveObject::new(key.clone()));
        f(object)
    }
}

impl Default for ObjectMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore for MemoryStore {
    type Error = Infallible;

    async fn insert_object(&self, object: &LiveObject) -> Result<bool, Self::Error> {
        let mut objects = self.objects.objects.state().borrow_mut();
        let mut object = object.clone();
        object.mapping_lists.retain(|_, items| !items.is_empty());
        Ok(objects.insert(object.key.clone(), object).is_none())
    }

    async fn object(&self, key: &ObjectKey) -> Result<Option<LiveObject>, Self::Error> {
        let objects = self.objects.objects.state().borrow();
        Ok(objects.get(key).cloned())
    }

    async fn set_field(&self, key: &ObjectKey, name: &str, value: &Value) -> Result<(), Self::Error> {
        self.objects.update(key, |object| {
            object.fields.insert(name.to_string(), value.clone());
        });
        Ok(())
    }

    async fn acl_entries(&self, key: &ObjectKey) -> Result<Vec<AccessControlEntry>, Self::Error> {
        let objects = self.objects.objects.state().borrow();
        Ok(objects
            .get(key)
            .map(|object| object.acl_entries().collect())
            .unwrap_or_default())
    }

    async fn insert_acl_entry(&self, entry: &AccessControlEntry) -> Result<bool, Self::Error> {
        Ok(self.objects.update(&entry.object, |object| {
            object.acl.insert((entry.role_id, entry.person_id))
        }))
    }

    async fn remove_acl_entry(&self, entry: &AccessControlEntry) -> Result<bool, Self::Error> {
        let mut objects = self.objects.objects.state().borrow_mut();
        Ok(objects
            .get_mut(&entry.object)
            .is_some_and(|object| object.acl.remove(&(entry.role_id, entry.person_id))))
    }

    async fn set_attribute_value(
        &self,
        key: &ObjectKey,
        value: &AttributeValue,
    ) -> Result<(), Self::Error> {
        self.objects.update(key, |object| {
            object
                .attribute_values
                .insert(value.attribute_id, value.clone());
        });
        Ok(())
    }

    async fn set_mapping(
        &self,
        key: &ObjectKey,
        field: &str,
        target: Option<&ObjectRef>,
    ) -> Result<(), Self::Error> {
        self.objects.update(key, |object| match target {
            Some(target) => {
                object.mappings.insert(field.to_string(), target.clone());
            }
            None => {
                object.mappings.remove(field);
            }
        });
        Ok(())
    }

    async fn add_mapping_list_item(
        &self,
        key: &ObjectKey,
        field: &str,
        item: &MappedObject,
    ) -> Result<bool, Self::Error> {
        Ok(self.objects.update(key, |object| {
            let items = object.mapping_lists.entry(field.to_string()).or_default();
            if items.contains_key(&item.id) {
                return false;
            }
            items.insert(item.id, item.clone());
            true
        }))
    }

    async fn remove_mapping_list_item(
        &self,
        key: &ObjectKey,
        field: &str,
        id: ObjectId,
    ) -> Result<bool, Self::Error> {
        let mut objects = self.objects.objects.state().borrow_mut();
        let Some(object) = objects.get_mut(key) else {
            return Ok(false);
        };
        let Some(items) = object.mapping_lists.get_mut(field) else {
            return Ok(false);
        };

        let removed = items.remove(&id).is_some();
        if items.is_empty() {
            object.mapping_lists.remove(field);
        }
        Ok(removed)
    }
}
