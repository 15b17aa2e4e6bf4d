// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memoized lookup of the latest revision content and of people, scoped to one operation.
use std::collections::{BTreeMap, BTreeSet, HashMap};

use grc_core::{
    Content, ObjectId, ObjectKey, Person, PersonId, Revision, SchemaRegistry, populate_acl,
    populate_reference_url,
};
use grc_store::{PersonStore, RevisionStore};
use tracing::{debug, trace};

use crate::diff::DiffError;

/// Cache of the latest known content of objects and of resolved people.
///
/// A cache is owned by the caller of one logical operation and passed along to everything that
/// needs snapshot content. It must not outlive the operation (or needs to be cleared at its end),
/// otherwise snapshots of different points in time are mixed.
///
/// Objects which were never persisted have empty content. Content written before access control
/// lists existed gets its list derived from the legacy person fields when it is loaded, legacy
/// link fields are turned into reference url documents.
#[derive(Debug)]
pub struct SnapshotCache<'a> {
    schemas: &'a SchemaRegistry,
    batch_size: usize,
    contents: HashMap<ObjectKey, Content>,
    markers: BTreeMap<String, BTreeSet<ObjectId>>,
    people: HashMap<PersonId, Person>,
}

impl<'a> SnapshotCache<'a> {
    pub fn new(schemas: &'a SchemaRegistry, batch_size: usize) -> Self {
        Self {
            schemas,
            batch_size: batch_size.max(1),
            contents: HashMap::new(),
            markers: BTreeMap::new(),
            people: HashMap::new(),
        }
    }

    /// Returns the content of the latest revision of an object.
    pub async fn latest_content<S, E>(
        &mut self,
        store: &S,
        key: &ObjectKey,
    ) -> Result<&Content, DiffError<E>>
    where
        S: RevisionStore<Error = E>,
    {
        if !self.contents.contains_key(key) {
            let revision = store
                .latest_revision(key)
                .await
                .map_err(DiffError::Store)?;
            trace!(object = %key, "load latest content");
            self.insert(key.clone(), revision);
        }

        Ok(&self.contents[key])
    }

    /// Preload the latest content of many objects with one query per object type and batch.
    ///
    /// Objects which are already cached are not loaded again.
    pub async fn warm<S, E>(
        &mut self,
        store: &S,
        targets: &BTreeMap<String, BTreeSet<ObjectId>>,
    ) -> Result<(), DiffError<E>>
    where
        S: RevisionStore<Error = E>,
    {
        for (object_type, ids) in targets {
            let missing: Vec<ObjectId> = ids
                .iter()
                .filter(|id| !self.contents.contains_key(&ObjectKey::new(object_type, id.as_u64())))
                .copied()
                .collect();

            for batch in missing.chunks(self.batch_size) {
                let revisions = store
                    .latest_revisions(object_type, batch)
                    .await
                    .map_err(DiffError::Store)?;
                debug!(
                    object_type,
                    requested = batch.len(),
                    found = revisions.len(),
                    "warm snapshot cache"
                );

                let mut found: HashMap<ObjectKey, Revision> = revisions
                    .into_iter()
                    .map(|revision| (revision.resource.clone(), revision))
                    .collect();

                for id in batch {
                    let key = ObjectKey::new(object_type, id.as_u64());
                    let revision = found.remove(&key);
                    self.insert(key, revision);
                }
            }
        }

        Ok(())
    }

    /// Remember an object to be loaded with the next `rewarm`.
    pub fn mark(&mut self, key: &ObjectKey) {
        self.markers
            .entry(key.object_type.clone())
            .or_default()
            .insert(key.id);
    }

    /// Load all marked objects at once and clear the marks.
    pub async fn rewarm<S, E>(&mut self, store: &S) -> Result<(), DiffError<E>>
    where
        S: RevisionStore<Error = E>,
    {
        let markers = std::mem::take(&mut self.markers);
        if markers.is_empty() {
            return Ok(());
        }
        self.warm(store, &markers).await
    }

    /// Resolve a person by id. Unknown people are an error.
    pub async fn person<S, E>(&mut self, store: &S, id: PersonId) -> Result<Person, DiffError<E>>
    where
        S: PersonStore<Error = E>,
    {
        if let Some(person) = self.people.get(&id) {
            return Ok(person.clone());
        }

        let person = store
            .person(id)
            .await
            .map_err(DiffError::Store)?
            .ok_or(DiffError::UnknownPerson(id))?;
        self.people.insert(id, person.clone());
        Ok(person)
    }

    /// Resolve many people, sorted ascending by id. Any unknown person is an error.
    pub async fn people<S, E>(
        &mut self,
        store: &S,
        ids: &BTreeSet<PersonId>,
    ) -> Result<Vec<Person>, DiffError<E>>
    where
        S: PersonStore<Error = E>,
    {
        let missing: Vec<PersonId> = ids
            .iter()
            .filter(|id| !self.people.contains_key(id))
            .copied()
            .collect();

        for batch in missing.chunks(self.batch_size) {
            let people = store.people(batch).await.map_err(DiffError::Store)?;
            debug!(
                requested = batch.len(),
                found = people.len(),
                "resolve people"
            );
            for person in people {
                self.people.insert(person.id, person);
            }
        }

        ids.iter()
            .map(|id| {
                self.people
                    .get(id)
                    .cloned()
                    .ok_or(DiffError::UnknownPerson(*id))
            })
            .collect()
    }

    /// Forget everything, to be called at the end of an operation.
    pub fn clear(&mut self) {
        self.contents.clear();
        self.markers.clear();
        self.people.clear();
    }

    pub fn is_cached(&self, key: &ObjectKey) -> bool {
        self.contents.contains_key(key)
    }

    fn insert(&mut self, key: ObjectKey, revision: Option<Revision>) {
        let Some(revision) = revision else {
            self.contents.insert(key, Content::new());
            return;
        };

        let mut content = revision.content;
        if let Some(schema) = self.schemas.get(&key.object_type)
            && populate_acl(&mut content, &key, schema)
        {
            trace!(object = %key, "derived access control list from legacy fields");
        }

        // Revisions are immutable, their creation time is also their last modification.
        if populate_reference_url(&mut content, revision.created_at, revision.created_at) {
            trace!(object = %key, "derived reference urls from legacy fields");
        }

        self.contents.insert(key, content);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use assert_matches::assert_matches;
    use grc_core::{
        AclRecord, Content, ObjectId, ObjectKey, ObjectSchema, PersonId, RoleId, SchemaRegistry,
    };
    use grc_store::{MemoryStore, RevisionStore, SqliteStore, Transaction};
    use serde_json::json;

    use crate::diff::DiffError;
    use crate::test_utils::insert_people;

    use super::SnapshotCache;

    fn content(value: serde_json::Value) -> Content {
        Content::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn memoize_until_cleared() {
        let store = MemoryStore::default();
        let schemas = SchemaRegistry::new();
        let mut cache = SnapshotCache::new(&schemas, 10);
        let key = ObjectKey::new("Control", 1);

        let permit = store.begin().await.unwrap();
        store
            .insert_revision(&key, 1, &content(json!({ "title": "one" })))
            .await
            .unwrap();

        assert_eq!(
            cache.latest_content(&store, &key).await.unwrap(),
            &content(json!({ "title": "one" }))
        );

        // Newer revisions are not seen while the cache lives.
        store
            .insert_revision(&key, 2, &content(json!({ "title": "two" })))
            .await
            .unwrap();
        assert_eq!(
            cache.latest_content(&store, &key).await.unwrap(),
            &content(json!({ "title": "one" }))
        );

        cache.clear();
        assert_eq!(
            cache.latest_content(&store, &key).await.unwrap(),
            &content(json!({ "title": "two" }))
        );

        // Objects without revisions have empty content.
        let unknown = ObjectKey::new("Control", 2);
        assert!(cache.latest_content(&store, &unknown).await.unwrap().is_empty());
        store.commit(permit).await.unwrap();
    }

    #[tokio::test]
    async fn warm_equals_single_lookups() {
        let store = MemoryStore::default();
        let schemas = SchemaRegistry::new();
        let permit = store.begin().await.unwrap();

        for id in 1..=5u64 {
            let key = ObjectKey::new("Control", id);
            store
                .insert_revision(&key, 10, &content(json!({ "title": format!("{id}-a") })))
                .await
                .unwrap();
            store
                .insert_revision(&key, 10, &content(json!({ "title": format!("{id}-b") })))
                .await
                .unwrap();
        }

        let ids: BTreeSet<ObjectId> = (1..=6).map(ObjectId::new).collect();
        let mut targets = BTreeMap::new();
        targets.insert("Control".to_string(), ids.clone());

        // Batches smaller than the number of ids.
        let mut warmed = SnapshotCache::new(&schemas, 2);
        warmed.warm(&store, &targets).await.unwrap();

        let mut single = SnapshotCache::new(&schemas, 2);
        for id in ids {
            let key = ObjectKey::new("Control", id.as_u64());
            assert!(warmed.is_cached(&key));
            let expected = single.latest_content(&store, &key).await.unwrap().clone();
            assert_eq!(warmed.latest_content(&store, &key).await.unwrap(), &expected);
        }

        assert_eq!(
            warmed
                .latest_content(&store, &ObjectKey::new("Control", 3))
                .await
                .unwrap()
                .get("title"),
            Some(&json!("3-b"))
        );
        store.commit(permit).await.unwrap();
    }

    #[tokio::test]
    async fn mark_and_rewarm() {
        let store = MemoryStore::default();
        let schemas = SchemaRegistry::new();
        let mut cache = SnapshotCache::new(&schemas, 10);
        let permit = store.begin().await.unwrap();

        let key = ObjectKey::new("Program", 4);
        store
            .insert_revision(&key, 1, &content(json!({ "title": "program" })))
            .await
            .unwrap();

        cache.mark(&key);
        assert!(!cache.is_cached(&key));
        cache.rewarm(&store).await.unwrap();
        assert!(cache.is_cached(&key));

        // Marks are gone after a rewarm.
        cache.clear();
        cache.rewarm(&store).await.unwrap();
        assert!(!cache.is_cached(&key));
        store.commit(permit).await.unwrap();
    }

    #[tokio::test]
    async fn legacy_access_control_list() {
        let store = MemoryStore::default();
        let schemas = SchemaRegistry::new().with(
            ObjectSchema::new("Control")
                .with_role(1, "Principal Assignees")
                .with_role(2, "Admin"),
        );
        let mut cache = SnapshotCache::new(&schemas, 10);
        let permit = store.begin().await.unwrap();

        let key = ObjectKey::new("Control", 1);
        store
            .insert_revision(
                &key,
                1,
                &content(json!({
                    "principal_assessor": { "id": 123 },
                    "owners": [{ "id": 5 }, { "id": 6 }],
                    "contact": { "id": 9 },
                })),
            )
            .await
            .unwrap();

        let acl = cache
            .latest_content(&store, &key)
            .await
            .unwrap()
            .access_control_list()
            .unwrap();
        assert_eq!(
            acl,
            Some(vec![
                AclRecord::new(RoleId::new(1), PersonId::new(123)),
                AclRecord::new(RoleId::new(2), PersonId::new(5)),
                AclRecord::new(RoleId::new(2), PersonId::new(6)),
            ])
        );
        store.commit(permit).await.unwrap();
    }

    #[tokio::test]
    async fn legacy_reference_url() {
        let store = MemoryStore::default();
        let schemas = SchemaRegistry::new();
        let mut cache = SnapshotCache::new(&schemas, 10);
        let permit = store.begin().await.unwrap();

        let key = ObjectKey::new("Control", 1);
        store
            .insert_revision(&key, 42, &content(json!({ "url": "www.url-foo.com" })))
            .await
            .unwrap();

        // Warmed and single lookups convert the same way.
        let mut targets = BTreeMap::new();
        targets.insert("Control".to_string(), BTreeSet::from([ObjectId::new(1)]));
        let mut warmed = SnapshotCache::new(&schemas, 10);
        warmed.warm(&store, &targets).await.unwrap();

        let expected = json!([{
            "display_name": "www.url-foo.com",
            "document_type": "REFERENCE_URL",
            "id": null,
            "link": "www.url-foo.com",
            "title": "www.url-foo.com",
            "created_at": 42,
            "updated_at": 42,
        }]);
        assert_eq!(
            cache.latest_content(&store, &key).await.unwrap().get("reference_url"),
            Some(&expected)
        );
        assert_eq!(
            warmed.latest_content(&store, &key).await.unwrap().get("reference_url"),
            Some(&expected)
        );
        store.commit(permit).await.unwrap();
    }

    #[tokio::test]
    async fn resolve_people() {
        let store = MemoryStore::default();
        let schemas = SchemaRegistry::new();
        let mut cache = SnapshotCache::new(&schemas, 10);
        let permit = store.begin().await.unwrap();
        insert_people(&store, &[1, 2, 3]).await.unwrap();

        let ids: BTreeSet<PersonId> = [3, 1].into_iter().map(PersonId::new).collect();
        let people = cache.people(&store, &ids).await.unwrap();
        assert_eq!(
            people.iter().map(|person| person.id.as_u64()).collect::<Vec<_>>(),
            vec![1, 3]
        );
        assert_eq!(people[0].email, "person1@example.org");

        assert_matches!(
            cache.person(&store, PersonId::new(4)).await,
            Err(DiffError::UnknownPerson(id)) if id == PersonId::new(4)
        );

        let ids: BTreeSet<PersonId> = [2, 7].into_iter().map(PersonId::new).collect();
        assert_matches!(
            cache.people(&store, &ids).await,
            Err(DiffError::UnknownPerson(id)) if id == PersonId::new(7)
        );
        store.commit(permit).await.unwrap();
    }

    #[tokio::test]
    async fn resolve_people_in_batches() {
        let store = SqliteStore::temporary().await;
        let schemas = SchemaRegistry::new();
        let mut cache = SnapshotCache::new(&schemas, 2);
        let permit = store.begin().await.unwrap();
        insert_people(&store, &[1, 2, 3, 4, 5]).await.unwrap();

        // Already resolved people are not looked up again.
        cache.person(&store, PersonId::new(3)).await.unwrap();

        let ids: BTreeSet<PersonId> = (1..=5).map(PersonId::new).collect();
        let people = cache.people(&store, &ids).await.unwrap();
        assert_eq!(
            people.iter().map(|person| person.id.as_u64()).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
        assert_eq!(people[4].email, "person5@example.org");
        store.commit(permit).await.unwrap();
    }
}
