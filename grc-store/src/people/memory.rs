// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;
use std::convert::Infallible;

use grc_core::{Person, PersonId};

use crate::checkpoint::Checkpointed;
use crate::memory::MemoryStore;
use crate::people::PersonStore;

#[derive(Clone, Debug)]
pub struct PersonMemoryStore {
    people: Checkpointed<BTreeMap<PersonId, Person>>,
}

impl PersonMemoryStore {
    pub fn new() -> Self {
        Self {
            people: Checkpointed::new(),
        }
    }

    pub(crate) fn save_checkpoint(&self) {
        self.people.save();
    }

    pub(crate) fn restore_checkpoint(&self) {
        self.people.restore();
    }

    pub(crate) fn discard_checkpoint(&self) {
        self.people.discard();
    }
}

impl Default for PersonMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PersonStore for MemoryStore {
    type Error = Infallible;

    async fn insert_person(&self, person: &Person) -> Result<bool, Self::Error> {
        let mut people = self.people.people.state().borrow_mut();
        Ok(people.insert(person.id, person.clone()).is_none())
    }

    async fn person(&self, id: PersonId) -> Result<Option<Person>, Self::Error> {
        let people = self.people.people.state().borrow();
        Ok(people.get(&id).cloned())
    }

    async fn people(&self, ids: &[PersonId]) -> Result<Vec<Person>, Self::Error> {
        let people = self.people.people.state().borrow();
        let mut result: Vec<Person> = ids
            .iter()
            .filter_map(|id| people.get(id).cloned())
            .collect();
        result.sort();
        result.dedup();
        Ok(result)
    }
}
