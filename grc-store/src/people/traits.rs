// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use grc_core::{Person, PersonId};

/// Directory of people, resolving person ids to their email address.
pub trait PersonStore {
    type Error: Error;

    /// Inserts or updates a person.
    ///
    /// Returns `true` if the person got inserted or `false` if an existing entry was updated.
    fn insert_person(&self, person: &Person) -> impl Future<Output = Result<bool, Self::Error>>;

    /// Returns a person or `None` if the id is not known.
    fn person(&self, id: PersonId) -> impl Future<Output = Result<Option<Person>, Self::Error>>;

    /// Returns all known people of the given ids, sorted ascending by id. Unknown ids are left
    /// out.
    fn people(&self, ids: &[PersonId]) -> impl Future<Output = Result<Vec<Person>, Self::Error>>;
}
