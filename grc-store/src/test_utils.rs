// SPDX-License-Identifier: MIT OR Apache-2.0

/// Run the same test logic against every store backend.
///
/// The body is executed once with a fresh `MemoryStore` and once with a temporary in-memory
/// `SqliteStore`. Both run inside a transaction which is committed after the body finished, so
/// store methods writing data can be called directly.
///
/// ## Example
///
/// ```rust
/// # use grc_core::{Person, PersonId};
/// # use grc_store::assert_all_stores;
/// # use grc_store::people::PersonStore;
/// # async fn run() {
/// assert_all_stores!(|store| async {
///     let person = Person::new(PersonId::new(1), "one@example.org");
///     store.insert_person(&person).await.unwrap();
///     assert_eq!(store.person(person.id).await.unwrap(), Some(person));
/// });
/// # }
/// ```
#[macro_export]
macro_rules! assert_all_stores {
    (|$store:ident| $test_body:expr) => {
        {
            use $crate::traits::Transaction as _;

            // Test with MemoryStore.
            {
                let memory_store = $crate::memory::MemoryStore::default();
                let permit = memory_store.begin().await.unwrap();
                let $store = memory_store.clone();
                $test_body.await;
                memory_store.commit(permit).await.unwrap();
            }

            // Test with SqliteStore.
            {
                let sqlite_store = $crate::sqlite::SqliteStore::temporary().await;
                let permit = sqlite_store.begin().await.unwrap();
                let $store = sqlite_store.clone();
                $test_body.await;
                sqlite_store.commit(permit).await.unwrap();
            }
        }
    };
}
