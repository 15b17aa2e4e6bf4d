// SPDX-License-Identifier: MIT OR Apache-2.0

use grc_core::{Person, PersonId};
use grc_store::PersonStore;

pub fn setup_logging() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    }
}

/// Register people with generated email addresses in the directory.
pub async fn insert_people<S: PersonStore>(store: &S, ids: &[u64]) -> Result<(), S::Error> {
    for id in ids {
        let person = Person::new(PersonId::new(*id), &format!("person{id}@example.org"));
        store.insert_person(&person).await?;
    }
    Ok(())
}
