// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite backend with a connection pool and a serializing transaction provider.
use std::sync::Arc;

use grc_core::ProposalStateError;
use sqlx::migrate::{MigrateDatabase, Migrator};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqliteConnection, migrate};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

/// Create SQLite database if it doesn't already exist.
pub async fn create_database(url: &str) -> Result<(), SqliteError> {
    if !Sqlite::database_exists(url).await? {
        Sqlite::create_database(url).await?
    }
    Ok(())
}

/// Table schemas for revisions, people, proposals and live objects.
pub fn migrations() -> Migrator {
    migrate!()
}

/// Run any pending database migrations.
pub async fn run_pending_migrations(pool: &sqlx::SqlitePool) -> Result<(), SqliteError> {
    migrations().run(pool).await?;
    Ok(())
}

/// Configuration of a `SqliteStore`.
///
/// Defaults to an in-memory database with migrations applied.
pub struct SqliteStoreBuilder {
    url: String,
    max_connections: u32,
    run_migrations: bool,
    create_database: bool,
}

impl Default for SqliteStoreBuilder {
    fn default() -> Self {
        Self {
            url: "sqlite::memory:".into(),
            max_connections: 16,
            create_database: true,
            run_migrations: true,
        }
    }
}

impl SqliteStoreBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(any(test, feature = "test_utils"))]
    pub fn random_memory_url(mut self) -> Self {
        // Separate in-memory databases of concurrently running tests by giving each one a random
        // name, see: https://github.com/launchbadge/sqlx/issues/2510
        self.url = format!(
            "sqlite://grcmem{}?mode=memory&cache=private",
            rand::random::<u32>()
        );
        self
    }

    pub fn database_url(mut self, url: &str) -> Self {
        self.url = url.to_string();
        self
    }

    pub fn max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn create_database(mut self, create_database: bool) -> Self {
        self.create_database = create_database;
        self
    }

    pub fn run_default_migrations(mut self, run_migrations: bool) -> Self {
        self.run_migrations = run_migrations;
        self
    }

    pub async fn build<'a>(self) -> Result<SqliteStore<'a>, SqliteError> {
        if self.create_database {
            create_database(&self.url).await?;
        }

        let pool: sqlx::SqlitePool = SqlitePoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&self.url)
            .await?;

        if self.run_migrations {
            run_pending_migrations(&pool).await?;
        }

        Ok(SqliteStore::new(pool))
    }
}

pub type Transaction<'a> = sqlx::Transaction<'a, Sqlite>;

/// SQLite database with connection pool and transaction provider.
///
/// Clones share the pool and the currently running transaction. Only one transaction can run at
/// a time: `begin` hands out a `TransactionPermit` and waits while another one is held, the
/// permit is returned with `commit` or `rollback`.
///
/// Writes always go through `tx` and fail with `SqliteError::TransactionMissing` outside of a
/// transaction. Reads go through `fetch` which uses the running transaction when there is one,
/// so a proposal or apply operation observes its own uncommitted writes.
///
/// ```text
/// propose:  begin --> read revision --> read people --> insert proposal --> commit
///
/// apply:                                     begin --> read proposal --> write object ...
///                                              ^
///                                              waits for the permit of "propose"
/// ```
#[derive(Clone, Debug)]
pub struct SqliteStore<'a> {
    tx: Arc<Mutex<Option<Transaction<'a>>>>,
    pool: sqlx::SqlitePool,
    semaphore: Arc<Semaphore>,
}

impl<'a> SqliteStore<'a> {
    pub(crate) fn new(pool: sqlx::SqlitePool) -> Self {
        Self {
            tx: Arc::default(),
            pool,
            // One writing transaction at a time.
            semaphore: Arc::new(Semaphore::new(1)),
        }
    }

    /// In-memory database with a random name and a single connection, for tests.
    #[cfg(any(test, feature = "test_utils"))]
    pub async fn temporary() -> Self {
        SqliteStoreBuilder::new()
            .random_memory_url()
            .max_connections(1)
            .build()
            .await
            .expect("migrations succeeded")
    }

    /// Execute SQL query within the running transaction.
    ///
    /// Returns an error if no transaction was started with `begin`. Failed queries do not roll
    /// back the transaction, this is up to the holder of the permit.
    pub async fn tx<F, R>(&self, f: F) -> Result<R, SqliteError>
    where
        F: AsyncFnOnce(&mut Transaction) -> Result<R, SqliteError>,
    {
        let mut tx_ref = self.tx.lock().await;
        let tx = tx_ref.as_mut().ok_or(SqliteError::TransactionMissing)?;

        f(tx).await
    }

    /// Execute a reading SQL query within the running transaction or, if there is none, on a
    /// pooled connection.
    pub async fn fetch<F, R>(&self, f: F) -> Result<R, SqliteError>
    where
        F: AsyncFnOnce(&mut SqliteConnection) -> Result<R, SqliteError>,
    {
        let mut tx_ref = self.tx.lock().await;
        if let Some(tx) = tx_ref.as_mut() {
            return f(&mut **tx).await;
        }
        drop(tx_ref);

        let mut connection = self.pool.acquire().await?;
        f(&mut *connection).await
    }
}

impl<'a> crate::traits::Transaction for SqliteStore<'a> {
    type Error = SqliteError;

    type Permit = TransactionPermit;

    /// Begins a transaction, waiting until any other permit holder committed or rolled back.
    async fn begin(&self) -> Result<TransactionPermit, SqliteError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .expect("semaphore is never closed while the store exists");

        // The mutex only guards access to the transaction object, the permit serializes
        // transactions.
        let mut tx_ref = self.tx.lock().await;
        assert!(
            tx_ref.is_none(),
            "no transaction can be running after the permit was acquired"
        );

        let tx = self.pool.begin().await?;
        tx_ref.replace(tx);

        Ok(TransactionPermit(permit))
    }

    /// Rolls back all uncommitted changes and frees the permit.
    async fn rollback(&self, permit: TransactionPermit) -> Result<(), SqliteError> {
        let Some(tx) = self.tx.lock().await.take() else {
            panic!("transaction is gone while its permit is still held")
        };

        let result = tx.rollback().await.map_err(SqliteError::Sqlite);

        // Free the permit even if the rollback failed.
        drop(permit);

        result
    }

    /// Commits all changes and frees the permit.
    async fn commit(&self, permit: TransactionPermit) -> Result<(), SqliteError> {
        let Some(tx) = self.tx.lock().await.take() else {
            panic!("transaction is gone while its permit is still held")
        };

        let result = tx.commit().await.map_err(SqliteError::Sqlite);

        drop(permit);

        result
    }
}

#[allow(unused)]
pub struct TransactionPermit(OwnedSemaphorePermit);

#[derive(Debug, Error)]
pub enum SqliteError {
    /// A write was attempted without calling `begin` first. This indicates misuse of the API.
    #[error("tried to interact with inexistant transaction")]
    TransactionMissing,

    /// SQLite database and connection error.
    #[error(transparent)]
    Sqlite(#[from] sqlx::Error),

    /// SQL table schema migration error.
    #[error(transparent)]
    Migrate(#[from] migrate::MigrateError),

    /// A value could not be serialized to JSON before storing it. This is a critical error.
    #[error("failed encoding '{0}' value before storing to database: {1}")]
    Encode(String, serde_json::Error),

    /// An unsigned integer is too large to be stored as a signed 64-bit SQLite integer.
    #[error("integer {0} out of range for storing it in database")]
    OutOfRange(u64),

    /// Invalid, corrupted data was found in the database. This is a critical error.
    #[error("could not decode corrupted '{0}' value from database: {1}")]
    Decode(String, DecodeError),
}

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    ProposalState(#[from] ProposalStateError),

    #[error("integer {0} out of range")]
    OutOfRange(i64),
}

/// Ids are unsigned, SQLite integers are signed 64-bit.
pub(crate) fn to_sql_id(id: impl Into<u64>) -> Result<i64, SqliteError> {
    let id = id.into();
    i64::try_from(id).map_err(|_| SqliteError::OutOfRange(id))
}

pub(crate) fn from_sql_id<T: From<u64>>(name: &str, value: i64) -> Result<T, SqliteError> {
    u64::try_from(value)
        .map(T::from)
        .map_err(|_| SqliteError::Decode(name.to_string(), DecodeError::OutOfRange(value)))
}

pub(crate) fn encode_json<T: serde::Serialize>(name: &str, value: &T) -> Result<String, SqliteError> {
    serde_json::to_string(value).map_err(|err| SqliteError::Encode(name.to_string(), err))
}

pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    name: &str,
    value: &str,
) -> Result<T, SqliteError> {
    serde_json::from_str(value).map_err(|err| SqliteError::Decode(name.to_string(), err.into()))
}

#[cfg(test)]
mod tests {
    use std::task::Poll;

    use futures_test::task::noop_context;
    use sqlx::{query, query_as};
    use tokio::pin;

    use crate::sqlite::{SqliteError, SqliteStoreBuilder};
    use crate::traits::Transaction;

    #[tokio::test]
    async fn transaction_provider() {
        let store = SqliteStoreBuilder::new()
            .run_default_migrations(false)
            .random_memory_url()
            .build()
            .await
            .unwrap();

        assert!(matches!(
            store.tx(async |_| Ok(())).await,
            Err(SqliteError::TransactionMissing)
        ));

        let permit = store.begin().await.unwrap();

        // A second transaction has to wait for the permit.
        assert!(matches!(
            {
                let fut = store.begin();
                let mut cx = noop_context();
                pin!(fut);
                fut.poll(&mut cx)
            },
            Poll::Pending
        ));

        assert!(store.tx(async |_| Ok(())).await.is_ok());
        assert!(store.commit(permit).await.is_ok());

        assert!(matches!(
            store.tx(async |_| Ok(())).await,
            Err(SqliteError::TransactionMissing)
        ));
    }

    #[tokio::test]
    async fn fetch_reads_uncommitted_writes() {
        let store = SqliteStoreBuilder::new()
            .random_memory_url()
            .max_connections(1)
            .build()
            .await
            .unwrap();

        let count = async || {
            store
                .fetch(async |connection| {
                    let row: (i64,) = query_as("SELECT COUNT(*) FROM people_v1")
                        .fetch_one(&mut *connection)
                        .await?;
                    Ok(row.0)
                })
                .await
                .unwrap()
        };

        let permit = store.begin().await.unwrap();
        store
            .tx(async |tx| {
                query("INSERT INTO people_v1 (id, email) VALUES (1, 'one@example.org')")
                    .execute(&mut **tx)
                    .await?;
                Ok(())
            })
            .await
            .unwrap();

        // Reading through the single pooled connection would block here.
        assert_eq!(count().await, 1);

        store.rollback(permit).await.unwrap();
        assert_eq!(count().await, 0);
    }

    #[tokio::test]
    async fn serialized_transactions() {
        let store_1 = SqliteStoreBuilder::new()
            .max_connections(1)
            .random_memory_url()
            .build()
            .await
            .unwrap();

        let store_2 = store_1.clone();

        let permit_1 = store_1.begin().await.unwrap();

        let handle = tokio::spawn(async move {
            // Waits until the first transaction got committed.
            let permit_2 = store_2.begin().await.unwrap();

            let email = store_2
                .fetch(async |connection| {
                    let row: (String,) = query_as("SELECT email FROM people_v1 WHERE id = 1")
                        .fetch_one(&mut *connection)
                        .await?;
                    Ok(row.0)
                })
                .await
                .unwrap();
            assert_eq!(email, "one@example.org");

            store_2
                .tx(async |tx| {
                    query("UPDATE people_v1 SET email = 'other@example.org' WHERE id = 1")
                        .execute(&mut **tx)
                        .await?;
                    Ok(())
                })
                .await
                .unwrap();

            store_2.rollback(permit_2).await.unwrap();

            let email = store_2
                .fetch(async |connection| {
                    let row: (String,) = query_as("SELECT email FROM people_v1 WHERE id = 1")
                        .fetch_one(&mut *connection)
                        .await?;
                    Ok(row.0)
                })
                .await
                .unwrap();
            assert_eq!(email, "one@example.org");
        });

        store_1
            .tx(async |tx| {
                query("INSERT INTO people_v1 (id, email) VALUES (1, 'one@example.org')")
                    .execute(&mut **tx)
                    .await?;
                Ok(())
            })
            .await
            .unwrap();

        store_1.commit(permit_1).await.unwrap();

        handle.await.unwrap();
    }
}
