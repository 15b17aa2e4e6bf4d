// SPDX-License-Identifier: MIT OR Apache-2.0

use grc_core::{Person, PersonId};
use sqlx::{FromRow, QueryBuilder, Sqlite, query, query_as};

use crate::people::PersonStore;
use crate::sqlite::{SqliteError, SqliteStore, from_sql_id, to_sql_id};

impl<'a> PersonStore for SqliteStore<'a> {
    type Error = SqliteError;

    async fn insert_person(&self, person: &Person) -> Result<bool, Self::Error> {
        self.tx(async |tx| {
            let exists = query(
                "
                SELECT
                    1
                FROM
                    people_v1
                WHERE
                    id = ?
                ",
            )
            .bind(to_sql_id(person.id)?)
            .fetch_optional(&mut **tx)
            .await?
            .is_some();

            query(
                "
                INSERT
                INTO
                    people_v1 (
                        id,
                        email
                    )
                VALUES
                    (?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    email = excluded.email
                ",
            )
            .bind(to_sql_id(person.id)?)
            .bind(person.email.as_str())
            .execute(&mut **tx)
            .await?;

            Ok(!exists)
        })
        .await
    }

    async fn person(&self, id: PersonId) -> Result<Option<Person>, Self::Error> {
        let row = self
            .fetch(async |connection| {
                query_as::<_, PersonRow>(
                    "
                    SELECT
                        id,
                        email
                    FROM
                        people_v1
                    WHERE
                        id = ?
                    ",
                )
                .bind(to_sql_id(id)?)
                .fetch_optional(&mut *connection)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        row.map(Person::try_from).transpose()
    }

    async fn people(&self, ids: &[PersonId]) -> Result<Vec<Person>, Self::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .fetch(async |connection| {
                let mut builder: QueryBuilder<Sqlite> =
                    QueryBuilder::new("SELECT id, email FROM people_v1 WHERE id IN (");
                let mut separated = builder.separated(", ");
                for id in ids {
                    separated.push_bind(to_sql_id(*id)?);
                }
                separated.push_unseparated(") ORDER BY id ASC");

                builder
                    .build_query_as::<PersonRow>()
                    .fetch_all(&mut *connection)
                    .await
                    .map_err(SqliteError::Sqlite)
            })
            .await?;

        rows.into_iter().map(Person::try_from).collect()
    }
}

#[derive(Debug, FromRow)]
struct PersonRow {
    id: i64,
    email: String,
}

impl TryFrom<PersonRow> for Person {
    type Error = SqliteError;

    fn try_from(row: PersonRow) -> Result<Self, Self::Error> {
        Ok(Person {
            id: from_sql_id::<PersonId>("id", row.id)?,
            email: row.email,
        })
    }
}
