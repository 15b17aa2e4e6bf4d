// SPDX-License-Identifier: MIT OR Apache-2.0

use grc_core::{Content, ObjectId, ObjectKey, Revision, RevisionId};
use sqlx::{FromRow, QueryBuilder, Sqlite, query, query_as};

use crate::revisions::RevisionStore;
use crate::sqlite::{SqliteError, SqliteStore, decode_json, encode_json, from_sql_id, to_sql_id};

impl<'a> RevisionStore for SqliteStore<'a> {
    type Error = SqliteError;

    async fn insert_revision(
        &self,
        resource: &ObjectKey,
        created_at: u64,
        content: &Content,
    ) -> Result<RevisionId, Self::Error> {
        let content = encode_json("content", content)?;

        let result = self
            .tx(async |tx| {
                query(
                    "
                    INSERT
                    INTO
                        revisions_v1 (
                            resource_type,
                            resource_id,
                            created_at,
                            content
                        )
                    VALUES
                        (?, ?, ?, ?)
                    ",
                )
                .bind(resource.object_type.as_str())
                .bind(to_sql_id(resource.id)?)
                .bind(to_sql_id(created_at)?)
                .bind(content)
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        from_sql_id("id", result.last_insert_rowid())
    }

    async fn latest_revision(&self, resource: &ObjectKey) -> Result<Option<Revision>, Self::Error> {
        let row = self
            .fetch(async |connection| {
                query_as::<_, RevisionRow>(
                    "
                    SELECT
                        id,
                        resource_type,
                        resource_id,
                        created_at,
                        content
                    FROM
                        revisions_v1
                    WHERE
                        resource_type = ?
                        AND resource_id = ?
                    ORDER BY
                        created_at DESC,
                        id DESC
                    LIMIT 1
                    ",
                )
                .bind(resource.object_type.as_str())
                .bind(to_sql_id(resource.id)?)
                .fetch_optional(&mut *connection)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        row.map(Revision::try_from).transpose()
    }

    async fn latest_revisions(
        &self,
        object_type: &str,
        ids: &[ObjectId],
    ) -> Result<Vec<Revision>, Self::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self
            .fetch(async |connection| {
                let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
                    "
                    SELECT
                        id,
                        resource_type,
                        resource_id,
                        created_at,
                        content
                    FROM
                        revisions_v1
                    WHERE
                        resource_type = ",
                );
                builder.push_bind(object_type);
                builder.push(" AND resource_id IN (");
                let mut separated = builder.separated(", ");
                for id in ids {
                    separated.push_bind(to_sql_id(*id)?);
                }
                separated.push_unseparated(")");
                builder.push(" ORDER BY resource_id ASC, created_at DESC, id DESC");

                builder
                    .build_query_as::<RevisionRow>()
                    .fetch_all(&mut *connection)
                    .await
                    .map_err(SqliteError::Sqlite)
            })
            .await?;

        // Rows are sorted by recency within every object, keep the first one of each.
        let mut revisions: Vec<Revision> = Vec::new();
        for row in rows {
            if revisions
                .last()
                .is_some_and(|last| {
                    i64::try_from(last.resource.id.as_u64()).is_ok_and(|id| id == row.resource_id)
                })
            {
                continue;
            }
            revisions.push(row.try_into()?);
        }

        Ok(revisions)
    }

    async fn revisions(&self, resource: &ObjectKey) -> Result<Vec<Revision>, Self::Error> {
        let rows = self
            .fetch(async |connection| {
                query_as::<_, RevisionRow>(
                    "
                    SELECT
                        id,
                        resource_type,
                        resource_id,
                        created_at,
                        content
                    FROM
                        revisions_v1
                    WHERE
                        resource_type = ?
                        AND resource_id = ?
                    ORDER BY
                        created_at ASC,
                        id ASC
                    ",
                )
                .bind(resource.object_type.as_str())
                .bind(to_sql_id(resource.id)?)
                .fetch_all(&mut *connection)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        rows.into_iter().map(Revision::try_from).collect()
    }
}

/// Single revision row as it is inserted in the SQLite database.
#[derive(Debug, FromRow)]
struct RevisionRow {
    id: i64,
    resource_type: String,
    resource_id: i64,
    created_at: i64,
    content: String,
}

impl TryFrom<RevisionRow> for Revision {
    type Error = SqliteError;

    fn try_from(row: RevisionRow) -> Result<Self, Self::Error> {
        Ok(Revision {
            id: from_sql_id("id", row.id)?,
            resource: ObjectKey {
                object_type: row.resource_type,
                id: from_sql_id("resource_id", row.resource_id)?,
            },
            created_at: from_sql_id("created_at", row.created_at)?,
            content: decode_json("content", &row.content)?,
        })
    }
}
