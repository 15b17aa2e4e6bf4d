// SPDX-License-Identifier: MIT OR Apache-2.0

use grc_core::{NewProposal, ObjectKey, Proposal, ProposalId, ProposalState};
use sqlx::{FromRow, query, query_as};

use crate::proposals::ProposalStore;
use crate::sqlite::{
    DecodeError, SqliteError, SqliteStore, decode_json, encode_json, from_sql_id, to_sql_id,
};

impl<'a> ProposalStore for SqliteStore<'a> {
    type Error = SqliteError;

    async fn insert_proposal(&self, proposal: NewProposal) -> Result<Proposal, Self::Error> {
        let content = encode_json("content", &proposal.content)?;

        let result = self
            .tx(async |tx| {
                query(
                    "
                    INSERT
                    INTO
                        proposals_v1 (
                            object_type,
                            object_id,
                            author,
                            agenda,
                            content,
                            state,
                            created_at
                        )
                    VALUES
                        (?, ?, ?, ?, ?, ?, ?)
                    ",
                )
                .bind(proposal.object.object_type.as_str())
                .bind(to_sql_id(proposal.object.id)?)
                .bind(to_sql_id(proposal.author)?)
                .bind(proposal.agenda.as_str())
                .bind(content)
                .bind(ProposalState::Proposed.as_str())
                .bind(to_sql_id(proposal.created_at)?)
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        let id: ProposalId = from_sql_id("id", result.last_insert_rowid())?;
        Ok(Proposal::from_new(id, proposal))
    }

    async fn proposal(&self, id: ProposalId) -> Result<Option<Proposal>, Self::Error> {
        let row = self
            .fetch(async |connection| {
                query_as::<_, ProposalRow>(
                    "
                    SELECT
                        id,
                        object_type,
                        object_id,
                        author,
                        agenda,
                        content,
                        state,
                        created_at,
                        applied_by,
                        apply_reason,
                        declined_by,
                        decline_reason
                    FROM
                        proposals_v1
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

        row.map(Proposal::try_from).transpose()
    }

    async fn proposals_for(&self, object: &ObjectKey) -> Result<Vec<Proposal>, Self::Error> {
        let rows = self
            .fetch(async |connection| {
                query_as::<_, ProposalRow>(
                    "
                    SELECT
                        id,
                        object_type,
                        object_id,
                        author,
                        agenda,
                        content,
                        state,
                        created_at,
                        applied_by,
                        apply_reason,
                        declined_by,
                        decline_reason
                    FROM
                        proposals_v1
                    WHERE
                        object_type = ?
                        AND object_id = ?
                    ORDER BY
                        id ASC
                    ",
                )
                .bind(object.object_type.as_str())
                .bind(to_sql_id(object.id)?)
                .fetch_all(&mut *connection)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        rows.into_iter().map(Proposal::try_from).collect()
    }

    async fn update_proposal(
        &self,
        proposal: &Proposal,
        expected: ProposalState,
    ) -> Result<bool, Self::Error> {
        let result = self
            .tx(async |tx| {
                // Only the transition metadata is written, the diff record stays as it is.
                query(
                    "
                    UPDATE
                        proposals_v1
                    SET
                        state = ?,
                        applied_by = ?,
                        apply_reason = ?,
                        declined_by = ?,
                        decline_reason = ?
                    WHERE
                        id = ?
                        AND state = ?
                    ",
                )
                .bind(proposal.state.as_str())
                .bind(proposal.applied_by.map(to_sql_id).transpose()?)
                .bind(proposal.apply_reason.as_deref())
                .bind(proposal.declined_by.map(to_sql_id).transpose()?)
                .bind(proposal.decline_reason.as_deref())
                .bind(to_sql_id(proposal.id)?)
                .bind(expected.as_str())
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Single proposal row as it is inserted in the SQLite database.
#[derive(Debug, FromRow)]
struct ProposalRow {
    id: i64,
    object_type: String,
    object_id: i64,
    author: i64,
    agenda: String,
    content: String,
    state: String,
    created_at: i64,
    applied_by: Option<i64>,
    apply_reason: Option<String>,
    declined_by: Option<i64>,
    decline_reason: Option<String>,
}

impl TryFrom<ProposalRow> for Proposal {
    type Error = SqliteError;

    fn try_from(row: ProposalRow) -> Result<Self, Self::Error> {
        Ok(Proposal {
            id: from_sql_id("id", row.id)?,
            object: ObjectKey {
                object_type: row.object_type,
                id: from_sql_id("object_id", row.object_id)?,
            },
            author: from_sql_id("author", row.author)?,
            agenda: row.agenda,
            content: decode_json("content", &row.content)?,
            state: row
                .state
                .parse()
                .map_err(|err| SqliteError::Decode("state".into(), DecodeError::from(err)))?,
            created_at: from_sql_id("created_at", row.created_at)?,
            applied_by: row
                .applied_by
                .map(|id| from_sql_id("applied_by", id))
                .transpose()?,
            apply_reason: row.apply_reason,
            declined_by: row
                .declined_by
                .map(|id| from_sql_id("declined_by", id))
                .transpose()?,
            decline_reason: row.decline_reason,
        })
    }
}
