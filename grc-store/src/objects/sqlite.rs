// SPDX-License-Identifier: MIT OR Apache-2.0

use grc_core::{
    AccessControlEntry, AttributeValue, LiveObject, MappedObject, ObjectId, ObjectKey, ObjectRef,
};
use serde_json::Value;
use sqlx::{FromRow, SqliteConnection, query, query_as};

use crate::objects::ObjectStore;
use crate::sqlite::{SqliteError, SqliteStore, decode_json, encode_json, from_sql_id, to_sql_id};

/// Tables holding the relations of an object, all keyed by `(object_type, object_id)`.
const RELATION_TABLES: [&str; 5] = [
    "object_fields_v1",
    "acl_entries_v1",
    "attribute_values_v1",
    "mappings_v1",
    "mapping_lists_v1",
];

impl<'a> ObjectStore for SqliteStore<'a> {
    type Error = SqliteError;

    async fn insert_object(&self, object: &LiveObject) -> Result<bool, Self::Error> {
        self.tx(async |tx| {
            let created = ensure_object(&mut **tx, &object.key).await?;

            for table in RELATION_TABLES {
                query(&format!(
                    "DELETE FROM {table} WHERE object_type = ? AND object_id = ?"
                ))
                .bind(object.key.object_type.as_str())
                .bind(to_sql_id(object.key.id)?)
                .execute(&mut **tx)
                .await?;
            }

            for (name, value) in &object.fields {
                upsert_field(&mut **tx, &object.key, name, value).await?;
            }

            for entry in object.acl_entries() {
                insert_acl_entry(&mut **tx, &entry).await?;
            }

            for value in object.attribute_values.values() {
                upsert_attribute_value(&mut **tx, &object.key, value).await?;
            }

            for (field, target) in &object.mappings {
                upsert_mapping(&mut **tx, &object.key, field, target).await?;
            }

            for (field, items) in &object.mapping_lists {
                for item in items.values() {
                    insert_mapping_list_item(&mut **tx, &object.key, field, item).await?;
                }
            }

            Ok(created)
        })
        .await
    }

    async fn object(&self, key: &ObjectKey) -> Result<Option<LiveObject>, Self::Error> {
        self.fetch(async |connection| {
            let exists = query(
                "
                SELECT
                    1
                FROM
                    objects_v1
                WHERE
                    object_type = ?
                    AND object_id = ?
                ",
            )
            .bind(key.object_type.as_str())
            .bind(to_sql_id(key.id)?)
            .fetch_optional(&mut *connection)
            .await?
            .is_some();

            if !exists {
                return Ok(None);
            }

            let mut object = LiveObject::new(key.clone());

            let fields = query_as::<_, FieldRow>(
                "
                SELECT
                    name,
                    value
                FROM
                    object_fields_v1
                WHERE
                    object_type = ?
                    AND object_id = ?
                ",
            )
            .bind(key.object_type.as_str())
            .bind(to_sql_id(key.id)?)
            .fetch_all(&mut *connection)
            .await?;
            for row in fields {
                let value = decode_json("field", &row.value)?;
                object.fields.insert(row.name, value);
            }

            for entry in select_acl_entries(&mut *connection, key).await? {
                object.acl.insert((entry.role_id, entry.person_id));
            }

            let attribute_values = query_as::<_, AttributeValueRow>(
                "
                SELECT
                    attribute_id,
                    value,
                    linked_person_id
                FROM
                    attribute_values_v1
                WHERE
                    object_type = ?
                    AND object_id = ?
                ",
            )
            .bind(key.object_type.as_str())
            .bind(to_sql_id(key.id)?)
            .fetch_all(&mut *connection)
            .await?;
            for row in attribute_values {
                let value = AttributeValue::try_from(row)?;
                object.attribute_values.insert(value.attribute_id, value);
            }

            let mappings = query_as::<_, MappingRow>(
                "
                SELECT
                    field,
                    target
                FROM
                    mappings_v1
                WHERE
                    object_type = ?
                    AND object_id = ?
                ",
            )
            .bind(key.object_type.as_str())
            .bind(to_sql_id(key.id)?)
            .fetch_all(&mut *connection)
            .await?;
            for row in mappings {
                let target: ObjectRef = decode_json("target", &row.target)?;
                object.mappings.insert(row.field, target);
            }

            let mapping_lists = query_as::<_, MappingListRow>(
                "
                SELECT
                    field,
                    record
                FROM
                    mapping_lists_v1
                WHERE
                    object_type = ?
                    AND object_id = ?
                ",
            )
            .bind(key.object_type.as_str())
            .bind(to_sql_id(key.id)?)
            .fetch_all(&mut *connection)
            .await?;
            for row in mapping_lists {
                let item: MappedObject = decode_json("record", &row.record)?;
                object
                    .mapping_lists
                    .entry(row.field)
                    .or_default()
                    .insert(item.id, item);
            }

            Ok(Some(object))
        })
        .await
    }

    async fn set_field(&self, key: &ObjectKey, name: &str, value: &Value) -> Result<(), Self::Error> {
        self.tx(async |tx| {
            ensure_object(&mut **tx, key).await?;
            upsert_field(&mut **tx, key, name, value).await
        })
        .await
    }

    async fn acl_entries(&self, key: &ObjectKey) -> Result<Vec<AccessControlEntry>, Self::Error> {
        self.fetch(async |connection| select_acl_entries(connection, key).await)
            .await
    }

    async fn insert_acl_entry(&self, entry: &AccessControlEntry) -> Result<bool, Self::Error> {
        self.tx(async |tx| {
            ensure_object(&mut **tx, &entry.object).await?;
            insert_acl_entry(&mut **tx, entry).await
        })
        .await
    }

    async fn remove_acl_entry(&self, entry: &AccessControlEntry) -> Result<bool, Self::Error> {
        let result = self
            .tx(async |tx| {
                query(
                    "
                    DELETE FROM
                        acl_entries_v1
                    WHERE
                        object_type = ?
                        AND object_id = ?
                        AND role_id = ?
                        AND person_id = ?
                    ",
                )
                .bind(entry.object.object_type.as_str())
                .bind(to_sql_id(entry.object.id)?)
                .bind(to_sql_id(entry.role_id)?)
                .bind(to_sql_id(entry.person_id)?)
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_attribute_value(
        &self,
        key: &ObjectKey,
        value: &AttributeValue,
    ) -> Result<(), Self::Error> {
        self.tx(async |tx| {
            ensure_object(&mut **tx, key).await?;
            upsert_attribute_value(&mut **tx, key, value).await
        })
        .await
    }

    async fn set_mapping(
        &self,
        key: &ObjectKey,
        field: &str,
        target: Option<&ObjectRef>,
    ) -> Result<(), Self::Error> {
        self.tx(async |tx| {
            ensure_object(&mut **tx, key).await?;
            match target {
                Some(target) => upsert_mapping(&mut **tx, key, field, target).await,
                None => {
                    query(
                        "
                        DELETE FROM
                            mappings_v1
                        WHERE
                            object_type = ?
                            AND object_id = ?
                            AND field = ?
                        ",
                    )
                    .bind(key.object_type.as_str())
                    .bind(to_sql_id(key.id)?)
                    .bind(field)
                    .execute(&mut **tx)
                    .await?;
                    Ok(())
                }
            }
        })
        .await
    }

    async fn add_mapping_list_item(
        &self,
        key: &ObjectKey,
        field: &str,
        item: &MappedObject,
    ) -> Result<bool, Self::Error> {
        self.tx(async |tx| {
            ensure_object(&mut **tx, key).await?;
            insert_mapping_list_item(&mut **tx, key, field, item).await
        })
        .await
    }

    async fn remove_mapping_list_item(
        &self,
        key: &ObjectKey,
        field: &str,
        id: ObjectId,
    ) -> Result<bool, Self::Error> {
        let result = self
            .tx(async |tx| {
                query(
                    "
                    DELETE FROM
                        mapping_lists_v1
                    WHERE
                        object_type = ?
                        AND object_id = ?
                        AND field = ?
                        AND target_id = ?
                    ",
                )
                .bind(key.object_type.as_str())
                .bind(to_sql_id(key.id)?)
                .bind(field)
                .bind(to_sql_id(id)?)
                .execute(&mut **tx)
                .await
                .map_err(SqliteError::Sqlite)
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Create the object row if it does not exist yet. Returns `true` if it was created.
async fn ensure_object(
    connection: &mut SqliteConnection,
    key: &ObjectKey,
) -> Result<bool, SqliteError> {
    let result = query(
        "
        INSERT OR IGNORE
        INTO
            objects_v1 (
                object_type,
                object_id
            )
        VALUES
            (?, ?)
        ",
    )
    .bind(key.object_type.as_str())
    .bind(to_sql_id(key.id)?)
    .execute(connection)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn upsert_field(
    connection: &mut SqliteConnection,
    key: &ObjectKey,
    name: &str,
    value: &Value,
) -> Result<(), SqliteError> {
    query(
        "
        INSERT
        INTO
            object_fields_v1 (
                object_type,
                object_id,
                name,
                value
            )
        VALUES
            (?, ?, ?, ?)
        ON CONFLICT(object_type, object_id, name) DO UPDATE SET
            value = excluded.value
        ",
    )
    .bind(key.object_type.as_str())
    .bind(to_sql_id(key.id)?)
    .bind(name)
    .bind(encode_json("field", value)?)
    .execute(connection)
    .await?;
    Ok(())
}

async fn select_acl_entries(
    connection: &mut SqliteConnection,
    key: &ObjectKey,
) -> Result<Vec<AccessControlEntry>, SqliteError> {
    let rows = query_as::<_, AclRow>(
        "
        SELECT
            role_id,
            person_id
        FROM
            acl_entries_v1
        WHERE
            object_type = ?
            AND object_id = ?
        ORDER BY
            role_id ASC,
            person_id ASC
        ",
    )
    .bind(key.object_type.as_str())
    .bind(to_sql_id(key.id)?)
    .fetch_all(connection)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(AccessControlEntry {
                role_id: from_sql_id("role_id", row.role_id)?,
                person_id: from_sql_id("person_id", row.person_id)?,
                object: key.clone(),
            })
        })
        .collect()
}

async fn insert_acl_entry(
    connection: &mut SqliteConnection,
    entry: &AccessControlEntry,
) -> Result<bool, SqliteError> {
    let result = query(
        "
        INSERT OR IGNORE
        INTO
            acl_entries_v1 (
                object_type,
                object_id,
                role_id,
                person_id
            )
        VALUES
            (?, ?, ?, ?)
        ",
    )
    .bind(entry.object.object_type.as_str())
    .bind(to_sql_id(entry.object.id)?)
    .bind(to_sql_id(entry.role_id)?)
    .bind(to_sql_id(entry.person_id)?)
    .execute(connection)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn upsert_attribute_value(
    connection: &mut SqliteConnection,
    key: &ObjectKey,
    value: &AttributeValue,
) -> Result<(), SqliteError> {
    query(
        "
        INSERT
        INTO
            attribute_values_v1 (
                object_type,
                object_id,
                attribute_id,
                value,
                linked_person_id
            )
        VALUES
            (?, ?, ?, ?, ?)
        ON CONFLICT(object_type, object_id, attribute_id) DO UPDATE SET
            value = excluded.value,
            linked_person_id = excluded.linked_person_id
        ",
    )
    .bind(key.object_type.as_str())
    .bind(to_sql_id(key.id)?)
    .bind(to_sql_id(value.attribute_id)?)
    .bind(value.value.as_str())
    .bind(value.object_id.map(to_sql_id).transpose()?)
    .execute(connection)
    .await?;
    Ok(())
}

async fn upsert_mapping(
    connection: &mut SqliteConnection,
    key: &ObjectKey,
    field: &str,
    target: &ObjectRef,
) -> Result<(), SqliteError> {
    query(
        "
        INSERT
        INTO
            mappings_v1 (
                object_type,
                object_id,
                field,
                target
            )
        VALUES
            (?, ?, ?, ?)
        ON CONFLICT(object_type, object_id, field) DO UPDATE SET
            target = excluded.target
        ",
    )
    .bind(key.object_type.as_str())
    .bind(to_sql_id(key.id)?)
    .bind(field)
    .bind(encode_json("target", target)?)
    .execute(connection)
    .await?;
    Ok(())
}

async fn insert_mapping_list_item(
    connection: &mut SqliteConnection,
    key: &ObjectKey,
    field: &str,
    item: &MappedObject,
) -> Result<bool, SqliteError> {
    let result = query(
        "
        INSERT OR IGNORE
        INTO
            mapping_lists_v1 (
                object_type,
                object_id,
                field,
                target_id,
                record
            )
        VALUES
            (?, ?, ?, ?, ?)
        ",
    )
    .bind(key.object_type.as_str())
    .bind(to_sql_id(key.id)?)
    .bind(field)
    .bind(to_sql_id(item.id)?)
    .bind(encode_json("record", item)?)
    .execute(connection)
    .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(Debug, FromRow)]
struct FieldRow {
    name: String,
    value: String,
}

#[derive(Debug, FromRow)]
struct AclRow {
    role_id: i64,
    person_id: i64,
}

#[derive(Debug, FromRow)]
struct AttributeValueRow {
    attribute_id: i64,
    value: String,
    linked_person_id: Option<i64>,
}

impl TryFrom<AttributeValueRow> for AttributeValue {
    type Error = SqliteError;

    fn try_from(row: AttributeValueRow) -> Result<Self, Self::Error> {
        Ok(AttributeValue {
            attribute_id: from_sql_id("attribute_id", row.attribute_id)?,
            value: row.value,
            object_id: row
                .linked_person_id
                .map(|id| from_sql_id("linked_person_id", id))
                .transpose()?,
        })
    }
}

#[derive(Debug, FromRow)]
struct MappingRow {
    field: String,
    target: String,
}

#[derive(Debug, FromRow)]
struct MappingListRow {
    field: String,
    record: String,
}
