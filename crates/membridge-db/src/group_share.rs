//! Postgres implementation of [`GroupShareStore`].

use crate::map_sqlx_err;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use membridge_core::{GroupShareMapping, GroupShareStore, StoreError};
use sqlx::{FromRow, PgPool};

#[derive(Debug, Clone, FromRow)]
struct GroupShareRow {
    id: i64,
    gid: String,
    folder_id: i64,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<GroupShareRow> for GroupShareMapping {
    fn from(row: GroupShareRow) -> Self {
        GroupShareMapping {
            id: row.id,
            gid: row.gid,
            folder_id: row.folder_id,
            deleted_at: row.deleted_at,
        }
    }
}

/// Share-mapping store backed by the `group_share_mappings` table.
#[derive(Debug, Clone)]
pub struct PgGroupShareStore {
    pool: PgPool,
}

impl PgGroupShareStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupShareStore for PgGroupShareStore {
    async fn find_by_gid(&self, gid: &str) -> Result<Option<GroupShareMapping>, StoreError> {
        sqlx::query_as::<_, GroupShareRow>(
            r"
            SELECT id, gid, folder_id, deleted_at
            FROM group_share_mappings
            WHERE gid = $1
            ",
        )
        .bind(gid)
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(GroupShareMapping::from))
        .map_err(map_sqlx_err)
    }

    async fn find_by_folder(
        &self,
        folder_id: i64,
    ) -> Result<Option<GroupShareMapping>, StoreError> {
        sqlx::query_as::<_, GroupShareRow>(
            r"
            SELECT id, gid, folder_id, deleted_at
            FROM group_share_mappings
            WHERE folder_id = $1
            ",
        )
        .bind(folder_id)
        .fetch_optional(&self.pool)
        .await
        .map(|row| row.map(GroupShareMapping::from))
        .map_err(map_sqlx_err)
    }

    async fn list_all(&self) -> Result<Vec<GroupShareMapping>, StoreError> {
        sqlx::query_as::<_, GroupShareRow>(
            r"
            SELECT id, gid, folder_id, deleted_at
            FROM group_share_mappings
            ORDER BY id
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(GroupShareMapping::from).collect())
        .map_err(map_sqlx_err)
    }

    async fn list_deleted_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<GroupShareMapping>, StoreError> {
        sqlx::query_as::<_, GroupShareRow>(
            r"
            SELECT id, gid, folder_id, deleted_at
            FROM group_share_mappings
            WHERE deleted_at IS NOT NULL AND deleted_at < $1
            ORDER BY id
            ",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.into_iter().map(GroupShareMapping::from).collect())
        .map_err(map_sqlx_err)
    }

    async fn insert(&self, gid: &str, folder_id: i64) -> Result<GroupShareMapping, StoreError> {
        // The unique indexes on gid and folder_id surface concurrent
        // inserts as a conflict; the engine re-reads and continues.
        sqlx::query_as::<_, GroupShareRow>(
            r"
            INSERT INTO group_share_mappings (gid, folder_id)
            VALUES ($1, $2)
            RETURNING id, gid, folder_id, deleted_at
            ",
        )
        .bind(gid)
        .bind(folder_id)
        .fetch_one(&self.pool)
        .await
        .map(GroupShareMapping::from)
        .map_err(map_sqlx_err)
    }

    async fn set_folder(&self, id: i64, folder_id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE group_share_mappings
            SET folder_id = $2
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(folder_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    async fn mark_deleted(&self, id: i64, at: DateTime<Utc>) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE group_share_mappings
            SET deleted_at = $2
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    async fn restore(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query(
            r"
            UPDATE group_share_mappings
            SET deleted_at = NULL
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound { id });
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query(
            r"
            DELETE FROM group_share_mappings
            WHERE id = $1
            ",
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map(|_| ())
        .map_err(map_sqlx_err)
    }
}
