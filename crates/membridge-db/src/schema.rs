//! Table definitions for bridge-owned state.

use sqlx::PgPool;

/// DDL statements, applied in order. Idempotent (`IF NOT EXISTS`).
const STATEMENTS: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS group_share_mappings (
        id          BIGSERIAL PRIMARY KEY,
        gid         TEXT NOT NULL,
        folder_id   BIGINT NOT NULL,
        deleted_at  TIMESTAMPTZ
    )
    ",
    r"
    CREATE UNIQUE INDEX IF NOT EXISTS group_share_mappings_gid_idx
        ON group_share_mappings (gid)
    ",
    r"
    CREATE UNIQUE INDEX IF NOT EXISTS group_share_mappings_folder_idx
        ON group_share_mappings (folder_id)
    ",
    r"
    CREATE TABLE IF NOT EXISTS queued_tasks (
        id          BIGSERIAL PRIMARY KEY,
        task_type   TEXT NOT NULL,
        parameter   TEXT NOT NULL,
        created_at  TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    ",
];

/// Create the bridge tables if they do not exist yet.
pub async fn apply(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
