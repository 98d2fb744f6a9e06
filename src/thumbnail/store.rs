//! Repository for the `thumbnail_records` table.

use sqlx::SqlitePool;

use super::ThumbnailRecord;

impl sqlx::FromRow<'_, sqlx::sqlite::SqliteRow> for ThumbnailRecord {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(ThumbnailRecord {
            sha256_hash: row.try_get("sha256_hash")?,
            small_thumb: row.try_get("small_thumb")?,
            medium_thumb: row.try_get("medium_thumb")?,
            large_thumb: row.try_get("large_thumb")?,
        })
    }
}

pub async fn get(pool: &SqlitePool, sha256_hash: &str) -> Result<Option<ThumbnailRecord>, sqlx::Error> {
    sqlx::query_as::<_, ThumbnailRecord>(
        "SELECT sha256_hash, small_thumb, medium_thumb, large_thumb
         FROM thumbnail_records WHERE sha256_hash = ?",
    )
    .bind(sha256_hash)
    .fetch_optional(pool)
    .await
}

/// Bulk upsert: the final write to the store for a generation batch is
/// a single transaction over the accumulated records.
pub async fn bulk_upsert(pool: &SqlitePool, records: &[ThumbnailRecord]) -> Result<(), sqlx::Error> {
    if records.is_empty() {
        return Ok(());
    }

    let mut tx = pool.begin().await?;
    for record in records {
        sqlx::query(
            "INSERT INTO thumbnail_records (sha256_hash, small_thumb, medium_thumb, large_thumb)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(sha256_hash) DO UPDATE SET
                small_thumb = excluded.small_thumb,
                medium_thumb = excluded.medium_thumb,
                large_thumb = excluded.large_thumb",
        )
        .bind(&record.sha256_hash)
        .bind(&record.small_thumb)
        .bind(&record.medium_thumb)
        .bind(&record.large_thumb)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// Clears all three slots; the row itself remains.
pub async fn invalidate(pool: &SqlitePool, sha256_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE thumbnail_records SET small_thumb = NULL, medium_thumb = NULL, large_thumb = NULL
         WHERE sha256_hash = ?",
    )
    .bind(sha256_hash)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn ensure_row(pool: &SqlitePool, sha256_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO thumbnail_records (sha256_hash) VALUES (?)
         ON CONFLICT(sha256_hash) DO NOTHING",
    )
    .bind(sha256_hash)
    .execute(pool)
    .await?;
    Ok(())
}

/// Deletes every `thumbnail_records` row with no non-`delete_pending`
/// File still referencing its SHA. Run periodically by an operator via
/// `gallery-admin sweep-thumbnails`. Returns the number of rows removed.
pub async fn sweep_orphans(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM thumbnail_records
         WHERE sha256_hash NOT IN (
             SELECT file_sha256 FROM files WHERE delete_pending = 0
         )",
    )
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::init_test_db;

    #[tokio::test]
    async fn sweep_removes_rows_with_no_referencing_file() {
        let ctx = init_test_db().await;
        ensure_row(&ctx.pool, "orphan-sha").await.unwrap();
        ensure_row(&ctx.pool, "referenced-sha").await.unwrap();

        sqlx::query(
            "INSERT INTO directories
                (dir_sha256, fqpn, parent_dir_sha256, combined_sha256, count_files, count_subdirs, delete_pending)
             VALUES ('dir', '/root/', NULL, '', 1, 0, 0)",
        )
        .execute(&ctx.pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO files
                (unique_sha256, name, home_directory, file_sha256, filetype_ext, size, delete_pending)
             VALUES ('u1', 'a.jpg', 'dir', 'referenced-sha', '.jpg', 1, 0)",
        )
        .execute(&ctx.pool)
        .await
        .unwrap();

        let removed = sweep_orphans(&ctx.pool).await.unwrap();
        assert_eq!(removed, 1);

        assert!(get(&ctx.pool, "orphan-sha").await.unwrap().is_none());
        assert!(get(&ctx.pool, "referenced-sha").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn sweep_is_a_no_op_when_nothing_is_orphaned() {
        let ctx = init_test_db().await;
        ensure_row(&ctx.pool, "only-sha").await.unwrap();
        sqlx::query(
            "INSERT INTO directories
                (dir_sha256, fqpn, parent_dir_sha256, combined_sha256, count_files, count_subdirs, delete_pending)
             VALUES ('dir', '/root/', NULL, '', 1, 0, 0)",
        )
        .execute(&ctx.pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO files
                (unique_sha256, name, home_directory, file_sha256, filetype_ext, size, delete_pending)
             VALUES ('u1', 'a.jpg', 'dir', 'only-sha', '.jpg', 1, 0)",
        )
        .execute(&ctx.pool)
        .await
        .unwrap();

        assert_eq!(sweep_orphans(&ctx.pool).await.unwrap(), 0);
    }
}
