use sqlx::SqlitePool;

use super::Directory;

pub async fn get_by_sha(pool: &SqlitePool, dir_sha256: &str) -> Result<Option<Directory>, sqlx::Error> {
    sqlx::query_as::<_, Directory>(
        "SELECT dir_sha256, fqpn, parent_dir_sha256, combined_sha256, count_files,
                count_subdirs, delete_pending, last_sync_time
         FROM directories WHERE dir_sha256 = ?",
    )
    .bind(dir_sha256)
    .fetch_optional(pool)
    .await
}

pub async fn get_children(
    pool: &SqlitePool,
    parent_dir_sha256: &str,
) -> Result<Vec<Directory>, sqlx::Error> {
    sqlx::query_as::<_, Directory>(
        "SELECT dir_sha256, fqpn, parent_dir_sha256, combined_sha256, count_files,
                count_subdirs, delete_pending, last_sync_time
         FROM directories WHERE parent_dir_sha256 = ? AND delete_pending = 0",
    )
    .bind(parent_dir_sha256)
    .fetch_all(pool)
    .await
}

pub async fn upsert(pool: &SqlitePool, dir: &Directory) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO directories
            (dir_sha256, fqpn, parent_dir_sha256, combined_sha256, count_files,
             count_subdirs, delete_pending, last_sync_time)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(dir_sha256) DO UPDATE SET
            fqpn = excluded.fqpn,
            parent_dir_sha256 = excluded.parent_dir_sha256,
            combined_sha256 = excluded.combined_sha256,
            count_files = excluded.count_files,
            count_subdirs = excluded.count_subdirs,
            delete_pending = excluded.delete_pending,
            last_sync_time = excluded.last_sync_time",
    )
    .bind(&dir.dir_sha256)
    .bind(&dir.fqpn)
    .bind(&dir.parent_dir_sha256)
    .bind(&dir.combined_sha256)
    .bind(dir.count_files)
    .bind(dir.count_subdirs)
    .bind(dir.delete_pending)
    .bind(dir.last_sync_time)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn mark_delete_pending(pool: &SqlitePool, dir_sha256: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE directories SET delete_pending = 1 WHERE dir_sha256 = ?")
        .bind(dir_sha256)
        .execute(pool)
        .await?;
    Ok(())
}

/// Hard-delete a directory row. Only safe to call after a sweep confirms
/// no referring File/Directory rows remain.
pub async fn hard_delete(pool: &SqlitePool, dir_sha256: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM directories WHERE dir_sha256 = ?")
        .bind(dir_sha256)
        .execute(pool)
        .await?;
    Ok(())
}

// The `_tx` variants below run inside the single transaction that sync.rs
// holds open for the whole reconciliation pass.

pub async fn get_by_sha_tx(
    conn: &mut sqlx::SqliteConnection,
    dir_sha256: &str,
) -> Result<Option<Directory>, sqlx::Error> {
    sqlx::query_as::<_, Directory>(
        "SELECT dir_sha256, fqpn, parent_dir_sha256, combined_sha256, count_files,
                count_subdirs, delete_pending, last_sync_time
         FROM directories WHERE dir_sha256 = ?",
    )
    .bind(dir_sha256)
    .fetch_optional(conn)
    .await
}

pub async fn get_children_tx(
    conn: &mut sqlx::SqliteConnection,
    parent_dir_sha256: &str,
) -> Result<Vec<Directory>, sqlx::Error> {
    sqlx::query_as::<_, Directory>(
        "SELECT dir_sha256, fqpn, parent_dir_sha256, combined_sha256, count_files,
                count_subdirs, delete_pending, last_sync_time
         FROM directories WHERE parent_dir_sha256 = ?",
    )
    .bind(parent_dir_sha256)
    .fetch_all(conn)
    .await
}

pub async fn upsert_tx(conn: &mut sqlx::SqliteConnection, dir: &Directory) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO directories
            (dir_sha256, fqpn, parent_dir_sha256, combined_sha256, count_files,
             count_subdirs, delete_pending, last_sync_time)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(dir_sha256) DO UPDATE SET
            fqpn = excluded.fqpn,
            parent_dir_sha256 = excluded.parent_dir_sha256,
            combined_sha256 = excluded.combined_sha256,
            count_files = excluded.count_files,
            count_subdirs = excluded.count_subdirs,
            delete_pending = excluded.delete_pending,
            last_sync_time = excluded.last_sync_time",
    )
    .bind(&dir.dir_sha256)
    .bind(&dir.fqpn)
    .bind(&dir.parent_dir_sha256)
    .bind(&dir.combined_sha256)
    .bind(dir.count_files)
    .bind(dir.count_subdirs)
    .bind(dir.delete_pending)
    .bind(dir.last_sync_time)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn mark_delete_pending_tx(
    conn: &mut sqlx::SqliteConnection,
    dir_sha256: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE directories SET delete_pending = 1 WHERE dir_sha256 = ?")
        .bind(dir_sha256)
        .execute(conn)
        .await?;
    Ok(())
}
