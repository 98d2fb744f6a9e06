use sqlx::SqlitePool;

use super::File;

pub async fn get_by_directory(
    pool: &SqlitePool,
    home_directory: &str,
) -> Result<Vec<File>, sqlx::Error> {
    sqlx::query_as::<_, File>(
        "SELECT unique_sha256, name, home_directory, file_sha256, filetype_ext,
                size, mtime, delete_pending
         FROM files WHERE home_directory = ? AND delete_pending = 0",
    )
    .bind(home_directory)
    .fetch_all(pool)
    .await
}

pub async fn get_by_unique_sha(
    pool: &SqlitePool,
    unique_sha256: &str,
) -> Result<Option<File>, sqlx::Error> {
    sqlx::query_as::<_, File>(
        "SELECT unique_sha256, name, home_directory, file_sha256, filetype_ext,
                size, mtime, delete_pending
         FROM files WHERE unique_sha256 = ?",
    )
    .bind(unique_sha256)
    .fetch_optional(pool)
    .await
}

/// All non-deleted files sharing a content SHA — the duplicate-detection
/// query the Layout Cache builds on.
pub async fn get_by_file_sha(
    pool: &SqlitePool,
    file_sha256: &str,
) -> Result<Vec<File>, sqlx::Error> {
    sqlx::query_as::<_, File>(
        "SELECT unique_sha256, name, home_directory, file_sha256, filetype_ext,
                size, mtime, delete_pending
         FROM files WHERE file_sha256 = ? AND delete_pending = 0",
    )
    .bind(file_sha256)
    .fetch_all(pool)
    .await
}

pub async fn insert(pool: &SqlitePool, file: &File) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO files
            (unique_sha256, name, home_directory, file_sha256, filetype_ext,
             size, mtime, delete_pending)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&file.unique_sha256)
    .bind(&file.name)
    .bind(&file.home_directory)
    .bind(&file.file_sha256)
    .bind(&file.filetype_ext)
    .bind(file.size)
    .bind(file.mtime)
    .bind(file.delete_pending)
    .execute(pool)
    .await?;
    Ok(())
}

/// Update a row in place by its current (pre-update) `unique_sha256`,
/// writing `file`'s fields including its (possibly new) `unique_sha256`
/// — the row identity otherwise stays the same, so the matching pass
/// counts this as an update rather than a delete-then-create. When the
/// file's content changed, `file.unique_sha256` differs from
/// `old_unique_sha256`: the row's primary key moves with it so the
/// invariant `unique_sha256 = SHA256(content || title_cased_path)`
/// keeps holding, and the old `file_sha256`'s thumbnail record becomes
/// orphaned rather than silently kept alive under a stale key.
pub async fn update_in_place(
    pool: &SqlitePool,
    old_unique_sha256: &str,
    file: &File,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE files SET
            unique_sha256 = ?, name = ?, file_sha256 = ?, filetype_ext = ?,
            size = ?, mtime = ?, delete_pending = ?
         WHERE unique_sha256 = ?",
    )
    .bind(&file.unique_sha256)
    .bind(&file.name)
    .bind(&file.file_sha256)
    .bind(&file.filetype_ext)
    .bind(file.size)
    .bind(file.mtime)
    .bind(file.delete_pending)
    .bind(old_unique_sha256)
    .execute(pool)
    .await?;
    Ok(())
}

/// Rename-in-place: the stored name drifted in case from the on-disk
/// name (e.g. `Foo.Jpg` → `Foo.JPG` on disk). Only the name column
/// changes; `unique_sha256` must stay stable for this to count as an
/// update rather than a delete+create.
pub async fn rename_in_place(
    pool: &SqlitePool,
    unique_sha256: &str,
    new_name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE files SET name = ? WHERE unique_sha256 = ?")
        .bind(new_name)
        .bind(unique_sha256)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn mark_delete_pending(pool: &SqlitePool, unique_sha256: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE files SET delete_pending = 1 WHERE unique_sha256 = ?")
        .bind(unique_sha256)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn hard_delete(pool: &SqlitePool, unique_sha256: &str) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM files WHERE unique_sha256 = ?")
        .bind(unique_sha256)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn count_non_deleted(pool: &SqlitePool, home_directory: &str) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM files WHERE home_directory = ? AND delete_pending = 0")
            .bind(home_directory)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Every `file_sha256` shared by more than one non-deleted File row —
/// the global duplicate set behind the Layout Cache's duplicate filtering.
pub async fn duplicate_file_shas(pool: &SqlitePool) -> Result<std::collections::HashSet<String>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT file_sha256 FROM files WHERE delete_pending = 0
         GROUP BY file_sha256 HAVING COUNT(*) > 1",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|(sha,)| sha).collect())
}

/// One occurrence of a duplicated `file_sha256`, carrying the full
/// directory-qualified path used to pick the natural-name-first winner:
/// only the first occurrence under natural-name order across the whole
/// tree stays visible, the rest are filtered unless duplicates are
/// explicitly shown.
pub struct FileLocation {
    pub unique_sha256: String,
    pub full_path: String,
}

pub async fn locations_for_file_sha(
    pool: &SqlitePool,
    file_sha256: &str,
) -> Result<Vec<FileLocation>, sqlx::Error> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT f.unique_sha256, d.fqpn || f.name
         FROM files f JOIN directories d ON f.home_directory = d.dir_sha256
         WHERE f.file_sha256 = ? AND f.delete_pending = 0",
    )
    .bind(file_sha256)
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|(unique_sha256, full_path)| FileLocation {
            unique_sha256,
            full_path,
        })
        .collect())
}

// `_tx` variants used inside sync.rs's single transaction.

pub async fn get_by_directory_tx(
    conn: &mut sqlx::SqliteConnection,
    home_directory: &str,
) -> Result<Vec<File>, sqlx::Error> {
    sqlx::query_as::<_, File>(
        "SELECT unique_sha256, name, home_directory, file_sha256, filetype_ext,
                size, mtime, delete_pending
         FROM files WHERE home_directory = ? AND delete_pending = 0",
    )
    .bind(home_directory)
    .fetch_all(conn)
    .await
}

pub async fn insert_tx(conn: &mut sqlx::SqliteConnection, file: &File) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO files
            (unique_sha256, name, home_directory, file_sha256, filetype_ext,
             size, mtime, delete_pending)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&file.unique_sha256)
    .bind(&file.name)
    .bind(&file.home_directory)
    .bind(&file.file_sha256)
    .bind(&file.filetype_ext)
    .bind(file.size)
    .bind(file.mtime)
    .bind(file.delete_pending)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn update_in_place_tx(
    conn: &mut sqlx::SqliteConnection,
    old_unique_sha256: &str,
    file: &File,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE files SET
            unique_sha256 = ?, name = ?, file_sha256 = ?, filetype_ext = ?,
            size = ?, mtime = ?, delete_pending = ?
         WHERE unique_sha256 = ?",
    )
    .bind(&file.unique_sha256)
    .bind(&file.name)
    .bind(&file.file_sha256)
    .bind(&file.filetype_ext)
    .bind(file.size)
    .bind(file.mtime)
    .bind(file.delete_pending)
    .bind(old_unique_sha256)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn rename_in_place_tx(
    conn: &mut sqlx::SqliteConnection,
    unique_sha256: &str,
    new_name: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE files SET name = ? WHERE unique_sha256 = ?")
        .bind(new_name)
        .bind(unique_sha256)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn mark_delete_pending_tx(
    conn: &mut sqlx::SqliteConnection,
    unique_sha256: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE files SET delete_pending = 1 WHERE unique_sha256 = ?")
        .bind(unique_sha256)
        .execute(conn)
        .await?;
    Ok(())
}
