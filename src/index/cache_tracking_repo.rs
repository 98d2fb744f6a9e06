use chrono::Utc;
use sqlx::SqlitePool;

use super::CacheTrackingEntry;

pub async fn get(pool: &SqlitePool, dir_sha256: &str) -> Result<Option<CacheTrackingEntry>, sqlx::Error> {
    sqlx::query_as::<_, CacheTrackingEntry>(
        "SELECT dir_sha256, invalidated, lastscan FROM cache_tracking WHERE dir_sha256 = ?",
    )
    .bind(dir_sha256)
    .fetch_optional(pool)
    .await
}

/// Create the tracking row if absent, defaulting to `invalidated = true`
/// so a directory observed for the first time always syncs once.
pub async fn ensure_exists(pool: &SqlitePool, dir_sha256: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO cache_tracking (dir_sha256, invalidated, lastscan)
         VALUES (?, 1, NULL)
         ON CONFLICT(dir_sha256) DO NOTHING",
    )
    .bind(dir_sha256)
    .execute(pool)
    .await?;
    Ok(())
}

/// Flip the `invalidated` flag to `true` — the watcher's sole write into
/// the index. Idempotent: repeated calls with no sync in between are
/// equivalent to a single call.
pub async fn mark_invalid(pool: &SqlitePool, dir_sha256: &str) -> Result<(), sqlx::Error> {
    ensure_exists(pool, dir_sha256).await?;
    sqlx::query("UPDATE cache_tracking SET invalidated = 1 WHERE dir_sha256 = ?")
        .bind(dir_sha256)
        .execute(pool)
        .await?;
    Ok(())
}

/// Flip back to valid at the end of a successful sync, stamping `lastscan`.
pub async fn mark_valid(pool: &SqlitePool, dir_sha256: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE cache_tracking SET invalidated = 0, lastscan = ? WHERE dir_sha256 = ?")
        .bind(Utc::now())
        .bind(dir_sha256)
        .execute(pool)
        .await?;
    Ok(())
}

/// Marks every known directory invalidated in one statement — the
/// watcher's coarse fallback when its coalescing buffer overflows its
/// soft cap.
pub async fn mark_all_invalid(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE cache_tracking SET invalidated = 1")
        .execute(pool)
        .await?;
    Ok(())
}

// `_tx` variants used inside sync.rs's single transaction.

pub async fn get_tx(
    conn: &mut sqlx::SqliteConnection,
    dir_sha256: &str,
) -> Result<Option<CacheTrackingEntry>, sqlx::Error> {
    sqlx::query_as::<_, CacheTrackingEntry>(
        "SELECT dir_sha256, invalidated, lastscan FROM cache_tracking WHERE dir_sha256 = ?",
    )
    .bind(dir_sha256)
    .fetch_optional(conn)
    .await
}

pub async fn ensure_exists_tx(conn: &mut sqlx::SqliteConnection, dir_sha256: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO cache_tracking (dir_sha256, invalidated, lastscan)
         VALUES (?, 1, NULL)
         ON CONFLICT(dir_sha256) DO NOTHING",
    )
    .bind(dir_sha256)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn mark_valid_tx(conn: &mut sqlx::SqliteConnection, dir_sha256: &str) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE cache_tracking SET invalidated = 0, lastscan = ? WHERE dir_sha256 = ?")
        .bind(Utc::now())
        .bind(dir_sha256)
        .execute(conn)
        .await?;
    Ok(())
}
