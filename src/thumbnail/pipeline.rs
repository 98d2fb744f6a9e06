//! Thumbnail generation pipeline.
//!
//! A bounded worker pool backed by a single process-wide semaphore so
//! concurrent generation work stays within `thumbnail_concurrency_limit`
//! regardless of how many callers request thumbnails at once.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use log::warn;
use sqlx::SqlitePool;
use tokio::sync::Semaphore;

use crate::config::GalleryConfig;
use crate::error::{GalleryError, GalleryResult};
use crate::filetype::FiletypeRegistry;
use crate::identity;
use crate::index::{directory_repo, file_repo};

use super::backend::{select_backend, ImageBackend, MediaKind};
use super::{archive, store, ThumbnailRecord, ThumbnailSizeName, BROKEN_MEDIA_SENTINEL};

const GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

static GENERATION_SEMAPHORE: OnceLock<Semaphore> = OnceLock::new();

fn semaphore(cap: usize) -> &'static Semaphore {
    GENERATION_SEMAPHORE.get_or_init(|| Semaphore::new(cap.max(1)))
}

/// Returns the current record if all three slots are populated;
/// otherwise schedules background generation and returns whatever
/// partial record exists today.
pub async fn get_or_create(
    pool: &SqlitePool,
    config: &GalleryConfig,
    registry: &'static FiletypeRegistry,
    file_sha256: &str,
) -> GalleryResult<ThumbnailRecord> {
    store::ensure_row(pool, file_sha256).await?;
    let current = store::get(pool, file_sha256)
        .await?
        .unwrap_or_else(|| ThumbnailRecord {
            sha256_hash: file_sha256.to_string(),
            ..Default::default()
        });

    if current.is_complete() {
        return Ok(current);
    }

    let pool = pool.clone();
    let config = config.clone();
    let sha = file_sha256.to_string();
    tokio::spawn(async move {
        if let Err(e) = generate_and_store(&pool, &config, registry, &sha).await {
            warn!("background thumbnail generation failed for {sha}: {e}");
        }
    });

    Ok(current)
}

/// Returns the stored blob for one size, generating it synchronously if absent.
pub async fn send(
    pool: &SqlitePool,
    config: &GalleryConfig,
    registry: &'static FiletypeRegistry,
    file_sha256: &str,
    size: ThumbnailSizeName,
) -> GalleryResult<Vec<u8>> {
    if let Some(record) = store::get(pool, file_sha256).await? {
        if let Some(bytes) = record.slot(size) {
            return Ok(bytes.to_vec());
        }
    }

    generate_and_store(pool, config, registry, file_sha256).await?;

    store::get(pool, file_sha256)
        .await?
        .and_then(|r| r.slot(size).map(|b| b.to_vec()))
        .ok_or_else(|| GalleryError::NotFound(format!("no thumbnail available for {file_sha256}")))
}

/// Clears all three slots.
pub async fn invalidate(pool: &SqlitePool, file_sha256: &str) -> GalleryResult<()> {
    store::invalidate(pool, file_sha256)
        .await
        .map_err(GalleryError::from)
}

/// Processes up to `config.thumbnail_batch_size` SHAs, each bounded by
/// the generation semaphore and a per-job timeout, then performs one
/// bulk store write for the whole batch.
pub async fn generate_batch(
    pool: &SqlitePool,
    config: &GalleryConfig,
    registry: &'static FiletypeRegistry,
    shas: &[String],
) -> GalleryResult<()> {
    let batch: Vec<&String> = shas.iter().take(config.thumbnail_batch_size).collect();
    let mut handles = Vec::with_capacity(batch.len());

    for sha in batch {
        let pool = pool.clone();
        let config = config.clone();
        let sha = sha.clone();
        handles.push(tokio::spawn(async move {
            generate_one(&pool, &config, registry, &sha).await
        }));
    }

    let mut records = Vec::new();
    for handle in handles {
        match handle.await {
            Ok(Ok(record)) => records.push(record),
            Ok(Err(e)) => warn!("thumbnail generation error: {e}"),
            Err(e) => warn!("thumbnail generation task panicked: {e}"),
        }
    }

    store::bulk_upsert(pool, &records)
        .await
        .map_err(GalleryError::from)
}

async fn generate_and_store(
    pool: &SqlitePool,
    config: &GalleryConfig,
    registry: &'static FiletypeRegistry,
    file_sha256: &str,
) -> GalleryResult<()> {
    let record = generate_one(pool, config, registry, file_sha256).await?;
    store::bulk_upsert(pool, std::slice::from_ref(&record))
        .await
        .map_err(GalleryError::from)
}

async fn generate_one(
    pool: &SqlitePool,
    config: &GalleryConfig,
    registry: &'static FiletypeRegistry,
    file_sha256: &str,
) -> GalleryResult<ThumbnailRecord> {
    // Generation of a SHA whose File rows have all become delete_pending
    // is skipped; it will be reaped by the sweeper.
    let candidates = file_repo::get_by_file_sha(pool, file_sha256)
        .await
        .map_err(GalleryError::from)?;
    let Some(file) = candidates.into_iter().next() else {
        return Err(GalleryError::NotFound(format!(
            "no live file rows for {file_sha256}"
        )));
    };

    let directory = directory_repo::get_by_sha(pool, &file.home_directory)
        .await
        .map_err(GalleryError::from)?
        .ok_or_else(|| GalleryError::Corrupt("file references a missing directory".into()))?;

    let path = PathBuf::from(identity::full_path_for_identity(&directory.fqpn, &file.name));
    let filetype = registry.get_by_ext(&file.filetype_ext);

    let _permit = semaphore(config.thumbnail_concurrency_limit)
        .acquire()
        .await
        .map_err(|e| GalleryError::InvariantViolation(format!("semaphore closed: {e}")))?;

    let sizes = size_map(config);
    let sha = file_sha256.to_string();
    let is_archive = filetype.is_archive;
    let result = tokio::time::timeout(
        GENERATION_TIMEOUT,
        tokio::task::spawn_blocking(move || decode_and_generate(&path, is_archive, registry, &sizes)),
    )
    .await;

    match result {
        Ok(Ok(Ok(slots))) => Ok(record_from_slots(&sha, slots)),
        Ok(Ok(Err(_decode_failure))) => Ok(sentinel_record(&sha)),
        Ok(Err(join_err)) => Err(GalleryError::InvariantViolation(format!(
            "thumbnail worker panicked: {join_err}"
        ))),
        Err(_timeout) => {
            warn!("thumbnail generation for {sha} exceeded {GENERATION_TIMEOUT:?}; leaving slots empty");
            Err(GalleryError::Transient("thumbnail generation timed out".into()))
        }
    }
}

fn decode_and_generate(
    path: &std::path::Path,
    is_archive: bool,
    registry: &FiletypeRegistry,
    sizes: &HashMap<ThumbnailSizeName, (u32, u32)>,
) -> GalleryResult<HashMap<ThumbnailSizeName, Vec<u8>>> {
    let backend = select_backend();

    let (bytes, kind) = if is_archive {
        (archive::first_image_entry_bytes(path, registry)?, MediaKind::Image)
    } else {
        let bytes = std::fs::read(path).map_err(GalleryError::from)?;
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        let filetype = registry.get_by_ext(&ext);
        let kind = if filetype.is_pdf {
            MediaKind::Pdf
        } else if filetype.is_movie {
            MediaKind::Movie
        } else {
            MediaKind::Image
        };
        (bytes, kind)
    };

    backend.generate(&bytes, kind, sizes)
}

fn size_map(config: &GalleryConfig) -> HashMap<ThumbnailSizeName, (u32, u32)> {
    let sizes = &config.thumbnail_sizes;
    HashMap::from([
        (ThumbnailSizeName::Small, (sizes.small.width, sizes.small.height)),
        (ThumbnailSizeName::Medium, (sizes.medium.width, sizes.medium.height)),
        (ThumbnailSizeName::Large, (sizes.large.width, sizes.large.height)),
    ])
}

fn record_from_slots(sha: &str, mut slots: HashMap<ThumbnailSizeName, Vec<u8>>) -> ThumbnailRecord {
    ThumbnailRecord {
        sha256_hash: sha.to_string(),
        small_thumb: slots.remove(&ThumbnailSizeName::Small),
        medium_thumb: slots.remove(&ThumbnailSizeName::Medium),
        large_thumb: slots.remove(&ThumbnailSizeName::Large),
    }
}

fn sentinel_record(sha: &str) -> ThumbnailRecord {
    ThumbnailRecord {
        sha256_hash: sha.to_string(),
        small_thumb: Some(BROKEN_MEDIA_SENTINEL.to_vec()),
        medium_thumb: Some(BROKEN_MEDIA_SENTINEL.to_vec()),
        large_thumb: Some(BROKEN_MEDIA_SENTINEL.to_vec()),
    }
}
