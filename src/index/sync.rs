//! The sync algorithm: reconciles one directory's row (and its direct
//! children) against the filesystem.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use log::warn;
use sqlx::SqlitePool;

use crate::config::GalleryConfig;
use crate::error::{GalleryError, GalleryResult};
use crate::filetype::FiletypeRegistry;
use crate::identity;

use super::lock::DirectoryLockTable;
use super::{cache_tracking_repo, directory_repo, file_repo};
use super::{Directory, File, PurgeNotifier};

struct DiskFile {
    title_cased_name: String,
    path: std::path::PathBuf,
    metadata: std::fs::Metadata,
}

struct DiskSubdir {
    title_cased_name: String,
    path: std::path::PathBuf,
}

/// Forces a reconciliation pass on one directory. Not recursive: only
/// `path`'s direct file and subdirectory entries are reconciled; a
/// subdirectory discovered here is created as a `delete_pending = false`
/// row but its own contents are left for its own sync.
pub async fn sync(
    pool: &SqlitePool,
    config: &GalleryConfig,
    registry: &FiletypeRegistry,
    locks: &DirectoryLockTable,
    purge: &dyn PurgeNotifier,
    path: &Path,
) -> GalleryResult<()> {
    let dir_sha256 = identity::dir_sha256(path)?;
    let mutex = locks.get(&dir_sha256);
    let _guard = mutex.lock().await;

    // Step 1: freshness short-circuit.
    let existing_dir = directory_repo::get_by_sha(pool, &dir_sha256).await?;
    let tracking = cache_tracking_repo::get(pool, &dir_sha256).await?;

    if existing_dir.is_some() {
        if let Some(track) = &tracking {
            if !track.invalidated {
                if let Some(lastscan) = track.lastscan {
                    if is_fresh(lastscan, config.sync_freshness_window_seconds) {
                        let disk_mtime = std::fs::metadata(path)
                            .ok()
                            .and_then(|m| m.modified().ok())
                            .map(DateTime::<Utc>::from);
                        if disk_mtime.map(|m| m <= lastscan).unwrap_or(false) {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }

    // Step 2: enumerate on-disk entries, outside the transaction.
    let canonical = identity::canonicalize_directory(path)?;
    let (disk_files, disk_subdirs) = enumerate_directory(path, config)?;

    let mut tx = pool.begin().await.map_err(GalleryError::from)?;

    cache_tracking_repo::ensure_exists_tx(&mut tx, &dir_sha256).await?;

    // Step 3: existing File rows.
    let existing_files = file_repo::get_by_directory_tx(&mut tx, &dir_sha256).await?;

    // Step 4: case-insensitive matching pass.
    let disk_by_lower: HashMap<String, &DiskFile> = disk_files
        .iter()
        .map(|f| (f.title_cased_name.to_lowercase(), f))
        .collect();
    let index_by_lower: HashMap<String, &File> = existing_files
        .iter()
        .map(|f| (f.name.to_lowercase(), f))
        .collect();

    let mut sorted_file_shas: Vec<String> = Vec::new();

    for (lower_name, disk_file) in &disk_by_lower {
        match index_by_lower.get(lower_name) {
            Some(row) => {
                // Step 5: re-stat; re-hash only if changed.
                let size = disk_file.metadata.len() as i64;
                let mtime = disk_file
                    .metadata
                    .modified()
                    .ok()
                    .map(DateTime::<Utc>::from);

                let name_drifted = row.name != disk_file.title_cased_name;
                let stat_changed = row.size != size || row.mtime != mtime;
                let mut row_updated = false;

                if stat_changed {
                    match hash_disk_file(disk_file, &canonical) {
                        Ok((file_sha256, unique_sha256)) => {
                            if unique_sha256 != row.unique_sha256 || file_sha256 != row.file_sha256 {
                                let ext = extension_of(&disk_file.title_cased_name);
                                let filetype_ext = registry.get_by_ext(&ext).ext;
                                let updated = File {
                                    unique_sha256: unique_sha256.clone(),
                                    name: disk_file.title_cased_name.clone(),
                                    home_directory: dir_sha256.clone(),
                                    file_sha256: file_sha256.clone(),
                                    filetype_ext,
                                    size,
                                    mtime,
                                    delete_pending: false,
                                };
                                file_repo::update_in_place_tx(&mut tx, &row.unique_sha256, &updated)
                                    .await?;
                                row_updated = true;
                                sorted_file_shas.push(file_sha256);
                            } else {
                                sorted_file_shas.push(row.file_sha256.clone());
                            }
                        }
                        Err(e) => {
                            warn!(
                                "skipping unreadable file {:?}: {e}",
                                disk_file.path
                            );
                        }
                    }
                } else {
                    sorted_file_shas.push(row.file_sha256.clone());
                }

                // Skip if `update_in_place_tx` above already moved the row
                // to a new `unique_sha256` and wrote the current name —
                // looking it up under the stale `row.unique_sha256` would
                // now match nothing.
                if name_drifted && !row_updated {
                    file_repo::rename_in_place_tx(
                        &mut tx,
                        &row.unique_sha256,
                        &disk_file.title_cased_name,
                    )
                    .await?;
                }
            }
            None => {
                // Step 6: create.
                match hash_disk_file(disk_file, &canonical) {
                    Ok((file_sha256, unique_sha256)) => {
                        let ext = extension_of(&disk_file.title_cased_name);
                        let filetype_ext = registry.get_by_ext(&ext).ext;
                        let size = disk_file.metadata.len() as i64;
                        let mtime = disk_file
                            .metadata
                            .modified()
                            .ok()
                            .map(DateTime::<Utc>::from);
                        let new_file = File {
                            unique_sha256,
                            name: disk_file.title_cased_name.clone(),
                            home_directory: dir_sha256.clone(),
                            file_sha256: file_sha256.clone(),
                            filetype_ext,
                            size,
                            mtime,
                            delete_pending: false,
                        };
                        file_repo::insert_tx(&mut tx, &new_file).await?;
                        sorted_file_shas.push(file_sha256);
                    }
                    Err(e) => {
                        warn!("skipping unreadable file {:?}: {e}", disk_file.path);
                    }
                }
            }
        }
    }

    // Step 7: rows not present on disk become delete-pending.
    for (lower_name, row) in &index_by_lower {
        if !disk_by_lower.contains_key(lower_name) {
            file_repo::mark_delete_pending_tx(&mut tx, &row.unique_sha256).await?;
        }
    }

    // Step 8: subdirectories.
    let existing_subdirs = directory_repo::get_children_tx(&mut tx, &dir_sha256).await?;
    let disk_subdir_shas: HashSet<String> = disk_subdirs
        .iter()
        .map(|d| identity::dir_sha256_of_canonical(&canonicalize_or_self(&d.path)))
        .collect();

    for subdir in &disk_subdirs {
        let sub_canonical = canonicalize_or_self(&subdir.path);
        let sub_sha = identity::dir_sha256_of_canonical(&sub_canonical);
        match existing_subdirs.iter().find(|d| d.dir_sha256 == sub_sha) {
            None => {
                let row = Directory {
                    dir_sha256: sub_sha,
                    fqpn: sub_canonical,
                    parent_dir_sha256: Some(dir_sha256.clone()),
                    combined_sha256: String::new(),
                    count_files: 0,
                    count_subdirs: 0,
                    delete_pending: false,
                    last_sync_time: None,
                };
                directory_repo::upsert_tx(&mut tx, &row).await?;
            }
            Some(found) if found.delete_pending => {
                let mut row = found.clone();
                row.delete_pending = false;
                directory_repo::upsert_tx(&mut tx, &row).await?;
            }
            Some(_) => {}
        }
    }
    for existing_subdir in &existing_subdirs {
        if !disk_subdir_shas.contains(&existing_subdir.dir_sha256) {
            directory_repo::mark_delete_pending_tx(&mut tx, &existing_subdir.dir_sha256).await?;
        }
    }

    // Step 9: recompute aggregate fields.
    sorted_file_shas.sort();
    let combined = identity::combined_sha256(sorted_file_shas.iter().map(|s| s.as_str()));
    let count_files = sorted_file_shas.len() as i64;
    let count_subdirs = disk_subdirs.len() as i64;

    let dir_row = Directory {
        dir_sha256: dir_sha256.clone(),
        fqpn: canonical.clone(),
        parent_dir_sha256: existing_dir.as_ref().and_then(|d| d.parent_dir_sha256.clone()),
        combined_sha256: combined,
        count_files,
        count_subdirs,
        delete_pending: false,
        last_sync_time: Some(Utc::now()),
    };
    directory_repo::upsert_tx(&mut tx, &dir_row).await?;

    // Step 10: flip cache-tracking to valid.
    cache_tracking_repo::mark_valid_tx(&mut tx, &dir_sha256).await?;

    tx.commit().await.map_err(GalleryError::from)?;

    // Step 11: notify the Layout Cache, outside the transaction.
    purge.purge(&dir_sha256);

    Ok(())
}

/// Sets the Cache-Tracking flag; called by the watcher on any filesystem event.
pub async fn mark_invalid(pool: &SqlitePool, dir_sha256: &str) -> GalleryResult<()> {
    cache_tracking_repo::mark_invalid(pool, dir_sha256)
        .await
        .map_err(GalleryError::from)
}

fn is_fresh(lastscan: DateTime<Utc>, window_seconds: u64) -> bool {
    let age = Utc::now().signed_duration_since(lastscan);
    age.num_seconds() >= 0 && (age.num_seconds() as u64) <= window_seconds
}

fn extension_of(title_cased_name: &str) -> String {
    Path::new(title_cased_name)
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
        .unwrap_or_else(|| ".none".into())
}

fn canonicalize_or_self(path: &Path) -> String {
    identity::canonicalize_directory(path)
        .unwrap_or_else(|_| path.to_string_lossy().to_lowercase())
}

fn hash_disk_file(disk_file: &DiskFile, dir_canonical: &str) -> GalleryResult<(String, String)> {
    let full_path = identity::full_path_for_identity(dir_canonical, &disk_file.title_cased_name);
    identity::hash_file_content_and_identity(&disk_file.path, &full_path)
}

/// Enumerate one level of `path`, applying ignore rules and title-casing
/// names. Failures reading individual entries are skipped: log and
/// continue rather than aborting the whole sync.
fn enumerate_directory(
    path: &Path,
    config: &GalleryConfig,
) -> GalleryResult<(Vec<DiskFile>, Vec<DiskSubdir>)> {
    let entries = std::fs::read_dir(path).map_err(GalleryError::from)?;

    let mut files = Vec::new();
    let mut subdirs = Vec::new();

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("skipping unreadable directory entry in {path:?}: {e}");
                continue;
            }
        };

        let disk_name = entry.file_name().to_string_lossy().to_string();
        let lower_name = disk_name.to_lowercase();
        if config.is_ignored_name(&lower_name) {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                warn!("skipping {:?}: {e}", entry.path());
                continue;
            }
        };

        if metadata.is_dir() {
            subdirs.push(DiskSubdir {
                title_cased_name: identity::title_case(&disk_name),
                path: entry.path(),
            });
            continue;
        }

        let ext = extension_of(&disk_name);
        if config.is_ignored_extension(&ext) {
            continue;
        }

        files.push(DiskFile {
            title_cased_name: identity::title_case(&disk_name),
            path: entry.path(),
            metadata,
        });
    }

    Ok((files, subdirs))
}

#[cfg(test)]
#[path = "tests/sync_tests.rs"]
mod tests;
