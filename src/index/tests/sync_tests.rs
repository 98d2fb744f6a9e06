use std::fs;

use tempfile::tempdir;

use crate::config::GalleryConfig;
use crate::filetype::{defaults, FiletypeRegistry};
use crate::identity;
use crate::index::lock::DirectoryLockTable;
use crate::index::{directory_repo, file_repo, sync, NoopPurgeNotifier};
use crate::test_utils::init_test_db;

fn registry() -> FiletypeRegistry {
    FiletypeRegistry::from_filetypes(defaults::seed())
}

#[tokio::test]
async fn first_sync_indexes_files_and_subdirs() {
    let ctx = init_test_db().await;
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("photo.jpg"), b"hello").unwrap();
    fs::create_dir(dir.path().join("subalbum")).unwrap();

    let config = GalleryConfig::default();
    let registry = registry();
    let locks = DirectoryLockTable::new();

    sync::sync(&ctx.pool, &config, &registry, &locks, &NoopPurgeNotifier, dir.path())
        .await
        .unwrap();

    let dir_sha = identity::dir_sha256(dir.path()).unwrap();
    let row = directory_repo::get_by_sha(&ctx.pool, &dir_sha)
        .await
        .unwrap()
        .expect("directory row should exist after sync");
    assert_eq!(row.count_files, 1);
    assert_eq!(row.count_subdirs, 1);

    let files = file_repo::get_by_directory(&ctx.pool, &dir_sha).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "Photo.jpg");
}

#[tokio::test]
async fn repeated_sync_is_idempotent() {
    let ctx = init_test_db().await;
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.txt"), b"content").unwrap();

    let config = GalleryConfig::default();
    let registry = registry();
    let locks = DirectoryLockTable::new();

    sync::sync(&ctx.pool, &config, &registry, &locks, &NoopPurgeNotifier, dir.path())
        .await
        .unwrap();
    let dir_sha = identity::dir_sha256(dir.path()).unwrap();
    let first = directory_repo::get_by_sha(&ctx.pool, &dir_sha).await.unwrap().unwrap();
    let first_files = file_repo::get_by_directory(&ctx.pool, &dir_sha).await.unwrap();

    sync::sync(&ctx.pool, &config, &registry, &locks, &NoopPurgeNotifier, dir.path())
        .await
        .unwrap();
    let second = directory_repo::get_by_sha(&ctx.pool, &dir_sha).await.unwrap().unwrap();
    let second_files = file_repo::get_by_directory(&ctx.pool, &dir_sha).await.unwrap();

    assert_eq!(first.combined_sha256, second.combined_sha256);
    assert_eq!(first_files[0].unique_sha256, second_files[0].unique_sha256);
}

#[tokio::test]
async fn case_only_rename_resolves_to_update_not_delete_and_create() {
    let ctx = init_test_db().await;
    let dir = tempdir().unwrap();
    let original = dir.path().join("Foo.Jpg");
    fs::write(&original, b"pixels").unwrap();

    let config = GalleryConfig::default();
    let registry = registry();
    let locks = DirectoryLockTable::new();

    sync::sync(&ctx.pool, &config, &registry, &locks, &NoopPurgeNotifier, dir.path())
        .await
        .unwrap();
    let dir_sha = identity::dir_sha256(dir.path()).unwrap();
    let before = file_repo::get_by_directory(&ctx.pool, &dir_sha).await.unwrap();
    assert_eq!(before.len(), 1);
    let unique_before = before[0].unique_sha256.clone();

    fs::rename(&original, dir.path().join("Foo.JPG")).unwrap();

    sync::sync(&ctx.pool, &config, &registry, &locks, &NoopPurgeNotifier, dir.path())
        .await
        .unwrap();
    let after = file_repo::get_by_directory(&ctx.pool, &dir_sha).await.unwrap();

    assert_eq!(after.len(), 1, "case-only rename must not create a second row");
    assert_eq!(
        after[0].unique_sha256, unique_before,
        "case-only rename must preserve unique_sha256 so the thumbnail association survives"
    );
}

#[tokio::test]
async fn content_change_with_same_name_changes_unique_sha_and_orphans_old_thumbnail() {
    let ctx = init_test_db().await;
    let dir = tempdir().unwrap();
    let path = dir.path().join("photo.jpg");
    fs::write(&path, b"original pixels").unwrap();

    let config = GalleryConfig::default();
    let registry = registry();
    let locks = DirectoryLockTable::new();

    sync::sync(&ctx.pool, &config, &registry, &locks, &NoopPurgeNotifier, dir.path())
        .await
        .unwrap();
    let dir_sha = identity::dir_sha256(dir.path()).unwrap();
    let before = file_repo::get_by_directory(&ctx.pool, &dir_sha).await.unwrap();
    assert_eq!(before.len(), 1);
    let unique_before = before[0].unique_sha256.clone();
    let file_sha_before = before[0].file_sha256.clone();

    // Backdate so the mtime comparison in the sync algorithm sees a change
    // even if the write below lands in the same wall-clock second.
    filetime::set_file_mtime(&path, filetime::FileTime::from_unix_time(0, 0)).unwrap();
    fs::write(&path, b"different pixels, much bigger").unwrap();

    sync::sync(&ctx.pool, &config, &registry, &locks, &NoopPurgeNotifier, dir.path())
        .await
        .unwrap();
    let after = file_repo::get_by_directory(&ctx.pool, &dir_sha).await.unwrap();

    assert_eq!(after.len(), 1, "content change must not create a second row");
    assert_ne!(
        after[0].unique_sha256, unique_before,
        "unique_sha256 must change when content changes, per the identity invariant"
    );
    assert_ne!(after[0].file_sha256, file_sha_before);
    assert!(file_repo::get_by_unique_sha(&ctx.pool, &unique_before)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn duplicate_content_shares_file_sha_but_not_unique_sha() {
    let ctx = init_test_db().await;
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("one.txt"), b"same bytes").unwrap();
    fs::write(dir.path().join("two.txt"), b"same bytes").unwrap();

    let config = GalleryConfig::default();
    let registry = registry();
    let locks = DirectoryLockTable::new();

    sync::sync(&ctx.pool, &config, &registry, &locks, &NoopPurgeNotifier, dir.path())
        .await
        .unwrap();
    let dir_sha = identity::dir_sha256(dir.path()).unwrap();
    let files = file_repo::get_by_directory(&ctx.pool, &dir_sha).await.unwrap();

    assert_eq!(files.len(), 2);
    assert_eq!(files[0].file_sha256, files[1].file_sha256);
    assert_ne!(files[0].unique_sha256, files[1].unique_sha256);
}

#[tokio::test]
async fn dotfiles_are_not_indexed_by_default() {
    let ctx = init_test_db().await;
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".hidden"), b"secret").unwrap();
    fs::write(dir.path().join("visible.txt"), b"shown").unwrap();

    let config = GalleryConfig::default();
    let registry = registry();
    let locks = DirectoryLockTable::new();

    sync::sync(&ctx.pool, &config, &registry, &locks, &NoopPurgeNotifier, dir.path())
        .await
        .unwrap();
    let dir_sha = identity::dir_sha256(dir.path()).unwrap();
    let files = file_repo::get_by_directory(&ctx.pool, &dir_sha).await.unwrap();

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "Visible.txt");
}

#[tokio::test]
async fn vanished_file_is_marked_delete_pending_not_hard_deleted() {
    let ctx = init_test_db().await;
    let dir = tempdir().unwrap();
    let path = dir.path().join("gone.txt");
    fs::write(&path, b"temporary").unwrap();

    let config = GalleryConfig::default();
    let registry = registry();
    let locks = DirectoryLockTable::new();

    sync::sync(&ctx.pool, &config, &registry, &locks, &NoopPurgeNotifier, dir.path())
        .await
        .unwrap();

    fs::remove_file(&path).unwrap();
    sync::sync(&ctx.pool, &config, &registry, &locks, &NoopPurgeNotifier, dir.path())
        .await
        .unwrap();

    let dir_sha = identity::dir_sha256(dir.path()).unwrap();
    let visible = file_repo::get_by_directory(&ctx.pool, &dir_sha).await.unwrap();
    assert!(visible.is_empty());

    let row = directory_repo::get_by_sha(&ctx.pool, &dir_sha).await.unwrap().unwrap();
    assert_eq!(row.count_files, 0);
}
