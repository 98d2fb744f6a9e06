//! Layout/Pagination Engine.
//!
//! Given a directory, sort order, page number, and duplicate-visibility
//! flag, produces the ordered, paginated slice of entries plus
//! navigation context (prev/next page, prev/next sibling directory,
//! breadcrumbs).

pub mod cache;

pub use cache::LayoutCache;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use log::warn;
use sqlx::SqlitePool;

use crate::config::GalleryConfig;
use crate::error::{GalleryError, GalleryResult};
use crate::filetype::FiletypeRegistry;
use crate::index::{directory_repo, file_repo, sort, Directory, File, SortOrder};
use crate::thumbnail::directory_thumbnail::{self, DirectoryThumbnailSource};
use crate::thumbnail::pipeline;

/// Per-kind display hints carried on every entry; `File` additionally
/// carries the extension so a template layer can branch on filetype
/// without a second lookup.
#[derive(Debug, Clone)]
pub enum EntryKind {
    Directory,
    File { filetype_ext: String },
}

#[derive(Debug, Clone)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
    /// The SHA-addressed thumbnail endpoint, e.g. `/thumbnail/<sha>/small`
    /// for files and directories with a selected cover file, or an icon
    /// path for directories that fall back to the kind-icon.
    pub thumbnail_url: String,
    pub mimetype: String,
    pub icon_filename: String,
    pub color: String,
    pub size: Option<i64>,
    pub mtime: Option<DateTime<Utc>>,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Pagination {
    pub total_items: usize,
    pub page_count: usize,
    pub current_page: usize,
    pub prev_page_url: Option<String>,
    pub next_page_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SiblingDirectory {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct Siblings {
    pub prev: Option<SiblingDirectory>,
    pub next: Option<SiblingDirectory>,
}

#[derive(Debug, Clone)]
pub struct Breadcrumb {
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct Page {
    pub entries: Vec<Entry>,
    pub pagination: Pagination,
    pub siblings: Siblings,
    pub breadcrumbs: Vec<Breadcrumb>,
}

enum Item {
    Dir(Directory),
    File(File),
}

fn item_name(item: &Item) -> &str {
    match item {
        Item::Dir(dir) => basename(&dir.fqpn),
        Item::File(file) => &file.name,
    }
}

/// Builds (or returns the cached) page for `dir_sha256`. Assumes the
/// caller has already ensured the directory is synced
/// (`GalleryContext::list_directory` does this before calling in).
pub async fn list_directory(
    pool: &SqlitePool,
    config: &GalleryConfig,
    registry: &'static FiletypeRegistry,
    layout_cache: &LayoutCache,
    dir_sha256: &str,
    sort_order: SortOrder,
    show_duplicates: bool,
    page: usize,
) -> GalleryResult<Page> {
    let page_u32 = page.max(1) as u32;

    if let Some(cached) = layout_cache.get(dir_sha256, sort_order, page_u32, show_duplicates) {
        return Ok(cached);
    }

    let directory = directory_repo::get_by_sha(pool, dir_sha256)
        .await
        .map_err(GalleryError::from)?
        .ok_or_else(|| GalleryError::NotFound(format!("no such directory: {dir_sha256}")))?;

    let mut files = file_repo::get_by_directory(pool, dir_sha256)
        .await
        .map_err(GalleryError::from)?;
    if !show_duplicates {
        files = filter_duplicates(pool, files).await?;
    }

    let subdirs = directory_repo::get_children(pool, dir_sha256)
        .await
        .map_err(GalleryError::from)?;

    let items = order_items(subdirs, files, sort_order, registry);

    let page_size = config.gallery_page_size.max(1);
    let total_items = items.len();
    let page_count = if total_items == 0 {
        0
    } else {
        (total_items + page_size - 1) / page_size
    };
    let current_page = (page_u32 as usize).min(page_count.max(1)).max(1);

    let start = (current_page - 1) * page_size;
    let end = (start + page_size).min(total_items);
    let page_items: &[Item] = if start < total_items { &items[start..end] } else { &[] };

    let entries = build_entries(pool, config, registry, &directory, page_items).await?;

    let pagination = Pagination {
        total_items,
        page_count,
        current_page,
        prev_page_url: (current_page > 1)
            .then(|| page_url(&directory.fqpn, config, sort_order, current_page - 1)),
        next_page_url: (current_page < page_count)
            .then(|| page_url(&directory.fqpn, config, sort_order, current_page + 1)),
    };

    let siblings = build_siblings(pool, config, &directory, sort_order).await?;
    let breadcrumbs = build_breadcrumbs(pool, config, &directory).await?;

    let result = Page {
        entries,
        pagination,
        siblings,
        breadcrumbs,
    };
    layout_cache.put(dir_sha256, sort_order, page_u32, show_duplicates, result.clone());
    Ok(result)
}

/// Group-then-sort for `NaturalName`/`LastModified`, pure natural-name
/// order across both kinds for `NameOnly`.
fn order_items(
    mut dirs: Vec<Directory>,
    mut files: Vec<File>,
    order: SortOrder,
    registry: &FiletypeRegistry,
) -> Vec<Item> {
    match order {
        SortOrder::NameOnly => {
            let mut items: Vec<Item> = dirs
                .drain(..)
                .map(Item::Dir)
                .chain(files.drain(..).map(Item::File))
                .collect();
            items.sort_by(|a, b| sort::natural_compare(item_name(a), item_name(b)));
            items
        }
        SortOrder::NaturalName | SortOrder::LastModified => {
            // `sort_files` already groups links ahead of plain files, so
            // dirs-then-files here gives the full "directories, then
            // links, then files" ordering.
            sort::sort_directories(&mut dirs, order);
            sort::sort_files(&mut files, order, registry);
            dirs.into_iter()
                .map(Item::Dir)
                .chain(files.into_iter().map(Item::File))
                .collect()
        }
    }
}

/// Hides all but the natural-name-first occurrence of each globally
/// duplicated `file_sha256`.
async fn filter_duplicates(pool: &SqlitePool, files: Vec<File>) -> GalleryResult<Vec<File>> {
    let duplicate_shas = file_repo::duplicate_file_shas(pool).await.map_err(GalleryError::from)?;
    if duplicate_shas.is_empty() {
        return Ok(files);
    }

    let mut winners: HashMap<String, String> = HashMap::new();
    let mut kept = Vec::with_capacity(files.len());

    for file in files {
        if !duplicate_shas.contains(&file.file_sha256) {
            kept.push(file);
            continue;
        }

        let winner = match winners.get(&file.file_sha256) {
            Some(w) => w.clone(),
            None => {
                let w = winner_unique_sha(pool, &file.file_sha256).await?;
                winners.insert(file.file_sha256.clone(), w.clone());
                w
            }
        };

        if file.unique_sha256 == winner {
            kept.push(file);
        }
    }

    Ok(kept)
}

async fn winner_unique_sha(pool: &SqlitePool, file_sha256: &str) -> GalleryResult<String> {
    let mut locations = file_repo::locations_for_file_sha(pool, file_sha256)
        .await
        .map_err(GalleryError::from)?;
    locations.sort_by(|a, b| sort::natural_compare(&a.full_path, &b.full_path));
    locations
        .into_iter()
        .next()
        .map(|loc| loc.unique_sha256)
        .ok_or_else(|| {
            GalleryError::InvariantViolation(format!("duplicate sha {file_sha256} has no locations"))
        })
}

async fn build_entries(
    pool: &SqlitePool,
    config: &GalleryConfig,
    registry: &'static FiletypeRegistry,
    directory: &Directory,
    items: &[Item],
) -> GalleryResult<Vec<Entry>> {
    let dir_rel = relative_path(&directory.fqpn, config);
    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        let entry = match item {
            Item::Dir(dir) => directory_entry(pool, config, registry, dir).await?,
            Item::File(file) => file_entry(pool, config, registry, file, &dir_rel).await,
        };
        entries.push(entry);
    }
    Ok(entries)
}

/// Thumbnails needed on this page are enqueued on the generation
/// pipeline rather than generated inline; missing ones render a
/// placeholder until the pipeline catches up.
async fn file_entry(
    pool: &SqlitePool,
    config: &GalleryConfig,
    registry: &'static FiletypeRegistry,
    file: &File,
    dir_rel: &str,
) -> Entry {
    let filetype = registry.get_by_ext(&file.filetype_ext);

    if let Err(e) = pipeline::get_or_create(pool, config, registry, &file.file_sha256).await {
        warn!("thumbnail scheduling failed for {}: {e}", file.file_sha256);
    }

    Entry {
        name: file.name.clone(),
        kind: EntryKind::File {
            filetype_ext: file.filetype_ext.clone(),
        },
        thumbnail_url: thumbnail_url_for(&file.file_sha256),
        mimetype: filetype.mimetype,
        icon_filename: filetype.icon_filename,
        color: filetype.color,
        size: Some(file.size),
        mtime: file.mtime,
        url: format!("/{dir_rel}{}?usha={}", file.name, file.unique_sha256),
    }
}

async fn directory_entry(
    pool: &SqlitePool,
    config: &GalleryConfig,
    registry: &'static FiletypeRegistry,
    dir: &Directory,
) -> GalleryResult<Entry> {
    let files = file_repo::get_by_directory(pool, &dir.dir_sha256)
        .await
        .map_err(GalleryError::from)?;
    let source = directory_thumbnail::select(&files, config, registry);
    let dir_filetype = registry.get_by_ext(".dir");

    let thumbnail_url = match &source {
        DirectoryThumbnailSource::File { file_sha256 } => {
            if let Err(e) = pipeline::get_or_create(pool, config, registry, file_sha256).await {
                warn!("thumbnail scheduling failed for directory {}: {e}", dir.fqpn);
            }
            thumbnail_url_for(file_sha256)
        }
        DirectoryThumbnailSource::KindIcon => icon_url(&dir_filetype.icon_filename),
    };

    Ok(Entry {
        name: basename(&dir.fqpn).to_string(),
        kind: EntryKind::Directory,
        thumbnail_url,
        mimetype: dir_filetype.mimetype,
        icon_filename: dir_filetype.icon_filename,
        color: dir_filetype.color,
        size: None,
        mtime: dir.last_sync_time,
        url: format!("/{}/", relative_path(&dir.fqpn, config)),
    })
}

async fn build_siblings(
    pool: &SqlitePool,
    config: &GalleryConfig,
    directory: &Directory,
    sort_order: SortOrder,
) -> GalleryResult<Siblings> {
    let Some(parent_sha) = directory.parent_dir_sha256.as_ref() else {
        return Ok(Siblings::default());
    };

    let mut siblings = directory_repo::get_children(pool, parent_sha)
        .await
        .map_err(GalleryError::from)?;
    sort::sort_directories(&mut siblings, sort_order);

    let Some(position) = siblings.iter().position(|d| d.dir_sha256 == directory.dir_sha256) else {
        return Ok(Siblings::default());
    };

    let prev = position
        .checked_sub(1)
        .and_then(|i| siblings.get(i))
        .map(|d| sibling_of(d, config));
    let next = siblings.get(position + 1).map(|d| sibling_of(d, config));

    Ok(Siblings { prev, next })
}

fn sibling_of(dir: &Directory, config: &GalleryConfig) -> SiblingDirectory {
    SiblingDirectory {
        name: basename(&dir.fqpn).to_string(),
        url: format!("/{}/", relative_path(&dir.fqpn, config)),
    }
}

/// Root-to-current ordered list of ancestor directories.
async fn build_breadcrumbs(
    pool: &SqlitePool,
    config: &GalleryConfig,
    directory: &Directory,
) -> GalleryResult<Vec<Breadcrumb>> {
    let mut chain = vec![directory.clone()];
    let mut current = directory.clone();

    while let Some(parent_sha) = current.parent_dir_sha256.clone() {
        match directory_repo::get_by_sha(pool, &parent_sha)
            .await
            .map_err(GalleryError::from)?
        {
            Some(parent) => {
                chain.push(parent.clone());
                current = parent;
            }
            None => break,
        }
    }
    chain.reverse();

    Ok(chain
        .iter()
        .map(|dir| Breadcrumb {
            label: basename(&dir.fqpn).to_string(),
            url: format!("/{}/", relative_path(&dir.fqpn, config)),
        })
        .collect())
}

fn page_url(dir_fqpn: &str, config: &GalleryConfig, sort_order: SortOrder, page: usize) -> String {
    format!(
        "/{}?sort={}&page={page}",
        relative_path(dir_fqpn, config),
        sort_order as i32
    )
}

fn thumbnail_url_for(sha256: &str) -> String {
    format!("/thumbnail/{sha256}/small")
}

fn icon_url(icon_filename: &str) -> String {
    format!("/icons/{icon_filename}")
}

fn basename(fqpn: &str) -> &str {
    let trimmed = fqpn.trim_end_matches(std::path::MAIN_SEPARATOR);
    trimmed.rsplit(std::path::MAIN_SEPARATOR).next().unwrap_or(trimmed)
}

/// `fqpn` relative to the managed root, without a leading or trailing
/// separator, used to build entry and navigation URLs.
fn relative_path(fqpn: &str, config: &GalleryConfig) -> String {
    let root = crate::identity::canonicalize_directory(&config.managed_root)
        .unwrap_or_else(|_| config.managed_root.to_string_lossy().to_lowercase());
    let root = root.trim_end_matches(std::path::MAIN_SEPARATOR);

    let rel = fqpn
        .trim_end_matches(std::path::MAIN_SEPARATOR)
        .strip_prefix(root)
        .unwrap_or(fqpn)
        .trim_start_matches(std::path::MAIN_SEPARATOR);

    if rel.is_empty() {
        String::new()
    } else {
        format!("{rel}{}", std::path::MAIN_SEPARATOR)
    }
}

#[cfg(test)]
#[path = "tests/layout_tests.rs"]
mod tests;
