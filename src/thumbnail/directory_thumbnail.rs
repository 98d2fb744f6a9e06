//! Directory thumbnail selection.

use crate::config::GalleryConfig;
use crate::filetype::FiletypeRegistry;
use crate::index::sort::natural_compare;
use crate::index::File;

/// What a Directory's thumbnail should be rendered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryThumbnailSource {
    /// Render from this file's own thumbnail record.
    File { file_sha256: String },
    /// No contained file qualifies; use the `.dir` kind-icon.
    KindIcon,
}

/// Picks a Directory's thumbnail source from its non-deleted files:
/// 1. a file whose stem matches a configured cover name,
/// 2. otherwise the natural-name-first image file,
/// 3. otherwise the kind-icon fallback.
pub fn select(files: &[File], config: &GalleryConfig, registry: &FiletypeRegistry) -> DirectoryThumbnailSource {
    for cover_name in &config.cover_names {
        if let Some(hit) = files.iter().find(|f| stem_matches(&f.name, cover_name)) {
            return DirectoryThumbnailSource::File {
                file_sha256: hit.file_sha256.clone(),
            };
        }
    }

    let mut images: Vec<&File> = files
        .iter()
        .filter(|f| registry.get_by_ext(&f.filetype_ext).is_image)
        .collect();
    images.sort_by(|a, b| natural_compare(&a.name, &b.name));

    if let Some(first) = images.into_iter().next() {
        return DirectoryThumbnailSource::File {
            file_sha256: first.file_sha256.clone(),
        };
    }

    DirectoryThumbnailSource::KindIcon
}

fn stem_matches(file_name: &str, cover_name: &str) -> bool {
    std::path::Path::new(file_name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().eq_ignore_ascii_case(cover_name))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn file(name: &str, ext: &str, sha: &str) -> File {
        File {
            unique_sha256: format!("u-{sha}"),
            name: name.into(),
            home_directory: "dir".into(),
            file_sha256: sha.into(),
            filetype_ext: ext.into(),
            size: 1,
            mtime: Some(Utc::now()),
            delete_pending: false,
        }
    }

    #[test]
    fn cover_name_wins_over_natural_first_image() {
        let registry = FiletypeRegistry::from_filetypes(crate::filetype::defaults::seed());
        let config = GalleryConfig::default();
        let files = vec![file("Aaa.jpg", ".jpg", "sha-a"), file("Cover.jpg", ".jpg", "sha-cover")];
        let selected = select(&files, &config, &registry);
        assert_eq!(
            selected,
            DirectoryThumbnailSource::File {
                file_sha256: "sha-cover".into()
            }
        );
    }

    #[test]
    fn falls_back_to_natural_first_image_without_cover() {
        let registry = FiletypeRegistry::from_filetypes(crate::filetype::defaults::seed());
        let config = GalleryConfig::default();
        let files = vec![file("img10.jpg", ".jpg", "sha-10"), file("img2.jpg", ".jpg", "sha-2")];
        let selected = select(&files, &config, &registry);
        assert_eq!(
            selected,
            DirectoryThumbnailSource::File {
                file_sha256: "sha-2".into()
            }
        );
    }

    #[test]
    fn falls_back_to_kind_icon_with_no_images() {
        let registry = FiletypeRegistry::from_filetypes(crate::filetype::defaults::seed());
        let config = GalleryConfig::default();
        let files = vec![file("notes.txt", ".txt", "sha-txt")];
        assert_eq!(select(&files, &config, &registry), DirectoryThumbnailSource::KindIcon);
    }
}
