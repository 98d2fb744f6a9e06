//! Archive thumbnails: the thumbnail of an archive file is its first
//! image entry, extracted to memory and fed to the backend.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{GalleryError, GalleryResult};
use crate::filetype::FiletypeRegistry;
use crate::index::sort::natural_compare;

/// Reads the first image entry (by natural-name order of entry paths)
/// out of a ZIP-family archive (ZIP, CBZ). Invalid or password-protected
/// archives surface as `GalleryError::Corrupt`, which the caller turns
/// into the cached "broken archive" placeholder.
pub fn first_image_entry_bytes(
    archive_path: &Path,
    registry: &FiletypeRegistry,
) -> GalleryResult<Vec<u8>> {
    let file = File::open(archive_path).map_err(GalleryError::from)?;
    let mut archive = zip::ZipArchive::new(file)
        .map_err(|e| GalleryError::Corrupt(format!("invalid or corrupt archive: {e}")))?;

    let mut image_names: Vec<String> = Vec::new();
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|e| GalleryError::Corrupt(format!("unreadable archive entry: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        let ext = Path::new(&name)
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
            .unwrap_or_default();
        if registry.get_by_ext(&ext).is_image {
            image_names.push(name);
        }
    }

    image_names.sort_by(|a, b| natural_compare(a, b));
    let first = image_names
        .into_iter()
        .next()
        .ok_or_else(|| GalleryError::Corrupt("archive contains no image entries".into()))?;

    let mut entry = archive
        .by_name(&first)
        .map_err(|e| GalleryError::Corrupt(format!("password-protected or missing entry: {e}")))?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry
        .read_to_end(&mut bytes)
        .map_err(|e| GalleryError::Corrupt(format!("failed reading archive entry: {e}")))?;

    Ok(bytes)
}
