//! `ImageBackend`: takes a file path plus a `{size_name: (w, h)}` map and
//! returns `{size_name: bytes}`, fit-inside-box.

use std::collections::HashMap;
use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use log::warn;

use crate::error::{GalleryError, GalleryResult};

use super::ThumbnailSizeName;

pub trait ImageBackend: Send + Sync {
    fn generate(
        &self,
        bytes: &[u8],
        kind: MediaKind,
        sizes: &HashMap<ThumbnailSizeName, (u32, u32)>,
    ) -> GalleryResult<HashMap<ThumbnailSizeName, Vec<u8>>>;
}

/// Dispatch hint so a backend can pick a decode strategy without
/// re-sniffing the file extension itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Pdf,
    Movie,
}

/// Portable baseline backend built on the `image` crate. Handles raster
/// images directly. PDF and video inputs have no decoder wired up in
/// this build (see DESIGN.md); they report a decode error, which the
/// pipeline turns into the broken-media sentinel rather than leaving
/// the slots empty indefinitely.
pub struct PillowStyleBackend;

impl ImageBackend for PillowStyleBackend {
    fn generate(
        &self,
        bytes: &[u8],
        kind: MediaKind,
        sizes: &HashMap<ThumbnailSizeName, (u32, u32)>,
    ) -> GalleryResult<HashMap<ThumbnailSizeName, Vec<u8>>> {
        match kind {
            MediaKind::Pdf => {
                return Err(GalleryError::Corrupt(
                    "PDF rendering unsupported by this backend".into(),
                ))
            }
            MediaKind::Movie => {
                return Err(GalleryError::Corrupt(
                    "video frame extraction unsupported by this backend".into(),
                ))
            }
            MediaKind::Image => {}
        }

        let img = image::load_from_memory(bytes)
            .map_err(|e| GalleryError::Corrupt(format!("image decode failed: {e}")))?;

        let mut out = HashMap::with_capacity(sizes.len());
        for (&size_name, &(w, h)) in sizes {
            let resized = img.resize(w, h, FilterType::CatmullRom);
            let encoded = encode(&resized, &img)?;
            out.insert(size_name, encoded);
        }
        Ok(out)
    }
}

/// PNG when the source (or resize) carries an alpha channel — required
/// for transparency on icons; JPEG otherwise.
fn encode(resized: &DynamicImage, original: &DynamicImage) -> GalleryResult<Vec<u8>> {
    let mut buf = Vec::new();
    let format = if original.color().has_alpha() {
        ImageFormat::Png
    } else {
        ImageFormat::Jpeg
    };
    resized
        .write_to(&mut Cursor::new(&mut buf), format)
        .map_err(|e| GalleryError::Corrupt(format!("thumbnail encode failed: {e}")))?;
    Ok(buf)
}

/// Construct the platform-appropriate backend: a faster native pipeline
/// where available, falling back to [`PillowStyleBackend`] on any
/// initialization failure. No native backend is wired in this build —
/// Apple Silicon's Core Image pipeline has no available Rust binding —
/// so this always selects the portable baseline, but the call site is
/// structured so a native backend can be slotted in without touching
/// callers.
pub fn select_backend() -> Box<dyn ImageBackend> {
    if is_apple_silicon() {
        warn!("native backend unavailable on this build, falling back to the portable baseline");
    }
    Box::new(PillowStyleBackend)
}

fn is_apple_silicon() -> bool {
    cfg!(target_os = "macos") && cfg!(target_arch = "aarch64")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_png(w: u32, h: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(w, h);
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        buf
    }

    #[test]
    fn generates_all_requested_sizes() {
        let backend = PillowStyleBackend;
        let bytes = solid_png(50, 50);
        let mut sizes = HashMap::new();
        sizes.insert(ThumbnailSizeName::Small, (200, 200));
        sizes.insert(ThumbnailSizeName::Medium, (740, 740));

        let out = backend.generate(&bytes, MediaKind::Image, &sizes).unwrap();
        assert_eq!(out.len(), 2);
        assert!(out.contains_key(&ThumbnailSizeName::Small));
    }

    #[test]
    fn corrupt_bytes_produce_corrupt_error() {
        let backend = PillowStyleBackend;
        let mut sizes = HashMap::new();
        sizes.insert(ThumbnailSizeName::Small, (200, 200));
        let result = backend.generate(b"not an image", MediaKind::Image, &sizes);
        assert!(result.is_err());
    }

    #[test]
    fn pdf_kind_is_reported_unsupported_not_panicking() {
        let backend = PillowStyleBackend;
        let sizes = HashMap::new();
        let result = backend.generate(&[], MediaKind::Pdf, &sizes);
        assert!(result.is_err());
    }
}
