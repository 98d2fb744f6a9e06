//! Thumbnail Cache & Generation Pipeline.
//!
//! Produces and caches three-size previews for every indexable file,
//! keyed by content SHA so duplicates share one record.

pub mod archive;
pub mod backend;
pub mod directory_thumbnail;
pub mod pipeline;
pub mod store;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThumbnailSizeName {
    Small,
    Medium,
    Large,
}

impl ThumbnailSizeName {
    pub const ALL: [ThumbnailSizeName; 3] = [
        ThumbnailSizeName::Small,
        ThumbnailSizeName::Medium,
        ThumbnailSizeName::Large,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailSizeName::Small => "small",
            ThumbnailSizeName::Medium => "medium",
            ThumbnailSizeName::Large => "large",
        }
    }
}

impl std::str::FromStr for ThumbnailSizeName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "small" => Ok(ThumbnailSizeName::Small),
            "medium" => Ok(ThumbnailSizeName::Medium),
            "large" => Ok(ThumbnailSizeName::Large),
            other => Err(format!("unknown thumbnail size: {other}")),
        }
    }
}

/// A single SHA's thumbnail slots. A `None` slot means "not generated
/// yet"; the caller renders a placeholder.
#[derive(Debug, Clone, Default)]
pub struct ThumbnailRecord {
    pub sha256_hash: String,
    pub small_thumb: Option<Vec<u8>>,
    pub medium_thumb: Option<Vec<u8>>,
    pub large_thumb: Option<Vec<u8>>,
}

impl ThumbnailRecord {
    pub fn is_complete(&self) -> bool {
        self.small_thumb.is_some() && self.medium_thumb.is_some() && self.large_thumb.is_some()
    }

    pub fn slot(&self, size: ThumbnailSizeName) -> Option<&[u8]> {
        match size {
            ThumbnailSizeName::Small => self.small_thumb.as_deref(),
            ThumbnailSizeName::Medium => self.medium_thumb.as_deref(),
            ThumbnailSizeName::Large => self.large_thumb.as_deref(),
        }
    }
}

/// Sentinel thumbnail bytes written to all three slots on decode
/// failure, so subsequent requests don't retry decoding a file that
/// will never decode. A single 1x1 PNG is cheap to embed and
/// unambiguous to detect.
pub const BROKEN_MEDIA_SENTINEL: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53,
    0xde, 0x00, 0x00, 0x00, 0x0c, 0x49, 0x44, 0x41, 0x54, 0x08, 0xd7, 0x63, 0xf8, 0xcf, 0xc0, 0x00,
    0x00, 0x00, 0x03, 0x00, 0x01, 0x18, 0xdd, 0x8d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4e,
    0x44, 0xae, 0x42, 0x60, 0x82,
];
