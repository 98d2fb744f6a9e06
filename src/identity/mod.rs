//! Identity & Path Normalizer.
//!
//! Canonicalizes paths and computes the SHA-256 identities used
//! throughout the index. Path canonicalization and the resulting
//! directory SHA are pure functions of their input and are memoized in
//! a bounded LRU.

use std::io::Read;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Mutex;

use lru::LruCache;
use sha2::{Digest, Sha256};

use crate::error::{GalleryError, GalleryResult};

const CANONICAL_CACHE_CAPACITY: usize = 5000;
const HASH_CHUNK_SIZE: usize = 4096;

struct CanonicalEntry {
    canonical: String,
    dir_sha256: String,
}

static CANONICAL_CACHE: Mutex<Option<LruCache<String, CanonicalEntry>>> = Mutex::new(None);

fn with_cache<T>(f: impl FnOnce(&mut LruCache<String, CanonicalEntry>) -> T) -> T {
    let mut guard = CANONICAL_CACHE.lock().unwrap_or_else(|p| p.into_inner());
    let cache = guard.get_or_insert_with(|| {
        LruCache::new(NonZeroUsize::new(CANONICAL_CACHE_CAPACITY).unwrap())
    });
    f(cache)
}

/// Canonicalize a directory path: resolve symlinks and relative
/// components, lower-case the entire string, ensure exactly one
/// trailing path separator.
pub fn canonicalize_directory(path: &Path) -> GalleryResult<String> {
    let key = path.to_string_lossy().to_string();

    if let Some(hit) = with_cache(|cache| cache.get(&key).map(|e| e.canonical.clone())) {
        return Ok(hit);
    }

    let resolved = std::fs::canonicalize(path).map_err(GalleryError::from)?;
    let canonical = normalize_trailing_separator(&resolved.to_string_lossy().to_lowercase());

    let dir_sha256 = sha256_hex(canonical.as_bytes());
    with_cache(|cache| {
        cache.put(
            key,
            CanonicalEntry {
                canonical: canonical.clone(),
                dir_sha256,
            },
        );
    });

    Ok(canonical)
}

/// Directory SHA-256: `SHA256(lower(canonical(fqpn)))`. Uses the same
/// memoized entry as `canonicalize_directory` when the cache is warm.
pub fn dir_sha256(path: &Path) -> GalleryResult<String> {
    let key = path.to_string_lossy().to_string();

    if let Some(hit) = with_cache(|cache| cache.get(&key).map(|e| e.dir_sha256.clone())) {
        return Ok(hit);
    }

    canonicalize_directory(path)?;
    with_cache(|cache| cache.get(&key).map(|e| e.dir_sha256.clone()))
        .ok_or_else(|| GalleryError::InvariantViolation("dir sha256 cache miss after insert".into()))
}

/// Directory SHA-256 from an already-canonicalized `fqpn` string, without
/// touching the filesystem (used when reconstructing identity from a
/// stored path, e.g. a parent directory's `fqpn`).
pub fn dir_sha256_of_canonical(canonical_fqpn: &str) -> String {
    sha256_hex(canonical_fqpn.as_bytes())
}

fn normalize_trailing_separator(s: &str) -> String {
    let trimmed = s.trim_end_matches(std::path::MAIN_SEPARATOR);
    format!("{trimmed}{}", std::path::MAIN_SEPARATOR)
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Streams file content in 4 KiB chunks into SHA-256, continuing the
/// same hasher state with the title-cased full path bytes to produce
/// `unique_sha256`.
///
/// Returns `(file_sha256, unique_sha256)`.
pub fn hash_file_content_and_identity(
    path: &Path,
    full_path_title_cased: &str,
) -> GalleryResult<(String, String)> {
    let mut file = std::fs::File::open(path).map_err(GalleryError::from)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf).map_err(GalleryError::from)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    let file_sha256 = hex::encode(hasher.clone().finalize());
    hasher.update(full_path_title_cased.as_bytes());
    let unique_sha256 = hex::encode(hasher.finalize());

    Ok((file_sha256, unique_sha256))
}

/// Title-case normalization: each whitespace-separated token's first
/// character is upper-cased, the rest lower-cased.
pub fn title_case(name: &str) -> String {
    name.split(' ')
        .map(title_case_token)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_token(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => {
            let rest: String = chars.flat_map(|c| c.to_lowercase()).collect();
            format!("{}{}", first.to_uppercase(), rest)
        }
        None => String::new(),
    }
}

/// Combined SHA-256: hash of the concatenation of a directory's file
/// content SHAs, in sorted order.
pub fn combined_sha256<'a>(sorted_file_shas: impl Iterator<Item = &'a str>) -> String {
    let mut hasher = Sha256::new();
    for sha in sorted_file_shas {
        hasher.update(sha.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Join a directory's canonical fqpn and a title-cased file name into the
/// full path string used as input to `unique_sha256`.
pub fn full_path_for_identity(dir_fqpn: &str, title_cased_name: &str) -> String {
    format!("{dir_fqpn}{title_cased_name}")
}

#[cfg(test)]
#[path = "tests/identity_tests.rs"]
mod tests;
