//! Filename rules for turning bucket objects into fabrics.
//!
//! A bucket holds one base image per fabric (`Ocean Blue.png`) plus optional
//! companion texture maps sharing its stem (`Ocean Blue_normal.png`).

use std::sync::LazyLock;

use regex::Regex;

use cushion_core::FabricId;

use crate::storage::FileObject;

/// Image extensions recognised in the bucket (compared case-insensitively).
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp", "tiff", "tif"];

static TEXTURE_MAP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)_normal|_roughness|_ao|_ambient|_displacement|_height")
        .expect("Invalid regex")
});

/// The stem of an image filename, or `None` if it has no image extension.
#[must_use]
pub fn image_stem(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    IMAGE_EXTENSIONS
        .iter()
        .any(|known| ext.eq_ignore_ascii_case(known))
        .then_some(stem)
}

/// Whether the filename looks like a texture map rather than a base image.
#[must_use]
pub fn is_texture_map(name: &str) -> bool {
    TEXTURE_MAP_RE.is_match(name)
}

/// `sunproof-` followed by the stem lower-cased, with every run of characters
/// outside `[a-z0-9]` replaced by one hyphen and edge hyphens removed.
#[must_use]
pub fn fabric_id(stem: &str) -> FabricId {
    let mut slug = String::with_capacity(stem.len());
    let mut pending_dash = false;
    for c in stem.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    FabricId::new(format!("sunproof-{slug}"))
}

/// Human-readable name: `-` and `_` become spaces, whitespace runs collapse.
#[must_use]
pub fn display_name(stem: &str) -> String {
    stem.replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Kinds of companion texture map linked to a base image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    Normal,
    Roughness,
    AmbientOcclusion,
    Displacement,
}

/// Companion lookup table, evaluated in this order.
pub const COMPANION_MAPS: &[(MapKind, &[&str])] = &[
    (MapKind::Normal, &["_normal", "_Normal"]),
    (MapKind::Roughness, &["_roughness", "_Roughness"]),
    (MapKind::AmbientOcclusion, &["_ao", "_AO", "_ambient"]),
    (MapKind::Displacement, &["_displacement", "_height", "_Height"]),
];

/// The first file named `<stem><token>...` with an image extension, trying
/// each token of one [`COMPANION_MAPS`] row.
#[must_use]
pub fn find_companion<'f>(stem: &str, tokens: &[&str], files: &'f [FileObject]) -> Option<&'f FileObject> {
    files.iter().find(|file| {
        !file.name.is_empty()
            && image_stem(&file.name).is_some()
            && tokens.iter().any(|token| {
                file.name
                    .strip_prefix(stem)
                    .is_some_and(|rest| rest.starts_with(token))
            })
    })
}
