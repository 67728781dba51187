//! Request classification.
//!
//! Every request falls into exactly one [`Category`]. Images are static
//! assets only when they were listed for precaching; any other image takes
//! the image path.

use std::sync::LazyLock;

use pwa_core::{ConfigSnapshot, Request};
use regex::Regex;

/// Scripts, stylesheets, images and fonts.
static ASSET_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(js|css|jpe?g|png|gif|svg|webp|ico|woff2?|ttf|otf|eot)$").expect("valid regex"));

static IMAGE_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\.(jpe?g|png|gif|svg|webp|ico)$").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Not GET, not http(s), or matched an exclusion pattern. Never touches the cache.
    Excluded,
    StaticAsset,
    Image,
    /// Pages, API responses, everything else.
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Excluded => "excluded",
            Category::StaticAsset => "static-asset",
            Category::Image => "image",
            Category::Other => "other",
        }
    }
}

pub fn classify(snapshot: &ConfigSnapshot, request: &Request) -> Category {
    if !request.is_get() || !matches!(request.url.scheme(), "http" | "https") || snapshot.is_excluded(&request.url) {
        return Category::Excluded;
    }

    let path = request.url.path();
    let is_image = IMAGE_PATH.is_match(path);

    if ASSET_PATH.is_match(path) && (!is_image || snapshot.is_precached(&request.url)) {
        return Category::StaticAsset;
    }

    if is_image { Category::Image } else { Category::Other }
}
