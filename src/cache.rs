//! Per-run memo of downloaded avatars.

use std::{
    collections::HashMap,
    path::{Component, Path, PathBuf},
};

use tracing::{debug, info};

use crate::downloader::{ImageFetcher, ImageKind};
use crate::error::{Error, Result};

/// Size and fallback parameters requested for every avatar
pub const AVATAR_QUERY: &str = "s=50&d=identicon&r=pg";

/// Canonical download URL for `hash` under `base`
pub fn avatar_url(base: &str, hash: &str) -> String {
    format!("{}/{}?{}", base.trim_end_matches('/'), hash, AVATAR_QUERY)
}

/// Where the image for `hash` goes, extension not included.
///
/// The hash comes straight out of the HTML, so anything other than a single
/// plain file name (`/tmp/..`, `../x`, `a/b`) is rejected rather than joined.
fn avatar_path(out_dir: &Path, hash: &str) -> Result<PathBuf> {
    let mut components = Path::new(hash).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) if name == hash => Ok(out_dir.join(hash)),
        _ => Err(Error::InvalidHash {
            hash: hash.to_string(),
        }),
    }
}

/// Maps an avatar hash to the extension of its local copy.
pub trait AvatarStore {
    async fn resolve(&mut self, hash: &str) -> Result<&'static str>;
}

pub struct GravatarCache<F> {
    fetcher: F,
    avatar_base: String,
    out_dir: PathBuf,
    entries: HashMap<String, ImageKind>,
}

impl<F: ImageFetcher> GravatarCache<F> {
    pub fn new(fetcher: F, avatar_base: impl Into<String>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            fetcher,
            avatar_base: avatar_base.into(),
            out_dir: out_dir.into(),
            entries: HashMap::new(),
        }
    }

    /// Pre-seed hashes whose images are already on disk
    #[cfg(test)]
    pub fn with_entries(mut self, entries: impl IntoIterator<Item = (String, ImageKind)>) -> Self {
        self.entries.extend(entries);
        self
    }

    /// Number of distinct avatars known to this cache
    pub fn downloads(&self) -> usize {
        self.entries.len()
    }
}

impl<F: ImageFetcher> AvatarStore for GravatarCache<F> {
    async fn resolve(&mut self, hash: &str) -> Result<&'static str> {
        if let Some(kind) = self.entries.get(hash) {
            debug!(hash, "Avatar already downloaded");
            return Ok(kind.extension());
        }

        let base_path = avatar_path(&self.out_dir, hash)?;

        info!(hash, "Downloading avatar");
        let url = avatar_url(&self.avatar_base, hash);
        let kind = self.fetcher.fetch(&url, &base_path).await?;

        self.entries.insert(hash.to_string(), kind);
        Ok(kind.extension())
    }
}
