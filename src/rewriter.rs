//! In-place rewriting of avatar URLs in a single HTML file.
//!
//! This is a targeted pattern match, not an HTML parse: the only shape we care
//! about is a double-quoted `https://www.gravatar.com/avatar/` URL. The hash is
//! always the 32 characters right after that prefix, whatever they are; the
//! rest of the URL up to the closing quote (size, fallback, rating) is dropped.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::{debug, info, instrument};

use crate::cache::AvatarStore;
use crate::error::{Error, Result};

// A "character" is a UTF-8 scalar or, failing that, one stray non-ASCII byte,
// so pages in legacy encodings still match. Newlines never count.
static AVATAR_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#""https://www\.gravatar\.com/avatar/((?:.|(?-u:[\x80-\xFF])){32})(?:[^"]|(?-u:[\x80-\xFF]))*""#,
    )
    .expect("avatar URL pattern is valid")
});

/// Outcome of processing one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rewrite {
    /// No avatar URLs, the file was not written
    Unchanged,
    Rewritten {
        /// Number of pattern matches found in the original file
        urls: usize,
    },
}

/// Quoted local reference for `hash`, e.g. `"/img/gravatar/<hash>.png"`
fn local_reference(public_path: &str, hash: &str, extension: &str) -> Vec<u8> {
    format!(
        "\"{}/{}{}\"",
        public_path.trim_end_matches('/'),
        hash,
        extension
    )
    .into_bytes()
}

/// Replace every occurrence of `needle` (non-empty) in `haystack`.
fn replace_all(haystack: &[u8], needle: &[u8], replacement: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(haystack.len());
    let mut rest = haystack;
    while let Some(pos) = rest.windows(needle.len()).position(|w| w == needle) {
        out.extend_from_slice(&rest[..pos]);
        out.extend_from_slice(replacement);
        rest = &rest[pos + needle.len()..];
    }
    out.extend_from_slice(rest);
    out
}

/// Rewrite avatar URLs in `data`, resolving each hash through `store`.
///
/// Returns the new contents and the number of matches, or `None` when there was
/// nothing to rewrite. Each match replaces every verbatim copy of itself, so
/// identical URLs elsewhere in the buffer are rewritten along with it.
pub async fn rewrite_bytes<S: AvatarStore>(
    data: &[u8],
    store: &mut S,
    public_path: &str,
) -> Result<Option<(Vec<u8>, usize)>> {
    let matches: Vec<(Vec<u8>, String)> = AVATAR_URL
        .captures_iter(data)
        .map(|caps| {
            (
                caps[0].to_vec(),
                String::from_utf8_lossy(&caps[1]).into_owned(),
            )
        })
        .collect();

    if matches.is_empty() {
        return Ok(None);
    }

    let mut out = data.to_vec();
    for (quoted, hash) in &matches {
        let extension = store.resolve(hash).await?;
        out = replace_all(&out, quoted, &local_reference(public_path, hash, extension));
    }

    Ok(Some((out, matches.len())))
}

/// Rewrite the avatar URLs in the file at `path`, writing it back only if
/// something matched.
#[instrument(level = "debug", skip(store, public_path), fields(path = %path.display()))]
pub async fn rewrite_file<S: AvatarStore>(
    path: &Path,
    store: &mut S,
    public_path: &str,
) -> Result<Rewrite> {
    let io_err = |source| Error::FileIo {
        path: path.to_path_buf(),
        source,
    };

    let data = tokio::fs::read(path).await.map_err(io_err)?;

    let Some((rewritten, urls)) = rewrite_bytes(&data, store, public_path).await? else {
        debug!("No avatar URLs found");
        return Ok(Rewrite::Unchanged);
    };

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o644);

    let mut file = options.open(path).await.map_err(io_err)?;
    file.write_all(&rewritten).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)?;

    info!(path = %path.display(), urls, "Rewrote avatar URLs");
    Ok(Rewrite::Rewritten { urls })
}
