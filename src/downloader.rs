//! Avatar downloads
//!
//! Images are classified purely by their leading magic bytes; the
//! `Content-Type` header is never consulted.

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
};

use futures_util::StreamExt;
use reqwest::{
    Client,
    header::{self, HeaderMap, HeaderValue},
};
use tokio::{fs::File, io::AsyncWriteExt};
use tracing::{debug, instrument, warn};

use crate::error::{Error, Result};

/// Number of leading body bytes used to classify an image
pub const HEADER_LEN: usize = 3;

const JPEG_MAGIC: [u8; HEADER_LEN] = [0xFF, 0xD8, 0xFF];
const PNG_MAGIC: [u8; HEADER_LEN] = [0x89, 0x50, 0x4E];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    /// Saved without an extension
    Unknown,
}

impl ImageKind {
    pub fn sniff(header: &[u8]) -> Self {
        match header.get(..HEADER_LEN) {
            Some(magic) if magic == JPEG_MAGIC => Self::Jpeg,
            Some(magic) if magic == PNG_MAGIC => Self::Png,
            _ => Self::Unknown,
        }
    }

    /// File extension including the leading dot, empty for unknown images
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => ".jpg",
            Self::Png => ".png",
            Self::Unknown => "",
        }
    }
}

/// Something that can store the image at `url` next to `base_path`.
pub trait ImageFetcher {
    async fn fetch(&self, url: &str, base_path: &Path) -> Result<ImageKind>;
}

/// Appends `extension` to the file name without replacing anything already there.
/// (`Path::with_extension` would eat the tail of a hash containing a dot.)
fn path_with_suffix(base: &Path, extension: &str) -> PathBuf {
    let mut path = OsString::from(base.as_os_str());
    path.push(extension);
    PathBuf::from(path)
}

pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("image/*, */*"));

        // No timeout: a stalled avatar host blocks the run, same as any other
        // one-shot tool talking to it.
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(Error::Client)?;

        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl ImageFetcher for Downloader {
    #[instrument(name = "download_avatar", level = "debug", skip(self, base_path), fields(url = %url))]
    async fn fetch(&self, url: &str, base_path: &Path) -> Result<ImageKind> {
        let download_err = |source| Error::Download {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(download_err)?;

        let mut stream = response.bytes_stream();

        // Chunks can be arbitrarily small, keep pulling until the header is in
        let mut head: Vec<u8> = Vec::with_capacity(HEADER_LEN);
        while head.len() < HEADER_LEN {
            match stream.next().await {
                Some(chunk) => head.extend_from_slice(&chunk.map_err(download_err)?),
                None => {
                    return Err(Error::ShortRead {
                        url: url.to_string(),
                        expected: HEADER_LEN,
                        got: head.len(),
                    });
                }
            }
        }

        let kind = ImageKind::sniff(&head);
        if kind == ImageKind::Unknown {
            warn!(url, header = ?&head[..HEADER_LEN], "Unrecognized image header, saving without extension");
        }

        let path = path_with_suffix(base_path, kind.extension());
        let save_err = |source| Error::Save {
            path: path.clone(),
            source,
        };

        let mut file = File::create(&path).await.map_err(save_err)?;
        // `head` may already hold more than the sniffed bytes
        file.write_all(&head).await.map_err(save_err)?;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(download_err)?;
            file.write_all(&chunk).await.map_err(save_err)?;
        }
        file.flush().await.map_err(save_err)?;

        debug!(path = %path.display(), ?kind, "Saved avatar");
        Ok(kind)
    }
}
