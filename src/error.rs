use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read directory {}: {source}", .path.display())]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: jwalk::Error,
    },

    #[error("Failed to download {url}: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Expected to read {expected} header bytes from {url} but got {got}")]
    ShortRead {
        url: String,
        expected: usize,
        got: usize,
    },

    /// Writing a downloaded avatar (or its output directory) failed
    #[error("Failed to save {}: {source}", .path.display())]
    Save {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing one HTML file failed
    #[error("IO error on {}: {source}", .path.display())]
    FileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A matched hash that isn't usable as a file name under the output directory
    #[error("Refusing avatar hash {hash:?}: not a plain file name")]
    InvalidHash { hash: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl Error {
    /// Whether this error should stop the run.
    ///
    /// Only per-file IO problems are survivable; anything touching the walk or
    /// the avatar downloads leaves the output in a state that isn't worth
    /// continuing from.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::FileIo { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
