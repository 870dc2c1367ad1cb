use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};

use crate::error::{Error, Result};

const HTML_SUFFIX: &str = ".html";

/// Every `*.html` file under `root`, at any depth, in a stable order.
///
/// The suffix match is case-sensitive. A directory that can't be listed
/// (including a missing `root`) shows up as an `Error::DirectoryRead` item.
pub fn html_files(root: &Path) -> impl Iterator<Item = Result<PathBuf>> + use<> {
    let root = root.to_path_buf();
    let walker = WalkDir::new(&root)
        .parallelism(Parallelism::Serial)
        .skip_hidden(false)
        .sort(true);

    walker.into_iter().filter_map(move |entry| match entry {
        Ok(entry) => {
            let is_html = !entry.file_type().is_dir()
                && entry.file_name().to_string_lossy().ends_with(HTML_SUFFIX);
            is_html.then(|| Ok(entry.path()))
        }
        Err(source) => Some(Err(Error::DirectoryRead {
            path: source.path().map(Path::to_path_buf).unwrap_or_else(|| root.clone()),
            source,
        })),
    })
}
