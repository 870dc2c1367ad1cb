//! Drives one migration run over the work tree.

use tracing::{info, instrument, warn};

use crate::cache::GravatarCache;
use crate::config::Config;
use crate::downloader::{Downloader, ImageFetcher};
use crate::error::{Error, Result};
use crate::rewriter::{self, Rewrite};
use crate::walker;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// HTML files handed to the rewriter
    pub files_scanned: usize,
    pub files_rewritten: usize,
    pub urls_rewritten: usize,
    /// Files skipped because they couldn't be read or written
    pub failed_files: usize,
    /// Distinct avatars downloaded
    pub downloads: usize,
}

pub async fn run(config: &Config) -> Result<RunSummary> {
    run_with(config, Downloader::new()?).await
}

/// Run with a specific fetcher.
///
/// Directory, download and save errors abort the run. A file that can't be
/// read or written is logged and skipped.
#[instrument(skip_all, fields(work_dir = %config.work_dir.display(), out_dir = %config.out_dir.display()))]
pub async fn run_with<F: ImageFetcher>(config: &Config, fetcher: F) -> Result<RunSummary> {
    if !config.out_dir.exists() {
        info!("Output directory does not exist, creating...");
        tokio::fs::create_dir_all(&config.out_dir)
            .await
            .map_err(|source| Error::Save {
                path: config.out_dir.clone(),
                source,
            })?;
    }

    let mut cache = GravatarCache::new(fetcher, &config.avatar_url, &config.out_dir);
    let mut summary = RunSummary::default();

    for entry in walker::html_files(&config.work_dir) {
        let path = entry?;
        summary.files_scanned += 1;

        match rewriter::rewrite_file(&path, &mut cache, &config.public_path).await {
            Ok(Rewrite::Unchanged) => {}
            Ok(Rewrite::Rewritten { urls }) => {
                summary.files_rewritten += 1;
                summary.urls_rewritten += urls;
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Skipping file");
                summary.failed_files += 1;
            }
        }
    }

    summary.downloads = cache.downloads();
    info!(
        files_scanned = summary.files_scanned,
        files_rewritten = summary.files_rewritten,
        urls_rewritten = summary.urls_rewritten,
        failed_files = summary.failed_files,
        downloads = summary.downloads,
        "Migration complete"
    );

    Ok(summary)
}
