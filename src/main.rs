mod cache;
mod config;
mod downloader;
mod error;
mod migrate;
mod rewriter;
#[cfg(test)]
mod testing;
mod walker;

#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();
    color_eyre::install()?;

    let config = config::config();
    tracing::info!(
        "Localizing avatars from '{}' into '{}'",
        config.work_dir.display(),
        config.out_dir.display()
    );

    migrate::run(&config).await?;

    Ok(())
}
