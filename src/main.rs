use clap::Parser;
use thiserror::Error;

use crate::chat::downloader::ChatDownloader;
use crate::pipeline::RunError;
use crate::util::config::{ChannelConfig, ConfigError};
use crate::util::env::{EnvErr, Settings};
use crate::util::helix::{Helix, HelixErr};

mod args;
mod chat;
mod pipeline;
mod store;
mod util;

#[derive(Debug, Error)]
enum RunnerErr {
    #[error(transparent)]
    Env(#[from] EnvErr),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Helix(#[from] HelixErr),

    #[error(transparent)]
    Run(#[from] RunError),
}

type Result<T> = core::result::Result<T, RunnerErr>;

#[tokio::main]
async fn main() -> Result<()> {
    util::tracing::init();

    let cli = args::Cli::parse();
    let settings = Settings::resolve(&cli)?;

    tracing::info!(
        config = %settings.config_path.display(),
        state = %settings.state_path.display(),
        "starting archive run"
    );

    let config = ChannelConfig::load(&settings.config_path)?;
    let helix = Helix::new(&settings)?;
    let downloader = ChatDownloader::new(&settings.downloader_path);

    let report = pipeline::run(&settings, &config, &helix, &downloader).await?;

    tracing::info!(
        discovered = report.discovered,
        new = report.new_records,
        archived = report.inserted,
        failed = report.failed.len(),
        rollups_regenerated = report.rollups_written,
        "run complete"
    );

    if !report.failed.is_empty() {
        tracing::warn!(vod_ids = ?report.failed, "unfetchable vods will be retried next run");
    }

    Ok(())
}
