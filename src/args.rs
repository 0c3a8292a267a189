use std::path::PathBuf;

use clap::Parser;

/// Incremental emote-usage archiver for a channel's vod history
#[derive(Parser, Debug)]
pub struct Cli {
    /// Channel config JSON (channel name, tracked emotes, UTC offset)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Persisted emote state JSON
    #[arg(short, long)]
    pub state: Option<PathBuf>,

    /// Directory receiving the rollup artifacts
    #[arg(short, long)]
    pub out_dir: Option<PathBuf>,

    /// Path to the TwitchDownloaderCLI binary
    #[arg(short, long)]
    pub downloader: Option<PathBuf>,
}
