use std::path::PathBuf;

use thiserror::Error;

use crate::args::Cli;

pub type EnvResult<T> = core::result::Result<T, EnvErr>;

/// Fully resolved run settings: `.env`/process environment values with CLI
/// overrides applied, threaded explicitly into each component at
/// construction.
#[derive(Debug, Clone)]
pub struct Settings {
    pub client_id: String,
    pub app_token: String,
    pub downloader_path: PathBuf,
    pub state_path: PathBuf,
    pub rollup_dir: PathBuf,
    pub config_path: PathBuf,
}

impl Settings {
    pub fn resolve(cli: &Cli) -> EnvResult<Self> {
        // a missing .env file is fine, the process environment may already
        // carry everything
        _ = dotenvy::dotenv();

        Ok(Self {
            client_id: required("TWITCH_API_CLIENT_ID")?,
            app_token: required("TWITCH_API_APP_TOKEN")?,
            downloader_path: cli
                .downloader
                .clone()
                .unwrap_or_else(|| optional("TWITCH_DOWNLOADER_PATH", "./TwitchDownloaderCLI").into()),
            state_path: cli
                .state
                .clone()
                .unwrap_or_else(|| optional("EMOTE_STATE_JSON", "emote-stats.json").into()),
            rollup_dir: cli
                .out_dir
                .clone()
                .unwrap_or_else(|| optional("EMOTE_ROLLUP_DIR", ".").into()),
            config_path: cli
                .config
                .clone()
                .unwrap_or_else(|| optional("EMOTE_CONFIG", "config.json").into()),
        })
    }
}

fn required(key: &'static str) -> EnvResult<String> {
    std::env::var(key).map_err(|_| EnvErr::MissingValue(key))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[derive(Debug, Error)]
pub enum EnvErr {
    #[error("missing required environment variable: {0}")]
    MissingValue(&'static str),
}
