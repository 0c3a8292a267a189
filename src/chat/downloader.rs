use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::instrument;

use super::transcript::Transcript;
use crate::pipeline::TranscriptSource;

pub type DownloadResult<T> = core::result::Result<T, DownloadError>;

/// Wrapper around the external TwitchDownloaderCLI binary.
///
/// Each fetch runs `chatdownload` into a scratch directory that is removed
/// again once the log has been parsed; nothing the downloader produces is
/// kept on disk.
#[derive(Debug, Clone)]
pub struct ChatDownloader {
    binary: PathBuf,
}

impl ChatDownloader {
    pub fn new(binary: &Path) -> Self {
        Self {
            binary: binary.to_path_buf(),
        }
    }

    #[instrument(skip(self), fields(binary = %self.binary.display()))]
    pub async fn fetch(&self, video_id: &str) -> DownloadResult<Transcript> {
        let scratch = tempfile::tempdir()?;
        let out_path = scratch.path().join(format!("chat_logs_{video_id}.json"));

        // third-party emote providers are disabled: only the raw message
        // bodies matter for scanning, and skipping them keeps downloads fast
        let status = Command::new(&self.binary)
            .arg("chatdownload")
            .args(["--collision", "Overwrite"])
            .args(["--id", video_id])
            .args(["--chat-connections", "6"])
            .args(["--bttv", "false", "--ffz", "false", "--stv", "false"])
            .arg("-o")
            .arg(&out_path)
            .stdout(Stdio::null())
            .status()
            .await?;

        if !status.success() {
            return Err(DownloadError::DownloaderExit {
                video_id: video_id.to_string(),
                code: status.code(),
            });
        }

        let raw = tokio::fs::read_to_string(&out_path).await?;
        let transcript: Transcript = serde_json::from_str(&raw)?;

        tracing::debug!(
            video_id,
            comments = transcript.comments.len(),
            "chat log downloaded"
        );

        Ok(transcript)
    }
}

#[async_trait]
impl TranscriptSource for ChatDownloader {
    async fn fetch(&self, video_id: &str) -> DownloadResult<Transcript> {
        ChatDownloader::fetch(self, video_id).await
    }
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("failed to run chat downloader: {0}")]
    Io(#[from] std::io::Error),

    #[error("chat downloader exited abnormally for vod {video_id} (code {code:?})")]
    DownloaderExit {
        video_id: String,
        code: Option<i32>,
    },

    #[error("unparseable chat log: {0}")]
    Parse(#[from] serde_json::Error),
}
