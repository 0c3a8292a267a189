use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::instrument;

use crate::chat::downloader::DownloadResult;
use crate::chat::transcript::Transcript;
use crate::store::models::{EmoteState, VideoEmoteRecord, VideoRecord};
use crate::store::{self, StoreError};
use crate::util::config::ChannelConfig;
use crate::util::env::Settings;
use crate::util::helix::{HelixErr, HelixResult};

pub mod filter;
pub mod rollup;
pub mod scanner;

pub type RunResult<T> = core::result::Result<T, RunError>;

pub const DAILY_ROLLUP_FILE: &str = "daily-rollup.json";
pub const USER_ROLLUP_FILE: &str = "user-rollup.json";

/// Video-listing seam; implemented by the Helix client, faked in tests
#[async_trait]
pub trait VideoSource: Send + Sync {
    async fn fetch_videos(&self, login: &str) -> HelixResult<Vec<VideoRecord>>;
}

/// Transcript-fetch seam; implemented by the chat downloader, faked in tests
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn fetch(&self, video_id: &str) -> DownloadResult<Transcript>;
}

/// What a single run did, for operator-facing reporting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Vods the listing collaborator returned
    pub discovered: usize,

    /// Vods not yet present in the archive
    pub new_records: usize,

    /// Vods actually scanned and inserted this run
    pub inserted: usize,

    /// Vods whose transcript fetch failed; retried on the next run
    pub failed: Vec<String>,

    pub rollups_written: bool,
}

/// Drives one full archive pass: load state, list vods, scan whatever is
/// new, persist state and rollups iff anything was inserted.
///
/// A vod whose transcript cannot be fetched is skipped and reported, never
/// fatal; every other failure aborts the run with the persisted state left
/// exactly as last written.
#[instrument(skip_all, fields(channel = config.channel_name))]
pub async fn run(
    settings: &Settings,
    config: &ChannelConfig,
    videos: &dyn VideoSource,
    transcripts: &dyn TranscriptSource,
) -> RunResult<RunReport> {
    let mut state = load_state(&settings.state_path).await?;

    let available = videos.fetch_videos(&config.channel_name).await?;
    let fresh = filter::unrecorded(&available, &state);

    let mut report = RunReport {
        discovered: available.len(),
        new_records: fresh.len(),
        ..RunReport::default()
    };

    for vod in fresh {
        let transcript = match transcripts.fetch(&vod.id).await {
            Ok(t) => t,
            // skipped for this run; the id stays out of the state so the
            // next run picks it up again
            Err(e) => {
                tracing::warn!(video_id = vod.id, error = %e, "transcript fetch failed, skipping vod");
                report.failed.push(vod.id);
                continue;
            }
        };

        tracing::info!(video_id = vod.id, title = vod.title, "archiving new vod");
        let emotes = scanner::scan(&transcript, &config.emotes);

        let id = vod.id.clone();
        state.insert(id, VideoEmoteRecord { info: vod, emotes });
        report.inserted += 1;
    }

    // whether anything gets written is derived from the insert count alone
    if report.inserted == 0 {
        tracing::info!("no new vods, carry on :)");
        return Ok(report);
    }

    persist(settings, config, &state).await?;
    report.rollups_written = true;

    Ok(report)
}

#[instrument(skip_all, fields(path = %path.display()))]
async fn load_state(path: &Path) -> RunResult<EmoteState> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let state = store::load(&text)?;
            tracing::debug!(records = state.data.len(), "loaded persisted state");
            Ok(state)
        }

        // a first run has no state yet
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!("no persisted state, starting empty");
            Ok(EmoteState::default())
        }

        Err(e) => Err(RunError::Io(e)),
    }
}

#[instrument(skip_all)]
async fn persist(
    settings: &Settings,
    config: &ChannelConfig,
    state: &EmoteState,
) -> RunResult<()> {
    // checked before anything is written so the state file and the rollup
    // artifacts always move in lockstep
    if !settings.rollup_dir.is_dir() {
        return Err(RunError::SourceNotFound(settings.rollup_dir.clone()));
    }

    tokio::fs::write(&settings.state_path, store::serialize(state)?).await?;

    let (daily, users) = rollup::aggregate(state, config.utc_offset);
    tokio::fs::write(settings.rollup_dir.join(DAILY_ROLLUP_FILE), to_pretty(&daily)?).await?;
    tokio::fs::write(settings.rollup_dir.join(USER_ROLLUP_FILE), to_pretty(&users)?).await?;

    tracing::info!(
        records = state.data.len(),
        state = %settings.state_path.display(),
        rollups = %settings.rollup_dir.display(),
        "state and rollups written"
    );

    Ok(())
}

fn to_pretty<T: serde::Serialize>(value: &T) -> RunResult<String> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');

    Ok(text)
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("missing source: {0}")]
    SourceNotFound(PathBuf),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("video listing failed: {0}")]
    Listing(#[from] HelixErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use chrono::{Offset, Utc};

    use super::*;
    use crate::chat::downloader::DownloadError;
    use crate::chat::transcript::{Comment, Commenter, Message, TranscriptVideo};

    struct FakeVideos(Vec<VideoRecord>);

    #[async_trait]
    impl VideoSource for FakeVideos {
        async fn fetch_videos(&self, _login: &str) -> HelixResult<Vec<VideoRecord>> {
            Ok(self.0.clone())
        }
    }

    /// Serves transcripts by vod id; ids without one fail like a downloader
    /// that exited abnormally
    struct FakeChat(HashMap<String, Transcript>);

    #[async_trait]
    impl TranscriptSource for FakeChat {
        async fn fetch(&self, video_id: &str) -> DownloadResult<Transcript> {
            self.0.get(video_id).cloned().ok_or_else(|| {
                DownloadError::DownloaderExit {
                    video_id: video_id.to_string(),
                    code: Some(1),
                }
            })
        }
    }

    fn vod(id: &str, created: &str) -> VideoRecord {
        VideoRecord {
            id: id.to_string(),
            title: format!("vod {id}"),
            created: created.parse().unwrap(),
            published: created.parse().unwrap(),
        }
    }

    fn transcript(id: &str, comments: &[(&str, &str)]) -> Transcript {
        Transcript {
            video: TranscriptVideo { id: id.to_string() },
            comments: comments
                .iter()
                .map(|(user, body)| Comment {
                    commenter: Commenter {
                        display_name: user.to_string(),
                    },
                    message: Message {
                        body: body.to_string(),
                    },
                })
                .collect(),
        }
    }

    fn test_settings(dir: &Path) -> Settings {
        Settings {
            client_id: "test-client".to_string(),
            app_token: "test-token".to_string(),
            downloader_path: PathBuf::from("/nonexistent"),
            state_path: dir.join("emote-stats.json"),
            rollup_dir: dir.to_path_buf(),
            config_path: dir.join("config.json"),
        }
    }

    fn test_config(emotes: &[&str]) -> ChannelConfig {
        ChannelConfig {
            channel_name: "plss".to_string(),
            emotes: emotes.iter().map(|e| e.to_string()).collect(),
            utc_offset: Utc.fix(),
        }
    }

    fn chat_for(vods: &[(&str, &[(&str, &str)])]) -> FakeChat {
        FakeChat(
            vods.iter()
                .map(|(id, comments)| (id.to_string(), transcript(id, comments)))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_first_run_archives_everything() {
        let scratch = tempfile::tempdir().unwrap();
        let settings = test_settings(scratch.path());
        let config = test_config(&["Pog"]);

        let videos = FakeVideos(vec![
            vod("v1", "2024-03-01T18:00:00Z"),
            vod("v2", "2024-03-02T18:00:00Z"),
        ]);
        let chat = chat_for(&[
            ("v1", &[("A", "hi Pog"), ("B", "Pog Pog")]),
            ("v2", &[("A", "Pog")]),
        ]);

        let report = run(&settings, &config, &videos, &chat).await.unwrap();
        assert_eq!(report.discovered, 2);
        assert_eq!(report.new_records, 2);
        assert_eq!(report.inserted, 2);
        assert!(report.failed.is_empty());
        assert!(report.rollups_written);

        let state = store::load(&std::fs::read_to_string(&settings.state_path).unwrap()).unwrap();
        assert_eq!(state.data.len(), 2);
        assert_eq!(state.data["v1"].emotes[0].users.len(), 2);

        assert!(settings.rollup_dir.join(DAILY_ROLLUP_FILE).is_file());
        assert!(settings.rollup_dir.join(USER_ROLLUP_FILE).is_file());
    }

    #[tokio::test]
    async fn test_rerun_with_no_new_vods_changes_nothing() {
        let scratch = tempfile::tempdir().unwrap();
        let settings = test_settings(scratch.path());
        let config = test_config(&["Pog"]);

        let videos = FakeVideos(vec![vod("v1", "2024-03-01T18:00:00Z")]);
        let chat = chat_for(&[("v1", &[("A", "Pog")])]);

        run(&settings, &config, &videos, &chat).await.unwrap();
        let state_before = std::fs::read(&settings.state_path).unwrap();
        let daily_before = std::fs::read(settings.rollup_dir.join(DAILY_ROLLUP_FILE)).unwrap();
        let users_before = std::fs::read(settings.rollup_dir.join(USER_ROLLUP_FILE)).unwrap();

        let report = run(&settings, &config, &videos, &chat).await.unwrap();
        assert_eq!(report.new_records, 0);
        assert_eq!(report.inserted, 0);
        assert!(!report.rollups_written);

        assert_eq!(state_before, std::fs::read(&settings.state_path).unwrap());
        assert_eq!(
            daily_before,
            std::fs::read(settings.rollup_dir.join(DAILY_ROLLUP_FILE)).unwrap()
        );
        assert_eq!(
            users_before,
            std::fs::read(settings.rollup_dir.join(USER_ROLLUP_FILE)).unwrap()
        );
    }

    #[tokio::test]
    async fn test_only_unseen_vods_are_scanned() {
        let scratch = tempfile::tempdir().unwrap();
        let settings = test_settings(scratch.path());
        let config = test_config(&["Pog"]);

        let chat_v1 = chat_for(&[("v1", &[("A", "Pog")])]);
        let videos_v1 = FakeVideos(vec![vod("v1", "2024-03-01T18:00:00Z")]);
        run(&settings, &config, &videos_v1, &chat_v1).await.unwrap();

        // second run lists v1 and v2, but only serves a transcript for v2;
        // v1 must not be refetched
        let chat_v2 = chat_for(&[("v2", &[("B", "Pog")])]);
        let videos_both = FakeVideos(vec![
            vod("v1", "2024-03-01T18:00:00Z"),
            vod("v2", "2024-03-02T18:00:00Z"),
        ]);

        let report = run(&settings, &config, &videos_both, &chat_v2).await.unwrap();
        assert_eq!(report.new_records, 1);
        assert_eq!(report.inserted, 1);
        assert!(report.failed.is_empty());

        let state = store::load(&std::fs::read_to_string(&settings.state_path).unwrap()).unwrap();
        assert_eq!(state.data.len(), 2);
        assert_eq!(state.data["v1"].emotes[0].users[0].display_name, "A");
        assert_eq!(state.data["v2"].emotes[0].users[0].display_name, "B");
    }

    #[tokio::test]
    async fn test_failed_fetch_is_isolated_and_retried() {
        let scratch = tempfile::tempdir().unwrap();
        let settings = test_settings(scratch.path());
        let config = test_config(&["Pog"]);

        let videos = FakeVideos(vec![
            vod("v1", "2024-03-01T18:00:00Z"),
            vod("v2", "2024-03-02T18:00:00Z"),
        ]);

        // v2's download fails; v1 must still be persisted
        let chat = chat_for(&[("v1", &[("A", "Pog")])]);
        let report = run(&settings, &config, &videos, &chat).await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed, vec!["v2".to_string()]);
        assert!(report.rollups_written);

        let state = store::load(&std::fs::read_to_string(&settings.state_path).unwrap()).unwrap();
        assert!(state.contains("v1"));
        assert!(!state.contains("v2"));

        // next run: v2's transcript is available and gets picked up
        let chat = chat_for(&[("v2", &[("B", "Pog")])]);
        let report = run(&settings, &config, &videos, &chat).await.unwrap();
        assert_eq!(report.inserted, 1);
        assert!(report.failed.is_empty());

        let state = store::load(&std::fs::read_to_string(&settings.state_path).unwrap()).unwrap();
        assert!(state.contains("v2"));
    }

    #[tokio::test]
    async fn test_all_fetches_failing_writes_nothing() {
        let scratch = tempfile::tempdir().unwrap();
        let settings = test_settings(scratch.path());
        let config = test_config(&["Pog"]);

        let videos = FakeVideos(vec![vod("v1", "2024-03-01T18:00:00Z")]);
        let chat = chat_for(&[]);

        let report = run(&settings, &config, &videos, &chat).await.unwrap();
        assert_eq!(report.inserted, 0);
        assert_eq!(report.failed, vec!["v1".to_string()]);
        assert!(!report.rollups_written);
        assert!(!settings.state_path.exists());
    }

    #[tokio::test]
    async fn test_missing_rollup_dir_aborts_without_writing_state() {
        let scratch = tempfile::tempdir().unwrap();
        let mut settings = test_settings(scratch.path());
        settings.rollup_dir = scratch.path().join("does-not-exist");
        let config = test_config(&["Pog"]);

        let videos = FakeVideos(vec![vod("v1", "2024-03-01T18:00:00Z")]);
        let chat = chat_for(&[("v1", &[("A", "Pog")])]);

        match run(&settings, &config, &videos, &chat).await {
            Err(RunError::SourceNotFound(path)) => assert_eq!(path, settings.rollup_dir),
            other => panic!("expected SourceNotFound, got {other:?}"),
        }

        assert!(!settings.state_path.exists());
    }

    #[tokio::test]
    async fn test_corrupt_state_aborts_before_processing() {
        let scratch = tempfile::tempdir().unwrap();
        let settings = test_settings(scratch.path());
        let config = test_config(&["Pog"]);

        std::fs::write(&settings.state_path, r#"{ "data": 42 }"#).unwrap();

        let videos = FakeVideos(vec![vod("v1", "2024-03-01T18:00:00Z")]);
        let chat = chat_for(&[("v1", &[("A", "Pog")])]);

        assert!(matches!(
            run(&settings, &config, &videos, &chat).await,
            Err(RunError::Store(StoreError::Validation { .. }))
        ));
    }

    #[tokio::test]
    async fn test_rollup_artifacts_reflect_archive() {
        let scratch = tempfile::tempdir().unwrap();
        let settings = test_settings(scratch.path());
        let config = test_config(&["Kappa"]);

        // two same-day vods, totals 3 and 5
        let videos = FakeVideos(vec![
            vod("v1", "2024-03-01T10:00:00Z"),
            vod("v2", "2024-03-01T20:00:00Z"),
        ]);
        let chat = chat_for(&[
            ("v1", &[("A", "Kappa"), ("A", "Kappa"), ("B", "Kappa")]),
            ("v2", &[("B", "Kappa x"), ("B", "y Kappa"), ("B", "Kappa"), ("C", "Kappa"), ("C", "Kappa!")]),
        ]);

        run(&settings, &config, &videos, &chat).await.unwrap();

        let daily: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(settings.rollup_dir.join(DAILY_ROLLUP_FILE)).unwrap(),
        )
        .unwrap();
        assert_eq!(daily["Kappa"][0]["day"], "2024-03-01");
        assert_eq!(daily["Kappa"][0]["total"], 8);

        let users: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(settings.rollup_dir.join(USER_ROLLUP_FILE)).unwrap(),
        )
        .unwrap();

        // B: 1 + 3 = 4, A: 2, C: 2 (A archived before C)
        assert_eq!(users["Kappa"][0]["display_name"], "B");
        assert_eq!(users["Kappa"][0]["total"], 4);
        assert_eq!(users["Kappa"][1]["display_name"], "A");
        assert_eq!(users["Kappa"][2]["display_name"], "C");
    }
}
