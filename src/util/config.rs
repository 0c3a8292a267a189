use std::path::{Path, PathBuf};

use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::instrument;

pub type ConfigResult<T> = core::result::Result<T, ConfigError>;

/// Per-channel tracking configuration, loaded from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Broadcaster login whose vod archive is tracked
    pub channel_name: String,

    /// Emote names to count, scanned in this order
    pub emotes: Vec<String>,

    /// Channel-local UTC offset used to bucket vods into calendar days,
    /// e.g. `"-05:00"`; defaults to UTC when absent
    #[serde(default = "utc_offset", deserialize_with = "offset_from_str")]
    pub utc_offset: FixedOffset,
}

impl ChannelConfig {
    /// Unlike the persisted state, a missing config file is fatal: without a
    /// channel and emote list there is nothing to run against.
    #[instrument]
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Io(e),
        })?;

        let config: Self = serde_json::from_str(&text)?;
        tracing::info!(
            channel = config.channel_name,
            emotes = config.emotes.len(),
            offset = %config.utc_offset,
            "channel config loaded"
        );

        Ok(config)
    }
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

fn offset_from_str<'de, D>(de: D) -> Result<FixedOffset, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(de)?;
    raw.parse::<FixedOffset>().map_err(serde::de::Error::custom)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("channel config not found: {0}")]
    NotFound(PathBuf),

    #[error(transparent)]
    Io(std::io::Error),

    #[error("invalid channel config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let raw = r#"{
            "channel_name": "plss",
            "emotes": ["Pog", "Kappa"],
            "utc_offset": "-05:00"
        }"#;

        let config: ChannelConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.channel_name, "plss");
        assert_eq!(config.emotes, vec!["Pog", "Kappa"]);
        assert_eq!(config.utc_offset, FixedOffset::west_opt(5 * 3600).unwrap());
    }

    #[test]
    fn test_offset_defaults_to_utc() {
        let raw = r#"{ "channel_name": "plss", "emotes": [] }"#;
        let config: ChannelConfig = serde_json::from_str(raw).unwrap();

        assert_eq!(config.utc_offset.local_minus_utc(), 0);
    }

    #[test]
    fn test_bad_offset_is_rejected() {
        let raw = r#"{ "channel_name": "plss", "emotes": [], "utc_offset": "half past nine" }"#;
        assert!(serde_json::from_str::<ChannelConfig>(raw).is_err());
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let scratch = tempfile::tempdir().unwrap();
        let missing = scratch.path().join("config.json");

        match ChannelConfig::load(&missing) {
            Err(ConfigError::NotFound(path)) => assert_eq!(path, missing),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_load_from_disk() {
        let scratch = tempfile::tempdir().unwrap();
        let path = scratch.path().join("config.json");
        std::fs::write(&path, r#"{ "channel_name": "plss", "emotes": ["Pog"] }"#).unwrap();

        let config = ChannelConfig::load(&path).unwrap();
        assert_eq!(config.emotes, vec!["Pog"]);
    }
}
