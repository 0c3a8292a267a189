use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One archived broadcast as listed by the video platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub id: String,
    pub title: String,
    pub created: DateTime<Utc>,
    pub published: DateTime<Utc>,
}

/// One chatter's occurrence count for a single emote within a single vod
///
/// `count` keeps the original `use_index` wire name so state files written by
/// earlier versions of the archiver keep loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserOccurrence {
    pub display_name: String,

    #[serde(rename = "use_index")]
    pub count: u64,
}

/// Every chatter who used one emote at least once within a single vod
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmoteUsage {
    pub name: String,
    pub users: Vec<UserOccurrence>,
}

/// A vod's listing info plus one [`EmoteUsage`] per tracked emote
///
/// Emotes nobody used are still present with an empty user list, so
/// downstream consumers always see the full tracked set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoEmoteRecord {
    pub info: VideoRecord,
    pub emotes: Vec<EmoteUsage>,
}

/// Persisted, append-only archive of per-vod emote usage
///
/// Keyed by vod id; entries are never mutated or removed once inserted. The
/// map is a `BTreeMap` so repeated serializations of the same contents are
/// byte-identical and diff cleanly under version control.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmoteState {
    pub data: BTreeMap<String, VideoEmoteRecord>,
}

impl EmoteState {
    pub fn contains(&self, video_id: &str) -> bool {
        self.data.contains_key(video_id)
    }

    /// Adds a freshly scanned vod record under its id.
    ///
    /// # Panics
    ///
    /// Panics if `video_id` is already archived. Callers must run the
    /// candidate list through the unrecorded-vod filter first; a duplicate
    /// reaching this point is a bug, not a runtime condition.
    pub fn insert(&mut self, video_id: String, record: VideoEmoteRecord) {
        assert!(
            !self.data.contains_key(&video_id),
            "duplicate vod id inserted into emote state: {video_id}"
        );

        self.data.insert(video_id, record);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(id: &str) -> VideoEmoteRecord {
        VideoEmoteRecord {
            info: VideoRecord {
                id: id.to_string(),
                title: format!("vod {id}"),
                created: "2024-03-01T18:00:00Z".parse().unwrap(),
                published: "2024-03-01T18:00:00Z".parse().unwrap(),
            },
            emotes: Vec::new(),
        }
    }

    #[test]
    fn test_insert_and_contains() {
        let mut state = EmoteState::default();
        assert!(!state.contains("v1"));

        state.insert("v1".to_string(), record("v1"));
        assert!(state.contains("v1"));
        assert_eq!(state.data.len(), 1);
    }

    #[test]
    #[should_panic(expected = "duplicate vod id")]
    fn test_duplicate_insert_panics() {
        let mut state = EmoteState::default();
        state.insert("v1".to_string(), record("v1"));
        state.insert("v1".to_string(), record("v1"));
    }
}
