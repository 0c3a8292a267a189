use std::collections::HashMap;

use tracing::instrument;

use crate::chat::transcript::Transcript;
use crate::store::models::{EmoteUsage, UserOccurrence};

/// Counts per-user occurrences of each target emote within one chat log.
///
/// A comment whose body contains an emote name anywhere (literal,
/// case-sensitive substring) counts as one occurrence for its author, no
/// matter how many times the emote repeats inside that body. Repeated
/// matching comments by the same user accumulate into a single
/// [`UserOccurrence`]. Output entries follow `emote_names` order, one per
/// target even when nobody used it.
///
/// An emote name that happens to sit inside a longer emote or ordinary text
/// still matches; that imprecision is deliberate.
#[instrument(skip_all, fields(video_id = transcript.video.id, comments = transcript.comments.len()))]
pub fn scan(transcript: &Transcript, emote_names: &[String]) -> Vec<EmoteUsage> {
    let mut usages = Vec::with_capacity(emote_names.len());

    for name in emote_names {
        tracing::info!(emote = %name, video_id = transcript.video.id, "searching for emote in vod");

        // first-seen order, so repeated scans of the same log are stable
        let mut users: Vec<UserOccurrence> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for comment in &transcript.comments {
            if !comment.message.body.contains(name.as_str()) {
                continue;
            }

            let commenter = comment.commenter.display_name.as_str();
            match index.get(commenter) {
                Some(&at) => users[at].count += 1,
                None => {
                    index.insert(commenter, users.len());
                    users.push(UserOccurrence {
                        display_name: commenter.to_string(),
                        count: 1,
                    });
                }
            }
        }

        tracing::debug!(emote = %name, users = users.len(), "emote scan complete");
        usages.push(EmoteUsage {
            name: name.clone(),
            users,
        });
    }

    usages
}
