use tracing::instrument;

use crate::store::models::{EmoteState, VideoRecord};

/// Returns the vods not yet present in the archive, preserving listing order.
///
/// Membership is decided by id alone; title or timestamp drift on an
/// already-archived vod is never reconciled.
#[instrument(skip_all, fields(available = available.len(), archived = state.data.len()))]
pub fn unrecorded(available: &[VideoRecord], state: &EmoteState) -> Vec<VideoRecord> {
    let fresh: Vec<VideoRecord> = available
        .iter()
        .filter(|vod| {
            let seen = state.contains(&vod.id);
            if seen {
                tracing::debug!(video_id = vod.id, "vod already archived");
            }

            !seen
        })
        .cloned()
        .collect();

    tracing::info!(fresh = fresh.len(), "filtered vod listing against archive");
    fresh
}
