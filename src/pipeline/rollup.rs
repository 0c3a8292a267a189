use std::collections::{BTreeMap, HashMap};

use chrono::FixedOffset;
use serde::Serialize;
use tracing::instrument;

use crate::store::models::EmoteState;

/// One channel-local calendar day's total for an emote
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayTotal {
    pub day: String,
    pub total: u64,
}

/// One chatter's cumulative total for an emote across the whole archive
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserTotal {
    pub display_name: String,
    pub total: u64,
}

/// Emote name → daily series, ascending by day key
pub type DailyRollup = BTreeMap<String, Vec<DayTotal>>;

/// Emote name → per-user totals, descending by total
pub type UserRollup = BTreeMap<String, Vec<UserTotal>>;

/// Rebuilds both rollups from the full archive.
///
/// Always a complete recomputation; the archive is small enough that
/// re-walking every occurrence beats keeping incremental rollup deltas
/// correct across runs. Day keys are computed by shifting each vod's
/// creation instant into the channel-local offset before truncating, so a
/// late-night UTC vod lands on the channel's own calendar day.
///
/// The user series are stable-sorted, so equal totals keep their first-seen
/// order across rebuilds.
#[instrument(skip(state), fields(records = state.data.len()))]
pub fn aggregate(state: &EmoteState, offset: FixedOffset) -> (DailyRollup, UserRollup) {
    let mut daily: BTreeMap<String, BTreeMap<String, u64>> = BTreeMap::new();
    let mut users: UserRollup = BTreeMap::new();
    let mut user_index: HashMap<(String, String), usize> = HashMap::new();

    for record in state.data.values() {
        let day = record
            .info
            .created
            .with_timezone(&offset)
            .format("%Y-%m-%d")
            .to_string();

        for usage in &record.emotes {
            let vod_total: u64 = usage.users.iter().map(|u| u.count).sum();
            *daily
                .entry(usage.name.clone())
                .or_default()
                .entry(day.clone())
                .or_insert(0) += vod_total;

            let per_user = users.entry(usage.name.clone()).or_default();
            for occurrence in &usage.users {
                let key = (usage.name.clone(), occurrence.display_name.clone());
                match user_index.get(&key) {
                    Some(&at) => per_user[at].total += occurrence.count,
                    None => {
                        user_index.insert(key, per_user.len());
                        per_user.push(UserTotal {
                            display_name: occurrence.display_name.clone(),
                            total: occurrence.count,
                        });
                    }
                }
            }
        }
    }

    let daily: DailyRollup = daily
        .into_iter()
        .map(|(emote, days)| {
            // BTreeMap iteration is already ascending by day key
            let series = days
                .into_iter()
                .map(|(day, total)| DayTotal { day, total })
                .collect();

            (emote, series)
        })
        .collect();

    let users: UserRollup = users
        .into_iter()
        .map(|(emote, mut totals)| {
            totals.sort_by(|a, b| b.total.cmp(&a.total));
            (emote, totals)
        })
        .collect();

    tracing::debug!(emotes = daily.len(), "rollups rebuilt");
    (daily, users)
}
