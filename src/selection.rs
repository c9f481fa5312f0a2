//! Episode selection
//!
//! A pure filter over the sorted episode sequence, driven by the job's
//! download mode. Range bounds compare by sort key with the same comparator
//! the listing is sorted with, so a bound does not have to name an episode
//! that actually exists.

use crate::config::{DownloadMode, JobOptions};
use crate::types::{Episode, EpisodeKey};

/// Select the episodes a job will download, preserving listing order
///
/// - [`DownloadMode::Single`] keeps episodes whose display id equals the
///   configured value.
/// - [`DownloadMode::Range`] keeps episodes whose sort key lies within the
///   inclusive `[start, end]` window.
/// - [`DownloadMode::All`] passes the sequence through unchanged.
///
/// An empty result is a job-level failure, raised by the orchestrator
/// rather than here.
#[must_use]
pub fn select_episodes(episodes: &[Episode], options: &JobOptions) -> Vec<Episode> {
    match options.mode {
        DownloadMode::Single => episodes
            .iter()
            .filter(|ep| ep.display_id == options.episode)
            .cloned()
            .collect(),
        DownloadMode::Range => {
            let start = EpisodeKey::parse(&options.start_episode);
            let end = EpisodeKey::parse(&options.end_episode);
            episodes
                .iter()
                .filter(|ep| start <= ep.sort_key && ep.sort_key <= end)
                .cloned()
                .collect()
        }
        DownloadMode::All => episodes.to_vec(),
    }
}
