//! Core types for kai-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::JobOptions;

/// Sort-key sentinel for episode ids that do not start with a number.
/// Malformed ids must sort after every real episode number.
const MALFORMED_ID_SENTINEL: u64 = 1_000_000_000;

/// Width of the fractional field in an [`EpisodeKey`], in decimal digits.
/// "1.5" and "1.15" scale to 500_000_000 and 150_000_000 respectively, so
/// integer comparison matches decimal order.
const FRACTION_FIELD_WIDTH: usize = 9;

/// Number of log entries retained per job
const JOB_LOG_CAPACITY: usize = 100;

/// Number of log entries exposed in a [`JobSnapshot`]
const JOB_LOG_EXPOSED: usize = 20;

/// Unique identifier for a download job
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(transparent)]
pub struct JobId(pub i64);

impl JobId {
    /// Create a new JobId
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the inner i64 value
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl From<i64> for JobId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for JobId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Total-order sort key derived from an episode display id
///
/// The key is the pair (integer part, fractional part), compared
/// lexicographically. `"12.5"` becomes `(12, 0.5)`; ids that do not start
/// with a digit map to a large sentinel so they sort after all real ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EpisodeKey {
    /// Integer part of the display id (sentinel for malformed ids)
    pub major: u64,
    /// Fractional digits scaled to a fixed-width field
    pub minor: u32,
}

impl EpisodeKey {
    /// Parse an episode display id ("7", "12.5", "abc") into its sort key
    pub fn parse(display_id: &str) -> Self {
        let mut chars = display_id.char_indices().peekable();
        let mut int_end = 0;
        while let Some(&(i, c)) = chars.peek() {
            if c.is_ascii_digit() {
                int_end = i + c.len_utf8();
                chars.next();
            } else {
                break;
            }
        }

        if int_end == 0 {
            return Self {
                major: MALFORMED_ID_SENTINEL,
                minor: 0,
            };
        }

        let major: u64 = display_id[..int_end].parse().unwrap_or(MALFORMED_ID_SENTINEL);

        // Optional ".digits" suffix; anything else after the integer is ignored,
        // matching a leading-anchored numeric match on the id.
        let rest = &display_id[int_end..];
        let minor = match rest.strip_prefix('.') {
            Some(frac) => {
                let digits: String = frac.chars().take_while(|c| c.is_ascii_digit()).collect();
                if digits.is_empty() {
                    0
                } else {
                    let mut padded = digits;
                    padded.truncate(FRACTION_FIELD_WIDTH);
                    while padded.len() < FRACTION_FIELD_WIDTH {
                        padded.push('0');
                    }
                    padded.parse().unwrap_or(0)
                }
            }
            None => 0,
        };

        Self { major, minor }
    }

    /// Whether this key is the malformed-id sentinel
    pub fn is_malformed(&self) -> bool {
        self.major >= MALFORMED_ID_SENTINEL
    }
}

/// Language availability for an episode, from the site's `langs` flag
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LanguageAvailability {
    /// No language information advertised
    #[default]
    None,
    /// Subtitled only (flag 1)
    SubOnly,
    /// Dubbed and subtitled (flag 3)
    DubAndSub,
}

impl LanguageAvailability {
    /// Map the site's integer language flag to availability
    pub fn from_flag(flag: i64) -> Self {
        match flag {
            1 => LanguageAvailability::SubOnly,
            3 => LanguageAvailability::DubAndSub,
            _ => LanguageAvailability::None,
        }
    }

    /// Human-readable label used in episode listings
    pub fn label(&self) -> &'static str {
        match self {
            LanguageAvailability::None => "",
            LanguageAvailability::SubOnly => "Sub",
            LanguageAvailability::DubAndSub => "Dub & Sub",
        }
    }
}

/// A single episode parsed from the site's episode listing
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct Episode {
    /// Display id as shown on the site (may be fractional, e.g. "12.5")
    pub display_id: String,

    /// Total-order sort key derived from the display id
    #[schema(value_type = Object)]
    pub sort_key: EpisodeKey,

    /// Opaque per-episode token used to fetch the server listing
    pub access_token: String,

    /// Which audio/subtitle languages the site advertises
    pub languages: LanguageAvailability,
}

/// A streaming server option for an episode
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MediaServer {
    /// Server group type id ("sub", "softsub", "dub")
    pub type_id: String,

    /// Opaque server id used to resolve the playable media
    pub server_id: String,

    /// Display name shown on the site (e.g. "Server 1")
    pub display_name: String,
}

/// A subtitle track attached to resolved media
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SubtitleTrack {
    /// Direct URL of the subtitle file
    pub url: String,

    /// Language label as advertised by the media host (e.g. "English")
    pub language_label: String,
}

/// Fully resolved playable media for one (episode, server) pair
///
/// Never cached — the resolve chain is re-run on every download attempt
/// because the media host hands out short-lived URLs.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ResolvedMedia {
    /// Direct URL of the video stream or playlist
    pub media_url: String,

    /// Caption tracks, in the order the media host listed them
    pub subtitle_tracks: Vec<SubtitleTrack>,
}

/// Anime identity derived once per job from the source page
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AnimeIdentity {
    /// Site-internal numeric id (as a string)
    pub id: String,

    /// Title, already sanitized of filesystem-illegal characters
    pub title: String,
}

/// Job lifecycle status
///
/// Transitions are monotonic: `Initializing → FetchingInfo →
/// FetchingEpisodes → Downloading → Merging → Completed`, with `Failed`
/// reachable from any non-terminal state. `Completed` and `Failed` are
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job accepted, execution task not yet resolving
    Initializing,
    /// Resolving anime identity from the page URL
    FetchingInfo,
    /// Fetching and selecting episodes
    FetchingEpisodes,
    /// Downloading selected episodes
    Downloading,
    /// Merging completed episode files
    Merging,
    /// All work finished (merge failures do not demote this)
    Completed,
    /// Aborted by a whole-job failure
    Failed,
}

impl JobStatus {
    /// Position of this status in the monotonic transition order
    pub fn rank(&self) -> u8 {
        match self {
            JobStatus::Initializing => 0,
            JobStatus::FetchingInfo => 1,
            JobStatus::FetchingEpisodes => 2,
            JobStatus::Downloading => 3,
            JobStatus::Merging => 4,
            JobStatus::Completed => 5,
            JobStatus::Failed => 6,
        }
    }

    /// Whether this status permits no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Severity of a job log entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Informational progress message
    Info,
    /// Recoverable problem (episode skipped, subtitle missing, ...)
    Warn,
    /// Failure worth surfacing (may or may not abort the job)
    Error,
}

/// A single timestamped entry in a job's bounded log
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct LogEntry {
    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,

    /// Entry severity
    pub level: LogLevel,

    /// Log message
    pub message: String,
}

/// Bounded ring buffer of job log entries
///
/// Keeps the most recent [`JOB_LOG_CAPACITY`] entries; snapshots expose only
/// the most recent [`JOB_LOG_EXPOSED`].
#[derive(Clone, Debug, Default)]
pub struct JobLog {
    entries: std::collections::VecDeque<LogEntry>,
}

impl JobLog {
    /// Create an empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, evicting the oldest once capacity is reached
    pub fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.entries.len() == JOB_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
        });
    }

    /// Number of retained entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The most recent entries exposed to status-polling callers
    pub fn tail(&self) -> Vec<LogEntry> {
        let skip = self.entries.len().saturating_sub(JOB_LOG_EXPOSED);
        self.entries.iter().skip(skip).cloned().collect()
    }

    /// Iterate over all retained entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

/// Outcome of one episode within a job's download loop
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EpisodeOutcome {
    /// Episode display id
    pub episode_id: String,

    /// Whether the episode's final output file exists on disk
    pub success: bool,

    /// Failure description for unsuccessful episodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Mutable state of a download job
///
/// Owned exclusively by the job's execution task until it reaches a terminal
/// state; status-polling callers only ever see full [`JobSnapshot`] copies.
#[derive(Clone, Debug)]
pub struct DownloadJob {
    /// Unique job identifier
    pub id: JobId,

    /// The anime page URL this job was submitted with
    pub source_url: String,

    /// Immutable per-job options captured at submission time
    pub options: JobOptions,

    /// Current lifecycle status
    pub status: JobStatus,

    /// Whole-job progress percentage (0..=100)
    pub progress_percent: u8,

    /// Display id of the episode currently being processed
    pub current_episode: Option<String>,

    /// Number of episodes selected for this job (0 until selection runs)
    pub total_episodes: usize,

    /// Number of episodes downloaded successfully so far
    pub completed_episodes: usize,

    /// Bounded log of job activity
    pub log: JobLog,

    /// Triggering message when the job failed
    pub error: Option<String>,

    /// Resolved anime title (None until FetchingInfo completes)
    pub anime_title: Option<String>,

    /// Season number used for output naming
    pub season: Option<u32>,

    /// File names of successfully downloaded episodes, in download order.
    /// Entries are removed when merge consolidation deletes the file.
    pub downloaded_file_names: Vec<String>,

    /// File name of the merged output, when merging succeeded
    pub merged_file_name: Option<String>,

    /// When the job was submitted
    pub start_time: DateTime<Utc>,

    /// When the job reached a terminal state
    pub end_time: Option<DateTime<Utc>>,
}

impl DownloadJob {
    /// Create a new job in the `Initializing` state
    pub fn new(id: JobId, source_url: impl Into<String>, options: JobOptions) -> Self {
        Self {
            id,
            source_url: source_url.into(),
            options,
            status: JobStatus::Initializing,
            progress_percent: 0,
            current_episode: None,
            total_episodes: 0,
            completed_episodes: 0,
            log: JobLog::new(),
            error: None,
            anime_title: None,
            season: None,
            downloaded_file_names: Vec::new(),
            merged_file_name: None,
            start_time: Utc::now(),
            end_time: None,
        }
    }

    /// Append a log entry
    pub fn add_log(&mut self, level: LogLevel, message: impl Into<String>) {
        self.log.push(level, message);
    }

    /// Advance the state machine, appending a log entry for the transition
    ///
    /// Transitions are monotonic; a transition to an earlier (or the same)
    /// state is ignored and logged as a warning rather than applied.
    pub fn transition(&mut self, next: JobStatus) {
        if self.status.is_terminal() || next.rank() <= self.status.rank() {
            tracing::warn!(
                job_id = self.id.0,
                from = ?self.status,
                to = ?next,
                "ignoring non-monotonic job transition"
            );
            return;
        }
        self.status = next;
        self.add_log(LogLevel::Info, format!("status: {:?}", next));
        if next.is_terminal() {
            self.end_time = Some(Utc::now());
        }
    }

    /// Record one successfully downloaded episode and refresh progress
    pub fn record_completed_episode(&mut self, file_name: impl Into<String>) {
        self.completed_episodes += 1;
        self.downloaded_file_names.push(file_name.into());
        self.refresh_progress();
    }

    /// Recompute `progress_percent` from completed/total episodes
    pub fn refresh_progress(&mut self) {
        if self.total_episodes > 0 {
            self.progress_percent =
                ((100 * self.completed_episodes) / self.total_episodes).min(100) as u8;
        }
    }

    /// Produce an immutable full-copy snapshot for status-polling callers
    pub fn snapshot(&self) -> JobSnapshot {
        let elapsed = self
            .end_time
            .unwrap_or_else(Utc::now)
            .signed_duration_since(self.start_time)
            .num_seconds()
            .max(0);

        JobSnapshot {
            job_id: self.id,
            source_url: self.source_url.clone(),
            anime_title: self.anime_title.clone(),
            season: self.season,
            status: self.status,
            progress_percent: self.progress_percent,
            current_episode: self.current_episode.clone(),
            total_episodes: self.total_episodes,
            completed_episodes: self.completed_episodes,
            logs: self.log.tail(),
            error: self.error.clone(),
            downloaded_files: self.downloaded_file_names.clone(),
            merged_file: self.merged_file_name.clone(),
            elapsed_seconds: elapsed,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}

/// Serializable point-in-time view of a [`DownloadJob`]
///
/// Log entries are truncated to the most recent 20.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobSnapshot {
    /// Unique job identifier
    pub job_id: JobId,

    /// The anime page URL this job was submitted with
    pub source_url: String,

    /// Resolved anime title (None until resolution completes)
    pub anime_title: Option<String>,

    /// Season number used for output naming
    pub season: Option<u32>,

    /// Current lifecycle status
    pub status: JobStatus,

    /// Whole-job progress percentage (0..=100)
    pub progress_percent: u8,

    /// Display id of the episode currently being processed
    pub current_episode: Option<String>,

    /// Number of episodes selected for this job
    pub total_episodes: usize,

    /// Number of episodes downloaded successfully so far
    pub completed_episodes: usize,

    /// Most recent log entries (at most 20)
    pub logs: Vec<LogEntry>,

    /// Triggering message when the job failed
    pub error: Option<String>,

    /// File names of successfully downloaded episodes still on disk
    pub downloaded_files: Vec<String>,

    /// File name of the merged output, when merging succeeded
    pub merged_file: Option<String>,

    /// Seconds between submission and completion (or now, while running)
    pub elapsed_seconds: i64,

    /// When the job was submitted
    pub start_time: DateTime<Utc>,

    /// When the job reached a terminal state
    pub end_time: Option<DateTime<Utc>>,
}

/// Summary of one episode for the anime-info endpoint
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct EpisodeSummary {
    /// Episode display id
    pub id: String,

    /// Human-readable episode title ("Episode 7")
    pub title: String,

    /// Advertised language availability
    pub languages: LanguageAvailability,
}

/// Resolved anime information for the info endpoint
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct AnimeInfo {
    /// Site-internal numeric id
    pub anime_id: String,

    /// Sanitized title
    pub title: String,

    /// Season detected from the title
    pub season: u32,

    /// Total number of listed episodes
    pub total_episodes: usize,

    /// Episode summaries in sort order
    pub episodes: Vec<EpisodeSummary>,
}

/// One result row from a site search
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    /// Result title
    pub title: String,

    /// Absolute URL of the anime page
    pub url: String,

    /// Poster image URL (may be empty)
    pub image: String,

    /// Trailing URL path segment, usable as a loose identifier
    pub anime_id: String,
}

/// Event emitted during job lifecycle
///
/// Consumers subscribe via [`crate::KaiDownloader::subscribe`]; events are
/// also exposed over the API as server-sent events.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Job accepted into the registry
    JobQueued {
        /// Job ID
        id: JobId,
        /// Source page URL
        url: String,
    },

    /// Job advanced to a new lifecycle status
    StatusChanged {
        /// Job ID
        id: JobId,
        /// New status
        status: JobStatus,
    },

    /// An episode download began
    EpisodeStarted {
        /// Job ID
        id: JobId,
        /// Episode display id
        episode: String,
    },

    /// An episode finished downloading successfully
    EpisodeCompleted {
        /// Job ID
        id: JobId,
        /// Episode display id
        episode: String,
        /// Whole-job progress after this episode
        progress_percent: u8,
    },

    /// An episode failed permanently (retry budget exhausted or unresolvable)
    EpisodeFailed {
        /// Job ID
        id: JobId,
        /// Episode display id
        episode: String,
        /// Failure description
        error: String,
    },

    /// Merging of completed episode files began
    MergeStarted {
        /// Job ID
        id: JobId,
        /// Number of files being merged
        file_count: usize,
    },

    /// Merge finished successfully
    MergeComplete {
        /// Job ID
        id: JobId,
        /// Merged output file name
        merged_file: String,
    },

    /// Merge failed (the job still completes)
    MergeFailed {
        /// Job ID
        id: JobId,
        /// Failure description
        error: String,
    },

    /// Job reached `Completed`
    JobCompleted {
        /// Job ID
        id: JobId,
        /// Episodes downloaded / episodes selected
        completed_episodes: usize,
        /// Episodes selected
        total_episodes: usize,
    },

    /// Job reached `Failed`
    JobFailed {
        /// Job ID
        id: JobId,
        /// Triggering message
        error: String,
    },

    /// Terminal job removed from the registry
    JobCleared {
        /// Job ID
        id: JobId,
    },
}
