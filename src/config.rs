//! Configuration types for kai-dl

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use utoipa::ToSchema;

/// Target site configuration (base URL and request identity)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct SiteConfig {
    /// Base URL of the streaming site (default: "https://anikai.to")
    #[serde(default = "default_site_base_url")]
    pub base_url: String,

    /// User-Agent header sent with every site, gateway, and subtitle request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: default_site_base_url(),
            user_agent: default_user_agent(),
        }
    }
}

/// Codec gateway configuration (the remote encode/decode service)
///
/// The gateway de-obfuscates site tokens; it is consumed as an opaque
/// request/response service. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct GatewayConfig {
    /// Base URL of the encode/decode API (default: "https://enc-dec.app/api")
    #[serde(default = "default_gateway_base_url")]
    pub base_url: String,

    /// Timeout for the lightweight encode call (default: 15 seconds)
    #[serde(default = "default_encode_timeout", with = "duration_serde")]
    pub encode_timeout: Duration,

    /// Timeout for the heavier decode calls (default: 30 seconds)
    #[serde(default = "default_decode_timeout", with = "duration_serde")]
    pub decode_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_base_url(),
            encode_timeout: default_encode_timeout(),
            decode_timeout: default_decode_timeout(),
        }
    }
}

/// Download behavior configuration (directories and concurrency)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct DownloadConfig {
    /// Download root directory; each anime gets its own subdirectory
    /// (default: "./downloads")
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,

    /// Maximum number of jobs running at once (default: 2)
    ///
    /// Submission is never rejected for capacity; excess jobs wait in
    /// `Initializing` until a slot frees up.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Timeout for site page and AJAX fragment fetches (default: 30 seconds)
    #[serde(default = "default_site_timeout", with = "duration_serde")]
    pub site_timeout: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            max_concurrent_jobs: default_max_concurrent_jobs(),
            site_timeout: default_site_timeout(),
        }
    }
}

/// External tool paths (yt-dlp, ffmpeg)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ToolsConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// REST API server configuration
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Bind address for the API server (default: 127.0.0.1:6789)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable permissive CORS for browser front-ends (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Serve interactive Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            swagger_ui: true,
        }
    }
}

/// Main configuration for [`crate::KaiDownloader`]
///
/// Fields are organized into logical sub-configs:
/// - [`site`](SiteConfig) — target site URL and request identity
/// - [`gateway`](GatewayConfig) — encode/decode service endpoints and timeouts
/// - [`download`](DownloadConfig) — directories and job concurrency
/// - [`tools`](ToolsConfig) — external binary paths
/// - [`server`](ApiConfig) — REST API settings
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// Target site settings
    #[serde(default)]
    pub site: SiteConfig,

    /// Codec gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Download behavior settings
    #[serde(default)]
    pub download: DownloadConfig,

    /// External tool paths
    #[serde(default)]
    pub tools: ToolsConfig,

    /// REST API settings
    #[serde(default)]
    pub server: ApiConfig,
}

impl Config {
    /// Download root directory
    pub fn download_dir(&self) -> &PathBuf {
        &self.download.download_dir
    }
}

/// Episode selection mode for a job
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DownloadMode {
    /// Download one episode, matched by display id
    Single,
    /// Download an inclusive range of episodes, bounded by sort keys
    Range,
    /// Download every listed episode (default)
    #[default]
    All,
}

/// Preferred subtitle handling, mapped to the site's server group type ids
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleMode {
    /// Subtitles burned into the video ("sub" servers)
    HardSub,
    /// Separate subtitle tracks ("softsub" servers, default)
    #[default]
    SoftSub,
    /// Dubbed audio with subtitles available ("dub" servers)
    Dub,
}

impl SubtitleMode {
    /// The site's server group type id for this mode
    pub fn type_id(&self) -> &'static str {
        match self {
            SubtitleMode::HardSub => "sub",
            SubtitleMode::SoftSub => "softsub",
            SubtitleMode::Dub => "dub",
        }
    }
}

/// Immutable per-job options captured at submission time
///
/// Never mutated after job creation; the job's execution task reads these
/// but the user-visible job state lives in [`crate::types::DownloadJob`].
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct JobOptions {
    /// Episode selection mode
    #[serde(default)]
    pub mode: DownloadMode,

    /// Episode display id for [`DownloadMode::Single`]
    #[serde(default = "default_episode_bound")]
    pub episode: String,

    /// First episode display id for [`DownloadMode::Range`] (inclusive)
    #[serde(default = "default_episode_bound")]
    pub start_episode: String,

    /// Last episode display id for [`DownloadMode::Range`] (inclusive)
    #[serde(default = "default_episode_bound")]
    pub end_episode: String,

    /// Preferred server group type
    #[serde(default)]
    pub subtitle_mode: SubtitleMode,

    /// Case-insensitive substring preferred in the server display name
    #[serde(default = "default_preferred_server")]
    pub preferred_server: String,

    /// Download attempts per episode before giving up on it (default: 7)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed pause between download attempts (default: 3 seconds)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub retry_delay: Duration,

    /// Concurrent fragment downloads passed to the download tool (default: 15)
    #[serde(default = "default_fragment_concurrency")]
    pub fragment_concurrency: u32,

    /// Socket timeout in seconds passed to the download tool (default: 300)
    #[serde(default = "default_socket_timeout")]
    pub socket_timeout: u32,

    /// Merge completed episodes into a single file after downloading
    #[serde(default)]
    pub merge: bool,

    /// Keep the individual episode files after a successful merge
    #[serde(default)]
    pub keep_individual_files: bool,

    /// Season number override; None auto-detects from the title
    #[serde(default)]
    pub season_override: Option<u32>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            mode: DownloadMode::All,
            episode: default_episode_bound(),
            start_episode: default_episode_bound(),
            end_episode: default_episode_bound(),
            subtitle_mode: SubtitleMode::SoftSub,
            preferred_server: default_preferred_server(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            fragment_concurrency: default_fragment_concurrency(),
            socket_timeout: default_socket_timeout(),
            merge: false,
            keep_individual_files: false,
            season_override: None,
        }
    }
}

// ---------------------------------------------------------------------------
// serde default helpers
// ---------------------------------------------------------------------------

fn default_site_base_url() -> String {
    "https://anikai.to".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}

fn default_gateway_base_url() -> String {
    "https://enc-dec.app/api".to_string()
}

fn default_encode_timeout() -> Duration {
    Duration::from_secs(15)
}

fn default_decode_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_max_concurrent_jobs() -> usize {
    2
}

fn default_site_timeout() -> Duration {
    Duration::from_secs(30)
}

// literal address always parses
#[allow(clippy::unwrap_used)]
fn default_bind_address() -> SocketAddr {
    "127.0.0.1:6789".parse().unwrap()
}

fn default_true() -> bool {
    true
}

fn default_episode_bound() -> String {
    "1".to_string()
}

fn default_preferred_server() -> String {
    "Server 1".to_string()
}

fn default_max_retries() -> u32 {
    7
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(3)
}

fn default_fragment_concurrency() -> u32 {
    15
}

fn default_socket_timeout() -> u32 {
    300
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_usable() {
        let config = Config::default();
        assert_eq!(config.site.base_url, "https://anikai.to");
        assert_eq!(config.gateway.base_url, "https://enc-dec.app/api");
        assert_eq!(config.download.max_concurrent_jobs, 2);
        assert!(config.tools.search_path);
        assert_eq!(config.server.bind_address.port(), 6789);
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.download.download_dir, PathBuf::from("./downloads"));
        assert_eq!(config.gateway.encode_timeout, Duration::from_secs(15));
        assert_eq!(config.gateway.decode_timeout, Duration::from_secs(30));
    }

    #[test]
    fn durations_serialize_as_whole_seconds() {
        let config = GatewayConfig::default();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["encode_timeout"], 15);
        assert_eq!(json["decode_timeout"], 30);

        let back: GatewayConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back.encode_timeout, Duration::from_secs(15));
    }

    #[test]
    fn job_options_defaults_match_documented_values() {
        let opts = JobOptions::default();
        assert_eq!(opts.mode, DownloadMode::All);
        assert_eq!(opts.subtitle_mode, SubtitleMode::SoftSub);
        assert_eq!(opts.preferred_server, "Server 1");
        assert_eq!(opts.max_retries, 7);
        assert_eq!(opts.retry_delay, Duration::from_secs(3));
        assert_eq!(opts.fragment_concurrency, 15);
        assert_eq!(opts.socket_timeout, 300);
        assert!(!opts.merge);
        assert!(!opts.keep_individual_files);
        assert!(opts.season_override.is_none());
    }

    #[test]
    fn partial_job_options_fill_in_defaults() {
        let opts: JobOptions =
            serde_json::from_str(r#"{"mode": "range", "start_episode": "3", "end_episode": "5"}"#)
                .unwrap();
        assert_eq!(opts.mode, DownloadMode::Range);
        assert_eq!(opts.start_episode, "3");
        assert_eq!(opts.end_episode, "5");
        assert_eq!(opts.max_retries, 7, "unspecified fields take defaults");
    }

    #[test]
    fn subtitle_mode_maps_to_site_type_ids() {
        assert_eq!(SubtitleMode::HardSub.type_id(), "sub");
        assert_eq!(SubtitleMode::SoftSub.type_id(), "softsub");
        assert_eq!(SubtitleMode::Dub.type_id(), "dub");
    }

    #[test]
    fn download_mode_serializes_snake_case() {
        assert_eq!(
            serde_json::to_value(DownloadMode::Single).unwrap(),
            serde_json::json!("single")
        );
        assert_eq!(
            serde_json::from_str::<DownloadMode>(r#""all""#).unwrap(),
            DownloadMode::All
        );
    }
}
