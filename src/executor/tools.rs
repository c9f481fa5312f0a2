//! External tool invocation for video download and muxing
//!
//! Both tools are black boxes behind traits: yt-dlp moves the video bytes,
//! ffmpeg muxes subtitles and concatenates episode files. CLI handlers
//! execute the real binaries; the traits keep the executor testable and the
//! binaries swappable.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

use crate::error::{Error, Result};

/// Parameters for one video download invocation
#[derive(Debug)]
pub struct FetchParams<'a> {
    /// Direct media URL to download
    pub url: &'a str,
    /// Output file path
    pub output: &'a Path,
    /// User-Agent header to present
    pub user_agent: &'a str,
    /// Referer header to present (the site's origin)
    pub referer: &'a str,
    /// Whole-file and fragment retry count for the tool's internal retries
    pub retries: u32,
    /// Concurrent fragment downloads
    pub fragment_concurrency: u32,
    /// Socket timeout in seconds
    pub socket_timeout: u32,
}

/// A subtitle file staged on disk, ready for muxing
#[derive(Clone, Debug)]
pub struct SubtitleInput {
    /// Path of the downloaded subtitle file
    pub path: PathBuf,
    /// Language label used for track metadata
    pub language_label: String,
}

/// Downloads a video URL to a local file
#[async_trait]
pub trait VideoFetcher: Send + Sync {
    /// Download `params.url` to `params.output`
    ///
    /// Success means the tool exited cleanly; callers still verify the
    /// output file exists before trusting the result.
    async fn fetch(&self, params: &FetchParams<'_>) -> Result<()>;

    /// Name of the fetcher implementation
    fn name(&self) -> &'static str;
}

/// Muxes subtitle tracks into videos and concatenates episode files
#[async_trait]
pub trait MediaMuxer: Send + Sync {
    /// Mux `video` and `subtitles` into `output` with per-track language metadata
    async fn mux(&self, video: &Path, subtitles: &[SubtitleInput], output: &Path) -> Result<()>;

    /// Stream-copy concatenate the files listed in `manifest` into `output`
    async fn concat(&self, manifest: &Path, output: &Path) -> Result<()>;

    /// Name of the muxer implementation
    fn name(&self) -> &'static str;
}

/// CLI fetcher running the external yt-dlp binary
pub struct CliVideoFetcher {
    binary_path: PathBuf,
}

impl CliVideoFetcher {
    /// Create a fetcher with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }
}

#[async_trait]
impl VideoFetcher for CliVideoFetcher {
    async fn fetch(&self, params: &FetchParams<'_>) -> Result<()> {
        let output = Command::new(&self.binary_path)
            .arg(params.url)
            .arg("-o")
            .arg(params.output)
            .arg("--no-warnings")
            .arg("--no-check-certificate")
            .args(["--concurrent-fragments", &params.fragment_concurrency.to_string()])
            .args(["--retries", &params.retries.to_string()])
            .args(["--fragment-retries", &params.retries.to_string()])
            .args(["--socket-timeout", &params.socket_timeout.to_string()])
            .args(["--user-agent", params.user_agent])
            .args(["--referer", params.referer])
            .arg("--newline")
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("failed to execute yt-dlp: {e}")))?;

        if output.status.success() {
            Ok(())
        } else {
            Err(Error::ExternalTool(format!(
                "yt-dlp exited with {}: {}",
                output.status,
                stderr_tail(&output.stderr)
            )))
        }
    }

    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }
}

/// CLI muxer running the external ffmpeg binary
pub struct CliMediaMuxer {
    binary_path: PathBuf,
}

impl CliMediaMuxer {
    /// Create a muxer with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find ffmpeg in PATH
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }
}

#[async_trait]
impl MediaMuxer for CliMediaMuxer {
    async fn mux(&self, video: &Path, subtitles: &[SubtitleInput], output: &Path) -> Result<()> {
        let mut command = Command::new(&self.binary_path);
        command.arg("-i").arg(video);
        for subtitle in subtitles {
            command.arg("-i").arg(&subtitle.path);
        }
        command.args(["-map", "0:v", "-map", "0:a"]);
        for (index, subtitle) in subtitles.iter().enumerate() {
            command.args(["-map", &format!("{}:0", index + 1)]);
            command.arg(format!("-metadata:s:s:{index}"));
            command.arg(format!("language={}", language_code(&subtitle.language_label)));
            command.arg(format!("-metadata:s:s:{index}"));
            command.arg(format!("title={}", subtitle.language_label));
        }
        command
            .args(["-c:v", "copy", "-c:a", "copy", "-c:s", "mov_text", "-y"])
            .arg(output);

        run_ffmpeg(command, "mux").await
    }

    async fn concat(&self, manifest: &Path, output: &Path) -> Result<()> {
        let mut command = Command::new(&self.binary_path);
        command
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(manifest)
            .args(["-c:v", "copy", "-c:a", "copy", "-c:s", "copy", "-y"])
            .arg(output);

        run_ffmpeg(command, "concat").await
    }

    fn name(&self) -> &'static str {
        "cli-ffmpeg"
    }
}

/// Fetcher stand-in used when no yt-dlp binary could be located
///
/// Every call fails with a descriptive error so jobs degrade into logged
/// per-episode failures instead of panicking at construction time.
pub struct UnavailableVideoFetcher;

#[async_trait]
impl VideoFetcher for UnavailableVideoFetcher {
    async fn fetch(&self, _params: &FetchParams<'_>) -> Result<()> {
        Err(Error::ExternalTool(
            "yt-dlp binary not found (set tools.ytdlp_path or install it on PATH)".into(),
        ))
    }

    fn name(&self) -> &'static str {
        "unavailable-yt-dlp"
    }
}

/// Muxer stand-in used when no ffmpeg binary could be located
pub struct UnavailableMediaMuxer;

#[async_trait]
impl MediaMuxer for UnavailableMediaMuxer {
    async fn mux(&self, _video: &Path, _subtitles: &[SubtitleInput], _output: &Path) -> Result<()> {
        Err(Error::ExternalTool(
            "ffmpeg binary not found (set tools.ffmpeg_path or install it on PATH)".into(),
        ))
    }

    async fn concat(&self, _manifest: &Path, _output: &Path) -> Result<()> {
        Err(Error::ExternalTool(
            "ffmpeg binary not found (set tools.ffmpeg_path or install it on PATH)".into(),
        ))
    }

    fn name(&self) -> &'static str {
        "unavailable-ffmpeg"
    }
}

/// ISO-ish language code for track metadata: first three letters, lowercased
fn language_code(label: &str) -> String {
    label.chars().take(3).collect::<String>().to_lowercase()
}

async fn run_ffmpeg(mut command: Command, operation: &str) -> Result<()> {
    let output = command
        .output()
        .await
        .map_err(|e| Error::ExternalTool(format!("failed to execute ffmpeg: {e}")))?;

    if output.status.success() {
        Ok(())
    } else {
        Err(Error::ExternalTool(format!(
            "ffmpeg {operation} exited with {}: {}",
            output.status,
            stderr_tail(&output.stderr)
        )))
    }
}

/// Last few lines of a tool's stderr, for error messages
fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().rev().take(3).collect();
    lines.into_iter().rev().collect::<Vec<_>>().join(" | ")
}
