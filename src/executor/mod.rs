//! Download execution: per-episode retry loop, subtitle muxing, merging
//!
//! The executor owns the external tools and the subtitle HTTP client. It
//! never touches job state directly — progress and log lines flow through a
//! [`ProgressSink`] implemented by the job runner, so the executor stays
//! independent of the orchestration layer.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::{JobOptions, SiteConfig, ToolsConfig};
use crate::error::Result;
use crate::types::{LogLevel, ResolvedMedia};
use crate::utils::merged_filename;

mod tools;

pub use tools::{
    CliMediaMuxer, CliVideoFetcher, FetchParams, MediaMuxer, SubtitleInput, UnavailableMediaMuxer,
    UnavailableVideoFetcher, VideoFetcher,
};

/// File name of the ephemeral concat manifest, written next to the inputs
const MERGE_MANIFEST_NAME: &str = "filelist_merge.txt";

/// Observer for executor activity
///
/// The job runner implements this to route executor log lines into the
/// job's bounded log; tests use a recording implementation.
pub trait ProgressSink: Send + Sync {
    /// Record one log line
    fn log(&self, level: LogLevel, message: String);
}

/// Executes episode downloads and merges via external tools
pub struct DownloadExecutor {
    http: reqwest::Client,
    fetcher: Arc<dyn VideoFetcher>,
    muxer: Arc<dyn MediaMuxer>,
    user_agent: String,
    referer: String,
}

impl DownloadExecutor {
    /// Create an executor, locating the external binaries per config
    ///
    /// Missing binaries do not fail construction; they degrade into
    /// per-invocation errors so jobs report them through the normal
    /// per-episode failure path.
    pub fn new(site: &SiteConfig, tools: &ToolsConfig) -> Result<Self> {
        let fetcher: Arc<dyn VideoFetcher> = match (&tools.ytdlp_path, tools.search_path) {
            (Some(path), _) => Arc::new(CliVideoFetcher::new(path.clone())),
            (None, true) => CliVideoFetcher::from_path()
                .map(|f| Arc::new(f) as Arc<dyn VideoFetcher>)
                .unwrap_or_else(|| Arc::new(UnavailableVideoFetcher)),
            (None, false) => Arc::new(UnavailableVideoFetcher),
        };

        let muxer: Arc<dyn MediaMuxer> = match (&tools.ffmpeg_path, tools.search_path) {
            (Some(path), _) => Arc::new(CliMediaMuxer::new(path.clone())),
            (None, true) => CliMediaMuxer::from_path()
                .map(|m| Arc::new(m) as Arc<dyn MediaMuxer>)
                .unwrap_or_else(|| Arc::new(UnavailableMediaMuxer)),
            (None, false) => Arc::new(UnavailableMediaMuxer),
        };

        tracing::info!(
            fetcher = fetcher.name(),
            muxer = muxer.name(),
            "download tools initialized"
        );

        Self::with_tools(site, fetcher, muxer)
    }

    /// Create an executor with explicit tool implementations
    ///
    /// This is the seam used by tests and by embedders that bring their own
    /// transport.
    pub fn with_tools(
        site: &SiteConfig,
        fetcher: Arc<dyn VideoFetcher>,
        muxer: Arc<dyn MediaMuxer>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&site.user_agent)
            .build()?;
        Ok(Self {
            http,
            fetcher,
            muxer,
            user_agent: site.user_agent.clone(),
            referer: site.base_url.clone(),
        })
    }

    /// Download one episode with retries
    ///
    /// Loops up to `options.max_retries` attempts. Before each attempt any
    /// partial output is removed; between attempts the executor sleeps the
    /// fixed `options.retry_delay`. Returns `true` as soon as the final
    /// output file exists after an attempt. Exhausting the budget is a
    /// permanent per-episode failure, never a job failure.
    pub async fn download_episode(
        &self,
        media: &ResolvedMedia,
        output: &Path,
        options: &JobOptions,
        episode_label: &str,
        sink: &dyn ProgressSink,
    ) -> bool {
        for attempt in 1..=options.max_retries {
            if tokio::fs::try_exists(output).await.unwrap_or(false) {
                let _ = tokio::fs::remove_file(output).await;
            }
            if attempt > 1 {
                sink.log(
                    LogLevel::Info,
                    format!(
                        "retry {attempt}/{} for episode {episode_label}",
                        options.max_retries
                    ),
                );
            }

            let succeeded = self
                .attempt_download(media, output, options, episode_label, sink)
                .await;
            if succeeded && tokio::fs::try_exists(output).await.unwrap_or(false) {
                return true;
            }

            if attempt < options.max_retries {
                tokio::time::sleep(options.retry_delay).await;
            }
        }
        false
    }

    /// One download attempt; true when the final output file is in place
    async fn attempt_download(
        &self,
        media: &ResolvedMedia,
        output: &Path,
        options: &JobOptions,
        episode_label: &str,
        sink: &dyn ProgressSink,
    ) -> bool {
        if media.subtitle_tracks.is_empty() {
            return match self.fetch_video(&media.media_url, output, options).await {
                Ok(()) => tokio::fs::try_exists(output).await.unwrap_or(false),
                Err(e) => {
                    sink.log(
                        LogLevel::Error,
                        format!("episode {episode_label} download failed: {e}"),
                    );
                    false
                }
            };
        }

        sink.log(
            LogLevel::Info,
            format!(
                "found {} subtitle track(s) for episode {episode_label}",
                media.subtitle_tracks.len()
            ),
        );

        // Video goes to a temp path first so a failed mux can still salvage it
        let temp_video = sibling_path(output, "_temp", "mp4");
        if let Err(e) = self.fetch_video(&media.media_url, &temp_video, options).await {
            sink.log(
                LogLevel::Error,
                format!("episode {episode_label} video download failed: {e}"),
            );
            return false;
        }
        if !tokio::fs::try_exists(&temp_video).await.unwrap_or(false) {
            sink.log(
                LogLevel::Error,
                format!("episode {episode_label} video download produced no file"),
            );
            return false;
        }

        let subtitles = self.fetch_subtitles(media, output, sink).await;

        if subtitles.is_empty() {
            // All subtitle fetches failed; ship the bare video
            return tokio::fs::rename(&temp_video, output).await.is_ok();
        }

        let mux_result = self.muxer.mux(&temp_video, &subtitles, output).await;
        let mux_ok =
            mux_result.is_ok() && tokio::fs::try_exists(output).await.unwrap_or(false);
        let muxed = if mux_ok {
            let _ = tokio::fs::remove_file(&temp_video).await;
            true
        } else {
            if let Err(e) = mux_result {
                sink.log(
                    LogLevel::Error,
                    format!("episode {episode_label} subtitle mux failed: {e}"),
                );
            }
            // Fall back to the subtitle-less video when it survived
            if tokio::fs::try_exists(&temp_video).await.unwrap_or(false) {
                tokio::fs::rename(&temp_video, output).await.is_ok()
            } else {
                false
            }
        };

        for subtitle in &subtitles {
            let _ = tokio::fs::remove_file(&subtitle.path).await;
        }

        muxed
    }

    /// Fetch each subtitle track to disk; individual failures are warnings
    async fn fetch_subtitles(
        &self,
        media: &ResolvedMedia,
        output: &Path,
        sink: &dyn ProgressSink,
    ) -> Vec<SubtitleInput> {
        let mut subtitles = Vec::new();
        for (index, track) in media.subtitle_tracks.iter().enumerate() {
            let path = sibling_path(output, &format!("_sub{index}"), "vtt");
            match self.fetch_subtitle_file(&track.url, &path).await {
                Ok(()) => subtitles.push(SubtitleInput {
                    path,
                    language_label: track.language_label.clone(),
                }),
                Err(e) => sink.log(
                    LogLevel::Warn,
                    format!("failed to download subtitle {}: {e}", track.language_label),
                ),
            }
        }
        subtitles
    }

    async fn fetch_subtitle_file(&self, url: &str, path: &Path) -> Result<()> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::REFERER, &self.referer)
            .send()
            .await?
            .error_for_status()?;
        let bytes = response.bytes().await?;
        tokio::fs::write(path, &bytes).await?;
        Ok(())
    }

    async fn fetch_video(&self, url: &str, output: &Path, options: &JobOptions) -> Result<()> {
        let params = FetchParams {
            url,
            output,
            user_agent: &self.user_agent,
            referer: &self.referer,
            retries: options.max_retries,
            fragment_concurrency: options.fragment_concurrency,
            socket_timeout: options.socket_timeout,
        };
        self.fetcher.fetch(&params).await
    }

    /// Merge episode files into one via stream-copy concatenation
    ///
    /// Every input must exist or the merge is aborted. The concat manifest
    /// is written next to the inputs and removed again regardless of the
    /// outcome. Returns the merged path only when the tool succeeded and the
    /// output exists.
    pub async fn merge_files(
        &self,
        paths: &[PathBuf],
        title: &str,
        season: u32,
        first_id: &str,
        last_id: &str,
        sink: &dyn ProgressSink,
    ) -> Option<PathBuf> {
        if paths.is_empty() {
            sink.log(LogLevel::Error, "no files to merge".to_string());
            return None;
        }

        for path in paths {
            if !tokio::fs::try_exists(path).await.unwrap_or(false) {
                sink.log(
                    LogLevel::Error,
                    format!("merge aborted: input file missing: {}", path.display()),
                );
                return None;
            }
        }

        let directory = paths[0].parent().unwrap_or_else(|| Path::new("."));
        let merged_name = merged_filename(title, season, first_id, last_id);
        let merged_path = directory.join(&merged_name);
        let manifest = directory.join(MERGE_MANIFEST_NAME);

        sink.log(
            LogLevel::Info,
            format!("merging {} files into {merged_name}", paths.len()),
        );

        let mut manifest_body = String::new();
        for path in paths {
            let absolute = path
                .canonicalize()
                .unwrap_or_else(|_| path.to_path_buf());
            manifest_body.push_str(&format!("file '{}'\n", absolute.display()));
        }
        if let Err(e) = tokio::fs::write(&manifest, manifest_body).await {
            sink.log(LogLevel::Error, format!("failed to write merge manifest: {e}"));
            return None;
        }

        let merge_result = self.muxer.concat(&manifest, &merged_path).await;

        // The manifest is scoped to this merge; drop it whatever happened
        let _ = tokio::fs::remove_file(&manifest).await;

        match merge_result {
            Ok(()) => {
                if tokio::fs::try_exists(&merged_path).await.unwrap_or(false) {
                    Some(merged_path)
                } else {
                    sink.log(
                        LogLevel::Error,
                        "merge tool succeeded but produced no output file".to_string(),
                    );
                    None
                }
            }
            Err(e) => {
                sink.log(LogLevel::Error, format!("merge failed: {e}"));
                None
            }
        }
    }
}

/// Sibling path with a suffix appended to the stem and a fixed extension
///
/// `/dl/Show Episode 01.mp4` + `"_temp"`, `"mp4"` →
/// `/dl/Show Episode 01_temp.mp4`.
fn sibling_path(output: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    output.with_file_name(format!("{stem}{suffix}.{extension}"))
}
