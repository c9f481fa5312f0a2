//! Job execution: the per-job state machine
//!
//! One runner instance is shared by all jobs; each job runs the sequence
//! `FetchingInfo → FetchingEpisodes → Downloading → (Merging) → Completed`
//! on its own task. Failures split by granularity: anything scoped to a
//! single episode is logged and skipped, while whole-job failures (no anime
//! id, no episodes, empty selection) abort into `Failed`. A merge failure
//! never demotes a completed job.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::JobOptions;
use crate::error::{Error, Result};
use crate::executor::DownloadExecutor;
use crate::resolver::{choose_server, detect_season, SiteResolver};
use crate::selection::select_episodes;
use crate::types::{Episode, EpisodeOutcome, Event, JobStatus, LogLevel};
use crate::utils::episode_filename;

use super::registry::JobHandle;

/// Executes jobs against the resolver and download executor
pub(crate) struct JobRunner {
    resolver: SiteResolver,
    executor: Arc<DownloadExecutor>,
    download_dir: PathBuf,
    events: broadcast::Sender<Event>,
}

impl JobRunner {
    pub(crate) fn new(
        resolver: SiteResolver,
        executor: Arc<DownloadExecutor>,
        download_dir: PathBuf,
        events: broadcast::Sender<Event>,
    ) -> Self {
        Self {
            resolver,
            executor,
            download_dir,
            events,
        }
    }

    /// Drive one job to a terminal state
    pub(crate) async fn run(&self, handle: JobHandle) {
        let id = handle.id();
        if let Err(e) = self.execute(&handle).await {
            let message = e.to_string();
            handle.update(|job| {
                job.error = Some(message.clone());
                job.add_log(LogLevel::Error, format!("job failed: {message}"));
                // Record the full error chain, the closest thing to a
                // captured stack trace the failure carries
                let mut source = std::error::Error::source(&e);
                while let Some(cause) = source {
                    job.add_log(LogLevel::Error, format!("caused by: {cause}"));
                    source = cause.source();
                }
                job.transition(JobStatus::Failed);
            });
            tracing::error!(job_id = id.0, error = %message, "job failed");
            self.emit(Event::StatusChanged {
                id,
                status: JobStatus::Failed,
            });
            self.emit(Event::JobFailed { id, error: message });
        }
    }

    async fn execute(&self, handle: &JobHandle) -> Result<()> {
        let id = handle.id();
        let (source_url, options) =
            handle.update(|job| (job.source_url.clone(), job.options.clone()));

        // Resolve identity
        self.advance(handle, JobStatus::FetchingInfo);
        handle.update(|job| {
            job.add_log(
                LogLevel::Info,
                format!("fetching anime details from {source_url}"),
            )
        });

        let identity = self.resolver.anime_identity(&source_url).await?;
        let season = options
            .season_override
            .unwrap_or_else(|| detect_season(&identity.title));
        handle.update(|job| {
            job.anime_title = Some(identity.title.clone());
            job.season = Some(season);
            job.add_log(LogLevel::Info, format!("found anime: {}", identity.title));
            job.add_log(LogLevel::Info, format!("season: {season}"));
        });

        // List and select episodes
        self.advance(handle, JobStatus::FetchingEpisodes);
        let episodes = self.resolver.episodes(&identity.id).await?;
        if episodes.is_empty() {
            return Err(Error::Parse("no episodes found".into()));
        }
        handle.update(|job| {
            job.add_log(LogLevel::Info, format!("found {} episodes", episodes.len()))
        });

        let selected = select_episodes(&episodes, &options);
        if selected.is_empty() {
            return Err(Error::Selection("no episodes match selection".into()));
        }
        let total = selected.len();
        handle.update(|job| {
            job.total_episodes = total;
            job.add_log(LogLevel::Info, format!("will download {total} episode(s)"));
        });

        // Per-anime subdirectory keeps concurrent jobs from colliding
        let anime_dir = self.download_dir.join(&identity.title);
        tokio::fs::create_dir_all(&anime_dir).await?;

        // Download loop: a fold over the selected episodes producing one
        // outcome per episode; failures never break the loop
        self.advance(handle, JobStatus::Downloading);
        let mut outcomes: Vec<EpisodeOutcome> = Vec::with_capacity(total);
        let mut downloaded_paths: Vec<PathBuf> = Vec::new();

        for (index, episode) in selected.iter().enumerate() {
            let episode_id = episode.display_id.clone();
            handle.update(|job| {
                job.current_episode = Some(episode_id.clone());
                job.add_log(
                    LogLevel::Info,
                    format!(
                        "processing episode {episode_id} ({}/{total})",
                        index + 1
                    ),
                );
            });
            self.emit(Event::EpisodeStarted {
                id,
                episode: episode_id.clone(),
            });

            let outcome = self
                .download_one(handle, &options, &anime_dir, &identity.title, season, episode)
                .await;

            match &outcome {
                Ok(path) => {
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    downloaded_paths.push(path.clone());
                    let progress = handle.update(|job| {
                        job.record_completed_episode(file_name.clone());
                        job.add_log(
                            LogLevel::Info,
                            format!("successfully downloaded episode {episode_id}"),
                        );
                        job.progress_percent
                    });
                    self.emit(Event::EpisodeCompleted {
                        id,
                        episode: episode_id.clone(),
                        progress_percent: progress,
                    });
                    outcomes.push(EpisodeOutcome {
                        episode_id,
                        success: true,
                        error: None,
                    });
                }
                Err(reason) => {
                    handle.update(|job| {
                        job.add_log(
                            LogLevel::Error,
                            format!("episode {episode_id} failed: {reason}"),
                        )
                    });
                    self.emit(Event::EpisodeFailed {
                        id,
                        episode: episode_id.clone(),
                        error: reason.clone(),
                    });
                    outcomes.push(EpisodeOutcome {
                        episode_id,
                        success: false,
                        error: Some(reason.clone()),
                    });
                }
            }
        }

        // Optional merge; its failure is logged but never fails the job
        if options.merge && downloaded_paths.len() > 1 {
            self.merge(handle, &options, &selected, &downloaded_paths, &identity.title, season)
                .await;
        }

        let completed = outcomes.iter().filter(|o| o.success).count();
        handle.update(|job| {
            job.current_episode = None;
            job.transition(JobStatus::Completed);
            job.add_log(
                LogLevel::Info,
                format!("download job completed! downloaded {completed}/{total} episodes"),
            );
        });
        self.emit(Event::StatusChanged {
            id,
            status: JobStatus::Completed,
        });
        self.emit(Event::JobCompleted {
            id,
            completed_episodes: completed,
            total_episodes: total,
        });
        tracing::info!(job_id = id.0, completed, total, "job completed");
        Ok(())
    }

    /// Resolve and download one episode; every failure is recoverable
    async fn download_one(
        &self,
        handle: &JobHandle,
        options: &JobOptions,
        anime_dir: &std::path::Path,
        title: &str,
        season: u32,
        episode: &Episode,
    ) -> std::result::Result<PathBuf, String> {
        let servers = self
            .resolver
            .servers(&episode.access_token)
            .await
            .map_err(|e| format!("server listing failed: {e}"))?;
        if servers.is_empty() {
            return Err("no servers available".to_string());
        }

        let server = choose_server(&servers, options.subtitle_mode, &options.preferred_server)
            .ok_or_else(|| "could not choose a server".to_string())?;
        handle.update(|job| {
            job.add_log(
                LogLevel::Info,
                format!("using server: {}", server.display_name),
            )
        });

        // Media is resolved fresh for every episode attempt cycle; resolved
        // URLs are short-lived and never cached
        let media = self
            .resolver
            .resolve_media(&server.server_id)
            .await
            .map_err(|e| format!("media resolution failed: {e}"))?;

        let output = anime_dir.join(episode_filename(title, season, &episode.display_id));
        let ok = self
            .executor
            .download_episode(&media, &output, options, &episode.display_id, handle)
            .await;
        if ok {
            Ok(output)
        } else {
            Err(format!(
                "download failed after {} attempt(s)",
                options.max_retries
            ))
        }
    }

    /// Merge downloaded files; consolidate sources unless the user kept them
    async fn merge(
        &self,
        handle: &JobHandle,
        options: &JobOptions,
        selected: &[Episode],
        downloaded_paths: &[PathBuf],
        title: &str,
        season: u32,
    ) {
        let id = handle.id();
        self.advance(handle, JobStatus::Merging);
        handle.update(|job| {
            job.add_log(
                LogLevel::Info,
                format!("merging {} episodes", downloaded_paths.len()),
            )
        });
        self.emit(Event::MergeStarted {
            id,
            file_count: downloaded_paths.len(),
        });

        let first_id = selected.first().map(|e| e.display_id.as_str()).unwrap_or("1");
        let last_id = selected.last().map(|e| e.display_id.as_str()).unwrap_or("1");

        let merged = self
            .executor
            .merge_files(downloaded_paths, title, season, first_id, last_id, handle)
            .await;

        let Some(merged_path) = merged else {
            handle.update(|job| job.add_log(LogLevel::Error, "merge failed"));
            self.emit(Event::MergeFailed {
                id,
                error: "merge failed".to_string(),
            });
            return;
        };

        let merged_name = merged_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        handle.update(|job| {
            job.merged_file_name = Some(merged_name.clone());
            job.add_log(
                LogLevel::Info,
                format!("successfully merged into {merged_name}"),
            );
        });
        self.emit(Event::MergeComplete {
            id,
            merged_file: merged_name,
        });

        if options.keep_individual_files {
            return;
        }

        handle.update(|job| job.add_log(LogLevel::Info, "removing individual episode files"));
        for path in downloaded_paths {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            match tokio::fs::remove_file(path).await {
                Ok(()) => handle.update(|job| {
                    job.downloaded_file_names.retain(|name| name != &file_name);
                }),
                Err(e) => handle.update(|job| {
                    job.add_log(
                        LogLevel::Warn,
                        format!("could not remove {file_name}: {e}"),
                    )
                }),
            }
        }
    }

    /// Transition the job and broadcast the change
    fn advance(&self, handle: &JobHandle, status: JobStatus) {
        handle.update(|job| job.transition(status));
        self.emit(Event::StatusChanged {
            id: handle.id(),
            status,
        });
    }

    fn emit(&self, event: Event) {
        // send() errors only when no subscriber exists, which is fine
        self.events.send(event).ok();
    }
}
