//! Job orchestration: the public downloader handle
//!
//! [`KaiDownloader`] owns the registry, the resolver, the executor, and the
//! event channel. Each submitted job runs fire-and-forget on its own tokio
//! task; the number of jobs actually executing at once is bounded by a
//! semaphore sized from `download.max_concurrent_jobs`, while status-polling
//! callers read full-copy snapshots through the registry. There is no
//! cancellation of an in-flight job — clearing is only permitted once a job
//! reaches a terminal state.

mod registry;
mod runner;

pub use registry::{JobHandle, JobRegistry};

use std::sync::Arc;
use tokio::sync::{Semaphore, broadcast};

use crate::config::{Config, JobOptions};
use crate::error::{Error, Result};
use crate::executor::{DownloadExecutor, MediaMuxer, VideoFetcher};
use crate::gateway::GatewayClient;
use crate::resolver::{SiteResolver, detect_season};
use crate::types::{AnimeInfo, Event, EpisodeSummary, JobId, JobSnapshot, LogLevel, SearchResult};
use runner::JobRunner;

/// Capacity of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Default number of results returned by [`KaiDownloader::search`]
const DEFAULT_SEARCH_RESULTS: usize = 20;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct KaiDownloader {
    config: Arc<Config>,
    registry: Arc<JobRegistry>,
    runner: Arc<JobRunner>,
    resolver: SiteResolver,
    job_slots: Arc<Semaphore>,
    event_tx: broadcast::Sender<Event>,
}

impl KaiDownloader {
    /// Create a new downloader instance
    ///
    /// Initializes the gateway client, the site resolver, the download
    /// executor (locating yt-dlp and ffmpeg per config), and the download
    /// root directory.
    pub async fn new(config: Config) -> Result<Self> {
        let executor = Arc::new(DownloadExecutor::new(&config.site, &config.tools)?);
        Self::assemble(config, executor).await
    }

    /// Create a downloader with explicit external tool implementations
    ///
    /// The seam for tests and for embedders bringing their own transport;
    /// everything else behaves exactly as [`KaiDownloader::new`].
    pub async fn with_tools(
        config: Config,
        fetcher: Arc<dyn VideoFetcher>,
        muxer: Arc<dyn MediaMuxer>,
    ) -> Result<Self> {
        let executor = Arc::new(DownloadExecutor::with_tools(&config.site, fetcher, muxer)?);
        Self::assemble(config, executor).await
    }

    async fn assemble(config: Config, executor: Arc<DownloadExecutor>) -> Result<Self> {
        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let gateway = Arc::new(GatewayClient::new(
            config.gateway.clone(),
            &config.site.user_agent,
        )?);
        let resolver = SiteResolver::new(
            config.site.clone(),
            config.download.site_timeout,
            gateway,
        )?;

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let runner = Arc::new(JobRunner::new(
            resolver.clone(),
            executor,
            config.download.download_dir.clone(),
            event_tx.clone(),
        ));

        let job_slots = Arc::new(Semaphore::new(config.download.max_concurrent_jobs.max(1)));

        tracing::info!(
            download_dir = %config.download.download_dir.display(),
            max_concurrent_jobs = config.download.max_concurrent_jobs,
            "downloader initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            registry: Arc::new(JobRegistry::new()),
            runner,
            resolver,
            job_slots,
            event_tx,
        })
    }

    /// Submit a download job; returns immediately with the allocated id
    ///
    /// The job runs fire-and-forget on its own task. When all job slots are
    /// busy the job waits in `Initializing` until one frees up.
    pub fn submit_job(&self, url: &str, options: JobOptions) -> Result<JobId> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::Config {
                message: "no URL provided".into(),
                key: Some("url".into()),
            });
        }

        let handle = self.registry.create(url, options);
        let id = handle.id();
        tracing::info!(job_id = id.0, url, "job submitted");
        self.event_tx
            .send(Event::JobQueued {
                id,
                url: url.to_string(),
            })
            .ok();

        let runner = self.runner.clone();
        let slots = self.job_slots.clone();
        tokio::spawn(async move {
            let permit = match slots.clone().try_acquire_owned() {
                Ok(permit) => permit,
                Err(_) => {
                    handle.update(|job| {
                        job.add_log(LogLevel::Info, "waiting for a free job slot")
                    });
                    match slots.acquire_owned().await {
                        Ok(permit) => permit,
                        // The semaphore is never closed; bail quietly if it ever is
                        Err(_) => return,
                    }
                }
            };
            runner.run(handle).await;
            drop(permit);
        });

        Ok(id)
    }

    /// Snapshot one job by id
    pub fn job_snapshot(&self, id: JobId) -> Option<JobSnapshot> {
        self.registry.snapshot(id)
    }

    /// Snapshot every known job, newest-first by start time
    pub fn list_jobs(&self) -> Vec<JobSnapshot> {
        self.registry.snapshots()
    }

    /// Remove a terminal job from the registry
    ///
    /// Fails with [`Error::Conflict`] while the job is still running and
    /// [`Error::NotFound`] when the id is unknown.
    pub fn clear_job(&self, id: JobId) -> Result<()> {
        self.registry.clear(id)?;
        self.event_tx.send(Event::JobCleared { id }).ok();
        Ok(())
    }

    /// Resolve anime information for a page URL without starting a job
    ///
    /// A pure function of remote state: calling it twice for the same URL
    /// yields the same answer modulo upstream site changes.
    pub async fn anime_info(&self, url: &str) -> Result<AnimeInfo> {
        let identity = self.resolver.anime_identity(url).await?;
        let episodes = self.resolver.episodes(&identity.id).await?;
        let season = detect_season(&identity.title);

        Ok(AnimeInfo {
            anime_id: identity.id,
            title: identity.title,
            season,
            total_episodes: episodes.len(),
            episodes: episodes
                .iter()
                .map(|ep| EpisodeSummary {
                    id: ep.display_id.clone(),
                    title: format!("Episode {}", ep.display_id),
                    languages: ep.languages,
                })
                .collect(),
        })
    }

    /// Search the site for anime by keyword
    pub async fn search(
        &self,
        query: &str,
        max_results: Option<usize>,
    ) -> Result<Vec<SearchResult>> {
        self.resolver
            .search(query, max_results.unwrap_or(DEFAULT_SEARCH_RESULTS))
            .await
    }

    /// Subscribe to job lifecycle events
    ///
    /// Multiple subscribers are supported; each receives all events
    /// independently. A subscriber that falls behind by more than the
    /// channel capacity receives a `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Spawn the REST API server in a background task
    ///
    /// The server runs concurrently with job processing and listens on the
    /// configured bind address (default: 127.0.0.1:6789).
    pub fn spawn_api_server(self: &Arc<Self>) -> tokio::task::JoinHandle<Result<()>> {
        let downloader = self.clone();
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(downloader, config).await })
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{UnavailableMediaMuxer, UnavailableVideoFetcher};

    async fn downloader() -> (KaiDownloader, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            download: crate::config::DownloadConfig {
                download_dir: dir.path().join("downloads"),
                ..Default::default()
            },
            ..Default::default()
        };
        let downloader = KaiDownloader::with_tools(
            config,
            Arc::new(UnavailableVideoFetcher),
            Arc::new(UnavailableMediaMuxer),
        )
        .await
        .unwrap();
        (downloader, dir)
    }

    #[tokio::test]
    async fn submit_rejects_empty_url() {
        let (dl, _dir) = downloader().await;
        let err = dl.submit_job("   ", JobOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Config { .. }), "got {err:?}");
        assert!(dl.list_jobs().is_empty(), "no job must be registered");
    }

    #[tokio::test]
    async fn submit_registers_job_and_returns_increasing_ids() {
        let (dl, _dir) = downloader().await;
        let first = dl
            .submit_job("https://example.invalid/watch/a", JobOptions::default())
            .unwrap();
        let second = dl
            .submit_job("https://example.invalid/watch/b", JobOptions::default())
            .unwrap();
        assert!(second > first);
        assert_eq!(dl.list_jobs().len(), 2);
        assert!(dl.job_snapshot(first).is_some());
    }

    #[tokio::test]
    async fn submit_emits_job_queued_event() {
        let (dl, _dir) = downloader().await;
        let mut events = dl.subscribe();
        let id = dl
            .submit_job("https://example.invalid/watch/a", JobOptions::default())
            .unwrap();
        let event = events.recv().await.unwrap();
        match event {
            Event::JobQueued { id: queued, url } => {
                assert_eq!(queued, id);
                assert_eq!(url, "https://example.invalid/watch/a");
            }
            other => panic!("expected JobQueued first, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_job_snapshot_is_none() {
        let (dl, _dir) = downloader().await;
        assert!(dl.job_snapshot(JobId::new(999)).is_none());
    }
}
