//! # kai-dl
//!
//! Highly configurable backend library for anime download applications.
//!
//! kai-dl resolves a streaming site's obfuscated pages into playable media
//! URLs (through a remote encode/decode gateway) and orchestrates download
//! jobs: episode selection, per-episode downloads with retry via yt-dlp,
//! subtitle muxing and optional episode merging via ffmpeg, and live
//! progress reporting to status-polling callers.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Sensible defaults** - Works out of the box with zero configuration
//! - **Event-driven** - Consumers subscribe to job events, no polling required
//! - **Black-box transport** - yt-dlp and ffmpeg are invoked behind traits,
//!   never reimplemented
//!
//! ## Quick Start
//!
//! ```no_run
//! use kai_dl::{Config, JobOptions, KaiDownloader};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = KaiDownloader::new(Config::default()).await?;
//!
//!     // Subscribe to events
//!     let mut events = downloader.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let job_id = downloader.submit_job(
//!         "https://anikai.to/watch/some-show",
//!         JobOptions::default(),
//!     )?;
//!
//!     // Poll for status
//!     if let Some(snapshot) = downloader.job_snapshot(job_id) {
//!         println!("{:?} {}%", snapshot.status, snapshot.progress_percent);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Download execution via external tools
pub mod executor;
/// Codec gateway client
pub mod gateway;
/// Job orchestration and registry
pub mod jobs;
/// Site resolution (pages, episodes, servers, media)
pub mod resolver;
/// Episode selection
pub mod selection;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, DownloadMode, JobOptions, SubtitleMode};
pub use error::{ApiError, Error, ErrorDetail, Result, ToHttpStatus};
pub use executor::{DownloadExecutor, MediaMuxer, VideoFetcher};
pub use gateway::GatewayClient;
pub use jobs::KaiDownloader;
pub use resolver::SiteResolver;
pub use types::{
    AnimeInfo, Event, JobId, JobSnapshot, JobStatus, LogEntry, LogLevel, SearchResult,
};

/// Run the API server until a termination signal arrives.
///
/// Spawns the REST API as a background task and waits for a signal:
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// In-flight jobs have no cancellation primitive; they are abandoned when
/// the process exits.
///
/// # Example
///
/// ```no_run
/// use kai_dl::{Config, KaiDownloader, run_with_shutdown};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let downloader = Arc::new(KaiDownloader::new(Config::default()).await?);
///     run_with_shutdown(downloader).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(downloader: std::sync::Arc<KaiDownloader>) -> Result<()> {
    let server = downloader.spawn_api_server();
    wait_for_signal().await;
    tracing::info!("shutdown signal received, stopping API server");
    server.abort();
    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Signal registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
            } else {
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
            } else {
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
