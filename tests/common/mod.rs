//! Shared fixtures for integration tests: scripted external tools and a
//! wiremock-backed site + gateway.

#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(dead_code)] // not every test binary uses every fixture

use async_trait::async_trait;
use kai_dl::error::{Error, Result};
use kai_dl::executor::{FetchParams, MediaMuxer, SubtitleInput, VideoFetcher};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fetcher that writes a small file instead of invoking yt-dlp
#[derive(Default)]
pub struct FileWritingFetcher {
    pub calls: AtomicU32,
}

#[async_trait]
impl VideoFetcher for FileWritingFetcher {
    async fn fetch(&self, params: &FetchParams<'_>) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::fs::write(params.output, b"video-bytes").map_err(Error::Io)
    }

    fn name(&self) -> &'static str {
        "file-writing-fetcher"
    }
}

/// Fetcher that always fails, for exercising retry exhaustion
#[derive(Default)]
pub struct AlwaysFailingFetcher {
    pub calls: AtomicU32,
}

#[async_trait]
impl VideoFetcher for AlwaysFailingFetcher {
    async fn fetch(&self, _params: &FetchParams<'_>) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::ExternalTool("simulated download failure".into()))
    }

    fn name(&self) -> &'static str {
        "always-failing-fetcher"
    }
}

/// Muxer that concatenates input bytes instead of invoking ffmpeg
pub struct ByteConcatMuxer {
    pub concat_succeeds: bool,
}

impl Default for ByteConcatMuxer {
    fn default() -> Self {
        Self {
            concat_succeeds: true,
        }
    }
}

#[async_trait]
impl MediaMuxer for ByteConcatMuxer {
    async fn mux(&self, video: &Path, _subtitles: &[SubtitleInput], output: &Path) -> Result<()> {
        std::fs::copy(video, output).map_err(Error::Io)?;
        Ok(())
    }

    async fn concat(&self, manifest: &Path, output: &Path) -> Result<()> {
        if !self.concat_succeeds {
            return Err(Error::ExternalTool("simulated concat failure".into()));
        }
        // The manifest lists `file '<path>'` lines; concatenate their bytes
        let listing = std::fs::read_to_string(manifest).map_err(Error::Io)?;
        let mut merged = Vec::new();
        for line in listing.lines() {
            let input = line
                .trim()
                .strip_prefix("file '")
                .and_then(|rest| rest.strip_suffix('\''))
                .expect("manifest line format");
            merged.extend(std::fs::read(input).map_err(Error::Io)?);
        }
        std::fs::write(output, merged).map_err(Error::Io)
    }

    fn name(&self) -> &'static str {
        "byte-concat-muxer"
    }
}

/// Mount a mock site + gateway serving one anime with the given episodes
///
/// Every episode gets a single softsub "Server 1" entry resolving to a
/// subtitle-less media payload, so downloads exercise the plain (no-mux)
/// path.
pub async fn mount_site(server: &MockServer, title: &str, episode_ids: &[&str]) {
    // Anime page
    Mock::given(method("GET"))
        .and(path("/watch/test-show"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            r#"<html><body>
                <div data-id="777"></div>
                <div class="title-wrapper"><h1 class="title"><span title="{title}">{title}</span></h1></div>
            </body></html>"#
        )))
        .mount(server)
        .await;

    // Gateway encode (generic for every token)
    Mock::given(method("GET"))
        .and(path("/enc-kai"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "result": "enc-token" })),
        )
        .mount(server)
        .await;

    // Episode listing
    let anchors: String = episode_ids
        .iter()
        .map(|id| format!(r#"<a num="{id}" token="tok-{id}" langs="1">Episode {id}</a>"#))
        .collect();
    Mock::given(method("GET"))
        .and(path("/ajax/episodes/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": format!(r#"<div class="eplist">{anchors}</div>"#)
        })))
        .mount(server)
        .await;

    // Server listing (same single server for every episode)
    Mock::given(method("GET"))
        .and(path("/ajax/links/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": r#"<div class="server-items" data-id="softsub">
                <span class="server" data-lid="500">Server 1</span>
            </div>"#
        })))
        .mount(server)
        .await;

    // Link view -> encoded link blob
    Mock::given(method("GET"))
        .and(path("/ajax/links/view"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": "encoded-link-blob"
        })))
        .mount(server)
        .await;

    // Gateway link decode -> iframe on this same mock host
    Mock::given(method("POST"))
        .and(path("/dec-kai"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": { "url": format!("{}/e/iframe-tok", server.uri()) }
        })))
        .mount(server)
        .await;

    // Media host token endpoint
    Mock::given(method("GET"))
        .and(path("/media/iframe-tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": "mega-token-blob"
        })))
        .mount(server)
        .await;

    // Gateway media decode -> one source, no subtitle tracks
    Mock::given(method("POST"))
        .and(path("/dec-mega"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": {
                "sources": [{ "file": "https://cdn.invalid/stream.m3u8" }],
                "tracks": []
            }
        })))
        .mount(server)
        .await;
}
