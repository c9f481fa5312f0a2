//! Codec gateway client
//!
//! The streaming site obfuscates its AJAX parameters and media payloads.
//! A remote encode/decode service ("the gateway") undoes that obfuscation;
//! this module is a thin, stateless client for it. The cryptography itself
//! is deliberately out of scope — the gateway is consumed as an opaque
//! request/response contract of shape `{"result": <string|object>}`.
//!
//! No retry happens at this layer; retry policy belongs to callers.

use serde::Deserialize;
use std::time::Duration;

use crate::config::GatewayConfig;
use crate::error::{Error, Result};

/// Decoded link payload from the `dec-kai` endpoint
#[derive(Clone, Debug, Deserialize)]
pub struct LinkPayload {
    /// Intermediate iframe URL pointing at the media host
    #[serde(default)]
    pub url: String,
}

/// One source entry in a decoded media payload
#[derive(Clone, Debug, Deserialize)]
pub struct MediaSource {
    /// Direct URL of the video stream or playlist
    #[serde(default)]
    pub file: String,
}

/// One track entry in a decoded media payload
#[derive(Clone, Debug, Deserialize)]
pub struct MediaTrack {
    /// Track kind ("captions", "thumbnails", ...)
    #[serde(default)]
    pub kind: String,

    /// Direct URL of the track file
    #[serde(default)]
    pub file: String,

    /// Language label ("English", "Spanish", ...)
    #[serde(default)]
    pub label: Option<String>,
}

/// Decoded media payload from the `dec-mega` endpoint
#[derive(Clone, Debug, Deserialize)]
pub struct MediaPayload {
    /// Available video sources, best first
    #[serde(default)]
    pub sources: Vec<MediaSource>,

    /// Caption and auxiliary tracks
    #[serde(default)]
    pub tracks: Vec<MediaTrack>,
}

/// Gateway response envelope: every endpoint wraps its payload in `result`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
}

/// Stateless client for the remote encode/decode service
///
/// One instance is shared per [`crate::KaiDownloader`]; all methods are
/// `&self` and safe to call concurrently.
#[derive(Clone, Debug)]
pub struct GatewayClient {
    http: reqwest::Client,
    config: GatewayConfig,
}

impl GatewayClient {
    /// Create a gateway client with its own HTTP connection pool
    pub fn new(config: GatewayConfig, user_agent: &str) -> Result<Self> {
        let http = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { http, config })
    }

    /// Encode a plain token for use as an AJAX `_` parameter
    ///
    /// `GET {base}/enc-kai?text={text}` with the short encode timeout.
    pub async fn encode(&self, text: &str) -> Result<String> {
        let url = format!(
            "{}/enc-kai?text={}",
            self.config.base_url,
            urlencoding::encode(text)
        );
        let envelope: Envelope<String> = self
            .call("enc-kai", self.http.get(&url), self.config.encode_timeout)
            .await?;
        envelope
            .result
            .ok_or_else(|| decode_error("enc-kai", "missing result field"))
    }

    /// Decode the link payload returned by the site's link-view endpoint
    ///
    /// `POST {base}/dec-kai` with body `{"text": token}`.
    pub async fn decode_link(&self, token: &str) -> Result<LinkPayload> {
        let url = format!("{}/dec-kai", self.config.base_url);
        let request = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "text": token }));
        let envelope: Envelope<LinkPayload> = self
            .call("dec-kai", request, self.config.decode_timeout)
            .await?;
        envelope
            .result
            .ok_or_else(|| decode_error("dec-kai", "missing result field"))
    }

    /// Decode the media payload handed out by the media host
    ///
    /// `POST {base}/dec-mega` with body `{"text": token, "agent": agent}`.
    /// The user agent must match the one used for the media-token fetch.
    pub async fn decode_media(&self, token: &str, agent: &str) -> Result<MediaPayload> {
        let url = format!("{}/dec-mega", self.config.base_url);
        let request = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "text": token, "agent": agent }));
        let envelope: Envelope<MediaPayload> = self
            .call("dec-mega", request, self.config.decode_timeout)
            .await?;
        envelope
            .result
            .ok_or_else(|| decode_error("dec-mega", "missing result field"))
    }

    /// Send one gateway request and parse the `{"result": ...}` envelope
    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<Envelope<T>> {
        let response = request.timeout(timeout).send().await.map_err(|e| {
            tracing::error!(endpoint, error = %e, "gateway request failed");
            Error::Network(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(decode_error(
                endpoint,
                format!("unexpected status {status}"),
            ));
        }

        response
            .json::<Envelope<T>>()
            .await
            .map_err(|e| decode_error(endpoint, format!("malformed response body: {e}")))
    }
}

fn decode_error(endpoint: &str, detail: impl std::fmt::Display) -> Error {
    tracing::error!(endpoint, %detail, "gateway payload rejected");
    Error::Decode(format!("{endpoint}: {detail}"))
}
