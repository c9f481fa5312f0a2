//! Site resolver: page URL → identity, episodes, servers, playable media
//!
//! Everything here is state-free request/parse plumbing. HTML is parsed with
//! prioritized selector lists (the first selector that matches wins) so a
//! site markup change means appending a selector, not rewriting a cascade of
//! boolean fallbacks. Parsing is kept in synchronous helpers that take the
//! fetched text and return owned data; no parsed document is ever held
//! across an await point.

use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{SiteConfig, SubtitleMode};
use crate::error::{Error, Result};
use crate::gateway::GatewayClient;
use crate::types::{
    AnimeIdentity, Episode, EpisodeKey, LanguageAvailability, MediaServer, ResolvedMedia,
    SearchResult, SubtitleTrack,
};
use crate::utils::sanitize_filename;

mod search;
mod season;

pub use season::detect_season;

/// Subtitle file extension accepted from media-host track listings
const SUBTITLE_EXTENSION: &str = ".vtt";

/// Title element fallbacks on the anime page, most specific first
const ANIME_TITLE_SELECTORS: &[&str] = &[
    "div.title-wrapper h1.title span",
    "h1.title",
    ".anime-title",
];

/// Site AJAX responses wrap an HTML fragment in a JSON envelope
#[derive(Debug, Deserialize)]
struct FragmentEnvelope {
    result: Option<String>,
}

/// Compile a prioritized selector list
///
/// Selector sources are literals; a parse failure is a programming error but
/// is still propagated rather than unwrapped.
pub(crate) fn compile_selectors(sources: &[&str]) -> Result<Vec<Selector>> {
    sources
        .iter()
        .map(|s| {
            Selector::parse(s).map_err(|e| Error::Parse(format!("invalid selector {s:?}: {e}")))
        })
        .collect()
}

/// All elements matched by the first selector in the chain that matches anything
pub(crate) fn first_matching_set<'a>(
    document: &'a Html,
    chain: &[Selector],
) -> Vec<ElementRef<'a>> {
    for selector in chain {
        let matches: Vec<_> = document.select(selector).collect();
        if !matches.is_empty() {
            return matches;
        }
    }
    Vec::new()
}

/// First element matched by any selector in the chain
fn first_match<'a>(document: &'a Html, chain: &[Selector]) -> Option<ElementRef<'a>> {
    chain
        .iter()
        .find_map(|selector| document.select(selector).next())
}

/// Resolves site pages and AJAX fragments into typed data
///
/// Cheap to clone; holds an HTTP connection pool and a shared
/// [`GatewayClient`]. All methods are `&self` and re-fetch remote state on
/// every call — resolution results are never cached.
#[derive(Clone, Debug)]
pub struct SiteResolver {
    http: reqwest::Client,
    site: SiteConfig,
    timeout: Duration,
    gateway: Arc<GatewayClient>,
}

impl SiteResolver {
    /// Create a resolver for the configured site
    pub fn new(site: SiteConfig, timeout: Duration, gateway: Arc<GatewayClient>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(&site.user_agent)
            .build()?;
        Ok(Self {
            http,
            site,
            timeout,
            gateway,
        })
    }

    /// User agent this resolver identifies as
    pub fn user_agent(&self) -> &str {
        &self.site.user_agent
    }

    /// Fetch the anime page and derive its identity
    ///
    /// The numeric id comes from the page's `div[data-id]` attribute; the
    /// title is located through [`ANIME_TITLE_SELECTORS`] and sanitized for
    /// filesystem use.
    pub async fn anime_identity(&self, page_url: &str) -> Result<AnimeIdentity> {
        let html = self.fetch_page(page_url).await?;
        parse_anime_identity(&html)
    }

    /// Fetch the episode listing for an anime id, sorted ascending
    pub async fn episodes(&self, anime_id: &str) -> Result<Vec<Episode>> {
        let enc = self.gateway.encode(anime_id).await?;
        let url = format!(
            "{}/ajax/episodes/list?ani_id={}&_={}",
            self.site.base_url, anime_id, enc
        );
        let fragment = self.fetch_fragment(&url, "episode list").await?;
        let mut episodes = parse_episode_fragment(&fragment)?;
        episodes.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
        Ok(episodes)
    }

    /// Fetch the streaming server options for an episode token
    pub async fn servers(&self, episode_token: &str) -> Result<Vec<MediaServer>> {
        let enc = self.gateway.encode(episode_token).await?;
        let url = format!(
            "{}/ajax/links/list?token={}&_={}",
            self.site.base_url, episode_token, enc
        );
        let fragment = self.fetch_fragment(&url, "server list").await?;
        parse_server_fragment(&fragment)
    }

    /// Resolve a server id into a playable media URL plus subtitle tracks
    ///
    /// The chain: encode the server id → fetch the link-view endpoint →
    /// decode the returned payload into an iframe URL → derive the media
    /// host's token endpoint from the iframe path → fetch it → decode that
    /// token into the final sources and tracks. Each stage names itself in
    /// its error.
    pub async fn resolve_media(&self, server_id: &str) -> Result<ResolvedMedia> {
        let enc = self.gateway.encode(server_id).await?;
        let url = format!(
            "{}/ajax/links/view?id={}&_={}",
            self.site.base_url, server_id, enc
        );
        let encoded_link = self.fetch_fragment(&url, "link view").await?;

        let link = self.gateway.decode_link(&encoded_link).await?;
        if link.url.is_empty() {
            return Err(Error::Parse("link decode: missing iframe url".into()));
        }

        let iframe = url::Url::parse(&link.url)
            .map_err(|e| Error::Parse(format!("iframe url: {e}")))?;
        let token = iframe
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
            .ok_or_else(|| Error::Parse("iframe url: empty path".into()))?;
        let media_endpoint = format!("{}/media/{}", iframe.origin().ascii_serialization(), token);

        let response = self
            .http
            .get(&media_endpoint)
            .header(reqwest::header::REFERER, &self.site.base_url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        let envelope: FragmentEnvelope = response
            .json()
            .await
            .map_err(|_| Error::Parse("media token: malformed response".into()))?;
        let mega_token = envelope
            .result
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::Parse("media token: missing result".into()))?;

        let media = self
            .gateway
            .decode_media(&mega_token, &self.site.user_agent)
            .await?;

        let media_url = media
            .sources
            .iter()
            .map(|s| s.file.clone())
            .find(|f| !f.is_empty())
            .ok_or_else(|| Error::Parse("media decode: no playable source".into()))?;

        let subtitle_tracks = media
            .tracks
            .into_iter()
            .filter(|t| t.kind == "captions" && t.file.ends_with(SUBTITLE_EXTENSION))
            .map(|t| SubtitleTrack {
                url: t.file,
                language_label: t.label.unwrap_or_else(|| "Unknown".to_string()),
            })
            .collect();

        Ok(ResolvedMedia {
            media_url,
            subtitle_tracks,
        })
    }

    /// Search the site for anime by keyword
    pub async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>> {
        let url = format!(
            "{}/browser?keyword={}",
            self.site.base_url,
            urlencoding::encode(query)
        );
        let html = self.fetch_page(&url).await?;
        search::parse_search_results(&html, &self.site.base_url, max_results)
    }

    /// GET a page as text, with site identity headers
    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::REFERER, &self.site.base_url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    /// GET a JSON-wrapped HTML fragment and unwrap its `result` field
    async fn fetch_fragment(&self, url: &str, stage: &str) -> Result<String> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::REFERER, &self.site.base_url)
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;
        let envelope: FragmentEnvelope = response
            .json()
            .await
            .map_err(|_| Error::Parse(format!("{stage}: malformed response")))?;
        envelope
            .result
            .filter(|html| !html.is_empty())
            .ok_or_else(|| Error::Parse(format!("{stage}: missing result")))
    }
}

/// Pick a server by preference cascade
///
/// Tried in order: exact type match plus case-insensitive name substring;
/// name substring alone; type match alone; first available. Returns `None`
/// only when `servers` is empty.
pub fn choose_server<'a>(
    servers: &'a [MediaServer],
    preferred_type: SubtitleMode,
    preferred_name: &str,
) -> Option<&'a MediaServer> {
    let type_id = preferred_type.type_id();
    let name_lower = preferred_name.to_lowercase();
    let name_matches = |s: &MediaServer| s.display_name.to_lowercase().contains(&name_lower);

    servers
        .iter()
        .find(|s| s.type_id == type_id && name_matches(s))
        .or_else(|| servers.iter().find(|s| name_matches(s)))
        .or_else(|| servers.iter().find(|s| s.type_id == type_id))
        .or_else(|| servers.first())
}

/// Parse an anime page into its identity
fn parse_anime_identity(html: &str) -> Result<AnimeIdentity> {
    let document = Html::parse_document(html);

    let id_chain = compile_selectors(&["div[data-id]"])?;
    let id = first_match(&document, &id_chain)
        .and_then(|div| div.value().attr("data-id"))
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::Parse("anime page: data-id attribute not found".into()))?
        .to_string();

    let title_chain = compile_selectors(ANIME_TITLE_SELECTORS)?;
    let title = first_match(&document, &title_chain)
        .map(|el| {
            el.value()
                .attr("title")
                .map(str::to_string)
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| el.text().collect::<String>().trim().to_string())
        })
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    Ok(AnimeIdentity {
        id,
        title: sanitize_filename(&title),
    })
}

/// Parse the episode-listing fragment into episodes (unsorted)
fn parse_episode_fragment(fragment: &str) -> Result<Vec<Episode>> {
    let document = Html::parse_fragment(fragment);
    let anchor_chain = compile_selectors(&["div.eplist a"])?;

    let mut episodes = Vec::new();
    for anchor in first_matching_set(&document, &anchor_chain) {
        let element = anchor.value();
        let display_id = element.attr("num").unwrap_or_default().trim().to_string();
        let access_token = element.attr("token").unwrap_or_default().to_string();
        let languages = LanguageAvailability::from_flag(
            element
                .attr("langs")
                .and_then(|l| l.parse::<i64>().ok())
                .unwrap_or(0),
        );

        episodes.push(Episode {
            sort_key: EpisodeKey::parse(&display_id),
            display_id,
            access_token,
            languages,
        });
    }
    Ok(episodes)
}

/// Parse the server-listing fragment, grouped by the container type id
fn parse_server_fragment(fragment: &str) -> Result<Vec<MediaServer>> {
    let document = Html::parse_fragment(fragment);
    let group_chain = compile_selectors(&["div.server-items[data-id]"])?;
    let server_selector = compile_selectors(&["span.server[data-lid]"])?;

    let mut servers = Vec::new();
    for group in first_matching_set(&document, &group_chain) {
        let type_id = group.value().attr("data-id").unwrap_or_default().to_string();
        for server in server_selector
            .first()
            .map(|sel| group.select(sel).collect::<Vec<_>>())
            .unwrap_or_default()
        {
            servers.push(MediaServer {
                type_id: type_id.clone(),
                server_id: server.value().attr("data-lid").unwrap_or_default().to_string(),
                display_name: server.text().collect::<String>().trim().to_string(),
            });
        }
    }
    Ok(servers)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver_for(server: &MockServer) -> SiteResolver {
        let gateway = GatewayClient::new(
            GatewayConfig {
                base_url: server.uri(),
                ..Default::default()
            },
            "test-agent",
        )
        .unwrap();
        SiteResolver::new(
            SiteConfig {
                base_url: server.uri(),
                user_agent: "test-agent".to_string(),
            },
            Duration::from_secs(5),
            Arc::new(gateway),
        )
        .unwrap()
    }

    async fn mount_encode(server: &MockServer, text: &str, encoded: &str) {
        Mock::given(method("GET"))
            .and(path("/enc-kai"))
            .and(query_param("text", text))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": encoded
            })))
            .mount(server)
            .await;
    }

    // --- identity parsing ---

    #[test]
    fn identity_uses_primary_title_selector() {
        let html = r#"
            <div data-id="4567"></div>
            <div class="title-wrapper"><h1 class="title"><span title="Show Season 2">Show S2</span></h1></div>
        "#;
        let identity = parse_anime_identity(html).unwrap();
        assert_eq!(identity.id, "4567");
        assert_eq!(
            identity.title, "Show Season 2",
            "title attribute outranks element text"
        );
    }

    #[test]
    fn identity_falls_back_through_title_selectors() {
        let html = r#"
            <div data-id="1"></div>
            <h1 class="title">Fallback Title</h1>
        "#;
        assert_eq!(parse_anime_identity(html).unwrap().title, "Fallback Title");

        let html = r#"
            <div data-id="1"></div>
            <div class="anime-title">Last Resort</div>
        "#;
        assert_eq!(parse_anime_identity(html).unwrap().title, "Last Resort");
    }

    #[test]
    fn identity_defaults_title_to_unknown() {
        let html = r#"<div data-id="1"></div>"#;
        assert_eq!(parse_anime_identity(html).unwrap().title, "Unknown");
    }

    #[test]
    fn identity_without_data_id_is_a_parse_error() {
        let html = r#"<h1 class="title">No Id Here</h1>"#;
        let err = parse_anime_identity(html).unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "got {err:?}");
    }

    #[test]
    fn identity_title_is_sanitized() {
        let html = r#"
            <div data-id="1"></div>
            <h1 class="title">Re:Zero? Part/2</h1>
        "#;
        assert_eq!(parse_anime_identity(html).unwrap().title, "ReZero Part2");
    }

    // --- episode parsing ---

    #[test]
    fn episode_fragment_parses_tokens_and_language_flags() {
        let fragment = r#"
            <div class="eplist">
              <a num="2" token="tok-2" langs="3">Episode 2</a>
              <a num="1" token="tok-1" langs="1">Episode 1</a>
              <a num="1.5" token="tok-15" langs="0">Episode 1.5</a>
            </div>
        "#;
        let episodes = parse_episode_fragment(fragment).unwrap();
        assert_eq!(episodes.len(), 3);
        assert_eq!(episodes[0].display_id, "2");
        assert_eq!(episodes[0].access_token, "tok-2");
        assert_eq!(episodes[0].languages, LanguageAvailability::DubAndSub);
        assert_eq!(episodes[1].languages, LanguageAvailability::SubOnly);
        assert_eq!(episodes[2].languages, LanguageAvailability::None);
    }

    #[test]
    fn episode_fragment_handles_missing_attributes() {
        let fragment = r#"<div class="eplist"><a>Episode ?</a></div>"#;
        let episodes = parse_episode_fragment(fragment).unwrap();
        assert_eq!(episodes.len(), 1);
        assert_eq!(episodes[0].display_id, "");
        assert!(episodes[0].sort_key.is_malformed());
    }

    // --- server parsing ---

    #[test]
    fn server_fragment_groups_by_type() {
        let fragment = r#"
            <div class="server-items" data-id="sub">
              <span class="server" data-lid="101">Server 1</span>
              <span class="server" data-lid="102">Server 2</span>
            </div>
            <div class="server-items" data-id="softsub">
              <span class="server" data-lid="201">Server 1</span>
            </div>
        "#;
        let servers = parse_server_fragment(fragment).unwrap();
        assert_eq!(servers.len(), 3);
        assert_eq!(servers[0].type_id, "sub");
        assert_eq!(servers[0].server_id, "101");
        assert_eq!(servers[0].display_name, "Server 1");
        assert_eq!(servers[2].type_id, "softsub");
        assert_eq!(servers[2].server_id, "201");
    }

    // --- server choice cascade ---

    fn server(type_id: &str, id: &str, name: &str) -> MediaServer {
        MediaServer {
            type_id: type_id.to_string(),
            server_id: id.to_string(),
            display_name: name.to_string(),
        }
    }

    #[test]
    fn choose_server_prefers_exact_type_and_name() {
        let servers = vec![
            server("sub", "1", "Server 1"),
            server("softsub", "2", "Server 1"),
            server("softsub", "3", "Server 2"),
        ];
        let chosen = choose_server(&servers, SubtitleMode::SoftSub, "Server 1").unwrap();
        assert_eq!(chosen.server_id, "2");
    }

    #[test]
    fn choose_server_falls_back_to_name_substring() {
        // No softsub "Server 1" exists; name match alone wins over type match
        let servers = vec![
            server("sub", "1", "Server 1"),
            server("softsub", "2", "Server 2"),
        ];
        let chosen = choose_server(&servers, SubtitleMode::SoftSub, "Server 1").unwrap();
        assert_eq!(chosen.server_id, "1");
        assert_eq!(chosen.type_id, "sub");
    }

    #[test]
    fn choose_server_name_match_is_case_insensitive() {
        let servers = vec![server("dub", "9", "MegaUp Server")];
        let chosen = choose_server(&servers, SubtitleMode::SoftSub, "megaup").unwrap();
        assert_eq!(chosen.server_id, "9");
    }

    #[test]
    fn choose_server_falls_back_to_type_then_first() {
        let servers = vec![
            server("dub", "1", "Alpha"),
            server("softsub", "2", "Beta"),
        ];
        // Preferred name matches nothing; type wins
        let chosen = choose_server(&servers, SubtitleMode::SoftSub, "Gamma").unwrap();
        assert_eq!(chosen.server_id, "2");

        // Neither name nor type matches; first server wins
        let chosen = choose_server(&servers, SubtitleMode::HardSub, "Gamma").unwrap();
        assert_eq!(chosen.server_id, "1");
    }

    #[test]
    fn choose_server_returns_none_only_for_empty_input() {
        assert!(choose_server(&[], SubtitleMode::SoftSub, "Server 1").is_none());
    }

    // --- fetch + parse chains against a mock site ---

    #[tokio::test]
    async fn episodes_fetches_listing_and_sorts() {
        let server = MockServer::start().await;
        mount_encode(&server, "4567", "enc-4567").await;
        Mock::given(method("GET"))
            .and(path("/ajax/episodes/list"))
            .and(query_param("ani_id", "4567"))
            .and(query_param("_", "enc-4567"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": r#"<div class="eplist">
                    <a num="10" token="t10" langs="1">Episode 10</a>
                    <a num="2" token="t2" langs="3">Episode 2</a>
                    <a num="1.5" token="t15" langs="1">Episode 1.5</a>
                </div>"#
            })))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let episodes = resolver.episodes("4567").await.unwrap();
        let ids: Vec<_> = episodes.iter().map(|e| e.display_id.as_str()).collect();
        assert_eq!(ids, vec!["1.5", "2", "10"]);
    }

    #[tokio::test]
    async fn episodes_with_missing_result_is_a_parse_error() {
        let server = MockServer::start().await;
        mount_encode(&server, "1", "enc-1").await;
        Mock::given(method("GET"))
            .and(path("/ajax/episodes/list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let err = resolver.episodes("1").await.unwrap_err();
        assert!(matches!(err, Error::Parse(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn resolve_media_walks_the_full_chain() {
        let server = MockServer::start().await;

        mount_encode(&server, "srv-42", "enc-srv-42").await;
        Mock::given(method("GET"))
            .and(path("/ajax/links/view"))
            .and(query_param("id", "srv-42"))
            .and(query_param("_", "enc-srv-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "encoded-link-blob"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/dec-kai"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": { "url": format!("{}/e/iframe-token-9", server.uri()) }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/iframe-token-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "mega-token-blob"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/dec-mega"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": {
                    "sources": [{ "file": "https://cdn.invalid/stream.m3u8" }],
                    "tracks": [
                        { "kind": "captions", "file": "https://cdn.invalid/en.vtt", "label": "English" },
                        { "kind": "captions", "file": "https://cdn.invalid/preview.jpg", "label": "Broken" },
                        { "kind": "thumbnails", "file": "https://cdn.invalid/thumbs.vtt", "label": "Thumbs" }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let media = resolver.resolve_media("srv-42").await.unwrap();
        assert_eq!(media.media_url, "https://cdn.invalid/stream.m3u8");
        assert_eq!(
            media.subtitle_tracks,
            vec![SubtitleTrack {
                url: "https://cdn.invalid/en.vtt".to_string(),
                language_label: "English".to_string(),
            }],
            "only caption tracks with a subtitle extension survive"
        );
    }

    #[tokio::test]
    async fn resolve_media_fails_when_sources_are_empty() {
        let server = MockServer::start().await;

        mount_encode(&server, "srv-1", "enc-srv-1").await;
        Mock::given(method("GET"))
            .and(path("/ajax/links/view"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "encoded-link-blob"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/dec-kai"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": { "url": format!("{}/e/tok", server.uri()) }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/media/tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": "mega-token"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/dec-mega"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "result": { "sources": [], "tracks": [] }
            })))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let err = resolver.resolve_media("srv-1").await.unwrap_err();
        match err {
            Error::Parse(msg) => assert!(msg.contains("no playable source"), "got: {msg}"),
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn anime_identity_fetches_and_parses_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch/show-123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body>
                    <div data-id="123"></div>
                    <div class="title-wrapper"><h1 class="title"><span title="Show Season 2">Show</span></h1></div>
                </body></html>"#,
            ))
            .mount(&server)
            .await;

        let resolver = resolver_for(&server);
        let identity = resolver
            .anime_identity(&format!("{}/watch/show-123", server.uri()))
            .await
            .unwrap();
        assert_eq!(identity.id, "123");
        assert_eq!(identity.title, "Show Season 2");
    }
}
