use crate::types::{FinderError, Result, SearchConfig, VideoResult};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::Client;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use url::Url;

/// One search-service lookup: a query in, that query's videos out in the
/// service's relevance order.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// False when no credential is available; callers must not issue requests then.
    fn is_configured(&self) -> bool;

    async fn search(&self, query: &str) -> Result<Vec<VideoResult>>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
struct ItemId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(rename = "channelTitle", default)]
    channel_title: String,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
    standard: Option<Thumbnail>,
    maxres: Option<Thumbnail>,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

impl Thumbnails {
    fn best(&self) -> Option<&str> {
        [&self.maxres, &self.standard, &self.high, &self.medium, &self.default]
            .into_iter()
            .flatten()
            .map(|thumbnail| thumbnail.url.as_str())
            .find(|url| !url.is_empty())
    }
}

impl SearchItem {
    fn into_video(self) -> Option<VideoResult> {
        // Channel and playlist hits carry no videoId.
        let video_id = self.id.video_id.filter(|id| !id.is_empty())?;
        let snippet = self.snippet?;
        let thumbnail_url = snippet
            .thumbnails
            .best()
            .map(str::to_string)
            .unwrap_or_else(|| format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id));

        Some(VideoResult {
            title: unescape_html(&snippet.title),
            video_id,
            thumbnail_url,
            channel_title: unescape_html(&snippet.channel_title),
        })
    }
}

/// YouTube Data API v3 search client.
pub struct YouTubeSearchClient {
    client: Client,
    config: SearchConfig,
}

impl YouTubeSearchClient {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()
            .map_err(|e| FinderError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    fn search_url(&self, query: &str, api_key: &str) -> Result<Url> {
        let base = format!("{}/youtube/v3/search", self.config.endpoint.trim_end_matches('/'));
        let page_size = self.config.page_size.to_string();
        Url::parse_with_params(
            &base,
            &[
                ("part", "snippet"),
                ("q", query),
                ("type", "video"),
                ("maxResults", page_size.as_str()),
                ("order", "relevance"),
                ("videoDuration", "medium"),
                ("key", api_key),
            ],
        )
        .map_err(|e| FinderError::Config(format!("invalid search endpoint '{}': {}", base, e)))
    }

    async fn fetch_page(&self, url: &Url) -> Result<Vec<VideoResult>> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status.is_server_error() {
            return Err(FinderError::TransientNetwork(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }
        if !status.is_success() {
            return Err(FinderError::SearchUnavailable(format!(
                "HTTP {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        let page: SearchResponse = response
            .json()
            .await
            .map_err(|e| FinderError::MalformedResponse(format!("search payload: {}", e)))?;

        Ok(page.items.into_iter().filter_map(SearchItem::into_video).collect())
    }
}

#[async_trait]
impl VideoSearch for YouTubeSearchClient {
    fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    async fn search(&self, query: &str) -> Result<Vec<VideoResult>> {
        let api_key = self.config.api_key.as_deref().ok_or_else(|| {
            FinderError::SearchUnavailable("search API key is not configured".to_string())
        })?;
        let url = self.search_url(query, api_key)?;
        let start_time = Instant::now();

        let retry_delay = Duration::from_millis(self.config.retry_delay_ms);
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: retry_delay,
            initial_interval: retry_delay,
            max_interval: retry_delay * 8,
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.timeout_seconds)),
            ..Default::default()
        };

        let mut attempt = 0;
        loop {
            match self.fetch_page(&url).await {
                Ok(videos) => {
                    debug!(
                        "Search '{}' returned {} videos in {}ms",
                        query,
                        videos.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(videos);
                }
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let Some(delay) = backoff.next_backoff() else {
                        return Err(e);
                    };
                    attempt += 1;
                    warn!("Search '{}' attempt {} failed ({}), retrying in {:?}", query, attempt, e, delay);
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn unescape_html(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
