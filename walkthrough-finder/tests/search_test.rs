mod common;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use common::{init_tracing, spawn_stub};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use walkthrough_finder::types::*;
use walkthrough_finder::{VideoSearch, YouTubeSearchClient};

fn search_config(endpoint: &str) -> SearchConfig {
    SearchConfig {
        api_key: Some("yt-key".to_string()),
        endpoint: endpoint.to_string(),
        timeout_seconds: 5,
        retry_delay_ms: 10,
        ..Default::default()
    }
}

fn page() -> Value {
    json!({
        "kind": "youtube#searchListResponse",
        "items": [
            {
                "id": {"kind": "youtube#video", "videoId": "abc123"},
                "snippet": {
                    "title": "Hollow Knight &amp; Friends: False Knight",
                    "channelTitle": "Fextralife",
                    "thumbnails": {
                        "default": {"url": "https://i.ytimg.com/vi/abc123/default.jpg"},
                        "high": {"url": "https://i.ytimg.com/vi/abc123/hqdefault.jpg"}
                    }
                }
            },
            {
                "id": {"kind": "youtube#channel", "channelId": "UCxyz"},
                "snippet": {"title": "A channel", "channelTitle": "A channel", "thumbnails": {}}
            },
            {
                "id": {"kind": "youtube#video", "videoId": "def456"},
                "snippet": {"title": "Crossroads guide", "channelTitle": "Guides"}
            }
        ]
    })
}

#[tokio::test]
async fn parses_videos_and_sends_expected_query() {
    init_tracing();
    let params = Arc::new(Mutex::new(HashMap::new()));
    let recorded = params.clone();
    let app = Router::new().route(
        "/youtube/v3/search",
        get(move |Query(query): Query<HashMap<String, String>>| {
            let recorded = recorded.clone();
            async move {
                *recorded.lock().unwrap() = query;
                Json(page())
            }
        }),
    );
    let endpoint = spawn_stub(app).await;
    let client = YouTubeSearchClient::new(search_config(&endpoint)).unwrap();

    let videos = client.search("hollow knight false knight").await.unwrap();

    assert_eq!(videos.len(), 2);
    assert_eq!(videos[0].video_id, "abc123");
    assert_eq!(videos[0].title, "Hollow Knight & Friends: False Knight");
    assert_eq!(videos[0].channel_title, "Fextralife");
    assert_eq!(videos[0].thumbnail_url, "https://i.ytimg.com/vi/abc123/hqdefault.jpg");
    assert_eq!(videos[1].video_id, "def456");
    assert_eq!(videos[1].thumbnail_url, "https://i.ytimg.com/vi/def456/hqdefault.jpg");

    let params = params.lock().unwrap();
    assert_eq!(params["q"], "hollow knight false knight");
    assert_eq!(params["part"], "snippet");
    assert_eq!(params["type"], "video");
    assert_eq!(params["maxResults"], "5");
    assert_eq!(params["order"], "relevance");
    assert_eq!(params["videoDuration"], "medium");
    assert_eq!(params["key"], "yt-key");
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    init_tracing();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/youtube/v3/search",
        get(move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                (StatusCode::FORBIDDEN, Json(json!({"error": {"code": 403}})))
            }
        }),
    );
    let endpoint = spawn_stub(app).await;
    let client = YouTubeSearchClient::new(search_config(&endpoint)).unwrap();

    let error = client.search("anything").await.unwrap_err();

    assert!(matches!(error, FinderError::SearchUnavailable(_)));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn server_errors_are_retried_once() {
    init_tracing();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let app = Router::new().route(
        "/youtube/v3/search",
        get(move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    (StatusCode::SERVICE_UNAVAILABLE, Json(json!({})))
                } else {
                    (StatusCode::OK, Json(page()))
                }
            }
        }),
    );
    let endpoint = spawn_stub(app).await;
    let client = YouTubeSearchClient::new(search_config(&endpoint)).unwrap();

    let videos = client.search("anything").await.unwrap();

    assert_eq!(videos.len(), 2);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn missing_key_is_unconfigured() {
    let client = YouTubeSearchClient::new(SearchConfig::default()).unwrap();
    assert!(!client.is_configured());
    assert!(matches!(
        client.search("anything").await,
        Err(FinderError::SearchUnavailable(_))
    ));
}
