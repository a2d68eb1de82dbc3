#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;
use walkthrough_finder::types::*;
use walkthrough_finder::{SearchAggregator, VideoSearch, VisionAnalyzer};

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "walkthrough_finder=debug".into()),
            )
            .with_test_writer()
            .init();
    });
}

/// Smallest PNG header; the pipeline never decodes pixels.
pub fn png_bytes() -> Vec<u8> {
    vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0]
}

pub fn png_request() -> AnalysisRequest {
    AnalysisRequest::new(png_bytes(), MediaType::Png)
}

pub fn video(id: &str) -> VideoResult {
    VideoResult {
        title: format!("Walkthrough {}", id),
        video_id: id.to_string(),
        thumbnail_url: format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id),
        channel_title: "Guides".to_string(),
    }
}

pub fn flat_analysis(game: &str, queries: &[&str]) -> AnalysisResult {
    AnalysisResult::Flat(FlatAnalysis {
        game_name: game.to_string(),
        context: "Forgotten Crossroads, near the first bench".to_string(),
        suggestions: vec!["Head left past the Gruz Mother".to_string()],
        search_queries: queries.iter().map(|q| q.to_string()).collect(),
    })
}

/// One scripted reply from [`ScriptedAnalyzer`].
pub enum Step {
    Reply(AnalysisResult),
    Fail(FinderError),
    /// Never answers, so the caller's timeout fires.
    Hang,
    /// Answers after a delay.
    Delayed(Duration, AnalysisResult),
}

/// Vision analyzer that plays back a fixed script, one step per call.
pub struct ScriptedAnalyzer {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedAnalyzer {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisionAnalyzer for ScriptedAnalyzer {
    fn analyzer_name(&self) -> String {
        "scripted".to_string()
    }

    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(result)) => Ok(result),
            Some(Step::Fail(error)) => Err(error),
            Some(Step::Hang) => std::future::pending().await,
            Some(Step::Delayed(delay, result)) => {
                tokio::time::sleep(delay).await;
                Ok(result)
            }
            None => Err(FinderError::Upstream {
                status: 500,
                message: "script exhausted".to_string(),
            }),
        }
    }
}

/// Search service answering from a fixed query table.
pub struct FakeSearch {
    configured: bool,
    answers: HashMap<String, Result<Vec<VideoResult>>>,
    delays: HashMap<String, Duration>,
    queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn new() -> Self {
        Self {
            configured: true,
            answers: HashMap::new(),
            delays: HashMap::new(),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::new()
        }
    }

    pub fn answer(mut self, query: &str, ids: &[&str]) -> Self {
        self.answers
            .insert(query.to_string(), Ok(ids.iter().map(|id| video(id)).collect()));
        self
    }

    /// Hold back the answer for `query` by `delay`.
    pub fn delay(mut self, query: &str, delay: Duration) -> Self {
        self.delays.insert(query.to_string(), delay);
        self
    }

    pub fn fail(mut self, query: &str) -> Self {
        self.answers.insert(
            query.to_string(),
            Err(FinderError::SearchUnavailable("HTTP 403: Forbidden".to_string())),
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoSearch for FakeSearch {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn search(&self, query: &str) -> Result<Vec<VideoResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        if let Some(delay) = self.delays.get(query) {
            tokio::time::sleep(*delay).await;
        }
        match self.answers.get(query) {
            Some(Ok(videos)) => Ok(videos.clone()),
            Some(Err(e)) => Err(FinderError::SearchUnavailable(e.to_string())),
            None => Ok(Vec::new()),
        }
    }
}

pub fn aggregator(search: Arc<FakeSearch>) -> Arc<SearchAggregator> {
    Arc::new(SearchAggregator::new(search))
}

/// Serve `app` on an ephemeral local port and return its base URL.
pub async fn spawn_stub(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}
