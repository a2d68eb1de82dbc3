use crate::aggregator::SearchAggregator;
use crate::analysis::VisionAnalyzer;
use crate::planner::plan_queries;
use crate::types::{
    AnalysisRequest, AnalysisResult, FinderError, Phase, RankedResultSet, RequestAttempt, Result,
    RetryPolicy,
};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Receives a snapshot of the attempt state at every phase boundary and retry.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, attempt: &RequestAttempt);
}

impl<F> ProgressObserver for F
where
    F: Fn(&RequestAttempt) + Send + Sync,
{
    fn on_progress(&self, attempt: &RequestAttempt) {
        self(attempt)
    }
}

/// Observer that only writes progress to the log.
pub fn log_progress(attempt: &RequestAttempt) {
    match &attempt.last_error {
        Some(last_error) if attempt.phase == Phase::Analyzing => info!(
            "Submission {} (retry {}, last error: {})",
            attempt.phase, attempt.retry_count, last_error
        ),
        _ => info!("Submission {} (retry {})", attempt.phase, attempt.retry_count),
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub analysis: AnalysisResult,
    pub queries: Vec<String>,
    pub walkthroughs: RankedResultSet,
    pub retry_count: u32,
}

struct Session {
    generation: u64,
    active: Option<CancellationToken>,
    last_request: Option<Arc<AnalysisRequest>>,
    settled: Phase,
}

/// Drives one submission at a time through upload, analysis and search.
///
/// A new `submit` supersedes whatever is in flight: the older submission is
/// cancelled and resolves to [`FinderError::Cancelled`] without touching the
/// controller's state.
pub struct PipelineController {
    analyzer: Arc<dyn VisionAnalyzer>,
    aggregator: Arc<SearchAggregator>,
    policy: RetryPolicy,
    session: Mutex<Session>,
}

impl PipelineController {
    pub fn new(
        analyzer: Arc<dyn VisionAnalyzer>,
        aggregator: Arc<SearchAggregator>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            analyzer,
            aggregator,
            policy,
            session: Mutex::new(Session {
                generation: 0,
                active: None,
                last_request: None,
                settled: Phase::Idle,
            }),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Terminal phase of the most recent submission that was not superseded,
    /// or `Idle` while one is in flight.
    pub fn settled_phase(&self) -> Phase {
        self.lock_session().settled
    }

    pub fn can_retry(&self) -> bool {
        let session = self.lock_session();
        session.settled == Phase::Failed && session.last_request.is_some()
    }

    pub async fn submit(
        &self,
        request: AnalysisRequest,
        observer: &dyn ProgressObserver,
    ) -> Result<PipelineOutcome> {
        let request = Arc::new(request);
        let (generation, token) = self.begin(request.clone());
        self.run(request, generation, token, observer).await
    }

    /// Re-run the last failed submission from the start with a fresh retry count.
    pub async fn retry(&self, observer: &dyn ProgressObserver) -> Result<PipelineOutcome> {
        // Check and restart under one lock; a submit may race us otherwise.
        let (request, generation, token) = {
            let mut session = self.lock_session();
            if session.settled != Phase::Failed {
                return Err(FinderError::NothingToRetry);
            }
            let request = session.last_request.clone().ok_or(FinderError::NothingToRetry)?;
            let (generation, token) = begin_locked(&mut session, request.clone());
            (request, generation, token)
        };

        info!("Manual retry of failed submission");
        self.run(request, generation, token, observer).await
    }

    /// Cancel the in-flight submission, if any.
    pub fn cancel(&self) {
        let mut session = self.lock_session();
        if let Some(token) = session.active.take() {
            token.cancel();
            session.generation += 1;
            info!("Cancelled in-flight submission");
        }
    }

    fn lock_session(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self, request: Arc<AnalysisRequest>) -> (u64, CancellationToken) {
        begin_locked(&mut self.lock_session(), request)
    }

    fn settle(&self, generation: u64, phase: Phase) {
        let mut session = self.lock_session();
        if session.generation == generation {
            session.settled = phase;
            session.active = None;
        }
    }

    async fn run(
        &self,
        request: Arc<AnalysisRequest>,
        generation: u64,
        token: CancellationToken,
        observer: &dyn ProgressObserver,
    ) -> Result<PipelineOutcome> {
        let span = info_span!(
            "submission",
            attempt_id = %Uuid::new_v4(),
            started_at = %Utc::now().to_rfc3339(),
            media_type = %request.media_type,
        );

        async move {
            let mut attempt = RequestAttempt::new();
            publish(&mut attempt, Phase::Uploading, observer);

            let analysis = match self.analyze_with_retry(&request, &token, &mut attempt, observer).await {
                Ok(analysis) => analysis,
                Err(FinderError::Cancelled) => {
                    info!("Submission cancelled during analysis");
                    return Err(FinderError::Cancelled);
                }
                Err(e) => return Err(self.fail(generation, &mut attempt, e, observer)),
            };

            if token.is_cancelled() {
                return Err(FinderError::Cancelled);
            }

            publish(&mut attempt, Phase::Searching, observer);
            let queries = plan_queries(&analysis);
            let walkthroughs = self.aggregator.search(&queries).await;

            if token.is_cancelled() {
                info!("Submission superseded during search, discarding results");
                return Err(FinderError::Cancelled);
            }

            publish(&mut attempt, Phase::Done, observer);
            self.settle(generation, Phase::Done);
            info!(
                "Submission done: '{}' with {} walkthroughs after {} retries",
                analysis.game_name(),
                walkthroughs.len(),
                attempt.retry_count
            );

            Ok(PipelineOutcome {
                analysis,
                queries,
                walkthroughs,
                retry_count: attempt.retry_count,
            })
        }
        .instrument(span)
        .await
    }

    async fn analyze_with_retry(
        &self,
        request: &AnalysisRequest,
        token: &CancellationToken,
        attempt: &mut RequestAttempt,
        observer: &dyn ProgressObserver,
    ) -> Result<AnalysisResult> {
        loop {
            // After a retry the observer has already seen this attempt in Analyzing.
            if attempt.phase != Phase::Analyzing {
                publish(attempt, Phase::Analyzing, observer);
            }

            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(FinderError::Cancelled),
                outcome = tokio::time::timeout(self.policy.analyze_timeout, self.analyzer.analyze(request)) => outcome,
            };

            let failure = match outcome {
                Ok(Ok(analysis)) => return Ok(analysis),
                Ok(Err(e)) if !e.is_retryable() => return Err(e),
                Ok(Err(e)) => e,
                Err(_) => FinderError::Timeout(self.policy.analyze_timeout),
            };

            if attempt.retry_count >= self.policy.max_auto_retries {
                return Err(FinderError::RetriesExhausted {
                    attempts: attempt.retry_count + 1,
                    last_error: failure.to_string(),
                });
            }

            attempt.retry_count += 1;
            attempt.last_error = Some(failure.to_string());
            warn!(
                "Analysis attempt {} failed ({}), retrying in {:?}",
                attempt.retry_count, failure, self.policy.retry_delay
            );
            observer.on_progress(attempt);

            tokio::select! {
                biased;
                _ = token.cancelled() => return Err(FinderError::Cancelled),
                _ = tokio::time::sleep(self.policy.retry_delay) => {}
            }
        }
    }

    fn fail(
        &self,
        generation: u64,
        attempt: &mut RequestAttempt,
        error: FinderError,
        observer: &dyn ProgressObserver,
    ) -> FinderError {
        error!("Submission failed: {}", error);
        attempt.last_error = Some(error.to_string());
        publish(attempt, Phase::Failed, observer);
        self.settle(generation, Phase::Failed);
        error
    }
}

fn begin_locked(session: &mut Session, request: Arc<AnalysisRequest>) -> (u64, CancellationToken) {
    if let Some(previous) = session.active.take() {
        previous.cancel();
        info!("New submission supersedes the one in flight");
    }

    let token = CancellationToken::new();
    session.generation += 1;
    session.active = Some(token.clone());
    session.last_request = Some(request);
    session.settled = Phase::Idle;
    (session.generation, token)
}

fn publish(attempt: &mut RequestAttempt, phase: Phase, observer: &dyn ProgressObserver) {
    if attempt.enter(phase) {
        debug!("Entering phase {}", phase);
        observer.on_progress(attempt);
    } else {
        warn!("Ignoring phase transition {} -> {}", attempt.phase, phase);
    }
}
