use crate::search::VideoSearch;
use crate::types::{RankedResultSet, DEFAULT_RESULT_CAP, MAX_QUERIES};
use futures::stream::{FuturesOrdered, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Fans a query list out to the search service and merges the answers into
/// one deduplicated, capped list.
pub struct SearchAggregator {
    search: Arc<dyn VideoSearch>,
    cap: usize,
}

impl SearchAggregator {
    pub fn new(search: Arc<dyn VideoSearch>) -> Self {
        Self {
            search,
            cap: DEFAULT_RESULT_CAP,
        }
    }

    /// `cap = 1` gives the single best-match behaviour.
    pub fn with_cap(mut self, cap: usize) -> Self {
        self.cap = cap;
        self
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn is_configured(&self) -> bool {
        self.search.is_configured()
    }

    /// Run every query concurrently and merge in query order.
    ///
    /// Failures are absorbed: a failed query contributes nothing, and if all
    /// of them fail the result is simply empty.
    pub async fn search(&self, queries: &[String]) -> RankedResultSet {
        let mut merged = RankedResultSet::with_cap(self.cap);

        if !self.search.is_configured() {
            warn!("Search service not configured, skipping walkthrough lookup");
            return merged;
        }
        if queries.is_empty() || self.cap == 0 {
            return merged;
        }

        let start_time = Instant::now();
        let queries = &queries[..queries.len().min(MAX_QUERIES)];

        // Ordered futures poll concurrently but yield in submission order.
        let mut pending: FuturesOrdered<_> = queries
            .iter()
            .map(|query| async move { (query.as_str(), self.search.search(query).await) })
            .collect();

        let mut completed = 0;
        let mut failed = 0;

        while let Some((query, outcome)) = pending.next().await {
            completed += 1;
            match outcome {
                Ok(videos) => {
                    let found = videos.len();
                    let mut added = 0;
                    for video in videos {
                        if merged.offer(video) {
                            added += 1;
                        }
                    }
                    debug!("Query '{}': {} videos, {} new", query, found, added);
                }
                Err(e) => {
                    failed += 1;
                    warn!("Query '{}' failed, skipping: {}", query, e);
                }
            }

            if merged.is_full() {
                // Dropping `pending` abandons whatever is still in flight.
                debug!("Result cap of {} reached after {} queries", self.cap, completed);
                break;
            }
        }

        if failed == queries.len() {
            warn!("All {} search queries failed, returning no walkthroughs", failed);
        }

        info!(
            "Merged {} walkthroughs from {}/{} queries in {}ms",
            merged.len(),
            completed - failed,
            queries.len(),
            start_time.elapsed().as_millis()
        );
        merged
    }
}
