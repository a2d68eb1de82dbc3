mod common;

use common::{init_tracing, video, FakeSearch};
use std::sync::Arc;
use std::time::Duration;
use walkthrough_finder::types::*;
use walkthrough_finder::SearchAggregator;

fn queries(list: &[&str]) -> Vec<String> {
    list.iter().map(|q| q.to_string()).collect()
}

#[tokio::test]
async fn merges_in_query_order_without_duplicates() {
    init_tracing();
    let search = Arc::new(
        FakeSearch::new()
            .answer("hollow knight crossroads", &["A", "B", "C"])
            .answer("hollow knight false knight", &["C", "D", "E"]),
    );
    let aggregator = SearchAggregator::new(search.clone());

    let merged = aggregator
        .search(&queries(&["hollow knight crossroads", "hollow knight false knight"]))
        .await;

    assert_eq!(merged.video_ids(), vec!["A", "B", "C", "D", "E"]);
    assert_eq!(search.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn merge_follows_query_order_not_completion_order() {
    init_tracing();
    let search = Arc::new(
        FakeSearch::new()
            .answer("slow", &["A", "B"])
            .delay("slow", Duration::from_millis(200))
            .answer("fast", &["B", "C"]),
    );

    let merged = SearchAggregator::new(search).search(&queries(&["slow", "fast"])).await;

    assert_eq!(merged.video_ids(), vec!["A", "B", "C"]);
    assert_eq!(merged.first(), Some(&video("A")));
}

#[tokio::test]
async fn stops_at_the_cap() {
    init_tracing();
    let search = Arc::new(
        FakeSearch::new()
            .answer("q1", &["A", "B", "C"])
            .answer("q2", &["D", "E", "F"]),
    );

    let merged = SearchAggregator::new(search.clone()).search(&queries(&["q1", "q2"])).await;
    assert_eq!(merged.video_ids(), vec!["A", "B", "C", "D", "E"]);

    let single = SearchAggregator::new(search).with_cap(1).search(&queries(&["q1", "q2"])).await;
    assert_eq!(single.video_ids(), vec!["A"]);
}

#[tokio::test]
async fn first_occurrence_wins() {
    init_tracing();
    let search = Arc::new(FakeSearch::new().answer("q1", &["A"]).answer("q2", &["A", "B"]));

    let merged = SearchAggregator::new(search).search(&queries(&["q1", "q2"])).await;

    assert_eq!(merged.video_ids(), vec!["A", "B"]);
    assert_eq!(merged.first(), Some(&video("A")));
}

#[tokio::test]
async fn failed_queries_are_skipped() {
    init_tracing();
    let search = Arc::new(FakeSearch::new().fail("q1").answer("q2", &["B", "C"]));

    let merged = SearchAggregator::new(search.clone()).search(&queries(&["q1", "q2"])).await;

    assert_eq!(merged.video_ids(), vec!["B", "C"]);
    assert_eq!(search.calls(), 2);
}

#[tokio::test]
async fn all_failures_yield_empty() {
    init_tracing();
    let search = Arc::new(FakeSearch::new().fail("q1").fail("q2"));

    let merged = SearchAggregator::new(search).search(&queries(&["q1", "q2"])).await;
    assert!(merged.is_empty());
}

#[tokio::test]
async fn unconfigured_search_makes_no_calls() {
    init_tracing();
    let search = Arc::new(FakeSearch::unconfigured().answer("q1", &["A"]));
    let aggregator = SearchAggregator::new(search.clone());

    assert!(!aggregator.is_configured());
    let merged = aggregator.search(&queries(&["q1"])).await;

    assert!(merged.is_empty());
    assert_eq!(search.calls(), 0);
}

#[tokio::test]
async fn only_the_first_five_queries_run() {
    init_tracing();
    let search = Arc::new(FakeSearch::new());
    let aggregator = SearchAggregator::new(search.clone());

    aggregator
        .search(&queries(&["a", "b", "c", "d", "e", "f", "g"]))
        .await;

    let mut seen = search.queries();
    seen.sort();
    assert_eq!(seen, vec!["a", "b", "c", "d", "e"]);
    assert_eq!(aggregator.cap(), DEFAULT_RESULT_CAP);
}
