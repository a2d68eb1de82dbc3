use crate::types::{AnalysisResult, MAX_QUERIES};
use tracing::debug;

/// Queries the aggregator should run for `analysis`, in the order given by
/// the vision service. Never empty.
pub fn plan_queries(analysis: &AnalysisResult) -> Vec<String> {
    let queries: Vec<String> = analysis
        .search_queries()
        .iter()
        .map(|query| query.trim())
        .filter(|query| !query.is_empty())
        .take(MAX_QUERIES)
        .map(str::to_string)
        .collect();

    if !queries.is_empty() {
        return queries;
    }

    let fallback = fallback_query(analysis);
    debug!("No usable search queries from analysis, falling back to '{}'", fallback);
    vec![fallback]
}

/// `"<game> walkthrough"`, plus the mission name when one was identified.
pub fn fallback_query(analysis: &AnalysisResult) -> String {
    let base = format!("{} walkthrough", analysis.game_name().trim());
    match analysis.mission().map(|mission| mission.name.trim()) {
        Some(name) if !name.is_empty() => format!("{} {}", base, name),
        _ => base,
    }
}
