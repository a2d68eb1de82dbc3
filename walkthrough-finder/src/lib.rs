pub mod types;
pub mod config;
pub mod prompts;
pub mod analysis;
pub mod planner;
pub mod search;
pub mod aggregator;
pub mod controller;
pub mod server;

pub use types::*;
pub use config::FinderConfig;
pub use analysis::{ClaudeVisionClient, VisionAnalyzer};
pub use planner::plan_queries;
pub use search::{VideoSearch, YouTubeSearchClient};
pub use aggregator::SearchAggregator;
pub use controller::{log_progress, PipelineController, PipelineOutcome, ProgressObserver};
pub use server::AppState;
