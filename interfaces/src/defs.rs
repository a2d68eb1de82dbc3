use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Game name the vision service reports when it cannot identify the game.
pub const UNKNOWN_GAME: &str = "Unknown Game";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaType {
    #[serde(rename = "image/jpeg")]
    Jpeg,
    #[serde(rename = "image/png")]
    Png,
    #[serde(rename = "image/gif")]
    Gif,
    #[serde(rename = "image/webp")]
    Webp,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported media type: {0}")]
pub struct UnsupportedMediaType(pub String);

impl MediaType {
    pub const ALL: [MediaType; 4] = [Self::Jpeg, Self::Png, Self::Gif, Self::Webp];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
        }
    }

    /// Map a file extension (without the dot) onto the allow-list.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }
}

impl FromStr for MediaType {
    type Err = UnsupportedMediaType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|media_type| media_type.as_str() == normalized)
            .ok_or_else(|| UnsupportedMediaType(s.to_string()))
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One user submission: the raw screenshot and its declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub image: Vec<u8>,
    pub media_type: MediaType,
}

impl AnalysisRequest {
    pub fn new(image: Vec<u8>, media_type: MediaType) -> Self {
        Self { image, media_type }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionKind {
    Mission,
    Level,
    Boss,
    Area,
    Puzzle,
    Quest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MissionKind,
    #[serde(default)]
    pub objective: String,
}

/// Mission-structured response schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionAnalysis {
    pub game_name: String,
    #[serde(default)]
    pub mission: Option<MissionInfo>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub tips: Vec<String>,
    #[serde(default)]
    pub search_queries: Vec<String>,
}

/// Flat context/suggestions response schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlatAnalysis {
    pub game_name: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub search_queries: Vec<String>,
}

/// Structured description of a screenshot, in whichever schema the vision
/// service was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisResult {
    Mission(MissionAnalysis),
    Flat(FlatAnalysis),
}

impl AnalysisResult {
    pub fn game_name(&self) -> &str {
        match self {
            Self::Mission(a) => &a.game_name,
            Self::Flat(a) => &a.game_name,
        }
    }

    pub fn mission(&self) -> Option<&MissionInfo> {
        match self {
            Self::Mission(a) => a.mission.as_ref(),
            Self::Flat(_) => None,
        }
    }

    /// Summary for the mission schema, context for the flat one.
    pub fn summary(&self) -> &str {
        match self {
            Self::Mission(a) => &a.summary,
            Self::Flat(a) => &a.context,
        }
    }

    /// Tips for the mission schema, suggestions for the flat one.
    pub fn tips(&self) -> &[String] {
        match self {
            Self::Mission(a) => &a.tips,
            Self::Flat(a) => &a.suggestions,
        }
    }

    pub fn search_queries(&self) -> &[String] {
        match self {
            Self::Mission(a) => &a.search_queries,
            Self::Flat(a) => &a.search_queries,
        }
    }

    pub fn is_unidentified(&self) -> bool {
        self.game_name() == UNKNOWN_GAME
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    pub title: String,
    pub video_id: String,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
    pub channel_title: String,
}

/// Ordered walkthrough list, unique by `video_id` and never longer than its cap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RankedResultSet {
    videos: Vec<VideoResult>,
    #[serde(skip)]
    seen: HashSet<String>,
    #[serde(skip)]
    cap: usize,
}

impl RankedResultSet {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            videos: Vec::with_capacity(cap),
            seen: HashSet::new(),
            cap,
        }
    }

    pub fn empty() -> Self {
        Self::with_cap(0)
    }

    /// Append `video` unless its id was already taken or the set is full.
    /// First occurrence wins.
    pub fn offer(&mut self, video: VideoResult) -> bool {
        if self.is_full() || self.seen.contains(&video.video_id) {
            return false;
        }
        self.seen.insert(video.video_id.clone());
        self.videos.push(video);
        true
    }

    pub fn is_full(&self) -> bool {
        self.videos.len() >= self.cap
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }

    pub fn first(&self) -> Option<&VideoResult> {
        self.videos.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VideoResult> {
        self.videos.iter()
    }

    pub fn video_ids(&self) -> Vec<&str> {
        self.videos.iter().map(|v| v.video_id.as_str()).collect()
    }

    pub fn into_vec(self) -> Vec<VideoResult> {
        self.videos
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Uploading,
    Analyzing,
    Searching,
    Done,
    Failed,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Uploading => 1,
            Self::Analyzing => 2,
            Self::Searching => 3,
            Self::Done | Self::Failed => 4,
        }
    }

    /// Phases only move forward within one attempt; terminal phases are final.
    pub fn can_enter(&self, next: Phase) -> bool {
        !self.is_terminal() && next.rank() >= self.rank()
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Analyzing => "analyzing",
            Self::Searching => "searching",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

// Progress state of one submission. Owned by whoever runs the submission and
// lent to observers; never shared between submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAttempt {
    pub phase: Phase,
    pub retry_count: u32,
    pub last_error: Option<String>,
}

impl RequestAttempt {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            retry_count: 0,
            last_error: None,
        }
    }

    /// Move to `next`; returns false (and stays put) on a backwards or
    /// post-terminal transition.
    pub fn enter(&mut self, next: Phase) -> bool {
        if !self.phase.can_enter(next) {
            return false;
        }
        self.phase = next;
        true
    }
}

impl Default for RequestAttempt {
    fn default() -> Self {
        Self::new()
    }
}
