//! The video entity (spec §3): the durable record of a rendered artifact.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a video row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Video status. Transitions monotonically from `processing` (spec §3
/// "Ownership and lifecycle").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    #[default]
    Processing,
    Completed,
    Failed,
    Deleted,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::Processing => "processing",
            VideoStatus::Completed => "completed",
            VideoStatus::Failed => "failed",
            VideoStatus::Deleted => "deleted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, VideoStatus::Completed | VideoStatus::Failed | VideoStatus::Deleted)
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The `videos` row. Queries against this type MUST filter by the
/// authenticated `user_id`; the metadata store is the source of truth for
/// listings (spec §3, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Video {
    pub video_id: VideoId,
    pub user_id: String,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<i32>,
    pub status: VideoStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Video {
    /// Create a new `processing` video row, as done on the
    /// `queued -> llm_generating` transition (spec §4.9).
    pub fn new_processing(user_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            video_id: VideoId::new(),
            user_id: user_id.into(),
            prompt: prompt.into(),
            object_key: None,
            file_size: None,
            duration_s: None,
            width: None,
            height: None,
            status: VideoStatus::Processing,
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply the file metadata recorded on the `persisting -> completed`
    /// transition.
    pub fn mark_completed(
        &mut self,
        object_key: impl Into<String>,
        file_size: i64,
        duration_s: f64,
        width: i32,
        height: i32,
    ) {
        self.object_key = Some(object_key.into());
        self.file_size = Some(file_size);
        self.duration_s = Some(duration_s);
        self.width = Some(width);
        self.height = Some(height);
        self.status = VideoStatus::Completed;
        self.updated_at = Utc::now();
    }

    pub fn mark_failed(&mut self) {
        self.status = VideoStatus::Failed;
        self.updated_at = Utc::now();
    }

    pub fn mark_deleted(&mut self) {
        self.status = VideoStatus::Deleted;
        self.updated_at = Utc::now();
    }

    /// Whether `candidate_user` is authorized to read or mutate this row.
    /// Row-level isolation is also enforced at the query layer
    /// (`animathic-db`); this is the in-process mirror of that check.
    pub fn is_owned_by(&self, candidate_user: &str) -> bool {
        self.user_id == candidate_user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_video_is_processing() {
        let video = Video::new_processing("user-1", "a red square");
        assert_eq!(video.status, VideoStatus::Processing);
        assert!(video.object_key.is_none());
    }

    #[test]
    fn mark_completed_fills_metadata() {
        let mut video = Video::new_processing("user-1", "prompt");
        video.mark_completed("user-1/01H.mp4", 204800, 2.5, 1280, 720);
        assert_eq!(video.status, VideoStatus::Completed);
        assert_eq!(video.width, Some(1280));
        assert_eq!(video.object_key.as_deref(), Some("user-1/01H.mp4"));
    }

    #[test]
    fn ownership_check() {
        let video = Video::new_processing("user-1", "prompt");
        assert!(video.is_owned_by("user-1"));
        assert!(!video.is_owned_by("user-2"));
    }
}
