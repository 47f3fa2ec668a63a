//! crates/zyndle_core/src/domain.rs
//!
//! Defines the pure, core data structures for the client.
//! These structs are independent of the wire format used by the backend;
//! `api.rs` converts the per-endpoint payloads into them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The signed-in user as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: String,
}

// Bearer token plus the identity it belongs to. Only AuthGate hands this out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

/// A single chapter of an analyzed video.
#[derive(Debug, Clone, PartialEq)]
pub struct Chapter {
    pub title: String,
    pub start_secs: u64,
    pub end_secs: u64,
    pub description: String,
}

impl Chapter {
    /// Chapter heading as shown in the workspace, e.g. `"0:00 Intro"`.
    pub fn label(&self) -> String {
        format!("{} {}", format_timestamp(self.start_secs), self.title)
    }
}

/// Everything `/analyze` returns for one video.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoAnalysis {
    pub video_id: String,
    pub title: String,
    pub channel: String,
    pub duration: String,
    pub summary: String,
    pub transcript: String,
    pub chapters: Vec<Chapter>,
    pub thumbnail: Option<String>,
    pub view_count: Option<String>,
    pub like_count: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

/// Delivery state of a user-authored chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sending,
    Sent,
    Failed,
}

/// One entry of the append-only chat log.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    /// Only user entries carry a delivery status.
    pub status: Option<DeliveryStatus>,
    /// For assistant entries, the user entry being answered.
    pub reply_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Answer to a chat question.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatAnswer {
    pub answer: String,
    pub sources: Vec<String>,
    pub confidence: Option<String>,
}

/// A multiple-choice question. Immutable once fetched.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizQuestion {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: usize,
    pub explanation: String,
}

/// A user note attached to a video. The id is always server-assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: i64,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub kind: String,
    pub title: Option<String>,
    pub score: Option<f64>,
    pub date: String,
    pub description: Option<String>,
}

/// Counters and recent activity shown on the progress screen.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProgressSummary {
    pub total_videos_watched: u64,
    pub total_quizzes_taken: u64,
    pub average_quiz_score: f64,
    pub recent_videos: u64,
    pub recent_quizzes: u64,
    pub learning_streak: u64,
    pub total_learning_time: u64,
    pub favorite_topics: Vec<String>,
    pub recent_activity: Vec<ActivityEntry>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct LearningInsights {
    pub learning_style: String,
    pub favorite_topics: Vec<String>,
    pub weak_areas: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Renders an offset in seconds as `m:ss`, or `h:mm:ss` past the hour.
pub fn format_timestamp(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}
