//! crates/zyndle_core/src/api.rs
//!
//! Typed client for the study backend. Every endpoint has an explicit response
//! schema; a success body that does not match it fails fast with
//! `PortError::Decode` instead of leaking loosely-typed JSON into the core.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::auth::AuthGate;
use crate::domain::{
    ActivityEntry, Chapter, ChatAnswer, LearningInsights, Note, ProgressSummary, QuizQuestion,
    VideoAnalysis,
};
use crate::ports::{ApiRequest, ApiResponse, PortError, PortResult};

//=========================================================================================
// Status and Body Helpers
//=========================================================================================

/// Maps a non-success response to the error taxonomy.
///
/// 401 is handled by `AuthGate` before this is reached on authenticated calls.
pub(crate) fn error_for_status(response: &ApiResponse) -> PortError {
    let message = extract_message(response);
    match response.status {
        400..=499 => PortError::Validation(message),
        status => PortError::Server { status, message },
    }
}

/// Parses a success body into `T`, or maps the status to an error.
pub(crate) fn decode_body<T: DeserializeOwned>(response: &ApiResponse) -> PortResult<T> {
    if !response.is_success() {
        return Err(error_for_status(response));
    }
    serde_json::from_str(&response.body).map_err(|e| PortError::Decode(e.to_string()))
}

fn extract_message(response: &ApiResponse) -> String {
    let fallback = || {
        let text = response.body.trim();
        if text.is_empty() {
            format!("Request failed with status {}", response.status)
        } else {
            text.to_string()
        }
    };

    let Ok(value) = serde_json::from_str::<Value>(&response.body) else {
        return fallback();
    };
    match value.get("detail").or_else(|| value.get("message")) {
        Some(Value::String(detail)) => detail.clone(),
        // Request-validation errors arrive as a list of {loc, msg, type}.
        Some(Value::Array(items)) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(Value::as_str))
                .collect();
            if messages.is_empty() {
                fallback()
            } else {
                messages.join("; ")
            }
        }
        _ => fallback(),
    }
}

//=========================================================================================
// Wire Types
//=========================================================================================

/// A field the backend sends either as a string or as a number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Int(i64),
    Float(f64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s,
            Scalar::Int(i) => i.to_string(),
            Scalar::Float(f) => f.to_string(),
        }
    }
}

#[derive(Deserialize)]
struct AnalyzeRecord {
    title: String,
    channel: String,
    duration: Scalar,
    summary: String,
    transcript: String,
    #[serde(default)]
    chapters: Vec<ChapterRecord>,
    thumbnail: Option<String>,
    view_count: Option<Scalar>,
    like_count: Option<Scalar>,
}

#[derive(Deserialize)]
struct ChapterRecord {
    title: String,
    start: f64,
    end: f64,
    #[serde(default)]
    description: String,
}

impl ChapterRecord {
    fn to_domain(self) -> Chapter {
        Chapter {
            title: self.title,
            start_secs: self.start.max(0.0) as u64,
            end_secs: self.end.max(0.0) as u64,
            description: self.description,
        }
    }
}

#[derive(Deserialize)]
struct ChatRecord {
    answer: String,
    #[serde(default)]
    sources: Vec<String>,
    confidence: Option<String>,
}

#[derive(Deserialize)]
struct QuizRecord {
    questions: Vec<QuestionRecord>,
}

#[derive(Deserialize)]
struct QuestionRecord {
    question: String,
    options: Vec<String>,
    correct_answer: usize,
    #[serde(default)]
    explanation: String,
}

impl QuestionRecord {
    fn to_domain(self, index: usize) -> PortResult<QuizQuestion> {
        if self.correct_answer >= self.options.len() {
            return Err(PortError::Decode(format!(
                "question {} has correct_answer {} but only {} options",
                index,
                self.correct_answer,
                self.options.len()
            )));
        }
        Ok(QuizQuestion {
            prompt: self.question,
            options: self.options,
            correct_option: self.correct_answer,
            explanation: self.explanation,
        })
    }
}

#[derive(Deserialize)]
struct NoteRecord {
    id: i64,
    #[serde(default)]
    title: String,
    content: String,
}

impl NoteRecord {
    fn to_domain(self) -> Note {
        Note {
            id: self.id,
            title: self.title,
            content: self.content,
        }
    }
}

/// `/notes` answers either with a bare array or with `{ "notes": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum NotesRecord {
    Wrapped { notes: Vec<NoteRecord> },
    Bare(Vec<NoteRecord>),
}

#[derive(Deserialize)]
struct ProgressRecord {
    #[serde(default)]
    total_videos_watched: u64,
    #[serde(default)]
    total_quizzes_taken: u64,
    #[serde(default)]
    average_quiz_score: f64,
    #[serde(default)]
    recent_videos: Option<Value>,
    #[serde(default)]
    recent_quizzes: u64,
    #[serde(default)]
    learning_streak: u64,
    #[serde(default)]
    total_learning_time: u64,
    #[serde(default)]
    favorite_topics: Vec<String>,
    #[serde(default)]
    recent_activity: Vec<ActivityRecord>,
}

#[derive(Deserialize)]
struct ActivityRecord {
    #[serde(rename = "type")]
    kind: String,
    title: Option<String>,
    score: Option<f64>,
    #[serde(default)]
    date: String,
    description: Option<String>,
}

#[derive(Deserialize)]
struct InsightsRecord {
    #[serde(default)]
    learning_style: String,
    #[serde(default)]
    favorite_topics: Vec<String>,
    #[serde(default)]
    weak_areas: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
}

//=========================================================================================
// Request Context
//=========================================================================================

/// The video context sent with chat and quiz requests.
#[derive(Debug, Clone)]
pub struct VideoContext {
    pub video_id: String,
    pub title: String,
    pub transcript: String,
    pub summary: String,
}

impl VideoContext {
    pub fn from_analysis(analysis: &VideoAnalysis) -> Self {
        Self {
            video_id: analysis.video_id.clone(),
            title: analysis.title.clone(),
            transcript: analysis.transcript.clone(),
            summary: analysis.summary.clone(),
        }
    }
}

//=========================================================================================
// StudyApi
//=========================================================================================

/// Authenticated endpoint client. Every call goes through `AuthGate`.
pub struct StudyApi {
    auth: Arc<AuthGate>,
}

impl StudyApi {
    pub fn new(auth: Arc<AuthGate>) -> Self {
        Self { auth }
    }

    pub fn auth(&self) -> &Arc<AuthGate> {
        &self.auth
    }

    /// Runs the backend's download, transcription and summary pipeline for one URL.
    pub async fn analyze(&self, youtube_url: &str, video_id: &str) -> PortResult<VideoAnalysis> {
        info!(video_id, "Requesting video analysis.");
        let record: AnalyzeRecord = self
            .call(ApiRequest::post("/analyze", json!({ "youtube_url": youtube_url })))
            .await?;

        Ok(VideoAnalysis {
            video_id: video_id.to_string(),
            title: record.title,
            channel: record.channel,
            duration: record.duration.into_string(),
            summary: record.summary,
            transcript: record.transcript,
            chapters: record
                .chapters
                .into_iter()
                .map(ChapterRecord::to_domain)
                .collect(),
            thumbnail: record.thumbnail,
            view_count: record.view_count.map(Scalar::into_string),
            like_count: record.like_count.map(Scalar::into_string),
        })
    }

    pub async fn chat(&self, context: &VideoContext, question: &str) -> PortResult<ChatAnswer> {
        let record: ChatRecord = self
            .call(ApiRequest::post(
                "/chat",
                json!({
                    "question": question,
                    "video_id": context.video_id,
                    "transcript": context.transcript,
                    "summary": context.summary,
                    "title": context.title,
                }),
            ))
            .await?;
        Ok(ChatAnswer {
            answer: record.answer,
            sources: record.sources,
            confidence: record.confidence,
        })
    }

    pub async fn quiz(
        &self,
        context: &VideoContext,
        num_questions: usize,
    ) -> PortResult<Vec<QuizQuestion>> {
        let record: QuizRecord = self
            .call(ApiRequest::post(
                "/quiz",
                json!({
                    "video_id": context.video_id,
                    "transcript": context.transcript,
                    "summary": context.summary,
                    "title": context.title,
                    "num_questions": num_questions,
                }),
            ))
            .await?;
        record
            .questions
            .into_iter()
            .enumerate()
            .map(|(i, q)| q.to_domain(i))
            .collect()
    }

    pub async fn record_quiz_result(
        &self,
        video_id: &str,
        score: u32,
        total_questions: usize,
    ) -> PortResult<()> {
        let response = self
            .auth
            .authenticated_request(ApiRequest::post(
                "/progress/record-quiz",
                json!({
                    "video_id": video_id,
                    "score": score,
                    "total_questions": total_questions,
                }),
            ))
            .await?;
        if !response.is_success() {
            return Err(error_for_status(&response));
        }
        Ok(())
    }

    pub async fn list_notes(&self, video_id: &str) -> PortResult<Vec<Note>> {
        let record: NotesRecord = self
            .call(ApiRequest::get("/notes").with_query("video_id", video_id))
            .await?;
        let notes = match record {
            NotesRecord::Wrapped { notes } | NotesRecord::Bare(notes) => notes,
        };
        Ok(notes.into_iter().map(NoteRecord::to_domain).collect())
    }

    pub async fn create_note(
        &self,
        video_id: &str,
        content: &str,
        title: Option<&str>,
    ) -> PortResult<Note> {
        let mut body = json!({ "video_id": video_id, "content": content });
        if let Some(title) = title {
            body["title"] = json!(title);
        }
        let record: NoteRecord = self.call(ApiRequest::post("/notes", body)).await?;
        Ok(record.to_domain())
    }

    pub async fn delete_note(&self, note_id: i64) -> PortResult<()> {
        let response = self
            .auth
            .authenticated_request(ApiRequest::delete(format!("/notes/{}", note_id)))
            .await?;
        if !response.is_success() {
            return Err(error_for_status(&response));
        }
        Ok(())
    }

    pub async fn progress(&self) -> PortResult<ProgressSummary> {
        let record: ProgressRecord = self.call(ApiRequest::get("/progress")).await?;
        Ok(ProgressSummary {
            total_videos_watched: record.total_videos_watched,
            total_quizzes_taken: record.total_quizzes_taken,
            average_quiz_score: record.average_quiz_score,
            // Older backends send the recent-video list here instead of a count.
            recent_videos: match record.recent_videos {
                Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
                Some(Value::Array(items)) => items.len() as u64,
                _ => 0,
            },
            recent_quizzes: record.recent_quizzes,
            learning_streak: record.learning_streak,
            total_learning_time: record.total_learning_time,
            favorite_topics: record.favorite_topics,
            recent_activity: record
                .recent_activity
                .into_iter()
                .map(|a| ActivityEntry {
                    kind: a.kind,
                    title: a.title,
                    score: a.score,
                    date: a.date,
                    description: a.description,
                })
                .collect(),
        })
    }

    pub async fn insights(&self) -> PortResult<LearningInsights> {
        let record: InsightsRecord = self.call(ApiRequest::get("/progress/insights")).await?;
        Ok(LearningInsights {
            learning_style: record.learning_style,
            favorite_topics: record.favorite_topics,
            weak_areas: record.weak_areas,
            recommendations: record.recommendations,
        })
    }

    async fn call<T: DeserializeOwned>(&self, request: ApiRequest) -> PortResult<T> {
        let label = format!("{} {}", request.method, request.path);
        let response = self.auth.authenticated_request(request).await?;
        debug!(call = %label, status = response.status, "Backend responded.");
        decode_body(&response)
    }
}
