//! crates/zyndle_core/src/analysis.rs
//!
//! `AnalysisSession` is the workspace for one analyzed video. The summary arrives
//! with the session; chat, quiz and notes are sub-resources with their own
//! consistency policies:
//!
//! - chat is optimistic for the user side only: the question is logged before the
//!   request and is never removed, a failure appends a fallback reply instead;
//! - quiz questions are fetched at most once, then graded locally, and the result
//!   is reported fire-and-forget;
//! - notes are fetched once and only change after the backend confirms a create
//!   (with its assigned id) or a delete.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::api::{StudyApi, VideoContext};
use crate::domain::{ChatEntry, ChatRole, DeliveryStatus, Note, VideoAnalysis};
use crate::ports::{PortError, PortResult};
use crate::quiz::{QuizError, QuizReport, QuizState};

/// Reply appended to the chat log when a question could not be answered.
pub const CHAT_FALLBACK: &str =
    "Sorry, I encountered an error while processing your question. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Summary,
    Chat,
    Quiz,
    Notes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
}

#[derive(Default)]
struct ChatLog {
    entries: Vec<ChatEntry>,
    draft: String,
}

pub struct AnalysisSession {
    id: Uuid,
    analysis: VideoAnalysis,
    context: VideoContext,
    api: Arc<StudyApi>,
    quiz_size: usize,
    active_tab: Mutex<Tab>,
    chat: Mutex<ChatLog>,
    quiz: OnceCell<Mutex<QuizState>>,
    quiz_loading: AtomicBool,
    notes: OnceCell<Mutex<Vec<Note>>>,
    notes_loading: AtomicBool,
    telemetry: Mutex<Vec<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn load_state<T>(cell: &OnceCell<T>, loading: &AtomicBool) -> LoadState {
    if cell.initialized() {
        LoadState::Loaded
    } else if loading.load(Ordering::SeqCst) {
        LoadState::Loading
    } else {
        LoadState::NotLoaded
    }
}

/// Marks a fetch as in flight until it finishes or its future is dropped.
struct LoadingFlag<'a>(&'a AtomicBool);

impl<'a> LoadingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl AnalysisSession {
    pub fn new(analysis: VideoAnalysis, api: Arc<StudyApi>, quiz_size: usize) -> Self {
        let context = VideoContext::from_analysis(&analysis);
        Self {
            id: Uuid::new_v4(),
            analysis,
            context,
            api,
            quiz_size,
            active_tab: Mutex::new(Tab::Summary),
            chat: Mutex::new(ChatLog::default()),
            quiz: OnceCell::new(),
            quiz_loading: AtomicBool::new(false),
            notes: OnceCell::new(),
            notes_loading: AtomicBool::new(false),
            telemetry: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn analysis(&self) -> &VideoAnalysis {
        &self.analysis
    }

    pub fn active_tab(&self) -> Tab {
        *lock(&self.active_tab)
    }

    /// Switches tabs, loading the quiz or notes the first time their tab is shown.
    pub async fn select_tab(&self, tab: Tab) -> PortResult<()> {
        *lock(&self.active_tab) = tab;
        debug!(session = %self.id, ?tab, "Tab selected.");
        match tab {
            Tab::Quiz => self.load_quiz().await.map(|_| ()),
            Tab::Notes => self.load_notes().await.map(|_| ()),
            Tab::Summary | Tab::Chat => Ok(()),
        }
    }

    //-------------------------------------------------------------------------------------
    // Chat
    //-------------------------------------------------------------------------------------

    pub fn set_chat_draft(&self, text: &str) {
        lock(&self.chat).draft = text.to_string();
    }

    pub fn chat_draft(&self) -> String {
        lock(&self.chat).draft.clone()
    }

    pub fn chat_log(&self) -> Vec<ChatEntry> {
        lock(&self.chat).entries.clone()
    }

    /// Sends the current draft. See `send_chat`.
    pub async fn send_chat_draft(&self) -> Option<ChatEntry> {
        let draft = lock(&self.chat).draft.clone();
        self.send_chat(&draft).await
    }

    /// Logs the question, asks the backend, and logs exactly one reply.
    ///
    /// Returns the assistant entry, or `None` for a blank question. Replies are
    /// appended in arrival order; `reply_to` ties each one to its question.
    pub async fn send_chat(&self, question: &str) -> Option<ChatEntry> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }

        let question_id = {
            let mut log = lock(&self.chat);
            let entry = ChatEntry {
                id: Uuid::new_v4(),
                role: ChatRole::User,
                content: question.to_string(),
                status: Some(DeliveryStatus::Sending),
                reply_to: None,
                created_at: Utc::now(),
            };
            let id = entry.id;
            log.entries.push(entry);
            log.draft.clear();
            id
        };

        let result = self.api.chat(&self.context, question).await;

        let (status, content) = match result {
            Ok(answer) => (DeliveryStatus::Sent, answer.answer),
            Err(e) => {
                warn!(session = %self.id, error = %e, "Chat request failed.");
                (DeliveryStatus::Failed, CHAT_FALLBACK.to_string())
            }
        };

        let mut log = lock(&self.chat);
        if let Some(entry) = log.entries.iter_mut().find(|e| e.id == question_id) {
            entry.status = Some(status);
        }
        let reply = ChatEntry {
            id: Uuid::new_v4(),
            role: ChatRole::Assistant,
            content,
            status: None,
            reply_to: Some(question_id),
            created_at: Utc::now(),
        };
        log.entries.push(reply.clone());
        Some(reply)
    }

    //-------------------------------------------------------------------------------------
    // Quiz
    //-------------------------------------------------------------------------------------

    pub fn quiz_load_state(&self) -> LoadState {
        load_state(&self.quiz, &self.quiz_loading)
    }

    /// Snapshot of the quiz, if its questions have been fetched.
    pub fn quiz(&self) -> Option<QuizState> {
        self.quiz.get().map(|q| lock(q).clone())
    }

    /// Fetches the questions unless they are cached or already being fetched.
    /// Concurrent callers share one request.
    pub async fn load_quiz(&self) -> PortResult<QuizState> {
        let cell = self
            .quiz
            .get_or_try_init(|| async {
                let _loading = LoadingFlag::raise(&self.quiz_loading);
                info!(session = %self.id, count = self.quiz_size, "Fetching quiz questions.");
                let questions = self.api.quiz(&self.context, self.quiz_size).await?;
                Ok::<_, PortError>(Mutex::new(QuizState::new(questions)))
            })
            .await?;
        Ok(lock(cell).clone())
    }

    pub fn select_answer(&self, question: usize, option: usize) -> Result<(), QuizError> {
        let cell = self.quiz.get().ok_or(QuizError::NotLoaded)?;
        lock(cell).select(question, option)
    }

    /// Grades the quiz locally and reports the score in the background.
    ///
    /// The report call never affects the returned result. It is spawned on the
    /// current tokio runtime; without one the score is graded but not reported.
    pub fn submit_quiz(&self) -> Result<QuizReport, QuizError> {
        let cell = self.quiz.get().ok_or(QuizError::NotLoaded)?;
        let report = lock(cell).submit()?;
        info!(
            session = %self.id,
            score = report.score,
            correct = report.correct,
            total = report.total,
            "Quiz submitted."
        );

        let Ok(runtime) = Handle::try_current() else {
            warn!(session = %self.id, "No async runtime; quiz result was not recorded.");
            return Ok(report);
        };
        let api = Arc::clone(&self.api);
        let video_id = self.analysis.video_id.clone();
        let handle = runtime.spawn(async move {
            if let Err(e) = api
                .record_quiz_result(&video_id, report.score, report.total)
                .await
            {
                let e = PortError::Telemetry(e.to_string());
                warn!(video_id = %video_id, error = %e, "Quiz result was not recorded.");
            }
        });
        lock(&self.telemetry).push(handle);
        Ok(report)
    }

    pub fn retake_quiz(&self) -> Result<(), QuizError> {
        let cell = self.quiz.get().ok_or(QuizError::NotLoaded)?;
        lock(cell).retake();
        Ok(())
    }

    /// Waits for background report calls to finish. Only needed before exiting.
    pub async fn flush_telemetry(&self) {
        let handles: Vec<_> = lock(&self.telemetry).drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Telemetry task ended abnormally.");
            }
        }
    }

    //-------------------------------------------------------------------------------------
    // Notes
    //-------------------------------------------------------------------------------------

    pub fn notes_load_state(&self) -> LoadState {
        load_state(&self.notes, &self.notes_loading)
    }

    /// Notes newest-first. Empty until loaded.
    pub fn notes(&self) -> Vec<Note> {
        self.notes
            .get()
            .map(|n| lock(n).clone())
            .unwrap_or_default()
    }

    pub async fn load_notes(&self) -> PortResult<Vec<Note>> {
        let cell = self
            .notes
            .get_or_try_init(|| async {
                let _loading = LoadingFlag::raise(&self.notes_loading);
                info!(session = %self.id, "Fetching notes.");
                let notes = self.api.list_notes(&self.analysis.video_id).await?;
                Ok::<_, PortError>(Mutex::new(notes))
            })
            .await?;
        Ok(lock(cell).clone())
    }

    /// Saves a note and inserts the backend's record at the top of the list.
    ///
    /// Does not wait for the list. If it is not loaded yet, the note arrives with
    /// the first fetch instead.
    pub async fn create_note(&self, content: &str, title: Option<&str>) -> PortResult<Note> {
        let note = self
            .api
            .create_note(&self.analysis.video_id, content, title)
            .await?;
        info!(session = %self.id, note_id = note.id, "Note created.");
        if let Some(cell) = self.notes.get() {
            let mut notes = lock(cell);
            // A fetch racing the create may already hold it.
            if !notes.iter().any(|n| n.id == note.id) {
                notes.insert(0, note.clone());
            }
        }
        Ok(note)
    }

    /// Deletes a note on the backend, then drops it from the local list.
    pub async fn delete_note(&self, note_id: i64) -> PortResult<()> {
        self.api.delete_note(note_id).await?;
        info!(session = %self.id, note_id, "Note deleted.");
        if let Some(cell) = self.notes.get() {
            lock(cell).retain(|n| n.id != note_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthGate;
    use crate::testing::{MemoryStore, ScriptedTransport};
    use serde_json::json;
    use std::time::Duration;

    async fn session(transport: &Arc<ScriptedTransport>) -> AnalysisSession {
        transport.reply(
            "POST",
            "/auth/login",
            200,
            json!({ "access_token": "tok", "user_id": 1, "email": "a@b.com", "full_name": "A" }),
        );
        let auth = Arc::new(AuthGate::new(
            transport.clone(),
            Arc::new(MemoryStore::default()),
        ));
        auth.login("a@b.com", "p").await.unwrap();
        let analysis = VideoAnalysis {
            video_id: "x".into(),
            title: "T".into(),
            channel: "C".into(),
            duration: "1:00".into(),
            summary: "S".into(),
            transcript: "words".into(),
            chapters: Vec::new(),
            thumbnail: None,
            view_count: None,
            like_count: None,
        };
        AnalysisSession::new(analysis, Arc::new(StudyApi::new(auth)), 5)
    }

    fn two_questions() -> serde_json::Value {
        json!({ "questions": [
            { "question": "Q1", "options": ["a", "b"], "correct_answer": 1, "explanation": "e1" },
            { "question": "Q2", "options": ["a", "b"], "correct_answer": 0, "explanation": "e2" }
        ] })
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn quiz_tab_fetches_questions_once() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        transport.reply("POST", "/quiz", 200, two_questions());

        for _ in 0..3 {
            session.select_tab(Tab::Quiz).await.unwrap();
        }
        session.select_tab(Tab::Summary).await.unwrap();
        session.select_tab(Tab::Quiz).await.unwrap();

        assert_eq!(transport.count("POST", "/quiz"), 1);
        assert_eq!(session.quiz_load_state(), LoadState::Loaded);
        assert_eq!(session.active_tab(), Tab::Quiz);
        let body = transport.requests().pop().unwrap().body.unwrap();
        assert_eq!(body["num_questions"], 5);
        assert_eq!(body["title"], "T");
    }

    #[tokio::test]
    async fn concurrent_quiz_selection_shares_one_request() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        let gate = transport.gate("POST", "/quiz");

        let first = session.select_tab(Tab::Quiz);
        let second = session.select_tab(Tab::Quiz);
        let opener = async {
            settle().await;
            assert_eq!(session.quiz_load_state(), LoadState::Loading);
            gate.open(200, two_questions());
        };
        let (a, b, ()) = tokio::join!(first, second, opener);

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(transport.count("POST", "/quiz"), 1);
    }

    #[tokio::test]
    async fn failed_quiz_fetch_can_be_retried() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        transport.reply("POST", "/quiz", 500, json!({ "detail": "busy" }));
        transport.reply("POST", "/quiz", 200, two_questions());

        assert!(session.select_tab(Tab::Quiz).await.is_err());
        assert_eq!(session.quiz_load_state(), LoadState::NotLoaded);
        session.select_tab(Tab::Quiz).await.unwrap();
        assert_eq!(session.quiz().unwrap().questions().len(), 2);
    }

    #[tokio::test]
    async fn abandoned_quiz_fetch_is_not_left_loading() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        let _gate = transport.gate("POST", "/quiz");
        transport.reply("POST", "/quiz", 200, two_questions());

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), session.select_tab(Tab::Quiz)).await;

        assert!(abandoned.is_err());
        assert_eq!(session.quiz_load_state(), LoadState::NotLoaded);
        session.select_tab(Tab::Quiz).await.unwrap();
        assert_eq!(session.quiz_load_state(), LoadState::Loaded);
    }

    #[test]
    fn submit_without_a_runtime_still_grades() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let transport = Arc::new(ScriptedTransport::new());
        let session = runtime.block_on(async {
            let session = session(&transport).await;
            transport.reply("POST", "/quiz", 200, two_questions());
            session.load_quiz().await.unwrap();
            session
        });

        session.select_answer(0, 1).unwrap();
        session.select_answer(1, 0).unwrap();
        let report = session.submit_quiz().unwrap();
        runtime.block_on(session.flush_telemetry());

        assert_eq!(report.score, 100);
        assert_eq!(transport.count("POST", "/progress/record-quiz"), 0);
    }

    #[tokio::test]
    async fn submit_grades_and_records_result() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        transport.reply("POST", "/quiz", 200, two_questions());
        transport.reply("POST", "/progress/record-quiz", 200, json!({ "message": "ok" }));
        session.load_quiz().await.unwrap();

        session.select_answer(0, 1).unwrap();
        session.select_answer(1, 1).unwrap();
        let report = session.submit_quiz().unwrap();
        session.flush_telemetry().await;

        assert_eq!(report.score, 50);
        let recorded = transport.requests().pop().unwrap();
        assert_eq!(recorded.path, "/progress/record-quiz");
        assert_eq!(
            recorded.body.unwrap(),
            json!({ "video_id": "x", "score": 50, "total_questions": 2 })
        );
    }

    #[tokio::test]
    async fn incomplete_quiz_submit_fires_nothing() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        transport.reply("POST", "/quiz", 200, two_questions());
        session.load_quiz().await.unwrap();
        session.select_answer(0, 1).unwrap();

        let err = session.submit_quiz().unwrap_err();
        session.flush_telemetry().await;

        assert_eq!(err, QuizError::Incomplete { answered: 1, total: 2 });
        assert_eq!(transport.count("POST", "/progress/record-quiz"), 0);
    }

    #[tokio::test]
    async fn telemetry_failure_does_not_touch_results() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        transport.reply("POST", "/quiz", 200, two_questions());
        transport.fail("POST", "/progress/record-quiz", "offline");
        session.load_quiz().await.unwrap();
        session.select_answer(0, 1).unwrap();
        session.select_answer(1, 0).unwrap();

        let report = session.submit_quiz().unwrap();
        session.flush_telemetry().await;

        assert_eq!(report.score, 100);
        assert_eq!(session.quiz().unwrap().report(), Some(report));
    }

    #[tokio::test]
    async fn retake_reuses_cached_questions() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        transport.reply("POST", "/quiz", 200, two_questions());
        session.select_tab(Tab::Quiz).await.unwrap();
        session.select_answer(0, 1).unwrap();
        session.select_answer(1, 0).unwrap();
        session.submit_quiz().unwrap();

        session.retake_quiz().unwrap();
        session.select_tab(Tab::Quiz).await.unwrap();

        let quiz = session.quiz().unwrap();
        assert!(!quiz.is_submitted());
        assert!(quiz.answers().is_empty());
        assert_eq!(transport.count("POST", "/quiz"), 1);
    }

    #[tokio::test]
    async fn quiz_actions_before_loading_are_rejected() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        assert_eq!(session.select_answer(0, 0), Err(QuizError::NotLoaded));
        assert_eq!(session.submit_quiz().unwrap_err(), QuizError::NotLoaded);
    }

    #[tokio::test]
    async fn chat_logs_question_then_answer() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        transport.reply("POST", "/chat", 200, json!({ "answer": "42", "sources": [], "confidence": "high" }));
        session.set_chat_draft("  what is it?  ");

        let reply = session.send_chat_draft().await.unwrap();

        let log = session.chat_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].content, "what is it?");
        assert_eq!(log[0].status, Some(DeliveryStatus::Sent));
        assert_eq!(reply.content, "42");
        assert_eq!(reply.reply_to, Some(log[0].id));
        assert_eq!(session.chat_draft(), "");
        let body = transport.requests().pop().unwrap().body.unwrap();
        assert_eq!(body["transcript"], "words");
        assert_eq!(body["summary"], "S");
        assert_eq!(body["video_id"], "x");
    }

    #[tokio::test]
    async fn chat_failure_keeps_question_and_appends_fallback() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        transport.reply("POST", "/chat", 500, json!({ "detail": "boom" }));

        let reply = session.send_chat("why?").await.unwrap();

        let log = session.chat_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].role, ChatRole::User);
        assert_eq!(log[0].status, Some(DeliveryStatus::Failed));
        assert_eq!(reply.content, CHAT_FALLBACK);
        assert_eq!(transport.count("POST", "/chat"), 1);
    }

    #[tokio::test]
    async fn blank_chat_is_ignored() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        assert!(session.send_chat("   ").await.is_none());
        assert!(session.chat_log().is_empty());
    }

    #[tokio::test]
    async fn questions_keep_send_order_when_replies_cross() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        let gate_a = transport.gate("POST", "/chat");
        let gate_b = transport.gate("POST", "/chat");

        let send_a = session.send_chat("a");
        let send_b = session.send_chat("b");
        let replies = async {
            settle().await;
            gate_b.open(200, json!({ "answer": "to b" }));
            settle().await;
            gate_a.open(200, json!({ "answer": "to a" }));
        };
        let (reply_a, reply_b, ()) = tokio::join!(send_a, send_b, replies);

        let log = session.chat_log();
        let users: Vec<_> = log
            .iter()
            .filter(|e| e.role == ChatRole::User)
            .map(|e| e.content.as_str())
            .collect();
        assert_eq!(users, vec!["a", "b"]);
        assert_eq!(reply_a.unwrap().reply_to, Some(log[0].id));
        assert_eq!(reply_b.unwrap().reply_to, Some(log[1].id));
        // Replies land in arrival order.
        assert_eq!(log[2].content, "to b");
        assert_eq!(log[3].content, "to a");
    }

    #[tokio::test]
    async fn notes_load_once_and_new_notes_go_first() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        transport.reply(
            "GET",
            "/notes",
            200,
            json!({ "notes": [{ "id": 1, "title": "old", "content": "c" }] }),
        );
        transport.reply("POST", "/notes", 200, json!({ "id": 2, "title": "new", "content": "d" }));

        session.select_tab(Tab::Notes).await.unwrap();
        session.select_tab(Tab::Notes).await.unwrap();
        let created = session.create_note("d", Some("new")).await.unwrap();

        assert_eq!(created.id, 2);
        let ids: Vec<_> = session.notes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(transport.count("GET", "/notes"), 1);
        assert_eq!(session.notes_load_state(), LoadState::Loaded);
    }

    #[tokio::test]
    async fn empty_notes_list_counts_as_loaded() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        transport.reply("GET", "/notes", 200, json!({ "notes": [] }));

        session.select_tab(Tab::Notes).await.unwrap();
        session.select_tab(Tab::Notes).await.unwrap();

        assert_eq!(transport.count("GET", "/notes"), 1);
        assert_eq!(session.notes_load_state(), LoadState::Loaded);
        assert!(session.notes().is_empty());
    }

    #[tokio::test]
    async fn abandoned_notes_fetch_is_not_left_loading() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        let _gate = transport.gate("GET", "/notes");

        let abandoned =
            tokio::time::timeout(Duration::from_millis(20), session.load_notes()).await;

        assert!(abandoned.is_err());
        assert_eq!(session.notes_load_state(), LoadState::NotLoaded);
    }

    #[tokio::test]
    async fn note_is_saved_even_when_the_list_fails() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        transport.reply("GET", "/notes", 500, json!({ "detail": "db down" }));
        transport.reply("POST", "/notes", 200, json!({ "id": 9, "title": "t", "content": "c" }));
        transport.reply(
            "GET",
            "/notes",
            200,
            json!({ "notes": [{ "id": 9, "title": "t", "content": "c" }] }),
        );

        assert!(session.select_tab(Tab::Notes).await.is_err());
        let created = session.create_note("c", Some("t")).await.unwrap();
        assert_eq!(created.id, 9);
        assert_eq!(session.notes_load_state(), LoadState::NotLoaded);

        session.select_tab(Tab::Notes).await.unwrap();
        let ids: Vec<_> = session.notes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![9]);
    }

    #[tokio::test]
    async fn failed_create_leaves_notes_untouched() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        transport.reply("POST", "/notes", 400, json!({ "detail": "Content is required" }));

        let err = session.create_note("", None).await.unwrap_err();

        assert_eq!(err, PortError::Validation("Content is required".into()));
        assert!(session.notes().is_empty());
    }

    #[tokio::test]
    async fn rejected_delete_keeps_the_note() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        transport.reply(
            "GET",
            "/notes",
            200,
            json!({ "notes": [{ "id": 4, "title": "t", "content": "c" }] }),
        );
        transport.reply("DELETE", "/notes/4", 500, json!({ "detail": "nope" }));

        session.select_tab(Tab::Notes).await.unwrap();
        assert!(session.delete_note(4).await.is_err());

        assert_eq!(session.notes().len(), 1);
    }

    #[tokio::test]
    async fn confirmed_delete_removes_the_note() {
        let transport = Arc::new(ScriptedTransport::new());
        let session = session(&transport).await;
        transport.reply(
            "GET",
            "/notes",
            200,
            json!([{ "id": 4, "title": "t", "content": "c" }, { "id": 5, "title": "u", "content": "d" }]),
        );
        transport.reply("DELETE", "/notes/4", 200, json!({ "message": "deleted" }));

        session.select_tab(Tab::Notes).await.unwrap();
        session.delete_note(4).await.unwrap();

        let ids: Vec<_> = session.notes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![5]);
    }
}
