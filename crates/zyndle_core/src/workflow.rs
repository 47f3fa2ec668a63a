//! crates/zyndle_core/src/workflow.rs
//!
//! The screen-level state machine: Home, Auth, VideoInput, Workspace, Progress.
//!
//! Synchronous user events go through `dispatch`. The asynchronous actions
//! (`submit_auth`, `submit_url`, `load_progress` and the workspace wrappers) check
//! the screen before their first await and re-check a generation number after it,
//! so a response that arrives after the user has navigated away is dropped.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::analysis::{AnalysisSession, Tab};
use crate::api::StudyApi;
use crate::auth::AuthGate;
use crate::domain::{ChatEntry, LearningInsights, ProgressSummary, User};
use crate::ports::PortError;
use crate::youtube::extract_video_id;

/// Number of questions requested when the quiz tab is first opened.
pub const DEFAULT_QUIZ_QUESTIONS: usize = 5;

//=========================================================================================
// States and Events
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    Register,
}

impl AuthMode {
    pub fn toggled(self) -> Self {
        match self {
            AuthMode::SignIn => AuthMode::Register,
            AuthMode::Register => AuthMode::SignIn,
        }
    }
}

#[derive(Clone)]
pub enum Screen {
    Home,
    Auth(AuthMode),
    VideoInput,
    Workspace(Arc<AnalysisSession>),
    Progress,
}

impl Screen {
    pub fn kind(&self) -> ScreenKind {
        match self {
            Screen::Home => ScreenKind::Home,
            Screen::Auth(mode) => ScreenKind::Auth(*mode),
            Screen::VideoInput => ScreenKind::VideoInput,
            Screen::Workspace(_) => ScreenKind::Workspace,
            Screen::Progress => ScreenKind::Progress,
        }
    }

    fn requires_session(&self) -> bool {
        matches!(
            self,
            Screen::VideoInput | Screen::Workspace(_) | Screen::Progress
        )
    }
}

/// `Screen` without its payload, for comparisons and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenKind {
    Home,
    Auth(AuthMode),
    VideoInput,
    Workspace,
    Progress,
}

impl fmt::Display for ScreenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScreenKind::Home => f.write_str("home"),
            ScreenKind::Auth(AuthMode::SignIn) => f.write_str("sign-in"),
            ScreenKind::Auth(AuthMode::Register) => f.write_str("register"),
            ScreenKind::VideoInput => f.write_str("video-input"),
            ScreenKind::Workspace => f.write_str("workspace"),
            ScreenKind::Progress => f.write_str("progress"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    ClickSignIn,
    ClickGetStarted,
    ClickContinueAnalysis,
    ClickViewProgress,
    ClickBack,
    ToggleMode,
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{event:?} is not available on the {screen} screen")]
    InvalidEvent { event: Event, screen: ScreenKind },
    #[error("This action needs the {expected} screen, but the {actual} screen is shown")]
    WrongScreen {
        expected: ScreenKind,
        actual: ScreenKind,
    },
    #[error("A request for this screen is already in progress")]
    AlreadySubmitting,
    #[error("Please enter a valid YouTube URL")]
    InvalidUrl(String),
    #[error("Please fill in the {0} field")]
    MissingField(&'static str),
    #[error(transparent)]
    Port(#[from] PortError),
}

//=========================================================================================
// Per-screen Form State
//=========================================================================================

/// What the user typed into the sign-in / register form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthForm {
    pub credentials: Credentials,
    pub is_submitting: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoInputForm {
    pub url: String,
    pub is_analyzing: bool,
    pub error: Option<String>,
}

#[derive(Debug)]
pub enum AuthOutcome {
    SignedIn(User),
    Rejected(PortError),
    /// The user left the auth screen before the backend answered.
    Abandoned,
}

pub enum AnalyzeOutcome {
    Ready(Arc<AnalysisSession>),
    Failed(PortError),
    SessionExpired,
    /// The user left the input screen before the backend answered.
    Abandoned,
}

#[derive(Debug, Clone)]
pub struct ProgressView {
    pub summary: ProgressSummary,
    pub insights: LearningInsights,
}

//=========================================================================================
// Workflow
//=========================================================================================

struct Inner {
    screen: Screen,
    auth_form: AuthForm,
    video_input: VideoInputForm,
    /// Bumped on every screen change; async results carry the value they started with.
    generation: u64,
    in_flight: Option<CancellationToken>,
}

impl Inner {
    fn go(&mut self, screen: Screen) {
        let from = self.screen.kind();
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.video_input.is_analyzing = false;
        self.auth_form.is_submitting = false;
        self.generation += 1;
        self.screen = screen;
        debug!(from = %from, to = %self.screen.kind(), "Screen changed.");
    }

    fn go_to_auth(&mut self, mode: AuthMode) {
        self.auth_form = AuthForm::default();
        self.go(Screen::Auth(mode));
    }
}

pub struct Workflow {
    auth: Arc<AuthGate>,
    api: Arc<StudyApi>,
    quiz_size: usize,
    inner: Mutex<Inner>,
}

impl Workflow {
    pub fn new(api: Arc<StudyApi>) -> Self {
        Self::with_quiz_size(api, DEFAULT_QUIZ_QUESTIONS)
    }

    pub fn with_quiz_size(api: Arc<StudyApi>, quiz_size: usize) -> Self {
        Self {
            auth: Arc::clone(api.auth()),
            api,
            quiz_size,
            inner: Mutex::new(Inner {
                screen: Screen::Home,
                auth_form: AuthForm::default(),
                video_input: VideoInputForm::default(),
                generation: 0,
                in_flight: None,
            }),
        }
    }

    pub fn auth(&self) -> &Arc<AuthGate> {
        &self.auth
    }

    pub fn screen(&self) -> Screen {
        self.lock().screen.clone()
    }

    pub fn screen_kind(&self) -> ScreenKind {
        self.lock().screen.kind()
    }

    pub fn auth_form(&self) -> AuthForm {
        self.lock().auth_form.clone()
    }

    pub fn video_input(&self) -> VideoInputForm {
        self.lock().video_input.clone()
    }

    /// The active analysis session, if the workspace is shown.
    pub fn workspace(&self) -> Option<Arc<AnalysisSession>> {
        match &self.lock().screen {
            Screen::Workspace(session) => Some(Arc::clone(session)),
            _ => None,
        }
    }

    /// Applies a synchronous navigation event.
    pub fn dispatch(&self, event: Event) -> Result<ScreenKind, WorkflowError> {
        let authenticated = self.auth.is_authenticated();
        let mut inner = self.lock();
        let current = inner.screen.kind();

        match (current, event) {
            (ScreenKind::Home, Event::ClickSignIn) => inner.go_to_auth(AuthMode::SignIn),
            (ScreenKind::Home, Event::ClickGetStarted) => inner.go_to_auth(AuthMode::Register),
            (ScreenKind::Home, Event::ClickContinueAnalysis) if authenticated => {
                inner.video_input = VideoInputForm::default();
                inner.go(Screen::VideoInput);
            }
            (ScreenKind::Home, Event::ClickViewProgress) if authenticated => {
                inner.go(Screen::Progress)
            }
            (ScreenKind::Home, Event::ClickContinueAnalysis | Event::ClickViewProgress) => {
                inner.go_to_auth(AuthMode::SignIn)
            }
            (ScreenKind::Auth(mode), Event::ToggleMode) => inner.go_to_auth(mode.toggled()),
            (
                ScreenKind::Auth(_)
                | ScreenKind::VideoInput
                | ScreenKind::Workspace
                | ScreenKind::Progress,
                Event::ClickBack,
            ) => inner.go(Screen::Home),
            (screen, event) => return Err(WorkflowError::InvalidEvent { event, screen }),
        }

        info!(?event, from = %current, to = %inner.screen.kind(), "Workflow event applied.");
        Ok(inner.screen.kind())
    }

    /// Moves to sign-in if the current screen needs a session that is no longer held.
    /// Returns the screen shown afterwards.
    pub fn sync_session(&self) -> ScreenKind {
        let authenticated = self.auth.is_authenticated();
        let mut inner = self.lock();
        if !authenticated && inner.screen.requires_session() {
            warn!(screen = %inner.screen.kind(), "Session lost; returning to sign-in.");
            inner.go_to_auth(AuthMode::SignIn);
        }
        inner.screen.kind()
    }

    /// Submits the auth form for the current mode.
    pub async fn submit_auth(&self, credentials: Credentials) -> Result<AuthOutcome, WorkflowError> {
        let (mode, generation) = {
            let mut inner = self.lock();
            let ScreenKind::Auth(mode) = inner.screen.kind() else {
                return Err(WorkflowError::WrongScreen {
                    expected: ScreenKind::Auth(AuthMode::SignIn),
                    actual: inner.screen.kind(),
                });
            };
            if inner.auth_form.is_submitting {
                return Err(WorkflowError::AlreadySubmitting);
            }
            if let Err(e) = validate_credentials(mode, &credentials) {
                inner.auth_form.error = Some(e.to_string());
                return Err(e);
            }
            inner.auth_form.credentials = credentials.clone();
            inner.auth_form.is_submitting = true;
            inner.auth_form.error = None;
            (mode, inner.generation)
        };

        let result = match mode {
            AuthMode::SignIn => self.auth.login(&credentials.email, &credentials.password).await,
            AuthMode::Register => {
                self.auth
                    .register(
                        &credentials.email,
                        &credentials.full_name,
                        &credentials.password,
                    )
                    .await
            }
        };

        let mut inner = self.lock();
        if inner.generation != generation {
            debug!("Auth response arrived after the form was left; ignoring it.");
            return Ok(AuthOutcome::Abandoned);
        }
        inner.auth_form.is_submitting = false;
        match result {
            Ok(session) => {
                inner.auth_form = AuthForm::default();
                inner.video_input = VideoInputForm::default();
                inner.go(Screen::VideoInput);
                Ok(AuthOutcome::SignedIn(session.user))
            }
            Err(e) => {
                inner.auth_form.credentials.password.clear();
                inner.auth_form.error = Some(e.to_string());
                Ok(AuthOutcome::Rejected(e))
            }
        }
    }

    /// Validates the URL and runs the analysis. The input screen stays up while the
    /// request is pending and a second submit is refused.
    pub async fn submit_url(&self, url: &str) -> Result<AnalyzeOutcome, WorkflowError> {
        if self.sync_session() != ScreenKind::VideoInput {
            let actual = self.screen_kind();
            if actual == ScreenKind::Auth(AuthMode::SignIn) && !self.auth.is_authenticated() {
                return Ok(AnalyzeOutcome::SessionExpired);
            }
            return Err(WorkflowError::WrongScreen {
                expected: ScreenKind::VideoInput,
                actual,
            });
        }

        let (token, generation, video_id) = {
            let mut inner = self.lock();
            if inner.video_input.is_analyzing {
                return Err(WorkflowError::AlreadySubmitting);
            }
            inner.video_input.url = url.trim().to_string();
            let Some(video_id) = extract_video_id(url) else {
                let err = WorkflowError::InvalidUrl(url.to_string());
                inner.video_input.error = Some(err.to_string());
                return Err(err);
            };
            let token = CancellationToken::new();
            inner.video_input.is_analyzing = true;
            inner.video_input.error = None;
            inner.in_flight = Some(token.clone());
            (token, inner.generation, video_id)
        };

        let url = url.trim();
        let result = tokio::select! {
            _ = token.cancelled() => None,
            r = self.api.analyze(url, &video_id) => Some(r),
        };

        let mut inner = self.lock();
        let Some(result) = result.filter(|_| inner.generation == generation) else {
            info!(video_id = %video_id, "Analysis abandoned; dropping its response.");
            return Ok(AnalyzeOutcome::Abandoned);
        };
        inner.in_flight = None;
        inner.video_input.is_analyzing = false;

        match result {
            Ok(analysis) => {
                info!(video_id = %video_id, title = %analysis.title, "Analysis ready.");
                let session = Arc::new(AnalysisSession::new(
                    analysis,
                    Arc::clone(&self.api),
                    self.quiz_size,
                ));
                inner.video_input = VideoInputForm::default();
                inner.go(Screen::Workspace(Arc::clone(&session)));
                Ok(AnalyzeOutcome::Ready(session))
            }
            Err(e) if e.is_session_expired() => {
                inner.go_to_auth(AuthMode::SignIn);
                Ok(AnalyzeOutcome::SessionExpired)
            }
            Err(e) => {
                warn!(video_id = %video_id, error = %e, "Analysis failed.");
                inner.video_input.error = Some(e.to_string());
                Ok(AnalyzeOutcome::Failed(e))
            }
        }
    }

    /// Selects a workspace tab, loading its data on first use.
    pub async fn select_tab(&self, tab: Tab) -> Result<(), WorkflowError> {
        let session = self.require_workspace()?;
        let result = session.select_tab(tab).await;
        self.settle(result)
    }

    /// Sends a chat question from the workspace.
    pub async fn send_chat(&self, question: &str) -> Result<Option<ChatEntry>, WorkflowError> {
        let session = self.require_workspace()?;
        let reply = session.send_chat(question).await;
        self.sync_session();
        Ok(reply)
    }

    /// Loads the data shown on the progress screen.
    pub async fn load_progress(&self) -> Result<ProgressView, WorkflowError> {
        let actual = self.sync_session();
        if actual != ScreenKind::Progress {
            return Err(WorkflowError::WrongScreen {
                expected: ScreenKind::Progress,
                actual,
            });
        }
        let result = futures::try_join!(self.api.progress(), self.api.insights())
            .map(|(summary, insights)| ProgressView { summary, insights });
        self.settle(result)
    }

    /// Signs out and returns to Home.
    pub async fn logout(&self) {
        self.auth.logout().await;
        self.lock().go(Screen::Home);
    }

    fn require_workspace(&self) -> Result<Arc<AnalysisSession>, WorkflowError> {
        let actual = self.sync_session();
        self.workspace().ok_or(WorkflowError::WrongScreen {
            expected: ScreenKind::Workspace,
            actual,
        })
    }

    /// Forwards a port result, moving to sign-in first if it reports an expired session.
    fn settle<T>(&self, result: Result<T, PortError>) -> Result<T, WorkflowError> {
        if let Err(e) = &result {
            if e.is_session_expired() {
                self.sync_session();
            }
        }
        result.map_err(WorkflowError::from)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn validate_credentials(mode: AuthMode, credentials: &Credentials) -> Result<(), WorkflowError> {
    if credentials.email.trim().is_empty() {
        return Err(WorkflowError::MissingField("email"));
    }
    if mode == AuthMode::Register && credentials.full_name.trim().is_empty() {
        return Err(WorkflowError::MissingField("full name"));
    }
    if credentials.password.is_empty() {
        return Err(WorkflowError::MissingField("password"));
    }
    Ok(())
}
