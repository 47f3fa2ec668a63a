pub mod analysis;
pub mod api;
pub mod auth;
pub mod domain;
pub mod ports;
pub mod quiz;
pub mod workflow;
pub mod youtube;

#[cfg(test)]
mod testing;

pub use analysis::{AnalysisSession, LoadState, Tab, CHAT_FALLBACK};
pub use api::{StudyApi, VideoContext};
pub use auth::{AuthGate, TOKEN_KEY, USER_KEY};
pub use domain::{
    format_timestamp, ActivityEntry, AuthSession, Chapter, ChatAnswer, ChatEntry, ChatRole,
    DeliveryStatus, LearningInsights, Note, ProgressSummary, QuizQuestion, User, VideoAnalysis,
};
pub use ports::{
    ApiRequest, ApiResponse, CredentialStore, HttpMethod, HttpTransport, PortError, PortResult,
};
pub use quiz::{QuizError, QuizReport, QuizState};
pub use workflow::{
    AnalyzeOutcome, AuthForm, AuthMode, AuthOutcome, Credentials, Event, ProgressView, Screen,
    ScreenKind, VideoInputForm, Workflow, WorkflowError,
};
