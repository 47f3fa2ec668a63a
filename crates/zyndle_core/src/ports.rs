//! crates/zyndle_core/src/ports.rs
//!
//! Defines the service contracts (traits) the controller depends on.
//! These traits form the boundary of the hexagonal architecture, keeping the core
//! independent of the HTTP client and of where credentials are persisted.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port and endpoint operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PortError {
    /// The backend rejected the input. The message is shown to the user verbatim.
    #[error("{0}")]
    Validation(String),
    #[error("Your session has expired. Please sign in again.")]
    SessionExpired,
    #[error("Not signed in")]
    NoSession,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("Unexpected response shape: {0}")]
    Decode(String),
    #[error("Credential storage error: {0}")]
    Storage(String),
    #[error("Telemetry call failed: {0}")]
    Telemetry(String),
}

impl PortError {
    /// Whether this error must force the workflow back to the sign-in screen.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, PortError::SessionExpired | PortError::NoSession)
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Request/Response Envelopes
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Delete,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A transport-neutral description of one backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Set only by `AuthGate`.
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        let mut req = Self::new(HttpMethod::Post, path);
        req.body = Some(body);
        req
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }
}

/// Raw status and body as received. Interpretation happens in the core.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends one request. Only a transport failure (no response at all) is an error;
    /// every status code is returned as an `ApiResponse`.
    async fn execute(&self, request: ApiRequest) -> PortResult<ApiResponse>;
}

/// Durable string key-value store backing the signed-in identity.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> PortResult<()>;

    fn remove(&self, key: &str) -> PortResult<()>;
}
