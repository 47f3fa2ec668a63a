//! services/client/src/error.rs
//!
//! Defines the primary error type for the client service.

use crate::config::ConfigError;
use zyndle_core::ports::PortError;
use zyndle_core::quiz::QuizError;
use zyndle_core::workflow::WorkflowError;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An error that propagated up from one of the core ports.
    #[error(transparent)]
    Port(#[from] PortError),

    /// A workflow action that was refused or failed.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Quiz(#[from] QuizError),

    /// Represents a standard Input/Output error (e.g., the credential file).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}
