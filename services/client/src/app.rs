//! services/client/src/app.rs
//!
//! Wires the adapters into the core controller. This is the single place where the
//! process-wide `AuthGate` is constructed; everything else receives it through
//! the `Workflow`.

use std::sync::Arc;

use tracing::info;
use zyndle_core::ports::{CredentialStore, HttpTransport};
use zyndle_core::{AuthGate, StudyApi, Workflow};

use crate::adapters::{FileCredentialStore, ReqwestTransport};
use crate::config::Config;
use crate::error::ClientError;

/// Builds a workflow backed by the configured backend and credential file.
pub fn build_workflow(config: &Config) -> Result<Workflow, ClientError> {
    let transport = Arc::new(ReqwestTransport::new(
        config.api_url.clone(),
        config.request_timeout,
    )?);
    let store = Arc::new(FileCredentialStore::in_dir(&config.data_dir));
    info!(
        api_url = %config.api_url,
        credentials = %store.path().display(),
        "Client adapters initialized."
    );
    Ok(assemble(transport, store, config.quiz_questions))
}

/// Builds a workflow from arbitrary port implementations.
pub fn assemble(
    transport: Arc<dyn HttpTransport>,
    store: Arc<dyn CredentialStore>,
    quiz_questions: usize,
) -> Workflow {
    let auth = Arc::new(AuthGate::new(transport, store));
    let api = Arc::new(StudyApi::new(auth));
    Workflow::with_quiz_size(api, quiz_questions)
}
