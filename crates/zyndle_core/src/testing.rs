//! In-process fakes for the ports, used by the unit tests of this crate.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::ports::{ApiRequest, ApiResponse, CredentialStore, HttpTransport, PortError, PortResult};

enum Scripted {
    Reply(ApiResponse),
    Fail(String),
    Gated(oneshot::Receiver<ApiResponse>),
}

/// Replies to each `(method, path)` from a queue scripted by the test.
/// Unscripted calls get a 404.
#[derive(Default)]
pub struct ScriptedTransport {
    routes: Mutex<HashMap<(String, String), VecDeque<Scripted>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

/// Completes a gated reply.
pub struct Gate(oneshot::Sender<ApiResponse>);

impl Gate {
    pub fn open(self, status: u16, body: Value) {
        let _ = self.0.send(ApiResponse {
            status,
            body: body.to_string(),
        });
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, method: &str, path: &str, status: u16, body: Value) {
        self.push(
            method,
            path,
            Scripted::Reply(ApiResponse {
                status,
                body: body.to_string(),
            }),
        );
    }

    pub fn fail(&self, method: &str, path: &str, message: &str) {
        self.push(method, path, Scripted::Fail(message.to_string()));
    }

    /// Queues a reply that is held until the returned gate is opened.
    pub fn gate(&self, method: &str, path: &str) -> Gate {
        let (tx, rx) = oneshot::channel();
        self.push(method, path, Scripted::Gated(rx));
        Gate(tx)
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn count(&self, method: &str, path: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method.to_string() == method && r.path == path)
            .count()
    }

    fn push(&self, method: &str, path: &str, scripted: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back(scripted);
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: ApiRequest) -> PortResult<ApiResponse> {
        let key = (request.method.to_string(), request.path.clone());
        self.requests.lock().unwrap().push(request);
        let next = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(|queue| queue.pop_front());

        match next {
            Some(Scripted::Reply(response)) => Ok(response),
            Some(Scripted::Fail(message)) => Err(PortError::Network(message)),
            Some(Scripted::Gated(rx)) => rx
                .await
                .map_err(|_| PortError::Network("gate dropped".to_string())),
            None => Ok(ApiResponse {
                status: 404,
                body: r#"{"detail":"Not Found"}"#.to_string(),
            }),
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    failing: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Makes the next `set` of `key` fail with a storage error.
    pub fn fail_next_write_to(&self, key: &str) {
        *self.failing.lock().unwrap() = Some(key.to_string());
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: &str) -> PortResult<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> PortResult<()> {
        let mut failing = self.failing.lock().unwrap();
        if failing.as_deref() == Some(key) {
            *failing = None;
            return Err(PortError::Storage("disk full".to_string()));
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }
}
