//! services/client/src/adapters/http.rs
//!
//! This module contains the HTTP adapter, which is the concrete implementation
//! of the `HttpTransport` port from the `core` crate. It sends requests with
//! `reqwest` and hands back status and body without interpreting either.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use tracing::debug;
use url::Url;
use zyndle_core::ports::{ApiRequest, ApiResponse, HttpMethod, HttpTransport, PortError, PortResult};

const USER_AGENT: &str = concat!("zyndle-client/", env!("CARGO_PKG_VERSION"));

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An HTTP adapter that implements the `HttpTransport` port.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Creates a new `ReqwestTransport` rooted at `base_url`.
    pub fn new(base_url: Url, timeout: Duration) -> PortResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Network(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    /// Joins a request path onto the base URL, keeping any base path prefix.
    fn url_for(&self, path: &str, query: &[(String, String)]) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> PortResult<ApiResponse> {
        let url = self.url_for(&request.path, &request.query);
        let method = match request.method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Delete => Method::DELETE,
        };

        debug!(method = %request.method, url = %url, "Sending request.");
        let mut builder = self.client.request(method, url);
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| PortError::Network(e.to_string()))?;
        debug!(status, bytes = body.len(), "Response received.");

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> ReqwestTransport {
        ReqwestTransport::new(Url::parse(base).unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn paths_join_onto_the_base() {
        let t = transport("http://localhost:8000");
        assert_eq!(
            t.url_for("/auth/login", &[]).as_str(),
            "http://localhost:8000/auth/login"
        );
    }

    #[test]
    fn base_path_prefix_is_kept() {
        let t = transport("https://api.example.com/v1/");
        assert_eq!(
            t.url_for("/notes", &[("video_id".into(), "a b".into())]).as_str(),
            "https://api.example.com/v1/notes?video_id=a+b"
        );
    }
}
