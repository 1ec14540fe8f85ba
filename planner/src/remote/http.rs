//! Blocking `ureq` transport for [`RestRemote`](super::rest::RestRemote).
//!
//! `ureq` is synchronous, so each request runs on Tokio's blocking pool.

use std::time::Duration;

use super::RemoteError;
use super::rest::{HttpClient, HttpRequest, HttpResponse};

/// [`HttpClient`] backed by a shared `ureq` agent.
#[derive(Clone)]
pub struct UreqClient {
    agent: ureq::Agent,
}

impl UreqClient {
    /// Builds a client whose connections give up after `timeout`, if set.
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        let mut builder =
            ureq::AgentBuilder::new().user_agent(concat!("planner/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Self {
            agent: builder.build(),
        }
    }
}

impl Default for UreqClient {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HttpClient for UreqClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, RemoteError> {
        let agent = self.agent.clone();
        tokio::task::spawn_blocking(move || send_blocking(&agent, request))
            .await
            .map_err(|e| RemoteError::Transport(format!("request task failed: {e}")))?
    }
}

fn send_blocking(agent: &ureq::Agent, request: HttpRequest) -> Result<HttpResponse, RemoteError> {
    let call = agent.request_url(&request.method.to_string(), &request.url);
    let result = match request.body {
        Some(body) => call
            .set("Content-Type", "application/json")
            .send_string(&body),
        None => call.call(),
    };
    let response = match result {
        Ok(response) | Err(ureq::Error::Status(_, response)) => response,
        Err(ureq::Error::Transport(e)) => return Err(RemoteError::Transport(e.to_string())),
    };
    let status = response.status();
    let body = response
        .into_string()
        .map_err(|e| RemoteError::Transport(format!("failed to read response body: {e}")))?;
    Ok(HttpResponse { status, body })
}
