//! In-memory transport for unit tests: replays queued responses per path
//! and records every request it sees.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Notify;

use super::{ApiRequest, ApiResponse, HttpTransport, TransportError};

struct Scripted {
    result: Result<ApiResponse, TransportError>,
    delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
}

#[derive(Default)]
pub(crate) struct ScriptedTransport {
    routes: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, path: &str, scripted: Scripted) {
        self.routes
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push_back(scripted);
    }

    /// Queue a response for the next call to `path`
    pub fn respond(&self, path: &str, status: u16, body: &str) {
        self.push(path, Scripted {
            result: Ok(Self::response(status, body)),
            delay: None,
            gate: None,
        });
    }

    /// Queue a response that is only released after `delay`
    pub fn respond_after(&self, path: &str, delay: Duration, status: u16, body: &str) {
        self.push(path, Scripted {
            result: Ok(Self::response(status, body)),
            delay: Some(delay),
            gate: None,
        });
    }

    /// Queue a response held back until the returned gate is notified
    pub fn respond_gated(&self, path: &str, status: u16, body: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.push(path, Scripted {
            result: Ok(Self::response(status, body)),
            delay: None,
            gate: Some(Arc::clone(&gate)),
        });
        gate
    }

    pub fn fail(&self, path: &str, error: TransportError) {
        self.push(path, Scripted {
            result: Err(error),
            delay: None,
            gate: None,
        });
    }

    pub fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<ApiRequest> {
        self.calls().into_iter().filter(|r| r.path == path).collect()
    }

    fn response(status: u16, body: &str) -> ApiResponse {
        ApiResponse::new(StatusCode::from_u16(status).unwrap(), body)
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        self.calls.lock().unwrap().push(request.clone());

        let next = self
            .routes
            .lock()
            .unwrap()
            .get_mut(&request.path)
            .and_then(|queue| queue.pop_front());

        let Some(scripted) = next else {
            return Err(TransportError::Connect(format!("no scripted response for {}", request.path)));
        };

        if let Some(gate) = scripted.gate {
            gate.notified().await;
        }
        if let Some(delay) = scripted.delay {
            tokio::time::sleep(delay).await;
        }
        scripted.result
    }
}

pub(crate) const USER_U1: &str =
    r#"{"id":"u1","email":"ana@example.com","name":"Ana","role":"owner","isEmailVerified":true,"settings":{"currency":"EUR","taxRate":21.0}}"#;

pub(crate) const USER_U2: &str =
    r#"{"id":"u2","email":"bo@example.com","name":"Bo","role":"owner","isEmailVerified":false}"#;

/// `{user, accessToken}` body for the given user JSON and token
pub(crate) fn auth_body(user: &str, token: &str) -> String {
    format!(r#"{{"user":{},"accessToken":"{}"}}"#, user, token)
}
