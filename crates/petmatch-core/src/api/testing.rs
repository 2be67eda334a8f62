//! Scripted transport for exercising the pipeline without a server.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use tokio::sync::{mpsc, Notify};

use super::{ApiClient, ApiError, ApiRequest, ApiResponse, Transport};
use crate::auth::{navigation_channel, Route, TokenStore};

/// Pauses requests to one path until released.
#[derive(Clone, Default)]
pub(crate) struct Gate {
    /// Signalled when a held request arrives
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

/// Answers each `METHOD path` with queued responses, in order.
/// Unscripted requests get a 404.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    responses: Mutex<HashMap<String, VecDeque<ApiResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
    gates: Mutex<HashMap<String, Gate>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn respond(&self, method: Method, path: &str, status: u16, body: serde_json::Value) {
        let body = if body.is_null() { String::new() } else { body.to_string() };
        let response = ApiResponse::new(StatusCode::from_u16(status).unwrap(), body);
        self.responses
            .lock()
            .unwrap()
            .entry(format!("{} {}", method, path))
            .or_default()
            .push_back(response);
    }

    /// Hold every request to `path` until `release` is notified.
    pub(crate) fn hold(&self, path: &str) -> Gate {
        let gate = Gate::default();
        self.gates.lock().unwrap().insert(path.to_string(), gate.clone());
        gate
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        self.requests.lock().unwrap().push(request.clone());
        let gate = self.gates.lock().unwrap().get(&request.path).cloned();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        let key = format!("{} {}", request.method, request.path);
        let scripted = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front);
        Ok(scripted.unwrap_or_else(|| {
            ApiResponse::new(StatusCode::NOT_FOUND, r#"{"detail":"No scripted response"}"#)
        }))
    }
}

pub(crate) struct Fixture {
    pub transport: Arc<ScriptedTransport>,
    pub tokens: TokenStore,
    pub api: ApiClient,
    pub routes: mpsc::UnboundedReceiver<Route>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let transport = ScriptedTransport::new();
        let tokens = TokenStore::in_memory();
        let (navigator, routes) = navigation_channel();
        let api = ApiClient::new(transport.clone(), tokens.clone(), navigator);
        Self {
            transport,
            tokens,
            api,
            routes,
        }
    }

    /// Routes emitted so far
    pub(crate) fn drain_routes(&mut self) -> Vec<Route> {
        let mut routes = Vec::new();
        while let Ok(route) = self.routes.try_recv() {
            routes.push(route);
        }
        routes
    }
}

pub(crate) fn user_json(id: i64, email: &str, username: &str) -> serde_json::Value {
    serde_json::json!({"id": id, "email": email, "username": username})
}
