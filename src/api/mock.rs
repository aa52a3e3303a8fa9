//! Scripted transport for unit tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;

use super::transport::{ApiRequest, ApiResponse, Transport};
use super::ApiError;

type Handler = dyn Fn(&ApiRequest) -> ApiResponse + Send + Sync;

/// Answers every request through a closure and records what was sent.
#[derive(Clone)]
pub struct MockTransport {
    handler: Arc<Handler>,
    requests: Arc<Mutex<Vec<ApiRequest>>>,
}

impl MockTransport {
    pub fn new(handler: impl Fn(&ApiRequest) -> ApiResponse + Send + Sync + 'static) -> Self {
        Self {
            handler: Arc::new(handler),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .collect()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let response = (self.handler)(&request);
        self.requests.lock().unwrap().push(request);
        // Let concurrent callers interleave like real I/O would.
        tokio::task::yield_now().await;
        Ok(response)
    }
}

pub fn json(status: StatusCode, value: serde_json::Value) -> ApiResponse {
    ApiResponse::new(status, value.to_string())
}

pub fn ok(value: serde_json::Value) -> ApiResponse {
    json(StatusCode::OK, value)
}

pub fn unauthorized() -> ApiResponse {
    json(
        StatusCode::UNAUTHORIZED,
        serde_json::json!({"detail": "Given token not valid for any token type"}),
    )
}

pub fn user_json(id: i64, email: &str, admin: bool) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": "Ana Souza",
        "email": email,
        "phone": null,
        "is_administrator": admin,
    })
}
