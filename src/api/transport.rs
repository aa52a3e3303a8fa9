//! Transport abstraction for the portal API.
//!
//! Requests are plain values so the same call can be sent twice: the
//! interception layer resends a rejected request with only its credential
//! header replaced.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, multipart, Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::ApiError;

/// Default base URL for the portal API.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

/// HTTP request timeout in seconds.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A file attached to a multipart request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Multipart form kept as owned data so it survives a resend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    pub fields: Vec<(String, String)>,
    pub file: Option<FilePart>,
}

impl MultipartForm {
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, field: impl Into<String>, file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.file = Some(FilePart {
            field: field.into(),
            file_name: file_name.into(),
            bytes,
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    fn into_reqwest(self) -> multipart::Form {
        let mut form = multipart::Form::new();
        for (name, value) in self.fields {
            form = form.text(name, value);
        }
        if let Some(file) = self.file {
            let part = multipart::Part::bytes(file.bytes).file_name(file.file_name);
            form = form.part(file.field, part);
        }
        form
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(MultipartForm),
}

/// One outbound API call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, e.g. `/trainings/`.
    pub path: String,
    pub headers: header::HeaderMap,
    pub body: RequestBody,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: header::HeaderMap::new(),
            body: RequestBody::Empty,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post_json<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self, ApiError> {
        Ok(Self::new(Method::POST, path).with_body(RequestBody::Json(serde_json::to_value(body)?)))
    }

    pub fn patch_json<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self, ApiError> {
        Ok(Self::new(Method::PATCH, path).with_body(RequestBody::Json(serde_json::to_value(body)?)))
    }

    pub fn post_multipart(path: impl Into<String>, form: MultipartForm) -> Self {
        Self::new(Method::POST, path).with_body(RequestBody::Multipart(form))
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Replace the bearer credential, leaving every other header untouched.
    pub fn set_bearer(&mut self, token: &str) -> Result<(), ApiError> {
        let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::InvalidResponse("access token is not a valid header value".into()))?;
        self.headers.insert(header::AUTHORIZATION, value);
        Ok(())
    }

    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    /// Whether this call has already been resent after a credential refresh.
    pub fn is_retry(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retry(&mut self) {
        self.retried = true;
    }
}

#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))
    }

    /// Turn a non-success status into the matching `ApiError`.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, &self.text()))
        }
    }
}

/// Sends one request and returns whatever the server answered.
///
/// Only failures to obtain a response are errors; status handling belongs
/// to the caller.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

/// HTTP transport backed by reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url(&request.path);
        debug!(method = %request.method, url = %url, retry = request.is_retry(), "Sending request");

        let mut builder = self
            .client
            .request(request.method, &url)
            .headers(request.headers)
            .header(header::ACCEPT, "application/json");
        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => builder.multipart(form.into_reqwest()),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_bearer_only_touches_authorization() {
        let mut request = ApiRequest::post_json("/classes/register/", &serde_json::json!({"name": "A"}))
            .expect("json body");
        request
            .headers
            .insert("x-trace", header::HeaderValue::from_static("abc"));

        request.set_bearer("old").expect("header");
        request.set_bearer("new").expect("header");

        assert_eq!(request.bearer(), Some("new"));
        assert_eq!(request.headers.get("x-trace").and_then(|v| v.to_str().ok()), Some("abc"));
        assert_eq!(request.body, RequestBody::Json(serde_json::json!({"name": "A"})));
        assert_eq!(request.method, Method::POST);
    }

    #[test]
    fn test_retry_marker_is_per_request() {
        let mut first = ApiRequest::get("/trainings/");
        let second = first.clone();
        first.mark_retry();
        assert!(first.is_retry());
        assert!(!second.is_retry());
    }

    #[test]
    fn test_error_for_status() {
        let ok = ApiResponse::new(StatusCode::OK, "[]");
        assert!(ok.error_for_status().is_ok());

        let missing = ApiResponse::new(StatusCode::NOT_FOUND, "gone");
        assert!(matches!(missing.error_for_status(), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn test_url_join_trims_trailing_slash() {
        let transport = ReqwestTransport::new("http://localhost:8000/api/", Duration::from_secs(1))
            .expect("client");
        assert_eq!(transport.url("/login/"), "http://localhost:8000/api/login/");
    }

    #[test]
    fn test_multipart_field_lookup() {
        let form = MultipartForm::default()
            .text("name", "Intro")
            .file("file", "intro.pdf", vec![1, 2, 3]);
        assert_eq!(form.field("name"), Some("Intro"));
        assert_eq!(form.field("missing"), None);
        assert_eq!(form.file.as_ref().map(|f| f.bytes.len()), Some(3));
    }
}
