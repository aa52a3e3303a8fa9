//! Credential injection and one-shot refresh-and-retry around a transport.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::debug;

use super::transport::{ApiRequest, ApiResponse, Transport};
use super::ApiError;
use crate::auth::SessionManager;

/// Decorates a transport so each call carries the stored access token.
///
/// A call answered with 401 triggers one refresh and one resend with the
/// new token. The retry marker lives on the request itself, so concurrent
/// calls each get their own single retry. A second 401 is returned to the
/// caller as-is; a failed refresh surfaces as `SessionExpired`.
pub struct AuthenticatedTransport {
    inner: Arc<dyn Transport>,
    session: Arc<SessionManager>,
}

impl AuthenticatedTransport {
    pub fn new(inner: Arc<dyn Transport>, session: Arc<SessionManager>) -> Self {
        Self { inner, session }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }
}

#[async_trait]
impl Transport for AuthenticatedTransport {
    async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        if let Some(token) = self.session.store().access_token() {
            request.set_bearer(&token)?;
        }

        let response = self.inner.send(request.clone()).await?;
        if response.status != StatusCode::UNAUTHORIZED || request.is_retry() {
            return Ok(response);
        }

        debug!(path = %request.path, "Credential rejected, refreshing");
        let token = self.session.refresh().await?;
        request.mark_retry();
        request.set_bearer(&token)?;
        self.inner.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::{self, MockTransport};
    use crate::api::{MultipartForm, RequestBody};
    use crate::auth::{MemoryStorage, SessionState, SessionStore};
    use crate::models::UserRecord;

    fn user() -> UserRecord {
        UserRecord {
            id: 1,
            name: "Ana".into(),
            email: "a@x.com".into(),
            phone: None,
            is_administrator: false,
            is_staff: false,
        }
    }

    /// Server that accepts only `fresh` as access token and issues it on refresh.
    fn expiring_server() -> MockTransport {
        MockTransport::new(|req| match req.path.as_str() {
            "/token/refresh/" => mock::ok(serde_json::json!({"access": "fresh"})),
            _ if req.bearer() == Some("fresh") => mock::ok(serde_json::json!([{"id": 1, "name": "NR-10"}])),
            _ => mock::unauthorized(),
        })
    }

    fn wrap(transport: &MockTransport, access: &str) -> AuthenticatedTransport {
        let store = Arc::new(SessionStore::open(Arc::new(MemoryStorage::new())));
        store.establish(access, "refresh-1", &user()).unwrap();
        let inner: Arc<dyn Transport> = Arc::new(transport.clone());
        let session = Arc::new(SessionManager::new(inner.clone(), store));
        AuthenticatedTransport::new(inner, session)
    }

    #[tokio::test]
    async fn test_attaches_stored_token() {
        let transport = expiring_server();
        let authed = wrap(&transport, "fresh");

        let response = authed.send(ApiRequest::get("/trainings/")).await.unwrap();
        assert!(response.is_success());
        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].bearer(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_single_expiry_is_retried_transparently() {
        let transport = expiring_server();
        let authed = wrap(&transport, "stale");
        let form = MultipartForm::default().text("name", "Slides").file("file", "s.pdf", vec![1]);

        let response = authed
            .send(ApiRequest::post_multipart("/resources/register/", form.clone()))
            .await
            .unwrap();
        assert!(response.is_success());
        assert_eq!(response.json::<serde_json::Value>().unwrap()[0]["name"], "NR-10");

        let sent = transport.requests_to("/resources/register/");
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].bearer(), Some("stale"));
        assert_eq!(sent[1].bearer(), Some("fresh"));
        assert!(sent[1].is_retry());
        assert_eq!(sent[1].method, sent[0].method);
        assert_eq!(sent[1].body, RequestBody::Multipart(form));
        assert_eq!(transport.requests_to("/token/refresh/").len(), 1);
        assert_eq!(authed.session().state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_second_rejection_is_not_retried() {
        let transport = MockTransport::new(|req| match req.path.as_str() {
            "/token/refresh/" => mock::ok(serde_json::json!({"access": "still-rejected"})),
            _ => mock::unauthorized(),
        });
        let authed = wrap(&transport, "stale");

        let response = authed.send(ApiRequest::get("/learners/")).await.unwrap();
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(transport.requests_to("/learners/").len(), 2);
        assert_eq!(transport.requests_to("/token/refresh/").len(), 1);
        assert!(matches!(response.error_for_status(), Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_failed_refresh_surfaces_session_expired() {
        let transport = MockTransport::new(|_| mock::unauthorized());
        let authed = wrap(&transport, "stale");

        let err = authed.send(ApiRequest::get("/resources/")).await.unwrap_err();
        assert!(matches!(err, ApiError::SessionExpired));
        assert_eq!(transport.requests_to("/resources/").len(), 1);
        assert_eq!(authed.session().state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_non_auth_failures_pass_through() {
        let transport = MockTransport::new(|_| {
            mock::json(StatusCode::INTERNAL_SERVER_ERROR, serde_json::json!({"detail": "boom"}))
        });
        let authed = wrap(&transport, "fresh");

        let response = authed.send(ApiRequest::get("/trainings/")).await.unwrap();
        assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_calls_each_retry_once() {
        let transport = expiring_server();
        let authed = wrap(&transport, "stale");

        let (a, b) = futures::join!(
            authed.send(ApiRequest::get("/trainings/")),
            authed.send(ApiRequest::get("/learners/")),
        );
        assert!(a.unwrap().is_success());
        assert!(b.unwrap().is_success());

        for path in ["/trainings/", "/learners/"] {
            let sent = transport.requests_to(path);
            assert!(!sent.is_empty() && sent.len() <= 2, "{} sent {} times", path, sent.len());
            assert_eq!(sent.last().and_then(|r| r.bearer()), Some("fresh"));
        }
    }

    #[tokio::test]
    async fn test_anonymous_call_sends_no_credential() {
        let transport = MockTransport::new(|_| mock::ok(serde_json::json!([])));
        let store = Arc::new(SessionStore::open(Arc::new(MemoryStorage::new())));
        let inner: Arc<dyn Transport> = Arc::new(transport.clone());
        let authed = AuthenticatedTransport::new(inner.clone(), Arc::new(SessionManager::new(inner, store)));

        authed.send(ApiRequest::get("/trainings/")).await.unwrap();
        assert_eq!(transport.requests()[0].bearer(), None);
    }
}
