//! Login, registration, logout and token refresh.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::SessionStore;
use crate::api::{ApiError, ApiRequest, ApiResponse, Transport};
use crate::models::{Registration, UserRecord};

const LOGIN_PATH: &str = "/login/";
const REGISTER_PATH: &str = "/register/";
const REFRESH_PATH: &str = "/token/refresh/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
    user: UserRecord,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access: String,
    #[serde(default)]
    refresh: Option<String>,
}

/// Owns the process' authenticated identity.
///
/// Talks to the unauthenticated endpoints through the raw transport; every
/// other call goes through [`crate::api::AuthenticatedTransport`], which
/// calls back into [`SessionManager::refresh`].
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    store: Arc<SessionStore>,
    authenticating: AtomicBool,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<SessionStore>) -> Self {
        Self {
            transport,
            store,
            authenticating: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn state(&self) -> SessionState {
        if self.authenticating.load(Ordering::SeqCst) {
            SessionState::Authenticating
        } else if self.store.user().is_some() && self.store.access_token().is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    /// The last known user. No I/O.
    pub fn current_user(&self) -> Option<UserRecord> {
        self.store.user()
    }

    /// Exchange credentials for a session and make it the live one.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserRecord, ApiError> {
        self.authenticating.store(true, Ordering::SeqCst);
        let result = self.authenticate(email, password).await;
        self.authenticating.store(false, Ordering::SeqCst);
        result
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<UserRecord, ApiError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self.transport.send(ApiRequest::post_json(LOGIN_PATH, &body)?).await?;

        if response.status.is_client_error() {
            debug!(status = %response.status, "Login rejected");
            return Err(ApiError::InvalidCredentials);
        }
        let login: LoginResponse = response.error_for_status()?.json()?;

        self.store
            .establish(&login.access, &login.refresh, &login.user)
            .map_err(ApiError::Storage)?;
        info!(user_id = login.user.id, "Logged in");
        Ok(login.user)
    }

    /// Create an account, then log in with the same credentials.
    pub async fn register(&self, profile: &Registration) -> Result<UserRecord, ApiError> {
        let response = self
            .transport
            .send(ApiRequest::post_json(REGISTER_PATH, profile)?)
            .await?;

        if response.status.is_client_error() {
            let detail = ApiError::truncate_body(&response.text());
            debug!(status = %response.status, "Registration rejected");
            return Err(ApiError::RegistrationFailed(detail));
        }
        response.error_for_status()?;
        info!(email = %profile.email, "Account registered");

        self.login(&profile.email, &profile.password).await
    }

    /// Forget the session everywhere. Always succeeds.
    pub fn logout(&self) {
        self.store.teardown();
        info!("Logged out");
    }

    /// Trade the stored refresh token for a new access token.
    ///
    /// Any failure ends the session before `SessionExpired` is returned. If
    /// the session was logged out or replaced while the exchange was in
    /// flight, the new tokens are dropped and the current session is left
    /// alone.
    pub async fn refresh(&self) -> Result<String, ApiError> {
        let Some(refresh) = self.store.refresh_token() else {
            debug!("No refresh token stored");
            self.logout();
            return Err(ApiError::SessionExpired);
        };

        match self.exchange(&refresh).await {
            Ok(Some(access)) => Ok(access),
            Ok(None) => {
                info!("Session changed during token refresh; discarding refreshed tokens");
                Err(ApiError::SessionExpired)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed");
                self.logout();
                Err(ApiError::SessionExpired)
            }
        }
    }

    /// `Ok(None)` when `refresh` was no longer the stored token by the time
    /// the response arrived.
    async fn exchange(&self, refresh: &str) -> Result<Option<String>, ApiError> {
        let body = serde_json::json!({ "refresh": refresh });
        let response: ApiResponse = self
            .transport
            .send(ApiRequest::post_json(REFRESH_PATH, &body)?)
            .await?;
        let refreshed: RefreshResponse = response.error_for_status()?.json()?;

        let installed = self
            .store
            .rotate(refresh, &refreshed.access, refreshed.refresh.as_deref())
            .map_err(ApiError::Storage)?;
        if !installed {
            return Ok(None);
        }
        debug!(rotated = refreshed.refresh.is_some(), "Access token refreshed");
        Ok(Some(refreshed.access))
    }
}
