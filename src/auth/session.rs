use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{Context, Result};
use tracing::{debug, warn};

use super::storage::{SessionStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};
use crate::models::UserRecord;

/// In-memory view of the authenticated identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<UserRecord>,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Session {
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Owns the live session and mirrors it to durable storage.
///
/// Create one per process with [`SessionStore::open`]; tests create as many
/// independent stores as they need.
pub struct SessionStore {
    storage: Arc<dyn SessionStorage>,
    session: RwLock<Session>,
}

impl SessionStore {
    /// Rehydrate the session from storage.
    ///
    /// Unreadable entries are logged and treated as absent; a stored user
    /// record that no longer parses is removed.
    pub fn open(storage: Arc<dyn SessionStorage>) -> Self {
        let access_token = Self::read_key(storage.as_ref(), ACCESS_TOKEN_KEY);
        let refresh_token = Self::read_key(storage.as_ref(), REFRESH_TOKEN_KEY);
        let user = Self::read_key(storage.as_ref(), USER_KEY).and_then(|raw| {
            match serde_json::from_str::<UserRecord>(&raw) {
                Ok(user) => Some(user),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable stored user record");
                    if let Err(e) = storage.remove(USER_KEY) {
                        warn!(error = %e, "Failed to remove stored user record");
                    }
                    None
                }
            }
        });

        debug!(
            has_user = user.is_some(),
            has_access = access_token.is_some(),
            has_refresh = refresh_token.is_some(),
            "Session loaded"
        );

        Self {
            storage,
            session: RwLock::new(Session {
                user,
                access_token,
                refresh_token,
            }),
        }
    }

    fn read_key(storage: &dyn SessionStorage, key: &str) -> Option<String> {
        match storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(key, error = %e, "Failed to read session storage");
                None
            }
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> Session {
        self.read().clone()
    }

    pub fn user(&self) -> Option<UserRecord> {
        self.read().user.clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    /// Activate a freshly issued session, replacing any previous one.
    ///
    /// If any key fails to persist, storage is cleared so it never holds a
    /// mix of tokens from different sessions.
    pub fn establish(&self, access: &str, refresh: &str, user: &UserRecord) -> Result<()> {
        let user_json = serde_json::to_string(user).context("Failed to encode user record")?;

        let mut session = self.write();
        let persisted = self
            .storage
            .set(ACCESS_TOKEN_KEY, access)
            .and_then(|_| self.storage.set(REFRESH_TOKEN_KEY, refresh))
            .and_then(|_| self.storage.set(USER_KEY, &user_json));
        if let Err(e) = persisted {
            *session = Session::default();
            if let Err(clear_err) = self.storage.clear() {
                warn!(error = %clear_err, "Failed to clear session storage");
            }
            return Err(e);
        }

        *session = Session {
            user: Some(user.clone()),
            access_token: Some(access.to_string()),
            refresh_token: Some(refresh.to_string()),
        };
        Ok(())
    }

    /// Install tokens from a refresh exchange of `exchanged`.
    ///
    /// Returns `false` and leaves everything untouched when `exchanged` is no
    /// longer the stored refresh token, i.e. the session was torn down or
    /// replaced while the exchange was in flight. Without a rotated refresh
    /// token the current one is kept.
    pub fn rotate(&self, exchanged: &str, access: &str, refresh: Option<&str>) -> Result<bool> {
        let mut session = self.write();
        if session.refresh_token.as_deref() != Some(exchanged) {
            debug!("Discarding tokens from a superseded session");
            return Ok(false);
        }

        self.storage.set(ACCESS_TOKEN_KEY, access)?;
        if let Some(refresh) = refresh {
            self.storage.set(REFRESH_TOKEN_KEY, refresh)?;
        }

        session.access_token = Some(access.to_string());
        if let Some(refresh) = refresh {
            session.refresh_token = Some(refresh.to_string());
        }
        Ok(true)
    }

    /// Drop all in-memory and persisted state. Never fails; storage
    /// errors are logged.
    pub fn teardown(&self) {
        let mut session = self.write();
        *session = Session::default();
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Failed to clear session storage");
        }
    }
}
