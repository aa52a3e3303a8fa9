//! Authentication module for managing the user session.
//!
//! This module provides:
//! - `SessionStore`: the single live session, mirrored to durable storage
//! - `SessionManager`: login, registration, logout and token refresh
//! - Storage backends: `FileStorage`, `KeyringStorage`, `MemoryStorage`
//!
//! Sessions survive restarts until logout or a failed token refresh.

pub mod credentials;
pub mod manager;
pub mod session;
pub mod storage;

pub use credentials::KeyringStorage;
pub use manager::{SessionManager, SessionState};
pub use session::{Session, SessionStore};
pub use storage::{
    FileStorage, MemoryStorage, SessionStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY,
};
