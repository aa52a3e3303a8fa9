//! Client library for the turmas training portal.
//!
//! - `auth`: the session store, login/refresh flow and storage backends
//! - `api`: transport, credential interception and the typed API client
//! - `models`: trainings, classes, resources and users
//! - `visibility`: which resources a learner may open, and when
//! - `config`: persisted settings and environment overrides

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;
pub mod visibility;

pub use api::{ApiClient, ApiError};
pub use auth::{SessionManager, SessionStore};
pub use config::Config;
pub use visibility::can_access;
