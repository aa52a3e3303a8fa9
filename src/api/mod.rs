//! REST API client module for the training portal.
//!
//! This module provides the `ApiClient` for trainings, classes, learners
//! and resources, the `Transport` seam it sends through, and the
//! `AuthenticatedTransport` decorator that attaches bearer credentials and
//! recovers from a single token expiry per call.

pub mod client;
pub mod error;
pub mod interceptor;
pub mod transport;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{AdminOverview, ApiClient};
pub use error::ApiError;
pub use interceptor::AuthenticatedTransport;
pub use transport::{
    ApiRequest, ApiResponse, FilePart, MultipartForm, RequestBody, ReqwestTransport, Transport,
    DEFAULT_API_BASE_URL, REQUEST_TIMEOUT_SECS,
};
