//! API client for the training portal REST API.
//!
//! This module provides the `ApiClient` struct for making authenticated
//! requests for trainings, classes, learners and resources.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::transport::{ApiRequest, ApiResponse, Transport};
use super::{ApiError, AuthenticatedTransport};
use crate::auth::SessionManager;
use crate::models::{
    ClassDetail, ClassOffering, ClassUpdate, NewClass, NewResource, NewTraining, Resource, Training,
    UserRecord,
};
use crate::visibility::ClassAccess;

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Everything the admin screens list at once.
#[derive(Debug, Clone, Default)]
pub struct AdminOverview {
    pub classes: Vec<ClassOffering>,
    pub trainings: Vec<Training>,
    pub learners: Vec<UserRecord>,
}

/// Typed access to the portal endpoints.
/// Clone is cheap - the transport is shared.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    initial_backoff: Duration,
}

impl ApiClient {
    /// Client over an arbitrary transport. Calls are sent as-is.
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    /// Client whose calls carry the session's credentials and recover
    /// from a single token expiry.
    pub fn authenticated(inner: Arc<dyn Transport>, session: Arc<SessionManager>) -> Self {
        Self::new(Arc::new(AuthenticatedTransport::new(inner, session)))
    }

    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = self.transport.send(request.clone()).await?;
            if response.status != StatusCode::TOO_MANY_REQUESTS {
                return response.error_for_status();
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited);
            }
            warn!(
                path = %request.path,
                retry = retries,
                backoff_ms = backoff.as_millis() as u64,
                "Rate limited, backing off"
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2; // Exponential backoff
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(ApiRequest::get(path)).await?.json()
    }

    /// Send a write request, ignoring whatever body the server returns.
    async fn send_write(&self, request: ApiRequest) -> Result<(), ApiError> {
        let path = request.path.clone();
        let response = self.execute(request).await?;
        debug!(path = %path, status = %response.status, "Write accepted");
        Ok(())
    }

    // ===== Learner views =====

    /// Classes the learner is enrolled in, each with its training and resources.
    pub async fn fetch_learner_classes(&self, learner_id: i64) -> Result<Vec<ClassOffering>, ApiError> {
        self.get(&format!("/learners/{}/trainings/", learner_id)).await
    }

    /// Classes linked to a user (enrolled in or created by).
    pub async fn fetch_classes_for_user(&self, user_id: i64) -> Result<Vec<ClassOffering>, ApiError> {
        self.get(&format!("/classes/by-user/{}/", user_id)).await
    }

    pub async fn fetch_class_detail(&self, class_id: i64) -> Result<ClassOffering, ApiError> {
        let detail: ClassDetail = self.get(&format!("/classes/{}/detail/", class_id)).await?;
        Ok(detail.into_class())
    }

    /// The learner dashboard: every enrolled class with each resource marked
    /// available or locked at `now`.
    pub async fn fetch_dashboard(
        &self,
        learner_id: i64,
        now: NaiveDateTime,
    ) -> Result<Vec<ClassAccess>, ApiError> {
        let classes = self.fetch_learner_classes(learner_id).await?;
        Ok(classes
            .into_iter()
            .map(|class| ClassAccess {
                resources: class.resource_access(now),
                class,
            })
            .collect())
    }

    // ===== Admin listings =====

    pub async fn fetch_learners(&self) -> Result<Vec<UserRecord>, ApiError> {
        self.get("/learners/").await
    }

    pub async fn fetch_trainings(&self) -> Result<Vec<Training>, ApiError> {
        self.get("/trainings/").await
    }

    pub async fn fetch_classes(&self) -> Result<Vec<ClassOffering>, ApiError> {
        self.get("/classes/").await
    }

    pub async fn fetch_resources(&self) -> Result<Vec<Resource>, ApiError> {
        self.get("/resources/").await
    }

    /// Classes, trainings and learners, fetched concurrently.
    pub async fn fetch_admin_overview(&self) -> Result<AdminOverview, ApiError> {
        let (classes, trainings, learners) = futures::try_join!(
            self.fetch_classes(),
            self.fetch_trainings(),
            self.fetch_learners(),
        )?;
        Ok(AdminOverview {
            classes,
            trainings,
            learners,
        })
    }

    // ===== Admin writes =====

    pub async fn create_training(&self, training: &NewTraining) -> Result<(), ApiError> {
        self.send_write(ApiRequest::post_json("/trainings/register/", training)?)
            .await
    }

    pub async fn create_class(&self, class: &NewClass) -> Result<(), ApiError> {
        self.send_write(ApiRequest::post_json("/classes/register/", class)?)
            .await
    }

    pub async fn update_class(&self, class_id: i64, update: &ClassUpdate) -> Result<(), ApiError> {
        self.send_write(ApiRequest::patch_json(format!("/classes/{}/edit/", class_id), update)?)
            .await
    }

    /// Replace the class' enrolment set with `learner_ids`.
    pub async fn enroll_learners(&self, class_id: i64, learner_ids: Vec<i64>) -> Result<(), ApiError> {
        self.update_class(class_id, &ClassUpdate::enrol(learner_ids)).await
    }

    pub async fn create_resource(&self, resource: &NewResource) -> Result<(), ApiError> {
        self.send_write(ApiRequest::post_multipart("/resources/register/", resource.to_form()))
            .await
    }
}
