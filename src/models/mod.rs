//! Data models for portal entities.
//!
//! - `UserRecord`, `Registration`: accounts and sign-up requests
//! - `Training`, `ClassOffering`, `ClassDetail`: curricula and their cohorts
//! - `Resource`, `ResourceKind`: learning material attached to a class
//! - `NewTraining`, `NewClass`, `ClassUpdate`, `NewResource`: admin request bodies

pub mod resource;
pub mod training;
pub mod user;

pub use resource::{NewResource, Resource, ResourceKind};
pub use training::{ClassDetail, ClassOffering, ClassUpdate, NewClass, NewTraining, Training, TrainingRef};
pub use user::{Registration, UserRecord};
