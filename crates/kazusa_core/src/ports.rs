//! crates/kazusa_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the platform's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or mail.

use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    Activity, ActivityFilters, Course, CourseFilters, CourseUpdate, Module, ModuleFilters,
    ModuleUpdate, NewActivity, NewCourse, NewModule, NewPayment, NewUser, Notification, Payment,
    PaymentFilters, User, UserFilters, UserUpdate,
};
use crate::query::Page;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, SMTP).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    /// The caller supplied an unsupported or insufficient filter combination.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    /// A read would have scanned a whole table.
    #[error("Missing pagination: {0}")]
    MissingPagination(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    /// Connectivity or constraint failure in a store.
    #[error("Storage error: {0}")]
    Storage(String),
    /// A lookup made while composing a read failed.
    #[error("Enrichment failed: {0}")]
    Enrichment(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// Whether the error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PortError::InvalidFilter(_)
                | PortError::MissingPagination(_)
                | PortError::NotFound(_)
                | PortError::Unauthorized
        )
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Store Ports (Traits)
//=========================================================================================
//
// `update` and `delete` report whether a row was affected: `Ok(false)` means
// nothing matched, which is distinct from a storage failure.

#[automock]
#[async_trait]
pub trait CourseStore: Send + Sync {
    async fn create(&self, course: NewCourse) -> PortResult<Uuid>;

    /// Never returns more than `page.limit()` rows.
    async fn read(&self, filters: &CourseFilters, page: Page) -> PortResult<Vec<Course>>;

    async fn update(&self, update: CourseUpdate) -> PortResult<bool>;

    async fn delete(&self, id: Uuid) -> PortResult<bool>;
}

#[automock]
#[async_trait]
pub trait ModuleStore: Send + Sync {
    async fn create(&self, module: NewModule) -> PortResult<Uuid>;

    /// Never returns more than `page.limit()` rows.
    async fn read(&self, filters: &ModuleFilters, page: Page) -> PortResult<Vec<Module>>;

    async fn update(&self, update: ModuleUpdate) -> PortResult<bool>;

    async fn delete(&self, id: Uuid) -> PortResult<bool>;
}

#[automock]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> PortResult<Uuid>;

    async fn read(&self, filters: &UserFilters, page: Page) -> PortResult<Vec<User>>;

    async fn update(&self, update: UserUpdate) -> PortResult<bool>;

    async fn delete(&self, id: Uuid) -> PortResult<bool>;
}

#[automock]
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create(&self, payment: NewPayment) -> PortResult<Uuid>;

    /// Marks every payment for the order as confirmed.
    async fn confirm(&self, order_id: Uuid) -> PortResult<bool>;

    /// Returns the confirmed payment for the (user, course) pair, if any.
    /// Both filter fields are required.
    async fn read(&self, filters: &PaymentFilters) -> PortResult<Option<Payment>>;
}

#[automock]
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Appends a row. Repeated events for the same module are kept.
    async fn create(&self, activity: NewActivity) -> PortResult<Uuid>;

    /// At least one filter field is required.
    async fn read(&self, filters: &ActivityFilters) -> PortResult<Vec<Activity>>;
}

//=========================================================================================
// Outbound Ports
//=========================================================================================

#[automock]
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send(&self, notification: Notification) -> PortResult<()>;
}

/// Blob storage for course covers and attachments.
#[automock]
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores `data` under a fresh key derived from `filename` and returns the
    /// public URL of the stored object.
    async fn put(&self, filename: &str, data: Vec<u8>) -> PortResult<String>;

    /// Removes an object previously returned by `put`. Unknown URLs are ignored.
    async fn delete(&self, url: &str) -> PortResult<()>;
}
