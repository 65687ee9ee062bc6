//! Storage abstractions for the record store service.

pub mod record_store;

use async_trait::async_trait;
use models::user_record::UserRecord;

use crate::errors::ServiceError;

/// Trait abstraction over user record persistence.
/// The HTTP layer only sees this; the shipped implementation is file-backed.
#[async_trait]
pub trait UserRecordRepository: Send + Sync {
    /// Create or overwrite the record; returns the storage file name.
    async fn add(&self, record: &UserRecord) -> Result<String, ServiceError>;
    async fn list(&self) -> Result<Vec<String>, ServiceError>;
    async fn get(&self, id: &str) -> Result<UserRecord, ServiceError>;
}
