use async_trait::async_trait;
use models::{
    audit::{AuditEventPage, AuditQuery},
    billing::{BillingQuery, BillingReport},
    permission::AttachedPolicy,
};

use crate::errors::ServiceError;

/// Cost-and-usage reports (AWS Cost Explorer).
#[async_trait]
pub trait CostExplorerApi: Send + Sync {
    /// Unblended cost between the query bounds, grouped by service.
    async fn get_cost_and_usage(&self, query: &BillingQuery) -> Result<BillingReport, ServiceError>;
}

/// Group membership and group policies (AWS IAM).
#[async_trait]
pub trait IamApi: Send + Sync {
    async fn list_groups_for_user(&self, user_name: &str) -> Result<Vec<String>, ServiceError>;
    async fn list_attached_group_policies(&self, group_name: &str) -> Result<Vec<AttachedPolicy>, ServiceError>;
    async fn remove_user_from_group(&self, user_name: &str, group_name: &str) -> Result<(), ServiceError>;
    async fn add_user_to_group(&self, user_name: &str, group_name: &str) -> Result<(), ServiceError>;
}

/// Management-event lookup (AWS CloudTrail), one page per call.
#[async_trait]
pub trait CloudTrailApi: Send + Sync {
    async fn lookup_events_page(
        &self,
        query: &AuditQuery,
        page_size: i32,
        next_token: Option<String>,
    ) -> Result<AuditEventPage, ServiceError>;
}
