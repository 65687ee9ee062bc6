//! Cloud proxy: billing, IAM group membership and CloudTrail lookups.
//!
//! `api` defines one trait per upstream API, `service` holds the request
//! logic on top of them, and `aws` implements the traits with the AWS SDK.

pub mod api;
pub mod aws;
pub mod service;
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use api::{CloudTrailApi, CostExplorerApi, IamApi};
pub use service::CloudProxyService;
