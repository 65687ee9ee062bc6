//! AWS SDK implementations of the cloud API traits.
//!
//! Clients are built from one shared `SdkConfig`. Region and profile come from
//! configuration when given, otherwise from the SDK's standard discovery
//! (environment, shared config files, instance metadata).

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_iam::error::DisplayErrorContext;
use models::{
    audit::{AuditEvent, AuditEventPage, AuditQuery, AuditResource},
    billing::{
        BillingQuery, BillingReport, CostGroup, DateInterval, GroupDefinition, MetricValue, ResultByTime,
        GROUP_BY_KEY, UNBLENDED_COST,
    },
    permission::AttachedPolicy,
};
use tracing::{debug, info};

use crate::cloud::api::{CloudTrailApi, CostExplorerApi, IamApi};
use crate::errors::ServiceError;

/// Resolve the shared SDK configuration.
pub async fn load_sdk_config(region: Option<&str>, profile: Option<&str>) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }
    if let Some(profile) = profile {
        loader = loader.profile_name(profile);
    }
    let config = loader.load().await;
    info!(region = ?config.region().map(|r| r.as_ref().to_string()), "aws sdk config loaded");
    config
}

fn upstream<E: std::error::Error>(err: E) -> ServiceError {
    ServiceError::Upstream(DisplayErrorContext(err).to_string())
}

fn invalid_request<E: std::fmt::Display>(err: E) -> ServiceError {
    ServiceError::Validation(err.to_string())
}

pub struct AwsCostExplorer {
    client: aws_sdk_costexplorer::Client,
}

impl AwsCostExplorer {
    pub fn new(config: &SdkConfig) -> Self {
        Self { client: aws_sdk_costexplorer::Client::new(config) }
    }
}

#[async_trait]
impl CostExplorerApi for AwsCostExplorer {
    async fn get_cost_and_usage(&self, query: &BillingQuery) -> Result<BillingReport, ServiceError> {
        use aws_sdk_costexplorer::types::{
            DateInterval as AwsInterval, Granularity, GroupDefinition as AwsGroupDefinition, GroupDefinitionType,
        };

        let period = AwsInterval::builder()
            .start(query.start.as_str())
            .end(query.end.as_str())
            .build()
            .map_err(invalid_request)?;
        let out = self
            .client
            .get_cost_and_usage()
            .time_period(period)
            .granularity(Granularity::from(query.granularity.as_str()))
            .metrics(UNBLENDED_COST)
            .group_by(
                AwsGroupDefinition::builder()
                    .r#type(GroupDefinitionType::Dimension)
                    .key(GROUP_BY_KEY)
                    .build(),
            )
            .send()
            .await
            .map_err(upstream)?;

        let results_by_time = out
            .results_by_time()
            .iter()
            .map(|r| ResultByTime {
                time_period: r
                    .time_period()
                    .map(|p| DateInterval { start: p.start().to_string(), end: p.end().to_string() })
                    .unwrap_or_default(),
                total: metric_map(r.total()),
                groups: r
                    .groups()
                    .iter()
                    .map(|g| CostGroup { keys: g.keys().to_vec(), metrics: metric_map(g.metrics()) })
                    .collect(),
                estimated: r.estimated(),
            })
            .collect::<Vec<_>>();
        let group_definitions = out
            .group_definitions()
            .iter()
            .map(|d| GroupDefinition {
                r#type: d.r#type().map(|t| t.as_str().to_string()),
                key: d.key().map(str::to_string),
            })
            .collect();

        debug!(periods = results_by_time.len(), "cost and usage fetched");
        Ok(BillingReport {
            results_by_time,
            group_definitions,
            next_page_token: out.next_page_token().map(str::to_string),
        })
    }
}

fn metric_map(
    metrics: Option<&HashMap<String, aws_sdk_costexplorer::types::MetricValue>>,
) -> BTreeMap<String, MetricValue> {
    metrics
        .map(|m| {
            m.iter()
                .map(|(name, v)| {
                    let value = MetricValue {
                        amount: v.amount().map(str::to_string),
                        unit: v.unit().map(str::to_string),
                    };
                    (name.clone(), value)
                })
                .collect()
        })
        .unwrap_or_default()
}

pub struct AwsIam {
    client: aws_sdk_iam::Client,
}

impl AwsIam {
    pub fn new(config: &SdkConfig) -> Self {
        Self { client: aws_sdk_iam::Client::new(config) }
    }
}

#[async_trait]
impl IamApi for AwsIam {
    async fn list_groups_for_user(&self, user_name: &str) -> Result<Vec<String>, ServiceError> {
        let mut groups = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let out = self
                .client
                .list_groups_for_user()
                .user_name(user_name)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(upstream)?;
            groups.extend(out.groups().iter().map(|g| g.group_name().to_string()));
            match out.marker() {
                Some(m) if out.is_truncated() => marker = Some(m.to_string()),
                _ => break,
            }
        }
        Ok(groups)
    }

    async fn list_attached_group_policies(&self, group_name: &str) -> Result<Vec<AttachedPolicy>, ServiceError> {
        let mut policies = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let out = self
                .client
                .list_attached_group_policies()
                .group_name(group_name)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(upstream)?;
            policies.extend(out.attached_policies().iter().map(|p| AttachedPolicy {
                policy_name: p.policy_name().unwrap_or_default().to_string(),
                policy_arn: p.policy_arn().unwrap_or_default().to_string(),
            }));
            match out.marker() {
                Some(m) if out.is_truncated() => marker = Some(m.to_string()),
                _ => break,
            }
        }
        Ok(policies)
    }

    async fn remove_user_from_group(&self, user_name: &str, group_name: &str) -> Result<(), ServiceError> {
        self.client
            .remove_user_from_group()
            .user_name(user_name)
            .group_name(group_name)
            .send()
            .await
            .map_err(upstream)?;
        Ok(())
    }

    async fn add_user_to_group(&self, user_name: &str, group_name: &str) -> Result<(), ServiceError> {
        self.client
            .add_user_to_group()
            .user_name(user_name)
            .group_name(group_name)
            .send()
            .await
            .map_err(upstream)?;
        Ok(())
    }
}

pub struct AwsCloudTrail {
    client: aws_sdk_cloudtrail::Client,
}

impl AwsCloudTrail {
    pub fn new(config: &SdkConfig) -> Self {
        Self { client: aws_sdk_cloudtrail::Client::new(config) }
    }
}

#[async_trait]
impl CloudTrailApi for AwsCloudTrail {
    async fn lookup_events_page(
        &self,
        query: &AuditQuery,
        page_size: i32,
        next_token: Option<String>,
    ) -> Result<AuditEventPage, ServiceError> {
        use aws_sdk_cloudtrail::{
            primitives::DateTime,
            types::{LookupAttribute, LookupAttributeKey},
        };

        let attribute = LookupAttribute::builder()
            .attribute_key(LookupAttributeKey::EventSource)
            .attribute_value(query.event_source())
            .build()
            .map_err(invalid_request)?;
        let out = self
            .client
            .lookup_events()
            .start_time(DateTime::from_secs(query.start_time().timestamp()))
            .end_time(DateTime::from_secs(query.end_time().timestamp()))
            .lookup_attributes(attribute)
            .max_results(page_size)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(upstream)?;

        let events = out.events().iter().map(audit_event).collect();
        Ok(AuditEventPage { events, next_token: out.next_token().map(str::to_string) })
    }
}

fn audit_event(e: &aws_sdk_cloudtrail::types::Event) -> AuditEvent {
    let owned = |s: Option<&str>| s.map(str::to_string);
    AuditEvent {
        event_id: owned(e.event_id()),
        event_name: owned(e.event_name()),
        read_only: owned(e.read_only()),
        access_key_id: owned(e.access_key_id()),
        event_time: e
            .event_time()
            .and_then(|t| chrono::DateTime::from_timestamp(t.secs(), t.subsec_nanos())),
        event_source: owned(e.event_source()),
        username: owned(e.username()),
        resources: e
            .resources()
            .iter()
            .map(|r| AuditResource {
                resource_type: owned(r.resource_type()),
                resource_name: owned(r.resource_name()),
            })
            .collect(),
        cloud_trail_event: owned(e.cloud_trail_event()),
    }
}
