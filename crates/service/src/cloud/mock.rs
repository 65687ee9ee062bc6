//! In-memory stand-ins for the cloud APIs, used by unit and router tests.

use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use models::{
    audit::{AuditEvent, AuditEventPage, AuditQuery},
    billing::{BillingQuery, BillingReport},
    permission::AttachedPolicy,
};

use crate::cloud::api::{CloudTrailApi, CostExplorerApi, IamApi};
use crate::errors::ServiceError;

pub struct MockCostExplorer {
    result: Result<BillingReport, String>,
    queries: Mutex<Vec<BillingQuery>>,
}

impl Default for MockCostExplorer {
    fn default() -> Self {
        Self::with_report(BillingReport::default())
    }
}

impl MockCostExplorer {
    pub fn with_report(report: BillingReport) -> Self {
        Self { result: Ok(report), queries: Mutex::new(Vec::new()) }
    }

    pub fn failing(message: &str) -> Self {
        Self { result: Err(message.to_string()), queries: Mutex::new(Vec::new()) }
    }

    pub fn queries(&self) -> Vec<BillingQuery> {
        self.queries.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl CostExplorerApi for MockCostExplorer {
    async fn get_cost_and_usage(&self, query: &BillingQuery) -> Result<BillingReport, ServiceError> {
        self.queries.lock().expect("mock lock").push(query.clone());
        self.result.clone().map_err(ServiceError::Upstream)
    }
}

/// IAM with a mutable membership table and a fixed set of known groups.
#[derive(Default)]
pub struct MockIam {
    memberships: Mutex<BTreeMap<String, Vec<String>>>,
    groups: BTreeMap<String, Vec<AttachedPolicy>>,
    fail_removal: Option<String>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockIam {
    pub fn with_group(mut self, group: &str) -> Self {
        self.groups.entry(group.to_string()).or_default();
        self
    }

    pub fn with_policies(mut self, group: &str, policies: &[(&str, &str)]) -> Self {
        let entry = self.groups.entry(group.to_string()).or_default();
        entry.extend(policies.iter().map(|(name, arn)| AttachedPolicy {
            policy_name: name.to_string(),
            policy_arn: arn.to_string(),
        }));
        self
    }

    pub fn with_membership(mut self, user: &str, groups: &[&str]) -> Self {
        for g in groups {
            self.groups.entry(g.to_string()).or_default();
        }
        self.memberships
            .get_mut()
            .expect("mock lock")
            .insert(user.to_string(), groups.iter().map(|g| g.to_string()).collect());
        self
    }

    pub fn fail_removal_from(mut self, group: &str) -> Self {
        self.fail_removal = Some(group.to_string());
        self
    }

    /// Every call fails with `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn groups_of(&self, user: &str) -> Vec<String> {
        self.memberships.lock().expect("mock lock").get(user).cloned().unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), ServiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(msg) => Err(ServiceError::Upstream(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IamApi for MockIam {
    async fn list_groups_for_user(&self, user_name: &str) -> Result<Vec<String>, ServiceError> {
        self.enter()?;
        Ok(self.groups_of(user_name))
    }

    async fn list_attached_group_policies(&self, group_name: &str) -> Result<Vec<AttachedPolicy>, ServiceError> {
        self.enter()?;
        self.groups.get(group_name).cloned().ok_or_else(|| no_such_group(group_name))
    }

    async fn remove_user_from_group(&self, user_name: &str, group_name: &str) -> Result<(), ServiceError> {
        self.enter()?;
        if self.fail_removal.as_deref() == Some(group_name) {
            return Err(ServiceError::Upstream(format!(
                "LimitExceeded: cannot remove {user_name} from {group_name}"
            )));
        }
        let mut memberships = self.memberships.lock().expect("mock lock");
        if let Some(groups) = memberships.get_mut(user_name) {
            groups.retain(|g| g != group_name);
        }
        Ok(())
    }

    async fn add_user_to_group(&self, user_name: &str, group_name: &str) -> Result<(), ServiceError> {
        self.enter()?;
        if !self.groups.contains_key(group_name) {
            return Err(no_such_group(group_name));
        }
        let mut memberships = self.memberships.lock().expect("mock lock");
        let groups = memberships.entry(user_name.to_string()).or_default();
        if !groups.iter().any(|g| g == group_name) {
            groups.push(group_name.to_string());
        }
        Ok(())
    }
}

fn no_such_group(group_name: &str) -> ServiceError {
    ServiceError::Upstream(format!("NoSuchEntity: The group with name {group_name} cannot be found."))
}

/// CloudTrail serving fixed pages; the page token is the page index.
#[derive(Default)]
pub struct MockCloudTrail {
    pages: Vec<Vec<AuditEvent>>,
    fail_on: Option<usize>,
    calls: Mutex<Vec<(Option<String>, i32)>>,
}

impl MockCloudTrail {
    pub fn with_pages(pages: Vec<Vec<AuditEvent>>) -> Self {
        Self { pages, ..Default::default() }
    }

    pub fn fail_on_page(mut self, index: usize) -> Self {
        self.fail_on = Some(index);
        self
    }

    /// `(next_token, page_size)` of every lookup received.
    pub fn calls(&self) -> Vec<(Option<String>, i32)> {
        self.calls.lock().expect("mock lock").clone()
    }
}

#[async_trait]
impl CloudTrailApi for MockCloudTrail {
    async fn lookup_events_page(
        &self,
        _query: &AuditQuery,
        page_size: i32,
        next_token: Option<String>,
    ) -> Result<AuditEventPage, ServiceError> {
        self.calls.lock().expect("mock lock").push((next_token.clone(), page_size));
        let index = match next_token.as_deref() {
            Some(t) => t
                .parse::<usize>()
                .map_err(|_| ServiceError::Upstream(format!("InvalidNextTokenException: {t}")))?,
            None => 0,
        };
        if self.fail_on == Some(index) {
            return Err(ServiceError::Upstream("ThrottlingException: Rate exceeded".into()));
        }
        let events = self.pages.get(index).cloned().unwrap_or_default();
        let next_token = (index + 1 < self.pages.len()).then(|| (index + 1).to_string());
        Ok(AuditEventPage { events, next_token })
    }
}
