use std::{collections::HashSet, future::Future, sync::Arc};

use common::metrics::observe_upstream;
use models::{
    audit::{AuditEvent, AuditQuery, MAX_PAGE_SIZE},
    billing::{BillingQuery, BillingReport},
    permission::{validate_group_name, validate_user_name, GroupPermissions},
};
use tracing::{info, instrument, warn};

use crate::cloud::api::{CloudTrailApi, CostExplorerApi, IamApi};
use crate::errors::ServiceError;

/// Application service for the cloud proxy endpoints.
///
/// Every operation is a short linear sequence of upstream calls with no
/// retries and no rollback; the first failing call ends the operation.
#[derive(Clone)]
pub struct CloudProxyService {
    billing: Arc<dyn CostExplorerApi>,
    iam: Arc<dyn IamApi>,
    trail: Arc<dyn CloudTrailApi>,
    audit_page_size: i32,
}

impl CloudProxyService {
    pub fn new(
        billing: Arc<dyn CostExplorerApi>,
        iam: Arc<dyn IamApi>,
        trail: Arc<dyn CloudTrailApi>,
    ) -> Self {
        Self { billing, iam, trail, audit_page_size: MAX_PAGE_SIZE }
    }

    /// Page size for CloudTrail lookups, clamped to what the API accepts.
    pub fn with_audit_page_size(mut self, page_size: i32) -> Self {
        self.audit_page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    #[instrument(skip(self), fields(start = %query.start, end = %query.end, granularity = %query.granularity))]
    pub async fn get_billing(&self, query: &BillingQuery) -> Result<BillingReport, ServiceError> {
        tracked("get_cost_and_usage", self.billing.get_cost_and_usage(query)).await
    }

    /// Groups of `user_name` with the policies attached to each group.
    #[instrument(skip(self))]
    pub async fn get_user_permissions(&self, user_name: &str) -> Result<Vec<GroupPermissions>, ServiceError> {
        validate_user_name(user_name)?;
        let groups = tracked("list_groups_for_user", self.iam.list_groups_for_user(user_name)).await?;

        let mut result = Vec::with_capacity(groups.len());
        for group_name in groups {
            let attached_policies = tracked(
                "list_attached_group_policies",
                self.iam.list_attached_group_policies(&group_name),
            )
            .await?;
            result.push(GroupPermissions { group_name, attached_policies });
        }
        Ok(result)
    }

    /// Remove the user from every group it belongs to. Earlier removals are
    /// kept when a later one fails.
    #[instrument(skip(self))]
    pub async fn remove_user_from_all_groups(&self, user_name: &str) -> Result<String, ServiceError> {
        validate_user_name(user_name)?;
        let groups = tracked("list_groups_for_user", self.iam.list_groups_for_user(user_name)).await?;

        for (removed, group_name) in groups.iter().enumerate() {
            if let Err(e) = tracked(
                "remove_user_from_group",
                self.iam.remove_user_from_group(user_name, group_name),
            )
            .await
            {
                warn!(%group_name, removed, total = groups.len(), "group removal aborted part way");
                return Err(e);
            }
            info!(%group_name, "removed user from group");
        }
        Ok(format!("Remove user {user_name} from all groups successfully."))
    }

    /// No existence check on the group; IAM reports unknown groups itself.
    #[instrument(skip(self))]
    pub async fn add_user_to_group(&self, user_name: &str, group_name: &str) -> Result<String, ServiceError> {
        validate_user_name(user_name)?;
        validate_group_name(group_name)?;
        tracked("add_user_to_group", self.iam.add_user_to_group(user_name, group_name)).await?;
        info!("added user to group");
        Ok(format!("Add user {user_name} to group {group_name} successfully."))
    }

    /// All events of the query window, following `NextToken` to the last page.
    #[instrument(skip(self), fields(service = %query.service))]
    pub async fn get_audit_events(&self, query: &AuditQuery) -> Result<Vec<AuditEvent>, ServiceError> {
        let mut events = Vec::new();
        let mut next_token: Option<String> = None;
        let mut seen_tokens = HashSet::new();
        let mut pages = 0usize;
        loop {
            let page = tracked(
                "lookup_events",
                self.trail.lookup_events_page(query, self.audit_page_size, next_token.take()),
            )
            .await?;
            pages += 1;
            events.extend(page.events);

            match page.next_token {
                Some(token) if !seen_tokens.insert(token.clone()) => {
                    warn!(pages, %token, "CloudTrail repeated a page token; stopping");
                    break;
                }
                Some(token) => next_token = Some(token),
                None => break,
            }
        }
        info!(pages, count = events.len(), "audit events collected");
        Ok(events)
    }
}

async fn tracked<T, F>(operation: &'static str, call: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    let res = call.await;
    observe_upstream(operation, res.is_ok());
    if let Err(e) = &res {
        warn!(operation, error = %e, "upstream call failed");
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::mock::{MockCloudTrail, MockCostExplorer, MockIam};
    use models::{billing::Granularity, permission::AttachedPolicy};

    fn service(billing: MockCostExplorer, iam: Arc<MockIam>, trail: Arc<MockCloudTrail>) -> CloudProxyService {
        CloudProxyService::new(Arc::new(billing), iam, trail)
    }

    fn event(id: &str) -> AuditEvent {
        AuditEvent { event_id: Some(id.into()), ..Default::default() }
    }

    #[tokio::test]
    async fn billing_failure_surfaces_as_upstream_error() {
        let svc = service(
            MockCostExplorer::failing("AccessDeniedException: not authorized"),
            Arc::new(MockIam::default()),
            Arc::new(MockCloudTrail::default()),
        );
        let q = BillingQuery::new("2024-01-01", "2024-02-01", Granularity::Daily).unwrap();
        let err = svc.get_billing(&q).await.unwrap_err();
        assert!(matches!(err, ServiceError::Upstream(ref m) if m.contains("AccessDenied")));
    }

    #[tokio::test]
    async fn permissions_list_policies_per_group_in_order() {
        let iam = Arc::new(
            MockIam::default()
                .with_membership("alice", &["Admins", "Dev"])
                .with_policies("Admins", &[("AdministratorAccess", "arn:aws:iam::aws:policy/AdministratorAccess")])
                .with_group("Dev"),
        );
        let svc = service(MockCostExplorer::default(), iam, Arc::new(MockCloudTrail::default()));
        let perms = svc.get_user_permissions("alice").await.unwrap();
        assert_eq!(perms.len(), 2);
        assert_eq!(perms[0].group_name, "Admins");
        assert_eq!(
            perms[0].attached_policies,
            vec![AttachedPolicy {
                policy_name: "AdministratorAccess".into(),
                policy_arn: "arn:aws:iam::aws:policy/AdministratorAccess".into(),
            }]
        );
        assert_eq!(perms[1].group_name, "Dev");
        assert!(perms[1].attached_policies.is_empty());
    }

    #[tokio::test]
    async fn remove_from_zero_groups_confirms() {
        let iam = Arc::new(MockIam::default());
        let svc = service(MockCostExplorer::default(), iam.clone(), Arc::new(MockCloudTrail::default()));
        let msg = svc.remove_user_from_all_groups("nobody").await.unwrap();
        assert_eq!(msg, "Remove user nobody from all groups successfully.");
    }

    #[tokio::test]
    async fn remove_stops_at_first_failure_without_rollback() {
        let iam = Arc::new(
            MockIam::default()
                .with_membership("bob", &["A", "B", "C"])
                .fail_removal_from("B"),
        );
        let svc = service(MockCostExplorer::default(), iam.clone(), Arc::new(MockCloudTrail::default()));
        assert!(svc.remove_user_from_all_groups("bob").await.is_err());
        // A was removed and stays removed; C was never attempted
        assert_eq!(iam.groups_of("bob"), vec!["B".to_string(), "C".to_string()]);
    }

    #[tokio::test]
    async fn add_to_unknown_group_reports_upstream_error() {
        let iam = Arc::new(MockIam::default().with_group("Dev"));
        let svc = service(MockCostExplorer::default(), iam.clone(), Arc::new(MockCloudTrail::default()));
        let msg = svc.add_user_to_group("carol", "Dev").await.unwrap();
        assert_eq!(msg, "Add user carol to group Dev successfully.");
        assert_eq!(iam.groups_of("carol"), vec!["Dev".to_string()]);

        let err = svc.add_user_to_group("carol", "Ghosts").await.unwrap_err();
        assert!(matches!(err, ServiceError::Upstream(ref m) if m.contains("NoSuchEntity")));
    }

    #[tokio::test]
    async fn invalid_names_rejected_before_any_call() {
        let iam = Arc::new(MockIam::default());
        let svc = service(MockCostExplorer::default(), iam.clone(), Arc::new(MockCloudTrail::default()));
        assert!(svc.get_user_permissions("").await.unwrap_err().is_client_error());
        assert!(svc.add_user_to_group("dave", "a/b").await.unwrap_err().is_client_error());
        assert_eq!(iam.call_count(), 0);
    }

    #[tokio::test]
    async fn audit_events_concatenate_all_pages() {
        let trail = Arc::new(MockCloudTrail::with_pages(vec![
            vec![event("1"), event("2")],
            vec![event("3")],
            vec![event("4"), event("5")],
        ]));
        let svc = service(MockCostExplorer::default(), Arc::new(MockIam::default()), trail.clone())
            .with_audit_page_size(500);
        let q = AuditQuery::parse("s3", "2024-01-01", "2024-01-31").unwrap();
        let events = svc.get_audit_events(&q).await.unwrap();
        let ids: Vec<_> = events.iter().filter_map(|e| e.event_id.clone()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);

        let calls = trail.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0], (None, 50));
        assert_eq!(calls[1], (Some("1".to_string()), 50));
        assert_eq!(calls[2], (Some("2".to_string()), 50));
    }

    /// Hands out tokens from a fixed script, one event per page.
    struct ScriptedTrail {
        tokens: Vec<Option<&'static str>>,
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CloudTrailApi for ScriptedTrail {
        async fn lookup_events_page(
            &self,
            _query: &AuditQuery,
            _page_size: i32,
            _next_token: Option<String>,
        ) -> Result<models::audit::AuditEventPage, ServiceError> {
            let n = self.calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n >= 20 {
                return Err(ServiceError::Upstream("lookup loop did not stop".into()));
            }
            let token = self.tokens.get(n).copied().flatten().map(str::to_string);
            Ok(models::audit::AuditEventPage { events: vec![event(&n.to_string())], next_token: token })
        }
    }

    #[tokio::test]
    async fn audit_lookup_stops_when_tokens_cycle() {
        // B -> A -> B -> A ... never ends on its own
        let script = [Some("B"), Some("A")].into_iter().cycle().take(40).collect();
        let trail = Arc::new(ScriptedTrail { tokens: script, calls: Default::default() });
        let svc = CloudProxyService::new(
            Arc::new(MockCostExplorer::default()),
            Arc::new(MockIam::default()),
            trail.clone(),
        );
        let q = AuditQuery::parse("s3", "2024-01-01", "2024-01-02").unwrap();

        let events = svc.get_audit_events(&q).await.unwrap();
        // pages answered with B, A, then B again
        assert_eq!(events.len(), 3);
        assert_eq!(trail.calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn audit_failure_midway_discards_partial_result() {
        let trail = Arc::new(
            MockCloudTrail::with_pages(vec![vec![event("1")], vec![event("2")]]).fail_on_page(1),
        );
        let svc = service(MockCostExplorer::default(), Arc::new(MockIam::default()), trail);
        let q = AuditQuery::parse("iam", "2024-01-01", "2024-01-01").unwrap();
        assert!(matches!(svc.get_audit_events(&q).await, Err(ServiceError::Upstream(_))));
    }
}
