use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

pub const EVENT_SOURCE_SUFFIX: &str = ".amazonaws.com";
/// CloudTrail `LookupEvents` returns at most 50 events per page.
pub const MAX_PAGE_SIZE: i32 = 50;

/// Validated audit-log lookup: one originating service over whole days.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditQuery {
    pub service: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl AuditQuery {
    /// Parse `YYYY-MM-DD` bounds; the end date is inclusive.
    pub fn parse(service: &str, start_date: &str, end_date: &str) -> Result<Self, ModelError> {
        let service = service.trim();
        if service.is_empty() {
            return Err(ModelError::Validation("service required".into()));
        }
        if !service.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.') {
            return Err(ModelError::Validation(format!("invalid service name {service:?}")));
        }
        let start_date = parse_day("start_date", start_date)?;
        let end_date = parse_day("end_date", end_date)?;
        if start_date > end_date {
            return Err(ModelError::Validation("start_date must not be after end_date".into()));
        }
        Ok(Self { service: service.to_string(), start_date, end_date })
    }

    /// `s3` -> `s3.amazonaws.com`
    pub fn event_source(&self) -> String {
        format!("{}{}", self.service, EVENT_SOURCE_SUFFIX)
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        midnight(self.start_date)
    }

    /// Midnight after `end_date`, so events of the end day are included.
    pub fn end_time(&self) -> DateTime<Utc> {
        let next = self.end_date.checked_add_days(Days::new(1)).unwrap_or(self.end_date);
        midnight(next)
    }
}

fn parse_day(field: &str, value: &str) -> Result<NaiveDate, ModelError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ModelError::Validation(format!("{field} must be YYYY-MM-DD (got {value:?})")))
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::default()).and_utc()
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuditResource {
    pub resource_type: Option<String>,
    pub resource_name: Option<String>,
}

/// A CloudTrail management event as returned by `LookupEvents`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuditEvent {
    pub event_id: Option<String>,
    pub event_name: Option<String>,
    pub read_only: Option<String>,
    pub access_key_id: Option<String>,
    pub event_time: Option<DateTime<Utc>>,
    pub event_source: Option<String>,
    pub username: Option<String>,
    pub resources: Vec<AuditResource>,
    pub cloud_trail_event: Option<String>,
}

/// One page of lookup results plus the token for the next page, if any.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuditEventPage {
    pub events: Vec<AuditEvent>,
    pub next_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_date_is_inclusive() {
        let q = AuditQuery::parse("s3", "2024-03-01", "2024-03-31").unwrap();
        assert_eq!(q.event_source(), "s3.amazonaws.com");
        assert_eq!(q.start_time().to_rfc3339(), "2024-03-01T00:00:00+00:00");
        assert_eq!(q.end_time().to_rfc3339(), "2024-04-01T00:00:00+00:00");
    }

    #[test]
    fn single_day_range_allowed() {
        let q = AuditQuery::parse("iam", "2024-02-29", "2024-02-29").unwrap();
        assert_eq!(q.end_time().to_rfc3339(), "2024-03-01T00:00:00+00:00");
    }

    #[test]
    fn bad_queries_rejected() {
        assert!(AuditQuery::parse("", "2024-01-01", "2024-01-02").is_err());
        assert!(AuditQuery::parse("s3 ", "2024-01-01", "2024-01-02").is_ok());
        assert!(AuditQuery::parse("s3/x", "2024-01-01", "2024-01-02").is_err());
        assert!(AuditQuery::parse("s3", "2024-1-1x", "2024-01-02").is_err());
        assert!(AuditQuery::parse("s3", "2024-01-03", "2024-01-02").is_err());
    }
}
