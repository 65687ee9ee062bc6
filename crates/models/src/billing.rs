use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Cost metric requested from Cost Explorer.
pub const UNBLENDED_COST: &str = "UnblendedCost";
/// Results are grouped by the `SERVICE` dimension.
pub const GROUP_BY_TYPE: &str = "DIMENSION";
pub const GROUP_BY_KEY: &str = "SERVICE";

/// Time bucketing of a billing report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Granularity {
    #[default]
    Daily,
    Monthly,
    Hourly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Daily => "DAILY",
            Granularity::Monthly => "MONTHLY",
            Granularity::Hourly => "HOURLY",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(Granularity::Daily),
            "MONTHLY" => Ok(Granularity::Monthly),
            "HOURLY" => Ok(Granularity::Hourly),
            other => Err(ModelError::Validation(format!(
                "granularity must be one of DAILY, MONTHLY, HOURLY (got {other:?})"
            ))),
        }
    }
}

/// Validated input of a cost-and-usage request.
///
/// Bounds are forwarded to Cost Explorer verbatim; they must be either
/// `YYYY-MM-DD` or, for hourly reports, RFC 3339 timestamps.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BillingQuery {
    pub start: String,
    pub end: String,
    pub granularity: Granularity,
}

impl BillingQuery {
    pub fn new(start: &str, end: &str, granularity: Granularity) -> Result<Self, ModelError> {
        let from = parse_period_bound("start_date", start)?;
        let to = parse_period_bound("end_date", end)?;
        if from >= to {
            return Err(ModelError::Validation("start_date must be before end_date".into()));
        }
        Ok(Self { start: start.trim().to_string(), end: end.trim().to_string(), granularity })
    }
}

fn parse_period_bound(field: &str, value: &str) -> Result<DateTime<Utc>, ModelError> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ModelError::Validation(format!("{field} must be YYYY-MM-DD or RFC 3339 (got {value:?})")))
}

/// Projection of a `GetCostAndUsage` response, keeping the AWS field names.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BillingReport {
    pub results_by_time: Vec<ResultByTime>,
    pub group_definitions: Vec<GroupDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResultByTime {
    pub time_period: DateInterval,
    pub total: BTreeMap<String, MetricValue>,
    pub groups: Vec<CostGroup>,
    pub estimated: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DateInterval {
    pub start: String,
    pub end: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CostGroup {
    pub keys: Vec<String>,
    pub metrics: BTreeMap<String, MetricValue>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricValue {
    pub amount: Option<String>,
    pub unit: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupDefinition {
    pub r#type: Option<String>,
    pub key: Option<String>,
}
