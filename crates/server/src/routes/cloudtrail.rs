use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use models::audit::{AuditEvent, AuditQuery};
use serde::Deserialize;
use service::errors::ServiceError;
use utoipa::IntoParams;

use super::CloudProxyState;
use crate::errors::ApiError;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CloudTrailParams {
    /// First day, `YYYY-MM-DD`.
    pub start_date: String,
    /// Last day, `YYYY-MM-DD`, inclusive.
    pub end_date: String,
    /// Short service name, e.g. `s3` for `s3.amazonaws.com`.
    pub service: String,
}

/// Every management event of one service in the date window.
#[utoipa::path(
    get,
    path = "/cloudtrail",
    tag = "cloudtrail",
    params(CloudTrailParams),
    responses(
        (status = 200, description = "Events of all pages"),
        (status = 400, description = "Bad dates or service"),
        (status = 502, description = "CloudTrail call failed")
    )
)]
pub async fn get_events(
    State(state): State<CloudProxyState>,
    params: Result<Query<CloudTrailParams>, QueryRejection>,
) -> Result<Json<Vec<AuditEvent>>, ApiError> {
    let Query(params) = params.map_err(|e| state.rejected(e))?;
    let query = AuditQuery::parse(&params.service, &params.start_date, &params.end_date)
        .map_err(|e| state.error(ServiceError::from(e)))?;
    let events = state.service.get_audit_events(&query).await.map_err(|e| state.error(e))?;
    Ok(Json(events))
}
