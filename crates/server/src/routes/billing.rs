use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use models::billing::{BillingQuery, BillingReport, Granularity};
use serde::Deserialize;
use service::errors::ServiceError;
use utoipa::IntoParams;

use super::CloudProxyState;
use crate::errors::ApiError;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BillingParams {
    /// Inclusive start, `YYYY-MM-DD`.
    pub start_date: String,
    /// Exclusive end, `YYYY-MM-DD`.
    pub end_date: String,
    /// `DAILY` (default), `MONTHLY` or `HOURLY`.
    pub granularity: Option<String>,
}

impl BillingParams {
    fn into_query(self) -> Result<BillingQuery, ServiceError> {
        let granularity = match self.granularity.as_deref() {
            Some(g) => g.parse::<Granularity>()?,
            None => Granularity::default(),
        };
        Ok(BillingQuery::new(&self.start_date, &self.end_date, granularity)?)
    }
}

/// Unblended cost grouped by service.
#[utoipa::path(
    get,
    path = "/billing",
    tag = "billing",
    params(BillingParams),
    responses(
        (status = 200, description = "Cost Explorer response"),
        (status = 400, description = "Bad dates or granularity"),
        (status = 502, description = "Cost Explorer call failed")
    )
)]
pub async fn get_billing(
    State(state): State<CloudProxyState>,
    params: Result<Query<BillingParams>, QueryRejection>,
) -> Result<Json<BillingReport>, ApiError> {
    let Query(params) = params.map_err(|e| state.rejected(e))?;
    let query = params.into_query().map_err(|e| state.error(e))?;
    let report = state.service.get_billing(&query).await.map_err(|e| state.error(e))?;
    Ok(Json(report))
}
