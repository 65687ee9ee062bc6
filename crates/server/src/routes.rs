use std::sync::Arc;

use axum::{
    extract::rejection::QueryRejection,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use common::{metrics::encode_metrics, types::ServiceHealth};
use configs::ErrorFraming;
use service::{cloud::CloudProxyService, errors::ServiceError, storage::UserRecordRepository};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;
use utoipa::OpenApi;

use crate::errors::ApiError;
use crate::openapi::{CloudProxyDoc, RecordStoreDoc};

pub mod billing;
pub mod cloudtrail;
pub mod permissions;
pub mod users;

#[derive(Clone)]
pub struct RecordStoreState {
    pub store: Arc<dyn UserRecordRepository>,
}

#[derive(Clone)]
pub struct CloudProxyState {
    pub service: Arc<CloudProxyService>,
    pub framing: ErrorFraming,
}

impl CloudProxyState {
    pub fn error(&self, err: ServiceError) -> ApiError {
        ApiError::new(err, self.framing)
    }

    /// Missing or malformed query parameters, framed like any other failure.
    pub fn rejected(&self, rejection: QueryRejection) -> ApiError {
        self.error(ServiceError::Validation(rejection.body_text()))
    }
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "Service is up", body = crate::openapi::HealthResponse)))]
pub async fn record_store_health() -> Json<ServiceHealth> {
    Json(ServiceHealth { status: "ok", service: "record-store", version: env!("CARGO_PKG_VERSION") })
}

#[utoipa::path(get, path = "/health", tag = "health", responses((status = 200, description = "Service is up", body = crate::openapi::HealthResponse)))]
pub async fn cloud_proxy_health() -> Json<ServiceHealth> {
    Json(ServiceHealth { status: "ok", service: "cloud-proxy", version: env!("CARGO_PKG_VERSION") })
}

async fn metrics() -> impl IntoResponse {
    encode_metrics()
}

async fn record_store_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(RecordStoreDoc::openapi())
}

async fn cloud_proxy_openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(CloudProxyDoc::openapi())
}

/// Router of the user record store.
pub fn record_store_router(state: RecordStoreState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/user/add", post(users::add_user))
        .route("/users", get(users::list_users))
        .route("/user/:user_id", get(users::get_user))
        .route("/health", get(record_store_health))
        .route("/metrics", get(metrics))
        .route("/api-docs/openapi.json", get(record_store_openapi))
        .with_state(state)
        .layer(cors)
        .layer(trace_layer())
}

/// Router of the cloud proxy.
pub fn cloud_proxy_router(state: CloudProxyState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/billing", get(billing::get_billing))
        .route(
            "/permission/:username",
            get(permissions::get_permissions).delete(permissions::remove_from_all_groups),
        )
        .route("/permission/:username/:new_group_name", put(permissions::add_to_group))
        .route("/cloudtrail", get(cloudtrail::get_events))
        .route("/health", get(cloud_proxy_health))
        .route("/metrics", get(metrics))
        .route("/api-docs/openapi.json", get(cloud_proxy_openapi))
        .with_state(state)
        .layer(cors)
        .layer(trace_layer())
}

fn trace_layer() -> TraceLayer<
    tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>,
    DefaultMakeSpan,
    DefaultOnRequest,
    DefaultOnResponse,
> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO).include_headers(false))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO).include_headers(false))
        // 5xx
        .on_failure(DefaultOnFailure::new().level(Level::ERROR))
}
