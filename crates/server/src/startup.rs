use std::sync::Arc;

use axum::Router;
use configs::{CloudProxyConfig, RecordStoreConfig};
use service::{
    cloud::{
        aws::{load_sdk_config, AwsCloudTrail, AwsCostExplorer, AwsIam},
        CloudProxyService,
    },
    runtime,
    storage::record_store::RecordStore,
};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::errors::StartupError;
use crate::routes::{self, CloudProxyState, RecordStoreState};

fn build_cors() -> CorsLayer {
    CorsLayer::very_permissive()
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler; run until the process is killed
        std::future::pending::<()>().await;
    }
    info!(event = "shutdown_signal", "received Ctrl+C, draining connections");
}

async fn serve(app: Router, addr: std::net::SocketAddr, name: &'static str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(service = name, %addr, "listening");
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

/// Build the record store router over the configured data directory.
pub async fn build_record_store(cfg: &RecordStoreConfig) -> Result<Router, StartupError> {
    runtime::ensure_env(&cfg.data_dir)
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;
    let store = RecordStore::new(&cfg.data_dir)
        .await
        .map_err(|e| StartupError::Runtime(e.to_string()))?;
    info!(data_dir = %store.dir().display(), "record store opened");
    Ok(routes::record_store_router(RecordStoreState { store }, build_cors()))
}

/// Build the cloud proxy router backed by the AWS SDK clients.
pub async fn build_cloud_proxy(cfg: &CloudProxyConfig) -> Result<Router, StartupError> {
    let sdk = load_sdk_config(cfg.region.as_deref(), cfg.profile.as_deref()).await;
    let service = CloudProxyService::new(
        Arc::new(AwsCostExplorer::new(&sdk)),
        Arc::new(AwsIam::new(&sdk)),
        Arc::new(AwsCloudTrail::new(&sdk)),
    )
    .with_audit_page_size(cfg.audit_page_size);
    let state = CloudProxyState { service: Arc::new(service), framing: cfg.error_framing };
    Ok(routes::cloud_proxy_router(state, build_cors()))
}

pub async fn run_record_store(cfg: RecordStoreConfig) -> anyhow::Result<()> {
    let addr = cfg.server.bind_addr().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    let app = build_record_store(&cfg).await?;
    serve(app, addr, "record-store").await
}

pub async fn run_cloud_proxy(cfg: CloudProxyConfig) -> anyhow::Result<()> {
    let addr = cfg.server.bind_addr().map_err(|e| StartupError::InvalidConfig(e.to_string()))?;
    info!(framing = ?cfg.error_framing, page_size = cfg.audit_page_size, "cloud proxy configured");
    let app = build_cloud_proxy(&cfg).await?;
    serve(app, addr, "cloud-proxy").await
}
