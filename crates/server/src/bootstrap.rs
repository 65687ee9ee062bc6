//! Process entry shared by the two binaries: env, logging, config, panic
//! hook and the Tokio runtime.

use std::{future::Future, process::ExitCode};

use configs::AppConfig;
use dotenvy::dotenv;
use tracing::{error, info};
use uuid::Uuid;

fn init_logging(service: &'static str) {
    // .env first so RUST_LOG and LOG_FORMAT apply
    dotenv().ok();
    common::utils::logging::init_logging_from_env();
    info!(service, event = "logger_init", "tracing subscriber initialized");
}

/// Run one service to completion. `select` picks the service's worker
/// thread setting, `run` builds the server future from the loaded config.
pub fn launch<S, R, Fut>(service: &'static str, select: S, run: R) -> ExitCode
where
    S: FnOnce(&AppConfig) -> Option<usize>,
    R: FnOnce(AppConfig) -> Fut,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    init_logging(service);

    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    std::panic::set_hook(Box::new(move |info| {
        error!(service, event = "panic", %service_id, pid, message = %info, "unhandled panic occurred");
    }));

    let cfg = match AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(service, event = "config_invalid", error = %e, "failed to load configuration");
            return ExitCode::FAILURE;
        }
    };
    let worker_threads = select(&cfg);

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = worker_threads {
        builder.worker_threads(w);
    }
    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service, event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return ExitCode::FAILURE;
        }
    };

    info!(
        service,
        event = "start",
        %service_id,
        pid,
        version,
        threads = worker_threads.unwrap_or_default(),
        "service starting"
    );

    let fut = run(cfg);
    rt.block_on(async move {
        match tokio::spawn(fut).await {
            Ok(Ok(())) => {
                info!(service, event = "stop", %service_id, pid, "service stopped normally");
                ExitCode::SUCCESS
            }
            Ok(Err(e)) => {
                error!(service, event = "run_failed", error = %e, "service returned error");
                ExitCode::FAILURE
            }
            Err(e) => {
                error!(service, event = "task_join_error", error = %e, "service task join error");
                ExitCode::FAILURE
            }
        }
    })
}
