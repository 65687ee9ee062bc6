use std::process::ExitCode;

fn main() -> ExitCode {
    server::bootstrap::launch(
        "cloud-proxy",
        |cfg| cfg.cloud_proxy.server.worker_threads,
        |cfg| server::run_cloud_proxy(cfg.cloud_proxy),
    )
}
