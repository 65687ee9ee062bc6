use std::process::ExitCode;

fn main() -> ExitCode {
    server::bootstrap::launch(
        "record-store",
        |cfg| cfg.record_store.server.worker_threads,
        |cfg| server::run_record_store(cfg.record_store),
    )
}
