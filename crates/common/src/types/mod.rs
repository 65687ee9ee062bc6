use serde::Serialize;

/// Body of `GET /health` for a named service.
#[derive(Serialize, Debug)]
pub struct ServiceHealth {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}
