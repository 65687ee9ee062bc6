pub mod bootstrap;
pub mod errors;
pub mod openapi;
pub mod routes;
pub mod startup;

pub use startup::{run_cloud_proxy, run_record_store};
