//! Service layer behind the two HTTP services.
//! - `storage`: one-JSON-file-per-user record store.
//! - `cloud`: billing / IAM / CloudTrail operations over trait seams, with
//!   AWS SDK implementations in `cloud::aws`.

pub mod errors;
pub mod runtime;
pub mod storage;
pub mod cloud;
