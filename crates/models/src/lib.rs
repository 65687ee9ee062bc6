//! Domain types shared by the record store and the cloud proxy.
//! - Plain serde structs, no persistence logic.
//! - Validation helpers live next to the type they guard.

pub mod errors;
pub mod user_record;
pub mod billing;
pub mod permission;
pub mod audit;
