use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

pub const MAX_USER_NAME_LEN: usize = 64;
pub const MAX_GROUP_NAME_LEN: usize = 128;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttachedPolicy {
    pub policy_name: String,
    pub policy_arn: String,
}

/// One IAM group of a user together with the managed policies attached to it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupPermissions {
    pub group_name: String,
    pub attached_policies: Vec<AttachedPolicy>,
}

pub fn validate_user_name(name: &str) -> Result<(), ModelError> {
    validate_iam_name("username", name, MAX_USER_NAME_LEN)
}

pub fn validate_group_name(name: &str) -> Result<(), ModelError> {
    validate_iam_name("group name", name, MAX_GROUP_NAME_LEN)
}

// IAM names: alphanumerics plus `+=,.@_-`.
fn validate_iam_name(field: &str, name: &str, max_len: usize) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::Validation(format!("{field} required")));
    }
    if name.len() > max_len {
        return Err(ModelError::Validation(format!("{field} longer than {max_len} characters")));
    }
    let allowed = |c: char| c.is_ascii_alphanumeric() || "+=,.@_-".contains(c);
    if !name.chars().all(allowed) {
        return Err(ModelError::Validation(format!("{field} contains characters IAM does not accept")));
    }
    Ok(())
}
