use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// File name template: `user_<id>.json`
pub const FILE_PREFIX: &str = "user_";
pub const FILE_SUFFIX: &str = ".json";
pub const MAX_ID_LEN: usize = 128;

/// A user record as submitted by callers and persisted one-file-per-id.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub age: i64,
}

impl UserRecord {
    pub fn validate(&self) -> Result<(), ModelError> {
        validate_id(&self.id)
    }

    /// Storage file name for this record.
    pub fn file_name(&self) -> Result<String, ModelError> {
        file_name(&self.id)
    }
}

/// Ids are restricted to `[A-Za-z0-9_-]{1,128}` so that the file name is
/// injective in `id` and can never leave the data directory.
pub fn validate_id(id: &str) -> Result<(), ModelError> {
    if id.is_empty() {
        return Err(ModelError::Validation("id required".into()));
    }
    if id.len() > MAX_ID_LEN {
        return Err(ModelError::Validation(format!("id longer than {MAX_ID_LEN} characters")));
    }
    if !id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-') {
        return Err(ModelError::Validation(
            "id may only contain ASCII letters, digits, '_' and '-'".into(),
        ));
    }
    Ok(())
}

pub fn file_name(id: &str) -> Result<String, ModelError> {
    validate_id(id)?;
    Ok(format!("{FILE_PREFIX}{id}{FILE_SUFFIX}"))
}

/// Recover the id from a directory entry name; `None` for foreign files.
pub fn id_from_file_name(name: &str) -> Option<&str> {
    let id = name.strip_prefix(FILE_PREFIX)?.strip_suffix(FILE_SUFFIX)?;
    validate_id(id).ok()?;
    Some(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_name_follows_template() {
        assert_eq!(file_name("42").unwrap(), "user_42.json");
        assert_eq!(file_name("ann_b-7").unwrap(), "user_ann_b-7.json");
    }

    #[test]
    fn hostile_ids_rejected() {
        for bad in ["", "../etc", "a/b", "a\\b", "..", "x y", "con.json", "naïve"] {
            assert!(matches!(validate_id(bad), Err(ModelError::Validation(_))), "{bad:?} accepted");
        }
        let long = "a".repeat(MAX_ID_LEN + 1);
        assert!(validate_id(&long).is_err());
        assert!(validate_id(&"a".repeat(MAX_ID_LEN)).is_ok());
    }

    #[test]
    fn id_recovered_from_file_name() {
        assert_eq!(id_from_file_name("user_1.json"), Some("1"));
        assert_eq!(id_from_file_name("user_abc-d.json"), Some("abc-d"));
        assert_eq!(id_from_file_name("user_.json"), None);
        assert_eq!(id_from_file_name("users.json"), None);
        assert_eq!(id_from_file_name(".user_1.json.tmp"), None);
        assert_eq!(id_from_file_name("user_1.json.bak"), None);
    }

    #[test]
    fn record_deserializes_from_request_shape() {
        let rec: UserRecord = serde_json::from_str(r#"{"id":"42","name":"Ann","age":30}"#).unwrap();
        assert_eq!(rec, UserRecord { id: "42".into(), name: "Ann".into(), age: 30 });
        assert!(rec.validate().is_ok());
    }
}
