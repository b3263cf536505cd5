//! Save-state format upgrades
//!
//! The engine persists save states with a fixed format version. On load the
//! declared version of the record is compared against the engine's constant:
//! the current version passes through untouched, older revisions within the
//! same major run through the migration chain below, and anything newer or
//! unknown is a hard failure. Migrations transform the raw JSON record
//! before it is decoded into a [`SaveState`](super::SaveState), so a new
//! format version only needs to add one step to the chain.

use std::path::Path;

use semver::Version;
use serde_json::Value;

use crate::constants::savestate::{FORMAT_MAJOR, FORMAT_MINOR, FORMAT_PATCH};
use crate::errors::{SaveStateError, SaveStateResult};

/// Save-state format version this engine reads and writes
pub fn current_format_version() -> Version {
    Version::new(FORMAT_MAJOR, FORMAT_MINOR, FORMAT_PATCH)
}

/// Extract the format version a record declares under `meta.version`
fn declared_version(record: &Value, path: &Path) -> SaveStateResult<Version> {
    let raw = record
        .get("meta")
        .and_then(|meta| meta.get("version"))
        .and_then(Value::as_str)
        .ok_or_else(|| SaveStateError::Malformed {
            path: path.to_path_buf(),
            reason: "missing meta.version".to_string(),
        })?;

    Version::parse(raw).map_err(|e| SaveStateError::Malformed {
        path: path.to_path_buf(),
        reason: format!("invalid meta.version '{raw}': {e}"),
    })
}

/// Run the upgrade step on a raw save-state record
///
/// # Errors
///
/// Returns `SaveStateError::UnsupportedVersion` when the record declares a
/// format this engine does not understand.
pub(super) fn upgrade_record(record: Value, path: &Path) -> SaveStateResult<Value> {
    let found = declared_version(&record, path)?;
    let supported = current_format_version();

    if found == supported {
        return Ok(record);
    }

    if found.major == supported.major && found < supported {
        // Chain per-revision migrations here, oldest first, each rewriting
        // the record and bumping meta.version until it reaches `supported`.
        return Ok(record);
    }

    Err(SaveStateError::UnsupportedVersion { found, supported })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path() -> std::path::PathBuf {
        std::path::PathBuf::from("test_save.json")
    }

    #[test]
    fn test_current_version_passes_through() {
        let record = json!({"meta": {"version": "1.0.0"}, "payload": true});
        let upgraded = upgrade_record(record.clone(), &path()).unwrap();
        assert_eq!(upgraded, record);
    }

    #[test]
    fn test_newer_version_is_rejected() {
        let record = json!({"meta": {"version": "2.0.0"}});
        let result = upgrade_record(record, &path());
        assert!(matches!(
            result,
            Err(SaveStateError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_newer_minor_is_rejected() {
        let record = json!({"meta": {"version": "1.1.0"}});
        let result = upgrade_record(record, &path());
        assert!(matches!(
            result,
            Err(SaveStateError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_missing_meta_is_malformed() {
        let result = upgrade_record(json!({"pluginInfo": {}}), &path());
        assert!(matches!(result, Err(SaveStateError::Malformed { .. })));
    }

    #[test]
    fn test_unparseable_version_is_malformed() {
        let record = json!({"meta": {"version": "one"}});
        let result = upgrade_record(record, &path());
        assert!(matches!(result, Err(SaveStateError::Malformed { .. })));
    }
}
