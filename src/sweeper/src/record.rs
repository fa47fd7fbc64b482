//! Parsed backup records.

use chrono::{DateTime, Utc};

use crate::filename::{base_name, parse_backup_timestamp};
use crate::store::StoredObject;

/// A stored object recognized as a backup archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupRecord {
    /// Full object key, including any subfolder.
    pub key: String,
    /// Creation time decoded from the filename.
    pub timestamp: DateTime<Utc>,
}

impl BackupRecord {
    pub fn new(key: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            timestamp,
        }
    }

    /// Build a record from an object key, or `None` if the key's filename is
    /// not a backup archive for `prefix`.
    pub fn from_key(key: &str, prefix: &str) -> Option<Self> {
        parse_backup_timestamp(base_name(key), prefix).map(|timestamp| Self::new(key, timestamp))
    }
}

/// Keep the listed objects that are backups for `prefix`, in listing order.
pub fn parse_records(objects: &[StoredObject], prefix: &str) -> Vec<BackupRecord> {
    objects
        .iter()
        .filter_map(|object| {
            let record = BackupRecord::from_key(&object.key, prefix);
            if record.is_none() {
                tracing::trace!(key = %object.key, "Ignoring object that is not a managed backup");
            }
            record
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn object(key: &str) -> StoredObject {
        StoredObject {
            key: key.to_string(),
            size_bytes: 0,
            last_modified: Utc::now(),
        }
    }

    #[test]
    fn test_from_key_strips_folders() {
        let record =
            BackupRecord::from_key("nightly/db/backup-2024-03-01T12-00-00-000Z.zip", "backup")
                .unwrap();

        assert_eq!(record.key, "nightly/db/backup-2024-03-01T12-00-00-000Z.zip");
        assert_eq!(
            record.timestamp,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_records_skips_unrelated_objects() {
        let objects = vec![
            object("nightly/backup-2024-03-02T00-00-00-000Z.zip"),
            object("nightly/README.md"),
            object("nightly/backup-2024-03-01T00-00-00-000Z.zip"),
            object("nightly/backup-2024-13-01T00-00-00-000Z.zip"),
            object("nightly/other-2024-03-01T00-00-00-000Z.zip"),
        ];

        let records = parse_records(&objects, "backup");

        let keys: Vec<_> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "nightly/backup-2024-03-02T00-00-00-000Z.zip",
                "nightly/backup-2024-03-01T00-00-00-000Z.zip",
            ]
        );
    }
}
