//! Retention cleanup for timestamp-named backup archives in object storage.
//!
//! Archives are named `{prefix}-YYYY-MM-DDTHH-mm-ss-SSSZ.zip`. A cleanup run
//! lists the archives of one scope, ranks them by the timestamp in their
//! name and deletes those outside a [`RetentionPolicy`].

pub mod cleaner;
pub mod filename;
pub mod metrics;
pub mod record;
pub mod retention;
pub mod store;

pub use cleaner::{
    BackupCleaner, CleanupError, CleanupOutcome, CleanupPhase, CleanupReport, CleanupSettings,
    FailedDeletion, SkipReason,
};
pub use filename::{backup_file_name, parse_backup_timestamp};
pub use metrics::{CleanupMetrics, MetricsSummary};
pub use record::BackupRecord;
pub use retention::{
    DeletionDecision, DeletionReason, DeletionReasons, RetentionPlan, RetentionPolicy, evaluate,
};
pub use store::{BackupStore, ObjectStoreBackend, StoreError, StoredObject};
