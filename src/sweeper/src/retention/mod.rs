//! Retention evaluation for backup archives.
//!
//! Backups are ranked newest first and checked against two optional bounds:
//!
//! - `max_count`: only the newest `max_count` backups survive
//! - `max_age`: backups strictly older than `max_age` are removed
//!
//! The bounds combine with OR, so a backup violating either one is deleted.
//! Every decision carries the full set of violated bounds for the audit log.
//!
//! ## Usage
//!
//! ```
//! use chrono::{Duration, Utc};
//! use sweeper::record::BackupRecord;
//! use sweeper::retention::{RetentionPolicy, evaluate};
//!
//! let now = Utc::now();
//! let records = vec![
//!     BackupRecord::new("backup-a.zip", now - Duration::days(1)),
//!     BackupRecord::new("backup-b.zip", now - Duration::days(40)),
//! ];
//!
//! let policy = RetentionPolicy::new(None, Some(Duration::days(30)));
//! let plan = evaluate(&records, &policy, now);
//!
//! assert_eq!(plan.keep.len(), 1);
//! assert_eq!(plan.delete[0].record.key, "backup-b.zip");
//! ```

pub mod evaluator;
pub mod policy;

pub use evaluator::{DeletionDecision, DeletionReason, DeletionReasons, RetentionPlan, evaluate};
pub use policy::RetentionPolicy;
