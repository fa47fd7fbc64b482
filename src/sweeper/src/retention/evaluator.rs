//! Partition of backup records into keep and delete sets.

use chrono::{DateTime, Utc};
use std::fmt;

use super::policy::RetentionPolicy;
use crate::record::BackupRecord;

/// Why a backup was selected for deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeletionReason {
    /// Older than the newest `max_count` backups.
    ExceedsCount,
    /// Older than `max_age`.
    ExceedsAge,
}

impl DeletionReason {
    pub const ALL: [DeletionReason; 2] = [DeletionReason::ExceedsCount, DeletionReason::ExceedsAge];

    fn bit(self) -> u8 {
        match self {
            DeletionReason::ExceedsCount => 0b01,
            DeletionReason::ExceedsAge => 0b10,
        }
    }
}

impl fmt::Display for DeletionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletionReason::ExceedsCount => write!(f, "exceeds max count"),
            DeletionReason::ExceedsAge => write!(f, "exceeds max age"),
        }
    }
}

/// Set of [`DeletionReason`]s attached to one backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeletionReasons(u8);

impl DeletionReasons {
    pub fn insert(&mut self, reason: DeletionReason) {
        self.0 |= reason.bit();
    }

    pub fn contains(&self, reason: DeletionReason) -> bool {
        self.0 & reason.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = DeletionReason> + '_ {
        DeletionReason::ALL
            .into_iter()
            .filter(move |reason| self.contains(*reason))
    }
}

impl FromIterator<DeletionReason> for DeletionReasons {
    fn from_iter<I: IntoIterator<Item = DeletionReason>>(iter: I) -> Self {
        let mut reasons = DeletionReasons::default();
        for reason in iter {
            reasons.insert(reason);
        }
        reasons
    }
}

impl fmt::Display for DeletionReasons {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, reason) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{reason}")?;
        }
        Ok(())
    }
}

/// A backup selected for deletion together with every rule it violates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionDecision {
    pub record: BackupRecord,
    pub reasons: DeletionReasons,
}

/// Outcome of evaluating a policy. Both lists are ordered newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetentionPlan {
    pub keep: Vec<BackupRecord>,
    pub delete: Vec<DeletionDecision>,
}

impl RetentionPlan {
    /// Number of records the plan was built from.
    pub fn considered(&self) -> usize {
        self.keep.len() + self.delete.len()
    }
}

/// Split `records` into backups to keep and backups to delete.
///
/// Records are ranked newest first with a stable sort, so equal timestamps
/// keep their listing order. A record is deleted when it violates at least
/// one configured bound. The input slice is left untouched.
pub fn evaluate(
    records: &[BackupRecord],
    policy: &RetentionPolicy,
    now: DateTime<Utc>,
) -> RetentionPlan {
    let mut ranked: Vec<&BackupRecord> = records.iter().collect();
    ranked.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut plan = RetentionPlan::default();
    for (position, record) in ranked.into_iter().enumerate() {
        let reasons = policy.violations(position, record.timestamp, now);
        if reasons.is_empty() {
            plan.keep.push(record.clone());
        } else {
            plan.delete.push(DeletionDecision {
                record: record.clone(),
                reasons,
            });
        }
    }

    plan
}
