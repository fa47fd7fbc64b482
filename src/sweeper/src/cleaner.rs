//! Backup cleanup executor.
//!
//! One [`BackupCleaner::run`] call is one cleanup pass over a single scope
//! (bucket, optional subfolder and filename prefix):
//!
//! ```text
//! Idle -> CheckPolicy -> Listing -> Parsing -> Evaluating -> Deleting -> Done
//! ```
//!
//! with early exits to `Done` when the policy is disabled, the listing
//! fails, no backup parses, or nothing violates the policy.
//!
//! ## Failure handling
//!
//! - A listing failure aborts the run. It is logged and reported as
//!   [`CleanupOutcome::Aborted`], never returned to the caller as an error.
//! - A failed delete is logged and recorded in the report; every other
//!   candidate is still attempted.
//! - Unparseable object names are ignored.
//!
//! Runs for the same scope must not overlap; nothing here locks.

use chrono::{DateTime, Utc};
use common::config::Configuration;
use futures::{StreamExt, stream};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::metrics::CleanupMetrics;
use crate::record::parse_records;
use crate::retention::{RetentionPlan, RetentionPolicy, evaluate};
use crate::store::{BackupStore, StoreError};

/// Default number of delete requests in flight.
pub const DEFAULT_DELETE_CONCURRENCY: usize = 8;

/// States of a cleanup run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupPhase {
    Idle,
    CheckPolicy,
    Listing,
    Parsing,
    Evaluating,
    Deleting,
    Done,
}

impl fmt::Display for CleanupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CleanupPhase::Idle => "idle",
            CleanupPhase::CheckPolicy => "check_policy",
            CleanupPhase::Listing => "listing",
            CleanupPhase::Parsing => "parsing",
            CleanupPhase::Evaluating => "evaluating",
            CleanupPhase::Deleting => "deleting",
            CleanupPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Everything a cleanup run needs besides storage access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupSettings {
    /// Backup filename prefix.
    pub prefix: String,
    /// Folder the backups live under, if any.
    pub subfolder: Option<String>,
    pub policy: RetentionPolicy,
    /// Log decisions without deleting.
    pub dry_run: bool,
    /// Maximum delete requests in flight.
    pub delete_concurrency: usize,
}

impl CleanupSettings {
    pub fn new(prefix: impl Into<String>, policy: RetentionPolicy) -> Self {
        Self {
            prefix: prefix.into(),
            subfolder: None,
            policy,
            dry_run: false,
            delete_concurrency: DEFAULT_DELETE_CONCURRENCY,
        }
    }

    pub fn with_subfolder(mut self, subfolder: impl Into<String>) -> Self {
        self.subfolder = Some(subfolder.into());
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_delete_concurrency(mut self, delete_concurrency: usize) -> Self {
        self.delete_concurrency = delete_concurrency;
        self
    }

    pub fn from_config(config: &Configuration) -> Self {
        Self {
            prefix: config.backup.prefix.clone(),
            subfolder: config.backup.subfolder.clone(),
            policy: RetentionPolicy::from_config(&config.retention),
            dry_run: config.retention.dry_run,
            delete_concurrency: config.retention.delete_concurrency,
        }
    }

    /// Key prefix to list: `{subfolder}/{prefix}`, or just `{prefix}`.
    pub fn search_prefix(&self) -> String {
        let folder = self
            .subfolder
            .as_deref()
            .map(|folder| folder.trim_matches('/'))
            .filter(|folder| !folder.is_empty());

        match folder {
            Some(folder) => format!("{folder}/{}", self.prefix),
            None => self.prefix.clone(),
        }
    }
}

/// Why a run ended without issuing deletions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Neither a count nor an age bound is configured.
    PolicyDisabled,
    /// No listed object is a backup for the configured prefix.
    NoBackups { listed: usize },
    /// Every backup is within the policy.
    NothingToDelete { considered: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::PolicyDisabled => write!(f, "retention policy disabled"),
            SkipReason::NoBackups { listed } => {
                write!(f, "no backups found ({listed} objects listed)")
            }
            SkipReason::NothingToDelete { considered } => {
                write!(f, "nothing to delete ({considered} backups within policy)")
            }
        }
    }
}

/// A delete that failed, with the error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDeletion {
    pub key: String,
    pub error: String,
}

/// Summary of a run that reached the deletion phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Backups evaluated against the policy.
    pub considered: usize,
    /// Backups selected for deletion.
    pub marked: usize,
    /// Successful deletions.
    pub deleted: usize,
    /// Backups still stored after the run (`considered - deleted`).
    pub retained: usize,
    pub failed: Vec<FailedDeletion>,
    pub dry_run: bool,
}

impl CleanupReport {
    pub fn log(&self) {
        info!(
            considered = self.considered,
            marked = self.marked,
            deleted = self.deleted,
            retained = self.retained,
            failed = self.failed.len(),
            dry_run = self.dry_run,
            "Backup cleanup complete: {} considered, {} deleted, {} retained",
            self.considered,
            self.deleted,
            self.retained
        );
    }
}

/// Faults that abort a cleanup run.
#[derive(Error, Debug)]
pub enum CleanupError {
    #[error("listing backups failed: {0}")]
    Listing(#[source] StoreError),
}

/// Result of one cleanup run.
#[derive(Debug)]
pub enum CleanupOutcome {
    Skipped(SkipReason),
    Completed(CleanupReport),
    Aborted(CleanupError),
}

impl CleanupOutcome {
    pub fn report(&self) -> Option<&CleanupReport> {
        match self {
            CleanupOutcome::Completed(report) => Some(report),
            _ => None,
        }
    }

    /// Number of backups deleted by the run.
    pub fn deleted(&self) -> usize {
        self.report().map_or(0, |report| report.deleted)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, CleanupOutcome::Aborted(_))
    }
}

/// Applies a retention policy to the backups of one scope.
pub struct BackupCleaner {
    store: Arc<dyn BackupStore>,
    settings: CleanupSettings,
    metrics: CleanupMetrics,
}

impl BackupCleaner {
    pub fn new(store: Arc<dyn BackupStore>, settings: CleanupSettings) -> Self {
        Self::with_metrics(store, settings, CleanupMetrics::new())
    }

    pub fn with_metrics(
        store: Arc<dyn BackupStore>,
        settings: CleanupSettings,
        metrics: CleanupMetrics,
    ) -> Self {
        Self {
            store,
            settings,
            metrics,
        }
    }

    pub fn settings(&self) -> &CleanupSettings {
        &self.settings
    }

    pub fn metrics(&self) -> &CleanupMetrics {
        &self.metrics
    }

    /// Run one cleanup pass against the current time.
    pub async fn run(&self) -> CleanupOutcome {
        self.run_at(Utc::now()).await
    }

    /// Run one cleanup pass with ages measured from `now`.
    ///
    /// Never fails: an aborted run is logged and returned as
    /// [`CleanupOutcome::Aborted`].
    pub async fn run_at(&self, now: DateTime<Utc>) -> CleanupOutcome {
        match self.try_run_at(now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(
                    prefix = %self.settings.search_prefix(),
                    error = %e,
                    "Backup cleanup aborted"
                );
                CleanupOutcome::Aborted(e)
            }
        }
    }

    /// Run one cleanup pass, returning run-fatal faults as errors.
    ///
    /// Per-object delete failures are not errors; they are collected in the
    /// [`CleanupReport`].
    pub async fn try_run_at(&self, now: DateTime<Utc>) -> Result<CleanupOutcome, CleanupError> {
        self.metrics.record_run_started();
        debug!(phase = %CleanupPhase::Idle, "Backup cleanup triggered");

        let policy = &self.settings.policy;
        debug!(phase = %CleanupPhase::CheckPolicy, policy = %policy, "Checking retention policy");
        if !policy.is_enabled() {
            info!("No max count or max age configured, skipping backup cleanup");
            return Ok(self.skip(SkipReason::PolicyDisabled));
        }

        let search_prefix = self.settings.search_prefix();
        info!(
            phase = %CleanupPhase::Listing,
            prefix = %search_prefix,
            policy = %policy,
            dry_run = self.settings.dry_run,
            "Starting backup cleanup"
        );
        let objects = self.store.list(&search_prefix).await.map_err(|e| {
            self.metrics.record_run_aborted();
            CleanupError::Listing(e)
        })?;
        self.metrics.record_objects_listed(objects.len());

        debug!(phase = %CleanupPhase::Parsing, objects = objects.len(), "Parsing backup names");
        let records = parse_records(&objects, &self.settings.prefix);
        self.metrics.record_backups_parsed(records.len());
        if records.is_empty() {
            info!(
                prefix = %search_prefix,
                listed = objects.len(),
                "No backups found, nothing to clean up"
            );
            return Ok(self.skip(SkipReason::NoBackups {
                listed: objects.len(),
            }));
        }

        debug!(phase = %CleanupPhase::Evaluating, backups = records.len(), "Evaluating retention policy");
        let plan = evaluate(&records, policy, now);
        if plan.delete.is_empty() {
            info!(
                backups = records.len(),
                "All backups within retention policy, nothing to delete"
            );
            return Ok(self.skip(SkipReason::NothingToDelete {
                considered: records.len(),
            }));
        }

        let report = self.delete_backups(plan, now).await;
        report.log();
        debug!(phase = %CleanupPhase::Done, "Backup cleanup finished");

        Ok(CleanupOutcome::Completed(report))
    }

    fn skip(&self, reason: SkipReason) -> CleanupOutcome {
        self.metrics.record_run_skipped();
        debug!(phase = %CleanupPhase::Done, reason = %reason, "Backup cleanup finished early");
        CleanupOutcome::Skipped(reason)
    }

    /// Delete every backup the plan selected, isolating failures per object.
    async fn delete_backups(&self, plan: RetentionPlan, now: DateTime<Utc>) -> CleanupReport {
        let considered = plan.considered();
        let marked = plan.delete.len();

        info!(
            phase = %CleanupPhase::Deleting,
            considered,
            to_delete = marked,
            to_keep = plan.keep.len(),
            dry_run = self.settings.dry_run,
            "Deleting backups outside retention policy"
        );

        if self.settings.dry_run {
            for decision in &plan.delete {
                info!(
                    key = %decision.record.key,
                    created = %decision.record.timestamp.to_rfc3339(),
                    age = %format_age(now, decision.record.timestamp),
                    reasons = %decision.reasons,
                    "[DRY-RUN] Would delete backup"
                );
            }

            return CleanupReport {
                considered,
                marked,
                deleted: 0,
                retained: considered,
                failed: Vec::new(),
                dry_run: true,
            };
        }

        let concurrency = self.settings.delete_concurrency.max(1);
        let results: Vec<(String, Result<(), StoreError>)> = stream::iter(plan.delete)
            .map(|decision| {
                let store = Arc::clone(&self.store);
                let metrics = self.metrics.clone();
                async move {
                    let key = decision.record.key;
                    let result = store.delete(&key).await;
                    match &result {
                        Ok(()) => {
                            info!(
                                key = %key,
                                created = %decision.record.timestamp.to_rfc3339(),
                                age = %format_age(now, decision.record.timestamp),
                                reasons = %decision.reasons,
                                "Deleted backup"
                            );
                            metrics.record_deletion_succeeded();
                        }
                        Err(e) => {
                            error!(
                                key = %key,
                                reasons = %decision.reasons,
                                error = %e,
                                "Failed to delete backup"
                            );
                            metrics.record_deletion_failed();
                        }
                    }
                    (key, result)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut deleted = 0;
        let mut failed = Vec::new();
        for (key, result) in results {
            match result {
                Ok(()) => deleted += 1,
                Err(e) => failed.push(FailedDeletion {
                    key,
                    error: e.to_string(),
                }),
            }
        }
        failed.sort_by(|a, b| a.key.cmp(&b.key));

        CleanupReport {
            considered,
            marked,
            deleted,
            retained: considered - deleted,
            failed,
            dry_run: false,
        }
    }
}

/// Age of a backup rendered for logs, e.g. `40days 2h`.
fn format_age(now: DateTime<Utc>, timestamp: DateTime<Utc>) -> String {
    let seconds = u64::try_from(now.signed_duration_since(timestamp).num_seconds()).unwrap_or(0);
    humantime::format_duration(std::time::Duration::from_secs(seconds)).to_string()
}
