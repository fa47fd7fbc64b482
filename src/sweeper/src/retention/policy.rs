//! Retention policy bounds.

use chrono::{DateTime, Duration, Utc};
use common::config::RetentionConfig;
use std::fmt;

use super::evaluator::{DeletionReason, DeletionReasons};

/// Count and age bounds governing which backups survive cleanup.
///
/// A policy with neither bound is disabled: cleanup does not run at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionPolicy {
    /// Keep at most this many of the newest backups.
    pub max_count: Option<usize>,
    /// Delete backups strictly older than this.
    pub max_age: Option<Duration>,
}

impl RetentionPolicy {
    pub fn new(max_count: Option<usize>, max_age: Option<Duration>) -> Self {
        Self { max_count, max_age }
    }

    /// Policy with no bounds.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build the policy from configuration, where the age bound is in whole days.
    pub fn from_config(config: &RetentionConfig) -> Self {
        Self {
            max_count: config.max_count,
            max_age: config
                .max_age_days
                .map(|days| Duration::days(i64::from(days))),
        }
    }

    /// Whether at least one bound is set.
    pub fn is_enabled(&self) -> bool {
        self.max_count.is_some() || self.max_age.is_some()
    }

    /// Rules violated by the backup at `position` (0 = newest) created at
    /// `timestamp`.
    pub fn violations(
        &self,
        position: usize,
        timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DeletionReasons {
        let mut reasons = DeletionReasons::default();

        if let Some(max_count) = self.max_count
            && position >= max_count
        {
            reasons.insert(DeletionReason::ExceedsCount);
        }

        if let Some(max_age) = self.max_age
            && now.signed_duration_since(timestamp) > max_age
        {
            reasons.insert(DeletionReason::ExceedsAge);
        }

        reasons
    }
}

impl fmt::Display for RetentionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max_count {
            Some(count) => write!(f, "max_count={count}")?,
            None => write!(f, "max_count=unlimited")?,
        }
        match self.max_age {
            Some(age) => write!(f, ", max_age={}d", age.num_days()),
            None => write!(f, ", max_age=unlimited"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_disabled_policy() {
        let policy = RetentionPolicy::disabled();
        assert!(!policy.is_enabled());
        assert!(policy.violations(1000, now() - Duration::days(10_000), now()).is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = RetentionConfig {
            max_count: Some(7),
            max_age_days: Some(30),
            ..Default::default()
        };

        let policy = RetentionPolicy::from_config(&config);
        assert_eq!(policy.max_count, Some(7));
        assert_eq!(policy.max_age, Some(Duration::days(30)));
        assert!(policy.is_enabled());

        let policy = RetentionPolicy::from_config(&RetentionConfig::default());
        assert!(!policy.is_enabled());
    }

    #[test]
    fn test_count_violation_starts_at_max_count() {
        let policy = RetentionPolicy::new(Some(3), None);

        assert!(policy.violations(2, now(), now()).is_empty());
        assert!(
            policy
                .violations(3, now(), now())
                .contains(DeletionReason::ExceedsCount)
        );
    }

    #[test]
    fn test_age_violation_is_strict() {
        let policy = RetentionPolicy::new(None, Some(Duration::days(30)));

        let exactly = now() - Duration::days(30);
        assert!(policy.violations(0, exactly, now()).is_empty());

        let older = exactly - Duration::milliseconds(1);
        assert!(
            policy
                .violations(0, older, now())
                .contains(DeletionReason::ExceedsAge)
        );
    }

    #[test]
    fn test_future_timestamps_are_not_expired() {
        let policy = RetentionPolicy::new(None, Some(Duration::days(1)));
        assert!(policy.violations(0, now() + Duration::days(5), now()).is_empty());
    }

    #[test]
    fn test_display() {
        let policy = RetentionPolicy::new(Some(5), Some(Duration::days(14)));
        assert_eq!(policy.to_string(), "max_count=5, max_age=14d");
        assert_eq!(
            RetentionPolicy::new(None, Some(Duration::days(1))).to_string(),
            "max_count=unlimited, max_age=1d"
        );
    }
}
