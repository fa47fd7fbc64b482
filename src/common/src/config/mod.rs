use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "sweeper.toml";

/// Prefix for environment overrides, e.g. `SWEEPER__RETENTION__MAX_COUNT=7`.
pub const ENV_PREFIX: &str = "SWEEPER__";

/// Object storage connection settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket holding the backup archives.
    ///
    /// Env: SWEEPER__STORAGE__BUCKET
    #[serde(default)]
    pub bucket: String,

    /// Region of the bucket.
    ///
    /// Env: SWEEPER__STORAGE__REGION
    #[serde(default = "default_region")]
    pub region: String,

    /// Custom endpoint for S3-compatible services (MinIO, R2, ...).
    ///
    /// Env: SWEEPER__STORAGE__ENDPOINT
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Use path-style addressing instead of virtual-hosted buckets.
    ///
    /// Env: SWEEPER__STORAGE__FORCE_PATH_STYLE
    #[serde(default)]
    pub force_path_style: bool,

    /// Allow plain HTTP connections. Implied by an `http://` endpoint.
    ///
    /// Env: SWEEPER__STORAGE__ALLOW_HTTP
    #[serde(default)]
    pub allow_http: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            region: default_region(),
            endpoint: None,
            force_path_style: false,
            allow_http: false,
        }
    }
}

/// Naming scope of the backup archives inside the bucket.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BackupConfig {
    /// Filename prefix, archives are named `{prefix}-<timestamp>.zip`.
    ///
    /// Env: SWEEPER__BACKUP__PREFIX
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Optional folder the archives live under.
    ///
    /// Env: SWEEPER__BACKUP__SUBFOLDER
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subfolder: Option<String>,
}

fn default_prefix() -> String {
    "backup".to_string()
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            subfolder: None,
        }
    }
}

/// Retention bounds. Leaving both bounds unset disables cleanup.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// Keep at most this many backups.
    ///
    /// Env: SWEEPER__RETENTION__MAX_COUNT
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_count: Option<usize>,

    /// Delete backups older than this many days.
    ///
    /// Env: SWEEPER__RETENTION__MAX_AGE_DAYS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_age_days: Option<u32>,

    /// Log deletion decisions without deleting anything.
    ///
    /// Env: SWEEPER__RETENTION__DRY_RUN
    #[serde(default)]
    pub dry_run: bool,

    /// Maximum number of delete requests in flight.
    ///
    /// Env: SWEEPER__RETENTION__DELETE_CONCURRENCY
    #[serde(default = "default_delete_concurrency")]
    pub delete_concurrency: usize,
}

fn default_delete_concurrency() -> usize {
    8
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            max_count: None,
            max_age_days: None,
            dry_run: false,
            delete_concurrency: default_delete_concurrency(),
        }
    }
}

impl RetentionConfig {
    /// Whether at least one retention bound is configured.
    pub fn is_enabled(&self) -> bool {
        self.max_count.is_some() || self.max_age_days.is_some()
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Configuration {
    /// Object storage connection
    #[serde(default)]
    pub storage: StorageConfig,
    /// Backup naming scope
    #[serde(default)]
    pub backup: BackupConfig,
    /// Retention policy
    #[serde(default)]
    pub retention: RetentionConfig,
}

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),

    #[error("storage.bucket must be set")]
    MissingBucket,

    #[error("backup.prefix must be set")]
    MissingPrefix,

    #[error("Invalid backup prefix '{0}': must not contain '/'")]
    InvalidPrefix(String),

    #[error("retention.max_count must be positive, got 0")]
    InvalidMaxCount,

    #[error("retention.max_age_days must be positive, got 0")]
    InvalidMaxAge,

    #[error("retention.delete_concurrency must be positive, got 0")]
    InvalidConcurrency,

    #[error("Invalid storage endpoint '{endpoint}': {source}")]
    InvalidEndpoint {
        endpoint: String,
        source: url::ParseError,
    },
}

impl Configuration {
    /// Load from defaults, `sweeper.toml` and `SWEEPER__` env vars, in that order.
    pub fn load() -> Result<Self, ConfigError> {
        Self::extract(Self::figment(Path::new(DEFAULT_CONFIG_FILE)))
    }

    /// Same as [`Configuration::load`] with an explicit configuration file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        Self::extract(Self::figment(path))
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let config: Configuration = figment.extract().map_err(Box::new)?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// Checks:
    /// - Bucket and prefix are set, prefix is a single path segment
    /// - Retention bounds, when present, are positive
    /// - Delete concurrency is positive
    /// - The custom endpoint, when present, is a valid URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.bucket.trim().is_empty() {
            return Err(ConfigError::MissingBucket);
        }

        if let Some(endpoint) = &self.storage.endpoint {
            url::Url::parse(endpoint).map_err(|source| ConfigError::InvalidEndpoint {
                endpoint: endpoint.clone(),
                source,
            })?;
        }

        if self.backup.prefix.is_empty() {
            return Err(ConfigError::MissingPrefix);
        }
        if self.backup.prefix.contains('/') {
            return Err(ConfigError::InvalidPrefix(self.backup.prefix.clone()));
        }

        if self.retention.max_count == Some(0) {
            return Err(ConfigError::InvalidMaxCount);
        }
        if self.retention.max_age_days == Some(0) {
            return Err(ConfigError::InvalidMaxAge);
        }
        if self.retention.delete_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn valid() -> Configuration {
        Configuration {
            storage: StorageConfig {
                bucket: "backups".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_default_configuration() {
        let config = Configuration::default();

        assert_eq!(config.storage.region, "us-east-1");
        assert!(config.storage.endpoint.is_none());
        assert!(!config.storage.force_path_style);
        assert_eq!(config.backup.prefix, "backup");
        assert!(config.backup.subfolder.is_none());
        assert!(!config.retention.is_enabled());
        assert!(!config.retention.dry_run);
        assert_eq!(config.retention.delete_concurrency, 8);
    }

    #[test]
    fn test_configless_operation() {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .extract::<Configuration>()
            .unwrap();

        assert_eq!(config.backup.prefix, "backup");
        assert!(config.retention.max_count.is_none());
        assert!(config.retention.max_age_days.is_none());
    }

    #[test]
    fn test_toml_file_and_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "sweeper.toml",
                r#"
                [storage]
                bucket = "nightly-backups"
                endpoint = "http://localhost:9000"
                force_path_style = true

                [backup]
                prefix = "mydb"
                subfolder = "postgres"

                [retention]
                max_count = 5
                "#,
            )?;
            jail.set_env("SWEEPER__RETENTION__MAX_AGE_DAYS", "30");
            jail.set_env("SWEEPER__RETENTION__MAX_COUNT", "3");

            let config = Configuration::load().map_err(|e| e.to_string())?;

            assert_eq!(config.storage.bucket, "nightly-backups");
            assert_eq!(
                config.storage.endpoint.as_deref(),
                Some("http://localhost:9000")
            );
            assert!(config.storage.force_path_style);
            assert_eq!(config.backup.prefix, "mydb");
            assert_eq!(config.backup.subfolder.as_deref(), Some("postgres"));
            assert_eq!(config.retention.max_count, Some(3));
            assert_eq!(config.retention.max_age_days, Some(30));
            assert!(config.retention.is_enabled());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_explicit_path() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[storage]\nbucket = \"other\"\n")?;

            let config = Configuration::load_from_path(Path::new("custom.toml"))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.storage.bucket, "other");
            assert_eq!(config.backup.prefix, "backup");
            Ok(())
        });
    }

    #[test]
    fn test_valid_configuration() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_missing_bucket_is_invalid() {
        let config = Configuration::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingBucket)));
    }

    #[test]
    fn test_prefix_validation() {
        let mut config = valid();
        config.backup.prefix = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::MissingPrefix)));

        config.backup.prefix = "nested/prefix".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_zero_retention_bounds_are_invalid() {
        let mut config = valid();
        config.retention.max_count = Some(0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMaxCount)));

        let mut config = valid();
        config.retention.max_age_days = Some(0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidMaxAge)));

        let mut config = valid();
        config.retention.delete_concurrency = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidConcurrency)
        ));
    }

    #[test]
    fn test_invalid_endpoint() {
        let mut config = valid();
        config.storage.endpoint = Some("not a url".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn test_serializes_without_unset_options() {
        let json = serde_json::to_value(valid()).unwrap();
        assert!(json["retention"].get("max_count").is_none());
        assert!(json["storage"].get("endpoint").is_none());
    }
}
