use anyhow::{Context, Result};
use object_store::{ObjectStore, aws::AmazonS3Builder};
use std::sync::Arc;

use crate::config::StorageConfig;

/// Create an object store for the configured bucket.
pub fn create_object_store(storage_config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    let builder = create_s3_builder(storage_config)?;
    let store = builder.build().with_context(|| {
        format!(
            "Failed to build object store for bucket '{}'",
            storage_config.bucket
        )
    })?;
    Ok(Arc::new(store))
}

/// Create an S3 builder from storage configuration.
///
/// Credentials are picked up from `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY`
/// and `AWS_SESSION_TOKEN`; bucket, region and endpoint always come from the
/// configuration.
pub fn create_s3_builder(storage_config: &StorageConfig) -> Result<AmazonS3Builder> {
    let bucket = storage_config.bucket.trim();
    if bucket.is_empty() {
        return Err(anyhow::anyhow!("Storage configuration must specify a bucket"));
    }

    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .with_region(&storage_config.region);

    let mut allow_http = storage_config.allow_http;
    if let Some(endpoint) = &storage_config.endpoint {
        if endpoint.starts_with("http://") {
            allow_http = true;
        }
        builder = builder.with_endpoint(endpoint);
    }

    Ok(builder
        .with_virtual_hosted_style_request(!storage_config.force_path_style)
        .with_allow_http(allow_http))
}
