use crate::config::DynamoDbSettings;
use crate::utils::error::{BackendError, Result};
use aws_config::{BehaviorVersion, Region, SdkConfig};
use std::env;

/// When set to any non-empty value, DynamoDB requests go to a local emulator.
pub const DYNAMODB_LOCAL_ENV: &str = "DYNAMODB_LOCAL";
pub const DYNAMODB_LOCAL_ENDPOINT: &str = "http://localhost:8000";

/// Loads region and credentials the standard AWS way (environment, profile,
/// instance metadata), with an optional region override.
pub async fn load_sdk_config(region: Option<&str>) -> Result<SdkConfig> {
    let mut loader = aws_config::defaults(BehaviorVersion::latest());
    if let Some(region) = region {
        loader = loader.region(Region::new(region.to_string()));
    }

    let config = loader.load().await;
    match config.region() {
        Some(region) => {
            tracing::debug!("Resolved AWS region: {}", region);
            Ok(config)
        }
        None => Err(BackendError::ConfigError {
            message: "No AWS region configured; set AWS_REGION or pass --region".to_string(),
        }),
    }
}

pub fn dynamodb_endpoint(settings: &DynamoDbSettings) -> Option<String> {
    let local_flag = env::var(DYNAMODB_LOCAL_ENV).ok();
    resolve_dynamodb_endpoint(settings.endpoint_url.as_deref(), local_flag.as_deref())
}

/// An explicit endpoint wins; otherwise a non-empty local flag selects the emulator.
pub fn resolve_dynamodb_endpoint(explicit: Option<&str>, local_flag: Option<&str>) -> Option<String> {
    if let Some(endpoint) = explicit {
        return Some(endpoint.to_string());
    }

    match local_flag {
        Some(flag) if !flag.is_empty() => {
            tracing::debug!("{} is set", DYNAMODB_LOCAL_ENV);
            Some(DYNAMODB_LOCAL_ENDPOINT.to_string())
        }
        _ => None,
    }
}
