//! SSM Parameter Store backend.

use crate::config::aws::load_sdk_config;
use crate::config::SsmSettings;
use crate::core::watch::wait_for_stop;
use crate::domain::model::{BatchError, Lookup, LookupResult, ValueMap};
use crate::domain::ports::{ParameterStore, StopSignal, StoreClient};
use crate::utils::error::{BackendError, Result};
use async_trait::async_trait;
use aws_sdk_ssm::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_ssm::types::Parameter;
use aws_sdk_ssm::Client as SdkClient;

const SERVICE: &str = "SSM";
const PARAMETER_NOT_FOUND: &str = "ParameterNotFound";
const VALIDATION_EXCEPTION: &str = "ValidationException";

/// Codes a listing reports for a path that holds nothing to list, such as a
/// name outside the `/` hierarchy.
const LISTING_NOT_FOUND: &[&str] = &[PARAMETER_NOT_FOUND, VALIDATION_EXCEPTION];

/// `ParameterStore` backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct SdkParameterStore {
    client: SdkClient,
}

impl SdkParameterStore {
    pub fn new(client: SdkClient) -> Self {
        Self { client }
    }
}

fn map_sdk_error<E>(
    operation: &'static str,
    name: &str,
    not_found_codes: &[&str],
    err: E,
) -> BackendError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    if err.code().is_some_and(|code| not_found_codes.contains(&code)) {
        return BackendError::ParameterNotFound {
            name: name.to_string(),
        };
    }
    BackendError::remote(SERVICE, operation, DisplayErrorContext(&err).to_string())
}

fn into_pair(parameter: Parameter) -> Option<(String, String)> {
    match (parameter.name, parameter.value) {
        (Some(name), Some(value)) => Some((name, value)),
        (Some(name), None) => {
            tracing::warn!("Skipping parameter '{}' returned without a value", name);
            None
        }
        (None, _) => {
            tracing::warn!("Skipping parameter returned without a name");
            None
        }
    }
}

#[async_trait]
impl ParameterStore for SdkParameterStore {
    async fn get_parameters_by_path(&self, path: &str) -> Result<ValueMap> {
        let mut parameters = ValueMap::new();
        let mut pages = self
            .client
            .get_parameters_by_path()
            .path(path)
            .recursive(true)
            .with_decryption(true)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| map_sdk_error("GetParametersByPath", path, LISTING_NOT_FOUND, e))?;
            parameters.extend(page.parameters.unwrap_or_default().into_iter().filter_map(into_pair));
        }

        Ok(parameters)
    }

    async fn get_parameter(&self, name: &str) -> Result<(String, String)> {
        let output = self
            .client
            .get_parameter()
            .name(name)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| map_sdk_error("GetParameter", name, &[PARAMETER_NOT_FOUND], e))?;

        output
            .parameter
            .and_then(into_pair)
            .ok_or_else(|| BackendError::ParameterNotFound {
                name: name.to_string(),
            })
    }
}

pub struct SsmClient<P: ParameterStore = SdkParameterStore> {
    store: P,
}

impl SsmClient<SdkParameterStore> {
    /// Resolves the default AWS configuration. Fails when no region is available.
    pub async fn connect(settings: &SsmSettings) -> Result<Self> {
        let sdk_config = load_sdk_config(settings.region.as_deref()).await?;
        let mut builder = aws_sdk_ssm::config::Builder::from(&sdk_config);
        if let Some(endpoint) = &settings.endpoint_url {
            tracing::info!("Using SSM endpoint {}", endpoint);
            builder = builder.endpoint_url(endpoint);
        }

        Ok(Self::from_conf(builder.build()))
    }

    pub fn from_conf(config: aws_sdk_ssm::Config) -> Self {
        Self::new(SdkParameterStore::new(SdkClient::from_conf(config)))
    }
}

impl<P: ParameterStore> SsmClient<P> {
    pub fn new(store: P) -> Self {
        Self { store }
    }

    /// Hierarchical listing first; the literal name only when the listing is empty.
    async fn resolve_key(&self, key: &str) -> Result<ValueMap> {
        // 非 "/" 開頭的路徑會被服務拒絕，視同找不到
        match self.store.get_parameters_by_path(key).await {
            Ok(found) if !found.is_empty() => return Ok(found),
            Ok(_) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        match self.store.get_parameter(key).await {
            Ok((name, value)) => Ok(ValueMap::from([(name, value)])),
            Err(e) if e.is_not_found() => {
                tracing::debug!("No parameters found for key={}", key);
                Ok(ValueMap::new())
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl<P: ParameterStore> StoreClient for SsmClient<P> {
    async fn get_values(&self, keys: &[String]) -> LookupResult {
        let mut lookup = Lookup::new();

        for key in keys {
            tracing::debug!("Processing key={}", key);
            match self.resolve_key(key).await {
                Ok(found) => lookup.merge(found),
                Err(source) => {
                    return Err(BatchError {
                        key: key.clone(),
                        partial: lookup,
                        source,
                    })
                }
            }
        }

        Ok(lookup)
    }

    async fn watch_prefix(
        &self,
        prefix: &str,
        _keys: &[String],
        wait_index: u64,
        stop: StopSignal,
    ) -> Result<u64> {
        wait_for_stop(prefix, wait_index, stop).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeParameters {
        params: BTreeMap<String, String>,
        listing_error: Option<fn() -> BackendError>,
        get_error: Option<fn() -> BackendError>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeParameters {
        fn with(mut self, name: &str, value: &str) -> Self {
            self.params.insert(name.to_string(), value.to_string());
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ParameterStore for FakeParameters {
        async fn get_parameters_by_path(&self, path: &str) -> Result<ValueMap> {
            self.calls.lock().unwrap().push(format!("list {}", path));
            if let Some(error) = self.listing_error {
                return Err(error());
            }
            let prefix = format!("{}/", path.trim_end_matches('/'));
            Ok(self
                .params
                .iter()
                .filter(|(name, _)| name.starts_with(&prefix))
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect())
        }

        async fn get_parameter(&self, name: &str) -> Result<(String, String)> {
            self.calls.lock().unwrap().push(format!("get {}", name));
            if let Some(error) = self.get_error {
                return Err(error());
            }
            self.params
                .get(name)
                .map(|value| (name.to_string(), value.clone()))
                .ok_or_else(|| BackendError::ParameterNotFound {
                    name: name.to_string(),
                })
        }
    }

    fn keys(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|k| k.to_string()).collect()
    }

    fn throttled() -> BackendError {
        BackendError::remote(SERVICE, "GetParameter", "ThrottlingException")
    }

    fn rejected_path() -> BackendError {
        BackendError::ParameterNotFound {
            name: "db_password".to_string(),
        }
    }

    fn not_found() -> BackendError {
        BackendError::ParameterNotFound {
            name: "/app".to_string(),
        }
    }

    #[tokio::test]
    async fn test_path_listing_returns_all_children() {
        let store = FakeParameters::default()
            .with("/app/db/host", "db.local")
            .with("/app/db/port", "5432")
            .with("/app/cache", "redis")
            .with("/other", "x");
        let client = SsmClient::new(store);

        let lookup = client.get_values(&keys(&["/app"])).await.unwrap();

        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.get("/app/db/host"), Some("db.local"));
        assert_eq!(lookup.get("/app/cache"), Some("redis"));
        assert_eq!(client.store.calls(), vec!["list /app"]);
    }

    #[tokio::test]
    async fn test_leaf_key_falls_back_to_direct_lookup() {
        let store = FakeParameters::default().with("/app/db", "v1");
        let client = SsmClient::new(store);

        let lookup = client.get_values(&keys(&["/app/db"])).await.unwrap();

        assert_eq!(lookup.values, ValueMap::from([("/app/db".to_string(), "v1".to_string())]));
        assert_eq!(client.store.calls(), vec!["list /app/db", "get /app/db"]);
    }

    #[tokio::test]
    async fn test_missing_key_contributes_nothing() {
        let client = SsmClient::new(FakeParameters::default().with("/app/db", "v1"));

        let lookup = client.get_values(&keys(&["/missing", "/app/db"])).await.unwrap();

        assert_eq!(lookup.len(), 1);
        assert!(lookup.get("/missing").is_none());
    }

    #[tokio::test]
    async fn test_not_found_listing_falls_back() {
        let store = FakeParameters {
            listing_error: Some(not_found),
            ..FakeParameters::default()
        }
        .with("/app", "root");
        let client = SsmClient::new(store);

        let lookup = client.get_values(&keys(&["/app"])).await.unwrap();

        assert_eq!(lookup.get("/app"), Some("root"));
    }

    #[tokio::test]
    async fn test_listing_error_aborts_without_fallback() {
        let store = FakeParameters {
            listing_error: Some(throttled),
            ..FakeParameters::default()
        }
        .with("/app", "root");
        let client = SsmClient::new(store);

        let err = client.get_values(&keys(&["/app"])).await.unwrap_err();

        assert_eq!(err.key, "/app");
        assert!(!err.source.is_not_found());
        assert_eq!(client.store.calls(), vec!["list /app"]);
    }

    #[tokio::test]
    async fn test_fallback_error_aborts_with_partial_result() {
        let store = FakeParameters {
            get_error: Some(throttled),
            ..FakeParameters::default()
        }
        .with("/app/db", "v1");
        let client = SsmClient::new(store);

        let err = client
            .get_values(&keys(&["/app", "/empty", "/later"]))
            .await
            .unwrap_err();

        assert_eq!(err.key, "/empty");
        assert_eq!(err.partial.get("/app/db"), Some("v1"));
        assert!(matches!(err.source, BackendError::RemoteError { .. }));
        assert!(!client.store.calls().iter().any(|c| c.ends_with("/later")));
    }

    #[tokio::test]
    async fn test_plain_name_is_listed_before_direct_lookup() {
        let client = SsmClient::new(FakeParameters::default().with("db_password", "secret"));

        let lookup = client.get_values(&keys(&["db_password"])).await.unwrap();

        assert_eq!(lookup.get("db_password"), Some("secret"));
        assert_eq!(client.store.calls(), vec!["list db_password", "get db_password"]);
    }

    #[tokio::test]
    async fn test_relative_prefix_lists_children() {
        let store = FakeParameters::default()
            .with("db/host", "db.local")
            .with("db/port", "5432")
            .with("dbx", "other");
        let client = SsmClient::new(store);

        let lookup = client.get_values(&keys(&["db"])).await.unwrap();

        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.get("db/host"), Some("db.local"));
        assert!(lookup.get("dbx").is_none());
        assert_eq!(client.store.calls(), vec!["list db"]);
    }

    #[tokio::test]
    async fn test_rejected_listing_falls_back_to_direct_lookup() {
        let store = FakeParameters {
            listing_error: Some(rejected_path),
            ..FakeParameters::default()
        }
        .with("db_password", "secret");
        let client = SsmClient::new(store);

        let lookup = client.get_values(&keys(&["db_password"])).await.unwrap();

        assert_eq!(lookup.get("db_password"), Some("secret"));
        assert_eq!(client.store.calls(), vec!["list db_password", "get db_password"]);
    }

    #[tokio::test]
    async fn test_watch_waits_for_stop() {
        let client = SsmClient::new(FakeParameters::default());
        assert_eq!(
            client.watch_capability(),
            crate::domain::ports::WatchCapability::LongPollUnsupported
        );

        let (tx, rx) = tokio::sync::oneshot::channel();
        tx.send(()).unwrap();
        assert_eq!(client.watch_prefix("/app", &[], 5, rx).await.unwrap(), 0);
        assert!(client.store.calls().is_empty());
    }

    fn coded(code: &str) -> aws_sdk_ssm::error::ErrorMetadata {
        aws_sdk_ssm::error::ErrorMetadata::builder().code(code).build()
    }

    #[test]
    fn test_validation_error_is_not_found_only_for_listing() {
        let listing = map_sdk_error(
            "GetParametersByPath",
            "db",
            LISTING_NOT_FOUND,
            coded(VALIDATION_EXCEPTION),
        );
        assert!(listing.is_not_found());

        let direct = map_sdk_error(
            "GetParameter",
            "db",
            &[PARAMETER_NOT_FOUND],
            coded(VALIDATION_EXCEPTION),
        );
        assert!(!direct.is_not_found());

        let throttled = map_sdk_error(
            "GetParametersByPath",
            "/app",
            LISTING_NOT_FOUND,
            coded("ThrottlingException"),
        );
        assert!(matches!(
            throttled,
            BackendError::RemoteError { operation: "GetParametersByPath", .. }
        ));
    }

    #[tokio::test]
    async fn test_results_merge_across_keys() {
        let store = FakeParameters::default()
            .with("/app/db", "v1")
            .with("/app/cache", "v2")
            .with("/shared/region", "eu");
        let client = SsmClient::new(store);
        let requested = keys(&["/app", "/shared", "/app/db"]);

        let first = client.get_values(&requested).await.unwrap();
        let second = client.get_values(&requested).await.unwrap();

        assert_eq!(first.len(), 3);
        assert_eq!(first.get("/shared/region"), Some("eu"));
        assert_eq!(first, second);
    }

    #[test]
    fn test_parameter_missing_name_or_value_is_dropped() {
        let parameter = Parameter::builder().name("/app/db").build();
        assert!(into_pair(parameter).is_none());

        let parameter = Parameter::builder().value("v1").build();
        assert!(into_pair(parameter).is_none());

        let parameter = Parameter::builder().name("/app/db").value("v1").build();
        assert_eq!(into_pair(parameter), Some(("/app/db".to_string(), "v1".to_string())));
    }
}
