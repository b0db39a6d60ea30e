//! DynamoDB backend.
//!
//! Items live in one table with a string partition key `key` and a `value`
//! attribute. A requested key is first looked up as an exact item; when no
//! such item exists it is treated as a prefix and every item whose key begins
//! with it is returned.

use crate::config::aws::{dynamodb_endpoint, load_sdk_config};
use crate::config::DynamoDbSettings;
use crate::core::watch::wait_for_stop;
use crate::domain::model::{
    attribute_type, BatchError, Lookup, LookupResult, RemoteItem, SkipReason,
};
use crate::domain::ports::{ItemStore, StopSignal, StoreClient};
use crate::utils::error::{BackendError, Result};
use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as SdkClient;

pub const KEY_ATTRIBUTE: &str = "key";
pub const VALUE_ATTRIBUTE: &str = "value";

const SERVICE: &str = "DynamoDB";

/// `ItemStore` backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct SdkItemStore {
    client: SdkClient,
    table: String,
}

impl SdkItemStore {
    pub fn new(client: SdkClient, table: impl Into<String>) -> Self {
        Self {
            client,
            table: table.into(),
        }
    }
}

#[async_trait]
impl ItemStore for SdkItemStore {
    async fn describe(&self) -> Result<()> {
        self.client
            .describe_table()
            .table_name(&self.table)
            .send()
            .await
            .map_err(|e| BackendError::TableUnavailable {
                table: self.table.clone(),
                message: DisplayErrorContext(&e).to_string(),
            })?;
        Ok(())
    }

    async fn get_item(&self, key: &str) -> Result<Option<RemoteItem>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table)
            .key(KEY_ATTRIBUTE, AttributeValue::S(key.to_string()))
            .send()
            .await
            .map_err(|e| BackendError::remote(SERVICE, "GetItem", DisplayErrorContext(&e).to_string()))?;

        Ok(output.item)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<RemoteItem>> {
        let mut items = Vec::new();
        let mut start_key = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table)
                .filter_expression("begins_with(#k, :key)")
                .expression_attribute_values(":key", AttributeValue::S(prefix.to_string()))
                .projection_expression("#k, #v")
                .expression_attribute_names("#k", KEY_ATTRIBUTE)
                .expression_attribute_names("#v", VALUE_ATTRIBUTE)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| BackendError::remote(SERVICE, "Scan", DisplayErrorContext(&e).to_string()))?;

            items.extend(output.items.unwrap_or_default());

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(items)
    }
}

pub struct DynamoDbClient<S: ItemStore = SdkItemStore> {
    store: S,
}

impl DynamoDbClient<SdkItemStore> {
    /// Resolves AWS configuration from the environment and verifies the table exists.
    pub async fn connect(settings: &DynamoDbSettings) -> Result<Self> {
        let sdk_config = load_sdk_config(settings.region.as_deref()).await?;
        let mut builder = aws_sdk_dynamodb::config::Builder::from(&sdk_config);
        if let Some(endpoint) = dynamodb_endpoint(settings) {
            tracing::info!("Using DynamoDB endpoint {}", endpoint);
            builder = builder.endpoint_url(endpoint);
        }

        Self::from_conf(builder.build(), &settings.table).await
    }

    pub async fn from_conf(config: aws_sdk_dynamodb::Config, table: &str) -> Result<Self> {
        let client = SdkClient::from_conf(config);
        Self::new(SdkItemStore::new(client, table)).await
    }
}

impl<S: ItemStore> DynamoDbClient<S> {
    /// Fails when the backing table cannot be described.
    pub async fn new(store: S) -> Result<Self> {
        store.describe().await?;
        Ok(Self { store })
    }

    async fn resolve_key(&self, key: &str, lookup: &mut Lookup) -> Result<()> {
        if let Some(item) = self.store.get_item(key).await? {
            if let Some(value) = item.get(VALUE_ATTRIBUTE) {
                match value {
                    AttributeValue::S(s) => lookup.insert(key, s.as_str()),
                    other => skip_value(lookup, key, other),
                }
                return Ok(());
            }
        }

        // 找不到單一項目時，視為前綴查詢子鍵
        for item in self.store.scan_prefix(key).await? {
            let Some(value) = item.get(VALUE_ATTRIBUTE) else {
                continue;
            };
            let Some(AttributeValue::S(item_key)) = item.get(KEY_ATTRIBUTE) else {
                continue;
            };

            match value {
                AttributeValue::S(s) => lookup.insert(item_key.as_str(), s.as_str()),
                other => skip_value(lookup, item_key, other),
            }
        }

        Ok(())
    }
}

fn skip_value(lookup: &mut Lookup, key: &str, value: &AttributeValue) {
    tracing::warn!("Skipping key '{}'. 'value' is not of type 'string'.", key);
    lookup.skip(
        key,
        SkipReason::NonStringValue {
            found: attribute_type(value),
        },
    );
}

#[async_trait]
impl<S: ItemStore> StoreClient for DynamoDbClient<S> {
    async fn get_values(&self, keys: &[String]) -> LookupResult {
        let mut lookup = Lookup::new();

        for key in keys {
            tracing::debug!("Processing key={}", key);
            if let Err(source) = self.resolve_key(key, &mut lookup).await {
                return Err(BatchError {
                    key: key.clone(),
                    partial: lookup,
                    source,
                });
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
