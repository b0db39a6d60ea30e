use crate::domain::model::{LookupResult, RemoteItem, ValueMap};
use crate::utils::error::Result;
use async_trait::async_trait;
use tokio::sync::oneshot;

/// Cancels a pending `watch_prefix`. Dropping the sender also counts as a stop.
pub type StopSignal = oneshot::Receiver<()>;

/// How a backend's `watch_prefix` behaves. A backend with a change feed
/// would add its own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum WatchCapability {
    /// `watch_prefix` only waits for the stop signal; re-poll `get_values` instead.
    LongPollUnsupported,
}

/// What a template renderer needs from a configuration backend.
#[async_trait]
pub trait StoreClient: Send + Sync {
    async fn get_values(&self, keys: &[String]) -> LookupResult;

    async fn watch_prefix(
        &self,
        prefix: &str,
        keys: &[String],
        wait_index: u64,
        stop: StopSignal,
    ) -> Result<u64>;

    fn watch_capability(&self) -> WatchCapability {
        WatchCapability::LongPollUnsupported
    }
}

/// Item primitives of the NoSQL table behind the DynamoDB backend.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Fails when the table does not exist or cannot be reached.
    async fn describe(&self) -> Result<()>;

    async fn get_item(&self, key: &str) -> Result<Option<RemoteItem>>;

    /// All items whose key attribute begins with `prefix`, projected to key and value.
    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<RemoteItem>>;
}

/// Parameter primitives of the SSM backend. Both calls request decryption.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Recursive listing under `path`, every page merged.
    async fn get_parameters_by_path(&self, path: &str) -> Result<ValueMap>;

    /// Returns `(name, value)`, or `BackendError::ParameterNotFound`.
    async fn get_parameter(&self, name: &str) -> Result<(String, String)>;
}
