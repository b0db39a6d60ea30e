pub mod config;
pub mod core;
pub mod domain;
#[cfg(feature = "mock")]
pub mod mock;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{BackendKind, BackendSettings, DynamoDbSettings, Settings, SsmSettings};
pub use crate::core::{
    dynamodb::DynamoDbClient, ssm::SsmClient, BatchError, Lookup, StoreClient, WatchCapability,
};
pub use utils::error::{BackendError, Result};
