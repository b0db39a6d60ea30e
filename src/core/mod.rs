pub mod backend;
pub mod dynamodb;
pub mod ssm;
pub mod watch;

pub use crate::domain::model::{BatchError, Lookup, LookupResult, SkippedEntry, ValueMap};
pub use crate::domain::ports::{ItemStore, ParameterStore, StopSignal, StoreClient, WatchCapability};
pub use crate::utils::error::Result;
