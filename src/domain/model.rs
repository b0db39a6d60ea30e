use crate::utils::error::BackendError;
use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;
use thiserror::Error;

/// Flat key → value mapping handed to the template renderer.
pub type ValueMap = HashMap<String, String>;

/// A single DynamoDB record as seen by get-item and scan.
pub type RemoteItem = HashMap<String, AttributeValue>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The stored value has a remote type other than string (`N`, `BOOL`, `M`, ...).
    NonStringValue { found: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub key: String,
    pub reason: SkipReason,
}

/// Outcome of one `get_values` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lookup {
    pub values: ValueMap,
    pub skipped: Vec<SkippedEntry>,
}

impl Lookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn skip(&mut self, key: impl Into<String>, reason: SkipReason) {
        self.skipped.push(SkippedEntry {
            key: key.into(),
            reason,
        });
    }

    /// Later entries overwrite earlier ones.
    pub fn merge(&mut self, values: ValueMap) {
        self.values.extend(values);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> ValueMap {
        self.values
    }
}

/// A hard error that aborted a batch. Everything resolved before the failing
/// key is kept in `partial`.
#[derive(Error, Debug)]
#[error("lookup of key '{key}' failed: {source}")]
pub struct BatchError {
    pub key: String,
    pub partial: Lookup,
    #[source]
    pub source: BackendError,
}

pub type LookupResult = std::result::Result<Lookup, BatchError>;

/// Remote type tag of a DynamoDB attribute, as used in the wire format.
pub fn attribute_type(value: &AttributeValue) -> &'static str {
    match value {
        AttributeValue::S(_) => "S",
        AttributeValue::N(_) => "N",
        AttributeValue::B(_) => "B",
        AttributeValue::Bool(_) => "BOOL",
        AttributeValue::Null(_) => "NULL",
        AttributeValue::M(_) => "M",
        AttributeValue::L(_) => "L",
        AttributeValue::Ss(_) => "SS",
        AttributeValue::Ns(_) => "NS",
        AttributeValue::Bs(_) => "BS",
        _ => "UNKNOWN",
    }
}
