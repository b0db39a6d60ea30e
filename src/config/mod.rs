pub mod aws;
pub mod toml_config;

use crate::utils::error::Result;
use crate::utils::validation::{
    validate_aws_region, validate_keys, validate_table_name, validate_url, Validate,
};
use serde::{Deserialize, Serialize};

pub use toml_config::{DynamoDbSection, FileConfig, SsmSection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Dynamodb,
    Ssm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamoDbSettings {
    pub table: String,
    /// Overrides both the regional endpoint and `DYNAMODB_LOCAL`.
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SsmSettings {
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendSettings {
    DynamoDb(DynamoDbSettings),
    Ssm(SsmSettings),
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub backend: BackendSettings,
    pub keys: Vec<String>,
    /// Seconds between re-polls; 0 fetches once.
    pub interval: u64,
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_keys("keys", &self.keys)?;

        let (endpoint_url, region) = match &self.backend {
            BackendSettings::DynamoDb(dynamodb) => {
                validate_table_name("dynamodb.table", &dynamodb.table)?;
                (&dynamodb.endpoint_url, &dynamodb.region)
            }
            BackendSettings::Ssm(ssm) => (&ssm.endpoint_url, &ssm.region),
        };

        if let Some(endpoint_url) = endpoint_url {
            validate_url("endpoint_url", endpoint_url)?;
        }
        if let Some(region) = region {
            validate_aws_region("region", region)?;
        }

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Pretty JSON object, keys sorted.
    Json,
    /// `KEY=value` lines, keys sorted.
    Env,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, clap::Parser)]
#[command(name = "confd-aws")]
#[command(about = "Fetch configuration values from DynamoDB or SSM Parameter Store")]
pub struct CliConfig {
    #[arg(long, help = "TOML config file; flags override its values")]
    pub config: Option<std::path::PathBuf>,

    #[arg(long, value_enum)]
    pub backend: Option<BackendKind>,

    #[arg(long, help = "DynamoDB table holding key/value items")]
    pub table: Option<String>,

    #[arg(long, value_delimiter = ',')]
    pub keys: Vec<String>,

    #[arg(long, help = "Override the service endpoint, e.g. a local emulator")]
    pub endpoint_url: Option<String>,

    #[arg(long)]
    pub region: Option<String>,

    #[arg(long, help = "Re-poll every N seconds (0 = fetch once)")]
    pub interval: Option<u64>,

    #[arg(long, value_enum, default_value = "json")]
    pub output: OutputFormat,

    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: LogFormat,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Flags expressed as a config layer. Endpoint and region apply to
    /// whichever backend ends up selected.
    pub fn as_overlay(&self) -> FileConfig {
        let has_overrides = self.endpoint_url.is_some() || self.region.is_some();

        FileConfig {
            backend: self.backend,
            keys: self.keys.clone(),
            interval: self.interval,
            dynamodb: (has_overrides || self.table.is_some()).then(|| DynamoDbSection {
                table: self.table.clone(),
                endpoint_url: self.endpoint_url.clone(),
                region: self.region.clone(),
            }),
            ssm: has_overrides.then(|| SsmSection {
                endpoint_url: self.endpoint_url.clone(),
                region: self.region.clone(),
            }),
        }
    }

    pub fn resolve(&self) -> Result<Settings> {
        let base = match &self.config {
            Some(path) => {
                tracing::debug!("Loading config file {}", path.display());
                FileConfig::from_file(path)?
            }
            None => FileConfig::default(),
        };

        base.overlay(self.as_overlay()).into_settings()
    }
}
