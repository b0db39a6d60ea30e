use crate::config::{BackendKind, BackendSettings, DynamoDbSettings, Settings, SsmSettings};
use crate::utils::error::{BackendError, Result};
use crate::utils::validation::{validate_required_field, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// On-disk configuration, e.g.
///
/// ```toml
/// backend = "dynamodb"
/// keys = ["/myapp/database", "/myapp/cache"]
/// interval = 60
///
/// [dynamodb]
/// table = "${CONFD_TABLE}"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub backend: Option<BackendKind>,
    #[serde(default)]
    pub keys: Vec<String>,
    pub interval: Option<u64>,
    pub dynamodb: Option<DynamoDbSection>,
    pub ssm: Option<SsmSection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DynamoDbSection {
    pub table: Option<String>,
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SsmSection {
    pub endpoint_url: Option<String>,
    pub region: Option<String>,
}

impl DynamoDbSection {
    fn overlay(self, top: DynamoDbSection) -> Self {
        Self {
            table: top.table.or(self.table),
            endpoint_url: top.endpoint_url.or(self.endpoint_url),
            region: top.region.or(self.region),
        }
    }
}

impl SsmSection {
    fn overlay(self, top: SsmSection) -> Self {
        Self {
            endpoint_url: top.endpoint_url.or(self.endpoint_url),
            region: top.region.or(self.region),
        }
    }
}

fn overlay_section<T: Default>(base: Option<T>, top: Option<T>, merge: fn(T, T) -> T) -> Option<T> {
    match (base, top) {
        (None, None) => None,
        (base, top) => Some(merge(base.unwrap_or_default(), top.unwrap_or_default())),
    }
}

impl FileConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BackendError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${CONFD_TABLE})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BackendError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Values set in `top` win; keys are replaced as a whole when `top` has any.
    pub fn overlay(self, top: FileConfig) -> FileConfig {
        FileConfig {
            backend: top.backend.or(self.backend),
            keys: if top.keys.is_empty() { self.keys } else { top.keys },
            interval: top.interval.or(self.interval),
            dynamodb: overlay_section(self.dynamodb, top.dynamodb, DynamoDbSection::overlay),
            ssm: overlay_section(self.ssm, top.ssm, SsmSection::overlay),
        }
    }

    /// Resolves into validated settings for the selected backend.
    pub fn into_settings(self) -> Result<Settings> {
        let backend = *validate_required_field("backend", &self.backend)?;

        let backend = match backend {
            BackendKind::Dynamodb => {
                let section = self.dynamodb.unwrap_or_default();
                let table = validate_required_field("dynamodb.table", &section.table)?.clone();
                BackendSettings::DynamoDb(DynamoDbSettings {
                    table,
                    endpoint_url: section.endpoint_url,
                    region: section.region,
                })
            }
            BackendKind::Ssm => {
                let section = self.ssm.unwrap_or_default();
                BackendSettings::Ssm(SsmSettings {
                    endpoint_url: section.endpoint_url,
                    region: section.region,
                })
            }
        };

        let settings = Settings {
            backend,
            keys: self.keys,
            interval: self.interval.unwrap_or(0),
        };
        settings.validate()?;
        Ok(settings)
    }
}
