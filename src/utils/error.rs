use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config file parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Table '{table}' is not available: {message}")]
    TableUnavailable { table: String, message: String },

    #[error("Parameter not found: {name}")]
    ParameterNotFound { name: String },

    #[error("{service} {operation} failed: {message}")]
    RemoteError {
        service: &'static str,
        operation: &'static str,
        message: String,
    },
}

impl BackendError {
    pub fn remote(service: &'static str, operation: &'static str, message: impl Into<String>) -> Self {
        BackendError::RemoteError {
            service,
            operation,
            message: message.into(),
        }
    }

    /// Soft condition used to pick between hierarchical and direct lookups.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::ParameterNotFound { .. })
    }

    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BackendError::ConfigError { .. }
                | BackendError::MissingConfigError { .. }
                | BackendError::InvalidConfigValueError { .. }
                | BackendError::TomlError(_)
        )
    }

    /// Process exit code used by the binaries.
    pub fn exit_code(&self) -> i32 {
        match self {
            e if e.is_config_error() => 1,
            BackendError::TableUnavailable { .. } => 3,
            BackendError::RemoteError { .. } | BackendError::ParameterNotFound { .. } => 2,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, BackendError>;
