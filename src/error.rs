use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SyncError {
    #[error("missing config parameter: {0}")]
    MissingConfigKey(String),

    #[error("invalid value for config parameter {key}: {value}")]
    InvalidConfigValue { key: String, value: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(String),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to read genome catalog at {0}")]
    CatalogRead(String),

    #[error("failed to parse genome catalog: {0}")]
    CatalogParse(String),

    #[error("isolate browser request failed: {0}")]
    IsolateHttp(String),

    #[error("isolate browser returned status {status}: {message}")]
    IsolateStatus { status: u16, message: String },

    #[error("failed to decode isolate record: {0}")]
    IsolateDecode(String),

    #[error("genome repository request failed: {0}")]
    RepositoryHttp(String),

    #[error("genome repository returned status {status}: {message}")]
    RepositoryStatus { status: u16, message: String },

    #[error("malformed manifest line {line}: {message}")]
    Manifest { line: usize, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
