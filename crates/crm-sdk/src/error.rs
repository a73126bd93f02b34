use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to render config: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    #[error("audit error: {0}")]
    Audit(#[from] crm_audit::AuditError),

    #[error("tracing already initialized: {0}")]
    Tracing(String),
}

pub type SdkResult<T> = Result<T, SdkError>;
