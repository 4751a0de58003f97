use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid track selector: {0}")]
    InvalidSelector(String),

    #[error("Invalid filename template: {0}")]
    InvalidTemplate(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("Tagging error: {0}")]
    Tagging(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
