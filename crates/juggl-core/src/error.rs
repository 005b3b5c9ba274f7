use thiserror::Error;

#[derive(Debug, Error)]
pub enum JugglError {
    #[error("File System error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid resource URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Invalid typed link pattern: {0}")]
    Regex(#[from] regex::Error),
    #[error("Item Not Found: {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, JugglError>;
