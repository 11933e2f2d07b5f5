//! Crate-wide error types.

use thiserror::Error;

pub type WaldorfResult<T> = Result<T, WaldorfError>;

#[derive(Debug, Error)]
pub enum WaldorfError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("profile error: {0}")]
    Profile(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("report error: {0}")]
    Report(String),

    #[error("timestamp error: {0}")]
    Timestamp(String),

    #[error("zip error: {0}")]
    Zip(String),
}

impl From<zip::result::ZipError> for WaldorfError {
    fn from(value: zip::result::ZipError) -> Self {
        Self::Zip(value.to_string())
    }
}

impl From<time::error::Format> for WaldorfError {
    fn from(value: time::error::Format) -> Self {
        Self::Timestamp(value.to_string())
    }
}
