use thiserror::Error;

#[derive(Error, Debug)]
pub enum MilestonerError {
    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Invalid repository format: {0}")]
    InvalidRepository(String),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, MilestonerError>;
