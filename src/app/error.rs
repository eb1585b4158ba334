use thiserror::Error;

use crate::config::ConfigError;
use crate::fetcher::FetchError;

#[derive(Error, Debug)]
pub enum PostdeckError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

pub type Result<T> = std::result::Result<T, PostdeckError>;
