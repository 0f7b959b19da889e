use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Backend returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected payload: {0}")]
    UnexpectedPayload(String),
}

pub type Result<T> = std::result::Result<T, SourceError>;
