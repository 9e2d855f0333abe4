use thiserror::Error;

#[derive(Error, Debug)]
pub enum StegaError {
    #[error("No marker found in input")]
    NoMarker,

    #[error("Marker payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("Marker payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Marker run has {len} digits, expected a multiple of 4")]
    Misaligned { len: usize },
}

pub type StegaResult<T> = Result<T, StegaError>;
