//! Error type shared by every part of the HAL.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HalError {
    #[error("ALSA error: {0}")]
    Alsa(#[from] alsa::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The adapter JSON file is structurally wrong.
    #[error("Invalid adapter config: {0}")]
    InvalidConfig(String),

    /// A name field failed validation (length or charset).
    #[error("Invalid name {0:?}")]
    InvalidName(String),

    #[error("Unknown adapter: {0}")]
    UnknownAdapter(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Nothing on the bus matches the requested adapter.
    #[error("No sound card matches adapter {0}")]
    NoMatchingCard(String),

    #[error("Too many cards, at most {0} are supported")]
    TooManyCards(usize),

    #[error("Mixer element not found: {0}")]
    ElementNotFound(String),

    #[error("Volume {value} outside {min}..={max}")]
    VolumeOutOfRange { value: i64, min: i64, max: i64 },

    #[error("Unsupported PCM format: {0}")]
    UnsupportedFormat(String),

    #[error("Sound card {0} still in use")]
    DeviceBusy(String),

    #[error("No card instance named {0}")]
    UnknownInstance(String),

    #[error("Invalid control identifier: {0}")]
    InvalidCtlId(String),
}

pub type Result<T> = std::result::Result<T, HalError>;
