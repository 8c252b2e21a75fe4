use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("learning period elapsed with {collected} valid samples, need at least {required}")]
    InsufficientSamples { collected: usize, required: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no baseline model available")]
    NotCalibrated,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DetectorError>;
