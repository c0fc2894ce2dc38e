//! Error types for cloudcrate

use thiserror::Error;

/// Main error type for cloudcrate operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// Result type alias for cloudcrate operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(feature = "gpu")]
impl From<wgpu::BufferAsyncError> for Error {
    fn from(e: wgpu::BufferAsyncError) -> Self {
        Error::Gpu(e.to_string())
    }
}
