use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Process memory access is not available on this platform")]
    ProcessUnsupported,

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Failed to write process memory at address {address:#x}: {message}")]
    MemoryWriteFailed { address: u64, message: String },

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("No pointer chain candidate validated for the {0} table")]
    ResolutionFailed(crate::schema::TableKind),

    #[error("Scan rejected as corrupt: {0}")]
    CorruptScan(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error means the target process cannot be reached at all
    /// (missing, denied, or unsupported platform) as opposed to a transfer
    /// failing at a specific address.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Error::ProcessNotFound(_) | Error::ProcessOpenFailed(_) | Error::ProcessUnsupported
        )
    }
}
