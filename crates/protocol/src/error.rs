//! Protocol error types

use thiserror::Error;

/// Protocol-level errors
///
/// The `Display` form of each variant is exactly what goes into the
/// `message` field of a wire `status:error` response.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Input was not structurally decodable JSON
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    /// Decoded, but empty, not an object, or missing the command field
    #[error("Empty or invalid command")]
    InvalidCommand,

    /// Command discriminator is not one the server recognizes
    #[error("Unknown command")]
    UnknownCommand,

    /// Well-formed command with fields of the wrong shape
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Request exceeds the single-read ceiling
    #[error("Request too large: {size} bytes (max: {max})")]
    RequestTooLarge { size: usize, max: usize },

    /// Response exceeds the client-side read ceiling
    #[error("Response too large: exceeds {max} bytes")]
    ResponseTooLarge { max: usize },

    /// I/O error during read/write
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Type alias for protocol results
pub type Result<T> = std::result::Result<T, ProtocolError>;
