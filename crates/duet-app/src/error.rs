use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// No connection could be made to the server.
    #[error("Could not connect to the server at {url}, is it running?")]
    Connectivity { url: String },

    #[error("Request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The server answered with a non-success status.
    #[error("Server error ({status}): {detail}")]
    Remote { status: u16, detail: String },

    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),

    /// The translation step failed, so nothing was generated.
    #[error("Translation failed: {0}")]
    Translation(Box<ClientError>),

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Failed to save video: {0}")]
    Io(#[from] std::io::Error),
}
