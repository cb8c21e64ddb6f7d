//! LLM client error handling.

use thiserror::Error;

/// Errors talking to the generation server.
#[derive(Error, Debug)]
pub enum AiError {
    /// The server could not be reached.
    #[error("Failed to connect to {url}: {reason}")]
    Connection {
        /// Endpoint that was contacted.
        url: String,
        /// Transport error description.
        reason: String,
    },

    /// The server answered with a non-success status.
    #[error("Generation request failed: HTTP {status}: {body}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The response stream broke off or was unreadable.
    #[error("Generation stream interrupted: {0}")]
    Stream(String),

    /// The model finished without producing any text.
    #[error("Model returned an empty response")]
    EmptyResponse,
}
