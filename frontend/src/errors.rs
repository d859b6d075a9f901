use thiserror::Error;

/// Everything that can go wrong during one `/chat` exchange.
///
/// The session never branches on the variant; it only shows the
/// `Display` text to the user as an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// The request never got an HTTP response (DNS, refused connection,
    /// CORS rejection, timeout).
    #[error("Could not reach the assistant: {0}")]
    Connectivity(String),

    /// The backend answered with a status outside 200-299.
    #[error("The assistant returned an error (HTTP {status}). Please try again.")]
    Transport { status: u16 },

    /// The body could not be decoded or had no usable `answer`.
    #[error("The assistant sent a response that could not be read: {0}")]
    MalformedResponse(String),
}

impl ChatError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, ChatError::Connectivity(_))
    }
}
