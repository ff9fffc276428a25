//! Error types for the resource client.
//!
//! # Design
//! The client does not interpret failures. Whatever the transport reports
//! comes back untouched inside `ClientError::Transport`. The remaining
//! variants cover the JSON work the client does on either side of the
//! transport call.

/// Errors returned by `ResourceClient` and `PendingRequest`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError<E> {
    /// The request payload could not be converted to JSON.
    #[error("serialization failed: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The response body could not be decoded into the requested type.
    #[error("deserialization failed: {0}")]
    Deserialize(#[source] serde_json::Error),

    /// Search parameters must be a JSON object (or null) to be merged with
    /// the page directive.
    #[error("search parameters must serialize to a JSON object")]
    ParamsNotObject,

    /// The transport failed to execute the request.
    #[error(transparent)]
    Transport(E),
}

impl<E> ClientError<E> {
    /// Recover the transport's error, if that is what failed.
    pub fn into_transport(self) -> Option<E> {
        match self {
            ClientError::Transport(err) => Some(err),
            _ => None,
        }
    }
}
