use thiserror::Error;

/// Failure while talking to the record store.
///
/// Store errors never reach clients; handlers log them and answer with a
/// generic, operation-specific message.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Transport level failure (connect, timeout, TLS)
    #[error("Store request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status
    #[error("Store responded with status {status}: {body}")]
    Status { status: u16, body: String },

    /// The store answered with a payload we could not interpret
    #[error("Invalid store response: {0}")]
    Decode(String),

    /// The store was constructed with unusable settings
    #[error("Store misconfigured: {0}")]
    Config(String),

    /// The store is unreachable for any other reason
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}
