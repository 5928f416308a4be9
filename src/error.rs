//! Error type shared by the adapter, the codec, the insert buffer and the
//! store implementations.
//!
//! Nothing in this crate retries. Every variant reaches the caller of the
//! operation that produced it, so a benchmark run counts conflicts and
//! transport failures as the errors they are.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The document does not exist and the operation cannot report that as a
    /// plain status (delete, or a write-back racing with a delete).
    #[error("document not found: {id}")]
    NotFound { id: String },

    /// The write carried a revision that is no longer current, or a create
    /// targeted an id that already exists.
    #[error("document update conflict: {id}")]
    Conflict { id: String },

    /// The store could not be reached or the connection broke mid-request.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Any other non-success response from the store.
    #[error("store returned {status}: {error} ({reason})")]
    Store {
        status: u16,
        error: String,
        reason: String,
    },

    #[error("malformed store response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
