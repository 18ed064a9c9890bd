//! Error types and result types for CRUD builder operations.
//!
//! Every stage method and every `execute` call reports failures through
//! [`CrudError`]. Use [`CrudResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors raised while building or executing a CRUD operation.
///
/// Builder methods fail synchronously with [`CrudError::InvalidArgument`] or
/// [`CrudError::StageMisuse`]. `execute` fails either before any wire I/O
/// (`EmptyBatch`, `UnresolvedBinding`, `CollectionGone`, `InvalidArgument`) or
/// after submission (`Transport`, `Server`, `Cancelled`).
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrudError {
    /// Malformed JSON, an empty sort key, an unparsable field path or an invalid parameter name.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// The operation was mutated or executed in a state that does not allow it.
    #[error("Stage misuse: {0}")]
    StageMisuse(String),
    /// An add operation was executed without any documents.
    #[error("Add operation has no documents to insert")]
    EmptyBatch,
    /// A filter or update references a parameter with no bound value.
    #[error("Unresolved binding for parameter :{0}")]
    UnresolvedBinding(String),
    /// The collection or session backing a builder is gone.
    #[error("Collection gone: {0}")]
    CollectionGone(String),
    /// A network or protocol failure during submit or response.
    #[error("Transport error: {0}")]
    Transport(String),
    /// A failure reported by the server.
    #[error("Server error {code}: {message}")]
    Server {
        /// Server error code.
        code: u32,
        /// Human readable message sent by the server.
        message: String,
    },
    /// The execute was aborted by tearing down the session.
    #[error("Operation cancelled")]
    Cancelled,
    /// Encoding or decoding of a wire frame or a result document failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// A specialized `Result` type for CRUD operations.
pub type CrudResult<T> = Result<T, CrudError>;

impl CrudError {
    /// Shorthand for building a [`CrudError::Server`].
    pub fn server(code: u32, message: impl Into<String>) -> Self {
        CrudError::Server { code, message: message.into() }
    }

    /// Returns `true` if this error was raised before anything was sent to the server.
    pub fn is_pre_wire(&self) -> bool {
        matches!(
            self,
            CrudError::InvalidArgument(_)
                | CrudError::StageMisuse(_)
                | CrudError::EmptyBatch
                | CrudError::UnresolvedBinding(_)
                | CrudError::CollectionGone(_)
        )
    }
}

impl From<BsonError> for CrudError {
    fn from(err: BsonError) -> Self {
        CrudError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for CrudError {
    fn from(err: SerdeJsonError) -> Self {
        CrudError::InvalidArgument(format!("malformed JSON document: {err}"))
    }
}
