//! Error types for the client engine.

use crate::command::CommandId;
use crate::descriptor::ResourceKind;
use crate::transport::TransportError;
use std::fmt;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Entity operations a descriptor may forbid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Updating an existing resource.
    Update,
    /// Deleting a resource.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Update => f.write_str("update"),
            Operation::Delete => f.write_str("delete"),
        }
    }
}

/// Errors that can occur while talking to the service.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClientError {
    /// Missing or malformed fields, detected locally or rejected remotely.
    #[error("validation failed: {message}")]
    Validation {
        /// Description of the problem.
        message: String,
    },

    /// No such remote resource, or the caller cannot see it.
    #[error("not found: {message}")]
    NotFound {
        /// Message reported by the service.
        message: String,
    },

    /// Authenticated but not authorized.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Message reported by the service.
        message: String,
    },

    /// Uniqueness or state conflict.
    #[error("conflict: {message}")]
    Conflict {
        /// Message reported by the service.
        message: String,
    },

    /// The resource kind does not support the operation.
    #[error("{operation} is not supported for {kind}")]
    NotSupported {
        /// Resource kind.
        kind: ResourceKind,
        /// Rejected operation.
        operation: Operation,
    },

    /// A collection requiring a scope filter was fetched without one.
    #[error("collection of {kind} requires one of the filters {required:?}")]
    MissingFilter {
        /// Resource kind.
        kind: ResourceKind,
        /// Acceptable filter keys.
        required: Vec<&'static str>,
    },

    /// An identity component needed to address the resource is absent.
    #[error("{kind} is missing identity component `{component}`")]
    MissingIdentity {
        /// Resource kind.
        kind: ResourceKind,
        /// Missing component name.
        component: String,
    },

    /// An entity of the wrong kind was pushed into a collection.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Collection kind.
        expected: ResourceKind,
        /// Kind of the rejected entity.
        actual: ResourceKind,
    },

    /// Page index outside the last known range.
    #[error("page {page} out of bounds (total pages: {total_pages:?})")]
    OutOfBounds {
        /// Requested page index.
        page: i64,
        /// Last known total page count.
        total_pages: Option<u64>,
    },

    /// Undo or redo was requested with no command tracked or supplied.
    #[error("no command to undo or redo")]
    NoCommand,

    /// The command has already been undone.
    #[error("command {0} is already undone")]
    AlreadyUndone(CommandId),

    /// The command has not been undone, so there is nothing to redo.
    #[error("command {0} has nothing to redo")]
    NothingToRedo(CommandId),

    /// The entity instance was deleted.
    #[error("{kind} {id} has been deleted")]
    Deleted {
        /// Resource kind.
        kind: ResourceKind,
        /// Identity of the deleted entity.
        id: String,
    },

    /// The session has been logged out.
    #[error("session is closed")]
    SessionClosed,

    /// Any other non-success status from the service.
    #[error("remote error {status}: {message}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Message reported by the service.
        message: String,
    },

    /// The transport failed without a status.
    #[error("transport error: {0}")]
    Transport(TransportError),

    /// The service answered with an unexpected body.
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Coarse classification of [`ClientError`] for branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`ClientError::Validation`].
    Validation,
    /// See [`ClientError::NotFound`].
    NotFound,
    /// See [`ClientError::Forbidden`].
    Forbidden,
    /// See [`ClientError::Conflict`].
    Conflict,
    /// See [`ClientError::NotSupported`].
    NotSupported,
    /// See [`ClientError::MissingFilter`].
    MissingFilter,
    /// See [`ClientError::MissingIdentity`].
    MissingIdentity,
    /// See [`ClientError::TypeMismatch`].
    TypeMismatch,
    /// See [`ClientError::OutOfBounds`].
    OutOfBounds,
    /// See [`ClientError::NoCommand`].
    NoCommand,
    /// See [`ClientError::AlreadyUndone`].
    AlreadyUndone,
    /// See [`ClientError::NothingToRedo`].
    NothingToRedo,
    /// See [`ClientError::Deleted`].
    Deleted,
    /// See [`ClientError::SessionClosed`].
    SessionClosed,
    /// See [`ClientError::Remote`].
    Remote,
    /// See [`ClientError::Transport`].
    Transport,
    /// See [`ClientError::Decode`].
    Decode,
}

impl ClientError {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a decode error.
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Returns the error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Validation { .. } => ErrorKind::Validation,
            ClientError::NotFound { .. } => ErrorKind::NotFound,
            ClientError::Forbidden { .. } => ErrorKind::Forbidden,
            ClientError::Conflict { .. } => ErrorKind::Conflict,
            ClientError::NotSupported { .. } => ErrorKind::NotSupported,
            ClientError::MissingFilter { .. } => ErrorKind::MissingFilter,
            ClientError::MissingIdentity { .. } => ErrorKind::MissingIdentity,
            ClientError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            ClientError::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            ClientError::NoCommand => ErrorKind::NoCommand,
            ClientError::AlreadyUndone(_) => ErrorKind::AlreadyUndone,
            ClientError::NothingToRedo(_) => ErrorKind::NothingToRedo,
            ClientError::Deleted { .. } => ErrorKind::Deleted,
            ClientError::SessionClosed => ErrorKind::SessionClosed,
            ClientError::Remote { .. } => ErrorKind::Remote,
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Decode(_) => ErrorKind::Decode,
        }
    }

    /// Returns true if the resource does not exist remotely.
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Returns true if the error was raised before any request was sent.
    pub fn is_client_side(&self) -> bool {
        match self {
            ClientError::NotSupported { .. }
            | ClientError::MissingFilter { .. }
            | ClientError::MissingIdentity { .. }
            | ClientError::TypeMismatch { .. }
            | ClientError::OutOfBounds { .. }
            | ClientError::NoCommand
            | ClientError::Deleted { .. }
            | ClientError::SessionClosed => true,
            // AlreadyUndone/NothingToRedo may come from the local log or a 409.
            _ => false,
        }
    }

    /// Returns the remote status code when the service reported one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Remote { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status_code(),
            ClientError::NotFound { .. } => Some(404),
            ClientError::Forbidden { .. } => Some(403),
            ClientError::Conflict { .. } => Some(409),
            _ => None,
        }
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Status { status, message } => match status {
                400 | 422 => ClientError::Validation { message },
                401 | 403 => ClientError::Forbidden { message },
                404 => ClientError::NotFound { message },
                409 => ClientError::Conflict { message },
                _ => ClientError::Remote { status, message },
            },
            TransportError::Decode(message) => ClientError::Decode(message),
            other => ClientError::Transport(other),
        }
    }
}
