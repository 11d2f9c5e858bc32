//! Error types for the registry-mirror extension
//!
//! Field-level problems are collected in a [`field::ErrorList`] and surface as
//! a single [`Error::Invalid`]; every other variant is a fatal error that
//! short-circuits the request it occurred in.

use thiserror::Error;

use crate::field;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// Main error type for registry-mirror operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// Reading an object from the API failed
    #[error("failed to get {kind} {key}: {source}")]
    Read {
        /// Kind of the object that was read (e.g. "Secret")
        kind: String,
        /// Object key in `namespace/name` form
        key: String,
        /// The underlying kube-rs error
        source: kube::Error,
    },

    /// A provider config could not be decoded
    #[error("failed to decode providerConfig: {message}")]
    Decode {
        /// Description of what failed
        message: String,
        /// The document kind being decoded (if known)
        kind: Option<String>,
    },

    /// The admitted object is not of the expected kind
    #[error("wrong object type {kind}")]
    WrongObjectType {
        /// Kind (or type description) of the object that was received
        kind: String,
    },

    /// A precondition of the operation does not hold
    #[error("{message}")]
    Precondition {
        /// Description of the unmet precondition
        message: String,
    },

    /// Aggregate of field validation errors
    #[error("{0}")]
    Invalid(field::ErrorList),

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "ensurer", "server", "config")
        context: String,
    },
}

impl Error {
    /// Create a decode error with the given message
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
            kind: None,
        }
    }

    /// Create a decode error with document kind context
    pub fn decode_for_kind(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            message: msg.into(),
            kind: Some(kind.into()),
        }
    }

    /// Create a read error for an object key
    pub fn read(kind: impl Into<String>, key: impl Into<String>, source: kube::Error) -> Self {
        Self::Read {
            kind: kind.into(),
            key: key.into(),
            source,
        }
    }

    /// Create a wrong-object-type error
    pub fn wrong_object_type(kind: impl Into<String>) -> Self {
        Self::WrongObjectType { kind: kind.into() }
    }

    /// Create a precondition error
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition {
            message: msg.into(),
        }
    }

    /// Create an internal error with the given message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: UNKNOWN_CONTEXT.to_string(),
        }
    }

    /// Create an internal error with context
    pub fn internal_with_context(context: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            context: context.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// Field errors, decode errors and unmet preconditions need a config fix.
    /// Kubernetes errors are retryable unless the API rejected the request.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } | Error::Read { source, .. } => !matches!(
                source,
                kube::Error::Api(ae) if (400..500).contains(&ae.code)
            ),
            Error::Decode { .. } => false,
            Error::WrongObjectType { .. } => false,
            Error::Precondition { .. } => false,
            Error::Invalid(_) => false,
            Error::Internal { .. } => true,
        }
    }

    /// Field errors carried by this error, if it is an aggregate
    pub fn field_errors(&self) -> Option<&field::ErrorList> {
        match self {
            Error::Invalid(list) => Some(list),
            _ => None,
        }
    }

    /// Get the context if this error has one
    pub fn context(&self) -> Option<&str> {
        match self {
            Error::Internal { context, .. } => Some(context),
            _ => None,
        }
    }
}

impl From<field::ErrorList> for Error {
    fn from(list: field::ErrorList) -> Self {
        Error::Invalid(list)
    }
}
