//! Error types for the Azure Stack HCI provider
//!
//! Errors carry the resource they concern so a failed reconcile can be traced
//! back to a specific machine without digging through logs.

use thiserror::Error;

use crate::annotations::AnnotationError;

/// Default context value when no specific context is available
pub const UNKNOWN_CONTEXT: &str = "unknown";

/// HTTP status the API server returns for a stale `resourceVersion`
const HTTP_CONFLICT: u16 = 409;
/// HTTP status the API server returns for a missing object
const HTTP_NOT_FOUND: u16 = 404;

/// Main error type for provider operations
#[derive(Debug, Error)]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {source}")]
    Kube {
        /// The underlying kube-rs error
        #[from]
        source: kube::Error,
    },

    /// An annotation could not be encoded or decoded
    #[error("annotation error: {source}")]
    Annotation {
        /// The underlying annotation error
        #[from]
        source: AnnotationError,
    },

    /// The write was based on a stale copy of the object
    #[error("conflict updating {resource}: {message}")]
    Conflict {
        /// `namespace/name` of the object
        resource: String,
        /// Message returned by the API server
        message: String,
    },

    /// The object does not exist
    #[error("{resource} not found")]
    NotFound {
        /// `namespace/name` of the object
        resource: String,
    },

    /// Internal/operational error
    #[error("internal error [{context}]: {message}")]
    Internal {
        /// Description of what failed
        message: String,
        /// Context where the error occurred (e.g., "create_client", "replace_machine")
        context: String,
    },
}

impl Error {
    /// Create a conflict error for the given resource
    pub fn conflict(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Conflict {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create a not-found error for the given resource
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
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

    /// Classify a kube error raised while writing `resource`.
    ///
    /// 409 becomes [`Error::Conflict`] and 404 becomes [`Error::NotFound`];
    /// everything else is kept as [`Error::Kube`].
    pub fn from_kube_for(resource: impl Into<String>, source: kube::Error) -> Self {
        if let kube::Error::Api(ae) = &source {
            match ae.code {
                HTTP_CONFLICT => return Self::conflict(resource, ae.message.clone()),
                HTTP_NOT_FOUND => return Self::not_found(resource),
                _ => {}
            }
        }
        Self::Kube { source }
    }

    /// True if the write lost an optimistic-concurrency race
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }

    /// Check if this error is retryable
    ///
    /// Annotation and not-found errors need the object or its content fixed.
    /// Conflicts succeed after re-reading the object.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Kube { source } => {
                // Don't retry on 4xx errors (validation, forbidden, etc.)
                !matches!(
                    source,
                    kube::Error::Api(ae) if (400..500).contains(&ae.code)
                )
            }
            Error::Annotation { .. } => false,
            Error::Conflict { .. } => true,
            Error::NotFound { .. } => false,
            Error::Internal { .. } => true,
        }
    }

    /// Get the resource if this error is associated with a specific object
    pub fn resource(&self) -> Option<&str> {
        match self {
            Error::Conflict { resource, .. } | Error::NotFound { resource } => Some(resource),
            _ => None,
        }
    }
}
