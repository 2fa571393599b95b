//! Unified domain error handling
//!
//! Every failure is a per-request result value; nothing here is fatal to the
//! process. Messages are part of the external contract and are surfaced to
//! the caller verbatim.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TenderError {
    /// Unknown tender/lot/bid/qualification/award/contract/cancellation id.
    #[error("Not Found: {name}")]
    NotFound { name: &'static str },

    /// Schema or cross-field constraint violation; carries the field path.
    #[error("{name}: {description}")]
    Validation {
        name: &'static str,
        description: String,
    },

    /// Status-gated operation attempted out of window.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Optimistic-concurrency write collision; recoverable by reload-and-retry
    /// at the persistence collaborator.
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Error body in the externally observed envelope shape.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub location: &'static str,
    pub name: &'static str,
    pub description: String,
}

impl TenderError {
    pub fn not_found(name: &'static str) -> Self {
        Self::NotFound { name }
    }

    pub fn validation(name: &'static str, description: impl Into<String>) -> Self {
        Self::Validation {
            name,
            description: description.into(),
        }
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self::Forbidden(reason.into())
    }

    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            Self::Validation { .. } => 422,
            Self::Forbidden(_) => 403,
            Self::Conflict(_) => 409,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        match self {
            Self::NotFound { name } => ErrorResponse {
                location: "url",
                name,
                description: "Not Found".to_string(),
            },
            Self::Validation { name, description } => ErrorResponse {
                location: "body",
                name,
                description: description.clone(),
            },
            Self::Forbidden(reason) => ErrorResponse {
                location: "body",
                name: "data",
                description: reason.clone(),
            },
            Self::Conflict(reason) => ErrorResponse {
                location: "body",
                name: "data",
                description: reason.clone(),
            },
        }
    }
}

pub type TenderResult<T> = Result<T, TenderError>;
