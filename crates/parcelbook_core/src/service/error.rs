//! Service error taxonomy.
//!
//! Callers branch on `ServiceError::kind()`:
//! - `Validation`: fix the request; never retryable as-is.
//! - `NotFound`: absent for this owner. Another owner's record reads the same
//!   way, so cross-owner existence never leaks.
//! - `Conflict`: valid request blocked by current state; retry after it changes.

use crate::model::property::PropertyId;
use crate::model::validation::ValidationError;
use crate::model::EntityKind;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Stateful invariant that blocked an otherwise valid request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictReason {
    /// Parcel writes require the owning property to be active.
    PropertyInactive(PropertyId),
    /// Another parcel of the property already uses this code.
    DuplicateParcelCode {
        property_id: PropertyId,
        code: String,
    },
}

impl Display for ConflictReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PropertyInactive(id) => write!(
                f,
                "property {id} is inactive and does not allow parcel changes"
            ),
            Self::DuplicateParcelCode { property_id, code } => write!(
                f,
                "duplicate code: parcel `{code}` already exists in property {property_id}"
            ),
        }
    }
}

/// Coarse classification for presentation layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Cancelled,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

#[derive(Debug)]
pub enum ServiceError {
    Validation(ValidationError),
    NotFound { entity: EntityKind, id: Uuid },
    Conflict(ConflictReason),
    /// The caller's cancellation token fired before the operation finished.
    Cancelled,
    /// Storage failure unrelated to caller input.
    Repo(RepoError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Repo(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn property_not_found(id: PropertyId) -> Self {
        Self::NotFound {
            entity: EntityKind::Property,
            id,
        }
    }

    pub(crate) fn parcel_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: EntityKind::Parcel,
            id,
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::Conflict(reason) => write!(f, "{reason}"),
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity, id } => Self::NotFound { entity, id },
            RepoError::DuplicateParcelCode { property_id, code } => {
                Self::Conflict(ConflictReason::DuplicateParcelCode { property_id, code })
            }
            other => Self::Repo(other),
        }
    }
}
