//! Repository contracts and their SQLite implementations.
//!
//! # Responsibility
//! - Define owner-scoped data access contracts for properties and parcels.
//! - Isolate SQL details from service orchestration.
//! - Provide a transactional scope for check-then-act service sequences.
//!
//! # Invariants
//! - Every read is scoped by owner; a foreign owner's row reads as absent.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Deletes cascade to children inside a single statement.

use crate::db::DbError;
use crate::model::property::PropertyId;
use crate::model::EntityKind;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod parcel_repo;
pub mod property_repo;
mod sqlite_support;
pub mod unit_of_work;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target row does not exist for the given owner.
    NotFound { entity: EntityKind, id: Uuid },
    /// The `(property_id, code_key)` unique index rejected a write.
    DuplicateParcelCode {
        property_id: PropertyId,
        code: String,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing from a migrated connection.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted into a valid entity.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::DuplicateParcelCode { property_id, code } => write!(
                f,
                "parcel code `{code}` already exists in property {property_id}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
