//! Domain model for properties, their parcels and parcel boundaries.
//!
//! # Responsibility
//! - Define the entities whose factories and mutators enforce field rules.
//! - Keep identifiers and timestamps in one canonical shape.
//!
//! # Invariants
//! - Entities are only observable in a validated state.
//! - Timestamps are UTC with microsecond precision, matching storage.

use chrono::{DateTime, SubsecRound, Utc};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod boundary;
pub mod parcel;
pub mod property;
pub mod validation;

/// Opaque identifier of the principal that controls a set of properties.
pub type OwnerId = Uuid;

/// Entity kinds addressable by ID through the repositories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Property,
    Parcel,
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Property => write!(f, "property"),
            Self::Parcel => write!(f, "parcel"),
        }
    }
}

/// Current UTC time truncated to storage precision.
pub(crate) fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
