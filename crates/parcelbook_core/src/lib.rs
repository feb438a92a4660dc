//! Core domain logic for parcelbook.
//! This crate is the single source of truth for property and parcel invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DatabaseConfig, LoggingConfig};
pub use db::{open_db, open_db_in_memory, open_db_with, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::boundary::{BoundaryCoordinate, BoundaryPoint, BoundaryPointId};
pub use model::parcel::{Parcel, ParcelId, ParcelStatus};
pub use model::property::{Property, PropertyId};
pub use model::validation::ValidationError;
pub use model::{EntityKind, OwnerId};
pub use repo::parcel_repo::{ParcelRepository, SqliteParcelRepository};
pub use repo::property_repo::{PropertyRepository, SqlitePropertyRepository};
pub use repo::unit_of_work::{SqliteUnitOfWork, UnitOfWork};
pub use repo::{RepoError, RepoResult};
pub use service::contracts::{
    BoundaryPointResponse, CreateParcelRequest, CreatePropertyRequest, ParcelResponse,
    PropertyResponse, UpdateParcelRequest, UpdatePropertyRequest,
};
pub use service::error::{ConflictReason, ErrorKind, ServiceError, ServiceResult};
pub use service::parcel_service::ParcelService;
pub use service::property_service::PropertyService;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
