//! Request and response shapes exchanged with presentation layers.
//!
//! Only IDs, text, numbers, status, timestamps and ordered coordinates cross
//! this boundary. Entity -> response mapping is done by the explicit
//! `from_entity` functions below.

use crate::model::boundary::{BoundaryCoordinate, BoundaryPoint};
use crate::model::parcel::{Parcel, ParcelId, ParcelStatus};
use crate::model::property::{Property, PropertyId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePropertyRequest {
    pub name: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePropertyRequest {
    pub name: String,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyResponse {
    pub id: PropertyId,
    pub name: String,
    pub city: String,
    pub state: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl PropertyResponse {
    pub fn from_entity(property: &Property) -> Self {
        Self {
            id: property.id(),
            name: property.name().to_string(),
            city: property.city().to_string(),
            state: property.state().to_string(),
            is_active: property.is_active(),
            created_at: property.created_at(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateParcelRequest {
    pub property_id: PropertyId,
    pub code: String,
    pub name: String,
    pub area_hectares: f64,
    pub crop_label: String,
    pub boundary: Vec<BoundaryCoordinate>,
    /// Applied right after construction when not `Normal`.
    #[serde(default)]
    pub status: ParcelStatus,
}

/// Full replacement of a parcel. `property_id` must match the stored one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateParcelRequest {
    pub id: ParcelId,
    pub property_id: PropertyId,
    pub code: String,
    pub name: String,
    pub area_hectares: f64,
    pub crop_label: String,
    pub boundary: Vec<BoundaryCoordinate>,
    pub status: ParcelStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryPointResponse {
    pub sequence: u32,
    pub latitude: f64,
    pub longitude: f64,
}

impl BoundaryPointResponse {
    pub fn from_entity(point: &BoundaryPoint) -> Self {
        Self {
            sequence: point.sequence(),
            latitude: point.latitude(),
            longitude: point.longitude(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelResponse {
    pub id: ParcelId,
    pub property_id: PropertyId,
    pub code: String,
    pub name: String,
    pub area_hectares: f64,
    pub crop_label: String,
    pub status: ParcelStatus,
    pub status_updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Ordered by `sequence`, starting at 1.
    pub boundary: Vec<BoundaryPointResponse>,
}

impl ParcelResponse {
    pub fn from_entity(parcel: &Parcel) -> Self {
        Self {
            id: parcel.id(),
            property_id: parcel.property_id(),
            code: parcel.code().to_string(),
            name: parcel.name().to_string(),
            area_hectares: parcel.area_hectares(),
            crop_label: parcel.crop_label().to_string(),
            status: parcel.status(),
            status_updated_at: parcel.status_updated_at(),
            created_at: parcel.created_at(),
            boundary: parcel
                .boundary()
                .iter()
                .map(BoundaryPointResponse::from_entity)
                .collect(),
        }
    }
}
