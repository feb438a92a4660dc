//! Parcel entity: a coded subdivision of a property with its own polygon.
//!
//! # Invariants
//! - `property_id` is never nil and only changes through property adoption.
//! - The boundary always holds at least three in-range points, sequenced
//!   from 1, and is replaced wholesale on update.
//! - Every `set_status` call moves `status_updated_at` strictly forward.
//! - Status is a free three-state value: any state may follow any other.

use super::boundary::{build_boundary, restore_boundary, BoundaryCoordinate, BoundaryPoint};
use super::now_utc;
use super::property::PropertyId;
use super::validation::{
    bounded_text, positive_area, required_id, ValidationResult, CROP_LABEL_LEN, PARCEL_CODE_LEN,
    PARCEL_NAME_LEN,
};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable parcel identifier.
pub type ParcelId = Uuid;

/// Operational state of a parcel, independent of the property's active flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    #[default]
    Normal,
    DroughtAlert,
    Inactive,
}

impl ParcelStatus {
    /// Stable storage/wire token.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::DroughtAlert => "drought_alert",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(Self::Normal),
            "drought_alert" => Some(Self::DroughtAlert),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// Constructor input for `Parcel::create`.
#[derive(Debug, Clone, Copy)]
pub struct NewParcel<'a> {
    pub property_id: PropertyId,
    pub code: &'a str,
    pub name: &'a str,
    pub area_hectares: f64,
    pub crop_label: &'a str,
    pub boundary: &'a [BoundaryCoordinate],
}

/// Full replacement input for `Parcel::update`.
#[derive(Debug, Clone, Copy)]
pub struct ParcelChanges<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub area_hectares: f64,
    pub crop_label: &'a str,
    pub boundary: &'a [BoundaryCoordinate],
}

/// Persisted parcel fields, used to rebuild an entity from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelRecord {
    pub id: ParcelId,
    pub property_id: PropertyId,
    pub code: String,
    pub name: String,
    pub area_hectares: f64,
    pub crop_label: String,
    pub status: ParcelStatus,
    pub status_updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub boundary: Vec<BoundaryPoint>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parcel {
    id: ParcelId,
    property_id: PropertyId,
    code: String,
    name: String,
    area_hectares: f64,
    crop_label: String,
    status: ParcelStatus,
    status_updated_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    boundary: Vec<BoundaryPoint>,
}

struct ParcelFields {
    code: String,
    name: String,
    area_hectares: f64,
    crop_label: String,
}

impl Parcel {
    /// Creates a `Normal` parcel; `status_updated_at` equals `created_at`.
    pub fn create(input: NewParcel<'_>) -> ValidationResult<Self> {
        let property_id = required_id("property_id", input.property_id)?;
        let fields = validate_fields(input.code, input.name, input.area_hectares, input.crop_label)?;
        let boundary = build_boundary(input.boundary)?;
        let created_at = now_utc();

        Ok(Self {
            id: Uuid::new_v4(),
            property_id,
            code: fields.code,
            name: fields.name,
            area_hectares: fields.area_hectares,
            crop_label: fields.crop_label,
            status: ParcelStatus::Normal,
            status_updated_at: created_at,
            created_at,
            boundary,
        })
    }

    /// Rebuilds a parcel from storage, re-running field and boundary checks.
    pub fn restore(record: ParcelRecord) -> ValidationResult<Self> {
        let id = required_id("parcel_id", record.id)?;
        let property_id = required_id("property_id", record.property_id)?;
        let fields = validate_fields(
            &record.code,
            &record.name,
            record.area_hectares,
            &record.crop_label,
        )?;
        let boundary = restore_boundary(record.boundary)?;

        Ok(Self {
            id,
            property_id,
            code: fields.code,
            name: fields.name,
            area_hectares: fields.area_hectares,
            crop_label: fields.crop_label,
            status: record.status,
            status_updated_at: record.status_updated_at,
            created_at: record.created_at,
            boundary,
        })
    }

    /// Replaces every attribute and the whole boundary, re-sequenced from 1.
    ///
    /// Nothing changes if any field fails. Status is left untouched.
    pub fn update(&mut self, changes: ParcelChanges<'_>) -> ValidationResult<()> {
        let fields = validate_fields(
            changes.code,
            changes.name,
            changes.area_hectares,
            changes.crop_label,
        )?;
        let boundary = build_boundary(changes.boundary)?;

        self.code = fields.code;
        self.name = fields.name;
        self.area_hectares = fields.area_hectares;
        self.crop_label = fields.crop_label;
        self.boundary = boundary;
        Ok(())
    }

    pub fn activate(&mut self) {
        self.set_status(ParcelStatus::Normal);
    }

    pub fn deactivate(&mut self) {
        self.set_status(ParcelStatus::Inactive);
    }

    /// Sets `status` and stamps `status_updated_at`, even when unchanged.
    pub fn set_status(&mut self, status: ParcelStatus) {
        let floor = self.status_updated_at + TimeDelta::microseconds(1);
        self.status = status;
        self.status_updated_at = now_utc().max(floor);
    }

    pub(crate) fn reassign_property(&mut self, property_id: PropertyId) {
        self.property_id = property_id;
    }

    pub fn id(&self) -> ParcelId {
        self.id
    }

    pub fn property_id(&self) -> PropertyId {
        self.property_id
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// Case-folded code used for per-property uniqueness.
    pub fn code_key(&self) -> String {
        code_key(&self.code)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn area_hectares(&self) -> f64 {
        self.area_hectares
    }

    pub fn crop_label(&self) -> &str {
        &self.crop_label
    }

    pub fn status(&self) -> ParcelStatus {
        self.status
    }

    pub fn status_updated_at(&self) -> DateTime<Utc> {
        self.status_updated_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn boundary(&self) -> &[BoundaryPoint] {
        &self.boundary
    }
}

/// Normalizes a parcel code for case-insensitive comparison.
///
/// Folds one char at a time (upper, then lower) so positional rules such as
/// the Greek final sigma never split two spellings of the same code.
pub fn code_key(code: &str) -> String {
    code.trim()
        .chars()
        .flat_map(char::to_uppercase)
        .flat_map(char::to_lowercase)
        .collect()
}

fn validate_fields(
    code: &str,
    name: &str,
    area_hectares: f64,
    crop_label: &str,
) -> ValidationResult<ParcelFields> {
    Ok(ParcelFields {
        code: bounded_text("code", code, PARCEL_CODE_LEN)?,
        name: bounded_text("name", name, PARCEL_NAME_LEN)?,
        area_hectares: positive_area(area_hectares)?,
        crop_label: bounded_text("crop_label", crop_label, CROP_LABEL_LEN)?,
    })
}
