//! Property aggregate root.
//!
//! # Invariants
//! - `id`, `owner_id` and `created_at` never change after creation.
//! - `name`, `city` and `state` are always trimmed; `state` is upper-cased.
//! - `is_active` gates parcel writes but does not touch parcels itself.

use super::boundary::BoundaryCoordinate;
use super::now_utc;
use super::parcel::{NewParcel, Parcel};
use super::validation::{
    bounded_text, required_id, state_code, ValidationResult, PROPERTY_CITY_LEN, PROPERTY_NAME_LEN,
};
use super::OwnerId;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Stable property identifier.
pub type PropertyId = Uuid;

/// Owned top-level landholding record.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    id: PropertyId,
    owner_id: OwnerId,
    name: String,
    city: String,
    state: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

/// Persisted property fields, used to rebuild an entity from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRecord {
    pub id: PropertyId,
    pub owner_id: OwnerId,
    pub name: String,
    pub city: String,
    pub state: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

struct PropertyFields {
    name: String,
    city: String,
    state: String,
}

impl Property {
    /// Creates an active property owned by `owner_id`.
    pub fn create(owner_id: OwnerId, name: &str, city: &str, state: &str) -> ValidationResult<Self> {
        let owner_id = required_id("owner_id", owner_id)?;
        let fields = validate_fields(name, city, state)?;
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            name: fields.name,
            city: fields.city,
            state: fields.state,
            is_active: true,
            created_at: now_utc(),
        })
    }

    /// Rebuilds a property from storage, re-running field validation.
    pub fn restore(record: PropertyRecord) -> ValidationResult<Self> {
        let id = required_id("property_id", record.id)?;
        let owner_id = required_id("owner_id", record.owner_id)?;
        let fields = validate_fields(&record.name, &record.city, &record.state)?;
        Ok(Self {
            id,
            owner_id,
            name: fields.name,
            city: fields.city,
            state: fields.state,
            is_active: record.is_active,
            created_at: record.created_at,
        })
    }

    /// Replaces name, city and state. Nothing changes if any field fails.
    pub fn update(&mut self, name: &str, city: &str, state: &str) -> ValidationResult<()> {
        let fields = validate_fields(name, city, state)?;
        self.name = fields.name;
        self.city = fields.city;
        self.state = fields.state;
        Ok(())
    }

    pub fn activate(&mut self) {
        self.is_active = true;
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }

    /// Builds a new parcel bound to this property.
    ///
    /// Code uniqueness is not checked here; it needs the stored siblings.
    pub fn new_parcel(
        &self,
        code: &str,
        name: &str,
        area_hectares: f64,
        crop_label: &str,
        boundary: &[BoundaryCoordinate],
    ) -> ValidationResult<Parcel> {
        Parcel::create(NewParcel {
            property_id: self.id,
            code,
            name,
            area_hectares,
            crop_label,
            boundary,
        })
    }

    /// Re-binds a pre-built parcel to this property.
    ///
    /// A property holds no parcel list. Membership lives in the parcel
    /// store, where each parcel id exists once, so adopting an already bound
    /// parcel leaves it unchanged and storing it a second time fails.
    pub fn adopt_parcel(&self, parcel: &mut Parcel) {
        if parcel.property_id() != self.id {
            parcel.reassign_property(self.id);
        }
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn owner_id(&self) -> OwnerId {
        self.owner_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

fn validate_fields(name: &str, city: &str, state: &str) -> ValidationResult<PropertyFields> {
    Ok(PropertyFields {
        name: bounded_text("name", name, PROPERTY_NAME_LEN)?,
        city: bounded_text("city", city, PROPERTY_CITY_LEN)?,
        state: state_code(state)?,
    })
}
