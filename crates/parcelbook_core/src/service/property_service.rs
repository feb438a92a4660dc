//! Property use-case service.
//!
//! # Invariants
//! - Reads return `None` for records the owner cannot see.
//! - Mutations of a missing or foreign property fail with `NotFound`.
//! - Delete removes the whole property subtree atomically.

use super::contracts::{CreatePropertyRequest, PropertyResponse, UpdatePropertyRequest};
use super::error::{ServiceError, ServiceResult};
use super::{ensure_not_cancelled, log_outcome};
use crate::model::property::{Property, PropertyId};
use crate::model::OwnerId;
use crate::repo::property_repo::PropertyRepository;
use crate::repo::unit_of_work::UnitOfWork;
use log::info;
use tokio_util::sync::CancellationToken;

pub struct PropertyService<P: PropertyRepository, U: UnitOfWork> {
    properties: P,
    uow: U,
}

impl<P: PropertyRepository, U: UnitOfWork> PropertyService<P, U> {
    pub fn new(properties: P, uow: U) -> Self {
        Self { properties, uow }
    }

    /// Creates an active property bound to `owner_id`.
    pub fn create(
        &self,
        owner_id: OwnerId,
        request: &CreatePropertyRequest,
        cancel: &CancellationToken,
    ) -> ServiceResult<PropertyResponse> {
        let result = (|| -> ServiceResult<PropertyResponse> {
            let property = Property::create(owner_id, &request.name, &request.city, &request.state)?;
            ensure_not_cancelled(cancel)?;
            let created = self.properties.create(&property)?;
            info!(
                "event=property_create module=service status=ok property_id={}",
                created.id()
            );
            Ok(PropertyResponse::from_entity(&created))
        })();
        log_outcome("property_create", result)
    }

    /// Lists the owner's active and inactive properties.
    pub fn list(
        &self,
        owner_id: OwnerId,
        cancel: &CancellationToken,
    ) -> ServiceResult<Vec<PropertyResponse>> {
        ensure_not_cancelled(cancel)?;
        let properties = self.properties.get_all(owner_id)?;
        Ok(properties.iter().map(PropertyResponse::from_entity).collect())
    }

    pub fn get_by_id(
        &self,
        owner_id: OwnerId,
        property_id: PropertyId,
        cancel: &CancellationToken,
    ) -> ServiceResult<Option<PropertyResponse>> {
        ensure_not_cancelled(cancel)?;
        let property = self.properties.get_by_id(owner_id, property_id)?;
        Ok(property.as_ref().map(PropertyResponse::from_entity))
    }

    /// Replaces name, city and state. ID, owner and active flag are kept.
    pub fn update(
        &self,
        owner_id: OwnerId,
        property_id: PropertyId,
        request: &UpdatePropertyRequest,
        cancel: &CancellationToken,
    ) -> ServiceResult<PropertyResponse> {
        let result = self.mutate(owner_id, property_id, cancel, |property| {
            property.update(&request.name, &request.city, &request.state)?;
            Ok(())
        });
        log_outcome("property_update", result)
    }

    /// Sets the active flag; already-active properties stay active.
    pub fn activate(
        &self,
        owner_id: OwnerId,
        property_id: PropertyId,
        cancel: &CancellationToken,
    ) -> ServiceResult<PropertyResponse> {
        let result = self.mutate(owner_id, property_id, cancel, |property| {
            property.activate();
            Ok(())
        });
        log_outcome("property_activate", result)
    }

    /// Clears the active flag, which blocks all writes to its parcels.
    pub fn deactivate(
        &self,
        owner_id: OwnerId,
        property_id: PropertyId,
        cancel: &CancellationToken,
    ) -> ServiceResult<PropertyResponse> {
        let result = self.mutate(owner_id, property_id, cancel, |property| {
            property.deactivate();
            Ok(())
        });
        log_outcome("property_deactivate", result)
    }

    /// Deletes the property together with its parcels and boundary points.
    pub fn delete(
        &self,
        owner_id: OwnerId,
        property_id: PropertyId,
        cancel: &CancellationToken,
    ) -> ServiceResult<()> {
        let result = self.uow.atomically(|| -> ServiceResult<()> {
            ensure_not_cancelled(cancel)?;
            if !self.properties.exists(owner_id, property_id)? {
                return Err(ServiceError::property_not_found(property_id));
            }
            ensure_not_cancelled(cancel)?;
            self.properties.delete(owner_id, property_id)?;
            info!(
                "event=property_delete module=service status=ok property_id={}",
                property_id
            );
            Ok(())
        });
        log_outcome("property_delete", result)
    }

    fn mutate<F>(
        &self,
        owner_id: OwnerId,
        property_id: PropertyId,
        cancel: &CancellationToken,
        change: F,
    ) -> ServiceResult<PropertyResponse>
    where
        F: FnOnce(&mut Property) -> ServiceResult<()>,
    {
        self.uow.atomically(|| -> ServiceResult<PropertyResponse> {
            ensure_not_cancelled(cancel)?;
            let mut property = self
                .properties
                .get_by_id(owner_id, property_id)?
                .ok_or_else(|| ServiceError::property_not_found(property_id))?;
            change(&mut property)?;
            ensure_not_cancelled(cancel)?;
            let updated = self.properties.update(&property)?;
            Ok(PropertyResponse::from_entity(&updated))
        })
    }
}
