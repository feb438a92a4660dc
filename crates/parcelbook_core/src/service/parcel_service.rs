//! Parcel use-case service.
//!
//! # Invariants
//! - Every parcel write passes `ensure_property_allows_parcel_writes`: the
//!   owning property must exist for the owner and be active.
//! - Reads never consult the property's active flag.
//! - Codes are unique per property, case-insensitively.
//! - Update never moves a parcel to another property.

use super::contracts::{CreateParcelRequest, ParcelResponse, UpdateParcelRequest};
use super::error::{ConflictReason, ServiceError, ServiceResult};
use super::{ensure_not_cancelled, log_outcome};
use crate::model::parcel::{Parcel, ParcelChanges, ParcelId, ParcelStatus};
use crate::model::property::{Property, PropertyId};
use crate::model::validation::ValidationError;
use crate::model::OwnerId;
use crate::repo::parcel_repo::ParcelRepository;
use crate::repo::property_repo::PropertyRepository;
use crate::repo::unit_of_work::UnitOfWork;
use log::info;
use tokio_util::sync::CancellationToken;

pub struct ParcelService<R, P, U>
where
    R: ParcelRepository,
    P: PropertyRepository,
    U: UnitOfWork,
{
    parcels: R,
    properties: P,
    uow: U,
}

impl<R, P, U> ParcelService<R, P, U>
where
    R: ParcelRepository,
    P: PropertyRepository,
    U: UnitOfWork,
{
    pub fn new(parcels: R, properties: P, uow: U) -> Self {
        Self {
            parcels,
            properties,
            uow,
        }
    }

    /// Creates a parcel under an active property owned by `owner_id`.
    ///
    /// Checks run in order: property exists, property active, code free,
    /// fields valid.
    pub fn create(
        &self,
        owner_id: OwnerId,
        request: &CreateParcelRequest,
        cancel: &CancellationToken,
    ) -> ServiceResult<ParcelResponse> {
        let result = self.uow.atomically(|| -> ServiceResult<ParcelResponse> {
            let property = ensure_property_allows_parcel_writes(
                &self.properties,
                owner_id,
                request.property_id,
                cancel,
            )?;
            self.ensure_code_available(owner_id, property.id(), &request.code, None, cancel)?;

            let mut parcel = property.new_parcel(
                &request.code,
                &request.name,
                request.area_hectares,
                &request.crop_label,
                &request.boundary,
            )?;
            if request.status != ParcelStatus::Normal {
                parcel.set_status(request.status);
            }

            ensure_not_cancelled(cancel)?;
            let created = self.parcels.create(&parcel)?;
            info!(
                "event=parcel_create module=service status=ok property_id={} parcel_id={}",
                created.property_id(),
                created.id()
            );
            Ok(ParcelResponse::from_entity(&created))
        });
        log_outcome("parcel_create", result)
    }

    /// Lists all parcels of a property, active or not.
    pub fn list_by_property(
        &self,
        owner_id: OwnerId,
        property_id: PropertyId,
        cancel: &CancellationToken,
    ) -> ServiceResult<Vec<ParcelResponse>> {
        ensure_not_cancelled(cancel)?;
        if !self.properties.exists(owner_id, property_id)? {
            return Err(ServiceError::property_not_found(property_id));
        }
        ensure_not_cancelled(cancel)?;
        let parcels = self.parcels.get_by_property_id(owner_id, property_id)?;
        Ok(parcels.iter().map(ParcelResponse::from_entity).collect())
    }

    pub fn get_by_id(
        &self,
        owner_id: OwnerId,
        parcel_id: ParcelId,
        cancel: &CancellationToken,
    ) -> ServiceResult<Option<ParcelResponse>> {
        ensure_not_cancelled(cancel)?;
        let parcel = self.parcels.get_by_id(owner_id, parcel_id)?;
        Ok(parcel.as_ref().map(ParcelResponse::from_entity))
    }

    /// Replaces every parcel attribute, the boundary and the status.
    pub fn update(
        &self,
        owner_id: OwnerId,
        request: &UpdateParcelRequest,
        cancel: &CancellationToken,
    ) -> ServiceResult<ParcelResponse> {
        let result = self.uow.atomically(|| -> ServiceResult<ParcelResponse> {
            let mut parcel = self.load_parcel(owner_id, request.id, cancel)?;
            if parcel.property_id() != request.property_id {
                return Err(ValidationError::PropertyReassignment {
                    current: parcel.property_id(),
                    requested: request.property_id,
                }
                .into());
            }
            ensure_property_allows_parcel_writes(
                &self.properties,
                owner_id,
                parcel.property_id(),
                cancel,
            )?;
            self.ensure_code_available(
                owner_id,
                parcel.property_id(),
                &request.code,
                Some(parcel.id()),
                cancel,
            )?;

            parcel.update(ParcelChanges {
                code: &request.code,
                name: &request.name,
                area_hectares: request.area_hectares,
                crop_label: &request.crop_label,
                boundary: &request.boundary,
            })?;
            parcel.set_status(request.status);

            ensure_not_cancelled(cancel)?;
            let updated = self.parcels.update(&parcel)?;
            Ok(ParcelResponse::from_entity(&updated))
        });
        log_outcome("parcel_update", result)
    }

    /// Sets status `Normal`, stamping `status_updated_at` even if unchanged.
    pub fn activate(
        &self,
        owner_id: OwnerId,
        parcel_id: ParcelId,
        cancel: &CancellationToken,
    ) -> ServiceResult<ParcelResponse> {
        let result = self.change_status(owner_id, parcel_id, cancel, Parcel::activate);
        log_outcome("parcel_activate", result)
    }

    /// Sets status `Inactive`.
    pub fn deactivate(
        &self,
        owner_id: OwnerId,
        parcel_id: ParcelId,
        cancel: &CancellationToken,
    ) -> ServiceResult<ParcelResponse> {
        let result = self.change_status(owner_id, parcel_id, cancel, Parcel::deactivate);
        log_outcome("parcel_deactivate", result)
    }

    /// Physically removes the parcel and its boundary points.
    pub fn delete(
        &self,
        owner_id: OwnerId,
        parcel_id: ParcelId,
        cancel: &CancellationToken,
    ) -> ServiceResult<()> {
        let result = self.uow.atomically(|| -> ServiceResult<()> {
            let parcel = self.load_parcel(owner_id, parcel_id, cancel)?;
            ensure_property_allows_parcel_writes(
                &self.properties,
                owner_id,
                parcel.property_id(),
                cancel,
            )?;
            ensure_not_cancelled(cancel)?;
            self.parcels.delete(owner_id, parcel_id)?;
            info!(
                "event=parcel_delete module=service status=ok property_id={} parcel_id={}",
                parcel.property_id(),
                parcel_id
            );
            Ok(())
        });
        log_outcome("parcel_delete", result)
    }

    fn change_status<F>(
        &self,
        owner_id: OwnerId,
        parcel_id: ParcelId,
        cancel: &CancellationToken,
        change: F,
    ) -> ServiceResult<ParcelResponse>
    where
        F: FnOnce(&mut Parcel),
    {
        self.uow.atomically(|| -> ServiceResult<ParcelResponse> {
            let mut parcel = self.load_parcel(owner_id, parcel_id, cancel)?;
            ensure_property_allows_parcel_writes(
                &self.properties,
                owner_id,
                parcel.property_id(),
                cancel,
            )?;
            change(&mut parcel);
            ensure_not_cancelled(cancel)?;
            let updated = self.parcels.update(&parcel)?;
            Ok(ParcelResponse::from_entity(&updated))
        })
    }

    fn load_parcel(
        &self,
        owner_id: OwnerId,
        parcel_id: ParcelId,
        cancel: &CancellationToken,
    ) -> ServiceResult<Parcel> {
        ensure_not_cancelled(cancel)?;
        self.parcels
            .get_by_id(owner_id, parcel_id)?
            .ok_or_else(|| ServiceError::parcel_not_found(parcel_id))
    }

    fn ensure_code_available(
        &self,
        owner_id: OwnerId,
        property_id: PropertyId,
        code: &str,
        exclude_parcel_id: Option<ParcelId>,
        cancel: &CancellationToken,
    ) -> ServiceResult<()> {
        ensure_not_cancelled(cancel)?;
        if self
            .parcels
            .code_exists_in_property(owner_id, property_id, code, exclude_parcel_id)?
        {
            return Err(ServiceError::Conflict(ConflictReason::DuplicateParcelCode {
                property_id,
                code: code.trim().to_string(),
            }));
        }
        Ok(())
    }
}

/// The single gate for parcel writes: the owning property must exist for
/// `owner_id` and be active. Returns the loaded property.
pub fn ensure_property_allows_parcel_writes<P: PropertyRepository>(
    properties: &P,
    owner_id: OwnerId,
    property_id: PropertyId,
    cancel: &CancellationToken,
) -> ServiceResult<Property> {
    ensure_not_cancelled(cancel)?;
    let property = properties
        .get_by_id(owner_id, property_id)?
        .ok_or_else(|| ServiceError::property_not_found(property_id))?;
    if !property.is_active() {
        return Err(ServiceError::Conflict(ConflictReason::PropertyInactive(
            property_id,
        )));
    }
    Ok(property)
}
