use parcelbook_core::db::open_db_in_memory;
use parcelbook_core::{
    BoundaryCoordinate, ConflictReason, CreateParcelRequest, CreatePropertyRequest, EntityKind,
    ErrorKind, ParcelResponse, ParcelService, ParcelStatus, PropertyResponse, PropertyService,
    ServiceError, SqliteParcelRepository, SqlitePropertyRepository, SqliteUnitOfWork,
    UpdateParcelRequest, ValidationError,
};
use rusqlite::Connection;
use std::thread;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

type Properties<'conn> = PropertyService<SqlitePropertyRepository<'conn>, SqliteUnitOfWork<'conn>>;
type Parcels<'conn> = ParcelService<
    SqliteParcelRepository<'conn>,
    SqlitePropertyRepository<'conn>,
    SqliteUnitOfWork<'conn>,
>;

struct Fixture<'conn> {
    properties: Properties<'conn>,
    parcels: Parcels<'conn>,
    owner: Uuid,
    cancel: CancellationToken,
}

impl<'conn> Fixture<'conn> {
    fn new(conn: &'conn Connection) -> Self {
        Self {
            properties: PropertyService::new(
                SqlitePropertyRepository::try_new(conn).unwrap(),
                SqliteUnitOfWork::new(conn),
            ),
            parcels: ParcelService::new(
                SqliteParcelRepository::try_new(conn).unwrap(),
                SqlitePropertyRepository::try_new(conn).unwrap(),
                SqliteUnitOfWork::new(conn),
            ),
            owner: Uuid::new_v4(),
            cancel: CancellationToken::new(),
        }
    }

    fn property(&self, name: &str) -> PropertyResponse {
        self.properties
            .create(
                self.owner,
                &CreatePropertyRequest {
                    name: name.to_string(),
                    city: "Springfield".to_string(),
                    state: "IL".to_string(),
                },
                &self.cancel,
            )
            .unwrap()
    }

    fn parcel(&self, property_id: Uuid, code: &str) -> ParcelResponse {
        self.parcels
            .create(self.owner, &create_request(property_id, code), &self.cancel)
            .unwrap()
    }
}

fn triangle() -> Vec<BoundaryCoordinate> {
    vec![
        BoundaryCoordinate::new(39.78, -89.65),
        BoundaryCoordinate::new(39.79, -89.65),
        BoundaryCoordinate::new(39.79, -89.64),
    ]
}

fn create_request(property_id: Uuid, code: &str) -> CreateParcelRequest {
    CreateParcelRequest {
        property_id,
        code: code.to_string(),
        name: "North field".to_string(),
        area_hectares: 10.5,
        crop_label: "Soy".to_string(),
        boundary: triangle(),
        status: ParcelStatus::Normal,
    }
}

fn update_request(parcel: &ParcelResponse) -> UpdateParcelRequest {
    UpdateParcelRequest {
        id: parcel.id,
        property_id: parcel.property_id,
        code: parcel.code.clone(),
        name: parcel.name.clone(),
        area_hectares: parcel.area_hectares,
        crop_label: parcel.crop_label.clone(),
        boundary: parcel
            .boundary
            .iter()
            .map(|point| BoundaryCoordinate::new(point.latitude, point.longitude))
            .collect(),
        status: parcel.status,
    }
}

fn assert_property_inactive(result: Result<impl std::fmt::Debug, ServiceError>, property_id: Uuid) {
    match result {
        Err(ServiceError::Conflict(ConflictReason::PropertyInactive(id))) => {
            assert_eq!(id, property_id)
        }
        other => panic!("expected inactive-property conflict, got {other:?}"),
    }
}

#[test]
fn create_persists_parcel_with_normal_status_and_sequenced_boundary() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");

    let created = fx.parcel(property.id, "P01");

    assert_eq!(created.property_id, property.id);
    assert_eq!(created.status, ParcelStatus::Normal);
    assert_eq!(created.status_updated_at, created.created_at);
    let sequences: Vec<u32> = created.boundary.iter().map(|p| p.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3]);

    let loaded = fx
        .parcels
        .get_by_id(fx.owner, created.id, &fx.cancel)
        .unwrap();
    assert_eq!(loaded, Some(created));
}

#[test]
fn create_applies_requested_status_after_construction() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");

    let request = CreateParcelRequest {
        status: ParcelStatus::DroughtAlert,
        ..create_request(property.id, "P01")
    };
    let created = fx.parcels.create(fx.owner, &request, &fx.cancel).unwrap();

    assert_eq!(created.status, ParcelStatus::DroughtAlert);
    assert!(created.status_updated_at > created.created_at);
}

#[test]
fn create_under_unknown_property_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let missing = Uuid::new_v4();

    let err = fx
        .parcels
        .create(fx.owner, &create_request(missing, "P01"), &fx.cancel)
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::NotFound {
            entity: EntityKind::Property,
            id
        } if id == missing
    ));
}

#[test]
fn duplicate_code_in_same_property_conflicts_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");
    fx.parcel(property.id, "P01");

    let err = fx
        .parcels
        .create(fx.owner, &create_request(property.id, " p01 "), &fx.cancel)
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains("duplicate code"));
    assert!(matches!(
        err,
        ServiceError::Conflict(ConflictReason::DuplicateParcelCode { property_id, .. })
            if property_id == property.id
    ));
}

#[test]
fn greek_codes_conflict_regardless_of_final_sigma() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");
    fx.parcel(property.id, "ΑΣ");

    let err = fx
        .parcels
        .create(fx.owner, &create_request(property.id, "ασ"), &fx.cancel)
        .unwrap_err();

    assert!(matches!(
        err,
        ServiceError::Conflict(ConflictReason::DuplicateParcelCode { property_id, .. })
            if property_id == property.id
    ));
    assert_eq!(
        fx.parcels
            .list_by_property(fx.owner, property.id, &fx.cancel)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn same_code_under_different_properties_is_allowed() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let first = fx.property("Green Farm");
    let second = fx.property("Blue Ranch");

    let a = fx.parcel(first.id, "P01");
    let b = fx.parcel(second.id, "P01");

    assert_ne!(a.id, b.id);
    assert_eq!(a.code, b.code);
}

#[test]
fn invalid_parcel_fields_are_validation_errors() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");

    let mut short = create_request(property.id, "P01");
    short.boundary.truncate(2);
    assert!(matches!(
        fx.parcels.create(fx.owner, &short, &fx.cancel),
        Err(ServiceError::Validation(
            ValidationError::TooFewBoundaryPoints { actual: 2 }
        ))
    ));

    let mut off_map = create_request(property.id, "P01");
    off_map.boundary[1].longitude = 181.0;
    assert!(matches!(
        fx.parcels.create(fx.owner, &off_map, &fx.cancel),
        Err(ServiceError::Validation(
            ValidationError::LongitudeOutOfRange { index: 1, .. }
        ))
    ));

    let zero_area = CreateParcelRequest {
        area_hectares: 0.0,
        ..create_request(property.id, "P01")
    };
    let err = fx
        .parcels
        .create(fx.owner, &zero_area, &fx.cancel)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert!(fx
        .parcels
        .list_by_property(fx.owner, property.id, &fx.cancel)
        .unwrap()
        .is_empty());
}

#[test]
fn list_by_property_orders_by_code_and_includes_every_status() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");
    let other = fx.property("Blue Ranch");

    let b = fx.parcel(property.id, "B-02");
    let a = fx.parcel(property.id, "a-01");
    fx.parcel(other.id, "A-00");
    fx.parcels.deactivate(fx.owner, b.id, &fx.cancel).unwrap();

    let listed = fx
        .parcels
        .list_by_property(fx.owner, property.id, &fx.cancel)
        .unwrap();

    let ids: Vec<Uuid> = listed.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![a.id, b.id]);
    assert_eq!(listed[1].status, ParcelStatus::Inactive);
    assert!(listed.iter().all(|p| p.boundary.len() == 3));
}

#[test]
fn list_by_unknown_property_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);

    let err = fx
        .parcels
        .list_by_property(fx.owner, Uuid::new_v4(), &fx.cancel)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn update_replaces_attributes_boundary_and_status() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");
    let created = fx.parcel(property.id, "P01");

    let mut request = update_request(&created);
    request.code = "P01-B".to_string();
    request.name = "North field east".to_string();
    request.area_hectares = 3.75;
    request.crop_label = "Wheat".to_string();
    request.status = ParcelStatus::DroughtAlert;
    request.boundary = vec![
        BoundaryCoordinate::new(1.0, 1.0),
        BoundaryCoordinate::new(1.0, 2.0),
        BoundaryCoordinate::new(2.0, 2.0),
        BoundaryCoordinate::new(2.0, 1.0),
        BoundaryCoordinate::new(1.5, 0.5),
    ];

    let updated = fx.parcels.update(fx.owner, &request, &fx.cancel).unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_at, created.created_at);
    assert_eq!(updated.code, "P01-B");
    assert_eq!(updated.area_hectares, 3.75);
    assert_eq!(updated.crop_label, "Wheat");
    assert_eq!(updated.status, ParcelStatus::DroughtAlert);
    assert!(updated.status_updated_at > created.status_updated_at);
    let sequences: Vec<u32> = updated.boundary.iter().map(|p| p.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4, 5]);
    assert_eq!(updated.boundary[4].latitude, 1.5);

    let stored: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM parcel_boundary_points WHERE parcel_id = ?1;",
            [created.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(stored, 5);
}

#[test]
fn update_may_keep_its_own_code_in_another_case() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");
    let created = fx.parcel(property.id, "P01");

    let mut request = update_request(&created);
    request.code = "p01".to_string();

    let updated = fx.parcels.update(fx.owner, &request, &fx.cancel).unwrap();
    assert_eq!(updated.code, "p01");
}

#[test]
fn update_to_a_sibling_code_conflicts() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");
    fx.parcel(property.id, "P01");
    let second = fx.parcel(property.id, "P02");

    let mut request = update_request(&second);
    request.code = "P01".to_string();

    let err = fx
        .parcels
        .update(fx.owner, &request, &fx.cancel)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Conflict(ConflictReason::DuplicateParcelCode { .. })
    ));
}

#[test]
fn update_cannot_reassign_parcel_to_another_property() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let home = fx.property("Green Farm");
    let elsewhere = fx.property("Blue Ranch");
    let created = fx.parcel(home.id, "P01");

    let mut request = update_request(&created);
    request.property_id = elsewhere.id;

    let err = fx
        .parcels
        .update(fx.owner, &request, &fx.cancel)
        .unwrap_err();

    assert!(err.to_string().contains("cannot reassign property"), "{err}");
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::PropertyReassignment { current, requested })
            if current == home.id && requested == elsewhere.id
    ));
    let stored = fx
        .parcels
        .get_by_id(fx.owner, created.id, &fx.cancel)
        .unwrap()
        .unwrap();
    assert_eq!(stored.property_id, home.id);
}

#[test]
fn invalid_update_keeps_stored_boundary() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");
    let created = fx.parcel(property.id, "P01");

    let mut request = update_request(&created);
    request.boundary[0].latitude = -91.0;

    let err = fx
        .parcels
        .update(fx.owner, &request, &fx.cancel)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::LatitudeOutOfRange { index: 0, .. })
    ));

    let stored = fx
        .parcels
        .get_by_id(fx.owner, created.id, &fx.cancel)
        .unwrap()
        .unwrap();
    assert_eq!(stored, created);
}

#[test]
fn writes_under_inactive_property_conflict_but_reads_succeed() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");
    let parcel = fx.parcel(property.id, "P01");
    fx.properties
        .deactivate(fx.owner, property.id, &fx.cancel)
        .unwrap();

    assert_property_inactive(
        fx.parcels
            .create(fx.owner, &create_request(property.id, "P02"), &fx.cancel),
        property.id,
    );
    assert_property_inactive(
        fx.parcels
            .update(fx.owner, &update_request(&parcel), &fx.cancel),
        property.id,
    );
    assert_property_inactive(
        fx.parcels.activate(fx.owner, parcel.id, &fx.cancel),
        property.id,
    );
    assert_property_inactive(
        fx.parcels.deactivate(fx.owner, parcel.id, &fx.cancel),
        property.id,
    );
    assert_property_inactive(
        fx.parcels.delete(fx.owner, parcel.id, &fx.cancel),
        property.id,
    );

    let listed = fx
        .parcels
        .list_by_property(fx.owner, property.id, &fx.cancel)
        .unwrap();
    assert_eq!(listed, vec![parcel.clone()]);
    assert_eq!(
        fx.parcels
            .get_by_id(fx.owner, parcel.id, &fx.cancel)
            .unwrap(),
        Some(parcel)
    );
}

#[test]
fn activate_on_normal_parcel_refreshes_status_stamp() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");
    let created = fx.parcel(property.id, "P01");

    thread::sleep(Duration::from_millis(5));
    let activated = fx
        .parcels
        .activate(fx.owner, created.id, &fx.cancel)
        .unwrap();

    assert_eq!(activated.status, ParcelStatus::Normal);
    assert!(activated.status_updated_at > created.status_updated_at);

    let again = fx
        .parcels
        .activate(fx.owner, created.id, &fx.cancel)
        .unwrap();
    assert!(again.status_updated_at > activated.status_updated_at);
}

#[test]
fn deactivate_then_activate_round_trips_status() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");
    let created = fx.parcel(property.id, "P01");

    let inactive = fx
        .parcels
        .deactivate(fx.owner, created.id, &fx.cancel)
        .unwrap();
    assert_eq!(inactive.status, ParcelStatus::Inactive);

    let normal = fx
        .parcels
        .activate(fx.owner, created.id, &fx.cancel)
        .unwrap();
    assert_eq!(normal.status, ParcelStatus::Normal);
    assert!(normal.status_updated_at > inactive.status_updated_at);
}

#[test]
fn delete_removes_parcel_and_its_boundary_points() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");
    let doomed = fx.parcel(property.id, "P01");
    let kept = fx.parcel(property.id, "P02");

    fx.parcels.delete(fx.owner, doomed.id, &fx.cancel).unwrap();

    assert_eq!(
        fx.parcels
            .get_by_id(fx.owner, doomed.id, &fx.cancel)
            .unwrap(),
        None
    );
    let orphaned: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM parcel_boundary_points WHERE parcel_id = ?1;",
            [doomed.id.to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(orphaned, 0);
    assert!(fx
        .parcels
        .get_by_id(fx.owner, kept.id, &fx.cancel)
        .unwrap()
        .is_some());

    let err = fx
        .parcels
        .delete(fx.owner, doomed.id, &fx.cancel)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound {
            entity: EntityKind::Parcel,
            ..
        }
    ));
}

#[test]
fn inactive_property_example_scenario() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);

    let property = fx.property("Green Farm");
    assert!(property.is_active);
    assert_eq!(property.city, "Springfield");
    assert_eq!(property.state, "IL");

    let parcel = fx.parcel(property.id, "P01");
    assert_eq!(parcel.status, ParcelStatus::Normal);
    assert_eq!(parcel.area_hectares, 10.5);

    fx.properties
        .deactivate(fx.owner, property.id, &fx.cancel)
        .unwrap();
    let err = fx
        .parcels
        .activate(fx.owner, parcel.id, &fx.cancel)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(err.to_string().contains("inactive"), "{err}");

    fx.properties
        .activate(fx.owner, property.id, &fx.cancel)
        .unwrap();
    let activated = fx
        .parcels
        .activate(fx.owner, parcel.id, &fx.cancel)
        .unwrap();
    assert_eq!(activated.status, ParcelStatus::Normal);
}

#[test]
fn cancelled_token_aborts_without_writing() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");
    let parcel = fx.parcel(property.id, "P01");

    let cancelled = CancellationToken::new();
    cancelled.cancel();

    assert!(matches!(
        fx.parcels
            .create(fx.owner, &create_request(property.id, "P02"), &cancelled),
        Err(ServiceError::Cancelled)
    ));
    assert!(matches!(
        fx.parcels.deactivate(fx.owner, parcel.id, &cancelled),
        Err(ServiceError::Cancelled)
    ));
    assert!(matches!(
        fx.parcels.delete(fx.owner, parcel.id, &cancelled),
        Err(ServiceError::Cancelled)
    ));

    let listed = fx
        .parcels
        .list_by_property(fx.owner, property.id, &fx.cancel)
        .unwrap();
    assert_eq!(listed, vec![parcel]);
}

#[test]
fn parcel_response_serializes_status_and_ordered_boundary() {
    let conn = open_db_in_memory().unwrap();
    let fx = Fixture::new(&conn);
    let property = fx.property("Green Farm");
    let request = CreateParcelRequest {
        status: ParcelStatus::DroughtAlert,
        ..create_request(property.id, "P01")
    };
    let created = fx.parcels.create(fx.owner, &request, &fx.cancel).unwrap();

    let value = serde_json::to_value(&created).unwrap();
    assert_eq!(value["status"], "drought_alert");
    assert_eq!(value["code"], "P01");
    assert_eq!(value["boundary"].as_array().unwrap().len(), 3);
    assert_eq!(value["boundary"][0]["sequence"], 1);
    assert_eq!(value["boundary"][2]["latitude"], 39.79);

    let decoded: CreateParcelRequest = serde_json::from_value(serde_json::json!({
        "property_id": property.id,
        "code": "P02",
        "name": "South field",
        "area_hectares": 2.0,
        "crop_label": "Corn",
        "boundary": [
            { "latitude": 1.0, "longitude": 1.0 },
            { "latitude": 1.0, "longitude": 2.0 },
            { "latitude": 2.0, "longitude": 2.0 }
        ]
    }))
    .unwrap();
    assert_eq!(decoded.status, ParcelStatus::Normal);
}
