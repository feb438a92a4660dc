//! Parcel repository contract and SQLite implementation.
//!
//! # Invariants
//! - Owner scoping joins through `properties.owner_id`.
//! - A parcel row and its boundary rows are written in one savepoint; a
//!   boundary is always replaced wholesale.
//! - Code uniqueness compares `code_key` (case-folded code) per property.

use super::sqlite_support::{
    ensure_connection_ready, is_unique_violation, parse_uuid, timestamp_from_db, timestamp_to_db,
};
use super::{RepoError, RepoResult};
use crate::db::within_savepoint;
use crate::model::boundary::BoundaryPoint;
use crate::model::parcel::{code_key, Parcel, ParcelId, ParcelRecord, ParcelStatus};
use crate::model::property::PropertyId;
use crate::model::{now_utc, EntityKind, OwnerId};
use rusqlite::{params, Connection, Row};
use std::collections::HashMap;

const PARCEL_SELECT_SQL: &str = "SELECT
    pc.id AS id,
    pc.property_id AS property_id,
    pc.code AS code,
    pc.name AS name,
    pc.area_hectares AS area_hectares,
    pc.crop_label AS crop_label,
    pc.status AS status,
    pc.status_updated_at AS status_updated_at,
    pc.created_at AS created_at
FROM parcels pc
JOIN properties p ON p.id = pc.property_id";

/// Owner-scoped persistence contract for parcels and their boundaries.
pub trait ParcelRepository {
    fn get_by_id(&self, owner_id: OwnerId, id: ParcelId) -> RepoResult<Option<Parcel>>;
    /// Parcels of one property, ordered by `code_key, id`.
    fn get_by_property_id(
        &self,
        owner_id: OwnerId,
        property_id: PropertyId,
    ) -> RepoResult<Vec<Parcel>>;
    fn create(&self, parcel: &Parcel) -> RepoResult<Parcel>;
    /// Persists attributes and status, replacing the stored boundary.
    fn update(&self, parcel: &Parcel) -> RepoResult<Parcel>;
    /// Removes the parcel and, by cascade, its boundary points.
    fn delete(&self, owner_id: OwnerId, id: ParcelId) -> RepoResult<()>;
    fn exists(&self, owner_id: OwnerId, id: ParcelId) -> RepoResult<bool>;
    /// Case-insensitive code lookup within one property, optionally
    /// ignoring one parcel (the one being updated).
    fn code_exists_in_property(
        &self,
        owner_id: OwnerId,
        property_id: PropertyId,
        code: &str,
        exclude_parcel_id: Option<ParcelId>,
    ) -> RepoResult<bool>;
}

/// SQLite-backed parcel repository.
pub struct SqliteParcelRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteParcelRepository<'conn> {
    /// Creates a repository over a fully migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["properties", "parcels", "parcel_boundary_points"])?;
        Ok(Self { conn })
    }

    /// Reads back a parcel by ID alone; callers have already scoped it.
    fn load_required(&self, id: ParcelId) -> RepoResult<Parcel> {
        let mut stmt = self.conn.prepare(&format!(
            "{PARCEL_SELECT_SQL}
             WHERE pc.id = ?1;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Err(RepoError::NotFound {
                entity: EntityKind::Parcel,
                id,
            });
        };
        let record = read_parcel_row(row)?;
        attach_boundary(record, load_boundary(self.conn, id)?)
    }

    fn write_boundary(&self, parcel: &Parcel) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM parcel_boundary_points WHERE parcel_id = ?1;",
            [parcel.id().to_string()],
        )?;
        let mut stmt = self.conn.prepare(
            "INSERT INTO parcel_boundary_points (
                id,
                parcel_id,
                sequence,
                latitude,
                longitude
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
        )?;
        for point in parcel.boundary() {
            stmt.execute(params![
                point.id().to_string(),
                parcel.id().to_string(),
                point.sequence(),
                point.latitude(),
                point.longitude(),
            ])?;
        }
        Ok(())
    }

    fn map_code_conflict(&self, parcel: &Parcel, err: rusqlite::Error) -> RepoError {
        if is_unique_violation(&err, "code_key") {
            RepoError::DuplicateParcelCode {
                property_id: parcel.property_id(),
                code: parcel.code().to_string(),
            }
        } else {
            err.into()
        }
    }
}

impl ParcelRepository for SqliteParcelRepository<'_> {
    fn get_by_id(&self, owner_id: OwnerId, id: ParcelId) -> RepoResult<Option<Parcel>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PARCEL_SELECT_SQL}
             WHERE pc.id = ?1
               AND p.owner_id = ?2;"
        ))?;
        let mut rows = stmt.query(params![id.to_string(), owner_id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };
        let record = read_parcel_row(row)?;
        attach_boundary(record, load_boundary(self.conn, id)?).map(Some)
    }

    fn get_by_property_id(
        &self,
        owner_id: OwnerId,
        property_id: PropertyId,
    ) -> RepoResult<Vec<Parcel>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PARCEL_SELECT_SQL}
             WHERE pc.property_id = ?1
               AND p.owner_id = ?2
             ORDER BY pc.code_key ASC, pc.id ASC;"
        ))?;
        let mut rows = stmt.query(params![property_id.to_string(), owner_id.to_string()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(read_parcel_row(row)?);
        }

        let mut boundaries = load_property_boundaries(self.conn, property_id)?;
        records
            .into_iter()
            .map(|record| {
                let points = boundaries.remove(&record.id).unwrap_or_default();
                attach_boundary(record, points)
            })
            .collect()
    }

    fn create(&self, parcel: &Parcel) -> RepoResult<Parcel> {
        within_savepoint(self.conn, "parcel_create", || {
            self.conn
                .execute(
                    "INSERT INTO parcels (
                        id,
                        property_id,
                        code,
                        code_key,
                        name,
                        area_hectares,
                        crop_label,
                        status,
                        status_updated_at,
                        created_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
                    params![
                        parcel.id().to_string(),
                        parcel.property_id().to_string(),
                        parcel.code(),
                        parcel.code_key(),
                        parcel.name(),
                        parcel.area_hectares(),
                        parcel.crop_label(),
                        parcel.status().as_str(),
                        timestamp_to_db(parcel.status_updated_at()),
                        timestamp_to_db(parcel.created_at()),
                    ],
                )
                .map_err(|err| self.map_code_conflict(parcel, err))?;
            self.write_boundary(parcel)
        })?;
        self.load_required(parcel.id())
    }

    fn update(&self, parcel: &Parcel) -> RepoResult<Parcel> {
        within_savepoint(self.conn, "parcel_update", || {
            let changed = self
                .conn
                .execute(
                    "UPDATE parcels
                     SET
                        property_id = ?2,
                        code = ?3,
                        code_key = ?4,
                        name = ?5,
                        area_hectares = ?6,
                        crop_label = ?7,
                        status = ?8,
                        status_updated_at = ?9,
                        updated_at = ?10
                     WHERE id = ?1;",
                    params![
                        parcel.id().to_string(),
                        parcel.property_id().to_string(),
                        parcel.code(),
                        parcel.code_key(),
                        parcel.name(),
                        parcel.area_hectares(),
                        parcel.crop_label(),
                        parcel.status().as_str(),
                        timestamp_to_db(parcel.status_updated_at()),
                        timestamp_to_db(now_utc()),
                    ],
                )
                .map_err(|err| self.map_code_conflict(parcel, err))?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    entity: EntityKind::Parcel,
                    id: parcel.id(),
                });
            }
            self.write_boundary(parcel)
        })?;
        self.load_required(parcel.id())
    }

    fn delete(&self, owner_id: OwnerId, id: ParcelId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM parcels
             WHERE id = ?1
               AND property_id IN (SELECT id FROM properties WHERE owner_id = ?2);",
            params![id.to_string(), owner_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::Parcel,
                id,
            });
        }
        Ok(())
    }

    fn exists(&self, owner_id: OwnerId, id: ParcelId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM parcels pc
                JOIN properties p ON p.id = pc.property_id
                WHERE pc.id = ?1 AND p.owner_id = ?2
            );",
            params![id.to_string(), owner_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn code_exists_in_property(
        &self,
        owner_id: OwnerId,
        property_id: PropertyId,
        code: &str,
        exclude_parcel_id: Option<ParcelId>,
    ) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM parcels pc
                JOIN properties p ON p.id = pc.property_id
                WHERE pc.property_id = ?1
                  AND p.owner_id = ?2
                  AND pc.code_key = ?3
                  AND (?4 IS NULL OR pc.id <> ?4)
            );",
            params![
                property_id.to_string(),
                owner_id.to_string(),
                code_key(code),
                exclude_parcel_id.map(|id| id.to_string()),
            ],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn read_parcel_row(row: &Row<'_>) -> RepoResult<ParcelRecord> {
    let id: String = row.get("id")?;
    let property_id: String = row.get("property_id")?;
    let status: String = row.get("status")?;
    let status = ParcelStatus::parse(&status).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid parcel status `{status}` in parcels.status"))
    })?;

    Ok(ParcelRecord {
        id: parse_uuid(&id, "parcels.id")?,
        property_id: parse_uuid(&property_id, "parcels.property_id")?,
        code: row.get("code")?,
        name: row.get("name")?,
        area_hectares: row.get("area_hectares")?,
        crop_label: row.get("crop_label")?,
        status,
        status_updated_at: timestamp_from_db(
            row.get("status_updated_at")?,
            "parcels.status_updated_at",
        )?,
        created_at: timestamp_from_db(row.get("created_at")?, "parcels.created_at")?,
        boundary: Vec::new(),
    })
}

fn read_boundary_row(row: &Row<'_>) -> RepoResult<BoundaryPoint> {
    let id: String = row.get("id")?;
    let id = parse_uuid(&id, "parcel_boundary_points.id")?;
    BoundaryPoint::restore(
        id,
        row.get("sequence")?,
        row.get("latitude")?,
        row.get("longitude")?,
    )
    .map_err(|err| RepoError::InvalidData(format!("boundary point {id}: {err}")))
}

fn load_boundary(conn: &Connection, parcel_id: ParcelId) -> RepoResult<Vec<BoundaryPoint>> {
    let mut stmt = conn.prepare(
        "SELECT id, sequence, latitude, longitude
         FROM parcel_boundary_points
         WHERE parcel_id = ?1
         ORDER BY sequence ASC;",
    )?;
    let mut rows = stmt.query([parcel_id.to_string()])?;
    let mut points = Vec::new();
    while let Some(row) = rows.next()? {
        points.push(read_boundary_row(row)?);
    }
    Ok(points)
}

fn load_property_boundaries(
    conn: &Connection,
    property_id: PropertyId,
) -> RepoResult<HashMap<ParcelId, Vec<BoundaryPoint>>> {
    let mut stmt = conn.prepare(
        "SELECT bp.parcel_id AS parcel_id,
                bp.id AS id,
                bp.sequence AS sequence,
                bp.latitude AS latitude,
                bp.longitude AS longitude
         FROM parcel_boundary_points bp
         JOIN parcels pc ON pc.id = bp.parcel_id
         WHERE pc.property_id = ?1
         ORDER BY bp.parcel_id ASC, bp.sequence ASC;",
    )?;
    let mut rows = stmt.query([property_id.to_string()])?;
    let mut grouped: HashMap<ParcelId, Vec<BoundaryPoint>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let parcel_id: String = row.get("parcel_id")?;
        let parcel_id = parse_uuid(&parcel_id, "parcel_boundary_points.parcel_id")?;
        grouped
            .entry(parcel_id)
            .or_default()
            .push(read_boundary_row(row)?);
    }
    Ok(grouped)
}

fn attach_boundary(mut record: ParcelRecord, points: Vec<BoundaryPoint>) -> RepoResult<Parcel> {
    let id = record.id;
    record.boundary = points;
    Parcel::restore(record).map_err(|err| RepoError::InvalidData(format!("parcel {id}: {err}")))
}
