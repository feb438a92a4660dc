//! Property repository contract and SQLite implementation.
//!
//! # Invariants
//! - Every statement filters on `owner_id`.
//! - `delete` removes the property row; foreign keys cascade to parcels and
//!   their boundary points in the same statement.

use super::sqlite_support::{
    bool_to_int, ensure_connection_ready, int_to_bool, parse_uuid, timestamp_from_db,
    timestamp_to_db,
};
use super::{RepoError, RepoResult};
use crate::model::property::{Property, PropertyId, PropertyRecord};
use crate::model::{now_utc, EntityKind, OwnerId};
use rusqlite::{params, Connection, OptionalExtension, Row};

const PROPERTY_SELECT_SQL: &str = "SELECT
    id,
    owner_id,
    name,
    city,
    state,
    is_active,
    created_at
FROM properties";

/// Owner-scoped persistence contract for properties.
pub trait PropertyRepository {
    fn get_by_id(&self, owner_id: OwnerId, id: PropertyId) -> RepoResult<Option<Property>>;
    /// Active and inactive properties, ordered by `created_at, id`.
    fn get_all(&self, owner_id: OwnerId) -> RepoResult<Vec<Property>>;
    fn create(&self, property: &Property) -> RepoResult<Property>;
    fn update(&self, property: &Property) -> RepoResult<Property>;
    /// Removes the property and, by cascade, its parcels and boundary points.
    fn delete(&self, owner_id: OwnerId, id: PropertyId) -> RepoResult<()>;
    fn exists(&self, owner_id: OwnerId, id: PropertyId) -> RepoResult<bool>;
}

/// SQLite-backed property repository.
pub struct SqlitePropertyRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePropertyRepository<'conn> {
    /// Creates a repository over a fully migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, &["properties"])?;
        Ok(Self { conn })
    }

    fn load_required(&self, owner_id: OwnerId, id: PropertyId) -> RepoResult<Property> {
        self.get_by_id(owner_id, id)?.ok_or(RepoError::NotFound {
            entity: EntityKind::Property,
            id,
        })
    }
}

impl PropertyRepository for SqlitePropertyRepository<'_> {
    fn get_by_id(&self, owner_id: OwnerId, id: PropertyId) -> RepoResult<Option<Property>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROPERTY_SELECT_SQL}
             WHERE id = ?1
               AND owner_id = ?2;"
        ))?;
        let record = stmt
            .query_row(params![id.to_string(), owner_id.to_string()], |row| {
                Ok(read_property_row(row))
            })
            .optional()?;

        record.transpose()?.map(restore_property).transpose()
    }

    fn get_all(&self, owner_id: OwnerId) -> RepoResult<Vec<Property>> {
        let mut stmt = self.conn.prepare(&format!(
            "{PROPERTY_SELECT_SQL}
             WHERE owner_id = ?1
             ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([owner_id.to_string()])?;
        let mut properties = Vec::new();
        while let Some(row) = rows.next()? {
            properties.push(restore_property(read_property_row(row)?)?);
        }
        Ok(properties)
    }

    fn create(&self, property: &Property) -> RepoResult<Property> {
        self.conn.execute(
            "INSERT INTO properties (
                id,
                owner_id,
                name,
                city,
                state,
                is_active,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                property.id().to_string(),
                property.owner_id().to_string(),
                property.name(),
                property.city(),
                property.state(),
                bool_to_int(property.is_active()),
                timestamp_to_db(property.created_at()),
            ],
        )?;
        self.load_required(property.owner_id(), property.id())
    }

    fn update(&self, property: &Property) -> RepoResult<Property> {
        let changed = self.conn.execute(
            "UPDATE properties
             SET
                name = ?3,
                city = ?4,
                state = ?5,
                is_active = ?6,
                updated_at = ?7
             WHERE id = ?1
               AND owner_id = ?2;",
            params![
                property.id().to_string(),
                property.owner_id().to_string(),
                property.name(),
                property.city(),
                property.state(),
                bool_to_int(property.is_active()),
                timestamp_to_db(now_utc()),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::Property,
                id: property.id(),
            });
        }
        self.load_required(property.owner_id(), property.id())
    }

    fn delete(&self, owner_id: OwnerId, id: PropertyId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM properties
             WHERE id = ?1
               AND owner_id = ?2;",
            params![id.to_string(), owner_id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound {
                entity: EntityKind::Property,
                id,
            });
        }
        Ok(())
    }

    fn exists(&self, owner_id: OwnerId, id: PropertyId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM properties WHERE id = ?1 AND owner_id = ?2
            );",
            params![id.to_string(), owner_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }
}

fn read_property_row(row: &Row<'_>) -> RepoResult<PropertyRecord> {
    let id: String = row.get("id")?;
    let owner_id: String = row.get("owner_id")?;
    Ok(PropertyRecord {
        id: parse_uuid(&id, "properties.id")?,
        owner_id: parse_uuid(&owner_id, "properties.owner_id")?,
        name: row.get("name")?,
        city: row.get("city")?,
        state: row.get("state")?,
        is_active: int_to_bool(row.get("is_active")?, "properties.is_active")?,
        created_at: timestamp_from_db(row.get("created_at")?, "properties.created_at")?,
    })
}

fn restore_property(record: PropertyRecord) -> RepoResult<Property> {
    let id = record.id;
    Property::restore(record)
        .map_err(|err| RepoError::InvalidData(format!("property {id}: {err}")))
}
