//! Parcel boundary polygon vertices.
//!
//! # Invariants
//! - A boundary has at least three points.
//! - Sequences are 1-based and contiguous in list order.
//! - Points are only created or destroyed by replacing a whole boundary.

use super::validation::{
    ValidationError, ValidationResult, LATITUDE_RANGE, LONGITUDE_RANGE, MIN_BOUNDARY_POINTS,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type BoundaryPointId = Uuid;

/// Caller-supplied latitude/longitude pair, in input order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl BoundaryCoordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One persisted polygon vertex.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPoint {
    id: BoundaryPointId,
    sequence: u32,
    latitude: f64,
    longitude: f64,
}

impl BoundaryPoint {
    /// Rebuilds a stored vertex. Sequence contiguity is checked by
    /// `restore_boundary`, not here.
    pub fn restore(
        id: BoundaryPointId,
        sequence: u32,
        latitude: f64,
        longitude: f64,
    ) -> ValidationResult<Self> {
        check_coordinate(sequence.saturating_sub(1) as usize, latitude, longitude)?;
        Ok(Self {
            id,
            sequence,
            latitude,
            longitude,
        })
    }

    pub fn id(&self) -> BoundaryPointId {
        self.id
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn coordinate(&self) -> BoundaryCoordinate {
        BoundaryCoordinate::new(self.latitude, self.longitude)
    }
}

/// Validates `coordinates` and assigns fresh IDs and sequences from 1.
pub fn build_boundary(coordinates: &[BoundaryCoordinate]) -> ValidationResult<Vec<BoundaryPoint>> {
    if coordinates.len() < MIN_BOUNDARY_POINTS {
        return Err(ValidationError::TooFewBoundaryPoints {
            actual: coordinates.len(),
        });
    }

    coordinates
        .iter()
        .enumerate()
        .map(|(index, coordinate)| {
            check_coordinate(index, coordinate.latitude, coordinate.longitude)?;
            Ok(BoundaryPoint {
                id: Uuid::new_v4(),
                sequence: sequence_for(index),
                latitude: coordinate.latitude,
                longitude: coordinate.longitude,
            })
        })
        .collect()
}

/// Checks a stored boundary: minimum size and contiguous 1-based sequences.
pub fn restore_boundary(mut points: Vec<BoundaryPoint>) -> ValidationResult<Vec<BoundaryPoint>> {
    if points.len() < MIN_BOUNDARY_POINTS {
        return Err(ValidationError::TooFewBoundaryPoints {
            actual: points.len(),
        });
    }
    points.sort_by_key(BoundaryPoint::sequence);
    for (index, point) in points.iter().enumerate() {
        if point.sequence != sequence_for(index) {
            return Err(ValidationError::BoundarySequenceGap {
                expected: sequence_for(index),
                actual: point.sequence,
            });
        }
    }
    Ok(points)
}

fn sequence_for(index: usize) -> u32 {
    u32::try_from(index + 1).unwrap_or(u32::MAX)
}

fn check_coordinate(index: usize, latitude: f64, longitude: f64) -> ValidationResult<()> {
    if !LATITUDE_RANGE.contains(&latitude) {
        return Err(ValidationError::LatitudeOutOfRange {
            index,
            value: latitude,
        });
    }
    if !LONGITUDE_RANGE.contains(&longitude) {
        return Err(ValidationError::LongitudeOutOfRange {
            index,
            value: longitude,
        });
    }
    Ok(())
}
