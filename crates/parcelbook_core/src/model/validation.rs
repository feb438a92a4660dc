//! Field-level validation rules shared by property and parcel entities.
//!
//! # Invariants
//! - Text is trimmed before length checks; lengths count chars, not bytes.
//! - A failed rule never mutates the entity being validated.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;
use uuid::Uuid;

static STATE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{2}$").expect("valid state code regex"));

pub const PROPERTY_NAME_LEN: RangeInclusive<usize> = 2..=120;
pub const PROPERTY_CITY_LEN: RangeInclusive<usize> = 1..=120;
pub const PARCEL_CODE_LEN: RangeInclusive<usize> = 2..=50;
pub const PARCEL_NAME_LEN: RangeInclusive<usize> = 2..=120;
pub const CROP_LABEL_LEN: RangeInclusive<usize> = 2..=120;
pub const MIN_BOUNDARY_POINTS: usize = 3;
pub const LATITUDE_RANGE: RangeInclusive<f64> = -90.0..=90.0;
pub const LONGITUDE_RANGE: RangeInclusive<f64> = -180.0..=180.0;

/// Input that is structurally or semantically invalid.
///
/// Always caused by the caller; retrying without correction fails again.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text is empty after trim.
    Blank { field: &'static str },
    /// Trimmed text length is outside `min..=max`.
    Length {
        field: &'static str,
        min: usize,
        max: usize,
        actual: usize,
    },
    /// State code is not exactly two ASCII letters.
    InvalidStateCode(String),
    /// Area is zero, negative or not finite.
    NonPositiveArea(f64),
    /// Polygon has fewer than `MIN_BOUNDARY_POINTS` vertices.
    TooFewBoundaryPoints { actual: usize },
    /// Latitude outside [-90, 90]. `index` is the zero-based input position.
    LatitudeOutOfRange { index: usize, value: f64 },
    /// Longitude outside [-180, 180]. `index` is the zero-based input position.
    LongitudeOutOfRange { index: usize, value: f64 },
    /// Stored boundary sequences are not 1-based and contiguous.
    BoundarySequenceGap { expected: u32, actual: u32 },
    /// A required identifier is the nil UUID.
    MissingId { field: &'static str },
    /// Update request names a different property than the parcel's own.
    PropertyReassignment { current: Uuid, requested: Uuid },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank { field } => write!(f, "{field} is required"),
            Self::Length {
                field,
                min,
                max,
                actual,
            } => write!(
                f,
                "{field} must be between {min} and {max} characters, got {actual}"
            ),
            Self::InvalidStateCode(value) => {
                write!(f, "state must be exactly 2 letters, got `{value}`")
            }
            Self::NonPositiveArea(value) => {
                write!(f, "area must be greater than zero, got {value}")
            }
            Self::TooFewBoundaryPoints { actual } => write!(
                f,
                "boundary must have at least {MIN_BOUNDARY_POINTS} points, got {actual}"
            ),
            Self::LatitudeOutOfRange { index, value } => write!(
                f,
                "boundary point {index}: latitude {value} is outside [-90, 90]"
            ),
            Self::LongitudeOutOfRange { index, value } => write!(
                f,
                "boundary point {index}: longitude {value} is outside [-180, 180]"
            ),
            Self::BoundarySequenceGap { expected, actual } => write!(
                f,
                "boundary sequence gap: expected {expected}, found {actual}"
            ),
            Self::MissingId { field } => write!(f, "{field} is required"),
            Self::PropertyReassignment { current, requested } => write!(
                f,
                "cannot reassign property: parcel belongs to {current}, request names {requested}"
            ),
        }
    }
}

impl Error for ValidationError {}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trims `value` and checks its char length against `range`.
pub fn bounded_text(
    field: &'static str,
    value: &str,
    range: RangeInclusive<usize>,
) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank { field });
    }
    let actual = trimmed.chars().count();
    if !range.contains(&actual) {
        return Err(ValidationError::Length {
            field,
            min: *range.start(),
            max: *range.end(),
            actual,
        });
    }
    Ok(trimmed.to_string())
}

/// Trims and upper-cases a two-letter state/region code.
pub fn state_code(value: &str) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank { field: "state" });
    }
    if !STATE_CODE_RE.is_match(trimmed) {
        return Err(ValidationError::InvalidStateCode(trimmed.to_string()));
    }
    Ok(trimmed.to_ascii_uppercase())
}

pub fn positive_area(value: f64) -> ValidationResult<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ValidationError::NonPositiveArea(value))
    }
}

pub fn required_id(field: &'static str, id: Uuid) -> ValidationResult<Uuid> {
    if id.is_nil() {
        Err(ValidationError::MissingId { field })
    } else {
        Ok(id)
    }
}
