//! Owner-scoped use-case services.
//!
//! # Responsibility
//! - Validate input, enforce cross-entity rules and persist via repositories.
//! - Expose plain request/response shapes; entities never cross this layer.
//!
//! # Invariants
//! - Every operation takes the caller's owner ID and a cancellation token.
//! - Mutations run their whole check-then-act sequence in one unit of work.
//! - Errors propagate to the caller; nothing is swallowed after logging.

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

pub mod contracts;
pub mod error;
pub mod parcel_service;
pub mod property_service;

use error::{ServiceError, ServiceResult};

/// Stops before the next store call once cancellation is observed.
pub(crate) fn ensure_not_cancelled(cancel: &CancellationToken) -> ServiceResult<()> {
    if cancel.is_cancelled() {
        return Err(ServiceError::Cancelled);
    }
    Ok(())
}

/// Emits one metadata-only event for a finished operation.
pub(crate) fn log_outcome<T>(event: &'static str, result: ServiceResult<T>) -> ServiceResult<T> {
    match &result {
        Ok(_) => debug!("event={} module=service status=ok", event),
        Err(err) => warn!(
            "event={} module=service status=error error_code={}",
            event,
            err.kind().as_str()
        ),
    }
    result
}
