mod lead;
mod waitlist;

pub use lead::{LeadCaptureOutcome, LeadService};
pub use waitlist::{WaitlistService, WaitlistStatusView};

use tracing::warn;

use super::lifecycle::TransitionError;
use super::repository::{EventPublisher, FunnelEvent, RepositoryError, UpdateError};

/// Error raised by the waitlist and lead services.
#[derive(Debug, thiserror::Error)]
pub enum FunnelServiceError {
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),
    #[error("{entity} {id} not found")]
    UnknownEntity { entity: &'static str, id: String },
    #[error(transparent)]
    Persistence(#[from] RepositoryError),
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{0} is already registered")]
    DuplicateEmail(String),
}

impl FunnelServiceError {
    pub(crate) fn unknown(entity: &'static str, id: impl ToString) -> Self {
        Self::UnknownEntity {
            entity,
            id: id.to_string(),
        }
    }

    /// Maps an `update` failure, treating a vanished record as an unknown entity.
    pub(crate) fn from_update(entity: &'static str, id: impl ToString, err: UpdateError) -> Self {
        match err {
            UpdateError::Rejected(err) => Self::InvalidTransition(err),
            UpdateError::Repository(RepositoryError::NotFound) => Self::unknown(entity, id),
            UpdateError::Repository(other) => Self::Persistence(other),
        }
    }
}

/// Publisher failures are logged and never surface to the caller.
pub(crate) fn publish_quietly<P: EventPublisher + ?Sized>(publisher: &P, event: FunnelEvent) {
    let kind = event.kind.clone();
    let entity_id = event.entity_id.clone();
    if let Err(err) = publisher.publish(event) {
        warn!(%kind, %entity_id, error = %err, "failed to publish funnel event");
    }
}

pub(crate) fn required(field: &str, value: &str) -> Result<String, FunnelServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(FunnelServiceError::Validation(format!("{field} is required")))
    } else {
        Ok(trimmed.to_string())
    }
}
