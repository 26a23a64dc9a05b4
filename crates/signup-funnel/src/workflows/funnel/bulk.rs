use serde::{Deserialize, Serialize};
use tracing::debug;

use super::lifecycle::{Lifecycle, LifecycleStatus, TransitionError};
use super::repository::{Repository, RepositoryError, UpdateError};

/// Change applied to every id of a bulk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "target", rename_all = "snake_case")]
pub enum BulkOperation<S> {
    Transition(S),
    RefreshScore,
}

impl<S: LifecycleStatus> BulkOperation<S> {
    pub fn label(&self) -> String {
        match self {
            Self::Transition(target) => format!("transition:{}", target.label()),
            Self::RefreshScore => "refresh_score".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkRequest<S> {
    pub ids: Vec<String>,
    pub operation: BulkOperation<S>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BulkFailureReason {
    InvalidTransition,
    UnknownEntity,
    PersistenceFailure,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkFailure {
    pub id: String,
    pub reason: BulkFailureReason,
    pub detail: String,
}

/// Aggregate result of a bulk request. Successful items are never rolled back.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub succeeded: usize,
    pub total: usize,
    pub failures: Vec<BulkFailure>,
}

impl BulkOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|failure| failure.id.as_str()).collect()
    }
}

/// Outcome plus the snapshots that were persisted, in request order.
#[derive(Debug, Clone)]
pub struct BulkReport<E> {
    pub outcome: BulkOutcome,
    pub applied: Vec<E>,
}

/// Updates each id on its own through [`Repository::update`]. A failure for one id is
/// recorded and the loop moves on; duplicate ids are processed once per occurrence.
pub fn apply_bulk<E, R, F>(repository: &R, ids: &[E::Id], mut apply: F) -> BulkReport<E>
where
    E: Lifecycle,
    R: Repository<E> + ?Sized,
    F: FnMut(&E) -> Result<E, TransitionError>,
{
    let mut outcome = BulkOutcome {
        total: ids.len(),
        ..BulkOutcome::default()
    };
    let mut applied = Vec::new();

    for id in ids {
        match apply_one(repository, id, &mut apply) {
            Ok(updated) => {
                outcome.succeeded += 1;
                applied.push(updated);
            }
            Err(failure) => {
                debug!(
                    entity = <E::Status as LifecycleStatus>::ENTITY,
                    id = %failure.id,
                    reason = ?failure.reason,
                    "bulk item rejected"
                );
                outcome.failures.push(failure);
            }
        }
    }

    BulkReport { outcome, applied }
}

fn apply_one<E, R, F>(repository: &R, id: &E::Id, apply: &mut F) -> Result<E, BulkFailure>
where
    E: Lifecycle,
    R: Repository<E> + ?Sized,
    F: FnMut(&E) -> Result<E, TransitionError>,
{
    repository.update(id, apply).map_err(|err| {
        let reason = match &err {
            UpdateError::Rejected(_) => BulkFailureReason::InvalidTransition,
            UpdateError::Repository(RepositoryError::NotFound) => BulkFailureReason::UnknownEntity,
            UpdateError::Repository(_) => BulkFailureReason::PersistenceFailure,
        };
        BulkFailure {
            id: id.to_string(),
            reason,
            detail: err.to_string(),
        }
    })
}
