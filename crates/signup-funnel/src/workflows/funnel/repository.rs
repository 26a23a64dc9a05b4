use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{CompanySize, Industry};
use super::lifecycle::{Lifecycle, TransitionError};

/// Read-modify-write step handed to [`Repository::update`].
pub type Mutation<'a, E> = &'a mut dyn FnMut(&E) -> Result<E, TransitionError>;

/// Storage collaborator. The funnel core never caches entities between calls; every
/// operation starts from `fetch`/`fetch_all` and ends with `insert` or `update`.
pub trait Repository<E: Lifecycle>: Send + Sync {
    /// Stores a brand new entity. An id or e-mail (case-insensitive) that is already
    /// stored is rejected with `Conflict` under the same lock as the write.
    fn insert(&self, entity: E) -> Result<E, RepositoryError>;
    /// Replaces the stored snapshot of an existing entity.
    fn persist(&self, entity: E) -> Result<(), RepositoryError>;
    /// Runs `mutation` against the current snapshot and stores its result as one atomic
    /// step, so concurrent writers never overwrite each other. Nothing is written when
    /// the mutation is rejected.
    fn update(&self, id: &E::Id, mutation: Mutation<'_, E>) -> Result<E, UpdateError>;
    fn fetch(&self, id: &E::Id) -> Result<Option<E>, RepositoryError>;
    fn fetch_all(&self, filter: &EntityFilter<E::Status>) -> Result<Vec<E>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Failure of [`Repository::update`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    #[error(transparent)]
    Rejected(#[from] TransitionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Working-set selector for [`Repository::fetch_all`]. Doubles as the admin list query;
/// `date_from` and `date_to` bound the creation date inclusively.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EntityFilter<S> {
    pub status: Option<S>,
    pub email: Option<String>,
    pub industry: Option<Industry>,
    pub company_size: Option<CompanySize>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl<S> Default for EntityFilter<S> {
    fn default() -> Self {
        Self {
            status: None,
            email: None,
            industry: None,
            company_size: None,
            date_from: None,
            date_to: None,
        }
    }
}

impl<S: Copy + PartialEq> EntityFilter<S> {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_status(status: S) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_email(email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn matches<E>(&self, entity: &E) -> bool
    where
        E: Lifecycle<Status = S>,
    {
        let created = entity.created_at().date_naive();
        self.status.map_or(true, |status| entity.status() == status)
            && self
                .email
                .as_deref()
                .map_or(true, |email| entity.email().eq_ignore_ascii_case(email))
            && self
                .industry
                .as_ref()
                .map_or(true, |industry| entity.industry() == industry)
            && self
                .company_size
                .as_ref()
                .map_or(true, |size| entity.company_size() == size)
            && self.date_from.map_or(true, |from| created >= from)
            && self.date_to.map_or(true, |to| created <= to)
    }
}

/// Outbound hook for funnel activity (CRM sync, e-mail automation, analytics).
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: FunnelEvent) -> Result<(), PublishError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunnelEvent {
    pub kind: String,
    pub entity_id: String,
    pub details: BTreeMap<String, String>,
}

impl FunnelEvent {
    pub fn new(kind: impl Into<String>, entity_id: impl ToString) -> Self {
        Self {
            kind: kind.into(),
            entity_id: entity_id.to_string(),
            details: BTreeMap::new(),
        }
    }

    pub fn detail(mut self, key: &str, value: impl ToString) -> Self {
        self.details.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("event transport unavailable: {0}")]
    Transport(String),
}
