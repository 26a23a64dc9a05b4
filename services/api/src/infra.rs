use metrics_exporter_prometheus::PrometheusHandle;
use signup_funnel::workflows::funnel::{
    EntityFilter, EventPublisher, FunnelEvent, Lead, LeadService, Lifecycle, Mutation,
    PublishError, Repository, RepositoryError, ScoreCalculator, UpdateError, WaitlistEntry,
    WaitlistService,
};
use std::collections::BTreeMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type WaitlistFacade =
    WaitlistService<InMemoryRepository<WaitlistEntry>, LoggingEventPublisher>;
pub(crate) type LeadFacade = LeadService<InMemoryRepository<Lead>, LoggingEventPublisher>;

/// Process-local store keyed by entity id. Every write, including the e-mail uniqueness
/// check, happens under one lock. A poisoned lock surfaces as `Unavailable`.
pub(crate) struct InMemoryRepository<E: Lifecycle> {
    records: Arc<Mutex<BTreeMap<E::Id, E>>>,
}

impl<E: Lifecycle> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl<E: Lifecycle> Clone for InMemoryRepository<E> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
        }
    }
}

impl<E: Lifecycle> InMemoryRepository<E> {
    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<E::Id, E>>, RepositoryError> {
        self.records
            .lock()
            .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
    }
}

impl<E: Lifecycle> Repository<E> for InMemoryRepository<E> {
    fn insert(&self, entity: E) -> Result<E, RepositoryError> {
        let mut guard = self.lock()?;
        let taken = guard.contains_key(entity.id())
            || guard
                .values()
                .any(|stored| stored.email().eq_ignore_ascii_case(entity.email()));
        if taken {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(entity.id().clone(), entity.clone());
        Ok(entity)
    }

    fn persist(&self, entity: E) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        match guard.get_mut(entity.id()) {
            Some(slot) => {
                *slot = entity;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn update(&self, id: &E::Id, mutation: Mutation<'_, E>) -> Result<E, UpdateError> {
        let mut guard = self.lock()?;
        let slot = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        let updated = mutation(slot)?;
        *slot = updated.clone();
        Ok(updated)
    }

    fn fetch(&self, id: &E::Id) -> Result<Option<E>, RepositoryError> {
        Ok(self.lock()?.get(id).cloned())
    }

    fn fetch_all(&self, filter: &EntityFilter<E::Status>) -> Result<Vec<E>, RepositoryError> {
        Ok(self
            .lock()?
            .values()
            .filter(|entity| filter.matches(*entity))
            .cloned()
            .collect())
    }
}

/// Emits funnel events as structured log lines and keeps them for the demo summary.
#[derive(Default, Clone)]
pub(crate) struct LoggingEventPublisher {
    events: Arc<Mutex<Vec<FunnelEvent>>>,
}

impl EventPublisher for LoggingEventPublisher {
    fn publish(&self, event: FunnelEvent) -> Result<(), PublishError> {
        info!(
            kind = %event.kind,
            entity_id = %event.entity_id,
            details = ?event.details,
            "funnel event"
        );
        self.events
            .lock()
            .map_err(|_| PublishError::Transport("event log mutex poisoned".to_string()))?
            .push(event);
        Ok(())
    }
}

impl LoggingEventPublisher {
    pub(crate) fn events(&self) -> Vec<FunnelEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

/// Waitlist and lead services sharing one calculator and publisher.
pub(crate) fn build_services(
    calculator: ScoreCalculator,
    publisher: Arc<LoggingEventPublisher>,
) -> (Arc<WaitlistFacade>, Arc<LeadFacade>) {
    let calculator = Arc::new(calculator);
    let waitlist = WaitlistService::new(
        Arc::new(InMemoryRepository::default()),
        Arc::clone(&publisher),
        Arc::clone(&calculator),
    );
    let leads = LeadService::new(Arc::new(InMemoryRepository::default()), publisher, calculator);
    (Arc::new(waitlist), Arc::new(leads))
}
