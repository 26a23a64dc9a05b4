use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::funnel::domain::{
    CompanySize, Industry, Lead, LeadCapture, LeadId, LeadSource, LeadStatus,
    WaitlistApplication, WaitlistEntry, WaitlistEntryId, WaitlistSource, WaitlistStatus,
};
use crate::workflows::funnel::lifecycle::Lifecycle;
use crate::workflows::funnel::repository::{
    EntityFilter, EventPublisher, FunnelEvent, Mutation, PublishError, Repository,
    RepositoryError, UpdateError,
};
use crate::workflows::funnel::scoring::{
    LeadScoreBreakdown, ScoreCalculator, WaitlistScoreBreakdown,
};
use crate::workflows::funnel::service::{LeadService, WaitlistService};

pub(super) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn minutes_after_base(minutes: i64) -> DateTime<Utc> {
    base_time() + Duration::minutes(minutes)
}

pub(super) fn application(email: &str) -> WaitlistApplication {
    WaitlistApplication {
        email: email.to_string(),
        name: Some("Dana Reyes".to_string()),
        company: Some("Northwind Analytics".to_string()),
        role: Some("CEO".to_string()),
        company_size: CompanySize::Medium,
        industry: Industry::Technology,
        source: WaitlistSource::Referral,
        notes: None,
    }
}

pub(super) fn weak_application(email: &str) -> WaitlistApplication {
    WaitlistApplication {
        email: email.to_string(),
        name: Some("Sam Ortiz".to_string()),
        company: None,
        role: Some("Student".to_string()),
        company_size: CompanySize::Micro,
        industry: Industry::Retail,
        source: WaitlistSource::Website,
        notes: None,
    }
}

/// Bare snapshot for the pure rules; scores are set directly.
pub(super) fn entry(id: &str, status: WaitlistStatus, score: u8, minutes: i64) -> WaitlistEntry {
    WaitlistEntry {
        id: WaitlistEntryId::from(id),
        email: format!("{id}@example.com"),
        name: None,
        company: None,
        role: None,
        company_size: CompanySize::default(),
        industry: Industry::default(),
        source: WaitlistSource::Website,
        verified: false,
        notes: None,
        priority_score: score,
        score_breakdown: WaitlistScoreBreakdown::default(),
        position: None,
        status,
        created_at: minutes_after_base(minutes),
        approved_at: None,
        invited_at: None,
        onboarded_at: None,
        declined_at: None,
        verified_at: None,
        verification_token: None,
        invite_code: None,
    }
}

pub(super) fn lead(id: &str, status: LeadStatus) -> Lead {
    Lead {
        id: LeadId::from(id),
        name: "Avery Chen".to_string(),
        email: format!("{id}@example.com"),
        phone: None,
        company: None,
        job_title: None,
        location: None,
        industry: Industry::default(),
        company_size: CompanySize::default(),
        source: LeadSource::Website,
        assigned_to: None,
        assigned_at: None,
        lead_score: 0,
        score_breakdown: LeadScoreBreakdown::default(),
        status,
        timeline: Vec::new(),
        notes: Vec::new(),
        events: Vec::new(),
        created_at: base_time(),
        last_contacted_at: None,
        converted_at: None,
    }
}

pub(super) fn lead_with_score(id: &str, status: LeadStatus, score: u8) -> Lead {
    let mut lead = lead(id, status);
    lead.lead_score = score;
    lead
}

pub(super) fn capture(email: &str) -> LeadCapture {
    LeadCapture {
        name: "Jordan Patel".to_string(),
        email: email.to_string(),
        phone: Some("+1 515 555 0100".to_string()),
        company: Some("Hawkeye Logistics".to_string()),
        job_title: Some("VP Operations".to_string()),
        location: Some("Des Moines, IA".to_string()),
        industry: Some(Industry::Finance),
        company_size: Some(CompanySize::Large),
        source: Some(LeadSource::Referral),
    }
}

/// In-memory store keyed by entity id.
pub(super) struct MemoryRepository<E: Lifecycle> {
    pub(super) records: Arc<Mutex<BTreeMap<E::Id, E>>>,
}

impl<E: Lifecycle> Default for MemoryRepository<E> {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl<E: Lifecycle> MemoryRepository<E> {
    pub(super) fn seeded(entities: Vec<E>) -> Self {
        let repository = Self::default();
        {
            let mut guard = repository.records.lock().expect("repository mutex poisoned");
            for entity in entities {
                guard.insert(entity.id().clone(), entity);
            }
        }
        repository
    }

    pub(super) fn stored(&self, id: &E::Id) -> Option<E> {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(id)
            .cloned()
    }
}

impl<E: Lifecycle> Repository<E> for MemoryRepository<E> {
    fn insert(&self, entity: E) -> Result<E, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
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
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        match guard.get_mut(entity.id()) {
            Some(slot) => {
                *slot = entity;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn update(&self, id: &E::Id, mutation: Mutation<'_, E>) -> Result<E, UpdateError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let slot = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        let updated = mutation(slot)?;
        *slot = updated.clone();
        Ok(updated)
    }

    fn fetch(&self, id: &E::Id) -> Result<Option<E>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn fetch_all(&self, filter: &EntityFilter<E::Status>) -> Result<Vec<E>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard
            .values()
            .filter(|entity| filter.matches(*entity))
            .cloned()
            .collect())
    }
}

/// Reads succeed; writes to the listed ids fail after the mutation has run.
pub(super) struct FlakyRepository<E: Lifecycle> {
    pub(super) inner: MemoryRepository<E>,
    pub(super) failing: Vec<E::Id>,
}

impl<E: Lifecycle> Repository<E> for FlakyRepository<E> {
    fn insert(&self, entity: E) -> Result<E, RepositoryError> {
        self.inner.insert(entity)
    }

    fn persist(&self, entity: E) -> Result<(), RepositoryError> {
        if self.failing.contains(entity.id()) {
            return Err(RepositoryError::Unavailable("write timeout".to_string()));
        }
        self.inner.persist(entity)
    }

    fn update(&self, id: &E::Id, mutation: Mutation<'_, E>) -> Result<E, UpdateError> {
        if !self.failing.contains(id) {
            return self.inner.update(id, mutation);
        }
        let current = self.inner.fetch(id)?.ok_or(RepositoryError::NotFound)?;
        mutation(&current)?;
        Err(RepositoryError::Unavailable("write timeout".to_string()).into())
    }

    fn fetch(&self, id: &E::Id) -> Result<Option<E>, RepositoryError> {
        self.inner.fetch(id)
    }

    fn fetch_all(&self, filter: &EntityFilter<E::Status>) -> Result<Vec<E>, RepositoryError> {
        self.inner.fetch_all(filter)
    }
}

pub(super) struct UnavailableRepository;

impl<E: Lifecycle> Repository<E> for UnavailableRepository {
    fn insert(&self, _entity: E) -> Result<E, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn persist(&self, _entity: E) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _id: &E::Id, _mutation: Mutation<'_, E>) -> Result<E, UpdateError> {
        Err(RepositoryError::Unavailable("database offline".to_string()).into())
    }

    fn fetch(&self, _id: &E::Id) -> Result<Option<E>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_all(&self, _filter: &EntityFilter<E::Status>) -> Result<Vec<E>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryPublisher {
    events: Arc<Mutex<Vec<FunnelEvent>>>,
}

impl MemoryPublisher {
    pub(super) fn events(&self) -> Vec<FunnelEvent> {
        self.events.lock().expect("publisher mutex poisoned").clone()
    }

    pub(super) fn kinds(&self) -> Vec<String> {
        self.events().into_iter().map(|event| event.kind).collect()
    }
}

impl EventPublisher for MemoryPublisher {
    fn publish(&self, event: FunnelEvent) -> Result<(), PublishError> {
        self.events
            .lock()
            .expect("publisher mutex poisoned")
            .push(event);
        Ok(())
    }
}

pub(super) struct OfflinePublisher;

impl EventPublisher for OfflinePublisher {
    fn publish(&self, _event: FunnelEvent) -> Result<(), PublishError> {
        Err(PublishError::Transport("webhook unreachable".to_string()))
    }
}

pub(super) type TestWaitlistService =
    WaitlistService<MemoryRepository<WaitlistEntry>, MemoryPublisher>;
pub(super) type TestLeadService = LeadService<MemoryRepository<Lead>, MemoryPublisher>;

pub(super) fn build_waitlist_service() -> (
    TestWaitlistService,
    Arc<MemoryRepository<WaitlistEntry>>,
    Arc<MemoryPublisher>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let publisher = Arc::new(MemoryPublisher::default());
    let service = WaitlistService::new(
        repository.clone(),
        publisher.clone(),
        Arc::new(ScoreCalculator::default()),
    );
    (service, repository, publisher)
}

pub(super) fn build_lead_service() -> (
    TestLeadService,
    Arc<MemoryRepository<Lead>>,
    Arc<MemoryPublisher>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let publisher = Arc::new(MemoryPublisher::default());
    let service = LeadService::new(
        repository.clone(),
        publisher.clone(),
        Arc::new(ScoreCalculator::default()),
    );
    (service, repository, publisher)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
