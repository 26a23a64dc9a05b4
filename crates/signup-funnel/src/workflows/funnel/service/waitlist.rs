use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::super::bulk::{apply_bulk, BulkOperation, BulkOutcome};
use super::super::domain::{
    normalize_email, WaitlistApplication, WaitlistAttributePatch, WaitlistEntry,
    WaitlistEntryId, WaitlistStatus,
};
use super::super::lifecycle::{transition, LifecycleStatus};
use super::super::pipeline::{waitlist_stats, WaitlistStats};
use super::super::queue::{QueueRanker, QueueRanking};
use super::super::repository::{
    EntityFilter, EventPublisher, FunnelEvent, Mutation, Repository, RepositoryError, UpdateError,
};
use super::super::scoring::{ScoreCalculator, WaitlistScoreBreakdown};
use super::{publish_quietly, FunnelServiceError};

const ENTITY: &str = WaitlistStatus::ENTITY;

/// Public view returned by the status lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaitlistStatusView {
    pub email: String,
    pub status: WaitlistStatus,
    pub verified: bool,
    pub priority_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    pub created_at: DateTime<Utc>,
}

/// Service composing the waitlist store, scorer and queue ranker.
pub struct WaitlistService<R, P> {
    repository: Arc<R>,
    publisher: Arc<P>,
    calculator: Arc<ScoreCalculator>,
    ranker: QueueRanker,
    sequence: AtomicU64,
}

impl<R, P> WaitlistService<R, P>
where
    R: Repository<WaitlistEntry> + 'static,
    P: EventPublisher + 'static,
{
    pub fn new(repository: Arc<R>, publisher: Arc<P>, calculator: Arc<ScoreCalculator>) -> Self {
        Self {
            repository,
            publisher,
            calculator,
            ranker: QueueRanker::new(),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn calculator(&self) -> &ScoreCalculator {
        &self.calculator
    }

    fn next_id(&self) -> WaitlistEntryId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        WaitlistEntryId(format!("wl-{id:06}"))
    }

    /// Registers a new applicant in `pending`, scored and placed in the queue.
    pub fn join(
        &self,
        application: WaitlistApplication,
    ) -> Result<WaitlistEntry, FunnelServiceError> {
        let email = normalize_email(&application.email).ok_or_else(|| {
            FunnelServiceError::Validation("email must be a valid address".to_string())
        })?;

        let entry = WaitlistEntry {
            id: self.next_id(),
            email,
            name: non_empty(application.name),
            company: non_empty(application.company),
            role: non_empty(application.role),
            company_size: application.company_size,
            industry: application.industry,
            source: application.source,
            verified: false,
            notes: non_empty(application.notes),
            priority_score: 0,
            score_breakdown: WaitlistScoreBreakdown::default(),
            position: None,
            status: WaitlistStatus::Pending,
            created_at: Utc::now(),
            approved_at: None,
            invited_at: None,
            onboarded_at: None,
            declined_at: None,
            verified_at: None,
            verification_token: Some(Uuid::new_v4().to_string()),
            invite_code: None,
        };
        let entry = self.calculator.rescore_entry(&entry);

        let email = entry.email.clone();
        let stored = self.repository.insert(entry).map_err(|err| match err {
            RepositoryError::Conflict => {
                debug!(%email, "rejected duplicate waitlist signup");
                FunnelServiceError::DuplicateEmail(email)
            }
            other => FunnelServiceError::Persistence(other),
        })?;
        self.ranker.invalidate();
        info!(
            id = %stored.id,
            score = stored.priority_score,
            "waitlist entry created"
        );

        publish_quietly(
            self.publisher.as_ref(),
            FunnelEvent::new("waitlist_join", &stored.id)
                .detail("email", &stored.email)
                .detail("priority_score", stored.priority_score)
                .detail("source", stored.source.label()),
        );

        self.with_position(stored)
    }

    /// Confirms the e-mail address behind `token`. Re-verifying is a no-op.
    pub fn verify(&self, token: &str) -> Result<WaitlistEntry, FunnelServiceError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(FunnelServiceError::Validation(
                "verification token is required".to_string(),
            ));
        }

        let entry = self
            .repository
            .fetch_all(&EntityFilter::all())?
            .into_iter()
            .find(|entry| entry.verification_token.as_deref() == Some(token))
            .ok_or_else(|| FunnelServiceError::unknown("verification token", token))?;

        let mut newly_verified = false;
        let now = Utc::now();
        let entry = self.update(&entry.id.clone(), &mut |current: &WaitlistEntry| {
            let mut next = current.clone();
            newly_verified = !next.verified;
            next.verified = true;
            next.verified_at.get_or_insert(now);
            Ok(next)
        })?;

        if newly_verified {
            info!(id = %entry.id, "waitlist entry verified");
            publish_quietly(
                self.publisher.as_ref(),
                FunnelEvent::new("waitlist_verified", &entry.id).detail("email", &entry.email),
            );
        }

        self.with_position(entry)
    }

    pub fn get(&self, id: &WaitlistEntryId) -> Result<WaitlistEntry, FunnelServiceError> {
        let entry = self.fetch(id)?;
        self.with_position(entry)
    }

    pub fn status_by_email(&self, email: &str) -> Result<WaitlistStatusView, FunnelServiceError> {
        let email = normalize_email(email).ok_or_else(|| {
            FunnelServiceError::Validation("email must be a valid address".to_string())
        })?;
        let entry = self
            .repository
            .fetch_all(&EntityFilter::with_email(email.clone()))?
            .into_iter()
            .next()
            .ok_or_else(|| FunnelServiceError::unknown(ENTITY, &email))?;
        let entry = self.with_position(entry)?;

        Ok(WaitlistStatusView {
            email: entry.email,
            status: entry.status,
            verified: entry.verified,
            priority_score: entry.priority_score,
            position: entry.position,
            created_at: entry.created_at,
        })
    }

    /// Moves an entry along its lifecycle. The new snapshot is only kept once persisted.
    pub fn transition(
        &self,
        id: &WaitlistEntryId,
        target: WaitlistStatus,
    ) -> Result<WaitlistEntry, FunnelServiceError> {
        let now = Utc::now();
        let mut from = None;
        let updated = self.update(id, &mut |current: &WaitlistEntry| {
            from = Some(current.status);
            transition(current, target, now)
        })?;

        info!(
            id = %id,
            from = from.map(WaitlistStatus::label),
            to = target.label(),
            invite_code = ?updated.invite_code,
            "waitlist entry transitioned"
        );
        publish_quietly(self.publisher.as_ref(), transition_event(&updated));

        self.with_position(updated)
    }

    /// Applies a partial attribute update and re-scores when a scoring input changed.
    pub fn update_attributes(
        &self,
        id: &WaitlistEntryId,
        patch: WaitlistAttributePatch,
    ) -> Result<WaitlistEntry, FunnelServiceError> {
        let calculator = Arc::clone(&self.calculator);
        let mut rescored = false;
        let entry = self.update(id, &mut |current: &WaitlistEntry| {
            let mut next = current.clone();
            rescored = patch.clone().apply(&mut next);
            Ok(if rescored {
                calculator.rescore_entry(&next)
            } else {
                next
            })
        })?;

        debug!(
            id = %id,
            rescored,
            score = entry.priority_score,
            "waitlist entry updated"
        );
        self.with_position(entry)
    }

    pub fn refresh_score(&self, id: &WaitlistEntryId) -> Result<WaitlistEntry, FunnelServiceError> {
        let calculator = Arc::clone(&self.calculator);
        let updated = self.update(id, &mut |current: &WaitlistEntry| {
            Ok(calculator.rescore_entry(current))
        })?;
        self.with_position(updated)
    }

    /// Entries matching `filter`, oldest first, with queue positions filled in.
    pub fn list(
        &self,
        filter: &EntityFilter<WaitlistStatus>,
    ) -> Result<Vec<WaitlistEntry>, FunnelServiceError> {
        let ranking = self.queue()?;
        let mut entries = ranking.annotate(&self.repository.fetch_all(filter)?);
        entries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(entries)
    }

    pub fn queue(&self) -> Result<Arc<QueueRanking>, FunnelServiceError> {
        let pending = self
            .repository
            .fetch_all(&EntityFilter::with_status(WaitlistStatus::Pending))?;
        Ok(self.ranker.rank(&pending))
    }

    pub fn bulk(
        &self,
        ids: Vec<String>,
        operation: BulkOperation<WaitlistStatus>,
    ) -> BulkOutcome {
        let ids: Vec<WaitlistEntryId> = ids.into_iter().map(WaitlistEntryId).collect();
        let now = Utc::now();
        let calculator = Arc::clone(&self.calculator);

        let report = apply_bulk(self.repository.as_ref(), &ids, |entry: &WaitlistEntry| {
            match operation {
                BulkOperation::Transition(target) => transition(entry, target, now),
                BulkOperation::RefreshScore => Ok(calculator.rescore_entry(entry)),
            }
        });

        if !report.applied.is_empty() {
            self.ranker.invalidate();
        }
        if let BulkOperation::Transition(_) = operation {
            for entry in &report.applied {
                publish_quietly(self.publisher.as_ref(), transition_event(entry));
            }
        }

        let outcome = report.outcome;
        if outcome.is_complete() {
            info!(
                operation = %operation.label(),
                succeeded = outcome.succeeded,
                total = outcome.total,
                "waitlist bulk operation applied"
            );
        } else {
            warn!(
                operation = %operation.label(),
                succeeded = outcome.succeeded,
                total = outcome.total,
                failed = ?outcome.failed_ids(),
                "waitlist bulk operation partially applied"
            );
        }
        outcome
    }

    pub fn stats(&self) -> Result<WaitlistStats, FunnelServiceError> {
        let entries = self.repository.fetch_all(&EntityFilter::all())?;
        Ok(waitlist_stats(&entries))
    }

    fn fetch(&self, id: &WaitlistEntryId) -> Result<WaitlistEntry, FunnelServiceError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| FunnelServiceError::unknown(ENTITY, id))
    }

    fn update(
        &self,
        id: &WaitlistEntryId,
        mutation: Mutation<'_, WaitlistEntry>,
    ) -> Result<WaitlistEntry, FunnelServiceError> {
        let updated = self.repository.update(id, mutation).map_err(|err| {
            match &err {
                UpdateError::Rejected(reason) => {
                    debug!(id = %id, error = %reason, "waitlist update rejected")
                }
                UpdateError::Repository(reason) => {
                    warn!(id = %id, error = %reason, "failed to update waitlist entry")
                }
            }
            FunnelServiceError::from_update(ENTITY, id, err)
        })?;
        self.ranker.invalidate();
        Ok(updated)
    }

    fn with_position(&self, mut entry: WaitlistEntry) -> Result<WaitlistEntry, FunnelServiceError> {
        entry.position = match entry.status {
            WaitlistStatus::Pending => self.queue()?.position_of(&entry.id),
            _ => None,
        };
        Ok(entry)
    }
}

fn transition_event(entry: &WaitlistEntry) -> FunnelEvent {
    let event = FunnelEvent::new(format!("waitlist_{}", entry.status.label()), &entry.id)
        .detail("email", &entry.email)
        .detail("priority_score", entry.priority_score);
    match (&entry.invite_code, entry.status) {
        (Some(code), WaitlistStatus::Invited) => event.detail("invite_code", code),
        _ => event,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}
