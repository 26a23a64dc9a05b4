use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::super::bulk::{apply_bulk, BulkOperation, BulkOutcome};
use super::super::domain::{
    normalize_email, serialize_lead_view, EngagementEvent, Lead, LeadCapture, LeadId, LeadNote, LeadStatus,
    TimelineEntry, TimelineKind,
};
use super::super::lifecycle::{transition, LifecycleStatus};
use super::super::pipeline::{lead_stats, LeadStats};
use super::super::repository::{
    EntityFilter, EventPublisher, FunnelEvent, Mutation, Repository, RepositoryError, UpdateError,
};
use super::super::scoring::{LeadScoreBreakdown, ScoreCalculator};
use super::{publish_quietly, required, FunnelServiceError};

const ENTITY: &str = LeadStatus::ENTITY;

/// Result of a capture: the stored lead and whether it was newly created.
#[derive(Debug, Clone, Serialize)]
pub struct LeadCaptureOutcome {
    #[serde(serialize_with = "serialize_lead_view")]
    pub lead: Lead,
    pub created: bool,
}

/// Service composing the lead store and scorer.
pub struct LeadService<R, P> {
    repository: Arc<R>,
    publisher: Arc<P>,
    calculator: Arc<ScoreCalculator>,
    sequence: AtomicU64,
}

impl<R, P> LeadService<R, P>
where
    R: Repository<Lead> + 'static,
    P: EventPublisher + 'static,
{
    pub fn new(repository: Arc<R>, publisher: Arc<P>, calculator: Arc<ScoreCalculator>) -> Self {
        Self {
            repository,
            publisher,
            calculator,
            sequence: AtomicU64::new(1),
        }
    }

    fn next_id(&self) -> LeadId {
        let id = self.sequence.fetch_add(1, Ordering::Relaxed);
        LeadId(format!("lead-{id:06}"))
    }

    /// Creates a lead, or folds the submission into the existing lead with the same e-mail.
    pub fn capture(&self, capture: LeadCapture) -> Result<LeadCaptureOutcome, FunnelServiceError> {
        let email = normalize_email(&capture.email).ok_or_else(|| {
            FunnelServiceError::Validation("email must be a valid address".to_string())
        })?;

        if let Some(existing) = self.find_by_email(&email)? {
            return self.recapture(&existing.id, capture);
        }

        let name = required("name", &capture.name)?;
        let now = Utc::now();
        let mut lead = Lead {
            id: self.next_id(),
            name,
            email: email.clone(),
            phone: None,
            company: None,
            job_title: None,
            location: None,
            industry: Default::default(),
            company_size: Default::default(),
            source: Default::default(),
            assigned_to: None,
            assigned_at: None,
            lead_score: 0,
            score_breakdown: LeadScoreBreakdown::default(),
            status: LeadStatus::New,
            timeline: Vec::new(),
            notes: Vec::new(),
            events: Vec::new(),
            created_at: now,
            last_contacted_at: None,
            converted_at: None,
        };
        capture.clone().merge_into(&mut lead);
        lead.timeline.push(TimelineEntry {
            kind: TimelineKind::Created,
            title: format!("Lead captured from {}", lead.source),
            at: now,
        });
        let lead = self.calculator.rescore_lead(&lead);

        let stored = match self.repository.insert(lead) {
            Ok(stored) => stored,
            Err(RepositoryError::Conflict) => {
                // Another submission for the same address won the insert.
                let existing = self
                    .find_by_email(&email)?
                    .ok_or(FunnelServiceError::Persistence(RepositoryError::Conflict))?;
                return self.recapture(&existing.id, capture);
            }
            Err(other) => return Err(other.into()),
        };
        info!(id = %stored.id, score = stored.lead_score, "lead created");

        publish_quietly(
            self.publisher.as_ref(),
            FunnelEvent::new("lead_created", &stored.id)
                .detail("email", &stored.email)
                .detail("source", &stored.source)
                .detail("lead_score", stored.lead_score),
        );

        Ok(LeadCaptureOutcome {
            lead: stored,
            created: true,
        })
    }

    pub fn get(&self, id: &LeadId) -> Result<Lead, FunnelServiceError> {
        self.repository
            .fetch(id)?
            .ok_or_else(|| FunnelServiceError::unknown(ENTITY, id))
    }

    pub fn transition(&self, id: &LeadId, target: LeadStatus) -> Result<Lead, FunnelServiceError> {
        let now = Utc::now();
        let mut from = None;
        let updated = self.update(id, &mut |current: &Lead| {
            from = Some(current.status);
            transition(current, target, now)
        })?;

        info!(
            id = %id,
            from = from.map(LeadStatus::label),
            to = target.label(),
            "lead transitioned"
        );
        if let Some(event) = transition_event(&updated) {
            publish_quietly(self.publisher.as_ref(), event);
        }
        Ok(updated)
    }

    pub fn add_note(
        &self,
        id: &LeadId,
        body: &str,
        author: Option<String>,
    ) -> Result<Lead, FunnelServiceError> {
        let body = required("note body", body)?;
        let author = author.filter(|author| !author.trim().is_empty());
        let now = Utc::now();

        self.update(id, &mut |current: &Lead| {
            let mut lead = current.clone();
            lead.notes.push(LeadNote {
                body: body.clone(),
                author: author.clone(),
                created_at: now,
            });
            lead.timeline.push(TimelineEntry {
                kind: TimelineKind::Note,
                title: "Note added".to_string(),
                at: now,
            });
            Ok(lead)
        })
    }

    /// Records an engagement event and re-scores, since engagement and intent read the log.
    pub fn track_event(
        &self,
        id: &LeadId,
        name: &str,
        page_url: Option<String>,
    ) -> Result<Lead, FunnelServiceError> {
        let name = required("event name", name)?.to_ascii_lowercase();
        let calculator = Arc::clone(&self.calculator);
        let now = Utc::now();

        let lead = self.update(id, &mut |current: &Lead| {
            let mut lead = current.clone();
            lead.timeline.push(TimelineEntry {
                kind: TimelineKind::Event,
                title: format!("Tracked {name}"),
                at: now,
            });
            lead.events.push(EngagementEvent {
                name: name.clone(),
                page_url: page_url.clone(),
                occurred_at: now,
            });
            Ok(calculator.rescore_lead(&lead))
        })?;

        debug!(id = %id, score = lead.lead_score, "lead engagement tracked");
        Ok(lead)
    }

    /// Hands the lead to an owner. Status is left untouched.
    pub fn assign(&self, id: &LeadId, assignee: &str) -> Result<Lead, FunnelServiceError> {
        let assignee = required("assignee", assignee)?;
        let now = Utc::now();

        let lead = self.update(id, &mut |current: &Lead| {
            let mut lead = current.clone();
            lead.timeline.push(TimelineEntry {
                kind: TimelineKind::Assignment,
                title: format!("Assigned to {assignee}"),
                at: now,
            });
            lead.assigned_to = Some(assignee.clone());
            lead.assigned_at = Some(now);
            Ok(lead)
        })?;

        info!(id = %id, assignee = ?lead.assigned_to, "lead assigned");
        Ok(lead)
    }

    pub fn refresh_score(&self, id: &LeadId) -> Result<Lead, FunnelServiceError> {
        let calculator = Arc::clone(&self.calculator);
        self.update(id, &mut |current: &Lead| Ok(calculator.rescore_lead(current)))
    }

    /// Leads matching `filter`, highest score first.
    pub fn list(&self, filter: &EntityFilter<LeadStatus>) -> Result<Vec<Lead>, FunnelServiceError> {
        let mut leads = self.repository.fetch_all(filter)?;
        leads.sort_by(|a, b| {
            b.lead_score
                .cmp(&a.lead_score)
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(leads)
    }

    pub fn bulk(&self, ids: Vec<String>, operation: BulkOperation<LeadStatus>) -> BulkOutcome {
        let ids: Vec<LeadId> = ids.into_iter().map(LeadId).collect();
        let now = Utc::now();
        let calculator = Arc::clone(&self.calculator);

        let report = apply_bulk(self.repository.as_ref(), &ids, |lead: &Lead| match operation {
            BulkOperation::Transition(target) => transition(lead, target, now),
            BulkOperation::RefreshScore => Ok(calculator.rescore_lead(lead)),
        });

        if let BulkOperation::Transition(_) = operation {
            for lead in &report.applied {
                if let Some(event) = transition_event(lead) {
                    publish_quietly(self.publisher.as_ref(), event);
                }
            }
        }

        let outcome = report.outcome;
        if outcome.is_complete() {
            info!(
                operation = %operation.label(),
                succeeded = outcome.succeeded,
                total = outcome.total,
                "lead bulk operation applied"
            );
        } else {
            warn!(
                operation = %operation.label(),
                succeeded = outcome.succeeded,
                total = outcome.total,
                failed = ?outcome.failed_ids(),
                "lead bulk operation partially applied"
            );
        }
        outcome
    }

    pub fn stats(&self) -> Result<LeadStats, FunnelServiceError> {
        let leads = self.repository.fetch_all(&EntityFilter::all())?;
        Ok(lead_stats(&leads))
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Lead>, FunnelServiceError> {
        Ok(self
            .repository
            .fetch_all(&EntityFilter::with_email(email.to_string()))?
            .into_iter()
            .next())
    }

    fn recapture(
        &self,
        id: &LeadId,
        capture: LeadCapture,
    ) -> Result<LeadCaptureOutcome, FunnelServiceError> {
        let calculator = Arc::clone(&self.calculator);
        let lead = self.update(id, &mut |current: &Lead| {
            let mut lead = current.clone();
            capture.clone().merge_into(&mut lead);
            Ok(calculator.rescore_lead(&lead))
        })?;

        debug!(id = %lead.id, score = lead.lead_score, "lead recaptured");
        Ok(LeadCaptureOutcome {
            lead,
            created: false,
        })
    }

    fn update(&self, id: &LeadId, mutation: Mutation<'_, Lead>) -> Result<Lead, FunnelServiceError> {
        self.repository.update(id, mutation).map_err(|err| {
            match &err {
                UpdateError::Rejected(reason) => {
                    debug!(id = %id, error = %reason, "lead update rejected")
                }
                UpdateError::Repository(reason) => {
                    warn!(id = %id, error = %reason, "failed to update lead")
                }
            }
            FunnelServiceError::from_update(ENTITY, id, err)
        })
    }
}

fn transition_event(lead: &Lead) -> Option<FunnelEvent> {
    let kind = match lead.status {
        LeadStatus::Qualified => "lead_qualified",
        LeadStatus::Converted => "lead_converted",
        _ => return None,
    };
    Some(
        FunnelEvent::new(kind, &lead.id)
            .detail("email", &lead.email)
            .detail("lifecycle_stage", lead.lifecycle_stage().label())
            .detail("lead_score", lead.lead_score),
    )
}
