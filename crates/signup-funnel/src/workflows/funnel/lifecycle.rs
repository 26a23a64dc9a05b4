//! Central authority for status changes on waitlist entries and leads.
//!
//! Every legal edge lives in one exhaustive successor table per status type. A transition
//! is accepted only when the target is a listed successor of the current status, so
//! terminal states (empty successor lists) can never be left and re-entering the current
//! status is always rejected.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::domain::{
    CompanySize, Industry, Lead, LeadId, LeadStatus, TimelineEntry, TimelineKind,
    WaitlistEntry, WaitlistEntryId, WaitlistStatus,
};

/// Status enumeration with an explicit successor table.
pub trait LifecycleStatus: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Entity name used in error messages and logs.
    const ENTITY: &'static str;

    fn successors(self) -> &'static [Self];

    fn label(self) -> &'static str;

    fn is_terminal(self) -> bool {
        self.successors().is_empty()
    }

    fn can_transition_to(self, target: Self) -> bool {
        self.successors().contains(&target)
    }
}

impl LifecycleStatus for WaitlistStatus {
    const ENTITY: &'static str = "waitlist entry";

    fn successors(self) -> &'static [Self] {
        match self {
            WaitlistStatus::Pending => &[WaitlistStatus::Approved, WaitlistStatus::Declined],
            WaitlistStatus::Approved => &[WaitlistStatus::Invited, WaitlistStatus::Declined],
            WaitlistStatus::Invited => &[WaitlistStatus::Onboarded],
            WaitlistStatus::Onboarded | WaitlistStatus::Declined => &[],
        }
    }

    fn label(self) -> &'static str {
        WaitlistStatus::label(self)
    }
}

impl LifecycleStatus for LeadStatus {
    const ENTITY: &'static str = "lead";

    fn successors(self) -> &'static [Self] {
        match self {
            LeadStatus::New => &[LeadStatus::Contacted, LeadStatus::Unqualified],
            LeadStatus::Contacted => &[
                LeadStatus::Qualified,
                LeadStatus::Unqualified,
                LeadStatus::Lost,
            ],
            LeadStatus::Qualified => &[LeadStatus::Converted, LeadStatus::Lost],
            LeadStatus::Converted | LeadStatus::Unqualified | LeadStatus::Lost => &[],
        }
    }

    fn label(self) -> &'static str {
        LeadStatus::label(self)
    }
}

/// Entity whose status is governed by a [`LifecycleStatus`] table.
pub trait Lifecycle: Clone + Send + Sync + 'static {
    type Id: Clone + Eq + Hash + Ord + Display + Debug + Send + Sync;
    type Status: LifecycleStatus;

    fn id(&self) -> &Self::Id;

    fn status(&self) -> Self::Status;

    fn email(&self) -> &str;

    fn industry(&self) -> &Industry;

    fn company_size(&self) -> &CompanySize;

    fn created_at(&self) -> DateTime<Utc>;

    /// Applies an already validated status change and stamps first-entry bookkeeping.
    fn enter(&mut self, status: Self::Status, at: DateTime<Utc>);
}

impl Lifecycle for WaitlistEntry {
    type Id = WaitlistEntryId;
    type Status = WaitlistStatus;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn status(&self) -> Self::Status {
        self.status
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn industry(&self) -> &Industry {
        &self.industry
    }

    fn company_size(&self) -> &CompanySize {
        &self.company_size
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn enter(&mut self, status: WaitlistStatus, at: DateTime<Utc>) {
        self.status = status;
        let stamp = match status {
            WaitlistStatus::Pending => None,
            WaitlistStatus::Approved => Some(&mut self.approved_at),
            WaitlistStatus::Invited => Some(&mut self.invited_at),
            WaitlistStatus::Onboarded => Some(&mut self.onboarded_at),
            WaitlistStatus::Declined => Some(&mut self.declined_at),
        };
        if let Some(slot) = stamp {
            slot.get_or_insert(at);
        }
        if status == WaitlistStatus::Invited {
            self.invite_code
                .get_or_insert_with(|| Uuid::new_v4().simple().to_string());
        }
        if status != WaitlistStatus::Pending {
            self.position = None;
        }
    }
}

impl Lifecycle for Lead {
    type Id = LeadId;
    type Status = LeadStatus;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn status(&self) -> Self::Status {
        self.status
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn industry(&self) -> &Industry {
        &self.industry
    }

    fn company_size(&self) -> &CompanySize {
        &self.company_size
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn enter(&mut self, status: LeadStatus, at: DateTime<Utc>) {
        let previous = self.status;
        self.status = status;
        match status {
            LeadStatus::Contacted => {
                self.last_contacted_at.get_or_insert(at);
            }
            LeadStatus::Converted => {
                self.converted_at.get_or_insert(at);
            }
            _ => {}
        }
        self.timeline.push(TimelineEntry {
            kind: TimelineKind::StatusChange,
            title: format!(
                "Status changed from {} to {}",
                previous.label(),
                status.label()
            ),
            at,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("{entity} cannot move from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },
}

/// Validates `target` against the successor table and returns the updated snapshot.
/// The input is never mutated.
pub fn transition<E: Lifecycle>(
    entity: &E,
    target: E::Status,
    at: DateTime<Utc>,
) -> Result<E, TransitionError> {
    let current = entity.status();
    if !current.can_transition_to(target) {
        return Err(TransitionError::InvalidTransition {
            entity: E::Status::ENTITY,
            from: current.label(),
            to: target.label(),
        });
    }

    let mut next = entity.clone();
    next.enter(target, at);
    Ok(next)
}
