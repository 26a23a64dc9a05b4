//! Waitlist and lead funnel: scoring, lifecycle rules, queue ranking, pipeline reporting
//! and bulk status changes.
//!
//! Every decision in this module is a pure function over entity snapshots. The services
//! fetch from a [`Repository`], hand the snapshot to the relevant rule and persist the
//! result; nothing is mutated in place and no entity state is cached between calls apart
//! from the memoised queue ranking.

pub mod bulk;
pub mod domain;
pub mod lifecycle;
pub mod pipeline;
pub mod queue;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use bulk::{
    apply_bulk, BulkFailure, BulkFailureReason, BulkOperation, BulkOutcome, BulkReport,
    BulkRequest,
};
pub use domain::{
    normalize_email, CompanySize, EngagementEvent, Industry, Lead, LeadCapture, LeadId,
    LeadNote, LeadSource, LeadStatus, LeadView, LifecycleStage, TimelineEntry, TimelineKind,
    WaitlistApplication, WaitlistAttributePatch, WaitlistEntry, WaitlistEntryId,
    WaitlistSource, WaitlistStatus,
};
pub use lifecycle::{transition, Lifecycle, LifecycleStatus, TransitionError};
pub use pipeline::{
    aggregate, conversion_rate, lead_stats, waitlist_stats, LeadStats, PipelineSummary,
    ScoreDistribution, ScoreStatistics, StageConversion, StagePopulation, WaitlistStats,
};
pub use queue::{rank, QueueRanker, QueueRanking, QueueSlot};
pub use repository::{
    EntityFilter, EventPublisher, FunnelEvent, Mutation, PublishError, Repository,
    RepositoryError, UpdateError,
};
pub use router::{lead_router, waitlist_router};
pub use scoring::{
    LeadScoreBreakdown, ScoreCalculator, ScoringConfig, ScoringConfigError,
    WaitlistScoreBreakdown,
};
pub use service::{
    FunnelServiceError, LeadCaptureOutcome, LeadService, WaitlistService, WaitlistStatusView,
};
