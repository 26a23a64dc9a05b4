mod config;
mod rules;

pub use config::{
    CompanySizeWeights, IntentSignal, LeadWeights, RoleTier, RoleWeights, ScoringConfig,
    ScoringConfigError, SourceWeights, WaitlistWeights, COMPANY_SIZE_CAP, DEMOGRAPHICS_CAP,
    ENGAGEMENT_CAP, FIT_CAP, INDUSTRY_MATCH_CAP, INTENT_CAP, ROLE_FIT_CAP,
};

use serde::{Deserialize, Serialize};

use super::domain::{Lead, WaitlistEntry};

/// Pure scorer over entity attributes. Holds only the weight tables, so scoring the same
/// snapshot twice always yields the same breakdown.
#[derive(Debug, Clone, Default)]
pub struct ScoreCalculator {
    config: ScoringConfig,
}

impl ScoreCalculator {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config: config.clamped(),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn waitlist_breakdown(&self, entry: &WaitlistEntry) -> WaitlistScoreBreakdown {
        rules::score_waitlist_entry(entry, &self.config.waitlist)
    }

    pub fn lead_breakdown(&self, lead: &Lead) -> LeadScoreBreakdown {
        rules::score_lead(lead, &self.config.lead)
    }

    /// Returns a copy of `entry` with `priority_score` and `score_breakdown` refreshed.
    pub fn rescore_entry(&self, entry: &WaitlistEntry) -> WaitlistEntry {
        let breakdown = self.waitlist_breakdown(entry);
        let mut updated = entry.clone();
        updated.priority_score = breakdown.total();
        updated.score_breakdown = breakdown;
        updated
    }

    pub fn rescore_lead(&self, lead: &Lead) -> Lead {
        let breakdown = self.lead_breakdown(lead);
        let mut updated = lead.clone();
        updated.lead_score = breakdown.total();
        updated.score_breakdown = breakdown;
        updated
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WaitlistScoreBreakdown {
    pub company_size: u8,
    pub industry_match: u8,
    pub role_fit: u8,
}

impl WaitlistScoreBreakdown {
    pub fn total(&self) -> u8 {
        let sum = u16::from(self.company_size)
            + u16::from(self.industry_match)
            + u16::from(self.role_fit);
        sum.min(100) as u8
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadScoreBreakdown {
    pub engagement: u8,
    pub fit: u8,
    pub intent: u8,
    pub demographics: u8,
}

impl LeadScoreBreakdown {
    pub fn total(&self) -> u8 {
        let sum = u16::from(self.engagement)
            + u16::from(self.fit)
            + u16::from(self.intent)
            + u16::from(self.demographics);
        sum.min(100) as u8
    }
}
