use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::super::domain::Industry;

pub const COMPANY_SIZE_CAP: u8 = 40;
pub const INDUSTRY_MATCH_CAP: u8 = 30;
pub const ROLE_FIT_CAP: u8 = 30;

pub const ENGAGEMENT_CAP: u8 = 30;
pub const FIT_CAP: u8 = 30;
pub const INTENT_CAP: u8 = 20;
pub const DEMOGRAPHICS_CAP: u8 = 20;

/// Weight tables for both scorers. Every field may be omitted from a JSON override.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub waitlist: WaitlistWeights,
    pub lead: LeadWeights,
}

impl ScoringConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ScoringConfigError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ScoringConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ScoringConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let config: Self = serde_json::from_str(raw)?;
        Ok(config.clamped())
    }

    /// Caps every weight at its component maximum so the totals stay within 0..=100.
    pub fn clamped(mut self) -> Self {
        self.waitlist.clamp();
        self.lead.clamp();
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScoringConfigError {
    #[error("unable to read scoring weights from {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("scoring weights in {path} are not valid JSON")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Points per company-size bucket. Unrecognized buckets always score zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompanySizeWeights {
    pub micro: u8,
    pub small: u8,
    pub medium: u8,
    pub large: u8,
    pub enterprise: u8,
}

impl CompanySizeWeights {
    fn clamp(&mut self, cap: u8) {
        for weight in [
            &mut self.micro,
            &mut self.small,
            &mut self.medium,
            &mut self.large,
            &mut self.enterprise,
        ] {
            *weight = (*weight).min(cap);
        }
    }
}

impl Default for CompanySizeWeights {
    fn default() -> Self {
        Self {
            micro: 10,
            small: 20,
            medium: 30,
            large: 35,
            enterprise: 40,
        }
    }
}

/// Seniority tier matched on whole words of a role or job title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTier {
    pub keywords: Vec<String>,
    pub weight: u8,
}

impl RoleTier {
    fn new(keywords: &[&str], weight: u8) -> Self {
        Self {
            keywords: keywords.iter().map(|keyword| keyword.to_string()).collect(),
            weight,
        }
    }
}

/// Ordered tiers. Longer keyword matches win; ties go to the earlier tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleWeights {
    pub tiers: Vec<RoleTier>,
    pub other_role: u8,
}

impl RoleWeights {
    fn clamp(&mut self, cap: u8) {
        for tier in &mut self.tiers {
            tier.weight = tier.weight.min(cap);
        }
        self.other_role = self.other_role.min(cap);
    }

    /// Default tiers rescaled to a different component cap.
    fn scaled(cap: u8) -> Self {
        let mut weights = Self::default();
        for tier in &mut weights.tiers {
            tier.weight = scale(tier.weight, ROLE_FIT_CAP, cap);
        }
        weights.other_role = scale(weights.other_role, ROLE_FIT_CAP, cap);
        weights
    }
}

impl Default for RoleWeights {
    fn default() -> Self {
        Self {
            tiers: vec![
                RoleTier::new(&["founder", "cofounder", "co-founder", "owner"], 30),
                RoleTier::new(&["ceo", "cto", "cfo", "coo", "chief", "president"], 28),
                RoleTier::new(&["vp", "vice president", "director", "head"], 22),
                RoleTier::new(&["manager", "lead", "senior", "principal"], 15),
                RoleTier::new(&["engineer", "developer", "analyst", "specialist"], 10),
            ],
            other_role: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitlistWeights {
    pub company_size: CompanySizeWeights,
    pub preferred_industries: Vec<Industry>,
    pub preferred_industry: u8,
    pub other_industry: u8,
    pub roles: RoleWeights,
}

impl WaitlistWeights {
    fn clamp(&mut self) {
        self.company_size.clamp(COMPANY_SIZE_CAP);
        self.preferred_industry = self.preferred_industry.min(INDUSTRY_MATCH_CAP);
        self.other_industry = self.other_industry.min(INDUSTRY_MATCH_CAP);
        self.roles.clamp(ROLE_FIT_CAP);
    }
}

impl Default for WaitlistWeights {
    fn default() -> Self {
        Self {
            company_size: CompanySizeWeights::default(),
            preferred_industries: default_preferred_industries(),
            preferred_industry: 30,
            other_industry: 10,
            roles: RoleWeights::default(),
        }
    }
}

/// Points awarded per occurrence of a named engagement event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentSignal {
    pub event: String,
    pub weight: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceWeights {
    pub referral: u8,
    pub email_campaign: u8,
    pub paid_ad: u8,
    pub other_recognized: u8,
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            referral: 5,
            email_campaign: 3,
            paid_ad: 2,
            other_recognized: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeadWeights {
    pub points_per_event: u8,
    pub company_size: CompanySizeWeights,
    pub company_size_cap: u8,
    pub roles: RoleWeights,
    pub role_cap: u8,
    pub intent_signals: Vec<IntentSignal>,
    pub sources: SourceWeights,
    pub completeness: u8,
    pub preferred_industries: Vec<Industry>,
    pub preferred_industry: u8,
    pub other_industry: u8,
}

impl LeadWeights {
    fn clamp(&mut self) {
        self.points_per_event = self.points_per_event.min(ENGAGEMENT_CAP);
        self.company_size_cap = self.company_size_cap.min(FIT_CAP);
        self.role_cap = self.role_cap.min(FIT_CAP - self.company_size_cap);
        self.company_size.clamp(self.company_size_cap);
        self.roles.clamp(self.role_cap);
        for signal in &mut self.intent_signals {
            signal.weight = signal.weight.min(INTENT_CAP);
        }
        self.completeness = self.completeness.min(DEMOGRAPHICS_CAP);
        let industry_cap = DEMOGRAPHICS_CAP - self.completeness;
        self.preferred_industry = self.preferred_industry.min(industry_cap);
        self.other_industry = self.other_industry.min(industry_cap);
    }
}

impl Default for LeadWeights {
    fn default() -> Self {
        Self {
            points_per_event: 3,
            company_size: CompanySizeWeights {
                micro: 5,
                small: 8,
                medium: 10,
                large: 12,
                enterprise: 15,
            },
            company_size_cap: 15,
            roles: RoleWeights::scaled(15),
            role_cap: 15,
            intent_signals: vec![
                IntentSignal {
                    event: "demo_request".to_string(),
                    weight: 10,
                },
                IntentSignal {
                    event: "pricing_view".to_string(),
                    weight: 5,
                },
                IntentSignal {
                    event: "form_submit".to_string(),
                    weight: 5,
                },
                IntentSignal {
                    event: "download".to_string(),
                    weight: 3,
                },
                IntentSignal {
                    event: "video_play".to_string(),
                    weight: 3,
                },
            ],
            sources: SourceWeights::default(),
            completeness: 10,
            preferred_industries: default_preferred_industries(),
            preferred_industry: 10,
            other_industry: 5,
        }
    }
}

fn default_preferred_industries() -> Vec<Industry> {
    vec![Industry::Technology, Industry::Finance, Industry::Healthcare]
}

fn scale(weight: u8, from_cap: u8, to_cap: u8) -> u8 {
    ((u16::from(weight) * u16::from(to_cap)) / u16::from(from_cap)) as u8
}
