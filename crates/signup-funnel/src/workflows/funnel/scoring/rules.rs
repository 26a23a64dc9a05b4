use super::super::domain::{CompanySize, Industry, Lead, LeadSource, WaitlistEntry};
use super::config::{
    CompanySizeWeights, LeadWeights, RoleWeights, SourceWeights, WaitlistWeights,
    COMPANY_SIZE_CAP, DEMOGRAPHICS_CAP, ENGAGEMENT_CAP, FIT_CAP, INDUSTRY_MATCH_CAP, INTENT_CAP,
    ROLE_FIT_CAP,
};
use super::{LeadScoreBreakdown, WaitlistScoreBreakdown};

const PROFILE_FIELDS: u32 = 8;

pub(crate) fn score_waitlist_entry(
    entry: &WaitlistEntry,
    weights: &WaitlistWeights,
) -> WaitlistScoreBreakdown {
    let company_size = company_size_weight(&entry.company_size, &weights.company_size)
        .min(COMPANY_SIZE_CAP);

    let industry_match = industry_weight(
        &entry.industry,
        &weights.preferred_industries,
        weights.preferred_industry,
        weights.other_industry,
    )
    .min(INDUSTRY_MATCH_CAP);

    let role_fit = role_weight(entry.role.as_deref(), &weights.roles).min(ROLE_FIT_CAP);

    WaitlistScoreBreakdown {
        company_size,
        industry_match,
        role_fit,
    }
}

pub(crate) fn score_lead(lead: &Lead, weights: &LeadWeights) -> LeadScoreBreakdown {
    let activity = u32::try_from(lead.events.len())
        .unwrap_or(u32::MAX)
        .saturating_mul(u32::from(weights.points_per_event));
    let engagement = bounded(activity, ENGAGEMENT_CAP);

    let size = company_size_weight(&lead.company_size, &weights.company_size)
        .min(weights.company_size_cap);
    let role = role_weight(lead.job_title.as_deref(), &weights.roles).min(weights.role_cap);
    let fit = bounded(u32::from(size) + u32::from(role), FIT_CAP);

    let signal_points: u32 = lead
        .events
        .iter()
        .map(|event| {
            weights
                .intent_signals
                .iter()
                .find(|signal| signal.event.eq_ignore_ascii_case(event.name.trim()))
                .map(|signal| u32::from(signal.weight))
                .unwrap_or(0)
        })
        .fold(0, u32::saturating_add);
    let intent = bounded(
        signal_points.saturating_add(u32::from(source_weight(&lead.source, &weights.sources))),
        INTENT_CAP,
    );

    let completeness =
        profile_fields_filled(lead) * u32::from(weights.completeness) / PROFILE_FIELDS;
    let industry = industry_weight(
        &lead.industry,
        &weights.preferred_industries,
        weights.preferred_industry,
        weights.other_industry,
    );
    let demographics = bounded(completeness + u32::from(industry), DEMOGRAPHICS_CAP);

    LeadScoreBreakdown {
        engagement,
        fit,
        intent,
        demographics,
    }
}

fn bounded(points: u32, cap: u8) -> u8 {
    points.min(u32::from(cap)) as u8
}

fn company_size_weight(size: &CompanySize, weights: &CompanySizeWeights) -> u8 {
    match size {
        CompanySize::Micro => weights.micro,
        CompanySize::Small => weights.small,
        CompanySize::Medium => weights.medium,
        CompanySize::Large => weights.large,
        CompanySize::Enterprise => weights.enterprise,
        CompanySize::Unrecognized(_) => 0,
    }
}

fn industry_weight(industry: &Industry, preferred: &[Industry], hit: u8, miss: u8) -> u8 {
    if !industry.is_recognized() {
        0
    } else if preferred.contains(industry) {
        hit
    } else {
        miss
    }
}

fn source_weight(source: &LeadSource, weights: &SourceWeights) -> u8 {
    match source {
        LeadSource::Referral => weights.referral,
        LeadSource::EmailCampaign => weights.email_campaign,
        LeadSource::PaidAd => weights.paid_ad,
        LeadSource::Organic | LeadSource::SocialMedia | LeadSource::Website => {
            weights.other_recognized
        }
        LeadSource::Unrecognized(_) => 0,
    }
}

/// Whole-word keyword match, so "director" never matches the "cto" tier. The keyword with
/// the most words wins ("vice president" over "president"); ties go to the earlier tier.
pub(crate) fn role_weight(role: Option<&str>, weights: &RoleWeights) -> u8 {
    let Some(role) = role.map(str::trim).filter(|role| !role.is_empty()) else {
        return 0;
    };

    let tokens: Vec<String> = role
        .to_ascii_lowercase()
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '-')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();
    let padded = format!(" {} ", tokens.join(" "));

    let mut best: Option<(usize, u8)> = None;
    for tier in &weights.tiers {
        for keyword in &tier.keywords {
            let keyword = keyword.trim().to_ascii_lowercase();
            if keyword.is_empty() || !padded.contains(&format!(" {keyword} ")) {
                continue;
            }
            let words = keyword.split_whitespace().count();
            if best.map_or(true, |(most, _)| words > most) {
                best = Some((words, tier.weight));
            }
        }
    }

    best.map(|(_, weight)| weight).unwrap_or(weights.other_role)
}

fn profile_fields_filled(lead: &Lead) -> u32 {
    fn present(value: Option<&str>) -> bool {
        value.map(|raw| !raw.trim().is_empty()).unwrap_or(false)
    }

    [
        present(Some(lead.name.as_str())),
        present(Some(lead.email.as_str())),
        present(lead.phone.as_deref()),
        present(lead.company.as_deref()),
        present(lead.job_title.as_deref()),
        lead.industry.is_recognized(),
        lead.company_size.is_recognized(),
        present(lead.location.as_deref()),
    ]
    .into_iter()
    .filter(|filled| *filled)
    .count() as u32
}
