use super::common::*;
use crate::workflows::funnel::domain::{
    CompanySize, Industry, LeadSource, LeadStatus, WaitlistStatus,
};
use crate::workflows::funnel::pipeline::{
    aggregate, conversion_rate, lead_stats, waitlist_stats, ScoreDistribution,
};

fn repeat(status: LeadStatus, count: usize) -> impl Iterator<Item = LeadStatus> {
    std::iter::repeat(status).take(count)
}

#[test]
fn lead_pipeline_conversion_rates_round_to_whole_percentages() {
    let statuses = repeat(LeadStatus::New, 100)
        .chain(repeat(LeadStatus::Contacted, 40))
        .chain(repeat(LeadStatus::Qualified, 10))
        .chain(repeat(LeadStatus::Converted, 2))
        .chain(repeat(LeadStatus::Lost, 7));

    let summary = aggregate(&LeadStatus::pipeline(), statuses);

    let counts: Vec<usize> = summary.stages.iter().map(|stage| stage.count).collect();
    assert_eq!(counts, vec![100, 40, 10, 2]);
    let rates: Vec<u32> = summary
        .conversions
        .iter()
        .map(|conversion| conversion.rate_percent)
        .collect();
    assert_eq!(rates, vec![40, 25, 20]);
    assert_eq!(summary.conversions[0].from_label, "new");
    assert_eq!(summary.conversions[0].to_label, "contacted");
    assert_eq!(summary.population(LeadStatus::Lost), None);
}

#[test]
fn empty_stage_yields_zero_rate() {
    let summary = aggregate(
        &WaitlistStatus::pipeline(),
        vec![WaitlistStatus::Invited, WaitlistStatus::Onboarded],
    );

    assert_eq!(summary.population(WaitlistStatus::Pending), Some(0));
    assert_eq!(summary.conversions[0].rate_percent, 0);
    assert_eq!(summary.conversions[2].rate_percent, 100);
}

#[test]
fn conversion_rate_rounds_half_up() {
    assert_eq!(conversion_rate(0, 5), 0);
    assert_eq!(conversion_rate(3, 1), 33);
    assert_eq!(conversion_rate(3, 2), 67);
    assert_eq!(conversion_rate(8, 1), 13);
    assert_eq!(conversion_rate(2, 5), 250);
}

#[test]
fn waitlist_stats_bucket_unknown_attributes() {
    let mut tech = entry("wl-1", WaitlistStatus::Pending, 80, 0);
    tech.industry = Industry::Technology;
    tech.company_size = CompanySize::Medium;
    tech.verified = true;
    let mut unknown = entry("wl-2", WaitlistStatus::Approved, 10, 1);
    unknown.industry = Industry::default();
    let declined = entry("wl-3", WaitlistStatus::Declined, 5, 2);

    let stats = waitlist_stats(&[tech, unknown, declined]);

    assert_eq!(stats.total_entries, 3);
    assert_eq!(stats.verified_entries, 1);
    assert_eq!(stats.by_status["pending"], 1);
    assert_eq!(stats.by_status["declined"], 1);
    assert_eq!(stats.by_status["onboarded"], 0);
    assert_eq!(stats.by_industry["technology"], 1);
    assert_eq!(stats.by_industry["unknown"], 2);
    assert_eq!(stats.by_company_size["51-200"], 1);
    assert_eq!(stats.pipeline.population(WaitlistStatus::Approved), Some(1));
}

#[test]
fn lead_stats_report_distribution_and_rates() {
    let mut referral = lead_with_score("lead-1", LeadStatus::Converted, 85);
    referral.source = LeadSource::Referral;
    let leads = vec![
        referral,
        lead_with_score("lead-2", LeadStatus::Qualified, 70),
        lead_with_score("lead-3", LeadStatus::Contacted, 55),
        lead_with_score("lead-4", LeadStatus::New, 40),
        lead_with_score("lead-5", LeadStatus::New, 39),
        lead_with_score("lead-6", LeadStatus::Lost, 12),
    ];

    let stats = lead_stats(&leads);

    assert_eq!(stats.total_leads, 6);
    assert_eq!(
        stats.score_distribution,
        ScoreDistribution {
            high: 2,
            medium: 2,
            low: 2,
        }
    );
    assert_eq!(stats.score_statistics.max, Some(85));
    assert_eq!(stats.score_statistics.min, Some(12));
    assert_eq!(stats.score_statistics.average, Some(50.17));
    assert_eq!(stats.converted_count, 1);
    assert_eq!(stats.qualified_count, 1);
    assert_eq!(stats.conversion_rate, 16.67);
    assert_eq!(stats.qualification_rate, 16.67);
    assert_eq!(stats.by_lifecycle_stage["customer"], 1);
    assert_eq!(stats.by_lifecycle_stage["subscriber"], 1);
    assert_eq!(stats.by_lifecycle_stage["lead"], 2);
    assert_eq!(stats.by_source["referral"], 1);
    assert_eq!(stats.by_source["website"], 5);
}

#[test]
fn lead_stats_on_empty_set_are_zeroed() {
    let stats = lead_stats(&[]);
    assert_eq!(stats.total_leads, 0);
    assert_eq!(stats.score_statistics.average, None);
    assert_eq!(stats.conversion_rate, 0.0);
    assert!(stats.pipeline.conversions.iter().all(|c| c.rate_percent == 0));
}
