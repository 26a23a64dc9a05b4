use std::collections::BTreeMap;

use serde::Serialize;

use super::super::domain::{Lead, LeadStatus, LifecycleStage, WaitlistEntry, WaitlistStatus};
use super::{aggregate, PipelineSummary};

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, Serialize)]
pub struct WaitlistStats {
    pub total_entries: usize,
    pub verified_entries: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_industry: BTreeMap<String, usize>,
    pub by_company_size: BTreeMap<String, usize>,
    pub pipeline: PipelineSummary<WaitlistStatus>,
}

pub fn waitlist_stats(entries: &[WaitlistEntry]) -> WaitlistStats {
    let mut by_status: BTreeMap<&'static str, usize> = WaitlistStatus::ordered()
        .into_iter()
        .map(|status| (status.label(), 0))
        .collect();
    let mut by_industry = BTreeMap::new();
    let mut by_company_size = BTreeMap::new();

    for entry in entries {
        *by_status.entry(entry.status.label()).or_default() += 1;
        *by_industry
            .entry(bucket_label(entry.industry.label()))
            .or_default() += 1;
        *by_company_size
            .entry(bucket_label(entry.company_size.label()))
            .or_default() += 1;
    }

    WaitlistStats {
        total_entries: entries.len(),
        verified_entries: entries.iter().filter(|entry| entry.verified).count(),
        by_status,
        by_industry,
        by_company_size,
        pipeline: aggregate(
            &WaitlistStatus::pipeline(),
            entries.iter().map(|entry| entry.status),
        ),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScoreStatistics {
    pub average: Option<f64>,
    pub max: Option<u8>,
    pub min: Option<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeadStats {
    pub total_leads: usize,
    pub by_status: BTreeMap<&'static str, usize>,
    pub by_lifecycle_stage: BTreeMap<&'static str, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub score_statistics: ScoreStatistics,
    pub score_distribution: ScoreDistribution,
    pub conversion_rate: f64,
    pub qualification_rate: f64,
    pub converted_count: usize,
    pub qualified_count: usize,
    pub pipeline: PipelineSummary<LeadStatus>,
}

pub fn lead_stats(leads: &[Lead]) -> LeadStats {
    let mut by_status: BTreeMap<&'static str, usize> = LeadStatus::ordered()
        .into_iter()
        .map(|status| (status.label(), 0))
        .collect();
    let mut by_lifecycle_stage: BTreeMap<&'static str, usize> = LifecycleStage::ordered()
        .into_iter()
        .map(|stage| (stage.label(), 0))
        .collect();
    let mut by_source = BTreeMap::new();
    let mut distribution = ScoreDistribution::default();

    for lead in leads {
        *by_status.entry(lead.status.label()).or_default() += 1;
        *by_lifecycle_stage
            .entry(lead.lifecycle_stage().label())
            .or_default() += 1;
        *by_source
            .entry(bucket_label(lead.source.label()))
            .or_default() += 1;

        match lead.lead_score {
            70.. => distribution.high += 1,
            40..=69 => distribution.medium += 1,
            _ => distribution.low += 1,
        }
    }

    let score_statistics = if leads.is_empty() {
        ScoreStatistics::default()
    } else {
        let sum: u64 = leads.iter().map(|lead| u64::from(lead.lead_score)).sum();
        ScoreStatistics {
            average: Some(two_decimals(sum as f64 / leads.len() as f64)),
            max: leads.iter().map(|lead| lead.lead_score).max(),
            min: leads.iter().map(|lead| lead.lead_score).min(),
        }
    };

    let converted_count = count_status(leads, LeadStatus::Converted);
    let qualified_count = count_status(leads, LeadStatus::Qualified);

    LeadStats {
        total_leads: leads.len(),
        by_status,
        by_lifecycle_stage,
        by_source,
        score_statistics,
        score_distribution: distribution,
        conversion_rate: percentage(converted_count, leads.len()),
        qualification_rate: percentage(qualified_count, leads.len()),
        converted_count,
        qualified_count,
        pipeline: aggregate(&LeadStatus::pipeline(), leads.iter().map(|lead| lead.status)),
    }
}

fn count_status(leads: &[Lead], status: LeadStatus) -> usize {
    leads.iter().filter(|lead| lead.status == status).count()
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        two_decimals(part as f64 / whole as f64 * 100.0)
    }
}

fn two_decimals(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn bucket_label(label: &str) -> String {
    let label = label.trim();
    if label.is_empty() {
        UNKNOWN.to_string()
    } else {
        label.to_string()
    }
}
