mod stats;

pub use stats::{
    lead_stats, waitlist_stats, LeadStats, ScoreDistribution, ScoreStatistics, WaitlistStats,
};

use serde::Serialize;

use super::lifecycle::LifecycleStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagePopulation<S> {
    pub stage: S,
    pub stage_label: &'static str,
    pub count: usize,
}

/// Share of stage `from` that reached stage `to`, as a rounded whole percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageConversion<S> {
    pub from: S,
    pub to: S,
    pub from_label: &'static str,
    pub to_label: &'static str,
    pub rate_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary<S> {
    pub stages: Vec<StagePopulation<S>>,
    pub conversions: Vec<StageConversion<S>>,
}

impl<S: LifecycleStatus> PipelineSummary<S> {
    pub fn population(&self, stage: S) -> Option<usize> {
        self.stages
            .iter()
            .find(|entry| entry.stage == stage)
            .map(|entry| entry.count)
    }
}

/// Counts how many statuses fall in each of the ordered `stages` and derives the
/// conversion rate between each adjacent pair. Statuses outside `stages` are ignored.
pub fn aggregate<S, I>(stages: &[S], statuses: I) -> PipelineSummary<S>
where
    S: LifecycleStatus,
    I: IntoIterator<Item = S>,
{
    let mut counts = vec![0usize; stages.len()];
    for status in statuses {
        if let Some(index) = stages.iter().position(|stage| *stage == status) {
            counts[index] += 1;
        }
    }

    let populations: Vec<StagePopulation<S>> = stages
        .iter()
        .zip(counts.iter())
        .map(|(stage, count)| StagePopulation {
            stage: *stage,
            stage_label: stage.label(),
            count: *count,
        })
        .collect();

    let conversions = populations
        .windows(2)
        .map(|pair| StageConversion {
            from: pair[0].stage,
            to: pair[1].stage,
            from_label: pair[0].stage_label,
            to_label: pair[1].stage_label,
            rate_percent: conversion_rate(pair[0].count, pair[1].count),
        })
        .collect();

    PipelineSummary {
        stages: populations,
        conversions,
    }
}

/// `to / from` as a percentage rounded half up; zero when `from` is empty.
pub fn conversion_rate(from: usize, to: usize) -> u32 {
    if from == 0 {
        return 0;
    }
    let from = from as u64;
    let to = to as u64;
    ((200 * to + from) / (2 * from)) as u32
}
