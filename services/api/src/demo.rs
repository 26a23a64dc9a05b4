use crate::infra::{build_services, LoggingEventPublisher};
use clap::Args;
use signup_funnel::config::ScoringSettings;
use signup_funnel::error::AppError;
use signup_funnel::workflows::funnel::{
    BulkOperation, BulkOutcome, CompanySize, EntityFilter, Industry, LeadCapture, LeadSource,
    LeadStats, LeadStatus, LifecycleStatus, PipelineSummary, ScoreCalculator,
    WaitlistApplication, WaitlistSource, WaitlistStats, WaitlistStatus,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of queue slots to print
    #[arg(long, default_value_t = 5)]
    pub(crate) top: usize,
    /// Skip the lead pipeline portion of the demo
    #[arg(long)]
    pub(crate) skip_leads: bool,
    /// JSON document overriding the built-in scoring weights
    #[arg(long)]
    pub(crate) weights: Option<PathBuf>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ScoreArgs {
    /// Headcount bucket: 1-10, 11-50, 51-200, 201-1000 or 1000+
    #[arg(long)]
    pub(crate) company_size: Option<String>,
    /// Industry such as technology, finance or healthcare
    #[arg(long)]
    pub(crate) industry: Option<String>,
    /// Free-text role or job title
    #[arg(long)]
    pub(crate) role: Option<String>,
    /// JSON document overriding the built-in scoring weights
    #[arg(long)]
    pub(crate) weights: Option<PathBuf>,
}

struct Applicant {
    email: &'static str,
    company: &'static str,
    role: &'static str,
    size: CompanySize,
    industry: Industry,
    source: WaitlistSource,
}

fn demo_applicants() -> Vec<Applicant> {
    vec![
        Applicant {
            email: "maya@northwind.example",
            company: "Northwind Analytics",
            role: "Co-Founder",
            size: CompanySize::Small,
            industry: Industry::Technology,
            source: WaitlistSource::Referral,
        },
        Applicant {
            email: "dev@brightpath.example",
            company: "Brightpath Learning",
            role: "Senior Engineer",
            size: CompanySize::Medium,
            industry: Industry::Education,
            source: WaitlistSource::Website,
        },
        Applicant {
            email: "cfo@ledgerline.example",
            company: "Ledgerline",
            role: "CFO",
            size: CompanySize::Enterprise,
            industry: Industry::Finance,
            source: WaitlistSource::Event,
        },
        Applicant {
            email: "ops@cornerstore.example",
            company: "Corner Store Co",
            role: "Store Manager",
            size: CompanySize::Micro,
            industry: Industry::Retail,
            source: WaitlistSource::SocialMedia,
        },
        Applicant {
            email: "it@mercyhealth.example",
            company: "Mercy Health",
            role: "Director of IT",
            size: CompanySize::Large,
            industry: Industry::Healthcare,
            source: WaitlistSource::AdCampaign,
        },
        Applicant {
            email: "intern@buildright.example",
            company: "BuildRight",
            role: "Intern",
            size: CompanySize::from("500 people"),
            industry: Industry::Manufacturing,
            source: WaitlistSource::Other,
        },
    ]
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        top,
        skip_leads,
        weights,
    } = args;

    let scoring = ScoringSettings {
        weights_path: weights,
    }
    .load()?;
    let publisher = Arc::new(LoggingEventPublisher::default());
    let (waitlist, leads) = build_services(ScoreCalculator::new(scoring), publisher.clone());

    println!("Signup funnel demo");
    println!("\nWaitlist signups");
    let mut joined = Vec::new();
    for applicant in demo_applicants() {
        let entry = waitlist.join(WaitlistApplication {
            email: applicant.email.to_string(),
            name: None,
            company: Some(applicant.company.to_string()),
            role: Some(applicant.role.to_string()),
            company_size: applicant.size,
            industry: applicant.industry,
            source: applicant.source,
            notes: None,
        })?;
        println!(
            "- {} {} score {} (size {} / industry {} / role {})",
            entry.id,
            entry.email,
            entry.priority_score,
            entry.score_breakdown.company_size,
            entry.score_breakdown.industry_match,
            entry.score_breakdown.role_fit
        );
        joined.push(entry);
    }

    if let Some(token) = joined[0].verification_token.clone() {
        let verified = waitlist.verify(&token)?;
        println!("  Verified {}", verified.email);
    }

    let onboarded = joined[2].id.clone();
    for target in [
        WaitlistStatus::Approved,
        WaitlistStatus::Invited,
        WaitlistStatus::Onboarded,
    ] {
        waitlist.transition(&onboarded, target)?;
    }
    waitlist.transition(&joined[5].id, WaitlistStatus::Declined)?;
    println!("  Onboarded {} and declined {}", onboarded, joined[5].id);

    let ranking = waitlist.queue()?;
    println!("\nPriority queue ({} pending)", ranking.len());
    for slot in ranking.slots.iter().take(top) {
        println!(
            "  #{} {} score {} joined {}",
            slot.position,
            slot.id,
            slot.priority_score,
            slot.created_at.format("%Y-%m-%d %H:%M:%S")
        );
    }

    let mut bulk_ids: Vec<String> = ranking
        .slots
        .iter()
        .take(2)
        .map(|slot| slot.id.0.clone())
        .collect();
    bulk_ids.push(onboarded.0.clone());
    bulk_ids.push("wl-999999".to_string());
    let outcome = waitlist.bulk(bulk_ids, BulkOperation::Transition(WaitlistStatus::Approved));
    println!("\nBulk approve");
    render_bulk_outcome(&outcome);

    render_waitlist_stats(&waitlist.stats()?);

    if !skip_leads {
        println!("\nLead capture");
        let captures = [
            (
                "Jordan Lee",
                "jordan@apexlogistics.example",
                "VP Operations",
                CompanySize::Large,
            ),
            (
                "Sam Ortiz",
                "sam@fernclinic.example",
                "Practice Manager",
                CompanySize::Small,
            ),
            ("Alex Kim", "alex@quartzpay.example", "CTO", CompanySize::Medium),
            ("Robin Hale", "robin@gmail.example", "Student", CompanySize::Micro),
        ];
        let mut ids = Vec::new();
        for (name, email, title, size) in captures {
            let outcome = leads.capture(LeadCapture {
                name: name.to_string(),
                email: email.to_string(),
                job_title: Some(title.to_string()),
                company_size: Some(size),
                industry: Some(Industry::Technology),
                source: Some(LeadSource::Referral),
                ..LeadCapture::default()
            })?;
            ids.push(outcome.lead.id);
        }

        leads.track_event(&ids[0], "pricing_view", Some("/pricing".to_string()))?;
        leads.track_event(&ids[0], "demo_request", None)?;
        leads.track_event(&ids[2], "download", Some("/whitepaper".to_string()))?;

        for (index, path) in [
            vec![
                LeadStatus::Contacted,
                LeadStatus::Qualified,
                LeadStatus::Converted,
            ],
            vec![LeadStatus::Contacted, LeadStatus::Qualified],
            vec![LeadStatus::Contacted],
            vec![LeadStatus::Unqualified],
        ]
        .into_iter()
        .enumerate()
        {
            for target in path {
                leads.transition(&ids[index], target)?;
            }
        }
        leads.assign(&ids[1], "sales@funnel.example")?;

        for lead in leads.list(&EntityFilter::all())? {
            println!(
                "- {} {} score {} status {} stage {}",
                lead.id,
                lead.email,
                lead.lead_score,
                lead.status.label(),
                lead.lifecycle_stage().label()
            );
        }
        render_lead_stats(&leads.stats()?);
    }

    println!("\n{} funnel events published", publisher.events().len());
    Ok(())
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        company_size,
        industry,
        role,
        weights,
    } = args;

    let scoring = ScoringSettings {
        weights_path: weights,
    }
    .load()?;
    let (waitlist, _) = build_services(
        ScoreCalculator::new(scoring),
        Arc::new(LoggingEventPublisher::default()),
    );

    let company_size = company_size.map(CompanySize::from).unwrap_or_default();
    let industry = industry.map(Industry::from).unwrap_or_default();
    let entry = waitlist.join(WaitlistApplication {
        email: "score@signup-funnel.local".to_string(),
        role,
        company_size: company_size.clone(),
        industry: industry.clone(),
        ..WaitlistApplication::default()
    })?;

    println!("Priority score {}", entry.priority_score);
    println!(
        "- company size {}: {}{}",
        display_label(company_size.label()),
        entry.score_breakdown.company_size,
        unrecognized_note(company_size.is_recognized())
    );
    println!(
        "- industry {}: {}{}",
        display_label(industry.label()),
        entry.score_breakdown.industry_match,
        unrecognized_note(industry.is_recognized())
    );
    println!(
        "- role {}: {}",
        display_label(entry.role.as_deref().unwrap_or_default()),
        entry.score_breakdown.role_fit
    );
    Ok(())
}

fn display_label(label: &str) -> &str {
    if label.trim().is_empty() {
        "(none)"
    } else {
        label
    }
}

fn unrecognized_note(recognized: bool) -> &'static str {
    if recognized {
        ""
    } else {
        " (unrecognized)"
    }
}

fn render_bulk_outcome(outcome: &BulkOutcome) {
    println!("- {}/{} applied", outcome.succeeded, outcome.total);
    for failure in &outcome.failures {
        println!("  ! {} {:?}: {}", failure.id, failure.reason, failure.detail);
    }
}

fn render_pipeline<S: LifecycleStatus>(pipeline: &PipelineSummary<S>) {
    for stage in &pipeline.stages {
        println!("  {:<12} {}", stage.stage_label, stage.count);
    }
    for conversion in &pipeline.conversions {
        println!(
            "  {} -> {}: {}%",
            conversion.from_label, conversion.to_label, conversion.rate_percent
        );
    }
}

fn render_waitlist_stats(stats: &WaitlistStats) {
    println!(
        "\nWaitlist pipeline ({} entries, {} verified)",
        stats.total_entries, stats.verified_entries
    );
    render_pipeline(&stats.pipeline);
    let industries: Vec<String> = stats
        .by_industry
        .iter()
        .map(|(industry, count)| format!("{industry} {count}"))
        .collect();
    println!("  industries: {}", industries.join(", "));
}

fn render_lead_stats(stats: &LeadStats) {
    println!("\nLead pipeline ({} leads)", stats.total_leads);
    render_pipeline(&stats.pipeline);
    if let Some(average) = stats.score_statistics.average {
        println!(
            "  scores avg {:.2} | high {} medium {} low {}",
            average,
            stats.score_distribution.high,
            stats.score_distribution.medium,
            stats.score_distribution.low
        );
    }
    println!(
        "  conversion {:.2}% | qualification {:.2}%",
        stats.conversion_rate, stats.qualification_rate
    );
}
