use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use super::scoring::{LeadScoreBreakdown, WaitlistScoreBreakdown};

/// Categorical attribute parsed leniently: values outside the recognized set are kept
/// verbatim in an `Unrecognized` variant so scoring can fail closed instead of rejecting
/// the record.
macro_rules! categorical {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($variant,)+
            Unrecognized(String),
        }

        impl $name {
            pub fn label(&self) -> &str {
                match self {
                    $(Self::$variant => $label,)+
                    Self::Unrecognized(raw) => raw.as_str(),
                }
            }

            pub fn is_recognized(&self) -> bool {
                !matches!(self, Self::Unrecognized(_))
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($label => Self::$variant,)+
                    _ => Self::Unrecognized(value),
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::from(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.label().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

categorical! {
    /// Headcount bucket reported by the applicant or lead.
    pub enum CompanySize {
        Micro => "1-10",
        Small => "11-50",
        Medium => "51-200",
        Large => "201-1000",
        Enterprise => "1000+",
    }
}

categorical! {
    pub enum Industry {
        Technology => "technology",
        Finance => "finance",
        Healthcare => "healthcare",
        Retail => "retail",
        Education => "education",
        Manufacturing => "manufacturing",
        Consulting => "consulting",
        RealEstate => "real_estate",
        Hospitality => "hospitality",
        Other => "other",
    }
}

categorical! {
    /// Acquisition channel for a sales lead.
    pub enum LeadSource {
        Organic => "organic",
        PaidAd => "paid_ad",
        Referral => "referral",
        SocialMedia => "social_media",
        EmailCampaign => "email_campaign",
        Website => "website",
    }
}

impl Default for CompanySize {
    fn default() -> Self {
        Self::Unrecognized(String::new())
    }
}

impl Default for Industry {
    fn default() -> Self {
        Self::Unrecognized(String::new())
    }
}

impl Default for LeadSource {
    fn default() -> Self {
        Self::Website
    }
}

/// Where a waitlist applicant heard about the product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistSource {
    #[default]
    Website,
    Referral,
    AdCampaign,
    SocialMedia,
    EmailCampaign,
    Event,
    Other,
}

impl WaitlistSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::Referral => "referral",
            Self::AdCampaign => "ad_campaign",
            Self::SocialMedia => "social_media",
            Self::EmailCampaign => "email_campaign",
            Self::Event => "event",
            Self::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WaitlistEntryId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LeadId(pub String);

impl fmt::Display for WaitlistEntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WaitlistEntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for LeadId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Lifecycle of a waitlist applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitlistStatus {
    Pending,
    Approved,
    Invited,
    Onboarded,
    Declined,
}

impl WaitlistStatus {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Pending,
            Self::Approved,
            Self::Invited,
            Self::Onboarded,
            Self::Declined,
        ]
    }

    /// Happy-path stages used for funnel reporting.
    pub const fn pipeline() -> [Self; 4] {
        [Self::Pending, Self::Approved, Self::Invited, Self::Onboarded]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Invited => "invited",
            Self::Onboarded => "onboarded",
            Self::Declined => "declined",
        }
    }
}

/// Sales status of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Unqualified,
    Converted,
    Lost,
}

impl LeadStatus {
    pub const fn ordered() -> [Self; 6] {
        [
            Self::New,
            Self::Contacted,
            Self::Qualified,
            Self::Unqualified,
            Self::Converted,
            Self::Lost,
        ]
    }

    pub const fn pipeline() -> [Self; 4] {
        [Self::New, Self::Contacted, Self::Qualified, Self::Converted]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Unqualified => "unqualified",
            Self::Converted => "converted",
            Self::Lost => "lost",
        }
    }

    /// Coarse marketing grouping. Always derived, never stored.
    pub const fn lifecycle_stage(self) -> LifecycleStage {
        match self {
            Self::New => LifecycleStage::Lead,
            Self::Contacted => LifecycleStage::MarketingQualified,
            Self::Qualified => LifecycleStage::SalesQualified,
            Self::Converted => LifecycleStage::Customer,
            Self::Unqualified | Self::Lost => LifecycleStage::Subscriber,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStage {
    Subscriber,
    Lead,
    MarketingQualified,
    SalesQualified,
    Customer,
}

impl LifecycleStage {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::Subscriber,
            Self::Lead,
            Self::MarketingQualified,
            Self::SalesQualified,
            Self::Customer,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Subscriber => "subscriber",
            Self::Lead => "lead",
            Self::MarketingQualified => "marketing_qualified",
            Self::SalesQualified => "sales_qualified",
            Self::Customer => "customer",
        }
    }
}

/// Waitlist applicant snapshot. Status and the per-status timestamps only change through
/// [`super::lifecycle::transition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitlistEntry {
    pub id: WaitlistEntryId,
    pub email: String,
    pub name: Option<String>,
    pub company: Option<String>,
    pub role: Option<String>,
    #[serde(default)]
    pub company_size: CompanySize,
    #[serde(default)]
    pub industry: Industry,
    #[serde(default)]
    pub source: WaitlistSource,
    pub verified: bool,
    pub notes: Option<String>,
    pub priority_score: u8,
    pub score_breakdown: WaitlistScoreBreakdown,
    #[serde(default)]
    pub position: Option<u32>,
    pub status: WaitlistStatus,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub invited_at: Option<DateTime<Utc>>,
    pub onboarded_at: Option<DateTime<Utc>>,
    pub declined_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    /// Issued the first time the entry is invited and never replaced.
    #[serde(default)]
    pub invite_code: Option<String>,
}

/// Attributes supplied by the public join form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaitlistApplication {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub company_size: CompanySize,
    #[serde(default)]
    pub industry: Industry,
    #[serde(default)]
    pub source: WaitlistSource,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update of the scoring and contact attributes of an entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct WaitlistAttributePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub company_size: Option<CompanySize>,
    #[serde(default)]
    pub industry: Option<Industry>,
    #[serde(default)]
    pub source: Option<WaitlistSource>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl WaitlistAttributePatch {
    /// Applies the patch and reports whether any scoring input changed.
    pub fn apply(self, entry: &mut WaitlistEntry) -> bool {
        let before = (
            entry.company_size.clone(),
            entry.industry.clone(),
            entry.role.clone(),
        );

        if let Some(name) = self.name {
            entry.name = Some(name);
        }
        if let Some(company) = self.company {
            entry.company = Some(company);
        }
        if let Some(role) = self.role {
            entry.role = Some(role);
        }
        if let Some(size) = self.company_size {
            entry.company_size = size;
        }
        if let Some(industry) = self.industry {
            entry.industry = industry;
        }
        if let Some(source) = self.source {
            entry.source = source;
        }
        if let Some(notes) = self.notes {
            entry.notes = Some(notes);
        }

        before
            != (
                entry.company_size.clone(),
                entry.industry.clone(),
                entry.role.clone(),
            )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimelineKind {
    Created,
    StatusChange,
    Note,
    Event,
    Assignment,
}

/// Append-only history line shown on a lead's detail view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub kind: TimelineKind,
    pub title: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadNote {
    pub body: String,
    pub author: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Tracked engagement such as a page view, download, or demo request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub name: String,
    #[serde(default)]
    pub page_url: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Sales lead snapshot. `lifecycle_stage` is derived from `status` on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub job_title: Option<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub industry: Industry,
    #[serde(default)]
    pub company_size: CompanySize,
    #[serde(default)]
    pub source: LeadSource,
    pub assigned_to: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub lead_score: u8,
    pub score_breakdown: LeadScoreBreakdown,
    pub status: LeadStatus,
    pub timeline: Vec<TimelineEntry>,
    pub notes: Vec<LeadNote>,
    pub events: Vec<EngagementEvent>,
    pub created_at: DateTime<Utc>,
    pub last_contacted_at: Option<DateTime<Utc>>,
    pub converted_at: Option<DateTime<Utc>>,
}

impl Lead {
    pub fn lifecycle_stage(&self) -> LifecycleStage {
        self.status.lifecycle_stage()
    }

    pub fn view(&self) -> LeadView<'_> {
        LeadView {
            lead: self,
            lifecycle_stage: self.lifecycle_stage(),
        }
    }
}

/// Wire shape of a lead: the stored fields plus the derived lifecycle stage.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LeadView<'a> {
    #[serde(flatten)]
    pub lead: &'a Lead,
    pub lifecycle_stage: LifecycleStage,
}

/// `serialize_with` adapter for fields holding a [`Lead`].
pub fn serialize_lead_view<S>(lead: &Lead, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    lead.view().serialize(serializer)
}

/// Public lead capture payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadCapture {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub industry: Option<Industry>,
    #[serde(default)]
    pub company_size: Option<CompanySize>,
    #[serde(default)]
    pub source: Option<LeadSource>,
}

impl LeadCapture {
    /// Copies non-empty submitted fields onto an existing lead.
    pub fn merge_into(self, lead: &mut Lead) {
        fn filled(value: Option<String>) -> Option<String> {
            value.filter(|raw| !raw.trim().is_empty())
        }

        let name = self.name.trim();
        if !name.is_empty() {
            lead.name = name.to_string();
        }
        if let Some(phone) = filled(self.phone) {
            lead.phone = Some(phone);
        }
        if let Some(company) = filled(self.company) {
            lead.company = Some(company);
        }
        if let Some(title) = filled(self.job_title) {
            lead.job_title = Some(title);
        }
        if let Some(location) = filled(self.location) {
            lead.location = Some(location);
        }
        if let Some(industry) = self.industry {
            lead.industry = industry;
        }
        if let Some(size) = self.company_size {
            lead.company_size = size;
        }
        if let Some(source) = self.source {
            lead.source = source;
        }
    }
}

/// Trims and lowercases an address, rejecting values without an `@`.
pub fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_ascii_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some(email)
}
