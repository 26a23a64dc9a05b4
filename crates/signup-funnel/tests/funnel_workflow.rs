//! Integration scenarios for the waitlist and lead funnel.
//!
//! Scenarios run through the public service facade and HTTP routers only: join and rank
//! applicants, walk them through the lifecycle, reconcile a partially failing bulk request
//! and read the pipeline summary back.

mod common {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use signup_funnel::workflows::funnel::{
        CompanySize, EntityFilter, EventPublisher, FunnelEvent, Industry, Lead, LeadCapture,
        LeadService, Lifecycle, Mutation, PublishError, Repository, RepositoryError,
        ScoreCalculator, UpdateError, WaitlistApplication, WaitlistEntry, WaitlistService,
        WaitlistSource,
    };

    pub(super) struct MemoryStore<E: Lifecycle> {
        records: Mutex<HashMap<E::Id, E>>,
    }

    impl<E: Lifecycle> Default for MemoryStore<E> {
        fn default() -> Self {
            Self {
                records: Mutex::new(HashMap::new()),
            }
        }
    }

    impl<E: Lifecycle> Repository<E> for MemoryStore<E> {
        fn insert(&self, entity: E) -> Result<E, RepositoryError> {
            let mut guard = self.records.lock().expect("store mutex poisoned");
            if guard.contains_key(entity.id())
                || guard
                    .values()
                    .any(|stored| stored.email().eq_ignore_ascii_case(entity.email()))
            {
                return Err(RepositoryError::Conflict);
            }
            guard.insert(entity.id().clone(), entity.clone());
            Ok(entity)
        }

        fn persist(&self, entity: E) -> Result<(), RepositoryError> {
            let mut guard = self.records.lock().expect("store mutex poisoned");
            if !guard.contains_key(entity.id()) {
                return Err(RepositoryError::NotFound);
            }
            guard.insert(entity.id().clone(), entity);
            Ok(())
        }

        fn update(&self, id: &E::Id, mutation: Mutation<'_, E>) -> Result<E, UpdateError> {
            let mut guard = self.records.lock().expect("store mutex poisoned");
            let current = guard.get(id).ok_or(RepositoryError::NotFound)?;
            let updated = mutation(current)?;
            guard.insert(id.clone(), updated.clone());
            Ok(updated)
        }

        fn fetch(&self, id: &E::Id) -> Result<Option<E>, RepositoryError> {
            Ok(self
                .records
                .lock()
                .expect("store mutex poisoned")
                .get(id)
                .cloned())
        }

        fn fetch_all(&self, filter: &EntityFilter<E::Status>) -> Result<Vec<E>, RepositoryError> {
            Ok(self
                .records
                .lock()
                .expect("store mutex poisoned")
                .values()
                .filter(|entity| filter.matches(*entity))
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    pub(super) struct RecordingPublisher {
        events: Mutex<Vec<FunnelEvent>>,
    }

    impl RecordingPublisher {
        pub(super) fn kinds(&self) -> Vec<String> {
            self.events
                .lock()
                .expect("publisher mutex poisoned")
                .iter()
                .map(|event| event.kind.clone())
                .collect()
        }
    }

    impl EventPublisher for RecordingPublisher {
        fn publish(&self, event: FunnelEvent) -> Result<(), PublishError> {
            self.events
                .lock()
                .expect("publisher mutex poisoned")
                .push(event);
            Ok(())
        }
    }

    pub(super) type Waitlist = WaitlistService<MemoryStore<WaitlistEntry>, RecordingPublisher>;
    pub(super) type Leads = LeadService<MemoryStore<Lead>, RecordingPublisher>;

    pub(super) fn waitlist() -> (
        Arc<Waitlist>,
        Arc<MemoryStore<WaitlistEntry>>,
        Arc<RecordingPublisher>,
    ) {
        let store = Arc::new(MemoryStore::default());
        let publisher = Arc::new(RecordingPublisher::default());
        let service = WaitlistService::new(
            store.clone(),
            publisher.clone(),
            Arc::new(ScoreCalculator::default()),
        );
        (Arc::new(service), store, publisher)
    }

    pub(super) fn leads() -> Arc<Leads> {
        Arc::new(LeadService::new(
            Arc::new(MemoryStore::default()),
            Arc::new(RecordingPublisher::default()),
            Arc::new(ScoreCalculator::default()),
        ))
    }

    pub(super) fn applicant(
        email: &str,
        size: CompanySize,
        industry: Industry,
        role: &str,
    ) -> WaitlistApplication {
        WaitlistApplication {
            email: email.to_string(),
            name: Some("Applicant".to_string()),
            company: Some("Prairie Labs".to_string()),
            role: Some(role.to_string()),
            company_size: size,
            industry,
            source: WaitlistSource::Website,
            notes: None,
        }
    }

    pub(super) fn lead_capture(email: &str) -> LeadCapture {
        LeadCapture {
            name: "Riley Brooks".to_string(),
            email: email.to_string(),
            company: Some("Cedar Health".to_string()),
            job_title: Some("Director of IT".to_string()),
            industry: Some(Industry::Healthcare),
            company_size: Some(CompanySize::Small),
            ..LeadCapture::default()
        }
    }
}

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use signup_funnel::workflows::funnel::{
    aggregate, lead_router, waitlist_router, BulkFailureReason, BulkOperation, CompanySize,
    EntityFilter, Industry, LeadStatus, Repository, WaitlistStatus,
};

use common::*;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("json payload")
}

#[test]
fn applicants_move_through_the_waitlist_lifecycle() {
    let (service, _, publisher) = waitlist();

    let ceo = service
        .join(applicant(
            "ceo@prairie.example",
            CompanySize::Medium,
            Industry::Technology,
            "CEO",
        ))
        .expect("ceo joins");
    let analyst = service
        .join(applicant(
            "analyst@prairie.example",
            CompanySize::Small,
            Industry::Retail,
            "Data Analyst",
        ))
        .expect("analyst joins");

    assert_eq!(ceo.priority_score, 88);
    assert_eq!(analyst.priority_score, 40);
    assert_eq!(service.get(&ceo.id).expect("ceo").position, Some(1));
    assert_eq!(service.get(&analyst.id).expect("analyst").position, Some(2));

    for target in [
        WaitlistStatus::Approved,
        WaitlistStatus::Invited,
        WaitlistStatus::Onboarded,
    ] {
        service.transition(&ceo.id, target).expect("legal step");
    }
    let onboarded = service.get(&ceo.id).expect("ceo");
    assert!(onboarded.approved_at.is_some());
    assert!(onboarded.invited_at.is_some());
    assert!(onboarded.onboarded_at.is_some());
    assert_eq!(onboarded.position, None);
    assert!(service
        .transition(&ceo.id, WaitlistStatus::Declined)
        .is_err());

    assert_eq!(service.get(&analyst.id).expect("analyst").position, Some(1));
    assert_eq!(
        publisher.kinds(),
        vec![
            "waitlist_join",
            "waitlist_join",
            "waitlist_approved",
            "waitlist_invited",
            "waitlist_onboarded",
        ]
    );
}

#[test]
fn bulk_approval_skips_terminal_entries_without_rollback() {
    let (service, store, _) = waitlist();
    let mut ids = Vec::new();
    for email in ["a@x.example", "b@x.example", "c@x.example"] {
        let entry = service
            .join(applicant(email, CompanySize::Large, Industry::Finance, "VP"))
            .expect("join");
        ids.push(entry.id);
    }
    for target in [
        WaitlistStatus::Approved,
        WaitlistStatus::Invited,
        WaitlistStatus::Onboarded,
    ] {
        service.transition(&ids[1], target).expect("onboard b");
    }

    let outcome = service.bulk(
        ids.iter().map(|id| id.0.clone()).collect(),
        BulkOperation::Transition(WaitlistStatus::Approved),
    );

    assert_eq!(outcome.succeeded, 2);
    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].id, ids[1].0);
    assert_eq!(outcome.failures[0].reason, BulkFailureReason::InvalidTransition);

    let approved = store
        .fetch_all(&EntityFilter::with_status(WaitlistStatus::Approved))
        .expect("fetch approved");
    assert_eq!(approved.len(), 2);
}

#[test]
fn lead_pipeline_reports_stage_conversion() {
    let service = leads();
    let mut ids = Vec::new();
    for index in 0..10 {
        let outcome = service
            .capture(lead_capture(&format!("lead{index}@cedar.example")))
            .expect("capture");
        ids.push(outcome.lead.id);
    }

    for id in &ids[..4] {
        service.transition(id, LeadStatus::Contacted).expect("contact");
    }
    service
        .transition(&ids[0], LeadStatus::Qualified)
        .expect("qualify");

    let stats = service.stats().expect("stats");
    let counts: Vec<usize> = stats.pipeline.stages.iter().map(|stage| stage.count).collect();
    assert_eq!(counts, vec![6, 3, 1, 0]);
    let rates: Vec<u32> = stats
        .pipeline
        .conversions
        .iter()
        .map(|conversion| conversion.rate_percent)
        .collect();
    assert_eq!(rates, vec![50, 33, 0]);
    assert_eq!(stats.qualification_rate, 10.0);

    let summary = aggregate(
        &LeadStatus::pipeline(),
        [
            std::iter::repeat(LeadStatus::New).take(100).collect::<Vec<_>>(),
            std::iter::repeat(LeadStatus::Contacted).take(40).collect(),
            std::iter::repeat(LeadStatus::Qualified).take(10).collect(),
            std::iter::repeat(LeadStatus::Converted).take(2).collect(),
        ]
        .concat(),
    );
    let rates: Vec<u32> = summary
        .conversions
        .iter()
        .map(|conversion| conversion.rate_percent)
        .collect();
    assert_eq!(rates, vec![40, 25, 20]);
}

#[tokio::test]
async fn http_surface_exposes_join_status_and_bulk() {
    let (service, _, _) = waitlist();
    let router = waitlist_router(service.clone()).merge(lead_router(leads()));

    let join = Request::post("/api/v1/waitlist/join")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "email": "Founder@Startup.example",
                "role": "Co-Founder",
                "company_size": "11-50",
                "industry": "healthcare",
            })
            .to_string(),
        ))
        .expect("request builds");
    let response = router.clone().oneshot(join).await.expect("join executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let joined = body_json(response).await;
    assert_eq!(joined["priority_score"], 80);
    assert_eq!(joined["score_breakdown"]["role_fit"], 30);

    let status = Request::get("/api/v1/waitlist/status/founder@startup.example")
        .body(Body::empty())
        .expect("request builds");
    let response = router.clone().oneshot(status).await.expect("status executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["position"], 1);

    let bulk = Request::post("/api/v1/waitlist/bulk")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({
                "ids": [joined["id"], "wl-unknown"],
                "operation": { "kind": "refresh_score" },
            })
            .to_string(),
        ))
        .expect("request builds");
    let response = router.clone().oneshot(bulk).await.expect("bulk executes");
    assert_eq!(response.status(), StatusCode::OK);
    let outcome = body_json(response).await;
    assert_eq!(outcome["succeeded"], 1);
    assert_eq!(outcome["failures"][0]["reason"], "UnknownEntity");

    let capture = Request::post("/api/v1/leads/capture")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "name": "Riley", "email": "riley@cedar.example" }).to_string(),
        ))
        .expect("request builds");
    let response = router.oneshot(capture).await.expect("capture executes");
    assert_eq!(response.status(), StatusCode::CREATED);
    let captured = body_json(response).await;
    assert_eq!(captured["created"], true);
    assert_eq!(captured["lead"]["status"], "new");
    assert_eq!(captured["lead"]["lifecycle_stage"], "lead");
}
