use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::bulk::BulkRequest;
use super::domain::{
    Lead, LeadCapture, LeadId, LeadStatus, WaitlistApplication, WaitlistAttributePatch,
    WaitlistEntry, WaitlistEntryId, WaitlistStatus,
};
use super::repository::{EntityFilter, EventPublisher, Repository};
use super::service::{FunnelServiceError, LeadService, WaitlistService};

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionRequest<S> {
    pub(crate) status: S,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VerifyRequest {
    pub(crate) token: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NoteRequest {
    pub(crate) body: String,
    #[serde(default)]
    pub(crate) author: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventRequest {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AssignRequest {
    pub(crate) assignee: String,
}

/// Router builder exposing the public join flow and the admin waitlist endpoints.
pub fn waitlist_router<R, P>(service: Arc<WaitlistService<R, P>>) -> Router
where
    R: Repository<WaitlistEntry> + 'static,
    P: EventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/waitlist/join", post(join_handler::<R, P>))
        .route("/api/v1/waitlist/verify", post(verify_handler::<R, P>))
        .route(
            "/api/v1/waitlist/status/:email",
            get(status_handler::<R, P>),
        )
        .route("/api/v1/waitlist/queue", get(queue_handler::<R, P>))
        .route("/api/v1/waitlist/entries", get(list_entries_handler::<R, P>))
        .route(
            "/api/v1/waitlist/entries/:entry_id",
            get(entry_handler::<R, P>).patch(update_entry_handler::<R, P>),
        )
        .route(
            "/api/v1/waitlist/entries/:entry_id/transition",
            post(transition_entry_handler::<R, P>),
        )
        .route("/api/v1/waitlist/bulk", post(bulk_entries_handler::<R, P>))
        .route("/api/v1/waitlist/stats", get(waitlist_stats_handler::<R, P>))
        .with_state(service)
}

/// Router builder exposing lead capture and the sales pipeline endpoints.
pub fn lead_router<R, P>(service: Arc<LeadService<R, P>>) -> Router
where
    R: Repository<Lead> + 'static,
    P: EventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/leads", get(list_leads_handler::<R, P>))
        .route("/api/v1/leads/capture", post(capture_handler::<R, P>))
        .route("/api/v1/leads/bulk", post(bulk_leads_handler::<R, P>))
        .route("/api/v1/leads/stats", get(lead_stats_handler::<R, P>))
        .route("/api/v1/leads/:lead_id", get(lead_handler::<R, P>))
        .route(
            "/api/v1/leads/:lead_id/transition",
            post(transition_lead_handler::<R, P>),
        )
        .route("/api/v1/leads/:lead_id/notes", post(note_handler::<R, P>))
        .route("/api/v1/leads/:lead_id/events", post(event_handler::<R, P>))
        .route("/api/v1/leads/:lead_id/assign", post(assign_handler::<R, P>))
        .with_state(service)
}

/// Maps a service error onto a status code and an `{"error": ...}` body.
pub(crate) fn error_response(err: FunnelServiceError) -> Response {
    let status = match &err {
        FunnelServiceError::InvalidTransition(_) => StatusCode::CONFLICT,
        FunnelServiceError::UnknownEntity { .. } => StatusCode::NOT_FOUND,
        FunnelServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FunnelServiceError::DuplicateEmail(_) => StatusCode::CONFLICT,
        FunnelServiceError::Persistence(_) => {
            error!(error = %err, "funnel request failed on storage");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}

fn respond<T>(status: StatusCode, result: Result<T, FunnelServiceError>) -> Response
where
    T: serde::Serialize,
{
    match result {
        Ok(body) => (status, axum::Json(body)).into_response(),
        Err(err) => error_response(err),
    }
}

/// Lead bodies carry the derived `lifecycle_stage` next to the stored fields.
fn respond_lead(status: StatusCode, result: Result<Lead, FunnelServiceError>) -> Response {
    match result {
        Ok(lead) => (status, axum::Json(lead.view())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn join_handler<R, P>(
    State(service): State<Arc<WaitlistService<R, P>>>,
    axum::Json(application): axum::Json<WaitlistApplication>,
) -> Response
where
    R: Repository<WaitlistEntry> + 'static,
    P: EventPublisher + 'static,
{
    respond(StatusCode::CREATED, service.join(application))
}

pub(crate) async fn verify_handler<R, P>(
    State(service): State<Arc<WaitlistService<R, P>>>,
    axum::Json(request): axum::Json<VerifyRequest>,
) -> Response
where
    R: Repository<WaitlistEntry> + 'static,
    P: EventPublisher + 'static,
{
    respond(StatusCode::OK, service.verify(&request.token))
}

pub(crate) async fn status_handler<R, P>(
    State(service): State<Arc<WaitlistService<R, P>>>,
    Path(email): Path<String>,
) -> Response
where
    R: Repository<WaitlistEntry> + 'static,
    P: EventPublisher + 'static,
{
    respond(StatusCode::OK, service.status_by_email(&email))
}

pub(crate) async fn queue_handler<R, P>(
    State(service): State<Arc<WaitlistService<R, P>>>,
) -> Response
where
    R: Repository<WaitlistEntry> + 'static,
    P: EventPublisher + 'static,
{
    match service.queue() {
        Ok(ranking) => (StatusCode::OK, axum::Json(ranking.as_ref().clone())).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_entries_handler<R, P>(
    State(service): State<Arc<WaitlistService<R, P>>>,
    Query(filter): Query<EntityFilter<WaitlistStatus>>,
) -> Response
where
    R: Repository<WaitlistEntry> + 'static,
    P: EventPublisher + 'static,
{
    match service.list(&filter) {
        Ok(entries) => {
            let payload = json!({
                "total": entries.len(),
                "entries": entries,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn entry_handler<R, P>(
    State(service): State<Arc<WaitlistService<R, P>>>,
    Path(entry_id): Path<String>,
) -> Response
where
    R: Repository<WaitlistEntry> + 'static,
    P: EventPublisher + 'static,
{
    respond(StatusCode::OK, service.get(&WaitlistEntryId(entry_id)))
}

pub(crate) async fn update_entry_handler<R, P>(
    State(service): State<Arc<WaitlistService<R, P>>>,
    Path(entry_id): Path<String>,
    axum::Json(patch): axum::Json<WaitlistAttributePatch>,
) -> Response
where
    R: Repository<WaitlistEntry> + 'static,
    P: EventPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.update_attributes(&WaitlistEntryId(entry_id), patch),
    )
}

pub(crate) async fn transition_entry_handler<R, P>(
    State(service): State<Arc<WaitlistService<R, P>>>,
    Path(entry_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest<WaitlistStatus>>,
) -> Response
where
    R: Repository<WaitlistEntry> + 'static,
    P: EventPublisher + 'static,
{
    respond(
        StatusCode::OK,
        service.transition(&WaitlistEntryId(entry_id), request.status),
    )
}

pub(crate) async fn bulk_entries_handler<R, P>(
    State(service): State<Arc<WaitlistService<R, P>>>,
    axum::Json(request): axum::Json<BulkRequest<WaitlistStatus>>,
) -> Response
where
    R: Repository<WaitlistEntry> + 'static,
    P: EventPublisher + 'static,
{
    let outcome = service.bulk(request.ids, request.operation);
    (StatusCode::OK, axum::Json(outcome)).into_response()
}

pub(crate) async fn waitlist_stats_handler<R, P>(
    State(service): State<Arc<WaitlistService<R, P>>>,
) -> Response
where
    R: Repository<WaitlistEntry> + 'static,
    P: EventPublisher + 'static,
{
    respond(StatusCode::OK, service.stats())
}

pub(crate) async fn capture_handler<R, P>(
    State(service): State<Arc<LeadService<R, P>>>,
    axum::Json(capture): axum::Json<LeadCapture>,
) -> Response
where
    R: Repository<Lead> + 'static,
    P: EventPublisher + 'static,
{
    match service.capture(capture) {
        Ok(outcome) => {
            let status = if outcome.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, axum::Json(outcome)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_leads_handler<R, P>(
    State(service): State<Arc<LeadService<R, P>>>,
    Query(filter): Query<EntityFilter<LeadStatus>>,
) -> Response
where
    R: Repository<Lead> + 'static,
    P: EventPublisher + 'static,
{
    match service.list(&filter) {
        Ok(leads) => {
            let views: Vec<_> = leads.iter().map(Lead::view).collect();
            let payload = json!({
                "total": views.len(),
                "leads": views,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn lead_handler<R, P>(
    State(service): State<Arc<LeadService<R, P>>>,
    Path(lead_id): Path<String>,
) -> Response
where
    R: Repository<Lead> + 'static,
    P: EventPublisher + 'static,
{
    respond_lead(StatusCode::OK, service.get(&LeadId(lead_id)))
}

pub(crate) async fn transition_lead_handler<R, P>(
    State(service): State<Arc<LeadService<R, P>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<TransitionRequest<LeadStatus>>,
) -> Response
where
    R: Repository<Lead> + 'static,
    P: EventPublisher + 'static,
{
    respond_lead(
        StatusCode::OK,
        service.transition(&LeadId(lead_id), request.status),
    )
}

pub(crate) async fn note_handler<R, P>(
    State(service): State<Arc<LeadService<R, P>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<NoteRequest>,
) -> Response
where
    R: Repository<Lead> + 'static,
    P: EventPublisher + 'static,
{
    respond_lead(
        StatusCode::CREATED,
        service.add_note(&LeadId(lead_id), &request.body, request.author),
    )
}

pub(crate) async fn event_handler<R, P>(
    State(service): State<Arc<LeadService<R, P>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<EventRequest>,
) -> Response
where
    R: Repository<Lead> + 'static,
    P: EventPublisher + 'static,
{
    respond_lead(
        StatusCode::CREATED,
        service.track_event(&LeadId(lead_id), &request.name, request.page_url),
    )
}

pub(crate) async fn assign_handler<R, P>(
    State(service): State<Arc<LeadService<R, P>>>,
    Path(lead_id): Path<String>,
    axum::Json(request): axum::Json<AssignRequest>,
) -> Response
where
    R: Repository<Lead> + 'static,
    P: EventPublisher + 'static,
{
    respond_lead(
        StatusCode::OK,
        service.assign(&LeadId(lead_id), &request.assignee),
    )
}

pub(crate) async fn bulk_leads_handler<R, P>(
    State(service): State<Arc<LeadService<R, P>>>,
    axum::Json(request): axum::Json<BulkRequest<LeadStatus>>,
) -> Response
where
    R: Repository<Lead> + 'static,
    P: EventPublisher + 'static,
{
    let outcome = service.bulk(request.ids, request.operation);
    (StatusCode::OK, axum::Json(outcome)).into_response()
}

pub(crate) async fn lead_stats_handler<R, P>(
    State(service): State<Arc<LeadService<R, P>>>,
) -> Response
where
    R: Repository<Lead> + 'static,
    P: EventPublisher + 'static,
{
    respond(StatusCode::OK, service.stats())
}
