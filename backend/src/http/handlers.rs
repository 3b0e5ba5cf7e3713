//! HTTP handlers for the REST API.
//!
//! Handlers parse the request, delegate to the service layer and wrap the
//! result in a DTO. They hold no business logic.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use chrono::Utc;
use futures::stream::Stream;
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use std::time::Duration;

use super::dto::{
    CallDetailResponse, CallListResponse, CoachingReportResponse, CreateShareBody, HealthResponse,
    ObjectionsResponse, QuestionsResponse, ReprocessBody, ReprocessResponse, ShareListResponse,
    ShareSummary, SuccessResponse, UpdateDurationBody, VerifyShareQuery,
};
use super::error::AppError;
use super::state::AppState;
use crate::auth::AuthUser;
use crate::db::services as db_services;
use crate::models::{Call, CallId, NewCall, ShareToken};
use crate::services::{
    run_reprocess_job, CoachingSummary, CreateShareRequest, CreatedShare, Job, ProcessOptions,
    ReprocessTarget, ShareVerification,
};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

/// Empty body means "all defaults".
fn optional_json<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))
}

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status,
    }))
}

// =============================================================================
// Sharing
// =============================================================================

/// POST /share/create
pub async fn create_share(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<CreateShareBody>, JsonRejection>,
) -> HandlerResult<CreatedShare> {
    let Json(body) = body?;
    let created = state
        .shares
        .create_share(
            &user,
            CreateShareRequest {
                shared_with_email: body.shared_with_email,
                permission: body.permission,
                expires_in_days: body.expires_in_days,
            },
            Utc::now(),
        )
        .await?;
    Ok(Json(created))
}

/// GET /share/verify/{token}?email=
///
/// Public: this is how a viewer opens a shared dashboard.
pub async fn verify_share(
    State(state): State<AppState>,
    Path(token): Path<String>,
    query: Result<Query<VerifyShareQuery>, QueryRejection>,
) -> HandlerResult<ShareVerification> {
    let Query(query) = query?;
    let verification = state
        .shares
        .verify_share(&ShareToken::new(token), query.email.as_deref(), Utc::now())
        .await?;
    Ok(Json(verification))
}

/// GET /shares/my
pub async fn list_my_shares(
    State(state): State<AppState>,
    user: AuthUser,
) -> HandlerResult<ShareListResponse> {
    let grants = state.shares.list_shares(&user).await?;
    let shares = grants
        .into_iter()
        .map(|g| {
            let url = state.shares.share_url(&g.share_token);
            ShareSummary::from_grant(g, url)
        })
        .collect();
    Ok(Json(ShareListResponse { shares }))
}

/// DELETE /share/{token}
pub async fn revoke_share(
    State(state): State<AppState>,
    user: AuthUser,
    Path(token): Path<String>,
) -> HandlerResult<SuccessResponse> {
    state
        .shares
        .revoke_share(&user, &ShareToken::new(token))
        .await?;
    Ok(Json(SuccessResponse { success: true }))
}

// =============================================================================
// Calls
// =============================================================================

/// GET /v1/calls
pub async fn list_calls(State(state): State<AppState>) -> HandlerResult<CallListResponse> {
    let calls = db_services::list_calls(state.repository.as_ref()).await?;
    let total = calls.len();
    Ok(Json(CallListResponse { calls, total }))
}

/// POST /v1/calls
///
/// Uploading an identical transcript again returns the existing call.
pub async fn create_call(
    State(state): State<AppState>,
    body: Result<Json<NewCall>, JsonRejection>,
) -> Result<(StatusCode, Json<Call>), AppError> {
    let Json(new_call) = body?;
    let call = db_services::store_call(state.repository.as_ref(), &new_call).await?;
    Ok((StatusCode::CREATED, Json(call)))
}

/// GET /v1/calls/{call_id}
pub async fn get_call(
    State(state): State<AppState>,
    Path(call_id): Path<i64>,
) -> HandlerResult<CallDetailResponse> {
    let call_id = CallId::new(call_id);
    let repo = state.repository.as_ref();
    let call = db_services::get_call(repo, call_id).await?;
    let segments = db_services::get_transcript(repo, call_id).await?;
    Ok(Json(CallDetailResponse { call, segments }))
}

/// PUT /v1/calls/{call_id}/duration
///
/// Shortening a call redistributes its offsets and recoaches it if needed.
pub async fn update_call_duration(
    State(state): State<AppState>,
    Path(call_id): Path<i64>,
    body: Result<Json<UpdateDurationBody>, JsonRejection>,
) -> HandlerResult<Call> {
    let Json(body) = body?;
    let call = state
        .pipeline
        .update_call_duration(CallId::new(call_id), body.duration)
        .await?;
    Ok(Json(call))
}

// =============================================================================
// Coaching
// =============================================================================

/// POST /v1/calls/{call_id}/coaching
///
/// Body is optional; see [`ProcessOptions`].
pub async fn process_call(
    State(state): State<AppState>,
    Path(call_id): Path<i64>,
    body: Bytes,
) -> HandlerResult<CoachingSummary> {
    let options: ProcessOptions = optional_json(&body)?;
    let summary = state
        .pipeline
        .process_call(CallId::new(call_id), &options)
        .await?;
    tracing::info!(
        "Coached call {} ({} objections, {} questions)",
        call_id,
        summary.objection_count,
        summary.question_count
    );
    Ok(Json(summary))
}

/// GET /v1/calls/{call_id}/objections
pub async fn get_objections(
    State(state): State<AppState>,
    Path(call_id): Path<i64>,
) -> HandlerResult<ObjectionsResponse> {
    let call_id = CallId::new(call_id);
    let objections = db_services::fetch_objections(state.repository.as_ref(), call_id).await?;
    Ok(Json(ObjectionsResponse { call_id, objections }))
}

/// GET /v1/calls/{call_id}/questions
pub async fn get_questions(
    State(state): State<AppState>,
    Path(call_id): Path<i64>,
) -> HandlerResult<QuestionsResponse> {
    let call_id = CallId::new(call_id);
    let questions = db_services::fetch_questions(state.repository.as_ref(), call_id).await?;
    Ok(Json(QuestionsResponse { call_id, questions }))
}

/// GET /v1/calls/{call_id}/coaching-report
pub async fn get_coaching_report(
    State(state): State<AppState>,
    Path(call_id): Path<i64>,
) -> HandlerResult<CoachingReportResponse> {
    let call_id = CallId::new(call_id);
    let report = db_services::fetch_coaching_report(state.repository.as_ref(), call_id).await?;
    Ok(Json(CoachingReportResponse { call_id, report }))
}

// =============================================================================
// Async Job Management
// =============================================================================

/// POST /v1/calls/reprocess
///
/// Starts a background job and returns its id immediately.
pub async fn reprocess_calls(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<ReprocessResponse>), AppError> {
    let body: ReprocessBody = optional_json(&body)?;
    let (target, total) = match body.call_ids {
        Some(ids) => {
            let total = ids.len();
            (ReprocessTarget::Calls(ids), total)
        }
        None => (ReprocessTarget::All, 0),
    };

    let job_id = state.job_tracker.create_job(total);
    let tracker = state.job_tracker.clone();
    let pipeline = state.pipeline.clone();
    let options = body.options;
    let spawned_id = job_id.clone();

    tokio::spawn(async move {
        run_reprocess_job(spawned_id, tracker, pipeline, target, options).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ReprocessResponse {
            message: format!(
                "Reprocessing started. Track progress at /v1/jobs/{}/logs",
                job_id
            ),
            job_id,
        }),
    ))
}

/// GET /v1/jobs/{job_id}
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> HandlerResult<Job> {
    state
        .job_tracker
        .get_job(&job_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))
}

/// GET /v1/jobs/{job_id}/logs
///
/// Stream job logs via Server-Sent Events (SSE). Ends with a `complete`
/// event carrying the final status and result.
pub async fn stream_job_logs(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    if state.job_tracker.get_job(&job_id).is_none() {
        return Err(AppError::NotFound(format!("Job {} not found", job_id)));
    }

    let tracker = state.job_tracker.clone();
    let stream = async_stream::stream! {
        let mut sent = 0;
        loop {
            let fresh = tracker.logs_since(&job_id, sent);
            sent += fresh.len();
            for entry in fresh {
                let data = serde_json::to_string(&entry).unwrap_or_default();
                yield Ok(Event::default().data(data));
            }

            match tracker.get_job(&job_id) {
                Some(job) if job.is_finished() => {
                    // Drain lines logged between the read above and completion.
                    for entry in tracker.logs_since(&job_id, sent) {
                        let data = serde_json::to_string(&entry).unwrap_or_default();
                        yield Ok(Event::default().data(data));
                    }
                    let final_event = serde_json::json!({
                        "status": job.status,
                        "result": job.result,
                    });
                    yield Ok(Event::default()
                        .event("complete")
                        .data(final_event.to_string()));
                    break;
                }
                Some(_) => {}
                None => break,
            }

            tokio::time::sleep(Duration::from_millis(200)).await;
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(1))
            .text("keep-alive"),
    ))
}
