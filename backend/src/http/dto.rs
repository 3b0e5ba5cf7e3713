//! Data Transfer Objects for the HTTP API.
//!
//! Domain types that already serialize in the wire shape (calls, objections,
//! reports, jobs) are returned directly; this module only adds envelopes and
//! request bodies.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    Call, CallId, CoachingReport, Objection, Permission, Question, ShareGrant, ShareToken,
    TranscriptSegment,
};
use crate::services::ProcessOptions;

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Database connection status
    pub database: String,
}

// ==================== Sharing ====================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareBody {
    pub shared_with_email: String,
    #[serde(default = "default_permission")]
    pub permission: String,
    #[serde(default)]
    pub expires_in_days: Option<u32>,
}

fn default_permission() -> String {
    Permission::View.as_str().to_string()
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyShareQuery {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareSummary {
    pub share_token: ShareToken,
    pub share_url: String,
    pub shared_with_email: String,
    pub permission: Permission,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl ShareSummary {
    pub fn from_grant(grant: ShareGrant, share_url: String) -> Self {
        Self {
            share_token: grant.share_token,
            share_url,
            shared_with_email: grant.shared_with_email,
            permission: grant.permission,
            created_at: grant.created_at,
            expires_at: grant.expires_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShareListResponse {
    pub shares: Vec<ShareSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

// ==================== Calls & coaching ====================

#[derive(Debug, Clone, Serialize)]
pub struct CallListResponse {
    pub calls: Vec<Call>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallDetailResponse {
    pub call: Call,
    pub segments: Vec<TranscriptSegment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateDurationBody {
    /// Seconds.
    pub duration: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectionsResponse {
    pub call_id: CallId,
    pub objections: Vec<Objection>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsResponse {
    pub call_id: CallId,
    pub questions: Vec<Question>,
}

/// `report` is `null` when the call has not been coached yet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoachingReportResponse {
    pub call_id: CallId,
    pub report: Option<CoachingReport>,
}

/// Body of `POST /v1/calls/reprocess`. Without `callIds` every stored call
/// is reprocessed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprocessBody {
    #[serde(default)]
    pub call_ids: Option<Vec<CallId>>,
    #[serde(flatten)]
    pub options: ProcessOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReprocessResponse {
    pub job_id: String,
    pub message: String,
}
