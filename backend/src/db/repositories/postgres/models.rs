use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde_json::Value;

use super::schema::{calls, coaching_reports, objections, questions, share_grants, transcript_segments};
use crate::db::repository::{RepositoryError, RepositoryResult};
use crate::models::{
    Call, CallId, CallTimestamp, Objection, ObjectionCategory, Permission, Question, QuestionType,
    Severity, ShareGrant, ShareToken, Speaker, TranscriptSegment,
};

fn decode_error(what: &str, value: impl std::fmt::Display) -> RepositoryError {
    RepositoryError::internal(format!("Invalid stored {}: {}", what, value))
}

fn score_from_db(what: &str, value: i16) -> RepositoryResult<u8> {
    u8::try_from(value).map_err(|_| decode_error(what, value))
}

fn offset_from_db(value: i32) -> RepositoryResult<CallTimestamp> {
    u32::try_from(value)
        .map(CallTimestamp::from_seconds)
        .map_err(|_| decode_error("offset", value))
}

pub fn offset_to_db(ts: CallTimestamp) -> i32 {
    i32::try_from(ts.seconds()).unwrap_or(i32::MAX)
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = calls)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CallRow {
    pub call_id: i64,
    pub rep_name: String,
    pub customer_name: String,
    pub duration_sec: f64,
    pub checksum: String,
    pub created_at: DateTime<Utc>,
}

impl From<CallRow> for Call {
    fn from(row: CallRow) -> Self {
        Call {
            call_id: CallId(row.call_id),
            duration: row.duration_sec,
            rep_name: row.rep_name,
            customer_name: row.customer_name,
            checksum: row.checksum,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = calls)]
pub struct NewCallRow {
    pub rep_name: String,
    pub customer_name: String,
    pub duration_sec: f64,
    pub checksum: String,
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = transcript_segments)]
#[allow(dead_code)] // Key columns are only used for ordering
pub struct SegmentRow {
    pub call_id: i64,
    pub seq: i32,
    pub speaker: String,
    pub utterance: String,
    pub offset_sec: i32,
}

impl SegmentRow {
    pub fn into_segment(self) -> RepositoryResult<TranscriptSegment> {
        let speaker: Speaker = self
            .speaker
            .parse()
            .map_err(|_| decode_error("speaker", &self.speaker))?;
        Ok(TranscriptSegment {
            speaker,
            text: self.utterance,
            timestamp: offset_from_db(self.offset_sec)?,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = transcript_segments)]
pub struct NewSegmentRow {
    pub call_id: i64,
    pub seq: i32,
    pub speaker: String,
    pub utterance: String,
    pub offset_sec: i32,
}

impl NewSegmentRow {
    pub fn from_segment(call_id: i64, seq: usize, segment: &TranscriptSegment) -> Self {
        Self {
            call_id,
            seq: seq as i32,
            speaker: segment.speaker.as_str().to_string(),
            utterance: segment.text.clone(),
            offset_sec: offset_to_db(segment.timestamp),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = objections)]
#[allow(dead_code)]
pub struct ObjectionRow {
    pub objection_id: i64,
    pub call_id: i64,
    pub seq: i32,
    pub offset_sec: i32,
    pub customer_said: String,
    pub category: String,
    pub severity: String,
    pub rep_response: String,
    pub response_score: i16,
    pub suggested_responses: Value,
}

impl ObjectionRow {
    pub fn into_objection(self) -> RepositoryResult<Objection> {
        let category = ObjectionCategory::parse(&self.category)
            .ok_or_else(|| decode_error("objection category", &self.category))?;
        let severity = Severity::parse(&self.severity)
            .ok_or_else(|| decode_error("severity", &self.severity))?;
        let suggested_responses: Vec<String> = serde_json::from_value(self.suggested_responses)
            .map_err(|e| decode_error("suggested responses", e))?;
        Ok(Objection {
            timestamp: offset_from_db(self.offset_sec)?,
            customer_said: self.customer_said,
            category,
            severity,
            rep_response: self.rep_response,
            response_score: score_from_db("response score", self.response_score)?,
            suggested_responses,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = objections)]
pub struct NewObjectionRow {
    pub call_id: i64,
    pub seq: i32,
    pub offset_sec: i32,
    pub customer_said: String,
    pub category: String,
    pub severity: String,
    pub rep_response: String,
    pub response_score: i16,
    pub suggested_responses: Value,
}

impl NewObjectionRow {
    pub fn from_objection(call_id: i64, seq: usize, o: &Objection) -> Self {
        Self {
            call_id,
            seq: seq as i32,
            offset_sec: offset_to_db(o.timestamp),
            customer_said: o.customer_said.clone(),
            category: o.category.as_str().to_string(),
            severity: o.severity.as_str().to_string(),
            rep_response: o.rep_response.clone(),
            response_score: i16::from(o.response_score),
            suggested_responses: Value::from(o.suggested_responses.clone()),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = questions)]
#[allow(dead_code)]
pub struct QuestionRow {
    pub question_id: i64,
    pub call_id: i64,
    pub seq: i32,
    pub offset_sec: i32,
    pub question_text: String,
    pub question_type: String,
    pub quality_score: i16,
    pub why_good: Option<String>,
    pub why_bad: Option<String>,
    pub better_alternative: Option<String>,
}

impl QuestionRow {
    pub fn into_question(self) -> RepositoryResult<Question> {
        let question_type = QuestionType::parse(&self.question_type)
            .ok_or_else(|| decode_error("question type", &self.question_type))?;
        Ok(Question {
            timestamp: offset_from_db(self.offset_sec)?,
            question_text: self.question_text,
            question_type,
            quality_score: score_from_db("quality score", self.quality_score)?,
            why_good: self.why_good,
            why_bad: self.why_bad,
            better_alternative: self.better_alternative,
        })
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = questions)]
pub struct NewQuestionRow {
    pub call_id: i64,
    pub seq: i32,
    pub offset_sec: i32,
    pub question_text: String,
    pub question_type: String,
    pub quality_score: i16,
    pub why_good: Option<String>,
    pub why_bad: Option<String>,
    pub better_alternative: Option<String>,
}

impl NewQuestionRow {
    pub fn from_question(call_id: i64, seq: usize, q: &Question) -> Self {
        Self {
            call_id,
            seq: seq as i32,
            offset_sec: offset_to_db(q.timestamp),
            question_text: q.question_text.clone(),
            question_type: q.question_type.as_str().to_string(),
            quality_score: i16::from(q.quality_score),
            why_good: q.why_good.clone(),
            why_bad: q.why_bad.clone(),
            better_alternative: q.better_alternative.clone(),
        }
    }
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = coaching_reports)]
pub struct CoachingReportRow {
    pub call_id: i64,
    pub overall_score: i16,
    pub report_json: Value,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = share_grants)]
pub struct ShareGrantRow {
    pub share_token: String,
    pub owner_id: String,
    pub shared_with_email: String,
    pub permission: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&ShareGrant> for ShareGrantRow {
    fn from(g: &ShareGrant) -> Self {
        Self {
            share_token: g.share_token.as_str().to_string(),
            owner_id: g.owner_id.clone(),
            shared_with_email: g.shared_with_email.clone(),
            permission: g.permission.as_str().to_string(),
            created_at: g.created_at,
            expires_at: g.expires_at,
        }
    }
}

impl ShareGrantRow {
    pub fn into_grant(self) -> RepositoryResult<ShareGrant> {
        let permission: Permission = self
            .permission
            .parse()
            .map_err(|_| decode_error("permission", &self.permission))?;
        Ok(ShareGrant {
            share_token: ShareToken::new(self.share_token),
            owner_id: self.owner_id,
            shared_with_email: self.shared_with_email,
            permission,
            created_at: self.created_at,
            expires_at: self.expires_at,
        })
    }
}
