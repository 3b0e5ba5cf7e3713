//! In-memory local repository implementation.
//!
//! All data lives in one `RwLock`-guarded struct of maps. Every write that
//! touches more than one map (a call plus its transcript, a coaching replace,
//! a share plus its owner index entry) happens under a single write guard, so
//! readers never observe a half-applied change.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use crate::db::repository::*;
use crate::models::{
    Call, CallId, CallTimestamp, CoachingArtifacts, CoachingReport, NewCall, Objection, Question,
    ShareGrant, ShareToken, TranscriptSegment,
};

/// In-memory local repository for tests and local development.
///
/// # Example
/// ```
/// use call_coach::db::repositories::LocalRepository;
/// use call_coach::db::CallRepository;
///
/// # tokio_test_block(async {
/// let repo = LocalRepository::new();
/// assert!(repo.list_calls().await.unwrap().is_empty());
/// # });
/// # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Runtime::new().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct CoachingRecord {
    objections: Vec<Objection>,
    questions: Vec<Question>,
    report: CoachingReport,
}

struct LocalData {
    calls: BTreeMap<CallId, Call>,
    transcripts: HashMap<CallId, Vec<TranscriptSegment>>,
    coaching: HashMap<CallId, CoachingRecord>,

    shares: HashMap<ShareToken, ShareGrant>,
    owner_index: BTreeSet<(String, ShareToken)>,

    next_call_id: i64,
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            calls: BTreeMap::new(),
            transcripts: HashMap::new(),
            coaching: HashMap::new(),
            shares: HashMap::new(),
            owner_index: BTreeSet::new(),
            next_call_id: 1,
            is_healthy: true,
        }
    }
}

impl LocalData {
    fn call(&self, call_id: CallId, operation: &str) -> RepositoryResult<&Call> {
        self.calls.get(&call_id).ok_or_else(|| not_found(call_id, operation))
    }
}

fn not_found(call_id: CallId, operation: &str) -> RepositoryError {
    RepositoryError::not_found_with_context(
        format!("Call {} not found", call_id),
        ErrorContext::new(operation)
            .with_entity("call")
            .with_entity_id(call_id),
    )
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    pub fn call_count(&self) -> usize {
        self.data.read().calls.len()
    }

    /// Number of owner index entries, for checking index consistency in tests.
    pub fn share_index_len(&self) -> usize {
        self.data.read().owner_index.len()
    }

    /// Drop a grant's primary record but leave its index entry, simulating a
    /// crash between the two writes of a non-atomic store.
    pub fn remove_share_record_only(&self, token: &ShareToken) {
        self.data.write().shares.remove(token);
    }

    /// Helper to check health and return error if unhealthy.
    fn check_health(&self) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection("Database is not healthy"));
        }
        Ok(())
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CallRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn store_call(&self, call: &NewCall, checksum: &str) -> RepositoryResult<Call> {
        self.check_health()?;
        let mut data = self.data.write();

        if let Some(existing) = data.calls.values().find(|c| c.checksum == checksum) {
            return Ok(existing.clone());
        }

        let call_id = CallId(data.next_call_id);
        data.next_call_id += 1;

        let stored = Call {
            call_id,
            duration: call.duration,
            rep_name: call.rep_name.clone(),
            customer_name: call.customer_name.clone(),
            checksum: checksum.to_string(),
            created_at: Utc::now(),
        };
        data.calls.insert(call_id, stored.clone());
        data.transcripts.insert(call_id, call.segments.clone());
        Ok(stored)
    }

    async fn get_call(&self, call_id: CallId) -> RepositoryResult<Call> {
        self.check_health()?;
        self.data.read().call(call_id, "get_call").cloned()
    }

    async fn list_calls(&self) -> RepositoryResult<Vec<Call>> {
        self.check_health()?;
        Ok(self.data.read().calls.values().cloned().collect())
    }

    async fn get_transcript(&self, call_id: CallId) -> RepositoryResult<Vec<TranscriptSegment>> {
        self.check_health()?;
        let data = self.data.read();
        data.call(call_id, "get_transcript")?;
        Ok(data.transcripts.get(&call_id).cloned().unwrap_or_default())
    }

    async fn update_call_duration(&self, call_id: CallId, duration: f64) -> RepositoryResult<Call> {
        self.check_health()?;
        let mut data = self.data.write();
        let call = data
            .calls
            .get_mut(&call_id)
            .ok_or_else(|| not_found(call_id, "update_call_duration"))?;
        call.duration = duration;
        Ok(call.clone())
    }

    async fn update_transcript_timestamps(
        &self,
        call_id: CallId,
        timestamps: &[CallTimestamp],
    ) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        data.call(call_id, "update_transcript_timestamps")?;
        let segments = data.transcripts.entry(call_id).or_default();
        if segments.len() != timestamps.len() {
            return Err(RepositoryError::validation_with_context(
                format!(
                    "expected {} timestamps, got {}",
                    segments.len(),
                    timestamps.len()
                ),
                ErrorContext::new("update_transcript_timestamps").with_entity_id(call_id),
            ));
        }
        for (segment, ts) in segments.iter_mut().zip(timestamps) {
            segment.timestamp = *ts;
        }
        Ok(())
    }
}

#[async_trait]
impl CoachingRepository for LocalRepository {
    async fn replace_coaching_artifacts(
        &self,
        call_id: CallId,
        artifacts: &CoachingArtifacts,
    ) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        data.call(call_id, "replace_coaching_artifacts")?;
        data.coaching.insert(
            call_id,
            CoachingRecord {
                objections: artifacts.objections.clone(),
                questions: artifacts.questions.clone(),
                report: artifacts.report.clone(),
            },
        );
        Ok(())
    }

    async fn fetch_objections(&self, call_id: CallId) -> RepositoryResult<Vec<Objection>> {
        self.check_health()?;
        let data = self.data.read();
        data.call(call_id, "fetch_objections")?;
        Ok(data
            .coaching
            .get(&call_id)
            .map(|r| r.objections.clone())
            .unwrap_or_default())
    }

    async fn fetch_questions(&self, call_id: CallId) -> RepositoryResult<Vec<Question>> {
        self.check_health()?;
        let data = self.data.read();
        data.call(call_id, "fetch_questions")?;
        Ok(data
            .coaching
            .get(&call_id)
            .map(|r| r.questions.clone())
            .unwrap_or_default())
    }

    async fn fetch_coaching_report(
        &self,
        call_id: CallId,
    ) -> RepositoryResult<Option<CoachingReport>> {
        self.check_health()?;
        let data = self.data.read();
        data.call(call_id, "fetch_coaching_report")?;
        Ok(data.coaching.get(&call_id).map(|r| r.report.clone()))
    }
}

#[async_trait]
impl ShareRepository for LocalRepository {
    async fn insert_share(&self, grant: &ShareGrant) -> RepositoryResult<()> {
        self.check_health()?;
        let mut data = self.data.write();
        if data.shares.contains_key(&grant.share_token) {
            return Err(RepositoryError::conflict_with_context(
                "share token already exists",
                ErrorContext::new("insert_share").with_entity("share_grant"),
            ));
        }
        data.owner_index
            .insert((grant.owner_id.clone(), grant.share_token.clone()));
        data.shares.insert(grant.share_token.clone(), grant.clone());
        Ok(())
    }

    async fn get_share(&self, token: &ShareToken) -> RepositoryResult<Option<ShareGrant>> {
        self.check_health()?;
        Ok(self.data.read().shares.get(token).cloned())
    }

    async fn list_shares_for_owner(&self, owner_id: &str) -> RepositoryResult<Vec<ShareGrant>> {
        self.check_health()?;
        let data = self.data.read();
        let mut grants: Vec<ShareGrant> = data
            .owner_index
            .iter()
            .filter(|(owner, _)| owner == owner_id)
            .filter_map(|(_, token)| data.shares.get(token).cloned())
            .collect();
        grants.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.share_token.cmp(&b.share_token))
        });
        Ok(grants)
    }

    async fn delete_share(
        &self,
        token: &ShareToken,
        owner_id: &str,
    ) -> RepositoryResult<ShareDeletion> {
        self.check_health()?;
        let mut data = self.data.write();
        let grant_owner = data.shares.get(token).map(|g| g.owner_id.clone());
        let outcome = match grant_owner {
            None => ShareDeletion::Missing,
            Some(owner) if owner != owner_id => ShareDeletion::NotOwner,
            Some(_) => {
                data.shares.remove(token);
                ShareDeletion::Deleted
            }
        };
        // A dangling index entry for a missing record is cleaned up as well.
        if outcome != ShareDeletion::NotOwner {
            data.owner_index
                .remove(&(owner_id.to_string(), token.clone()));
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Permission, Speaker};

    fn new_call(rep: &str) -> NewCall {
        NewCall {
            rep_name: rep.to_string(),
            customer_name: "Acme".to_string(),
            duration: 60.0,
            segments: vec![
                TranscriptSegment::new(Speaker::Representative, "Hi?", CallTimestamp::ZERO),
                TranscriptSegment::new(Speaker::Customer, "Hello", CallTimestamp::ZERO),
            ],
        }
    }

    fn grant(token: &str, owner: &str) -> ShareGrant {
        ShareGrant {
            share_token: ShareToken::new(token),
            owner_id: owner.to_string(),
            shared_with_email: "viewer@example.com".to_string(),
            permission: Permission::View,
            created_at: Utc::now(),
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn test_store_call_is_idempotent_by_checksum() {
        let repo = LocalRepository::new();
        let a = repo.store_call(&new_call("Dana"), "abc").await.unwrap();
        let b = repo.store_call(&new_call("Dana"), "abc").await.unwrap();
        assert_eq!(a.call_id, b.call_id);
        assert_eq!(repo.call_count(), 1);

        let c = repo.store_call(&new_call("Lee"), "def").await.unwrap();
        assert_ne!(a.call_id, c.call_id);
    }

    #[tokio::test]
    async fn test_missing_call_is_not_found() {
        let repo = LocalRepository::new();
        let err = repo.get_call(CallId(99)).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(repo.fetch_objections(CallId(99)).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_timestamp_update_requires_matching_length() {
        let repo = LocalRepository::new();
        let call = repo.store_call(&new_call("Dana"), "abc").await.unwrap();

        let err = repo
            .update_transcript_timestamps(call.call_id, &[CallTimestamp::ZERO])
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError { .. }));

        repo.update_transcript_timestamps(
            call.call_id,
            &[CallTimestamp::ZERO, CallTimestamp::from_seconds(12)],
        )
        .await
        .unwrap();
        let segments = repo.get_transcript(call.call_id).await.unwrap();
        assert_eq!(segments[1].timestamp.seconds(), 12);
    }

    #[tokio::test]
    async fn test_unhealthy_repository_fails() {
        let repo = LocalRepository::new();
        repo.set_healthy(false);
        assert!(!repo.health_check().await.unwrap());
        let err = repo.list_calls().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_share_index_stays_consistent() {
        let repo = LocalRepository::new();
        repo.insert_share(&grant("t1", "owner-a")).await.unwrap();
        repo.insert_share(&grant("t2", "owner-a")).await.unwrap();
        repo.insert_share(&grant("t3", "owner-b")).await.unwrap();

        let err = repo.insert_share(&grant("t1", "owner-b")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::ConflictError { .. }));

        assert_eq!(repo.list_shares_for_owner("owner-a").await.unwrap().len(), 2);

        let t1 = ShareToken::new("t1");
        assert_eq!(
            repo.delete_share(&t1, "owner-b").await.unwrap(),
            ShareDeletion::NotOwner
        );
        assert_eq!(
            repo.delete_share(&t1, "owner-a").await.unwrap(),
            ShareDeletion::Deleted
        );
        assert_eq!(
            repo.delete_share(&t1, "owner-a").await.unwrap(),
            ShareDeletion::Missing
        );
        assert_eq!(repo.share_index_len(), 2);
    }

    #[tokio::test]
    async fn test_dangling_index_entry_is_skipped() {
        let repo = LocalRepository::new();
        repo.insert_share(&grant("t1", "owner-a")).await.unwrap();
        repo.remove_share_record_only(&ShareToken::new("t1"));

        assert!(repo.list_shares_for_owner("owner-a").await.unwrap().is_empty());
        assert_eq!(
            repo.delete_share(&ShareToken::new("t1"), "owner-a").await.unwrap(),
            ShareDeletion::Missing
        );
        assert_eq!(repo.share_index_len(), 0);
    }
}
