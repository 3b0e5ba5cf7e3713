//! Clients for the external analysis and customer-profile capabilities.
//!
//! Both are injected into the pipeline as trait objects. The HTTP
//! implementations carry a bounded timeout; a timeout or a non-2xx answer is
//! reported as [`CoachError::UpstreamUnavailable`].

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::error::{CoachError, CoachResult};
use crate::models::{AnalysisPayload, Call, CallId, CustomerProfile, TranscriptSegment};

/// Default bound on every external call.
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

/// Produces the score/insight payload for one call.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    async fn analyze(
        &self,
        call: &Call,
        transcript: &[TranscriptSegment],
    ) -> CoachResult<AnalysisPayload>;
}

/// Optional enrichment about the customer on a call.
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    /// `Ok(None)` means the lookup ran and found nothing.
    async fn lookup(&self, call: &Call) -> CoachResult<Option<CustomerProfile>>;
}

/// Provider used when no analysis endpoint is configured. Every sub-score in
/// the resulting report is derived.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAnalysisProvider;

#[async_trait]
impl AnalysisProvider for NoAnalysisProvider {
    async fn analyze(
        &self,
        _call: &Call,
        _transcript: &[TranscriptSegment],
    ) -> CoachResult<AnalysisPayload> {
        Ok(AnalysisPayload::default())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoProfileLookup;

#[async_trait]
impl ProfileLookup for NoProfileLookup {
    async fn lookup(&self, _call: &Call) -> CoachResult<Option<CustomerProfile>> {
        Ok(None)
    }
}

fn build_client(timeout: Duration) -> CoachResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| CoachError::UpstreamUnavailable(format!("Failed to build HTTP client: {}", e)))
}

fn upstream_error(what: &str, err: reqwest::Error) -> CoachError {
    if err.is_timeout() {
        CoachError::UpstreamUnavailable(format!("{} timed out", what))
    } else {
        CoachError::UpstreamUnavailable(format!("{} failed: {}", what, err))
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisRequest<'a> {
    call_id: CallId,
    rep_name: &'a str,
    customer_name: &'a str,
    duration: f64,
    segments: &'a [TranscriptSegment],
}

/// JSON-over-HTTP analysis capability.
///
/// POSTs the transcript and expects an [`AnalysisPayload`] back.
pub struct HttpAnalysisProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpAnalysisProvider {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> CoachResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl AnalysisProvider for HttpAnalysisProvider {
    async fn analyze(
        &self,
        call: &Call,
        transcript: &[TranscriptSegment],
    ) -> CoachResult<AnalysisPayload> {
        log::debug!(
            "Requesting analysis for call {} ({} segments)",
            call.call_id,
            transcript.len()
        );

        let body = AnalysisRequest {
            call_id: call.call_id,
            rep_name: &call.rep_name,
            customer_name: &call.customer_name,
            duration: call.duration,
            segments: transcript,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| upstream_error("Analysis request", e))?;

        if !response.status().is_success() {
            return Err(CoachError::UpstreamUnavailable(format!(
                "Analysis service returned {}",
                response.status()
            )));
        }

        response
            .json::<AnalysisPayload>()
            .await
            .map_err(|e| upstream_error("Analysis response decoding", e))
    }
}

/// Customer profile lookup over HTTP: `GET {endpoint}?name=<customer>`.
///
/// A 404 answer means "no profile"; other failures are upstream errors.
pub struct HttpProfileLookup {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpProfileLookup {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> CoachResult<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl ProfileLookup for HttpProfileLookup {
    async fn lookup(&self, call: &Call) -> CoachResult<Option<CustomerProfile>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("name", call.customer_name.as_str())])
            .send()
            .await
            .map_err(|e| upstream_error("Profile lookup", e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(CoachError::UpstreamUnavailable(format!(
                "Profile service returned {}",
                response.status()
            )));
        }

        response
            .json::<CustomerProfile>()
            .await
            .map(Some)
            .map_err(|e| upstream_error("Profile response decoding", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn call() -> Call {
        Call {
            call_id: CallId::new(3),
            duration: 120.0,
            rep_name: "Dana".to_string(),
            customer_name: "Acme".to_string(),
            checksum: "abc".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_no_provider_returns_empty_payload() {
        let payload = NoAnalysisProvider.analyze(&call(), &[]).await.unwrap();
        assert!(payload.is_empty());
        assert!(NoProfileLookup.lookup(&call()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_upstream_unavailable() {
        // Port 9 on localhost is the discard service and is closed on test hosts.
        let provider =
            HttpAnalysisProvider::new("http://127.0.0.1:9/analyze", None, Duration::from_secs(2))
                .unwrap();
        let err = provider.analyze(&call(), &[]).await.unwrap_err();
        assert!(matches!(err, CoachError::UpstreamUnavailable(_)));
    }
}
