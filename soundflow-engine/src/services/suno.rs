//! Render service client
//!
//! Submits generation jobs to a Suno-style HTTP API and fetches clip
//! status. Submission failures are fatal to the run; status fetch
//! failures are split into transient (network, non-2xx) and invalid
//! (unparseable body) so the poller can absorb both and keep going.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

use crate::models::GenerationDirective;

const DEFAULT_BASE_URL: &str = "https://studio-api.prod.suno.com/api/v2/external/hackmit";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Opaque render job identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Render job lifecycle state as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderState {
    Queued,
    Streaming,
    Complete,
    Error,
}

impl RenderState {
    /// Map a wire status string, treating anything unrecognized as queued
    pub fn from_wire(status: &str) -> Self {
        match status {
            "streaming" => RenderState::Streaming,
            "complete" => RenderState::Complete,
            "error" => RenderState::Error,
            _ => RenderState::Queued,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RenderState::Queued => "queued",
            RenderState::Streaming => "streaming",
            RenderState::Complete => "complete",
            RenderState::Error => "error",
        }
    }
}

/// One status observation for a render job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderStatus {
    pub job_id: JobId,
    pub state: RenderState,
    pub audio_url: Option<String>,
    pub title: Option<String>,
    pub image_url: Option<String>,
}

impl RenderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, RenderState::Complete | RenderState::Error)
    }

    /// A URL the player can open now, present from `streaming` onward
    pub fn playable_url(&self) -> Option<&str> {
        self.audio_url.as_deref().filter(|u| !u.is_empty())
    }
}

/// Submission errors, fatal to the run
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Render service rejected submission: {0}")]
    Rejected(String),

    #[error("Invalid response from render service")]
    InvalidResponse,

    #[error("Network error: {0}")]
    Network(String),
}

/// Status fetch errors, absorbed by the poller
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure or non-2xx reply; worth retrying on the next tick
    #[error("Transient fetch failure: {0}")]
    Transient(String),

    /// Body parsed but did not contain the expected clip
    #[error("Invalid clip status response")]
    Invalid,
}

/// Seam for the render service
pub trait RenderApi: Send + Sync {
    fn submit(
        &self,
        directive: &GenerationDirective,
        instrumental: bool,
    ) -> impl Future<Output = Result<JobId, RenderError>> + Send;

    fn fetch_status(
        &self,
        job_id: &JobId,
    ) -> impl Future<Output = Result<RenderStatus, FetchError>> + Send;
}

/// Parse the submission reply, expecting `{"id": "..."}`
pub fn parse_submit_reply(reply: &Value) -> Result<JobId, RenderError> {
    if let Some(id) = reply.get("id").and_then(|v| v.as_str()) {
        if !id.is_empty() {
            return Ok(JobId(id.to_string()));
        }
    }

    if let Some(detail) = reply.get("detail").and_then(|v| v.as_str()) {
        return Err(RenderError::Rejected(detail.to_string()));
    }

    Err(RenderError::InvalidResponse)
}

/// Parse a clips reply, picking the entry matching `job_id`
///
/// The endpoint returns an array of clip objects; only `id` and `status`
/// are required, the rest is metadata that fills in as the job advances.
pub fn parse_clip_reply(reply: &Value, job_id: &JobId) -> Result<RenderStatus, FetchError> {
    let clips = reply.as_array().ok_or(FetchError::Invalid)?;

    let clip = clips
        .iter()
        .find(|c| c.get("id").and_then(|v| v.as_str()) == Some(job_id.0.as_str()))
        .ok_or(FetchError::Invalid)?;

    let status = clip
        .get("status")
        .and_then(|v| v.as_str())
        .ok_or(FetchError::Invalid)?;

    let field = |name: &str| {
        clip.get(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(String::from)
    };

    Ok(RenderStatus {
        job_id: job_id.clone(),
        state: RenderState::from_wire(status),
        audio_url: field("audio_url"),
        title: field("title"),
        image_url: field("image_url"),
    })
}

/// Suno-style render service client
pub struct SunoClient {
    http_client: reqwest::Client,
    bearer_token: String,
    base_url: String,
}

impl SunoClient {
    pub fn new(bearer_token: String, base_url: Option<String>) -> Result<Self, RenderError> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RenderError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            bearer_token,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        })
    }
}

impl RenderApi for SunoClient {
    async fn submit(
        &self,
        directive: &GenerationDirective,
        instrumental: bool,
    ) -> Result<JobId, RenderError> {
        let body = json!({
            "topic": directive.render_prompt,
            "tags": directive.tags,
            "make_instrumental": instrumental,
        });

        tracing::debug!(
            tags = %directive.tags,
            instrumental,
            "Submitting render job"
        );

        let response = self
            .http_client
            .post(format!("{}/generate", self.base_url))
            .bearer_auth(&self.bearer_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| RenderError::Network(e.to_string()))?;

        let status = response.status();
        let reply: Value = response
            .json()
            .await
            .map_err(|_| RenderError::InvalidResponse)?;

        if !status.is_success() {
            let detail = reply
                .get("detail")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error");
            return Err(RenderError::Rejected(format!("{status}: {detail}")));
        }

        let job_id = parse_submit_reply(&reply)?;
        tracing::info!(job_id = %job_id, "Render job accepted");
        Ok(job_id)
    }

    async fn fetch_status(&self, job_id: &JobId) -> Result<RenderStatus, FetchError> {
        let response = self
            .http_client
            .get(format!("{}/clips", self.base_url))
            .query(&[("ids", job_id.0.as_str())])
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| FetchError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FetchError::Transient(format!(
                "clip status returned {}",
                response.status()
            )));
        }

        let reply: Value = response.json().await.map_err(|_| FetchError::Invalid)?;
        parse_clip_reply(&reply, job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_wire_status_is_queued() {
        assert_eq!(RenderState::from_wire("submitted"), RenderState::Queued);
        assert_eq!(RenderState::from_wire(""), RenderState::Queued);
        assert_eq!(RenderState::from_wire("streaming"), RenderState::Streaming);
        assert_eq!(RenderState::from_wire("complete"), RenderState::Complete);
        assert_eq!(RenderState::from_wire("error"), RenderState::Error);
    }

    #[test]
    fn submit_reply_yields_job_id() {
        let reply = json!({ "id": "clip-123" });
        assert_eq!(parse_submit_reply(&reply).unwrap(), JobId("clip-123".into()));
    }

    #[test]
    fn submit_reply_without_id_is_invalid() {
        assert!(matches!(
            parse_submit_reply(&json!({})),
            Err(RenderError::InvalidResponse)
        ));
        assert!(matches!(
            parse_submit_reply(&json!({ "id": "" })),
            Err(RenderError::InvalidResponse)
        ));
    }

    #[test]
    fn submit_reply_detail_is_rejection() {
        let reply = json!({ "detail": "rate limited" });
        match parse_submit_reply(&reply) {
            Err(RenderError::Rejected(msg)) => assert_eq!(msg, "rate limited"),
            other => panic!("expected Rejected, got {:?}", other.err()),
        }
    }

    #[test]
    fn clip_reply_matches_by_id() {
        let job_id = JobId("clip-1".into());
        let reply = json!([
            { "id": "other", "status": "complete", "audio_url": "https://x/a.mp3" },
            { "id": "clip-1", "status": "streaming", "audio_url": "https://x/b.mp3", "title": "Canopy" },
        ]);
        let status = parse_clip_reply(&reply, &job_id).unwrap();
        assert_eq!(status.state, RenderState::Streaming);
        assert_eq!(status.playable_url(), Some("https://x/b.mp3"));
        assert_eq!(status.title.as_deref(), Some("Canopy"));
        assert!(!status.is_terminal());
    }

    #[test]
    fn clip_reply_empty_audio_url_is_not_playable() {
        let job_id = JobId("clip-1".into());
        let reply = json!([{ "id": "clip-1", "status": "queued", "audio_url": "" }]);
        let status = parse_clip_reply(&reply, &job_id).unwrap();
        assert_eq!(status.state, RenderState::Queued);
        assert_eq!(status.playable_url(), None);
    }

    #[test]
    fn clip_reply_missing_entry_is_invalid() {
        let job_id = JobId("clip-1".into());
        assert!(matches!(
            parse_clip_reply(&json!([]), &job_id),
            Err(FetchError::Invalid)
        ));
        assert!(matches!(
            parse_clip_reply(&json!({ "clips": [] }), &job_id),
            Err(FetchError::Invalid)
        ));
        assert!(matches!(
            parse_clip_reply(&json!([{ "id": "clip-1" }]), &job_id),
            Err(FetchError::Invalid)
        ));
    }

    #[test]
    fn terminal_states() {
        let mk = |state| RenderStatus {
            job_id: JobId("j".into()),
            state,
            audio_url: None,
            title: None,
            image_url: None,
        };
        assert!(mk(RenderState::Complete).is_terminal());
        assert!(mk(RenderState::Error).is_terminal());
        assert!(!mk(RenderState::Streaming).is_terminal());
        assert!(!mk(RenderState::Queued).is_terminal());
    }
}
