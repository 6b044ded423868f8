//! Scripted fakes for orchestration tests
//!
//! These stand in for the reasoning model, the render service, and the
//! player. Replies are queued ahead of time and consumed in order; the
//! render fake falls back to a `queued` observation when its script runs
//! dry, so long polls do not need ninety queued entries.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::models::{GenerationContext, GenerationDirective};
use crate::services::gemini::{DirectiveSource, LlmError};
use crate::services::playback::PlaybackHandoff;
use crate::services::suno::{
    FetchError, JobId, RenderApi, RenderError, RenderState, RenderStatus,
};

pub fn directive() -> GenerationDirective {
    GenerationDirective {
        scene_description: "Indoor squash court, mid-rally".to_string(),
        activity: "exercising".to_string(),
        reasoning: "Match the adrenaline with driving rhythm".to_string(),
        render_prompt: "Driving electronic rock at 128 BPM with vocals".to_string(),
        tags: "electronic rock, driving, vocals".to_string(),
        target_bpm: 128,
        energy: "high".to_string(),
        mood: "focused".to_string(),
    }
}

pub fn queued(job: &str) -> RenderStatus {
    RenderStatus {
        job_id: JobId(job.to_string()),
        state: RenderState::Queued,
        audio_url: None,
        title: None,
        image_url: None,
    }
}

pub fn streaming(job: &str, url: &str) -> RenderStatus {
    RenderStatus {
        job_id: JobId(job.to_string()),
        state: RenderState::Streaming,
        audio_url: Some(url.to_string()),
        title: None,
        image_url: None,
    }
}

pub fn complete(job: &str, url: &str) -> RenderStatus {
    RenderStatus {
        job_id: JobId(job.to_string()),
        state: RenderState::Complete,
        audio_url: Some(url.to_string()),
        title: Some("Match Point".to_string()),
        image_url: Some("https://x/cover.jpg".to_string()),
    }
}

/// Scripted reasoning model
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<GenerationDirective, LlmError>>>,
    calls: AtomicU32,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: AtomicU32::new(0),
        }
    }

    pub fn with_directive() -> Self {
        let llm = Self::new();
        llm.queue(Ok(directive()));
        llm
    }

    pub fn queue(&self, reply: Result<GenerationDirective, LlmError>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DirectiveSource for ScriptedLlm {
    async fn generate(&self, _ctx: &GenerationContext) -> Result<GenerationDirective, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::InvalidResponse))
    }
}

/// Scripted render service
pub struct ScriptedRender {
    job: String,
    submit_replies: Mutex<VecDeque<Result<JobId, RenderError>>>,
    fetch_replies: Mutex<VecDeque<Result<RenderStatus, FetchError>>>,
    submit_calls: AtomicU32,
    fetch_calls: AtomicU32,
}

impl ScriptedRender {
    /// Fake that accepts submissions as `job` and reports `queued` once
    /// the fetch script is exhausted
    pub fn new(job: &str) -> Self {
        Self {
            job: job.to_string(),
            submit_replies: Mutex::new(VecDeque::new()),
            fetch_replies: Mutex::new(VecDeque::new()),
            submit_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
        }
    }

    pub fn queue_submit(&self, reply: Result<JobId, RenderError>) {
        self.submit_replies.lock().unwrap().push_back(reply);
    }

    pub fn queue_fetch(&self, reply: Result<RenderStatus, FetchError>) {
        self.fetch_replies.lock().unwrap().push_back(reply);
    }

    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }
}

impl RenderApi for ScriptedRender {
    async fn submit(
        &self,
        _directive: &GenerationDirective,
        _instrumental: bool,
    ) -> Result<JobId, RenderError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        self.submit_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(JobId(self.job.clone())))
    }

    async fn fetch_status(&self, job_id: &JobId) -> Result<RenderStatus, FetchError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.fetch_replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(queued(&job_id.0)))
    }
}

/// Render fake that cancels a run token from inside `fetch_status`,
/// simulating a cancel request racing an in-flight status fetch
pub struct CancellingRender {
    inner: ScriptedRender,
    token: tokio_util::sync::CancellationToken,
}

impl CancellingRender {
    pub fn new(job: &str, token: tokio_util::sync::CancellationToken) -> Self {
        Self {
            inner: ScriptedRender::new(job),
            token,
        }
    }

    pub fn queue_fetch(&self, reply: Result<RenderStatus, FetchError>) {
        self.inner.queue_fetch(reply);
    }

    pub fn fetch_calls(&self) -> u32 {
        self.inner.fetch_calls()
    }
}

impl RenderApi for CancellingRender {
    async fn submit(
        &self,
        directive: &GenerationDirective,
        instrumental: bool,
    ) -> Result<JobId, RenderError> {
        self.inner.submit(directive, instrumental).await
    }

    async fn fetch_status(&self, job_id: &JobId) -> Result<RenderStatus, FetchError> {
        self.token.cancel();
        self.inner.fetch_status(job_id).await
    }
}

/// Player fake that records every call in order
#[derive(Default)]
pub struct RecordingPlayback {
    calls: Mutex<Vec<String>>,
}

impl RecordingPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn start_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.starts_with("start:"))
            .count()
    }
}

impl PlaybackHandoff for RecordingPlayback {
    fn start(&self, audio_url: &str) {
        self.calls.lock().unwrap().push(format!("start:{audio_url}"));
    }

    fn stop(&self) {
        self.calls.lock().unwrap().push("stop".to_string());
    }

    fn pause(&self) {
        self.calls.lock().unwrap().push("pause".to_string());
    }

    fn resume(&self) {
        self.calls.lock().unwrap().push("resume".to_string());
    }

    fn is_playing(&self) -> bool {
        let calls = self.calls.lock().unwrap();
        match calls.last().map(String::as_str) {
            Some("stop") | Some("pause") | None => false,
            _ => calls.iter().any(|c| c.starts_with("start:")),
        }
    }
}
