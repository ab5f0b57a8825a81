//! Submit-then-poll state machine
//!
//! ```text
//! Submitted -> Polling -> Completed | Failed | TimedOut
//! ```
//!
//! Every poll sleeps first, then re-reads the job. Transport errors are not
//! retried; they end the run like any other error.

use std::sync::Arc;

use crate::client::LumaApi;
pub use crate::config::PollConfig;
use crate::error::{LumaError, Result};
use crate::generation::{Generation, GenerationKind, GenerationRequest, GenerationState};
use crate::progress::ProgressLog;

/// Drives one generation job to a terminal state
pub struct GenerationPoller {
    api: Arc<dyn LumaApi>,
    config: PollConfig,
    noun: &'static str,
}

impl GenerationPoller {
    pub fn new(api: Arc<dyn LumaApi>, config: PollConfig) -> Self {
        Self {
            api,
            config,
            noun: "generation",
        }
    }

    /// Word used in the waiting line ("reframe", "modification", ...)
    pub fn with_noun(mut self, noun: &'static str) -> Self {
        self.noun = noun;
        self
    }

    pub fn config(&self) -> PollConfig {
        self.config
    }

    /// Capitalized noun used in failure messages ("Reframe failed: ...")
    fn job_label(&self) -> String {
        let mut chars = self.noun.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Submit `request` and wait for its asset URL
    pub async fn submit_and_wait(
        &self,
        request: &GenerationRequest,
        log: &mut ProgressLog,
    ) -> Result<String> {
        let generation = self.api.submit(request).await?;
        log::info!(
            "GenerationPoller: submitted {} request {}",
            request.endpoint().path(),
            generation.id
        );
        log.push(format!("Request created with ID: {}", generation.id));

        self.wait(&generation, request.kind(), log).await
    }

    /// Poll an already-submitted job until it completes, fails or the
    /// attempt budget runs out
    pub async fn wait(
        &self,
        generation: &Generation,
        kind: GenerationKind,
        log: &mut ProgressLog,
    ) -> Result<String> {
        let id = generation.id.as_str();
        log.push(format!("Waiting for {} to complete...", self.noun));

        for attempt in 1..=self.config.max_attempts {
            tokio::time::sleep(self.config.interval).await;

            let job = self.api.get_generation(id).await?;
            log::debug!("GenerationPoller {}: attempt {} -> {}", id, attempt, job.state);

            match &job.state {
                GenerationState::Completed => {
                    log.push(format!("Attempt {}: Completed!", attempt));
                    log::info!("GenerationPoller {}: completed after {} attempts", id, attempt);
                    return job
                        .asset_url(kind)
                        .map(str::to_string)
                        .ok_or_else(|| LumaError::MissingAsset(id.to_string()));
                }
                GenerationState::Failed => {
                    log.push(format!("Attempt {}: {}", attempt, job.state));
                    let reason = job
                        .failure_reason
                        .clone()
                        .unwrap_or_else(|| "no reason given".to_string());
                    return Err(LumaError::GenerationFailed {
                        job: self.job_label(),
                        reason,
                    });
                }
                state => log.push(format!("Attempt {}: {}", attempt, state)),
            }
        }

        Err(LumaError::GenerationTimedOut {
            job: self.job_label(),
            attempts: self.config.max_attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::generation::Endpoint;
    use crate::test_support::{completed_image, completed_video, failed, generation, Poll, ScriptedApi};

    fn poller(api: Arc<ScriptedApi>, max_attempts: u32) -> GenerationPoller {
        GenerationPoller::new(api, PollConfig::new(Duration::ZERO, max_attempts))
    }

    fn image_request() -> GenerationRequest {
        GenerationRequest::new(Endpoint::ImageCreate, serde_json::Map::new())
    }

    #[tokio::test]
    async fn test_completes_with_asset_url() {
        let api = Arc::new(ScriptedApi::with_polls(vec![
            Poll::Job(generation("gen-1", "queued")),
            Poll::Job(generation("gen-1", "dreaming")),
            Poll::Job(completed_image("gen-1", "https://cdn.example.com/out.jpg")),
        ]));
        let mut log = ProgressLog::new();

        let url = poller(api.clone(), 10)
            .submit_and_wait(&image_request(), &mut log)
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example.com/out.jpg");
        assert_eq!(api.poll_count(), 3);
        assert_eq!(
            log.lines(),
            &[
                "Request created with ID: gen-1",
                "Waiting for generation to complete...",
                "Attempt 1: queued",
                "Attempt 2: dreaming",
                "Attempt 3: Completed!",
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_state_stops_polling() {
        let api = Arc::new(ScriptedApi::with_polls(vec![
            Poll::Job(generation("gen-1", "dreaming")),
            Poll::Job(failed("gen-1", "prompt rejected")),
            Poll::Job(completed_image("gen-1", "https://never")),
        ]));
        let mut log = ProgressLog::new();

        let err = poller(api.clone(), 10)
            .submit_and_wait(&image_request(), &mut log)
            .await
            .unwrap_err();

        match &err {
            LumaError::GenerationFailed { job, reason } => {
                assert_eq!(job, "Generation");
                assert_eq!(reason, "prompt rejected");
            }
            other => panic!("expected GenerationFailed, got {:?}", other),
        }
        assert_eq!(err.to_string(), "Generation failed: prompt rejected");
        assert_eq!(api.poll_count(), 2);
        assert_eq!(log.len(), 2 + 2);
    }

    #[tokio::test]
    async fn test_times_out_after_budget() {
        let api = Arc::new(ScriptedApi::new());
        let mut log = ProgressLog::new();

        let err = poller(api.clone(), 4)
            .submit_and_wait(&image_request(), &mut log)
            .await
            .unwrap_err();

        assert!(matches!(err, LumaError::GenerationTimedOut { attempts: 4, .. }));
        assert_eq!(api.poll_count(), 4);
        assert_eq!(log.len(), 2 + 4);
        assert_eq!(log.last(), Some("Attempt 4: dreaming"));
    }

    #[tokio::test]
    async fn test_unknown_state_is_not_terminal() {
        let api = Arc::new(ScriptedApi::with_polls(vec![
            Poll::Job(generation("gen-1", "upscaling")),
            Poll::Job(completed_video("gen-1", "https://cdn.example.com/out.mp4")),
        ]));
        let mut log = ProgressLog::new();

        let request = GenerationRequest::new(Endpoint::VideoCreate, serde_json::Map::new());
        let url = poller(api, 5)
            .submit_and_wait(&request, &mut log)
            .await
            .unwrap();

        assert_eq!(url, "https://cdn.example.com/out.mp4");
        assert_eq!(log.lines()[2], "Attempt 1: upscaling");
    }

    #[tokio::test]
    async fn test_transport_error_is_fatal() {
        let api = Arc::new(ScriptedApi::with_polls(vec![
            Poll::Job(generation("gen-1", "dreaming")),
            Poll::Error(503),
            Poll::Job(completed_image("gen-1", "https://never")),
        ]));
        let mut log = ProgressLog::new();

        let err = poller(api.clone(), 10)
            .submit_and_wait(&image_request(), &mut log)
            .await
            .unwrap_err();

        assert!(matches!(err, LumaError::Api { status: 503, .. }));
        assert_eq!(api.poll_count(), 2);
    }

    #[tokio::test]
    async fn test_completed_without_matching_asset() {
        // Image job asked for a video asset
        let api = Arc::new(ScriptedApi::with_polls(vec![Poll::Job(completed_image(
            "gen-1",
            "https://cdn.example.com/out.jpg",
        ))]));
        let mut log = ProgressLog::new();

        let request = GenerationRequest::new(Endpoint::VideoModify, serde_json::Map::new());
        let err = poller(api, 3)
            .with_noun("modification")
            .submit_and_wait(&request, &mut log)
            .await
            .unwrap_err();

        assert!(matches!(err, LumaError::MissingAsset(_)));
        assert_eq!(log.lines()[1], "Waiting for modification to complete...");
    }

    #[tokio::test]
    async fn test_failure_and_timeout_name_the_job() {
        let api = Arc::new(ScriptedApi::with_polls(vec![Poll::Job(failed("gen-1", "bad crop"))]));
        let mut log = ProgressLog::new();
        let request = GenerationRequest::new(Endpoint::VideoReframe, serde_json::Map::new());

        let err = poller(api, 3)
            .with_noun("reframe")
            .submit_and_wait(&request, &mut log)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Reframe failed: bad crop");

        let mut log = ProgressLog::new();
        let err = poller(Arc::new(ScriptedApi::new()), 2)
            .with_noun("modification")
            .submit_and_wait(&request, &mut log)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Modification timed out after 2 attempts");
    }
}
