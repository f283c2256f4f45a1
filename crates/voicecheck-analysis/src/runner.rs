//! Voice analysis orchestrator.
//!
//! Strategies run strictly one after another, at most one HTTP call in flight:
//!
//! 1. proxy upload to every endpoint candidate (proxy mode; never falls through),
//! 2. generation backend via an uploaded file reference,
//! 3. generation backend via inline base64 audio,
//! 4. the local heuristic.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use voicecheck_types::AnalysisConfig;

use crate::endpoints;
use crate::executor::RetryingExecutor;
use crate::extract::{extract_proxy_text, extract_text};
use crate::generation::{self, GenerationPayload};
use crate::local::{LOCAL_FAILURE_TEXT, LocalGuess, local_guess};
use crate::mime;
use crate::proxy;
use crate::transport::{HttpTransport, ReqwestTransport, TransportError};
use crate::types::{
    AnalysisError, AttemptOutcome, AudioInput, StrategyFailure, StrategyResult, UploadedFileHandle,
};

const DEADLINE_REASON: &str = "overall deadline exceeded";

/// Runs the analysis strategies against one configuration.
pub struct VoiceAnalyzer {
    config: AnalysisConfig,
    transport: Arc<dyn HttpTransport>,
}

impl VoiceAnalyzer {
    pub fn new(config: AnalysisConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self { config, transport }
    }

    /// Build an analyzer with a reqwest transport using the configured request timeout.
    pub fn from_config(config: AnalysisConfig) -> Result<Self, TransportError> {
        let transport =
            ReqwestTransport::new(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    /// Read `path` and analyze it.
    pub async fn analyze_path(
        &self,
        path: &Path,
        cancel: &CancellationToken,
    ) -> Result<StrategyResult, AnalysisError> {
        let input = AudioInput::from_path(path).await?;
        self.analyze(&input, cancel).await
    }

    /// Produce an analysis for `input`.
    ///
    /// Errors only for an empty payload or cancellation; every remote failure
    /// is folded into the returned [`StrategyResult`].
    pub async fn analyze(
        &self,
        input: &AudioInput,
        cancel: &CancellationToken,
    ) -> Result<StrategyResult, AnalysisError> {
        input.validate()?;
        let deadline = self
            .config
            .overall_timeout_secs
            .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs)));

        if self.config.has_proxy() {
            return self.run_proxy(input, cancel, deadline).await;
        }

        let mut failures = Vec::new();
        if self.config.has_generation() {
            if let Some(text) = self
                .run_file_reference(input, cancel, deadline, &mut failures)
                .await?
            {
                return Ok(StrategyResult::FileReference { text });
            }
            if let Some(text) = self
                .run_inline(input, cancel, deadline, &mut failures)
                .await?
            {
                return Ok(StrategyResult::Inline { text });
            }
        }

        if cancel.is_cancelled() {
            return Err(AnalysisError::Cancelled);
        }
        for failure in &failures {
            warn!(target_name = %failure.target, "Strategy failed: {}", failure.reason);
        }
        info!(file = %input.file_name, "Falling back to local analysis");
        Ok(local_fallback(input))
    }

    async fn run_proxy(
        &self,
        input: &AudioInput,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Result<StrategyResult, AnalysisError> {
        let candidates = endpoints::resolve(&self.config);
        let executor = RetryingExecutor::from_tuning(self.transport.clone(), self.config.retry);
        let mut failures = Vec::new();

        info!(candidates = candidates.len(), "Trying analysis proxy");
        for candidate in &candidates {
            let request = proxy::build_request(&candidate.url, input, self.config.app_key.as_deref());
            let outcome = guarded(
                executor.execute(&request, self.config.retry.max_attempts),
                cancel,
                deadline,
            )
            .await?;

            match outcome {
                Some(AttemptOutcome::Success(body)) => {
                    info!(url = %candidate.url, "Proxy analysis succeeded");
                    return Ok(StrategyResult::Proxy {
                        endpoint: candidate.url.clone(),
                        text: extract_proxy_text(&body),
                    });
                }
                Some(AttemptOutcome::RetryableFailure(reason))
                | Some(AttemptOutcome::TerminalFailure(reason)) => {
                    warn!(url = %candidate.url, "Proxy candidate failed: {reason}");
                    failures.push(StrategyFailure::new(&candidate.url, reason));
                }
                None => {
                    warn!(url = %candidate.url, "Overall deadline reached during proxy attempts");
                    failures.push(StrategyFailure::new(&candidate.url, DEADLINE_REASON));
                    break;
                }
            }
        }

        Ok(StrategyResult::AllFailed { failures })
    }

    async fn run_file_reference(
        &self,
        input: &AudioInput,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
        failures: &mut Vec<StrategyFailure>,
    ) -> Result<Option<String>, AnalysisError> {
        let key = &self.config.generation_api_key;
        let attempts = self.config.retry.max_attempts;
        let executor = RetryingExecutor::from_tuning(self.transport.clone(), self.config.retry);

        let upload_url = match generation::upload_url(
            &self.config.generation_endpoint,
            self.config.upload_url.as_deref(),
        )
        .and_then(|url| generation::keyed_url(&url, key))
        {
            Ok(url) => url,
            Err(e) => {
                failures.push(StrategyFailure::new("file_upload", format!("invalid upload URL: {e}")));
                return Ok(None);
            }
        };

        info!(file = %input.file_name, "Uploading audio for file-reference analysis");
        let request = generation::build_upload_request(&upload_url, input);
        let file_uri = match guarded(executor.execute(&request, attempts), cancel, deadline).await? {
            Some(AttemptOutcome::Success(body)) => match generation::parse_upload_response(&body)
                .as_ref()
                .and_then(UploadedFileHandle::reference)
            {
                Some(reference) => reference.to_string(),
                None => {
                    failures.push(StrategyFailure::new(
                        "file_upload",
                        "upload response carried no file name or URI",
                    ));
                    return Ok(None);
                }
            },
            Some(AttemptOutcome::RetryableFailure(reason))
            | Some(AttemptOutcome::TerminalFailure(reason)) => {
                failures.push(StrategyFailure::new("file_upload", reason));
                return Ok(None);
            }
            None => {
                failures.push(StrategyFailure::new("file_upload", DEADLINE_REASON));
                return Ok(None);
            }
        };

        let generate_url = match generation::keyed_url(&self.config.generation_endpoint, key) {
            Ok(url) => url,
            Err(e) => {
                failures.push(StrategyFailure::new(
                    "file_reference",
                    format!("invalid generation endpoint: {e}"),
                ));
                return Ok(None);
            }
        };
        let payload = GenerationPayload::file_reference(
            &file_uri,
            mime::classify(&input.file_name),
            self.prompt(),
            self.config.temperature,
        );

        let outcome = guarded(
            executor.post_json(&generate_url, payload.to_json(), attempts),
            cancel,
            deadline,
        )
        .await?;
        Ok(self.take_text("file_reference", outcome, failures))
    }

    async fn run_inline(
        &self,
        input: &AudioInput,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
        failures: &mut Vec<StrategyFailure>,
    ) -> Result<Option<String>, AnalysisError> {
        if input.len() > generation::MAX_INLINE_BYTES {
            failures.push(StrategyFailure::new(
                "inline",
                format!(
                    "audio is {} bytes, above the inline limit of {} bytes",
                    input.len(),
                    generation::MAX_INLINE_BYTES
                ),
            ));
            return Ok(None);
        }

        let generate_url = match generation::keyed_url(
            &self.config.generation_endpoint,
            &self.config.generation_api_key,
        ) {
            Ok(url) => url,
            Err(e) => {
                failures.push(StrategyFailure::new(
                    "inline",
                    format!("invalid generation endpoint: {e}"),
                ));
                return Ok(None);
            }
        };

        info!(file = %input.file_name, "Trying inline analysis");
        let tuning = self.config.inline_retry();
        let executor = RetryingExecutor::from_tuning(self.transport.clone(), tuning);
        let payload = GenerationPayload::inline(input, self.prompt(), self.config.temperature);

        let outcome = guarded(
            executor.post_json(&generate_url, payload.to_json(), tuning.max_attempts),
            cancel,
            deadline,
        )
        .await?;
        Ok(self.take_text("inline", outcome, failures))
    }

    fn take_text(
        &self,
        strategy: &str,
        outcome: Option<AttemptOutcome>,
        failures: &mut Vec<StrategyFailure>,
    ) -> Option<String> {
        match outcome {
            Some(AttemptOutcome::Success(body)) => {
                info!(strategy, "Generation analysis succeeded");
                Some(extract_text(&body))
            }
            Some(AttemptOutcome::RetryableFailure(reason))
            | Some(AttemptOutcome::TerminalFailure(reason)) => {
                failures.push(StrategyFailure::new(strategy, reason));
                None
            }
            None => {
                failures.push(StrategyFailure::new(strategy, DEADLINE_REASON));
                None
            }
        }
    }

    fn prompt(&self) -> &str {
        self.config
            .prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or(generation::DEFAULT_PROMPT)
    }
}

/// Race `fut` against cancellation and the optional overall deadline.
///
/// `Ok(None)` means the deadline passed before `fut` completed.
async fn guarded<F: Future>(
    fut: F,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
) -> Result<Option<F::Output>, AnalysisError> {
    if cancel.is_cancelled() {
        return Err(AnalysisError::Cancelled);
    }
    if deadline.is_some_and(|d| Instant::now() >= d) {
        return Ok(None);
    }

    let bounded = async {
        match deadline {
            Some(d) => tokio::time::timeout_at(d, fut).await.ok(),
            None => Some(fut.await),
        }
    };

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AnalysisError::Cancelled),
        out = bounded => Ok(out),
    }
}

fn local_fallback(input: &AudioInput) -> StrategyResult {
    let file_name = input.file_name.clone();
    let len = input.len();
    match std::panic::catch_unwind(move || local_guess(&file_name, len)) {
        Ok(guess) => StrategyResult::Local(guess),
        Err(_) => StrategyResult::Local(LocalGuess {
            label: "Unknown".to_string(),
            explanation: LOCAL_FAILURE_TEXT.to_string(),
        }),
    }
}
