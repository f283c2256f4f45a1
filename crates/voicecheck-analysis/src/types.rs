//! Analysis input, outcome and result types.

use std::fmt;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use thiserror::Error;

use crate::local::LocalGuess;

/// Errors that cross the analyzer boundary.
///
/// Remote failures never show up here; they are folded into a [`StrategyResult`].
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Audio file not found: {}", .0.display())]
    MissingInput(PathBuf),
    #[error("Audio input is empty: {0}")]
    EmptyInput(String),
    #[error("IO error reading audio: {0}")]
    Io(#[from] std::io::Error),
    #[error("Analysis cancelled")]
    Cancelled,
}

/// Audio payload to analyze.
#[derive(Debug, Clone)]
pub struct AudioInput {
    /// Logical file name, used for mime classification and the local heuristic.
    pub file_name: String,
    /// Raw audio bytes.
    pub data: Bytes,
}

impl AudioInput {
    pub fn new(file_name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }

    /// Read an audio file from disk.
    pub async fn from_path(path: &Path) -> Result<Self, AnalysisError> {
        let data = match tokio::fs::read(path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AnalysisError::MissingInput(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let input = Self::new(file_name, data);
        input.validate()?;
        Ok(input)
    }

    /// Byte length of the payload.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Precondition check: the payload must hold at least one byte.
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.is_empty() {
            return Err(AnalysisError::EmptyInput(self.file_name.clone()));
        }
        Ok(())
    }
}

/// One proxy URL to try.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCandidate {
    /// Absolute URL ending in `/analyze`.
    pub url: String,
    /// Came from the primary proxy setting.
    pub is_primary: bool,
    /// Derived by swapping emulator and loopback hosts.
    pub is_derived: bool,
}

/// Result of one logical HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// 2xx with the response body.
    Success(String),
    /// 429 or 5xx; worth retrying against the same URL.
    RetryableFailure(String),
    /// Anything that will not change on an immediate retry.
    TerminalFailure(String),
}

/// Handle returned by the remote file upload step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFileHandle {
    /// Resource name, e.g. "files/abc123".
    pub name: Option<String>,
    /// Fully qualified resource URI.
    pub uri: Option<String>,
}

impl UploadedFileHandle {
    /// The value to reference from a generation request; the URI is preferred.
    pub fn reference(&self) -> Option<&str> {
        self.uri.as_deref().or(self.name.as_deref())
    }
}

/// A failure recorded while walking the strategies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyFailure {
    /// Proxy URL or strategy name.
    pub target: String,
    /// Human-readable reason.
    pub reason: String,
}

impl StrategyFailure {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// The outcome of a full analysis.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyResult {
    /// A proxy candidate answered.
    Proxy { endpoint: String, text: String },
    /// The generation backend answered using an uploaded file reference.
    FileReference { text: String },
    /// The generation backend answered using inline audio.
    Inline { text: String },
    /// No remote path produced a result.
    Local(LocalGuess),
    /// The configured proxy failed on every candidate.
    AllFailed { failures: Vec<StrategyFailure> },
}

impl StrategyResult {
    /// Short machine-readable name of the strategy that produced this result.
    pub fn kind(&self) -> &'static str {
        match self {
            StrategyResult::Proxy { .. } => "proxy",
            StrategyResult::FileReference { .. } => "file_reference",
            StrategyResult::Inline { .. } => "inline",
            StrategyResult::Local(_) => "local",
            StrategyResult::AllFailed { .. } => "all_failed",
        }
    }

    /// Whether a remote backend produced the text.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            StrategyResult::Proxy { .. }
                | StrategyResult::FileReference { .. }
                | StrategyResult::Inline { .. }
        )
    }

    /// The single string shown to the user.
    pub fn display_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for StrategyResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyResult::Proxy { text, .. }
            | StrategyResult::FileReference { text }
            | StrategyResult::Inline { text } => f.write_str(text),
            StrategyResult::Local(guess) => write!(f, "{}\n{}", guess.label, guess.explanation),
            StrategyResult::AllFailed { failures } => {
                write!(f, "Voice analysis failed:")?;
                for failure in failures {
                    write!(f, "\n- {}: {}", failure.target, failure.reason)?;
                }
                Ok(())
            }
        }
    }
}
