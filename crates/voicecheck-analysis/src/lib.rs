//! voicecheck-analysis: best-effort emotion/stress assessment of voice notes.
//!
//! A configured analysis proxy is tried first, then the remote generation
//! backend (file reference, then inline audio), and finally a local heuristic
//! so the caller always gets some text back.

pub mod endpoints;
pub mod executor;
pub mod extract;
pub mod generation;
pub mod local;
pub mod mime;
pub mod proxy;
pub mod runner;
pub mod transport;
pub mod types;

pub use executor::RetryingExecutor;
pub use local::{LocalGuess, local_guess};
pub use runner::VoiceAnalyzer;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
pub use types::{
    AnalysisError, AttemptOutcome, AudioInput, EndpointCandidate, StrategyFailure, StrategyResult,
    UploadedFileHandle,
};
