use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::job::{CompletionCode, FailureKind};

/// Failures of the call channel itself, before any job-level meaning.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("service fault {code}: {message}")]
    Fault { code: i32, message: String },
}

/// The submission never entered the system.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("no email address configured; the service requires one for every job")]
    MissingEmail,

    #[error("model body is empty")]
    EmptyModel,

    #[error("model payload is binary; the service only accepts text models")]
    BinaryModel,

    #[error("service rejected the submission: {0}")]
    Rejected(String),

    #[error("transport error during submission: {0}")]
    Transport(#[from] TransportError),
}

/// Partial output could not be fetched or handed to the sink. The
/// streamer is observational, so the poller logs these and moves on.
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("transport error while fetching partial output: {0}")]
    Transport(#[from] TransportError),

    #[error("could not write partial output to the sink: {0}")]
    Sink(#[from] std::io::Error),
}

/// The client lost track of a job it had successfully submitted.
#[derive(Error, Debug)]
pub enum PollError {
    #[error("job is not known to the service (expired, or wrong job credentials)")]
    JobNotFound,

    #[error("polling budget of {0:?} exhausted before the job finished")]
    BudgetExceeded(Duration),

    #[error("gave up after {attempts} consecutive transport failures while polling: {last}")]
    TransportExhausted { attempts: u32, last: TransportError },
}

/// The job ran and the service reports it ended in a non-success state.
///
/// Distinct from [`SubmissionError`] (never got in) and [`PollError`]
/// (lost track of it). `artifact` is the diagnostic file written beside
/// the model, when the final output could still be retrieved.
#[derive(Error, Debug)]
#[error("job failed: {kind} (completion code: {code})")]
pub struct ServiceFailure {
    pub kind: FailureKind,
    pub code: CompletionCode,
    pub artifact: Option<PathBuf>,
}

/// A terminal job's output could not be retrieved or persisted.
#[derive(Error, Debug)]
pub enum ResultError {
    #[error("transport error while fetching results: {0}")]
    Transport(#[from] TransportError),

    #[error("could not write the result file: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error of one solve lifecycle.
#[derive(Error, Debug)]
pub enum SolveError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),

    #[error(transparent)]
    Poll(#[from] PollError),

    #[error(transparent)]
    Service(#[from] ServiceFailure),

    #[error(transparent)]
    Result(#[from] ResultError),

    #[error("solve cancelled before the job finished")]
    Cancelled,
}

pub type Result<T, E = SolveError> = std::result::Result<T, E>;
