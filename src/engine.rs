//! One job's lifecycle, end to end: encode, submit, poll with streaming,
//! fetch and persist the result. Sequential phases of a single control
//! flow; the only suspension point lives in the poller.

use std::path::Path;

use tokio::io::AsyncWrite;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{PollPolicy, SolveConfig};
use crate::credentials::CredentialProvider;
use crate::document;
use crate::error::{ServiceFailure, SolveError, SubmissionError};
use crate::job::{CompletionCode, FailureKind, JobHandle, JobStatus};
use crate::model::ModelPayload;
use crate::poller::{poll_to_terminal, PollOutcome};
use crate::results::{self, ResultArtifact};
use crate::service::NeosService;
use crate::stream::OutputStream;
use crate::submit;

/// Sent with the best-effort kill so server-side logs name the client.
pub const KILL_MESSAGE: &str = "killed by nemos";

/// A finished solve: the handle the service issued and the artifact on
/// disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveOutcome {
    pub handle: JobHandle,
    pub artifact: ResultArtifact,
}

pub struct SolveEngine<S> {
    service: S,
    credentials: Box<dyn CredentialProvider>,
    policy: Option<PollPolicy>,
}

impl<S: NeosService> SolveEngine<S> {
    pub fn new(service: S, credentials: impl CredentialProvider + 'static) -> Self {
        Self {
            service,
            credentials: Box::new(credentials),
            policy: None,
        }
    }

    /// Replace the polling policy derived from the request's priority.
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Encode and submit one job. Fails locally, before any remote call,
    /// when no email is configured.
    pub async fn submit(
        &self,
        model: &ModelPayload,
        config: &SolveConfig,
    ) -> Result<JobHandle, SubmissionError> {
        let email = self
            .credentials
            .email()
            .ok_or(SubmissionError::MissingEmail)?;
        let account = self.credentials.account();
        let username = account.as_ref().map(|a| a.username.as_str());

        let document = document::encode_submission(model, config, &email, username)?;
        submit::submit(&self.service, &document, account.as_ref()).await
    }

    /// Run one job to completion and persist its result beside
    /// `model_path`. Partial output goes to `sink` while the job runs.
    ///
    /// No result file is created on any fatal pre-terminal error; its
    /// absence is the failure signal to the calling toolchain.
    pub async fn solve<W>(
        &self,
        model: &ModelPayload,
        model_path: &Path,
        config: &SolveConfig,
        sink: &mut W,
        cancel: &CancellationToken,
    ) -> Result<SolveOutcome, SolveError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let handle = self.submit(model, config).await?;
        let policy = match &self.policy {
            Some(policy) => policy.clone(),
            None => PollPolicy::for_priority(config.priority),
        };

        let mut stream = OutputStream::new();
        let outcome =
            poll_to_terminal(&self.service, &handle, &policy, &mut stream, sink, cancel).await?;

        let status = match outcome {
            PollOutcome::Terminal(status) => status,
            PollOutcome::Cancelled => {
                match self.service.kill_job(&handle, KILL_MESSAGE).await {
                    Ok(remark) => info!(job = handle.number, remark = %remark, "kill requested"),
                    Err(e) => warn!(job = handle.number, error = %e, "kill request failed"),
                }
                return Err(SolveError::Cancelled);
            }
        };

        let artifact_path = results::artifact_path(model_path);
        match status {
            JobStatus::Done => {
                let (body, code) = results::fetch_final(&self.service, &handle).await?;
                results::write_artifact(&artifact_path, &body).await?;
                if code.is_success() {
                    Ok(SolveOutcome {
                        handle,
                        artifact: ResultArtifact {
                            path: artifact_path,
                            code,
                            len: body.len(),
                        },
                    })
                } else {
                    // Ran to "Done" but the verdict is not a success.
                    let kind = code.failure_kind().unwrap_or(FailureKind::ServerError);
                    Err(ServiceFailure {
                        kind,
                        code,
                        artifact: Some(artifact_path),
                    }
                    .into())
                }
            }
            JobStatus::Failed(kind) => {
                // Still pull whatever output exists for diagnostics.
                let (code, artifact) =
                    match results::fetch_final(&self.service, &handle).await {
                        Ok((body, code)) => {
                            match results::write_artifact(&artifact_path, &body).await {
                                Ok(()) => (code, Some(artifact_path)),
                                Err(e) => {
                                    warn!(job = handle.number, error = %e, "diagnostic write failed");
                                    (code, None)
                                }
                            }
                        }
                        Err(e) => {
                            warn!(job = handle.number, error = %e, "diagnostic fetch failed");
                            (CompletionCode::Other("unavailable".to_string()), None)
                        }
                    };
                Err(ServiceFailure {
                    kind,
                    code,
                    artifact,
                }
                .into())
            }
            JobStatus::Queued | JobStatus::Running | JobStatus::Unknown => {
                unreachable!("poller only reports terminal statuses")
            }
        }
    }
}
