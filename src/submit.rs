//! Submission and catalog introspection. One remote call per submission,
//! escalated immediately on transport trouble so a flaky network can
//! never cause a duplicate job.

use tracing::info;

use crate::credentials::Account;
use crate::document::INPUT_METHOD;
use crate::error::{SubmissionError, TransportError};
use crate::job::JobHandle;
use crate::service::{NeosService, SolverEntry};

/// Advertised by the service but unreachable through this protocol; the
/// catalog hides it so nobody submits into a black hole.
pub const EXCLUDED_SOLVER: &str = "SYMPHONY";

/// Submit an encoded document and validate the acknowledgement.
///
/// The service signals rejection by answering with job number 0 and the
/// reason in the password slot.
pub async fn submit<S>(
    service: &S,
    document: &str,
    account: Option<&Account>,
) -> Result<JobHandle, SubmissionError>
where
    S: NeosService + ?Sized,
{
    let (number, password) = match account {
        Some(account) => {
            service
                .authenticated_submit_job(document, &account.username, &account.secret)
                .await?
        }
        None => service.submit_job(document).await?,
    };

    if number == 0 {
        return Err(SubmissionError::Rejected(password));
    }

    info!(job = number, "job submitted");
    Ok(JobHandle::new(number, password))
}

/// The solver catalog restricted to what this client can actually use:
/// entries accepting the MPS input method, minus the excluded solver.
pub async fn list_solvers<S>(service: &S) -> Result<Vec<SolverEntry>, TransportError>
where
    S: NeosService + ?Sized,
{
    let entries = service.list_solver_entries().await?;
    Ok(entries
        .into_iter()
        .filter(|entry| {
            entry.input_method.eq_ignore_ascii_case(INPUT_METHOD)
                && !entry.solver.eq_ignore_ascii_case(EXCLUDED_SOLVER)
        })
        .collect())
}
