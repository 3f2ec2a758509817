//! Final result retrieval and persistence. Always asks the service for
//! the authoritative body instead of stitching streamed chunks together,
//! and writes the artifact so a crash can never leave a half-written
//! file that looks valid.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::ResultError;
use crate::job::{CompletionCode, JobHandle};
use crate::service::NeosService;

/// Extension of the result file written beside the model.
pub const RESULT_EXTENSION: &str = "sol";

/// A terminal job's persisted output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultArtifact {
    pub path: PathBuf,
    pub code: CompletionCode,
    pub len: usize,
}

/// Where the result for `model_path` goes: same directory, same stem,
/// `sol` extension.
pub fn artifact_path(model_path: &Path) -> PathBuf {
    model_path.with_extension(RESULT_EXTENSION)
}

/// Retrieve a terminal job's full output body and completion code.
pub async fn fetch_final<S>(
    service: &S,
    handle: &JobHandle,
) -> Result<(Vec<u8>, CompletionCode), ResultError>
where
    S: NeosService + ?Sized,
{
    let body = service.final_results(handle).await?;
    let code = service.completion_code(handle).await?;
    Ok((body, code))
}

/// Write `body` to `path` atomically: the bytes land in a temporary
/// sibling first and only a rename makes them visible.
pub async fn write_artifact(path: &Path, body: &[u8]) -> Result<(), ResultError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, body).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }

    info!(path = %path.display(), bytes = body.len(), "result written");
    Ok(())
}
