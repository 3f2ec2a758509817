//! Typed surface over the remote solving service. The trait is the seam
//! the engine and the tests share; [`XmlRpcNeos`] is the production
//! implementation, decoding each wire shape at this boundary so nothing
//! above it ever sees a raw response.

use async_trait::async_trait;
use serde::Serialize;

use crate::config::ServiceConfig;
use crate::error::TransportError;
use crate::job::{CompletionCode, JobHandle, JobStatus};
use crate::transport::Transport;
use crate::xmlrpc::Value;

/// One row of the service's solver catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SolverEntry {
    pub category: String,
    pub solver: String,
    pub input_method: String,
}

impl SolverEntry {
    /// Parse the catalog's `category:solver:inputMethod` wire form.
    pub fn from_wire(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, ':');
        let category = parts.next()?.trim();
        let solver = parts.next()?.trim();
        let input_method = parts.next()?.trim();
        if category.is_empty() || solver.is_empty() || input_method.is_empty() {
            return None;
        }
        Some(Self {
            category: category.to_string(),
            solver: solver.to_string(),
            input_method: input_method.to_string(),
        })
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NeosService: Send + Sync {
    /// Anonymous submission. Returns the raw `(jobNumber, password)`
    /// acknowledgement; job number 0 means the document was rejected and
    /// the password slot carries the reason.
    async fn submit_job(&self, document: &str) -> Result<(i32, String), TransportError>;

    /// Submission attributed to a service account.
    async fn authenticated_submit_job(
        &self,
        document: &str,
        username: &str,
        secret: &str,
    ) -> Result<(i32, String), TransportError>;

    async fn job_status(&self, handle: &JobHandle) -> Result<JobStatus, TransportError>;

    /// Output bytes from `offset` onward plus the new end offset.
    async fn intermediate_results(
        &self,
        handle: &JobHandle,
        offset: usize,
    ) -> Result<(Vec<u8>, usize), TransportError>;

    /// The authoritative final output body.
    async fn final_results(&self, handle: &JobHandle) -> Result<Vec<u8>, TransportError>;

    async fn completion_code(&self, handle: &JobHandle) -> Result<CompletionCode, TransportError>;

    /// Best-effort kill; the returned string is the service's remark.
    async fn kill_job(
        &self,
        handle: &JobHandle,
        message: &str,
    ) -> Result<String, TransportError>;

    /// The full solver catalog, unfiltered.
    async fn list_solver_entries(&self) -> Result<Vec<SolverEntry>, TransportError>;

    /// Cheap liveness check.
    async fn ping(&self) -> Result<String, TransportError>;
}

/// The production service client, speaking XML-RPC through [`Transport`].
pub struct XmlRpcNeos {
    transport: Transport,
}

impl XmlRpcNeos {
    pub fn new(config: &ServiceConfig) -> Result<Self, TransportError> {
        Ok(Self {
            transport: Transport::new(config)?,
        })
    }

    pub fn endpoint(&self) -> &str {
        self.transport.endpoint()
    }

    fn handle_params(handle: &JobHandle) -> [Value; 2] {
        [
            Value::Int(handle.number),
            Value::String(handle.password.clone()),
        ]
    }
}

#[async_trait]
impl NeosService for XmlRpcNeos {
    async fn submit_job(&self, document: &str) -> Result<(i32, String), TransportError> {
        let response = self
            .transport
            .call("submitJob", &[Value::String(document.to_string())])
            .await?;
        decode_submit_ack(&response)
    }

    async fn authenticated_submit_job(
        &self,
        document: &str,
        username: &str,
        secret: &str,
    ) -> Result<(i32, String), TransportError> {
        let response = self
            .transport
            .call(
                "authenticatedSubmitJob",
                &[
                    Value::String(document.to_string()),
                    Value::String(username.to_string()),
                    Value::String(secret.to_string()),
                ],
            )
            .await?;
        decode_submit_ack(&response)
    }

    async fn job_status(&self, handle: &JobHandle) -> Result<JobStatus, TransportError> {
        let response = self
            .transport
            .call("getJobStatus", &Self::handle_params(handle))
            .await?;
        decode_status(&response)
    }

    async fn intermediate_results(
        &self,
        handle: &JobHandle,
        offset: usize,
    ) -> Result<(Vec<u8>, usize), TransportError> {
        // Wire offsets are plain ints.
        let wire_offset = i32::try_from(offset).unwrap_or(i32::MAX);
        let response = self
            .transport
            .call(
                "getIntermediateResults",
                &[
                    Value::Int(handle.number),
                    Value::String(handle.password.clone()),
                    Value::Int(wire_offset),
                ],
            )
            .await?;
        decode_intermediate(&response)
    }

    async fn final_results(&self, handle: &JobHandle) -> Result<Vec<u8>, TransportError> {
        let response = self
            .transport
            .call("getFinalResults", &Self::handle_params(handle))
            .await?;
        decode_body(&response)
    }

    async fn completion_code(&self, handle: &JobHandle) -> Result<CompletionCode, TransportError> {
        let response = self
            .transport
            .call("getCompletionCode", &Self::handle_params(handle))
            .await?;
        let code = response
            .as_str()
            .ok_or_else(|| malformed("completion code is not a string"))?;
        Ok(CompletionCode::from_wire(code))
    }

    async fn kill_job(
        &self,
        handle: &JobHandle,
        message: &str,
    ) -> Result<String, TransportError> {
        let response = self
            .transport
            .call(
                "killJob",
                &[
                    Value::Int(handle.number),
                    Value::String(handle.password.clone()),
                    Value::String(message.to_string()),
                ],
            )
            .await?;
        Ok(response.as_str().unwrap_or_default().to_string())
    }

    async fn list_solver_entries(&self) -> Result<Vec<SolverEntry>, TransportError> {
        let response = self.transport.call("listAllSolvers", &[]).await?;
        decode_catalog(&response)
    }

    async fn ping(&self) -> Result<String, TransportError> {
        let response = self.transport.call("ping", &[]).await?;
        response
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| malformed("ping response is not a string"))
    }
}

fn decode_submit_ack(value: &Value) -> Result<(i32, String), TransportError> {
    let items = value
        .as_array()
        .ok_or_else(|| malformed("submission acknowledgement is not an array"))?;
    match items {
        [number, password] => {
            let number = number
                .as_i32()
                .ok_or_else(|| malformed("job number is not an integer"))?;
            let password = password
                .as_str()
                .ok_or_else(|| malformed("job password is not a string"))?;
            Ok((number, password.to_string()))
        }
        _ => Err(malformed(format!(
            "submission acknowledgement has {} elements, expected 2",
            items.len()
        ))),
    }
}

fn decode_status(value: &Value) -> Result<JobStatus, TransportError> {
    let status = value
        .as_str()
        .ok_or_else(|| malformed("job status is not a string"))?;
    JobStatus::from_wire(status)
        .ok_or_else(|| malformed(format!("unrecognized job status {:?}", status)))
}

fn decode_intermediate(value: &Value) -> Result<(Vec<u8>, usize), TransportError> {
    let items = value
        .as_array()
        .ok_or_else(|| malformed("intermediate results are not an array"))?;
    match items {
        [body, offset] => {
            let bytes = decode_body(body)?;
            let offset = offset
                .as_i32()
                .ok_or_else(|| malformed("output offset is not an integer"))?;
            let offset = usize::try_from(offset)
                .map_err(|_| malformed(format!("negative output offset {}", offset)))?;
            Ok((bytes, offset))
        }
        _ => Err(malformed(format!(
            "intermediate results have {} elements, expected 2",
            items.len()
        ))),
    }
}

/// Output bodies arrive base64-encoded; some deployments fall back to a
/// plain string for short text.
fn decode_body(value: &Value) -> Result<Vec<u8>, TransportError> {
    match value {
        Value::Base64(bytes) => Ok(bytes.clone()),
        Value::String(s) => Ok(s.clone().into_bytes()),
        _ => Err(malformed("output body is neither base64 nor a string")),
    }
}

fn decode_catalog(value: &Value) -> Result<Vec<SolverEntry>, TransportError> {
    let items = value
        .as_array()
        .ok_or_else(|| malformed("solver catalog is not an array"))?;
    items
        .iter()
        .map(|item| {
            let row = item
                .as_str()
                .ok_or_else(|| malformed("catalog row is not a string"))?;
            SolverEntry::from_wire(row)
                .ok_or_else(|| malformed(format!("unparseable catalog row {:?}", row)))
        })
        .collect()
}

fn malformed(detail: impl Into<String>) -> TransportError {
    TransportError::MalformedResponse(detail.into())
}
