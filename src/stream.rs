//! Incremental output streaming for a running job. Tracks the offset
//! already consumed so every fetch asks only for bytes the caller has
//! not seen; the offset never moves backwards.

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::StreamError;
use crate::job::JobHandle;
use crate::service::NeosService;

#[derive(Debug, Default)]
pub struct OutputStream {
    offset: usize,
}

impl OutputStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes consumed so far.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Fetch output past the current offset and write it to `sink`.
    /// Returns the number of new bytes emitted. A server-reported offset
    /// at or below the current one means nothing new; nothing is emitted
    /// and the offset stays put.
    pub async fn fetch_new<S, W>(
        &mut self,
        service: &S,
        handle: &JobHandle,
        sink: &mut W,
    ) -> Result<usize, StreamError>
    where
        S: NeosService + ?Sized,
        W: AsyncWrite + Unpin + Send,
    {
        let (bytes, new_offset) = service.intermediate_results(handle, self.offset).await?;
        if new_offset <= self.offset || bytes.is_empty() {
            return Ok(0);
        }

        sink.write_all(&bytes).await?;
        sink.flush().await?;
        self.offset = new_offset;
        Ok(bytes.len())
    }
}
