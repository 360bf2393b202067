// ABOUTME: Captures a child's stdout/stderr into size-capped in-memory buffers.
// ABOUTME: A drain task reads each pipe to end-of-stream so the child never blocks on a full pipe.

use std::sync::{Arc, Mutex};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;

/// Shared byte buffer that keeps at most `limit` bytes, dropping the oldest.
#[derive(Debug, Clone)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
    limit: usize,
}

impl CaptureBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            bytes: Arc::new(Mutex::new(Vec::new())),
            limit,
        }
    }

    fn append(&self, chunk: &[u8]) {
        let mut bytes = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        bytes.extend_from_slice(chunk);
        if bytes.len() > self.limit {
            let excess = bytes.len() - self.limit;
            bytes.drain(..excess);
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Captured bytes decoded as text (lossy) with surrounding whitespace trimmed
    pub fn text(&self) -> String {
        let bytes = self.bytes.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&bytes).trim().to_string()
    }
}

/// One captured output stream of a worker process.
#[derive(Debug)]
pub struct CapturedStream {
    buffer: CaptureBuffer,
    drain: Option<JoinHandle<()>>,
}

impl CapturedStream {
    /// Start draining `reader` into a new buffer. Must be called inside a tokio runtime.
    pub fn spawn<R>(reader: R, limit: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = CaptureBuffer::new(limit);
        let sink = buffer.clone();
        let drain = tokio::spawn(async move {
            let mut reader = reader;
            let mut chunk = [0u8; 4096];
            loop {
                match reader.read(&mut chunk).await {
                    Ok(0) => break,
                    Ok(n) => sink.append(&chunk[..n]),
                    Err(e) => {
                        tracing::debug!(error = %e, "Output capture stopped");
                        break;
                    }
                }
            }
        });

        Self {
            buffer,
            drain: Some(drain),
        }
    }

    /// A stream with nothing behind it (the pipe was not available)
    pub fn empty() -> Self {
        Self {
            buffer: CaptureBuffer::new(0),
            drain: None,
        }
    }

    pub fn buffer(&self) -> CaptureBuffer {
        self.buffer.clone()
    }

    /// Take the drain task so a caller can wait for end-of-stream without holding the stream.
    pub fn take_drain(&mut self) -> Option<JoinHandle<()>> {
        self.drain.take()
    }

    pub fn text(&self) -> String {
        self.buffer.text()
    }
}
