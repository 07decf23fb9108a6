use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex, MutexGuard, Notify};

use crate::error::{BroadcasterError, Result};
use crate::events::BroadcastEvent;

static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Process-unique identity of a UI connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    fn next() -> Self {
        Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Shared handle to the write side of one UI connection.
///
/// Clones refer to the same connection. Every line goes through a single
/// writer lock, so replies, broadcasts and streamed readings never interleave
/// within a line.
#[derive(Clone)]
pub struct Client {
    id: ClientId,
    writer: Arc<Mutex<BoxedWriter>>,
    closed: Arc<AtomicBool>,
    close_signal: Arc<Notify>,
}

impl Client {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            id: ClientId::next(),
            writer: Arc::new(Mutex::new(Box::new(writer))),
            closed: Arc::new(AtomicBool::new(false)),
            close_signal: Arc::new(Notify::new()),
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Acquire exclusive write access for a sequence of lines
    pub async fn writer(&self) -> ClientWriter<'_> {
        ClientWriter {
            client: self,
            guard: self.writer.lock().await,
        }
    }

    /// Write one line (newline appended)
    pub async fn send_line(&self, line: &str) -> Result<()> {
        self.writer().await.send_line(line).await
    }

    /// Send event to client
    pub async fn send_event(&self, event: &BroadcastEvent) -> Result<()> {
        self.writer().await.send_event(event).await
    }

    /// Mark the connection closed and wake its read loop.
    ///
    /// Later writes fail with [`BroadcasterError::Closed`]. The underlying
    /// writer is shut down unless another task is in the middle of a write.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.close_signal.notify_one();

        if let Ok(mut writer) = self.writer.try_lock() {
            let _ = writer.shutdown().await;
        }
    }

    /// Resolves once [`Client::close`] has been called
    pub async fn closed(&self) {
        if self.is_closed() {
            return;
        }
        self.close_signal.notified().await;
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Exclusive write access to a [`Client`], held across several lines
pub struct ClientWriter<'a> {
    client: &'a Client,
    guard: MutexGuard<'a, BoxedWriter>,
}

impl ClientWriter<'_> {
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        if self.client.is_closed() {
            return Err(BroadcasterError::Closed(self.client.id));
        }

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');

        self.guard.write_all(buf.as_bytes()).await?;
        self.guard.flush().await?;
        Ok(())
    }

    pub async fn send_event(&mut self, event: &BroadcastEvent) -> Result<()> {
        self.send_line(&event.to_string()).await
    }
}
