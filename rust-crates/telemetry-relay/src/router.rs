//! Per-connection read loops and command dispatch

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use telemetry_broadcaster::{Client, ClientManager};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tracing::{debug, info, warn};

use crate::commands::{MasterMessage, Reply, UiCommand};
use crate::config::RelayConfig;
use crate::link_status::LinkStatusTracker;
use crate::sessions::{demo_sessions, SessionRegistry};
use crate::streamer::{Jitter, MeasurementStream, StreamPlan};

/// Reply to write, plus a stream to start once the reply is out
struct Dispatch {
    reply: Reply,
    stream: Option<MeasurementStream>,
}

impl From<Reply> for Dispatch {
    fn from(reply: Reply) -> Self {
        Self { reply, stream: None }
    }
}

/// Read one newline-terminated line, replacing invalid UTF-8.
/// `Ok(None)` on EOF. Bytes already in `buf` are kept, so the read can be
/// resumed after being cancelled in a `select!`.
async fn read_line_lossy<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    if reader.read_until(b'\n', buf).await? == 0 && buf.is_empty() {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(buf).into_owned();
    buf.clear();
    Ok(Some(line))
}

/// Shared relay state handed to every connection task
pub struct Relay {
    sessions: SessionRegistry,
    clients: ClientManager,
    link: Arc<LinkStatusTracker>,
    plan: StreamPlan,
    jitter_seed: Option<u64>,
    streams_started: AtomicU64,
}

impl Relay {
    pub fn new(config: &RelayConfig) -> Self {
        let sessions = if config.seed_demo_sessions {
            SessionRegistry::with_sessions(demo_sessions())
        } else {
            SessionRegistry::new()
        };
        Self::with_parts(
            sessions,
            StreamPlan::from(&config.stream),
            config.slaver_timeout(),
            config.jitter_seed,
        )
    }

    pub fn with_parts(
        sessions: SessionRegistry,
        plan: StreamPlan,
        slaver_timeout: Duration,
        jitter_seed: Option<u64>,
    ) -> Self {
        let clients = ClientManager::new();
        let link = Arc::new(LinkStatusTracker::new(clients.clone(), slaver_timeout));
        Self {
            sessions,
            clients,
            link,
            plan,
            jitter_seed,
            streams_started: AtomicU64::new(0),
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn clients(&self) -> &ClientManager {
        &self.clients
    }

    pub fn link(&self) -> &Arc<LinkStatusTracker> {
        &self.link
    }

    /// Serve one UI connection until it disconnects or is closed by a failed write
    pub async fn serve_ui<R, W>(&self, reader: R, writer: W, peer: &str)
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let client = Client::new(writer);
        info!("[UI] Connected: {} (client {})", peer, client.id());

        if let Err(e) = self.clients.register(&client, self.link.catch_up()).await {
            warn!("[UI] Catch-up to {} failed: {}", peer, e);
            self.clients.unregister(client.id()).await;
            client.close().await;
            return;
        }

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            let line = tokio::select! {
                line = read_line_lossy(&mut reader, &mut buf) => line,
                _ = client.closed() => {
                    debug!("[UI] Client {} closed by relay", client.id());
                    break;
                }
            };

            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    info!("[UI] Client disconnected: {}", peer);
                    break;
                }
                Err(e) => {
                    info!("[UI] Read from {} failed: {}", peer, e);
                    break;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!("[UI] Received: {}", line);

            let Dispatch { reply, stream } = self.dispatch(&client, line).await;
            if let Err(e) = client.send_line(&reply.to_string()).await {
                warn!("[UI] Reply to {} failed: {}", peer, e);
                break;
            }
            if let Some(stream) = stream {
                stream.spawn();
            }
        }

        self.clients.unregister(client.id()).await;
        client.close().await;
    }

    async fn dispatch(&self, client: &Client, line: &str) -> Dispatch {
        let command = match UiCommand::parse(line) {
            Ok(command) => command,
            Err(e) => return Reply::from(e).into(),
        };

        match command {
            UiCommand::GetSessions => Reply::Sessions(self.sessions.list().await).into(),
            UiCommand::StartMeasurement { session_id } => {
                let settings = self.clients.consume_pending(client.id()).await;
                self.sessions.apply_settings(&session_id, &settings).await;

                let stream = MeasurementStream::new(
                    client.clone(),
                    session_id.clone(),
                    self.sessions.clone(),
                    self.plan,
                    self.next_jitter(),
                );
                Dispatch {
                    reply: Reply::MeasurementStarted(session_id),
                    stream: Some(stream),
                }
            }
            UiCommand::AddSession(session) => {
                self.sessions.add(session).await;
                Reply::SessionAdded.into()
            }
            UiCommand::RemoveSession { session_id } => {
                if self.sessions.remove(&session_id).await {
                    Reply::SessionRemoved.into()
                } else {
                    Reply::SessionNotFound.into()
                }
            }
            UiCommand::SetSettings { settings } => {
                info!("[UI] Settings staged for client {}: {}", client.id(), settings);
                self.clients.set_pending(client.id(), settings).await;
                Reply::SettingsApplied.into()
            }
        }
    }

    fn next_jitter(&self) -> Jitter {
        let n = self.streams_started.fetch_add(1, Ordering::Relaxed);
        match self.jitter_seed {
            Some(seed) => Jitter::seeded(seed.wrapping_add(n)),
            None => Jitter::from_entropy(),
        }
    }

    /// Serve one master connection. Accept and close drive the master status.
    pub async fn serve_master<R>(&self, reader: R, peer: &str)
    where
        R: AsyncRead + Unpin,
    {
        let link_id = self.link.master_connected().await;
        info!("[MASTER] Connected: {}", peer);

        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            let line = match read_line_lossy(&mut reader, &mut buf).await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    info!("[MASTER] Read from {} failed: {}", peer, e);
                    break;
                }
            };

            match MasterMessage::parse(&line) {
                None => continue,
                Some(MasterMessage::SlaverAlive) => {
                    debug!("[MASTER] Slaver heartbeat");
                    self.link.slaver_alive().await;
                }
                Some(MasterMessage::MasterAnnounce) => {
                    debug!("[MASTER] Announce received");
                }
                Some(MasterMessage::Other(message)) => {
                    warn!("[MASTER] Unexpected message: {}", message);
                }
            }
        }

        self.link.master_disconnected(link_id).await;
        info!("[MASTER] Disconnected: {}", peer);
    }
}
