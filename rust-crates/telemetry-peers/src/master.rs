//! Master relay: slaver lines in, relay link out

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::MASTER_ANNOUNCE;

/// Lines waiting for the relay link
const FORWARD_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct MasterOptions {
    /// Relay master listener
    pub server_addr: String,
    /// Where slavers connect
    pub listen_addr: String,
    pub reconnect_delay: Duration,
}

pub struct MockMaster {
    listener: TcpListener,
    options: MasterOptions,
}

impl MockMaster {
    pub async fn bind(options: MasterOptions) -> Result<Self> {
        let listener = TcpListener::bind(&options.listen_addr)
            .await
            .with_context(|| format!("Failed to listen on {}", options.listen_addr))?;
        info!("mock-master listening on {}", listener.local_addr()?);
        Ok(Self { listener, options })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept slavers and keep the relay link up, forever
    pub async fn run(self) -> Result<()> {
        let (tx, rx) = mpsc::channel(FORWARD_BUFFER);
        tokio::spawn(uplink(
            self.options.server_addr.clone(),
            self.options.reconnect_delay,
            rx,
        ));

        loop {
            let (stream, addr) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Accept error: {}", e);
                    continue;
                }
            };
            info!("Slaver connected: {}", addr);
            tokio::spawn(forward_slaver(stream, addr, tx.clone()));
        }
    }
}

async fn forward_slaver(stream: TcpStream, addr: SocketAddr, tx: mpsc::Sender<String>) {
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                debug!("From slaver {}: {}", addr, line);
                if tx.send(line.to_string()).await.is_err() {
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                debug!("Read from slaver {} failed: {}", addr, e);
                break;
            }
        }
    }
    info!("Slaver disconnected: {}", addr);
}

/// Own the relay connection, announcing on every (re)connect
async fn uplink(server_addr: String, reconnect_delay: Duration, mut rx: mpsc::Receiver<String>) {
    loop {
        match TcpStream::connect(&server_addr).await {
            Ok(stream) => {
                info!("Connected to relay {}", server_addr);
                if !forward_to_relay(stream, &mut rx).await {
                    return;
                }
                warn!("Relay link lost, reconnecting in {:?}", reconnect_delay);
            }
            Err(e) => {
                warn!("Failed to connect to relay {}: {}", server_addr, e);
            }
        }
        sleep(reconnect_delay).await;
    }
}

/// Returns false once every slaver sender is gone
async fn forward_to_relay(stream: TcpStream, rx: &mut mpsc::Receiver<String>) -> bool {
    let (mut reader, mut writer) = stream.into_split();

    if let Err(e) = writer.write_all(format!("{}\n", MASTER_ANNOUNCE).as_bytes()).await {
        warn!("Announce failed: {}", e);
        return true;
    }

    // Lines queued while the link was down are stale
    let mut dropped = 0usize;
    loop {
        match rx.try_recv() {
            Ok(_) => dropped += 1,
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => return false,
        }
    }
    if dropped > 0 {
        debug!("Dropped {} lines queued while the relay was down", dropped);
    }

    let mut scratch = [0u8; 256];
    loop {
        tokio::select! {
            line = rx.recv() => {
                let Some(line) = line else { return false };
                if let Err(e) = writer.write_all(format!("{}\n", line).as_bytes()).await {
                    warn!("Forward failed: {}", e);
                    return true;
                }
            }
            read = reader.read(&mut scratch) => {
                // The relay never writes on this link; EOF or error means it is gone.
                if matches!(read, Ok(0) | Err(_)) {
                    return true;
                }
            }
        }
    }
}
