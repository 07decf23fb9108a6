//! TCP listeners for UI clients and the master link

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::{error, info};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::router::Relay;

/// Relay with both listeners bound
pub struct RelayServer {
    relay: Arc<Relay>,
    ui_listener: TcpListener,
    master_listener: TcpListener,
    sweep_interval: Duration,
}

impl RelayServer {
    /// Bind both listeners. Failure here is fatal to the process.
    pub async fn bind(config: &RelayConfig) -> Result<Self> {
        Self::bind_with(config, Arc::new(Relay::new(config))).await
    }

    /// Bind both listeners around existing relay state
    pub async fn bind_with(config: &RelayConfig, relay: Arc<Relay>) -> Result<Self> {
        let ui_listener = bind_listener("UI", &config.ui_addr).await?;
        let master_listener = bind_listener("MASTER", &config.master_addr).await?;

        info!("UI listener: {}", ui_listener.local_addr()?);
        info!("MASTER listener: {}", master_listener.local_addr()?);

        Ok(Self {
            relay,
            ui_listener,
            master_listener,
            sweep_interval: config.sweep_interval(),
        })
    }

    pub fn ui_addr(&self) -> Result<SocketAddr> {
        Ok(self.ui_listener.local_addr()?)
    }

    pub fn master_addr(&self) -> Result<SocketAddr> {
        Ok(self.master_listener.local_addr()?)
    }

    pub fn relay(&self) -> Arc<Relay> {
        Arc::clone(&self.relay)
    }

    /// Spawn the liveness sweep and accept connections forever
    pub async fn run(self) {
        tokio::spawn(Arc::clone(self.relay.link()).run_sweeper(self.sweep_interval));

        let ui = accept_ui(self.ui_listener, Arc::clone(&self.relay));
        let master = accept_master(self.master_listener, self.relay);
        tokio::join!(ui, master);
    }
}

async fn bind_listener(role: &'static str, addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|source| RelayError::Bind {
        role,
        addr: addr.to_string(),
        source,
    })
}

async fn accept_ui(listener: TcpListener, relay: Arc<Relay>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let relay = Arc::clone(&relay);
                tokio::spawn(async move {
                    let (reader, writer) = stream.into_split();
                    relay.serve_ui(reader, writer, &addr.to_string()).await;
                });
            }
            Err(e) => error!("[UI] Accept error: {}", e),
        }
    }
}

async fn accept_master(listener: TcpListener, relay: Arc<Relay>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let relay = Arc::clone(&relay);
                tokio::spawn(async move {
                    relay.serve_master(stream, &addr.to_string()).await;
                });
            }
            Err(e) => error!("[MASTER] Accept error: {}", e),
        }
    }
}
