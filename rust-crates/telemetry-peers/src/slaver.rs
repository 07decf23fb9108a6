//! Slaver heartbeat emitter

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::SLAVER_HEARTBEAT;

#[derive(Debug, Clone)]
pub struct SlaverOptions {
    pub master_addr: String,
    pub interval: Duration,
    pub reconnect_delay: Duration,
}

/// Send heartbeats to the master forever, reconnecting as needed
pub async fn run(options: SlaverOptions) {
    let heartbeat = format!("{}\n", SLAVER_HEARTBEAT);

    loop {
        info!("Connecting to mock-master {}", options.master_addr);

        let mut stream = match TcpStream::connect(&options.master_addr).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Connect failed: {}", e);
                sleep(options.reconnect_delay).await;
                continue;
            }
        };
        info!("Connected to mock-master");

        loop {
            if let Err(e) = stream.write_all(heartbeat.as_bytes()).await {
                warn!("Connection lost, reconnecting: {}", e);
                break;
            }
            debug!("Sent: {}", SLAVER_HEARTBEAT);
            sleep(options.interval).await;
        }

        sleep(options.reconnect_delay).await;
    }
}
