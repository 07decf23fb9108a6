use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use telemetry_peers::master::{MasterOptions, MockMaster};

#[derive(Parser, Debug)]
#[command(name = "mock-master", about = "Forwards slaver heartbeats to the telemetry relay")]
struct Args {
    /// Relay master listener
    #[arg(long, default_value = "127.0.0.1:9091")]
    server: String,

    /// Address slavers connect to
    #[arg(long, default_value = "127.0.0.1:9090")]
    listen: String,

    /// Delay before reconnecting to the relay
    #[arg(long, default_value_t = 5)]
    reconnect_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    telemetry_peers::init_logging("info");

    let master = MockMaster::bind(MasterOptions {
        server_addr: args.server,
        listen_addr: args.listen,
        reconnect_delay: Duration::from_secs(args.reconnect_secs),
    })
    .await?;

    master.run().await
}
