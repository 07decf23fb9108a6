use std::time::Duration;

use clap::Parser;

use telemetry_peers::slaver::{self, SlaverOptions};

#[derive(Parser, Debug)]
#[command(name = "mock-slaver", about = "Sends heartbeats to the mock master")]
struct Args {
    /// Mock master address
    #[arg(long, default_value = "127.0.0.1:9090")]
    master: String,

    /// Seconds between heartbeats
    #[arg(long, default_value_t = 5)]
    interval_secs: u64,

    /// Delay before reconnecting to the master
    #[arg(long, default_value_t = 5)]
    reconnect_secs: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    telemetry_peers::init_logging("info");

    slaver::run(SlaverOptions {
        master_addr: args.master,
        interval: Duration::from_secs(args.interval_secs),
        reconnect_delay: Duration::from_secs(args.reconnect_secs),
    })
    .await;
}
