//! Mock control-plane peers for the telemetry relay
//!
//! - `mock-master` holds the relay's master link and forwards every line its
//!   slavers send.
//! - `mock-slaver` connects to the master and emits `SLAVER_STATUS ISALIVE`
//!   heartbeats.
//!
//! Both reconnect after a fixed delay when their upstream goes away.

pub mod master;
pub mod slaver;

/// Sent by the master once per relay connection
pub const MASTER_ANNOUNCE: &str = "MASTER_STATUS CONNECTED";

/// Heartbeat sent by the slaver
pub const SLAVER_HEARTBEAT: &str = "SLAVER_STATUS ISALIVE";

/// Install the fmt subscriber shared by both binaries
pub fn init_logging(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .init();
}
