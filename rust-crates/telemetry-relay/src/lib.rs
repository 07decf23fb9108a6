//! Telemetry relay library
//!
//! Central relay between UI clients and the master/slaver control plane:
//! session registry, link status tracking, synthetic measurement streams and
//! the line protocol that ties them together.

pub mod commands;
pub mod config;
pub mod error;
pub mod link_status;
pub mod router;
pub mod server;
pub mod sessions;
pub mod streamer;

pub use config::{RelayConfig, StreamConfig};
pub use error::{RelayError, Result};
pub use router::Relay;
pub use server::RelayServer;
