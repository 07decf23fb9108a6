//! UI client fan-out for the telemetry relay
//!
//! This crate owns everything the relay knows about its connected UI clients:
//! a write handle per connection, the registry of live connections with their
//! staged settings, and the status broadcast to all of them.
//!
//! # Features
//!
//! - Newline-delimited text protocol
//! - Multiple concurrent client connections
//! - Catch-up on join (current link status)
//! - Self-healing membership: a failed write unregisters and closes the client
//! - Read-once pending settings per connection
//!
//! # Event Types
//!
//! - `MASTER_STATUS CONNECTED|DISCONNECTED`
//! - `SLAVER_STATUS CONNECTED|DISCONNECTED`
//!
//! # Example Usage
//!
//! ```no_run
//! use telemetry_broadcaster::{BroadcastEvent, Client, ClientManager, LinkState};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = ClientManager::new();
//!
//!     let stream = tokio::net::TcpStream::connect("127.0.0.1:8082").await?;
//!     let (_read, write) = stream.into_split();
//!     let client = Client::new(write);
//!
//!     // Register with an empty catch-up
//!     manager.register(&client, async { Vec::new() }).await?;
//!
//!     manager
//!         .broadcast(&BroadcastEvent::MasterStatus(LinkState::Connected))
//!         .await;
//!
//!     manager.unregister(client.id()).await;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod events;
pub mod manager;

// Re-exports
pub use client::{Client, ClientId, ClientWriter};
pub use error::{BroadcasterError, Result};
pub use events::{BroadcastEvent, LinkState};
pub use manager::ClientManager;
