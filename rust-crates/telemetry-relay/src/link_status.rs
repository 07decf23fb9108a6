//! Master/slaver connectivity tracking
//!
//! The master connects to the relay directly. The slaver never does: its
//! liveness arrives as heartbeats forwarded over the master link and expires
//! when the sweep sees none for longer than the timeout.
//!
//! Every transition is decided while holding the flags lock and broadcast once,
//! after the lock is released.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use telemetry_broadcaster::{BroadcastEvent, ClientManager, LinkState};
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::info;

/// Identity of one accepted master connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterLinkId(u64);

#[derive(Debug, Default)]
struct LinkFlags {
    active_master: Option<MasterLinkId>,
    slaver_connected: bool,
    last_slaver_seen: Option<Instant>,
}

/// Point-in-time view of both links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub master_connected: bool,
    pub slaver_connected: bool,
}

pub struct LinkStatusTracker {
    flags: Mutex<LinkFlags>,
    clients: ClientManager,
    slaver_timeout: Duration,
    next_link_id: AtomicU64,
}

impl LinkStatusTracker {
    pub fn new(clients: ClientManager, slaver_timeout: Duration) -> Self {
        Self {
            flags: Mutex::new(LinkFlags::default()),
            clients,
            slaver_timeout,
            next_link_id: AtomicU64::new(1),
        }
    }

    pub async fn snapshot(&self) -> LinkSnapshot {
        let flags = self.flags.lock().await;
        LinkSnapshot {
            master_connected: flags.active_master.is_some(),
            slaver_connected: flags.slaver_connected,
        }
    }

    /// Status lines a newly joined UI client should receive
    pub async fn catch_up(&self) -> Vec<BroadcastEvent> {
        let snapshot = self.snapshot().await;
        let mut events = Vec::with_capacity(2);
        if snapshot.master_connected {
            events.push(BroadcastEvent::MasterStatus(LinkState::Connected));
        }
        if snapshot.slaver_connected {
            events.push(BroadcastEvent::SlaverStatus(LinkState::Connected));
        }
        events
    }

    /// A master connection was accepted; it replaces any previous one.
    pub async fn master_connected(&self) -> MasterLinkId {
        let id = MasterLinkId(self.next_link_id.fetch_add(1, Ordering::Relaxed));

        let was_connected = {
            let mut flags = self.flags.lock().await;
            flags.active_master.replace(id).is_some()
        };

        if was_connected {
            info!("Master link replaced by a new connection");
        } else {
            info!("Master link up");
            self.clients
                .broadcast(&BroadcastEvent::MasterStatus(LinkState::Connected))
                .await;
        }
        id
    }

    /// A master connection closed. Only the active connection clears the
    /// status; returns whether that happened.
    pub async fn master_disconnected(&self, id: MasterLinkId) -> bool {
        let cleared = {
            let mut flags = self.flags.lock().await;
            if flags.active_master == Some(id) {
                flags.active_master = None;
                true
            } else {
                false
            }
        };

        if cleared {
            info!("Master link down");
            self.clients
                .broadcast(&BroadcastEvent::MasterStatus(LinkState::Disconnected))
                .await;
        }
        cleared
    }

    /// Heartbeat forwarded from the slaver. Returns whether it brought the slaver up.
    pub async fn slaver_alive(&self) -> bool {
        let came_up = {
            let mut flags = self.flags.lock().await;
            flags.last_slaver_seen = Some(Instant::now());
            !std::mem::replace(&mut flags.slaver_connected, true)
        };

        if came_up {
            info!("Slaver link up");
            self.clients
                .broadcast(&BroadcastEvent::SlaverStatus(LinkState::Connected))
                .await;
        }
        came_up
    }

    /// One liveness check. Returns whether the slaver timed out.
    pub async fn sweep(&self) -> bool {
        let timed_out = {
            let mut flags = self.flags.lock().await;
            let expired = flags
                .last_slaver_seen
                .is_some_and(|seen| seen.elapsed() > self.slaver_timeout);
            if flags.slaver_connected && expired {
                flags.slaver_connected = false;
                true
            } else {
                false
            }
        };

        if timed_out {
            info!("Slaver link timed out after {:?}", self.slaver_timeout);
            self.clients
                .broadcast(&BroadcastEvent::SlaverStatus(LinkState::Disconnected))
                .await;
        }
        timed_out
    }

    /// Run the liveness sweep forever
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.sweep().await;
        }
    }
}
