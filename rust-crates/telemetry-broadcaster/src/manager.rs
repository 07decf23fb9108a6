use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::client::{Client, ClientId};
use crate::error::Result;
use crate::events::BroadcastEvent;

/// Per-connection state kept alongside the client handle
struct ClientEntry {
    client: Client,
    pending_settings: Option<String>,
}

/// Thread-safe registry of connected UI clients.
///
/// Owns the subscriber set and each connection's staged settings. Also the
/// broadcast dispatcher: [`ClientManager::broadcast`] fans an event out to
/// every member and prunes the ones that fail.
#[derive(Clone, Default)]
pub struct ClientManager {
    clients: Arc<Mutex<HashMap<ClientId, ClientEntry>>>,
}

impl ClientManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client and send it the catch-up events.
    ///
    /// `catch_up` is awaited after the client is a member and while its writer
    /// is held, so a concurrent broadcast is written after the catch-up lines
    /// and a newer state always lands last.
    pub async fn register<F>(&self, client: &Client, catch_up: F) -> Result<()>
    where
        F: Future<Output = Vec<BroadcastEvent>>,
    {
        let mut writer = client.writer().await;

        {
            let mut clients = self.clients.lock().await;
            clients.insert(
                client.id(),
                ClientEntry {
                    client: client.clone(),
                    pending_settings: None,
                },
            );
            tracing::info!("Client {} registered. Total clients: {}", client.id(), clients.len());
        }

        for event in catch_up.await {
            writer.send_event(&event).await?;
        }

        Ok(())
    }

    /// Remove a client. Returns whether it was still registered.
    pub async fn unregister(&self, id: ClientId) -> bool {
        let mut clients = self.clients.lock().await;
        let removed = clients.remove(&id).is_some();
        if removed {
            tracing::info!("Client {} unregistered. Remaining: {}", id, clients.len());
        }
        removed
    }

    /// Stage settings for the next measurement start on this connection
    pub async fn set_pending(&self, id: ClientId, settings: impl Into<String>) {
        if let Some(entry) = self.clients.lock().await.get_mut(&id) {
            entry.pending_settings = Some(settings.into());
        }
    }

    /// Take the staged settings, leaving none behind. Empty when nothing was staged.
    pub async fn consume_pending(&self, id: ClientId) -> String {
        self.clients
            .lock()
            .await
            .get_mut(&id)
            .and_then(|entry| entry.pending_settings.take())
            .map(|settings| settings.trim().to_string())
            .unwrap_or_default()
    }

    /// Broadcast event to all clients, removing dead ones.
    ///
    /// Membership is snapshotted first and the lock released before any write.
    /// Returns how many clients received the event.
    pub async fn broadcast(&self, event: &BroadcastEvent) -> usize {
        let snapshot: Vec<Client> = {
            let clients = self.clients.lock().await;
            clients.values().map(|entry| entry.client.clone()).collect()
        };

        let mut delivered = 0;
        let mut dead = Vec::new();

        for client in snapshot {
            match client.send_event(event).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!("Failed to send to client {}: {}", client.id(), e);
                    dead.push(client);
                }
            }
        }

        if !dead.is_empty() {
            {
                let mut clients = self.clients.lock().await;
                for client in &dead {
                    clients.remove(&client.id());
                }
                tracing::info!("Removed {} dead client(s). Remaining: {}", dead.len(), clients.len());
            }
            for client in dead {
                client.close().await;
            }
        }

        delivered
    }

    /// Get current client count
    pub async fn client_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    #[cfg(test)]
    async fn contains(&self, id: ClientId) -> bool {
        self.clients.lock().await.contains_key(&id)
    }
}
