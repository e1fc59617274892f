//! Bridge lifecycle management shared by the Redis backend.
//!
//! One bridge task per channel (not per subscriber): the bridge owns a
//! dedicated Redis SUBSCRIBE connection and forwards messages into a local
//! `tokio::broadcast` channel that every local subscriber reads from.
//! Reference counting removes the bridge (and its task) once the last local
//! subscriber disconnects.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

const DEFAULT_BROADCAST_CAPACITY: usize = 1_024;

pub struct BridgeManager {
    bridges: RwLock<HashMap<String, Arc<Bridge>>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
    broadcast_capacity: usize,
}

impl Default for BridgeManager {
    fn default() -> Self {
        Self::new(DEFAULT_BROADCAST_CAPACITY)
    }
}

impl BridgeManager {
    pub fn new(broadcast_capacity: usize) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            bridges: RwLock::new(HashMap::new()),
            shutdown_tx,
            shutdown_rx,
            broadcast_capacity,
        }
    }

    /// Returns (bridge, is_new). Caller starts the bridge task when is_new.
    pub fn get_or_create(&self, channel: &str) -> (Arc<Bridge>, bool) {
        {
            let bridges = self.bridges.read();
            if let Some(bridge) = bridges.get(channel) {
                return (Arc::clone(bridge), false);
            }
        }

        let mut bridges = self.bridges.write();
        if let Some(bridge) = bridges.get(channel) {
            return (Arc::clone(bridge), false);
        }

        let bridge = Arc::new(Bridge::new(
            channel.to_string(),
            self.broadcast_capacity,
            self.shutdown_rx.clone(),
        ));
        bridges.insert(channel.to_string(), Arc::clone(&bridge));
        (bridge, true)
    }

    pub fn remove_if_idle(&self, channel: &str) {
        let mut bridges = self.bridges.write();
        if let Some(bridge) = bridges.get(channel)
            && bridge.subscriber_count() == 0
        {
            bridge.stop();
            bridges.remove(channel);
            tracing::debug!(channel, "Removed idle pub/sub bridge");
        }
    }

    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        let bridges: Vec<Arc<Bridge>> = self.bridges.read().values().cloned().collect();
        for bridge in bridges {
            bridge.wait_for_stop().await;
        }
        self.bridges.write().clear();
    }
}

pub struct Bridge {
    channel: String,
    sender: broadcast::Sender<Vec<u8>>,
    subscriber_count: AtomicU64,
    task_handle: Mutex<Option<JoinHandle<()>>>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Bridge {
    fn new(channel: String, capacity: usize, shutdown_rx: watch::Receiver<bool>) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            channel,
            sender,
            subscriber_count: AtomicU64::new(0),
            task_handle: Mutex::new(None),
            stop_tx,
            stop_rx,
            shutdown_rx,
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn subscriber_count(&self) -> u64 {
        self.subscriber_count.load(Ordering::SeqCst)
    }

    pub fn add_subscriber(&self) -> u64 {
        self.subscriber_count.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn remove_subscriber(&self) -> u64 {
        self.subscriber_count.fetch_sub(1, Ordering::SeqCst).saturating_sub(1)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<u8>> {
        self.sender.subscribe()
    }

    pub fn send(&self, payload: Vec<u8>) -> Result<usize, broadcast::error::SendError<Vec<u8>>> {
        self.sender.send(payload)
    }

    pub fn is_task_running(&self) -> bool {
        self.task_handle.lock().is_some()
    }

    pub fn set_task(&self, handle: JoinHandle<()>) {
        let mut guard = self.task_handle.lock();
        if let Some(old) = guard.take() {
            old.abort();
        }
        *guard = Some(handle);
    }

    pub fn stop_rx(&self) -> watch::Receiver<bool> {
        self.stop_rx.clone()
    }

    pub fn shutdown_rx(&self) -> watch::Receiver<bool> {
        self.shutdown_rx.clone()
    }

    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub async fn wait_for_stop(&self) {
        let handle = self.task_handle.lock().take();
        if let Some(h) = handle {
            let _ = tokio::time::timeout(std::time::Duration::from_secs(5), h).await;
        }
    }
}

/// A subscription that decrements the bridge's subscriber count on drop, and
/// schedules bridge removal once the last local subscriber is gone.
pub struct ManagedSubscription {
    receiver: broadcast::Receiver<Vec<u8>>,
    bridge: Arc<Bridge>,
    manager: Arc<BridgeManager>,
}

impl ManagedSubscription {
    pub fn new(
        receiver: broadcast::Receiver<Vec<u8>>,
        bridge: Arc<Bridge>,
        manager: Arc<BridgeManager>,
    ) -> Self {
        Self {
            receiver,
            bridge,
            manager,
        }
    }

    pub async fn recv(&mut self) -> Result<Vec<u8>, broadcast::error::RecvError> {
        self.receiver.recv().await
    }
}

impl Drop for ManagedSubscription {
    fn drop(&mut self) {
        let remaining = self.bridge.remove_subscriber();
        let channel = self.bridge.channel().to_string();
        if remaining == 0 {
            let manager = Arc::clone(&self.manager);
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                manager.remove_if_idle(&channel);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bridge_lifecycle() {
        let manager = Arc::new(BridgeManager::new(100));
        let (bridge, is_new) = manager.get_or_create("room-1");
        assert!(is_new);
        bridge.add_subscriber();

        let (bridge2, is_new2) = manager.get_or_create("room-1");
        assert!(!is_new2);
        bridge2.add_subscriber();
        assert_eq!(bridge.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn managed_subscription_cleans_up_idle_bridge() {
        let manager = Arc::new(BridgeManager::new(100));
        let (bridge, _) = manager.get_or_create("room-1");
        bridge.add_subscriber();
        let receiver = bridge.subscribe();
        let sub = ManagedSubscription::new(receiver, bridge, Arc::clone(&manager));

        drop(sub);
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;

        let (_, is_new) = manager.get_or_create("room-1");
        assert!(is_new, "bridge should have been removed once idle");
    }
}
