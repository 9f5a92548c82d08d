//! Channel subscription lifecycle.
//!
//! [`ChannelRegistry`] guarantees at most one live subscription per topic
//! per process. Subscribing to a topic that already has a live entry
//! replaces it, which absorbs rapid remounts of the same screen without
//! duplicate-subscribe errors. Handles are explicit: a [`Subscription`]
//! is closed, not garbage-collected.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tracing::debug;

use syncterest_shared::protocol::ChannelConfig;

use crate::error::{RealtimeError, Result};
use crate::socket::SocketCommand;

/// Tracks live subscriptions by topic. Cloning shares the registry.
#[derive(Clone)]
pub struct ChannelRegistry {
    cmd_tx: mpsc::Sender<SocketCommand>,
    // topic -> generation of the currently live handle
    live: Arc<Mutex<HashMap<String, u64>>>,
    next_generation: Arc<Mutex<u64>>,
}

/// Handle to one live subscription. Stale handles (replaced by a newer
/// subscribe on the same topic) close as a no-op.
pub struct Subscription {
    topic: String,
    generation: u64,
    cmd_tx: mpsc::Sender<SocketCommand>,
    live: Arc<Mutex<HashMap<String, u64>>>,
}

impl ChannelRegistry {
    pub fn new(cmd_tx: mpsc::Sender<SocketCommand>) -> Self {
        Self {
            cmd_tx,
            live: Arc::new(Mutex::new(HashMap::new())),
            next_generation: Arc::new(Mutex::new(0)),
        }
    }

    /// Subscribe to a topic, replacing any live subscription with the
    /// same topic name.
    pub async fn subscribe(&self, topic: &str, config: ChannelConfig) -> Result<Subscription> {
        let generation = {
            let mut next = self.next_generation.lock().unwrap_or_else(PoisonError::into_inner);
            *next += 1;
            *next
        };

        {
            let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
            if live.insert(topic.to_string(), generation).is_some() {
                debug!(topic = %topic, "Replacing live subscription handle");
            }
        }

        self.cmd_tx
            .send(SocketCommand::Subscribe {
                topic: topic.to_string(),
                config,
            })
            .await
            .map_err(|_| RealtimeError::SocketGone)?;

        Ok(Subscription {
            topic: topic.to_string(),
            generation,
            cmd_tx: self.cmd_tx.clone(),
            live: self.live.clone(),
        })
    }

    /// Whether a topic currently has a live subscription.
    pub fn is_live(&self, topic: &str) -> bool {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).contains_key(topic)
    }

    /// Number of live subscriptions.
    pub fn live_count(&self) -> usize {
        self.live.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl Subscription {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Unsubscribe and remove the registry entry. A handle that has been
    /// replaced by a newer subscription does nothing.
    pub async fn close(self) -> Result<()> {
        let still_current = {
            let mut live = self.live.lock().unwrap_or_else(PoisonError::into_inner);
            match live.get(&self.topic) {
                Some(generation) if *generation == self.generation => {
                    live.remove(&self.topic);
                    true
                }
                _ => false,
            }
        };

        if still_current {
            debug!(topic = %self.topic, "Closing subscription");
            self.cmd_tx
                .send(SocketCommand::Unsubscribe {
                    topic: self.topic.clone(),
                })
                .await
                .map_err(|_| RealtimeError::SocketGone)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (ChannelRegistry, mpsc::Receiver<SocketCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        (ChannelRegistry::new(cmd_tx), cmd_rx)
    }

    #[tokio::test]
    async fn double_mount_keeps_one_live_subscription() {
        let (registry, _cmd_rx) = registry();

        let first = registry
            .subscribe("chat:abc", ChannelConfig::default())
            .await
            .unwrap();
        let second = registry
            .subscribe("chat:abc", ChannelConfig::default())
            .await
            .unwrap();

        assert_eq!(registry.live_count(), 1);

        // The stale handle's cleanup must not tear down the live one.
        first.close().await.unwrap();
        assert!(registry.is_live("chat:abc"));

        second.close().await.unwrap();
        assert!(!registry.is_live("chat:abc"));
        assert_eq!(registry.live_count(), 0);
    }

    #[tokio::test]
    async fn close_sends_unsubscribe_only_when_current() {
        let (registry, mut cmd_rx) = registry();

        let first = registry
            .subscribe("live-users", ChannelConfig::with_presence())
            .await
            .unwrap();
        let second = registry
            .subscribe("live-users", ChannelConfig::with_presence())
            .await
            .unwrap();

        first.close().await.unwrap();
        second.close().await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(cmd) = cmd_rx.try_recv() {
            kinds.push(match cmd {
                SocketCommand::Subscribe { .. } => "subscribe",
                SocketCommand::Unsubscribe { .. } => "unsubscribe",
                _ => "other",
            });
        }
        // Two subscribes, one unsubscribe: the stale close was a no-op.
        assert_eq!(kinds, vec!["subscribe", "subscribe", "unsubscribe"]);
    }

    #[tokio::test]
    async fn distinct_topics_coexist() {
        let (registry, _cmd_rx) = registry();

        let _a = registry
            .subscribe("chat:a", ChannelConfig::default())
            .await
            .unwrap();
        let _b = registry
            .subscribe("chat:b", ChannelConfig::default())
            .await
            .unwrap();

        assert_eq!(registry.live_count(), 2);
    }
}
