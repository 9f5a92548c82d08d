//! Socket task with a tokio mpsc command/notification pattern.
//!
//! The realtime connection is owned by a dedicated tokio task. External
//! code talks to it through typed command and notification channels,
//! keeping subscription state in one place.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use url::Url;

use syncterest_shared::constants::PRESENCE_HEARTBEAT_SECS;
use syncterest_shared::protocol::{
    ChangeKind, ChannelConfig, PresenceMeta, PresenceSnapshot, RealtimeMessage,
};

use crate::error::Result;
use crate::transport::{RealtimeTransport, TransportEvent};

// ---------------------------------------------------------------------------
// Command / notification types
// ---------------------------------------------------------------------------

/// Commands sent *into* the socket task.
#[derive(Debug)]
pub enum SocketCommand {
    /// Join a topic. An existing subscription with the same topic is left
    /// first, so the newest join always wins.
    Subscribe {
        topic: String,
        config: ChannelConfig,
    },
    /// Leave a topic.
    Unsubscribe { topic: String },
    /// Publish an ad hoc broadcast on a topic.
    Broadcast {
        topic: String,
        event: String,
        payload: Value,
    },
    /// Announce our presence on a topic.
    TrackPresence { topic: String, meta: PresenceMeta },
    /// Request the list of currently subscribed topics.
    ActiveTopics(oneshot::Sender<Vec<String>>),
    /// Gracefully shut down the socket.
    Shutdown,
}

/// Notifications sent *from* the socket task to the application.
#[derive(Debug, Clone)]
pub enum SocketNotification {
    /// The server acknowledged a subscription.
    Subscribed { topic: String },
    /// A broadcast arrived on a subscribed topic.
    Broadcast {
        topic: String,
        event: String,
        payload: Value,
    },
    /// Full presence snapshot. Replaces any local presence state.
    PresenceSync {
        topic: String,
        state: PresenceSnapshot,
    },
    /// Incremental presence change.
    PresenceDiff {
        topic: String,
        joins: HashMap<String, PresenceMeta>,
        leaves: HashMap<String, PresenceMeta>,
    },
    /// A database row changed under a topic's change filter.
    PostgresChange {
        topic: String,
        table: String,
        change: ChangeKind,
        record: Value,
    },
    /// The server closed a channel.
    ChannelClosed { topic: String },
    /// The transport went down. No automatic retry is attempted.
    TransportDown { error: Option<String> },
}

/// Configuration for spawning the socket task.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// Realtime endpoint of the backend service.
    pub url: Url,
    /// Access token of the signed-in session.
    pub access_token: String,
}

/// Spawn the realtime socket in a background tokio task.
///
/// Returns channels for sending commands and receiving notifications.
pub async fn spawn_socket(
    transport: Arc<dyn RealtimeTransport>,
    config: SocketConfig,
) -> Result<(
    mpsc::Sender<SocketCommand>,
    mpsc::Receiver<SocketNotification>,
)> {
    // Inbound transport events are funneled through an unbounded channel
    // because the handler is a plain Fn.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<TransportEvent>();

    let connection = transport
        .connect(
            &config.url,
            &config.access_token,
            Box::new(move |event| {
                let _ = event_tx.send(event);
            }),
        )
        .await?;

    info!(url = %config.url, "Realtime socket connected");

    let (cmd_tx, mut cmd_rx) = mpsc::channel::<SocketCommand>(256);
    let (notif_tx, notif_rx) = mpsc::channel::<SocketNotification>(256);

    tokio::spawn(async move {
        // Topics this task believes are live, with the config they joined
        // with. At most one entry per topic string.
        let mut topics: HashMap<String, ChannelConfig> = HashMap::new();
        // Presence announced per topic, re-sent on every heartbeat tick.
        let mut tracked: HashMap<String, PresenceMeta> = HashMap::new();

        let mut heartbeat =
            tokio::time::interval(Duration::from_secs(PRESENCE_HEARTBEAT_SECS));
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                // --- Incoming commands ---
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(SocketCommand::Subscribe { topic, config }) => {
                            if topics.remove(&topic).is_some() {
                                debug!(topic = %topic, "Replacing live subscription");
                                if let Err(e) = connection.send(RealtimeMessage::Leave {
                                    topic: topic.clone(),
                                }) {
                                    warn!(topic = %topic, error = %e, "Leave before rejoin failed");
                                }
                            }
                            match connection.send(RealtimeMessage::Join {
                                topic: topic.clone(),
                                config: config.clone(),
                            }) {
                                Ok(()) => {
                                    topics.insert(topic, config);
                                }
                                Err(e) => {
                                    // Logged only; the caller re-subscribes when
                                    // its dependencies change.
                                    warn!(topic = %topic, error = %e, "Subscribe failed");
                                }
                            }
                        }
                        Some(SocketCommand::Unsubscribe { topic }) => {
                            tracked.remove(&topic);
                            if topics.remove(&topic).is_some() {
                                if let Err(e) = connection.send(RealtimeMessage::Leave {
                                    topic: topic.clone(),
                                }) {
                                    warn!(topic = %topic, error = %e, "Leave failed");
                                }
                                debug!(topic = %topic, "Unsubscribed");
                            }
                        }
                        Some(SocketCommand::Broadcast { topic, event, payload }) => {
                            if let Err(e) = connection.send(RealtimeMessage::Broadcast {
                                topic: topic.clone(),
                                event,
                                payload,
                            }) {
                                warn!(topic = %topic, error = %e, "Broadcast failed");
                            }
                        }
                        Some(SocketCommand::TrackPresence { topic, meta }) => {
                            if let Err(e) = connection.send(RealtimeMessage::Track {
                                topic: topic.clone(),
                                meta: meta.clone(),
                            }) {
                                warn!(topic = %topic, error = %e, "Presence track failed");
                            }
                            tracked.insert(topic, meta);
                        }
                        Some(SocketCommand::ActiveTopics(reply)) => {
                            let _ = reply.send(topics.keys().cloned().collect());
                        }
                        Some(SocketCommand::Shutdown) => {
                            info!("Socket shutdown requested");
                            connection.disconnect();
                            break;
                        }
                        None => {
                            info!("Command channel closed, shutting down socket");
                            connection.disconnect();
                            break;
                        }
                    }
                }

                // --- Presence heartbeat ---
                _ = heartbeat.tick() => {
                    for (topic, meta) in &tracked {
                        let meta = PresenceMeta {
                            user_id: meta.user_id,
                            online_at: Utc::now(),
                        };
                        if let Err(e) = connection.send(RealtimeMessage::Track {
                            topic: topic.clone(),
                            meta,
                        }) {
                            warn!(topic = %topic, error = %e, "Presence heartbeat failed");
                        }
                    }
                }

                // --- Transport events ---
                event = event_rx.recv() => {
                    match event {
                        Some(TransportEvent::Message(msg)) => {
                            if let Some(notification) = translate(msg, &topics) {
                                let _ = notif_tx.send(notification).await;
                            }
                        }
                        Some(TransportEvent::Disconnected { error }) => {
                            warn!(error = ?error, "Realtime transport down");
                            let _ = notif_tx
                                .send(SocketNotification::TransportDown { error })
                                .await;
                            break;
                        }
                        None => break,
                    }
                }
            }
        }

        info!("Socket event loop terminated");
    });

    Ok((cmd_tx, notif_rx))
}

/// Translate an inbound frame into a notification. Frames for topics we
/// never joined are dropped.
fn translate(
    msg: RealtimeMessage,
    topics: &HashMap<String, ChannelConfig>,
) -> Option<SocketNotification> {
    match msg {
        RealtimeMessage::Subscribed { topic } => {
            debug!(topic = %topic, "Subscription acknowledged");
            Some(SocketNotification::Subscribed { topic })
        }
        RealtimeMessage::Broadcast {
            topic,
            event,
            payload,
        } => topics
            .contains_key(&topic)
            .then_some(SocketNotification::Broadcast {
                topic,
                event,
                payload,
            }),
        RealtimeMessage::PresenceState { topic, state } => topics
            .contains_key(&topic)
            .then_some(SocketNotification::PresenceSync { topic, state }),
        RealtimeMessage::PresenceDiff {
            topic,
            joins,
            leaves,
        } => topics
            .contains_key(&topic)
            .then_some(SocketNotification::PresenceDiff {
                topic,
                joins,
                leaves,
            }),
        RealtimeMessage::PostgresChange {
            topic,
            table,
            change,
            record,
        } => topics
            .contains_key(&topic)
            .then_some(SocketNotification::PostgresChange {
                topic,
                table,
                change,
                record,
            }),
        RealtimeMessage::Closed { topic } => {
            Some(SocketNotification::ChannelClosed { topic })
        }
        RealtimeMessage::Heartbeat => None,
        // Outbound-only frames never arrive here.
        RealtimeMessage::Join { .. }
        | RealtimeMessage::Leave { .. }
        | RealtimeMessage::Track { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MemoryTransport;
    use syncterest_shared::types::UserId;

    async fn socket_with_memory_transport() -> (
        MemoryTransport,
        mpsc::Sender<SocketCommand>,
        mpsc::Receiver<SocketNotification>,
    ) {
        let transport = MemoryTransport::new();
        let config = SocketConfig {
            url: "wss://realtime.example.com/socket".parse().unwrap(),
            access_token: "token".into(),
        };
        let (cmd_tx, notif_rx) = spawn_socket(Arc::new(transport.clone()), config)
            .await
            .unwrap();
        (transport, cmd_tx, notif_rx)
    }

    async fn active_topics(cmd_tx: &mpsc::Sender<SocketCommand>) -> Vec<String> {
        let (tx, rx) = oneshot::channel();
        cmd_tx.send(SocketCommand::ActiveTopics(tx)).await.unwrap();
        rx.await.unwrap()
    }

    #[tokio::test]
    async fn double_subscribe_leaves_single_live_topic() {
        let (transport, cmd_tx, _notif_rx) = socket_with_memory_transport().await;

        for _ in 0..2 {
            cmd_tx
                .send(SocketCommand::Subscribe {
                    topic: "chat:abc".into(),
                    config: ChannelConfig::default(),
                })
                .await
                .unwrap();
        }

        let topics = active_topics(&cmd_tx).await;
        assert_eq!(topics, vec!["chat:abc".to_string()]);

        // Second join was preceded by a leave of the first.
        let sent = transport.sent();
        let kinds: Vec<&str> = sent
            .iter()
            .map(|m| match m {
                RealtimeMessage::Join { .. } => "join",
                RealtimeMessage::Leave { .. } => "leave",
                _ => "other",
            })
            .collect();
        assert_eq!(kinds, vec!["join", "leave", "join"]);
    }

    #[tokio::test]
    async fn broadcast_for_unjoined_topic_is_dropped() {
        let (transport, cmd_tx, mut notif_rx) = socket_with_memory_transport().await;

        cmd_tx
            .send(SocketCommand::Subscribe {
                topic: "chat:abc".into(),
                config: ChannelConfig::default(),
            })
            .await
            .unwrap();

        transport.inject(RealtimeMessage::Broadcast {
            topic: "chat:other".into(),
            event: "typing".into(),
            payload: serde_json::json!({}),
        });
        transport.inject(RealtimeMessage::Broadcast {
            topic: "chat:abc".into(),
            event: "typing".into(),
            payload: serde_json::json!({}),
        });

        match notif_rx.recv().await.unwrap() {
            SocketNotification::Broadcast { topic, .. } => assert_eq!(topic, "chat:abc"),
            other => panic!("unexpected notification: {other:?}"),
        }
    }

    #[tokio::test]
    async fn presence_sync_is_forwarded() {
        let (transport, cmd_tx, mut notif_rx) = socket_with_memory_transport().await;

        cmd_tx
            .send(SocketCommand::Subscribe {
                topic: "live-users".into(),
                config: ChannelConfig::with_presence(),
            })
            .await
            .unwrap();

        let user = UserId::new();
        let mut state = PresenceSnapshot::new();
        state.insert(
            user.to_string(),
            PresenceMeta {
                user_id: user,
                online_at: chrono::Utc::now(),
            },
        );
        transport.inject(RealtimeMessage::PresenceState {
            topic: "live-users".into(),
            state,
        });

        match notif_rx.recv().await.unwrap() {
            SocketNotification::PresenceSync { topic, state } => {
                assert_eq!(topic, "live-users");
                assert_eq!(state.len(), 1);
            }
            other => panic!("unexpected notification: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unsubscribe_removes_topic() {
        let (_transport, cmd_tx, _notif_rx) = socket_with_memory_transport().await;

        cmd_tx
            .send(SocketCommand::Subscribe {
                topic: "chat:abc".into(),
                config: ChannelConfig::default(),
            })
            .await
            .unwrap();
        cmd_tx
            .send(SocketCommand::Unsubscribe {
                topic: "chat:abc".into(),
            })
            .await
            .unwrap();

        assert!(active_topics(&cmd_tx).await.is_empty());
    }
}
