//! Typing-indicator coordination for one conversation or channel.
//!
//! Outbound broadcasts are gated by a plain timestamp: at most one send
//! per [`TYPING_THROTTLE_MS`]. Inbound indicators live until a deadline
//! [`TYPING_EXPIRY_MS`] after the latest broadcast from that user; a
//! repeat broadcast resets the deadline instead of stacking a second one.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use syncterest_shared::constants::{TYPING_EXPIRY_MS, TYPING_THROTTLE_MS};
use syncterest_shared::protocol::TypingPayload;
use syncterest_shared::time::TimeProvider;
use syncterest_shared::types::UserId;

#[derive(Debug, Clone)]
struct TypingEntry {
    display_name: String,
    deadline: DateTime<Utc>,
}

/// Per-conversation typing state for the local user.
pub struct TypingCoordinator {
    local_user: UserId,
    time: Arc<dyn TimeProvider>,
    last_sent: Option<DateTime<Utc>>,
    active: HashMap<UserId, TypingEntry>,
}

impl TypingCoordinator {
    pub fn new(local_user: UserId, time: Arc<dyn TimeProvider>) -> Self {
        Self {
            local_user,
            time,
            last_sent: None,
            active: HashMap::new(),
        }
    }

    /// Gate an outbound typing broadcast. Returns `true` (and arms the
    /// gate) if enough time has passed since the previous send.
    pub fn should_broadcast(&mut self) -> bool {
        let now = self.time.now();
        let gate_open = match self.last_sent {
            Some(last) => now.signed_duration_since(last)
                >= Duration::milliseconds(TYPING_THROTTLE_MS),
            None => true,
        };
        if gate_open {
            self.last_sent = Some(now);
        }
        gate_open
    }

    /// The payload an outbound broadcast carries.
    pub fn payload(&self, display_name: &str) -> TypingPayload {
        TypingPayload {
            user_id: self.local_user,
            display_name: display_name.to_string(),
        }
    }

    /// Record an inbound typing broadcast. Our own broadcasts are
    /// ignored. Returns `true` when the active set changed.
    pub fn observe(&mut self, payload: TypingPayload) -> bool {
        if payload.user_id == self.local_user {
            return false;
        }
        let deadline = self.time.now() + Duration::milliseconds(TYPING_EXPIRY_MS);
        let is_new = !self.active.contains_key(&payload.user_id);
        self.active.insert(
            payload.user_id,
            TypingEntry {
                display_name: payload.display_name,
                deadline,
            },
        );
        is_new
    }

    /// Drop entries whose deadline has passed. Returns `true` when the
    /// active set changed.
    pub fn purge_expired(&mut self) -> bool {
        let now = self.time.now();
        let before = self.active.len();
        self.active.retain(|_, entry| entry.deadline > now);
        self.active.len() != before
    }

    /// Users currently typing, as (id, display name) pairs.
    pub fn typing_users(&self) -> Vec<(UserId, String)> {
        self.active
            .iter()
            .map(|(id, entry)| (*id, entry.display_name.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Clock the tests can move forward by hand.
    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                now: Mutex::new(Utc::now()),
            })
        }

        fn advance(&self, ms: i64) {
            let mut now = self.now.lock().unwrap();
            *now += Duration::milliseconds(ms);
        }
    }

    impl TimeProvider for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn coordinator(clock: &Arc<ManualClock>) -> (TypingCoordinator, UserId) {
        let local = UserId::new();
        let time: Arc<dyn TimeProvider> = clock.clone();
        (TypingCoordinator::new(local, time), local)
    }

    fn typing(user: UserId, name: &str) -> TypingPayload {
        TypingPayload {
            user_id: user,
            display_name: name.to_string(),
        }
    }

    #[test]
    fn outbound_throttle_allows_one_send_per_window() {
        let clock = ManualClock::new();
        let (mut coordinator, _) = coordinator(&clock);

        assert!(coordinator.should_broadcast());
        clock.advance(500);
        assert!(!coordinator.should_broadcast());
        clock.advance(1499);
        assert!(!coordinator.should_broadcast());
        clock.advance(1);
        assert!(coordinator.should_broadcast());
    }

    #[test]
    fn inbound_indicator_expires_after_silence() {
        let clock = ManualClock::new();
        let (mut coordinator, _) = coordinator(&clock);
        let alice = UserId::new();

        assert!(coordinator.observe(typing(alice, "alice")));
        assert_eq!(coordinator.typing_users().len(), 1);

        clock.advance(TYPING_EXPIRY_MS - 1);
        coordinator.purge_expired();
        assert_eq!(coordinator.typing_users().len(), 1);

        clock.advance(1);
        assert!(coordinator.purge_expired());
        assert!(coordinator.is_empty());
    }

    #[test]
    fn repeat_broadcast_resets_deadline_without_duplicating() {
        let clock = ManualClock::new();
        let (mut coordinator, _) = coordinator(&clock);
        let alice = UserId::new();

        coordinator.observe(typing(alice, "alice"));
        clock.advance(2000);

        // Second broadcast within the window: same single entry, fresh
        // deadline.
        assert!(!coordinator.observe(typing(alice, "alice")));
        assert_eq!(coordinator.typing_users().len(), 1);

        // The original deadline (at +3000) passes without expiry.
        clock.advance(1500);
        coordinator.purge_expired();
        assert_eq!(coordinator.typing_users().len(), 1);

        // The refreshed deadline (at +5000) expires.
        clock.advance(1500);
        coordinator.purge_expired();
        assert!(coordinator.is_empty());
    }

    #[test]
    fn own_broadcasts_are_filtered() {
        let clock = ManualClock::new();
        let (mut coordinator, local) = coordinator(&clock);

        assert!(!coordinator.observe(typing(local, "me")));
        assert!(coordinator.is_empty());
    }
}
