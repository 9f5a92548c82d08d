//! Presence tracking.
//!
//! Maintains the set of currently-online participants for one channel.
//! Every sync from the server replaces the whole local map; diffs are
//! applied only between syncs. The tracker holds no tri-state -- coarse
//! availability is classified elsewhere from last-active timestamps.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use syncterest_shared::protocol::{PresenceMeta, PresenceSnapshot};
use syncterest_shared::types::UserId;

/// Presence state for a single channel.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    participants: HashMap<String, PresenceMeta>,
    tracking: bool,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The heartbeat payload announcing the local user.
    pub fn heartbeat(user_id: UserId, now: DateTime<Utc>) -> PresenceMeta {
        PresenceMeta {
            user_id,
            online_at: now,
        }
    }

    /// Mark the tracker live. Called once the channel subscription is
    /// established and our own presence has been tracked.
    pub fn start_tracking(&mut self) {
        self.tracking = true;
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Replace the entire participant map with a server snapshot.
    pub fn apply_sync(&mut self, state: PresenceSnapshot) {
        debug!(participants = state.len(), "Presence sync");
        self.participants = state;
    }

    /// Apply an incremental diff between syncs.
    pub fn apply_diff(
        &mut self,
        joins: HashMap<String, PresenceMeta>,
        leaves: HashMap<String, PresenceMeta>,
    ) {
        for key in leaves.keys() {
            self.participants.remove(key);
        }
        self.participants.extend(joins);
    }

    /// Forget everything. Called when the channel unsubscribes.
    pub fn reset(&mut self) {
        self.participants.clear();
        self.tracking = false;
    }

    pub fn is_online(&self, user_id: &UserId) -> bool {
        self.participants
            .values()
            .any(|meta| meta.user_id == *user_id)
    }

    pub fn online_count(&self) -> usize {
        self.participants.len()
    }

    /// Snapshot of everyone currently online.
    pub fn online_users(&self) -> Vec<PresenceMeta> {
        self.participants.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(user: UserId) -> PresenceMeta {
        PresenceMeta {
            user_id: user,
            online_at: Utc::now(),
        }
    }

    fn snapshot(users: &[UserId]) -> PresenceSnapshot {
        users
            .iter()
            .map(|u| (u.to_string(), meta(*u)))
            .collect()
    }

    #[test]
    fn sync_replaces_rather_than_merges() {
        let mut tracker = PresenceTracker::new();
        let a = UserId::new();
        let b = UserId::new();

        tracker.apply_sync(snapshot(&[a]));
        assert!(tracker.is_online(&a));

        // The next snapshot does not contain `a`; a merge would keep it.
        tracker.apply_sync(snapshot(&[b]));
        assert!(!tracker.is_online(&a));
        assert!(tracker.is_online(&b));
        assert_eq!(tracker.online_count(), 1);
    }

    #[test]
    fn diff_applies_joins_and_leaves() {
        let mut tracker = PresenceTracker::new();
        let a = UserId::new();
        let b = UserId::new();

        tracker.apply_sync(snapshot(&[a]));

        let joins: HashMap<_, _> = [(b.to_string(), meta(b))].into();
        let leaves: HashMap<_, _> = [(a.to_string(), meta(a))].into();
        tracker.apply_diff(joins, leaves);

        assert!(!tracker.is_online(&a));
        assert!(tracker.is_online(&b));
    }

    #[test]
    fn reset_discards_state() {
        let mut tracker = PresenceTracker::new();
        let a = UserId::new();

        tracker.start_tracking();
        tracker.apply_sync(snapshot(&[a]));
        assert!(tracker.is_tracking());

        tracker.reset();
        assert!(!tracker.is_tracking());
        assert_eq!(tracker.online_count(), 0);
    }
}
