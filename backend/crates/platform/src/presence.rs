//! Presence tracking
//!
//! Last-seen registry keyed by an anonymous visitor fingerprint
//! (see [`ClientIdentity::presence_key`](crate::client::ClientIdentity::presence_key)).
//! Expired entries are dropped with a fixed probability on each heartbeat so
//! the average cost stays low; an entry may outlive the retention horizon until
//! the next prune runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rand::Rng;
use serde::Serialize;

use crate::clock::{Clock, SystemClock};

/// Window definitions for the tracker
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// Entries seen within this window count as online (2 minutes)
    pub online_window_ms: i64,
    /// Entries seen within this window count as visitors (24 hours)
    pub visitor_window_ms: i64,
    /// Entries older than this are eligible for pruning (48 hours)
    pub retention_ms: i64,
    /// Chance that a heartbeat triggers a prune
    pub prune_probability: f64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            online_window_ms: 2 * 60 * 1000,
            visitor_window_ms: 24 * 60 * 60 * 1000,
            retention_ms: 48 * 60 * 60 * 1000,
            prune_probability: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceEntry {
    pub last_seen_at_ms: i64,
    pub user_id: Option<i64>,
}

/// Counts computed at snapshot time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PresenceSnapshot {
    pub online: usize,
    #[serde(rename = "onlineLoggedIn")]
    pub online_logged_in: usize,
    #[serde(rename = "visitors24h")]
    pub visitors_24h: usize,
}

pub struct PresenceTracker {
    config: PresenceConfig,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<String, PresenceEntry>>,
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new(PresenceConfig::default())
    }
}

impl std::fmt::Debug for PresenceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceTracker")
            .field("config", &self.config)
            .field("entries", &self.len())
            .finish()
    }
}

impl PresenceTracker {
    pub fn new(config: PresenceConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: PresenceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PresenceEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record activity for `key`
    ///
    /// A `Some` user id tags the entry; a later `None` keeps the existing tag.
    pub fn heartbeat(&self, key: &str, user_id: Option<i64>) {
        if key.is_empty() {
            return;
        }

        let now = self.clock.now_ms();
        let mut entries = self.lock();
        let entry = entries.entry(key.to_string()).or_insert(PresenceEntry {
            last_seen_at_ms: now,
            user_id: None,
        });
        entry.last_seen_at_ms = now;
        if user_id.is_some() {
            entry.user_id = user_id;
        }

        if should_prune(self.config.prune_probability) {
            let removed = prune_locked(&mut entries, now, self.config.retention_ms);
            if removed > 0 {
                tracing::debug!(removed, "Pruned stale presence entries");
            }
        }
    }

    pub fn snapshot(&self) -> PresenceSnapshot {
        let now = self.clock.now_ms();
        let online_since = now - self.config.online_window_ms;
        let visitors_since = now - self.config.visitor_window_ms;

        self.lock()
            .values()
            .fold(PresenceSnapshot::default(), |mut snap, entry| {
                if entry.last_seen_at_ms >= online_since {
                    snap.online += 1;
                    if entry.user_id.is_some() {
                        snap.online_logged_in += 1;
                    }
                }
                if entry.last_seen_at_ms >= visitors_since {
                    snap.visitors_24h += 1;
                }
                snap
            })
    }

    pub fn entry(&self, key: &str) -> Option<PresenceEntry> {
        self.lock().get(key).copied()
    }

    /// Drop every entry past the retention horizon, returning the count removed
    pub fn prune(&self) -> usize {
        let now = self.clock.now_ms();
        prune_locked(&mut self.lock(), now, self.config.retention_ms)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn prune_locked(entries: &mut HashMap<String, PresenceEntry>, now: i64, retention_ms: i64) -> usize {
    let before = entries.len();
    let cutoff = now - retention_ms;
    entries.retain(|_, e| e.last_seen_at_ms >= cutoff);
    before - entries.len()
}

fn should_prune(probability: f64) -> bool {
    if probability.is_nan() || probability <= 0.0 {
        false
    } else if probability >= 1.0 {
        true
    } else {
        rand::thread_rng().gen_bool(probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn tracker(prune_probability: f64) -> (Arc<ManualClock>, PresenceTracker) {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let config = PresenceConfig {
            prune_probability,
            ..PresenceConfig::default()
        };
        let tracker = PresenceTracker::with_clock(config, clock.clone());
        (clock, tracker)
    }

    #[test]
    fn test_empty_snapshot() {
        let (_, tracker) = tracker(0.0);
        assert_eq!(tracker.snapshot(), PresenceSnapshot::default());
    }

    #[test]
    fn test_heartbeat_counts_online() {
        let (_, tracker) = tracker(0.0);
        tracker.heartbeat("1.2.3.4|firefox", None);
        let snap = tracker.snapshot();
        assert!(snap.online >= 1);
        assert_eq!(snap.online_logged_in, 0);
        assert_eq!(snap.visitors_24h, 1);
    }

    #[test]
    fn test_online_and_visitor_windows_expire() {
        let (clock, tracker) = tracker(0.0);
        tracker.heartbeat("k", Some(3));

        clock.advance(Duration::from_secs(2 * 60));
        assert_eq!(tracker.snapshot().online, 1);

        clock.advance_ms(1);
        let snap = tracker.snapshot();
        assert_eq!(snap.online, 0);
        assert_eq!(snap.online_logged_in, 0);
        assert_eq!(snap.visitors_24h, 1);

        clock.advance(Duration::from_secs(24 * 60 * 60));
        assert_eq!(tracker.snapshot().visitors_24h, 0);
    }

    #[test]
    fn test_user_tag_is_monotonic() {
        let (_, tracker) = tracker(0.0);
        tracker.heartbeat("k", Some(7));
        tracker.heartbeat("k", None);
        assert_eq!(tracker.entry("k").unwrap().user_id, Some(7));

        tracker.heartbeat("k", Some(9));
        assert_eq!(tracker.entry("k").unwrap().user_id, Some(9));
        assert_eq!(tracker.snapshot().online_logged_in, 1);
    }

    #[test]
    fn test_heartbeat_updates_last_seen() {
        let (clock, tracker) = tracker(0.0);
        tracker.heartbeat("k", None);
        clock.advance_ms(500);
        tracker.heartbeat("k", None);
        assert_eq!(tracker.entry("k").unwrap().last_seen_at_ms, clock.now_ms());
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_empty_key_is_ignored() {
        let (_, tracker) = tracker(1.0);
        tracker.heartbeat("", Some(1));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_stale_entries_survive_without_prune() {
        let (clock, tracker) = tracker(0.0);
        tracker.heartbeat("old", None);
        clock.advance(Duration::from_secs(49 * 60 * 60));
        tracker.heartbeat("new", None);

        assert_eq!(tracker.len(), 2);
        // retained but not counted
        assert_eq!(tracker.snapshot().visitors_24h, 1);

        assert_eq!(tracker.prune(), 1);
        assert!(tracker.entry("old").is_none());
    }

    #[test]
    fn test_heartbeat_prunes_when_sampled() {
        let (clock, tracker) = tracker(1.0);
        tracker.heartbeat("old", None);
        clock.advance(Duration::from_secs(48 * 60 * 60) + Duration::from_millis(1));
        tracker.heartbeat("new", None);

        assert_eq!(tracker.len(), 1);
        assert!(tracker.entry("new").is_some());
    }

    #[test]
    fn test_should_prune_bounds() {
        assert!(!should_prune(0.0));
        assert!(!should_prune(-1.0));
        assert!(!should_prune(f64::NAN));
        assert!(should_prune(1.0));
        assert!(should_prune(3.0));
    }

    #[test]
    fn test_snapshot_serializes_camel_case() {
        let snap = PresenceSnapshot {
            online: 2,
            online_logged_in: 1,
            visitors_24h: 5,
        };
        let json = serde_json::to_value(snap).unwrap();
        assert_eq!(json, serde_json::json!({ "online": 2, "onlineLoggedIn": 1, "visitors24h": 5 }));
    }
}
