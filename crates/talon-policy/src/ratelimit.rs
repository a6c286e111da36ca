//! Sliding-window rate limiting for audit output.
//!
//! Bounds how many BLOCKED audit lines a single peer can produce per
//! 60-second window. The limiter never evicts state; long-running
//! deployments with unbounded peer churn should wrap it in an external
//! LRU or sweep it periodically on `window_start`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Length of one rate-limit window.
pub const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
struct PeerWindow {
    window_start: Instant,
    logged: u32,
    suppressed: u32,
}

/// Per-peer sliding-window counter gating audit log emission.
///
/// Callers inject `now` so decisions are deterministic under test. All
/// mutation happens from host-serialized hook callbacks; the limiter
/// itself is not synchronized.
#[derive(Debug)]
pub struct RateLimiter {
    max_per_window: u32,
    peers: HashMap<String, PeerWindow>,
}

impl RateLimiter {
    /// Create a limiter allowing `max_per_window` logged entries per peer
    /// per [`WINDOW`].
    #[must_use]
    pub fn new(max_per_window: u32) -> Self {
        Self {
            max_per_window,
            peers: HashMap::new(),
        }
    }

    /// Whether a blocked-call audit line for `peer_id` should be emitted
    /// now. Counts the call either way: under the cap it increments the
    /// logged counter and returns `true`; at the cap it increments the
    /// suppressed counter and returns `false`.
    pub fn should_log(&mut self, peer_id: &str, now: Instant) -> bool {
        let peer = self
            .peers
            .entry(peer_id.to_string())
            .and_modify(|peer| {
                if now.duration_since(peer.window_start) >= WINDOW {
                    *peer = PeerWindow {
                        window_start: now,
                        logged: 0,
                        suppressed: 0,
                    };
                }
            })
            .or_insert(PeerWindow {
                window_start: now,
                logged: 0,
                suppressed: 0,
            });

        if peer.logged < self.max_per_window {
            peer.logged = peer.logged.saturating_add(1);
            true
        } else {
            peer.suppressed = peer.suppressed.saturating_add(1);
            false
        }
    }

    /// Number of entries suppressed for `peer_id` in the current window;
    /// zero when the peer is unknown or its window has expired.
    ///
    /// Callers emit a one-time "rate limit exceeded" notice when this
    /// first transitions from 0 to 1.
    #[must_use]
    pub fn suppressed(&self, peer_id: &str, now: Instant) -> u32 {
        self.peers.get(peer_id).map_or(0, |peer| {
            if now.duration_since(peer.window_start) >= WINDOW {
                0
            } else {
                peer.suppressed
            }
        })
    }
}
