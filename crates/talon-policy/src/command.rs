//! Slash-command guarding.
//!
//! Two-phase interception: ingress detection marks a blocked command in a
//! pending-block slot, and egress consumption substitutes the outgoing
//! reply. The host serializes message-received and message-sending for a
//! conversation, so a single process-wide slot suffices; a staleness
//! check protects against dropped message-sending events.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::policy::{CommandMode, SystemCommands};

impl SystemCommands {
    /// Detect a blocked slash-command in an incoming message body.
    ///
    /// Returns the normalized `/command` head when it must be intercepted
    /// for a non-administrator, `None` when the message may pass. When
    /// `guestHelp` is configured, `/help` is intercepted unconditionally,
    /// even in allowlist mode with `/help` listed as allowed.
    #[must_use]
    pub fn match_blocked_command(&self, content: &str) -> Option<String> {
        let trimmed = content.trim().to_lowercase();
        if !trimmed.starts_with('/') {
            return None;
        }

        let head = trimmed
            .split_whitespace()
            .next()
            .unwrap_or(trimmed.as_str())
            .to_string();

        if self.guest_help.is_some() && head == "/help" {
            return Some(head);
        }

        match self.mode {
            CommandMode::Allowlist => {
                if self.allowed.iter().any(|command| *command == head) {
                    None
                } else {
                    Some(head)
                }
            },
            CommandMode::Blocklist => {
                if self.blocked.iter().any(|command| *command == head) {
                    Some(head)
                } else {
                    None
                }
            },
        }
    }

    /// The substitute body for a blocked command: `guestHelp` for `/help`
    /// when configured, the block response otherwise.
    #[must_use]
    pub fn block_response(&self, command: &str) -> &str {
        match self.guest_help.as_deref() {
            Some(help) if command == "/help" => help,
            _ => &self.block_response,
        }
    }
}

/// Age after which an unconsumed pending block is discarded.
pub const PENDING_BLOCK_STALE_AFTER: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct PendingBlock {
    command: String,
    armed_at: Instant,
}

/// The pending-block slot: armed by message-received when a blocked
/// command is detected, consumed by message-sending to substitute the
/// reply.
///
/// Single writer, single consumer, both serialized by the host's event
/// ordering for a conversation. Arming overwrites any previous entry.
#[derive(Debug, Default)]
pub struct PendingBlockSlot {
    slot: Mutex<Option<PendingBlock>>,
}

impl PendingBlockSlot {
    /// Create an empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the slot for `command`.
    pub fn arm(&self, command: String, now: Instant) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(PendingBlock {
            command,
            armed_at: now,
        });
    }

    /// Atomically take the pending command, if any.
    ///
    /// An entry older than [`PENDING_BLOCK_STALE_AFTER`] is discarded and
    /// reported as `None`; that path only triggers when the host dropped a
    /// message-sending event.
    pub fn consume(&self, now: Instant) -> Option<String> {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        let pending = slot.take()?;
        if now.duration_since(pending.armed_at) > PENDING_BLOCK_STALE_AFTER {
            return None;
        }
        Some(pending.command)
    }
}
