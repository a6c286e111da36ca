//! Prelude module - commonly used types for convenient import.
//!
//! Use `use talon_policy::prelude::*;` to import all essential types.

// Errors
pub use crate::{PolicyDefect, PolicyError, PolicyResult};

// Policy model
pub use crate::{
    ChannelSelector, CommandMode, FailSafe, PeerSelector, Policy, RateLimitConfig, RoleSpec,
    SystemCommands, ToolAccess, ToolPattern,
};

// Decisions and runtime state
pub use crate::{AccessDecision, PendingBlockSlot, RateLimiter};

// Session keys
pub use crate::{ParsedSessionKey, PeerKind};
