#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Talon Policy - RBAC decision engine for chat-bot agent platforms.
//!
//! This crate provides:
//! - A validating loader that turns a declarative policy document into a
//!   frozen [`Policy`]
//! - Session-key parsing that recovers sender identity and channel from
//!   the host's opaque routing strings
//! - First-match, channel-aware role resolution
//! - Tool access checks with exact names, prefix patterns, and named
//!   tool groups
//! - A per-peer sliding-window rate limiter for audit output
//! - The two-phase command guard (ingress detection, egress substitution)
//!
//! The engine decides once per event and never performs I/O: loading
//! either returns a fully valid `Policy` or an error naming the offending
//! document path, and every decision afterwards is a pure function of the
//! frozen policy plus the call's inputs.
//!
//! # Example
//!
//! ```
//! use talon_policy::{ParsedSessionKey, Policy};
//!
//! let policy = Policy::from_json_str(
//!     r#"{
//!         "roles": {
//!             "admin": { "users": ["408001372"], "tools": "*" },
//!             "guest": { "users": "*", "tools": ["get_recent_news"] }
//!         }
//!     }"#,
//! )
//! .unwrap();
//!
//! let session = ParsedSessionKey::parse("agent:main:telegram:direct:408001372").unwrap();
//! let role = policy.resolve_role(&session.peer_id, session.channel.as_deref());
//! assert_eq!(role, "admin");
//! assert!(policy.check_tool_access("exec", role).is_allowed());
//! ```

/// Slash-command matching and the pending-block slot.
pub mod command;
/// Policy loading error types.
pub mod error;
/// Tool access checking.
pub mod guard;
/// Policy document loading and validation.
pub mod loader;
/// The frozen policy model.
pub mod policy;
/// Commonly used types for convenient import.
pub mod prelude;
/// Audit-output rate limiting.
pub mod ratelimit;
/// Role resolution.
pub mod resolve;
/// Session-key parsing.
pub mod session;

// Re-export primary types at the crate root.
pub use command::{PENDING_BLOCK_STALE_AFTER, PendingBlockSlot};
pub use error::{PolicyDefect, PolicyError, PolicyResult};
pub use guard::AccessDecision;
pub use policy::{
    ChannelSelector, CommandMode, DEFAULT_BLOCK_RESPONSE, FailSafe, PeerSelector, Policy,
    RateLimitConfig, RoleSpec, SystemCommands, ToolAccess, ToolPattern,
};
pub use ratelimit::{RateLimiter, WINDOW as RATE_LIMIT_WINDOW};
pub use session::{ParsedSessionKey, PeerKind};
