#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Talon Plugin - wires the RBAC decision engine to a host agent
//! framework's event bus.
//!
//! The host owns plugin registration, the event bus, the logger, and all
//! transport; this crate declares those contracts ([`HostLogger`],
//! [`AgentHook`], the event types) and implements them for the RBAC
//! engine:
//!
//! - `before_tool_call` gates structured capability calls per sender role
//! - `message_received` detects blocked slash-commands on ingress
//! - `message_sending` substitutes the reply for a pending blocked command
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use talon_plugin::{HookContext, RbacPlugin, ToolCallEvent, TracingLogger};
//!
//! let plugin = RbacPlugin::register(
//!     &json!({
//!         "roles": {
//!             "admin": { "users": ["408001372"], "tools": "*" },
//!             "guest": { "users": "*", "tools": ["get_recent_news"] }
//!         }
//!     }),
//!     Arc::new(TracingLogger),
//! )
//! .unwrap();
//!
//! let verdict = plugin.check_tool_call(
//!     &ToolCallEvent::new("exec"),
//!     &HookContext::for_session("agent:main:telegram:direct:999111222"),
//! );
//! assert!(verdict.is_some());
//! ```

/// Host framework contracts: logger, hook events, verdicts.
pub mod host;
/// The RBAC plugin and its hook handlers.
pub mod plugin;
/// Commonly used types for convenient import.
pub mod prelude;

// Re-export primary types at the crate root.
pub use host::{
    AgentHook, HookContext, HostLogger, MessageContext, MessageReceivedEvent,
    OutgoingMessageEvent, ToolCallEvent, ToolVerdict, TracingLogger,
};
pub use plugin::RbacPlugin;
