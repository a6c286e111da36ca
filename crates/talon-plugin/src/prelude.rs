//! Prelude module - commonly used types for convenient import.
//!
//! Use `use talon_plugin::prelude::*;` to import all essential types.

// Host contracts
pub use crate::{AgentHook, HostLogger, TracingLogger};

// Events and verdicts
pub use crate::{
    HookContext, MessageContext, MessageReceivedEvent, OutgoingMessageEvent, ToolCallEvent,
    ToolVerdict,
};

// The plugin
pub use crate::RbacPlugin;

// Core policy types flow through the plugin API.
pub use talon_policy::prelude::*;
