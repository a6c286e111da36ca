//! Host framework contracts.
//!
//! The host agent framework owns the event bus, the logger, and the
//! transport; this module declares the narrow interfaces the plugin
//! consumes. Hooks may be declared asynchronous by the host, so the hook
//! trait is async-capable, but no decision in this engine suspends.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// The host's logging surface: three levels, one line each.
///
/// Audit emission is best-effort; implementations must not propagate sink
/// failures back to the caller.
pub trait HostLogger: Send + Sync {
    /// Emit an informational line.
    fn info(&self, line: &str);
    /// Emit a warning line.
    fn warn(&self, line: &str);
    /// Emit an error line.
    fn error(&self, line: &str);
}

/// A [`HostLogger`] that forwards to [`tracing`], for hosts without a
/// logging surface of their own.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl HostLogger for TracingLogger {
    fn info(&self, line: &str) {
        tracing::info!("{line}");
    }

    fn warn(&self, line: &str) {
        tracing::warn!("{line}");
    }

    fn error(&self, line: &str) {
        tracing::error!("{line}");
    }
}

// ---------------------------------------------------------------------------
// Hook events
// ---------------------------------------------------------------------------

/// A tool invocation about to be executed.
#[derive(Debug, Clone)]
pub struct ToolCallEvent {
    /// Name of the capability being invoked.
    pub tool_name: String,
}

impl ToolCallEvent {
    /// Create an event for the named tool.
    #[must_use]
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
        }
    }
}

/// Per-call context supplied alongside a tool-call event.
#[derive(Debug, Clone, Default)]
pub struct HookContext {
    /// Opaque routing string identifying the session, when the call was
    /// made on behalf of a remote sender. Internal calls carry none.
    pub session_key: Option<String>,
}

impl HookContext {
    /// Context for a call routed from the given session.
    #[must_use]
    pub fn for_session(session_key: impl Into<String>) -> Self {
        Self {
            session_key: Some(session_key.into()),
        }
    }

    /// Context for an internal call with no remote sender.
    #[must_use]
    pub fn internal() -> Self {
        Self { session_key: None }
    }
}

/// An inbound user message.
#[derive(Debug, Clone)]
pub struct MessageReceivedEvent {
    /// Raw message body.
    pub content: String,
    /// Sender identifier, when the transport provides one.
    pub from: Option<String>,
}

/// Per-message context supplied alongside a message event.
#[derive(Debug, Clone, Default)]
pub struct MessageContext {
    /// Channel the message arrived on, when channelized.
    pub channel_id: Option<String>,
}

/// An outbound reply about to be transmitted.
#[derive(Debug, Clone)]
pub struct OutgoingMessageEvent {
    /// Body the host intends to send.
    pub content: String,
}

// ---------------------------------------------------------------------------
// Verdicts
// ---------------------------------------------------------------------------

/// A blocking verdict returned from the tool-call hook.
///
/// Hooks that have nothing to say return no verdict at all, so a verdict
/// always blocks. Serializes to the host's wire shape
/// (`{"block": true, "blockReason": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolVerdict {
    /// Whether the call must be blocked.
    pub block: bool,
    /// Human-readable reason, safe to surface to the sender.
    pub block_reason: Option<String>,
}

impl ToolVerdict {
    /// A blocking verdict with the given reason.
    #[must_use]
    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            block: true,
            block_reason: Some(reason.into()),
        }
    }
}

impl fmt::Display for ToolVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.block, &self.block_reason) {
            (true, Some(reason)) => write!(f, "block: {reason}"),
            (true, None) => write!(f, "block"),
            (false, _) => write!(f, "pass"),
        }
    }
}

// ---------------------------------------------------------------------------
// Hook trait
// ---------------------------------------------------------------------------

/// The three hooks this engine attaches to the host's event bus.
///
/// The host guarantees that `message_received` and `message_sending` for a
/// given conversation arrive serially, in that order, around its own
/// command processing. Tool-call verdicts are independent across calls.
#[async_trait]
pub trait AgentHook: Send + Sync {
    /// Hook ordering priority; lower runs first. Access control wants to
    /// run before business-logic hooks.
    fn priority(&self) -> i32 {
        100
    }

    /// Called before a tool call executes. Returning a verdict blocks the
    /// call; returning `None` lets it proceed.
    async fn before_tool_call(
        &self,
        event: &ToolCallEvent,
        ctx: &HookContext,
    ) -> Option<ToolVerdict>;

    /// Called synchronously for every inbound message, before the host
    /// processes commands. Fire-and-forget.
    fn message_received(&self, event: &MessageReceivedEvent, ctx: &MessageContext);

    /// Called before an outbound reply is transmitted. Returning a string
    /// replaces the outgoing body.
    async fn message_sending(&self, event: &OutgoingMessageEvent) -> Option<String>;
}
