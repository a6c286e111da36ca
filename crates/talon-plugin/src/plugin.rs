//! The RBAC plugin: policy lifecycle plus the three hook handlers.
//!
//! Registration parses the policy document up front; an invalid document
//! aborts registration with no partial state. Decisions afterwards read a
//! policy snapshot, so a reload never tears a decision in flight.

use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use talon_policy::{
    AccessDecision, FailSafe, ParsedSessionKey, PendingBlockSlot, Policy, PolicyResult,
    RateLimiter,
};

use crate::host::{
    AgentHook, HookContext, HostLogger, MessageContext, MessageReceivedEvent,
    OutgoingMessageEvent, ToolCallEvent, ToolVerdict,
};

/// Placeholder for audit-line fields an unparseable session cannot fill.
const UNKNOWN_FIELD: &str = "-";

/// Block reason returned when the fail-safe rejects an unrecognized
/// session.
const FAIL_SAFE_REASON: &str = "Access denied: unrecognized session (RBAC failSafe)";

/// Fallback block reason when the guard produced none.
const GENERIC_DENY_REASON: &str = "Access denied by RBAC policy";

/// The RBAC policy plugin.
///
/// Holds the frozen [`Policy`] (swapped atomically on reload), the audit
/// rate limiter, and the pending-block slot consumed by the
/// message-sending hook.
pub struct RbacPlugin {
    policy: RwLock<Arc<Policy>>,
    limiter: Mutex<Option<RateLimiter>>,
    pending: PendingBlockSlot,
    logger: Arc<dyn HostLogger>,
}

impl RbacPlugin {
    /// Parse the policy document and register the plugin.
    ///
    /// Logs a registration summary and every load warning on success. On
    /// failure the error is logged and returned; no plugin state exists
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when the document is invalid.
    pub fn register(doc: &Value, logger: Arc<dyn HostLogger>) -> PolicyResult<Self> {
        let policy = match Policy::from_value(doc) {
            Ok(policy) => policy,
            Err(err) => {
                logger.error(&format!("rbac: policy rejected: {err}"));
                return Err(err);
            },
        };

        let plugin = Self {
            limiter: Mutex::new(
                policy
                    .rate_limit()
                    .map(|limit| RateLimiter::new(limit.max_blocked_per_minute)),
            ),
            pending: PendingBlockSlot::new(),
            logger,
            policy: RwLock::new(Arc::new(policy)),
        };
        plugin.log_summary();
        Ok(plugin)
    }

    /// Replace the active policy with a freshly parsed one.
    ///
    /// The swap is atomic: decisions in flight keep the snapshot they
    /// started with, and the rate limiter restarts with the new limits.
    /// On failure the previous policy stays active.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when the document is invalid.
    pub fn reload(&self, doc: &Value) -> PolicyResult<()> {
        let policy = match Policy::from_value(doc) {
            Ok(policy) => policy,
            Err(err) => {
                self.logger.error(&format!("rbac: policy reload rejected: {err}"));
                return Err(err);
            },
        };

        let limiter = policy
            .rate_limit()
            .map(|limit| RateLimiter::new(limit.max_blocked_per_minute));
        *self
            .limiter
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = limiter;
        *self
            .policy
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Arc::new(policy);

        self.log_summary();
        Ok(())
    }

    /// The currently active policy snapshot.
    #[must_use]
    pub fn policy(&self) -> Arc<Policy> {
        Arc::clone(&self.policy.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn log_summary(&self) {
        let policy = self.policy();
        self.logger.info(&format!(
            "rbac: registered roles={} defaultRole=\"{}\" failSafe=\"{}\"",
            policy.role_count(),
            policy.default_role(),
            policy.fail_safe()
        ));
        for warning in policy.warnings() {
            self.logger.warn(&format!("rbac: policy warning: {warning}"));
        }
    }

    /// Decide a tool call. Synchronous core of the tool-call hook.
    #[must_use]
    pub fn check_tool_call(&self, event: &ToolCallEvent, ctx: &HookContext) -> Option<ToolVerdict> {
        // No session key means an internal or system call.
        let session_key = ctx.session_key.as_deref()?;
        let policy = self.policy();

        let Some(session) = ParsedSessionKey::parse(session_key) else {
            return match policy.fail_safe() {
                FailSafe::Deny => {
                    if policy.log_blocked() {
                        self.logger.info(&format!(
                            "rbac: BLOCKED tool=\"{}\" peer=\"{UNKNOWN_FIELD}\" \
                             channel=\"{UNKNOWN_FIELD}\" role=\"{UNKNOWN_FIELD}\" \
                             reason=\"unrecognized session key\"",
                            event.tool_name
                        ));
                    }
                    Some(ToolVerdict::block(FAIL_SAFE_REASON))
                },
                FailSafe::Allow => None,
            };
        };

        let channel = session.channel.as_deref();
        let role = policy.resolve_role(&session.peer_id, channel);
        let decision = policy.check_tool_access(&event.tool_name, role);

        if decision.is_allowed() {
            if policy.log_allowed() {
                self.logger.info(&format!(
                    "rbac: ALLOWED tool=\"{}\" peer=\"{}\" channel=\"{}\" role=\"{}\"",
                    event.tool_name,
                    session.peer_id,
                    channel.unwrap_or(UNKNOWN_FIELD),
                    role
                ));
            }
            return None;
        }

        if policy.log_blocked() {
            self.log_blocked_line(&event.tool_name, &session.peer_id, channel, role, &decision);
        }

        let reason = decision
            .reason()
            .unwrap_or(GENERIC_DENY_REASON)
            .to_string();
        Some(ToolVerdict::block(reason))
    }

    /// Emit a BLOCKED audit line, subject to the per-peer rate limit. The
    /// first suppressed line in a window produces a one-time notice.
    fn log_blocked_line(
        &self,
        tool_name: &str,
        peer_id: &str,
        channel: Option<&str>,
        role: &str,
        decision: &AccessDecision,
    ) {
        let line = format!(
            "rbac: BLOCKED tool=\"{tool_name}\" peer=\"{peer_id}\" channel=\"{}\" \
             role=\"{role}\" reason=\"{}\"",
            channel.unwrap_or(UNKNOWN_FIELD),
            decision.reason().unwrap_or(GENERIC_DENY_REASON)
        );

        let mut limiter = self.limiter.lock().unwrap_or_else(PoisonError::into_inner);
        match limiter.as_mut() {
            None => self.logger.info(&line),
            Some(limiter) => {
                let now = Instant::now();
                if limiter.should_log(peer_id, now) {
                    self.logger.info(&line);
                } else if limiter.suppressed(peer_id, now) == 1 {
                    self.logger.warn(&format!(
                        "rbac: rate limit exceeded for peer=\"{peer_id}\", \
                         suppressing logs for 60s"
                    ));
                }
            },
        }
    }

    /// Ingress half of the command guard. Synchronous core of the
    /// message-received hook.
    pub fn handle_message_received(&self, event: &MessageReceivedEvent, ctx: &MessageContext) {
        let policy = self.policy();
        let Some(commands) = policy.system_commands() else {
            return;
        };
        let Some(command) = commands.match_blocked_command(&event.content) else {
            return;
        };

        // An unattributable sender resolves with an empty peer id, so
        // only wildcard-user roles can match it.
        let peer_id = event.from.as_deref().unwrap_or("");
        let channel = ctx.channel_id.as_deref();
        let role = policy.resolve_role(peer_id, channel);
        if policy.is_admin_by_tools(role) {
            debug!(command = %command, role = %role, "admin bypasses command guard");
            return;
        }

        self.pending.arm(command.clone(), Instant::now());
        self.logger.info(&format!(
            "rbac: GUARD command=\"{command}\" peer=\"{peer_id}\" channel=\"{}\" role=\"{role}\"",
            channel.unwrap_or(UNKNOWN_FIELD)
        ));
    }

    /// Egress half of the command guard: substitute the reply for a
    /// pending blocked command. Synchronous core of the message-sending
    /// hook.
    #[must_use]
    pub fn rewrite_outgoing(&self) -> Option<String> {
        let command = self.pending.consume(Instant::now())?;
        let policy = self.policy();
        let commands = policy.system_commands()?;
        Some(commands.block_response(&command).to_string())
    }
}

#[async_trait]
impl AgentHook for RbacPlugin {
    /// Runs before business-logic hooks.
    fn priority(&self) -> i32 {
        10
    }

    async fn before_tool_call(
        &self,
        event: &ToolCallEvent,
        ctx: &HookContext,
    ) -> Option<ToolVerdict> {
        self.check_tool_call(event, ctx)
    }

    fn message_received(&self, event: &MessageReceivedEvent, ctx: &MessageContext) {
        self.handle_message_received(event, ctx);
    }

    async fn message_sending(&self, _event: &OutgoingMessageEvent) -> Option<String> {
        self.rewrite_outgoing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;

    /// Captures host log lines for assertions.
    #[derive(Default)]
    struct CapturingLogger {
        lines: StdMutex<Vec<(&'static str, String)>>,
    }

    impl CapturingLogger {
        fn lines(&self) -> Vec<(&'static str, String)> {
            self.lines.lock().unwrap().clone()
        }

        fn lines_at(&self, level: &str) -> Vec<String> {
            self.lines()
                .into_iter()
                .filter(|(l, _)| *l == level)
                .map(|(_, line)| line)
                .collect()
        }
    }

    impl HostLogger for CapturingLogger {
        fn info(&self, line: &str) {
            self.lines.lock().unwrap().push(("info", line.to_string()));
        }

        fn warn(&self, line: &str) {
            self.lines.lock().unwrap().push(("warn", line.to_string()));
        }

        fn error(&self, line: &str) {
            self.lines.lock().unwrap().push(("error", line.to_string()));
        }
    }

    fn policy_doc() -> Value {
        json!({
            "roles": {
                "admin": { "users": ["408001372"], "tools": "*" },
                "guest": { "users": "*", "tools": ["get_recent_news"] }
            },
            "defaultRole": "guest",
            "logAllowed": true
        })
    }

    fn plugin_with_logger(doc: &Value) -> (Arc<CapturingLogger>, RbacPlugin) {
        let logger = Arc::new(CapturingLogger::default());
        let plugin = RbacPlugin::register(doc, logger.clone() as Arc<dyn HostLogger>).unwrap();
        (logger, plugin)
    }

    #[test]
    fn registration_logs_summary() {
        let (logger, _plugin) = plugin_with_logger(&policy_doc());
        let info = logger.lines_at("info");
        assert_eq!(info.len(), 1);
        assert!(info[0].contains("roles=2"));
        assert!(info[0].contains("defaultRole=\"guest\""));
        assert!(info[0].contains("failSafe=\"deny\""));
    }

    #[test]
    fn registration_surfaces_warnings() {
        let doc = json!({
            "roles": { "guest": { "users": "*", "tools": [] } }
        });
        let (logger, _plugin) = plugin_with_logger(&doc);
        let warnings = logger.lines_at("warn");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("empty tools list"));
    }

    #[test]
    fn invalid_document_aborts_registration() {
        let logger = Arc::new(CapturingLogger::default());
        let result = RbacPlugin::register(&json!({}), logger.clone() as Arc<dyn HostLogger>);
        assert!(result.is_err());
        assert_eq!(logger.lines_at("error").len(), 1);
    }

    #[test]
    fn internal_calls_carry_no_verdict() {
        let (_logger, plugin) = plugin_with_logger(&policy_doc());
        let verdict =
            plugin.check_tool_call(&ToolCallEvent::new("exec"), &HookContext::internal());
        assert!(verdict.is_none());
    }

    #[test]
    fn allowed_call_logs_when_enabled() {
        let (logger, plugin) = plugin_with_logger(&policy_doc());
        let verdict = plugin.check_tool_call(
            &ToolCallEvent::new("get_recent_news"),
            &HookContext::for_session("agent:main:telegram:direct:999111222"),
        );
        assert!(verdict.is_none());
        let allowed: Vec<_> = logger
            .lines_at("info")
            .into_iter()
            .filter(|line| line.contains("ALLOWED"))
            .collect();
        assert_eq!(allowed.len(), 1);
        assert!(allowed[0].contains("tool=\"get_recent_news\""));
        assert!(allowed[0].contains("peer=\"999111222\""));
        assert!(allowed[0].contains("channel=\"telegram\""));
        assert!(allowed[0].contains("role=\"guest\""));
    }

    #[test]
    fn denied_call_blocks_with_reason() {
        let (logger, plugin) = plugin_with_logger(&policy_doc());
        let verdict = plugin
            .check_tool_call(
                &ToolCallEvent::new("exec"),
                &HookContext::for_session("agent:main:telegram:direct:999111222"),
            )
            .unwrap();
        assert!(verdict.block);
        let reason = verdict.block_reason.unwrap();
        assert!(reason.contains("guest"));
        assert!(reason.contains("exec"));

        let blocked: Vec<_> = logger
            .lines_at("info")
            .into_iter()
            .filter(|line| line.contains("BLOCKED"))
            .collect();
        assert_eq!(blocked.len(), 1);
    }

    #[test]
    fn unparseable_session_follows_fail_safe_deny() {
        let (logger, plugin) = plugin_with_logger(&policy_doc());
        let verdict = plugin
            .check_tool_call(
                &ToolCallEvent::new("exec"),
                &HookContext::for_session("agent:main:main"),
            )
            .unwrap();
        assert_eq!(verdict.block_reason.as_deref(), Some(FAIL_SAFE_REASON));
        assert!(
            logger
                .lines_at("info")
                .iter()
                .any(|line| line.contains("BLOCKED") && line.contains("unrecognized session key"))
        );
    }

    #[test]
    fn unparseable_session_passes_under_fail_safe_allow() {
        let mut doc = policy_doc();
        doc["failSafe"] = json!("allow");
        let (_logger, plugin) = plugin_with_logger(&doc);
        let verdict = plugin.check_tool_call(
            &ToolCallEvent::new("exec"),
            &HookContext::for_session("agent:main:main"),
        );
        assert!(verdict.is_none());
    }

    #[test]
    fn log_blocked_false_silences_audit_but_still_blocks() {
        let mut doc = policy_doc();
        doc["logBlocked"] = json!(false);
        let (logger, plugin) = plugin_with_logger(&doc);
        let verdict = plugin.check_tool_call(
            &ToolCallEvent::new("exec"),
            &HookContext::for_session("agent:main:telegram:direct:999111222"),
        );
        assert!(verdict.is_some());
        assert!(
            logger
                .lines_at("info")
                .iter()
                .all(|line| !line.contains("BLOCKED"))
        );
    }

    #[test]
    fn rate_limit_caps_blocked_lines_and_notices_once() {
        let mut doc = policy_doc();
        doc["rateLimit"] = json!({ "maxBlockedPerMinute": 2 });
        let (logger, plugin) = plugin_with_logger(&doc);

        for _ in 0..5 {
            let verdict = plugin.check_tool_call(
                &ToolCallEvent::new("exec"),
                &HookContext::for_session("agent:main:telegram:direct:999111222"),
            );
            // Blocking is never rate limited, only its audit output.
            assert!(verdict.is_some());
        }

        let blocked = logger
            .lines_at("info")
            .into_iter()
            .filter(|line| line.contains("BLOCKED"))
            .count();
        assert_eq!(blocked, 2);

        let notices = logger
            .lines_at("warn")
            .into_iter()
            .filter(|line| line.contains("rate limit exceeded"))
            .count();
        assert_eq!(notices, 1);
    }

    #[test]
    fn guard_arms_for_non_admin_and_substitutes_reply() {
        let mut doc = policy_doc();
        doc["systemCommands"] = json!({
            "blocked": ["/status"],
            "blockResponse": "Not for you."
        });
        let (logger, plugin) = plugin_with_logger(&doc);

        plugin.handle_message_received(
            &MessageReceivedEvent {
                content: "/status".to_string(),
                from: Some("999111222".to_string()),
            },
            &MessageContext {
                channel_id: Some("telegram".to_string()),
            },
        );
        assert!(
            logger
                .lines_at("info")
                .iter()
                .any(|line| line.contains("GUARD") && line.contains("command=\"/status\""))
        );

        assert_eq!(plugin.rewrite_outgoing(), Some("Not for you.".to_string()));
        // Slot is consumed; the next reply passes untouched.
        assert_eq!(plugin.rewrite_outgoing(), None);
    }

    #[test]
    fn guard_skips_admins() {
        let mut doc = policy_doc();
        doc["systemCommands"] = json!({ "blocked": ["/status"] });
        let (_logger, plugin) = plugin_with_logger(&doc);

        plugin.handle_message_received(
            &MessageReceivedEvent {
                content: "/status".to_string(),
                from: Some("408001372".to_string()),
            },
            &MessageContext::default(),
        );
        assert_eq!(plugin.rewrite_outgoing(), None);
    }

    #[test]
    fn reload_swaps_policy_atomically() {
        let (_logger, plugin) = plugin_with_logger(&policy_doc());
        assert_eq!(plugin.policy().default_role(), "guest");

        let replacement = json!({
            "roles": { "operator": { "users": "*", "tools": "*" } },
            "defaultRole": "operator"
        });
        plugin.reload(&replacement).unwrap();
        assert_eq!(plugin.policy().default_role(), "operator");

        // A rejected reload keeps the active policy.
        assert!(plugin.reload(&json!({})).is_err());
        assert_eq!(plugin.policy().default_role(), "operator");
    }

    #[tokio::test]
    async fn hook_trait_delegates_to_sync_core() {
        let (_logger, plugin) = plugin_with_logger(&policy_doc());
        let verdict = plugin
            .before_tool_call(
                &ToolCallEvent::new("exec"),
                &HookContext::for_session("agent:main:telegram:direct:999111222"),
            )
            .await;
        assert!(verdict.is_some());
        assert!(plugin.priority() < 100);
    }
}
