//! Tool access checking.
//!
//! Decides allow/deny for a `(tool, role)` pair. Exact names and `@group`
//! expansions are consulted before prefix patterns; a prefix pattern only
//! matches tools strictly longer than the prefix, so `exec_*` matches
//! `exec_shell` but never a tool named exactly `exec`.

use serde::Serialize;

use crate::policy::{Policy, ToolAccess, ToolPattern};

/// The outcome of a tool access check.
///
/// Serializable so hosts can ship decisions to their own audit or UI
/// surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessDecision {
    allowed: bool,
    role: String,
    reason: Option<String>,
}

impl AccessDecision {
    fn allow(role: &str) -> Self {
        Self {
            allowed: true,
            role: role.to_string(),
            reason: None,
        }
    }

    fn deny(role: &str, reason: String) -> Self {
        Self {
            allowed: false,
            role: role.to_string(),
            reason: Some(reason),
        }
    }

    /// Whether the call may proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// The role the decision was made for.
    #[must_use]
    pub fn role(&self) -> &str {
        &self.role
    }

    /// Human-readable denial reason; safe to show to end users (names the
    /// role and tool, nothing else).
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl Policy {
    /// Check whether `role_name` may invoke `tool_name`.
    #[must_use]
    pub fn check_tool_access(&self, tool_name: &str, role_name: &str) -> AccessDecision {
        let Some(spec) = self.role(role_name) else {
            return AccessDecision::deny(role_name, format!("Unknown role \"{role_name}\""));
        };

        let patterns = match &spec.tools {
            ToolAccess::Any => return AccessDecision::allow(role_name),
            ToolAccess::Patterns(patterns) => patterns,
        };

        // Exact names and group expansions first.
        for pattern in patterns {
            match pattern {
                ToolPattern::Exact(name) if name == tool_name => {
                    return AccessDecision::allow(role_name);
                },
                ToolPattern::Group(group) => {
                    if self
                        .tool_group(group)
                        .is_some_and(|tools| tools.iter().any(|tool| tool == tool_name))
                    {
                        return AccessDecision::allow(role_name);
                    }
                },
                _ => {},
            }
        }

        // Prefix patterns require the tool to extend the prefix.
        for pattern in patterns {
            if let ToolPattern::Prefix(prefix) = pattern {
                if tool_name.starts_with(prefix.as_str()) && tool_name.len() > prefix.len() {
                    return AccessDecision::allow(role_name);
                }
            }
        }

        AccessDecision::deny(
            role_name,
            format!("Role \"{role_name}\" does not have access to tool \"{tool_name}\""),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::policy::Policy;
    use serde_json::json;

    fn policy() -> Policy {
        Policy::from_value(&json!({
            "roles": {
                "admin": { "users": ["1"], "tools": "*" },
                "ops": { "users": ["2"], "tools": ["exec_*", "restart", "@news"] },
                "guest": { "users": "*", "tools": [] }
            },
            "defaultRole": "guest",
            "toolGroups": { "news": ["get_recent_news", "subscribe_user"] }
        }))
        .unwrap()
    }

    #[test]
    fn wildcard_tools_allow_everything() {
        let policy = policy();
        for tool in ["exec", "memory_search", "anything_at_all"] {
            assert!(policy.check_tool_access(tool, "admin").is_allowed());
        }
    }

    #[test]
    fn unknown_role_is_denied_with_reason() {
        let decision = policy().check_tool_access("exec", "operator");
        assert!(!decision.is_allowed());
        assert_eq!(decision.reason(), Some("Unknown role \"operator\""));
        assert_eq!(decision.role(), "operator");
    }

    #[test]
    fn exact_name_allows() {
        assert!(policy().check_tool_access("restart", "ops").is_allowed());
    }

    #[test]
    fn group_expansion_allows() {
        let policy = policy();
        assert!(policy.check_tool_access("get_recent_news", "ops").is_allowed());
        assert!(policy.check_tool_access("subscribe_user", "ops").is_allowed());
    }

    #[test]
    fn prefix_matches_only_strictly_longer_names() {
        let policy = policy();
        assert!(policy.check_tool_access("exec_shell", "ops").is_allowed());
        // `exec_*` does not cover a tool named exactly `exec`.
        let decision = policy.check_tool_access("exec", "ops");
        assert!(!decision.is_allowed());
        assert_eq!(
            decision.reason(),
            Some("Role \"ops\" does not have access to tool \"exec\"")
        );
    }

    #[test]
    fn prefix_does_not_match_the_bare_prefix() {
        // The tool equal to the pattern minus `*` is still denied.
        let decision = policy().check_tool_access("exec_", "ops");
        assert!(!decision.is_allowed());
    }

    #[test]
    fn empty_tools_deny_everything() {
        let policy = policy();
        for tool in ["get_recent_news", "exec", ""] {
            assert!(!policy.check_tool_access(tool, "guest").is_allowed());
        }
    }

    #[test]
    fn unlisted_tool_is_denied_with_role_and_tool_in_reason() {
        let decision = policy().check_tool_access("memory_search", "ops");
        assert!(!decision.is_allowed());
        let reason = decision.reason().unwrap();
        assert!(reason.contains("ops"));
        assert!(reason.contains("memory_search"));
    }
}
