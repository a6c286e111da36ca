//! The frozen policy model.
//!
//! A [`Policy`] is produced by the loader and never mutated afterwards.
//! Reload is a host concern: build a fresh `Policy` and swap the shared
//! reference. The `"*"` wildcard sentinel exists only in the document;
//! internally every wildcard-or-list field is a tagged union.

use std::collections::HashMap;
use std::fmt;

// ---------------------------------------------------------------------------
// FailSafe
// ---------------------------------------------------------------------------

/// What to do when a session key cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailSafe {
    /// Block the call (default).
    #[default]
    Deny,
    /// Let the call through.
    Allow,
}

impl fmt::Display for FailSafe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deny => write!(f, "deny"),
            Self::Allow => write!(f, "allow"),
        }
    }
}

// ---------------------------------------------------------------------------
// Wildcard-or-list selectors
// ---------------------------------------------------------------------------

/// Which senders a role applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerSelector {
    /// Every sender.
    Any,
    /// Only the listed sender ids (exact string equality).
    Ids(Vec<String>),
}

impl PeerSelector {
    /// Whether this selector matches the given peer id.
    #[must_use]
    pub fn matches(&self, peer_id: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Ids(ids) => ids.iter().any(|id| id == peer_id),
        }
    }

    /// Whether this selector is the wildcard.
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

/// Which channels a role applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSelector {
    /// Every channel, including sessions with no channel at all.
    Any,
    /// Only the listed channel names. A session without a channel never
    /// matches a list.
    Names(Vec<String>),
}

impl ChannelSelector {
    /// Whether this selector matches the given channel, if any.
    #[must_use]
    pub fn matches(&self, channel: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Names(names) => {
                channel.is_some_and(|channel| names.iter().any(|name| name == channel))
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tool patterns
// ---------------------------------------------------------------------------

/// One entry of a role's tool list, parsed at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolPattern {
    /// A plain tool name, matched verbatim.
    Exact(String),
    /// A prefix pattern (`exec_*` in the document). Matches any tool that
    /// starts with the prefix and is strictly longer than it.
    Prefix(String),
    /// A reference to a named tool group (`@group` in the document).
    Group(String),
}

/// Which tools a role may invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolAccess {
    /// Every tool. Roles with this access are treated as administrators
    /// by the command guard.
    Any,
    /// Only tools matching the listed patterns. An empty list blocks
    /// every tool.
    Patterns(Vec<ToolPattern>),
}

impl ToolAccess {
    /// Whether this access grants every tool.
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

// ---------------------------------------------------------------------------
// RoleSpec
// ---------------------------------------------------------------------------

/// The access rights bundled under one role name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSpec {
    pub(crate) users: PeerSelector,
    pub(crate) tools: ToolAccess,
    pub(crate) channels: ChannelSelector,
}

impl RoleSpec {
    /// Which senders this role applies to.
    #[must_use]
    pub fn users(&self) -> &PeerSelector {
        &self.users
    }

    /// Which tools this role may invoke.
    #[must_use]
    pub fn tools(&self) -> &ToolAccess {
        &self.tools
    }

    /// Which channels this role applies to.
    #[must_use]
    pub fn channels(&self) -> &ChannelSelector {
        &self.channels
    }

    /// Whether this role grants unrestricted tool access.
    ///
    /// This is the administrator test used to bypass command guarding.
    #[must_use]
    pub fn grants_all_tools(&self) -> bool {
        self.tools.is_any()
    }
}

// ---------------------------------------------------------------------------
// Rate limit
// ---------------------------------------------------------------------------

/// Audit-output rate limit settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum BLOCKED audit lines logged per peer per minute.
    pub max_blocked_per_minute: u32,
}

// ---------------------------------------------------------------------------
// System commands
// ---------------------------------------------------------------------------

/// Substitute body used when a blocked command carries no configured
/// `blockResponse`.
pub const DEFAULT_BLOCK_RESPONSE: &str = "This command is not available.";

/// How the command guard interprets its command lists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CommandMode {
    /// Commands in `blocked` are intercepted; everything else passes.
    #[default]
    Blocklist,
    /// Commands in `allowed` pass; everything else is intercepted.
    Allowlist,
}

impl fmt::Display for CommandMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocklist => write!(f, "blocklist"),
            Self::Allowlist => write!(f, "allowlist"),
        }
    }
}

/// Slash-command interception settings.
///
/// Every command string is normalized at load time: lowercased, trimmed,
/// and prefixed with `/` if absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemCommands {
    pub(crate) mode: CommandMode,
    pub(crate) blocked: Vec<String>,
    pub(crate) allowed: Vec<String>,
    pub(crate) guest_help: Option<String>,
    pub(crate) block_response: String,
}

impl SystemCommands {
    /// The configured interception mode.
    #[must_use]
    pub fn mode(&self) -> CommandMode {
        self.mode
    }

    /// Normalized blocked-command list (blocklist mode).
    #[must_use]
    pub fn blocked(&self) -> &[String] {
        &self.blocked
    }

    /// Normalized allowed-command list (allowlist mode).
    #[must_use]
    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    /// Substitute text shown in place of the host's `/help`, if set.
    #[must_use]
    pub fn guest_help(&self) -> Option<&str> {
        self.guest_help.as_deref()
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// A validated, immutable access policy.
///
/// Role iteration order is part of the contract: resolution is
/// first-match in document order, so `roles` is stored as an ordered
/// sequence rather than re-keyed by a hash map.
#[derive(Debug, Clone)]
pub struct Policy {
    pub(crate) roles: Vec<(String, RoleSpec)>,
    pub(crate) default_role: String,
    pub(crate) log_blocked: bool,
    pub(crate) log_allowed: bool,
    pub(crate) fail_safe: FailSafe,
    pub(crate) tool_groups: HashMap<String, Vec<String>>,
    pub(crate) rate_limit: Option<RateLimitConfig>,
    pub(crate) system_commands: Option<SystemCommands>,
    pub(crate) warnings: Vec<String>,
}

impl Policy {
    /// Roles in declared order.
    pub fn roles(&self) -> impl Iterator<Item = (&str, &RoleSpec)> {
        self.roles.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Number of declared roles.
    #[must_use]
    pub fn role_count(&self) -> usize {
        self.roles.len()
    }

    /// Look up a role by name.
    #[must_use]
    pub fn role(&self, name: &str) -> Option<&RoleSpec> {
        self.roles
            .iter()
            .find(|(role_name, _)| role_name == name)
            .map(|(_, spec)| spec)
    }

    /// The role assigned when no declared role matches.
    #[must_use]
    pub fn default_role(&self) -> &str {
        &self.default_role
    }

    /// Whether blocked tool calls are logged.
    #[must_use]
    pub fn log_blocked(&self) -> bool {
        self.log_blocked
    }

    /// Whether allowed tool calls are logged.
    #[must_use]
    pub fn log_allowed(&self) -> bool {
        self.log_allowed
    }

    /// Handling of unparseable session keys.
    #[must_use]
    pub fn fail_safe(&self) -> FailSafe {
        self.fail_safe
    }

    /// Expansion of a named tool group, if declared.
    #[must_use]
    pub fn tool_group(&self, name: &str) -> Option<&[String]> {
        self.tool_groups.get(name).map(Vec::as_slice)
    }

    /// Audit rate-limit settings, if configured.
    #[must_use]
    pub fn rate_limit(&self) -> Option<RateLimitConfig> {
        self.rate_limit
    }

    /// Slash-command interception settings, if configured.
    #[must_use]
    pub fn system_commands(&self) -> Option<&SystemCommands> {
        self.system_commands.as_ref()
    }

    /// Non-fatal diagnostics captured at load time.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Whether the named role grants unrestricted tool access.
    ///
    /// Unknown roles are never administrators.
    #[must_use]
    pub fn is_admin_by_tools(&self, role_name: &str) -> bool {
        self.role(role_name)
            .is_some_and(RoleSpec::grants_all_tools)
    }
}
