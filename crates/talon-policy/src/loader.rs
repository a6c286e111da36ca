//! Policy document loading.
//!
//! The loader consumes an untyped [`serde_json::Value`] (typically
//! deserialized from a JSON or YAML document), normalizes it, and either
//! returns a fully valid [`Policy`] or fails with the offending document
//! path. Parsing is structural and rejecting: anything not explicitly
//! supported is an error. Unknown top-level keys are ignored for forward
//! compatibility.
//!
//! Validation stops at the first failure; warnings accumulate and are
//! surfaced on the returned `Policy`.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{PolicyDefect, PolicyError, PolicyResult};
use crate::policy::{
    ChannelSelector, CommandMode, DEFAULT_BLOCK_RESPONSE, FailSafe, PeerSelector, Policy,
    RateLimitConfig, RoleSpec, SystemCommands, ToolAccess, ToolPattern,
};

/// Role assigned when the document omits `defaultRole`.
const DEFAULT_ROLE: &str = "guest";

/// Maximum allowed policy file size (1 MiB).
const MAX_POLICY_FILE_SIZE: u64 = 1_048_576;

impl Policy {
    /// Load a policy from an untyped document value.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Invalid`] naming the offending document path
    /// when the value fails structural validation.
    pub fn from_value(doc: &Value) -> PolicyResult<Self> {
        load(doc)
    }

    /// Load a policy from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ParseJson`] when the string is not valid JSON,
    /// or [`PolicyError::Invalid`] when the document fails validation.
    pub fn from_json_str(raw: &str) -> PolicyResult<Self> {
        let doc: Value = serde_json::from_str(raw).map_err(|source| PolicyError::ParseJson {
            path: "<inline>".to_string(),
            source,
        })?;
        load(&doc)
    }

    /// Load a policy from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::ParseYaml`] when the string is not valid YAML,
    /// or [`PolicyError::Invalid`] when the document fails validation.
    pub fn from_yaml_str(raw: &str) -> PolicyResult<Self> {
        let doc: Value = serde_yaml::from_str(raw).map_err(|source| PolicyError::ParseYaml {
            path: "<inline>".to_string(),
            source,
        })?;
        load(&doc)
    }

    /// Load a policy from a file, dispatching on the extension
    /// (`.yaml`/`.yml` parse as YAML, anything else as JSON).
    ///
    /// # Errors
    ///
    /// Returns [`PolicyError::Read`] when the file cannot be read,
    /// [`PolicyError::TooLarge`] when it exceeds the 1 MiB cap, and parse
    /// or validation errors as the string front-ends do.
    pub fn from_path(path: &Path) -> PolicyResult<Self> {
        let display = path.display().to_string();
        let content = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: display.clone(),
            source,
        })?;

        // Size is checked after reading so there is no stat/read race.
        if content.len() as u64 > MAX_POLICY_FILE_SIZE {
            return Err(PolicyError::TooLarge {
                path: display,
                size: content.len() as u64,
                limit: MAX_POLICY_FILE_SIZE,
            });
        }

        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

        let doc: Value = if is_yaml {
            serde_yaml::from_str(&content).map_err(|source| PolicyError::ParseYaml {
                path: display,
                source,
            })?
        } else {
            serde_json::from_str(&content).map_err(|source| PolicyError::ParseJson {
                path: display,
                source,
            })?
        };
        load(&doc)
    }
}

#[allow(clippy::too_many_lines)]
fn load(doc: &Value) -> PolicyResult<Policy> {
    let root = doc.as_object().ok_or_else(|| {
        PolicyError::invalid("$", PolicyDefect::WrongType, "document must be an object")
    })?;

    let mut warnings = Vec::new();

    // Roles, in declared order. Order is contractual: resolution is
    // first-match, so a wildcard-users role must not precede a role with
    // a specific user list.
    let roles_value = root.get("roles").ok_or_else(|| {
        PolicyError::invalid("roles", PolicyDefect::MissingField, "is required")
    })?;
    let roles_map = roles_value.as_object().ok_or_else(|| {
        PolicyError::invalid(
            "roles",
            PolicyDefect::WrongType,
            "must be an object mapping role names to role specs",
        )
    })?;
    if roles_map.is_empty() {
        return Err(PolicyError::invalid(
            "roles",
            PolicyDefect::EmptyValue,
            "must declare at least one role",
        ));
    }

    let mut roles: Vec<(String, RoleSpec)> = Vec::with_capacity(roles_map.len());
    let mut first_wildcard_users: Option<&str> = None;
    for (name, spec_value) in roles_map {
        let spec = parse_role(name, spec_value, &mut warnings)?;
        match (&spec.users, first_wildcard_users) {
            (PeerSelector::Ids(_), Some(wildcard)) => {
                return Err(PolicyError::invalid(
                    format!("roles.{name}"),
                    PolicyDefect::RoleOrdering,
                    format!(
                        "role \"{name}\" has a specific user list but is declared after \
                         wildcard-users role \"{wildcard}\"; first-match resolution would \
                         never reach it"
                    ),
                ));
            },
            (PeerSelector::Any, None) => first_wildcard_users = Some(name.as_str()),
            _ => {},
        }
        roles.push((name.clone(), spec));
    }

    // Default role must be declared.
    let default_role = match root.get("defaultRole") {
        None | Some(Value::Null) => DEFAULT_ROLE.to_string(),
        Some(Value::String(name)) => name.clone(),
        Some(_) => {
            return Err(PolicyError::invalid(
                "defaultRole",
                PolicyDefect::WrongType,
                "must be a string",
            ));
        },
    };
    if !roles.iter().any(|(name, _)| *name == default_role) {
        return Err(PolicyError::invalid(
            "defaultRole",
            PolicyDefect::UnknownReference,
            format!("role \"{default_role}\" is not declared in roles"),
        ));
    }

    // Tool groups, then group-reference verification across all roles.
    let tool_groups = parse_tool_groups(root.get("toolGroups"))?;
    for (name, spec) in &roles {
        if let ToolAccess::Patterns(patterns) = &spec.tools {
            for pattern in patterns {
                if let ToolPattern::Group(group) = pattern {
                    if !tool_groups.contains_key(group) {
                        return Err(PolicyError::invalid(
                            format!("roles.{name}.tools"),
                            PolicyDefect::UnknownReference,
                            format!("references undefined tool group \"@{group}\""),
                        ));
                    }
                }
            }
        }
    }

    let log_blocked = parse_bool(root.get("logBlocked"), "logBlocked", true)?;
    let log_allowed = parse_bool(root.get("logAllowed"), "logAllowed", false)?;
    let fail_safe = parse_fail_safe(root.get("failSafe"))?;
    let rate_limit = parse_rate_limit(root.get("rateLimit"))?;
    let system_commands = parse_system_commands(root.get("systemCommands"))?;

    debug!(
        roles = roles.len(),
        default_role = %default_role,
        fail_safe = %fail_safe,
        warnings = warnings.len(),
        "policy loaded"
    );

    Ok(Policy {
        roles,
        default_role,
        log_blocked,
        log_allowed,
        fail_safe,
        tool_groups,
        rate_limit,
        system_commands,
        warnings,
    })
}

fn parse_role(name: &str, value: &Value, warnings: &mut Vec<String>) -> PolicyResult<RoleSpec> {
    let obj = value.as_object().ok_or_else(|| {
        PolicyError::invalid(
            format!("roles.{name}"),
            PolicyDefect::WrongType,
            "must be an object",
        )
    })?;

    let users = match string_or_list(obj.get("users"), &format!("roles.{name}.users"))? {
        None => {
            return Err(PolicyError::invalid(
                format!("roles.{name}.users"),
                PolicyDefect::MissingField,
                "is required",
            ));
        },
        Some(Selector::Wildcard) => PeerSelector::Any,
        Some(Selector::List(ids)) => PeerSelector::Ids(ids),
    };

    let tools = match string_or_list(obj.get("tools"), &format!("roles.{name}.tools"))? {
        None => {
            return Err(PolicyError::invalid(
                format!("roles.{name}.tools"),
                PolicyDefect::MissingField,
                "is required",
            ));
        },
        Some(Selector::Wildcard) => ToolAccess::Any,
        Some(Selector::List(entries)) => {
            if entries.is_empty() {
                warnings.push(format!(
                    "role \"{name}\" has an empty tools list; every tool call will be denied"
                ));
            }
            ToolAccess::Patterns(entries.into_iter().map(parse_tool_pattern).collect())
        },
    };

    let channels = match string_or_list(obj.get("channels"), &format!("roles.{name}.channels"))? {
        None | Some(Selector::Wildcard) => ChannelSelector::Any,
        Some(Selector::List(names)) => {
            if names.is_empty() {
                warnings.push(format!(
                    "role \"{name}\" has an empty channels list; the role will never match"
                ));
            }
            ChannelSelector::Names(names)
        },
    };

    Ok(RoleSpec {
        users,
        tools,
        channels,
    })
}

fn parse_tool_pattern(entry: String) -> ToolPattern {
    if let Some(group) = entry.strip_prefix('@') {
        return ToolPattern::Group(group.to_string());
    }
    if let Some(prefix) = entry.strip_suffix('*') {
        return ToolPattern::Prefix(prefix.to_string());
    }
    ToolPattern::Exact(entry)
}

/// A `"*"`-or-list document value, before it is given a domain meaning.
enum Selector {
    Wildcard,
    List(Vec<String>),
}

fn string_or_list(value: Option<&Value>, path: &str) -> PolicyResult<Option<Selector>> {
    match value {
        None => Ok(None),
        Some(Value::String(s)) if s == "*" => Ok(Some(Selector::Wildcard)),
        Some(Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let Value::String(s) = item else {
                    return Err(PolicyError::invalid(
                        path,
                        PolicyDefect::WrongType,
                        "must be \"*\" or string[]",
                    ));
                };
                out.push(s.clone());
            }
            Ok(Some(Selector::List(out)))
        },
        Some(_) => Err(PolicyError::invalid(
            path,
            PolicyDefect::WrongType,
            "must be \"*\" or string[]",
        )),
    }
}

fn parse_bool(value: Option<&Value>, path: &str, default: bool) -> PolicyResult<bool> {
    match value {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(PolicyError::invalid(
            path,
            PolicyDefect::WrongType,
            "must be a boolean",
        )),
    }
}

fn parse_fail_safe(value: Option<&Value>) -> PolicyResult<FailSafe> {
    match value {
        None | Some(Value::Null) => Ok(FailSafe::Deny),
        Some(Value::String(s)) if s == "deny" => Ok(FailSafe::Deny),
        Some(Value::String(s)) if s == "allow" => Ok(FailSafe::Allow),
        Some(_) => Err(PolicyError::invalid(
            "failSafe",
            PolicyDefect::UnsupportedValue,
            "must be \"deny\" or \"allow\"",
        )),
    }
}

fn parse_tool_groups(value: Option<&Value>) -> PolicyResult<HashMap<String, Vec<String>>> {
    let Some(value) = value else {
        return Ok(HashMap::new());
    };
    if value.is_null() {
        return Ok(HashMap::new());
    }
    let obj = value.as_object().ok_or_else(|| {
        PolicyError::invalid(
            "toolGroups",
            PolicyDefect::WrongType,
            "must be an object mapping group names to tool lists",
        )
    })?;

    let mut groups = HashMap::with_capacity(obj.len());
    for (name, tools_value) in obj {
        let path = format!("toolGroups.{name}");
        let Value::Array(items) = tools_value else {
            return Err(PolicyError::invalid(
                path,
                PolicyDefect::WrongType,
                "must be a list of tool names",
            ));
        };
        let mut tools = Vec::with_capacity(items.len());
        for item in items {
            let Value::String(tool) = item else {
                return Err(PolicyError::invalid(
                    path,
                    PolicyDefect::WrongType,
                    "must be a list of tool names",
                ));
            };
            tools.push(tool.clone());
        }
        groups.insert(name.clone(), tools);
    }
    Ok(groups)
}

fn parse_rate_limit(value: Option<&Value>) -> PolicyResult<Option<RateLimitConfig>> {
    let Some(value) = value else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    let obj = value.as_object().ok_or_else(|| {
        PolicyError::invalid("rateLimit", PolicyDefect::WrongType, "must be an object")
    })?;

    let max = obj.get("maxBlockedPerMinute").ok_or_else(|| {
        PolicyError::invalid(
            "rateLimit.maxBlockedPerMinute",
            PolicyDefect::MissingField,
            "is required",
        )
    })?;
    let max = max.as_u64().ok_or_else(|| {
        PolicyError::invalid(
            "rateLimit.maxBlockedPerMinute",
            PolicyDefect::WrongType,
            "must be an integer greater than or equal to 1",
        )
    })?;
    if max < 1 {
        return Err(PolicyError::invalid(
            "rateLimit.maxBlockedPerMinute",
            PolicyDefect::OutOfRange,
            "must be greater than or equal to 1",
        ));
    }
    let max_blocked_per_minute = u32::try_from(max).map_err(|_| {
        PolicyError::invalid(
            "rateLimit.maxBlockedPerMinute",
            PolicyDefect::OutOfRange,
            format!("must not exceed {}", u32::MAX),
        )
    })?;

    Ok(Some(RateLimitConfig {
        max_blocked_per_minute,
    }))
}

#[allow(clippy::too_many_lines)]
fn parse_system_commands(value: Option<&Value>) -> PolicyResult<Option<SystemCommands>> {
    let Some(value) = value else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }
    let obj = value.as_object().ok_or_else(|| {
        PolicyError::invalid(
            "systemCommands",
            PolicyDefect::WrongType,
            "must be an object",
        )
    })?;

    let mode = match obj.get("mode") {
        None | Some(Value::Null) => CommandMode::Blocklist,
        Some(Value::String(s)) if s == "blocklist" => CommandMode::Blocklist,
        Some(Value::String(s)) if s == "allowlist" => CommandMode::Allowlist,
        Some(_) => {
            return Err(PolicyError::invalid(
                "systemCommands.mode",
                PolicyDefect::UnsupportedValue,
                "must be \"blocklist\" or \"allowlist\"",
            ));
        },
    };

    let blocked = parse_command_list(obj, "blocked")?;
    let allowed = parse_command_list(obj, "allowed")?;

    match mode {
        CommandMode::Blocklist => {
            if blocked.as_ref().is_none_or(Vec::is_empty) {
                return Err(PolicyError::invalid(
                    "systemCommands.blocked",
                    PolicyDefect::EmptyValue,
                    "must be a non-empty command list in blocklist mode",
                ));
            }
        },
        CommandMode::Allowlist => {
            // An empty allowlist is legal (it blocks every command), but
            // the field itself must be present.
            if allowed.is_none() {
                return Err(PolicyError::invalid(
                    "systemCommands.allowed",
                    PolicyDefect::MissingField,
                    "is required in allowlist mode",
                ));
            }
        },
    }

    let guest_help = match obj.get("guestHelp") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(_) => {
            return Err(PolicyError::invalid(
                "systemCommands.guestHelp",
                PolicyDefect::WrongType,
                "must be a string or null",
            ));
        },
    };

    let block_response = match obj.get("blockResponse") {
        None | Some(Value::Null) => DEFAULT_BLOCK_RESPONSE.to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(_) => {
            return Err(PolicyError::invalid(
                "systemCommands.blockResponse",
                PolicyDefect::WrongType,
                "must be a string",
            ));
        },
    };

    Ok(Some(SystemCommands {
        mode,
        blocked: blocked.unwrap_or_default(),
        allowed: allowed.unwrap_or_default(),
        guest_help,
        block_response,
    }))
}

fn parse_command_list(obj: &Map<String, Value>, field: &str) -> PolicyResult<Option<Vec<String>>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => {
            let mut commands = Vec::with_capacity(items.len());
            for item in items {
                let Value::String(raw) = item else {
                    return Err(PolicyError::invalid(
                        format!("systemCommands.{field}"),
                        PolicyDefect::WrongType,
                        "must be a list of command strings",
                    ));
                };
                commands.push(normalize_command(raw));
            }
            Ok(Some(commands))
        },
        Some(_) => Err(PolicyError::invalid(
            format!("systemCommands.{field}"),
            PolicyDefect::WrongType,
            "must be a list of command strings",
        )),
    }
}

/// Normalize a command string: lowercase, trim, and prefix with `/` if
/// absent.
pub(crate) fn normalize_command(raw: &str) -> String {
    let trimmed = raw.trim().to_lowercase();
    if trimmed.starts_with('/') {
        trimmed
    } else {
        format!("/{trimmed}")
    }
}
