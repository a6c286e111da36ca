//! Menu-command preparation for the Telegram Bot API.
//!
//! Two pure builders: one normalizes and deduplicates plugin-declared
//! command specs against the names the host has already claimed, the
//! other caps the combined list at Telegram's menu limit. Registration
//! itself (delete-then-set per scope, tolerating API failures) lives in a
//! thin adapter owned by the host.

use std::collections::HashSet;

use teloxide::types::BotCommand;
use tracing::debug;

/// Telegram's cap on menu commands per scope.
pub const TELEGRAM_MENU_COMMAND_CAP: usize = 100;

/// Telegram's cap on command name length.
const MAX_COMMAND_NAME_LEN: usize = 32;

/// A menu command declared by a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuCommandSpec {
    /// Command name; a leading `/` and mixed case are tolerated and
    /// normalized away.
    pub name: String,
    /// Human-readable description shown in the menu.
    pub description: String,
}

impl MenuCommandSpec {
    /// Create a spec.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// The accepted commands plus one human-readable issue per rejection.
#[derive(Debug, Clone, Default)]
pub struct BuiltMenuCommands {
    /// Commands that survived normalization and deduplication.
    pub commands: Vec<BotCommand>,
    /// Why the remaining specs were rejected.
    pub issues: Vec<String>,
}

/// Normalize plugin-declared specs into registrable menu commands.
///
/// Each accepted name is added to `existing_commands`, so repeated calls
/// across plugins share one claim set. Rejections (empty or malformed
/// names, empty descriptions, conflicts with already-claimed names,
/// duplicates within the batch) are reported as issues, never errors.
#[must_use]
pub fn build_plugin_menu_commands(
    specs: &[MenuCommandSpec],
    existing_commands: &mut HashSet<String>,
) -> BuiltMenuCommands {
    let mut built = BuiltMenuCommands::default();
    let mut added_this_pass: HashSet<String> = HashSet::new();

    for spec in specs {
        let name = normalize_command_name(&spec.name);
        if name.is_empty() {
            built
                .issues
                .push(format!("command \"{}\" has an empty name", spec.name));
            continue;
        }
        if !is_valid_command_name(&name) {
            built.issues.push(format!(
                "command \"{name}\" is not a valid Telegram command name \
                 (letters, digits, underscore, at most {MAX_COMMAND_NAME_LEN} characters)"
            ));
            continue;
        }

        let description = spec.description.trim();
        if description.is_empty() {
            built
                .issues
                .push(format!("command \"{name}\" has an empty description"));
            continue;
        }

        if added_this_pass.contains(&name) {
            built
                .issues
                .push(format!("command \"{name}\" is declared twice"));
            continue;
        }
        if existing_commands.contains(&name) {
            built.issues.push(format!(
                "command \"{name}\" conflicts with an already-registered command"
            ));
            continue;
        }

        existing_commands.insert(name.clone());
        added_this_pass.insert(name.clone());
        built.commands.push(BotCommand::new(name, description));
    }

    debug!(
        accepted = built.commands.len(),
        rejected = built.issues.len(),
        "built plugin menu commands"
    );
    built
}

/// A menu-command list capped at the platform limit.
#[derive(Debug, Clone)]
pub struct CappedMenuCommands {
    /// The first `cap` commands, order preserved.
    pub commands: Vec<BotCommand>,
    /// How many commands were supplied in total.
    pub total: usize,
    /// The cap that was applied.
    pub cap: usize,
    /// How many commands did not fit.
    pub overflow: usize,
}

/// Cap a combined command list at `max_commands` (defaulting callers pass
/// [`TELEGRAM_MENU_COMMAND_CAP`]), preserving order.
#[must_use]
pub fn build_capped_menu_commands(
    all_commands: Vec<BotCommand>,
    max_commands: usize,
) -> CappedMenuCommands {
    let total = all_commands.len();
    let overflow = total.saturating_sub(max_commands);
    let mut commands = all_commands;
    commands.truncate(max_commands);

    if overflow > 0 {
        debug!(total, cap = max_commands, overflow, "menu command list capped");
    }

    CappedMenuCommands {
        commands,
        total,
        cap: max_commands,
        overflow,
    }
}

/// Lowercase, trim, and strip one leading `/` from a declared name.
fn normalize_command_name(raw: &str) -> String {
    let trimmed = raw.trim().to_lowercase();
    match trimmed.strip_prefix('/') {
        Some(rest) => rest.to_string(),
        None => trimmed,
    }
}

/// Telegram command names: letters, digits, underscore, 1–32 characters.
fn is_valid_command_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= MAX_COMMAND_NAME_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str, description: &str) -> MenuCommandSpec {
        MenuCommandSpec::new(name, description)
    }

    #[test]
    fn accepts_and_normalizes_declared_names() {
        let mut existing = HashSet::new();
        let built = build_plugin_menu_commands(
            &[spec("/News", "Latest headlines"), spec(" subscribe ", "Subscribe")],
            &mut existing,
        );
        assert!(built.issues.is_empty());
        let names: Vec<&str> = built
            .commands
            .iter()
            .map(|command| command.command.as_str())
            .collect();
        assert_eq!(names, ["news", "subscribe"]);
        assert!(existing.contains("news"));
        assert!(existing.contains("subscribe"));
    }

    #[test]
    fn rejects_empty_and_malformed_names() {
        let mut existing = HashSet::new();
        let built = build_plugin_menu_commands(
            &[
                spec("", "Nameless"),
                spec("/", "Just a slash"),
                spec("has spaces", "Bad"),
                spec("ok-dash", "Bad"),
                spec(&"x".repeat(33), "Too long"),
            ],
            &mut existing,
        );
        assert!(built.commands.is_empty());
        assert_eq!(built.issues.len(), 5);
    }

    #[test]
    fn rejects_empty_descriptions() {
        let mut existing = HashSet::new();
        let built =
            build_plugin_menu_commands(&[spec("news", "   ")], &mut existing);
        assert!(built.commands.is_empty());
        assert_eq!(built.issues.len(), 1);
        assert!(built.issues[0].contains("description"));
        assert!(!existing.contains("news"));
    }

    #[test]
    fn rejects_conflicts_with_existing_commands() {
        let mut existing: HashSet<String> = ["help".to_string()].into_iter().collect();
        let built = build_plugin_menu_commands(&[spec("/help", "My help")], &mut existing);
        assert!(built.commands.is_empty());
        assert!(built.issues[0].contains("conflicts"));
    }

    #[test]
    fn rejects_duplicates_within_one_batch() {
        let mut existing = HashSet::new();
        let built = build_plugin_menu_commands(
            &[spec("news", "First"), spec("/NEWS", "Second")],
            &mut existing,
        );
        assert_eq!(built.commands.len(), 1);
        assert_eq!(built.issues.len(), 1);
        assert!(built.issues[0].contains("twice"));
    }

    #[test]
    fn claim_set_is_shared_across_calls() {
        let mut existing = HashSet::new();
        let first = build_plugin_menu_commands(&[spec("news", "News")], &mut existing);
        assert!(first.issues.is_empty());
        let second = build_plugin_menu_commands(&[spec("news", "Again")], &mut existing);
        assert!(second.commands.is_empty());
        assert_eq!(second.issues.len(), 1);
    }

    #[test]
    fn capping_preserves_order_and_reports_overflow() {
        let all: Vec<BotCommand> = (0..120)
            .map(|i| BotCommand::new(format!("cmd{i}"), format!("Command {i}")))
            .collect();
        let capped = build_capped_menu_commands(all, TELEGRAM_MENU_COMMAND_CAP);
        assert_eq!(capped.commands.len(), 100);
        assert_eq!(capped.total, 120);
        assert_eq!(capped.cap, 100);
        assert_eq!(capped.overflow, 20);
        assert_eq!(capped.commands[0].command, "cmd0");
        assert_eq!(capped.commands[99].command, "cmd99");
    }

    #[test]
    fn capping_under_the_limit_is_lossless() {
        let all = vec![BotCommand::new("news", "News")];
        let capped = build_capped_menu_commands(all, TELEGRAM_MENU_COMMAND_CAP);
        assert_eq!(capped.commands.len(), 1);
        assert_eq!(capped.overflow, 0);
    }

    #[test]
    fn name_at_the_length_limit_is_accepted() {
        let mut existing = HashSet::new();
        let name = "x".repeat(32);
        let built = build_plugin_menu_commands(&[spec(&name, "Edge")], &mut existing);
        assert_eq!(built.commands.len(), 1);
        assert!(built.issues.is_empty());
    }
}
