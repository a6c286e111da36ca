#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Talon Telegram - menu-command builders for the Telegram Bot API.
//!
//! Pure helpers that prepare the command lists a registration adapter
//! pushes to Telegram (`default` scope and per-chat scope, delete then
//! set). The adapter itself is host-owned; this crate only normalizes,
//! deduplicates, and caps.
//!
//! # Example
//!
//! ```
//! use std::collections::HashSet;
//! use talon_telegram::{
//!     MenuCommandSpec, TELEGRAM_MENU_COMMAND_CAP, build_capped_menu_commands,
//!     build_plugin_menu_commands,
//! };
//!
//! let mut claimed = HashSet::new();
//! let built = build_plugin_menu_commands(
//!     &[MenuCommandSpec::new("/news", "Latest headlines")],
//!     &mut claimed,
//! );
//! assert!(built.issues.is_empty());
//!
//! let capped = build_capped_menu_commands(built.commands, TELEGRAM_MENU_COMMAND_CAP);
//! assert_eq!(capped.overflow, 0);
//! ```

/// Menu-command normalization and capping.
pub mod menu;
/// Commonly used types for convenient import.
pub mod prelude;

// Re-export primary types at the crate root.
pub use menu::{
    BuiltMenuCommands, CappedMenuCommands, MenuCommandSpec, TELEGRAM_MENU_COMMAND_CAP,
    build_capped_menu_commands, build_plugin_menu_commands,
};
