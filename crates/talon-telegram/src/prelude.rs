//! Prelude module - commonly used types for convenient import.
//!
//! Use `use talon_telegram::prelude::*;` to import all essential types.

pub use crate::{
    BuiltMenuCommands, CappedMenuCommands, MenuCommandSpec, TELEGRAM_MENU_COMMAND_CAP,
    build_capped_menu_commands, build_plugin_menu_commands,
};
