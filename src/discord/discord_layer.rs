// Discord layer - commands and event handlers.

#[path = "commands/command_catalog.rs"]
pub mod commands;

#[path = "moderation/hierarchy.rs"]
pub mod hierarchy;

pub mod menus;

// Re-export command types for convenience
pub use commands::{Data, Error};
