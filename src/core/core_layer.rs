// The core module contains all business logic.
// Each feature gets its own submodule.

#[path = "settings/settings_service.rs"]
pub mod settings;

#[path = "tags/mod.rs"]
pub mod tags;

#[path = "moderation/mod.rs"]
pub mod moderation;
