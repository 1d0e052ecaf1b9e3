// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "settings/sqlite_store.rs"]
pub mod settings;

#[path = "tags/sqlite_store.rs"]
pub mod tags;

#[path = "moderation/sqlite_store.rs"]
pub mod moderation;

#[path = "imagegen/nekobot_client.rs"]
pub mod imagegen;
