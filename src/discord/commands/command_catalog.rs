// Discord commands module.
// Each feature gets its own command file.

pub mod fun;

pub mod moderation;

pub mod tags;

use crate::core::moderation::{ModerationError, ModerationService};
use crate::core::settings::{SettingsError, SettingsService};
use crate::core::tags::{TagError, TagService};
use crate::infra::imagegen::NekobotClient;
use crate::infra::moderation::SqliteModLogStore;
use crate::infra::settings::SqliteSettingsStore;
use crate::infra::tags::SqliteTagStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;
use thiserror::Error as ThisError;

/// Server Booster pink, used for every embed the bot sends.
pub const BOT_COLOUR: u32 = 0xF47FFF;

/// Everything that can go wrong in a command, tagged by origin.
///
/// Commands propagate these with `?`; the single `on_error` handler in
/// `main.rs` decides which variants become a chat reply and which are
/// only logged.
#[derive(Debug, ThisError)]
pub enum BotError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Tag(#[from] TagError),

    #[error(transparent)]
    Moderation(#[from] ModerationError),

    #[error(transparent)]
    Discord(#[from] serenity::Error),

    #[error("Imagegen error: {0}")]
    ImageGen(String),
}

pub type Error = BotError;
pub type Context<'a> = poise::Context<'a, Data, Error>;

/// Data that's shared across all commands.
/// Services are injected here once at startup; commands reach them
/// through `ctx.data()`.
pub struct Data {
    pub settings: Arc<SettingsService<SqliteSettingsStore>>,
    pub tags: Arc<TagService<SqliteTagStore>>,
    pub moderation: Arc<ModerationService<SqliteModLogStore>>,
    pub imagegen: NekobotClient,
}
