// This is the entry point of the Discord bot.
//
// **Architecture Overview:**
// - `core/` = Business logic (platform-agnostic)
// - `infra/` = Implementations of core traits (databases, APIs)
// - `discord/` = Discord-specific adapters (commands, events)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Set up the Discord framework
// 4. Route every command error through one boundary handler

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "discord/discord_layer.rs"]
mod discord;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::core::moderation::ModerationService;
use crate::core::settings::{SettingsService, DEFAULT_PREFIX};
use crate::core::tags::{TagError, TagService};
use crate::discord::commands::{fun, moderation, tags, BotError};
use crate::discord::{Data, Error};
use crate::infra::imagegen::NekobotClient;
use crate::infra::moderation::SqliteModLogStore;
use crate::infra::settings::SqliteSettingsStore;
use crate::infra::tags::SqliteTagStore;
use poise::serenity_prelude as serenity;
use std::sync::Arc;

/// Per-guild prefix resolution. Runs before every message is parsed, so
/// this is also where a guild's settings row is first provisioned.
async fn resolve_prefix(
    ctx: poise::PartialContext<'_, Data, Error>,
) -> Result<Option<String>, Error> {
    let Some(guild_id) = ctx.guild_id else {
        return Ok(Some(DEFAULT_PREFIX.to_string()));
    };
    let prefix = ctx.data.settings.prefix_for(guild_id.get()).await?;
    Ok(Some(prefix))
}

/// A message that matched no command may still name a tag: `.hello` posts
/// the `hello` tag. A miss stays silent here, unlike `tag hello`.
async fn tag_fallback(
    ctx: &serenity::Context,
    msg: &serenity::Message,
    msg_content: &str,
    data: &Data,
) -> Result<(), Error> {
    let Some(guild_id) = msg.guild_id else {
        return Ok(());
    };
    let Some(name) = msg_content.split_whitespace().next() else {
        return Ok(());
    };
    if let Some(content) = data.tags.lookup(guild_id.get(), &name.to_lowercase()).await? {
        msg.channel_id.say(&ctx.http, content).await?;
    }
    Ok(())
}

/// Which command failures are the invoker's problem and deserve a chat
/// reply. Everything else is an operational fault and only gets logged.
fn user_notice(error: &Error) -> Option<String> {
    match error {
        BotError::Tag(tag_error) => match tag_error {
            TagError::StorageError(_) => None,
            user_facing => Some(user_facing.to_string()),
        },
        BotError::Settings(_)
        | BotError::Moderation(_)
        | BotError::Discord(_)
        | BotError::ImageGen(_) => None,
    }
}

/// The single error boundary. Every framework and command error lands
/// here exactly once.
async fn on_error(error: poise::FrameworkError<'_, Data, Error>) {
    match error {
        poise::FrameworkError::Command { error, ctx, .. } => {
            if let Some(notice) = user_notice(&error) {
                let _ = ctx.say(notice).await;
            } else {
                tracing::error!(
                    command = %ctx.command().qualified_name,
                    "command failed: {error}"
                );
                let _ = ctx.say("Unexpected error, alerted dev.").await;
            }
        }
        poise::FrameworkError::UnknownCommand {
            ctx,
            msg,
            msg_content,
            framework,
            ..
        } => {
            if let Err(err) = tag_fallback(ctx, msg, msg_content, framework.user_data).await {
                tracing::error!("tag fallback failed: {err}");
            }
        }
        poise::FrameworkError::ArgumentParse { error, input, ctx, .. } => {
            if ctx.command().name == "tag" && input.is_none() {
                let _ = ctx.say("You need to mention the tag name").await;
            } else {
                let embed = serenity::CreateEmbed::new()
                    .colour(serenity::Colour::DARK_GREY)
                    .description(error.to_string());
                let _ = ctx.send(poise::CreateReply::default().embed(embed)).await;
            }
        }
        poise::FrameworkError::MissingUserPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let perms = missing_permissions
                .map(|p| p.to_string().to_lowercase())
                .unwrap_or_else(|| "the required".to_string());
            let _ = ctx
                .say(format!(
                    "You need **{}** permissions to use: `{}`",
                    perms,
                    ctx.invoked_command_name()
                ))
                .await;
        }
        poise::FrameworkError::MissingBotPermissions {
            missing_permissions,
            ctx,
            ..
        } => {
            let _ = ctx
                .say(format!(
                    "Bot needs **{}** permissions to use: `{}`",
                    missing_permissions.to_string().to_lowercase(),
                    ctx.invoked_command_name()
                ))
                .await;
        }
        poise::FrameworkError::GuildOnly { ctx, .. } => {
            let notice = format!("**{}** cannot be used in DMs", ctx.command().name);
            let _ = ctx
                .author()
                .direct_message(ctx, serenity::CreateMessage::new().content(notice))
                .await;
        }
        poise::FrameworkError::CooldownHit {
            remaining_cooldown,
            ctx,
            ..
        } => {
            let secs = remaining_cooldown.as_secs();
            let notice = if secs < 60 {
                format!("Try in **{secs} seconds**")
            } else {
                format!("Try in **{} minutes**", secs.div_ceil(60))
            };
            let _ = ctx.say(notice).await;
        }
        other => {
            if let Err(err) = poise::builtins::on_error(other).await {
                tracing::error!("error while handling error: {err}");
            }
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    // Get Discord bot token from environment
    let token = std::env::var("DISCORD_TOKEN").expect(
        "Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.",
    );

    // Keep runtime databases in a dedicated folder so the repo root stays tidy.
    let data_dir = "data";
    std::fs::create_dir_all(data_dir).expect("Failed to create data directory for SQLite files");
    let db_path = format!("{}/mollie.db", data_dir);

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", db_path))
        .await
        .expect("Failed to connect to database");

    let settings_store = SqliteSettingsStore::new(pool.clone());
    settings_store
        .migrate()
        .await
        .expect("Failed to migrate guild settings table");
    let settings_service = Arc::new(SettingsService::new(settings_store));

    let tag_store = SqliteTagStore::new(pool.clone());
    tag_store
        .migrate()
        .await
        .expect("Failed to migrate tags table");
    let tag_service = Arc::new(TagService::new(tag_store));

    let mod_log_store = SqliteModLogStore::new(pool);
    mod_log_store
        .migrate()
        .await
        .expect("Failed to migrate moderation log table");
    let moderation_service = Arc::new(ModerationService::new(mod_log_store));

    // Create the data structure that will be shared across all commands
    let data = Data {
        settings: Arc::clone(&settings_service),
        tags: Arc::clone(&tag_service),
        moderation: Arc::clone(&moderation_service),
        imagegen: NekobotClient::new(),
    };

    // ========================================================================
    // DISCORD FRAMEWORK SETUP
    // ========================================================================
    // Configure the poise framework with our commands and settings.

    let intents = serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::MESSAGE_CONTENT // Required to read message content
        | serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            // Register all our commands here
            commands: vec![
                moderation::prefix(),
                moderation::warn(),
                moderation::kick(),
                moderation::kicks(),
                moderation::ban(),
                moderation::bans(),
                moderation::softban(),
                moderation::unban(),
                moderation::mute(),
                moderation::unmute(),
                moderation::muterole(),
                moderation::warnings(),
                moderation::purge(),
                moderation::lock(),
                moderation::unlock(),
                tags::tag(),
                tags::tags(),
                fun::eightball(),
                fun::choose(),
                fun::flip(),
                fun::echo(),
                fun::clyde(),
            ],
            prefix_options: poise::PrefixFrameworkOptions {
                dynamic_prefix: Some(|ctx| Box::pin(resolve_prefix(ctx))),
                mention_as_prefix: true,
                case_insensitive_commands: true,
                ..Default::default()
            },
            // Never let a tag or an echo ping anyone.
            allowed_mentions: Some(
                serenity::CreateAllowedMentions::new()
                    .everyone(false)
                    .all_roles(false)
                    .all_users(false)
                    .replied_user(false),
            ),
            on_error: |error| Box::pin(on_error(error)),
            ..Default::default()
        })
        .setup(|ctx, ready, _framework| {
            Box::pin(async move {
                tracing::info!("Logged in as: {}", ready.user.name);
                tracing::info!("Can see {} guilds", ready.guilds.len());
                ctx.set_activity(Some(serenity::ActivityData::watching("purring")));
                Ok(data)
            })
        })
        .build();

    // Create the client and start the bot
    let mut client = serenity::ClientBuilder::new(token, intents)
        .framework(framework)
        .await
        .expect("Error creating client");

    client.start().await.expect("Error running bot");
}
