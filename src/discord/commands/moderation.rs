// Moderation commands.
//
// Every punitive command runs the same pipeline: hierarchy gate, DM
// notice, platform call, log record, acknowledgement. The gate and the
// log live in core; this layer only translates Discord types.

use crate::core::moderation::ModAction;
use crate::core::settings::DEFAULT_PREFIX;
use crate::discord::commands::{Context, Error, BOT_COLOUR};
use crate::discord::hierarchy;
use poise::serenity_prelude as serenity;
use poise::serenity_prelude::Mentionable;

/// Reason recorded when the moderator gives none.
pub const DEFAULT_REASON: &str = "No reason provided";

/// Most messages the bulk commands will fetch per history page.
const PURGE_LIMIT: u16 = 500;

// ============================================================================
// PREFIX SETTINGS
// ============================================================================

/// The bot's prefix in the server
#[poise::command(
    prefix_command,
    guild_only,
    subcommands("prefix_set"),
    required_bot_permissions = "SEND_MESSAGES"
)]
pub async fn prefix(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    // Display never provisions a settings row; unconfigured guilds show
    // the default.
    match ctx.data().settings.current_prefix(guild_id.get()).await? {
        Some(pre) => ctx.say(format!("My prefix here is `{pre}`")).await?,
        None => ctx.say(format!("My prefix here is `{DEFAULT_PREFIX}`")).await?,
    };
    Ok(())
}

/// Change the bot's prefix in the server
#[poise::command(
    prefix_command,
    rename = "set",
    aliases("add", "change"),
    guild_only,
    required_permissions = "MANAGE_GUILD",
    required_bot_permissions = "SEND_MESSAGES"
)]
pub async fn prefix_set(ctx: Context<'_>, prefix: Option<String>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    match prefix {
        Some(pre) => {
            ctx.data().settings.set_prefix(guild_id.get(), &pre).await?;
            ctx.say(format!("Prefix set to `{pre}`")).await?;
        }
        None => {
            ctx.say("Please specify the new prefix").await?;
        }
    }
    Ok(())
}

// ============================================================================
// THE ACTION PIPELINE
// ============================================================================

/// Gate, notify, act and log for a single member. Returns `Ok(true)` when
/// the action was applied.
async fn apply_action(
    ctx: Context<'_>,
    member: &serenity::Member,
    action: ModAction,
    reason: &str,
) -> Result<bool, Error> {
    if !hierarchy::gate(ctx, member, action).await? {
        return Ok(false);
    }
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(false);
    };
    let guild_name = ctx.guild().map(|g| g.name.clone()).unwrap_or_default();
    let audit = format!("{} | {}", reason, ctx.author().tag());

    // Notify before acting: a kicked or banned member can no longer be
    // reached. Closed DMs are not an error.
    let preposition = if action == ModAction::Warn { "in" } else { "from" };
    let notice = format!(
        "{} {} {} for {} by {}",
        action.done(),
        preposition,
        guild_name,
        reason,
        ctx.author().tag()
    );
    let _ = member
        .user
        .direct_message(ctx, serenity::CreateMessage::new().content(notice))
        .await;

    match action {
        ModAction::Warn => {}
        ModAction::Kick => member.kick_with_reason(ctx.http(), &audit).await?,
        ModAction::Ban => member.ban_with_reason(ctx.http(), 0, &audit).await?,
        ModAction::Softban => {
            member.ban_with_reason(ctx.http(), 0, &audit).await?;
            guild_id.unban(ctx.http(), member.user.id).await?;
        }
        // Mute and unmute need the mute role and run their own pipeline.
        ModAction::Mute | ModAction::Unmute => {}
    }

    ctx.data()
        .moderation
        .record(
            guild_id.get(),
            member.user.id.get(),
            ctx.author().id.get(),
            action,
            reason,
        )
        .await?;
    Ok(true)
}

/// Shared body of the bulk commands: apply to each member independently,
/// then acknowledge everyone who was actually actioned.
async fn apply_to_all(
    ctx: Context<'_>,
    members: &[serenity::Member],
    action: ModAction,
    reason: &str,
) -> Result<(), Error> {
    if members.is_empty() {
        ctx.say("You need to mention at least one member").await?;
        return Ok(());
    }
    let mut actioned = Vec::new();
    for member in members {
        // One rejection must not abort the rest of the list.
        if apply_action(ctx, member, action, reason).await? {
            actioned.push(member.mention().to_string());
        }
    }
    if !actioned.is_empty() {
        ctx.say(format!("{} {}", action.done(), actioned.join(", ")))
            .await?;
    }
    Ok(())
}

fn reason_or_default(reason: Option<String>) -> String {
    reason.unwrap_or_else(|| DEFAULT_REASON.to_string())
}

// ============================================================================
// PUNITIVE COMMANDS
// ============================================================================

/// Warn a member
#[poise::command(
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_MESSAGES",
    required_bot_permissions = "SEND_MESSAGES"
)]
pub async fn warn(
    ctx: Context<'_>,
    member: serenity::Member,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    if apply_action(ctx, &member, ModAction::Warn, &reason).await? {
        ctx.say(format!("Warned {}", member.mention())).await?;
    }
    Ok(())
}

/// Kick a member from the server
#[poise::command(
    prefix_command,
    guild_only,
    required_permissions = "KICK_MEMBERS",
    required_bot_permissions = "SEND_MESSAGES | KICK_MEMBERS"
)]
pub async fn kick(
    ctx: Context<'_>,
    member: serenity::Member,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    if apply_action(ctx, &member, ModAction::Kick, &reason).await? {
        ctx.say(format!("Kicked {}", member.mention())).await?;
    }
    Ok(())
}

/// Kicks a list of members from the server
#[poise::command(
    prefix_command,
    guild_only,
    required_permissions = "KICK_MEMBERS",
    required_bot_permissions = "SEND_MESSAGES | KICK_MEMBERS"
)]
pub async fn kicks(
    ctx: Context<'_>,
    members: Vec<serenity::Member>,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    apply_to_all(ctx, &members, ModAction::Kick, &reason).await
}

/// Ban a member from the server
#[poise::command(
    prefix_command,
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "SEND_MESSAGES | BAN_MEMBERS"
)]
pub async fn ban(
    ctx: Context<'_>,
    member: serenity::Member,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    if apply_action(ctx, &member, ModAction::Ban, &reason).await? {
        ctx.say(format!("Banned {}", member.mention())).await?;
    }
    Ok(())
}

/// Bans a list of members from the server
#[poise::command(
    prefix_command,
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "SEND_MESSAGES | BAN_MEMBERS"
)]
pub async fn bans(
    ctx: Context<'_>,
    members: Vec<serenity::Member>,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    apply_to_all(ctx, &members, ModAction::Ban, &reason).await
}

/// Soft bans a member from the server
#[poise::command(
    prefix_command,
    aliases("sban"),
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "SEND_MESSAGES | BAN_MEMBERS"
)]
pub async fn softban(
    ctx: Context<'_>,
    member: serenity::Member,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let reason = reason_or_default(reason);
    if apply_action(ctx, &member, ModAction::Softban, &reason).await? {
        ctx.say(format!("Softbanned {}", member.mention())).await?;
    }
    Ok(())
}

/// Unbans a member from the server
#[poise::command(
    prefix_command,
    aliases("uban"),
    guild_only,
    required_permissions = "BAN_MEMBERS",
    required_bot_permissions = "SEND_MESSAGES | BAN_MEMBERS"
)]
pub async fn unban(
    ctx: Context<'_>,
    member: String,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let reason = reason_or_default(reason);

    // `member` is either a raw user id or a full tag.
    let bans = guild_id.bans(ctx.http(), None, None).await?;
    let entry = if let Ok(id) = member.parse::<u64>() {
        bans.iter().find(|b| b.user.id.get() == id)
    } else {
        bans.iter().find(|b| b.user.tag() == member)
    };
    let Some(entry) = entry else {
        ctx.say("This member has not been banned before.").await?;
        return Ok(());
    };

    guild_id.unban(ctx.http(), entry.user.id).await?;
    tracing::info!(
        guild_id = guild_id.get(),
        user_id = entry.user.id.get(),
        %reason,
        "unbanned user"
    );
    match &entry.reason {
        Some(previous) => {
            ctx.say(format!(
                "Unbanned {} (ID: {}), previously banned for {}.",
                entry.user.tag(),
                entry.user.id,
                previous
            ))
            .await?;
        }
        None => {
            ctx.say(format!(
                "Unbanned {} (ID: {}).",
                entry.user.tag(),
                entry.user.id
            ))
            .await?;
        }
    }
    Ok(())
}

// ============================================================================
// MUTES
// ============================================================================

/// Mute a member
#[poise::command(
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_MESSAGES",
    required_bot_permissions = "SEND_MESSAGES | MANAGE_ROLES"
)]
pub async fn mute(
    ctx: Context<'_>,
    member: serenity::Member,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let reason = reason_or_default(reason);
    let mute_role = hierarchy::resolve_mute_role(ctx, guild_id).await?;

    if member.roles.contains(&mute_role) {
        ctx.say(format!("**{}** is already muted", member.user.tag()))
            .await?;
        return Ok(());
    }
    if !hierarchy::gate(ctx, &member, ModAction::Mute).await? {
        return Ok(());
    }

    member.add_role(ctx.http(), mute_role).await?;
    ctx.data()
        .moderation
        .record(
            guild_id.get(),
            member.user.id.get(),
            ctx.author().id.get(),
            ModAction::Mute,
            &reason,
        )
        .await?;
    ctx.say(format!("Muted {}", member.mention())).await?;

    let guild_name = ctx.guild().map(|g| g.name.clone()).unwrap_or_default();
    let _ = member
        .user
        .direct_message(
            ctx,
            serenity::CreateMessage::new()
                .content(format!("You were muted in {guild_name} for {reason}")),
        )
        .await;
    Ok(())
}

/// Unmute a member
#[poise::command(
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_MESSAGES",
    required_bot_permissions = "SEND_MESSAGES | MANAGE_ROLES"
)]
pub async fn unmute(
    ctx: Context<'_>,
    member: serenity::Member,
    #[rest] reason: Option<String>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let reason = reason_or_default(reason);
    let mute_role = hierarchy::resolve_mute_role(ctx, guild_id).await?;

    if !member.roles.contains(&mute_role) {
        ctx.say(format!("**{}** is already unmuted", member.user.tag()))
            .await?;
        return Ok(());
    }
    if !hierarchy::gate(ctx, &member, ModAction::Unmute).await? {
        return Ok(());
    }

    member.remove_role(ctx.http(), mute_role).await?;
    ctx.data()
        .moderation
        .record(
            guild_id.get(),
            member.user.id.get(),
            ctx.author().id.get(),
            ModAction::Unmute,
            &reason,
        )
        .await?;
    ctx.say(format!("Unmuted {}", member.mention())).await?;

    let guild_name = ctx.guild().map(|g| g.name.clone()).unwrap_or_default();
    let _ = member
        .user
        .direct_message(
            ctx,
            serenity::CreateMessage::new()
                .content(format!("You were unmuted in {guild_name} for {reason}")),
        )
        .await;
    Ok(())
}

/// Set a Muted role
#[poise::command(
    prefix_command,
    aliases("mutedrole"),
    guild_only,
    required_permissions = "MANAGE_GUILD",
    required_bot_permissions = "SEND_MESSAGES | MANAGE_ROLES"
)]
pub async fn muterole(ctx: Context<'_>, role: serenity::Role) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };

    let (is_owner, author_top, bot_top) = {
        let Some(guild) = ctx.guild() else {
            return Ok(());
        };
        let position = |id: serenity::UserId| {
            guild
                .members
                .get(&id)
                .and_then(|m| guild.member_highest_role(m))
                .map(|r| r.position)
                .unwrap_or(0)
        };
        (
            guild.owner_id == ctx.author().id,
            position(ctx.author().id),
            position(ctx.framework().bot_id),
        )
    };

    if role.position >= bot_top {
        ctx.say("Cannot manage this role, check my top role position")
            .await?;
        return Ok(());
    }
    if !is_owner && role.position >= author_top {
        ctx.say(format!(
            "Cannot manage **{}**, check your role position",
            role.name
        ))
        .await?;
        return Ok(());
    }

    ctx.data()
        .settings
        .set_mute_role(guild_id.get(), role.id.get())
        .await?;
    ctx.say(format!("Muted role set as {}", role.mention()))
        .await?;
    Ok(())
}

// ============================================================================
// HISTORY
// ============================================================================

/// Show a member's moderation history
#[poise::command(
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_MESSAGES",
    required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS"
)]
pub async fn warnings(ctx: Context<'_>, member: serenity::Member) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let records = ctx
        .data()
        .moderation
        .history(guild_id.get(), member.user.id.get())
        .await?;
    if records.is_empty() {
        ctx.say(format!(
            "**{}** has no moderation history",
            member.user.tag()
        ))
        .await?;
        return Ok(());
    }

    // Embeds cap out at 25 fields; show the most recent entries.
    let mut embed = serenity::CreateEmbed::new()
        .colour(BOT_COLOUR)
        .title(format!("Moderation history for {}", member.user.tag()))
        .footer(serenity::CreateEmbedFooter::new(format!(
            "{} entries",
            records.len()
        )));
    for record in records.iter().rev().take(25) {
        embed = embed.field(
            format!("{} - {}", record.action, record.date.format("%d %b %Y %H:%M")),
            format!("{} (by <@{}>)", record.reason, record.mod_id),
            false,
        );
    }
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

// ============================================================================
// CHANNEL TOOLS
// ============================================================================

/// Purge Messages
#[poise::command(
    prefix_command,
    aliases("prune"),
    guild_only,
    required_permissions = "MANAGE_MESSAGES",
    required_bot_permissions = "SEND_MESSAGES | MANAGE_MESSAGES"
)]
pub async fn purge(
    ctx: Context<'_>,
    limit: u16,
    member: Option<serenity::Member>,
) -> Result<(), Error> {
    if limit > PURGE_LIMIT {
        ctx.say(format!("Limit is {PURGE_LIMIT} messages")).await?;
        return Ok(());
    }
    // The invoking message goes first so it never counts against the limit.
    if let poise::Context::Prefix(prefix_ctx) = ctx {
        prefix_ctx.msg.delete(ctx.http()).await?;
    }
    let channel_id = ctx.channel_id();

    match member {
        None => {
            let mut remaining = limit as usize;
            let mut before: Option<serenity::MessageId> = None;
            while remaining > 0 {
                let mut request = serenity::GetMessages::new().limit(remaining.min(100) as u8);
                if let Some(cursor) = before {
                    request = request.before(cursor);
                }
                let batch = channel_id.messages(ctx.http(), request).await?;
                if batch.is_empty() {
                    break;
                }
                before = batch.last().map(|m| m.id);
                remaining -= batch.len();
                delete_batch(ctx, channel_id, batch.iter().map(|m| m.id).collect()).await?;
            }
        }
        Some(member) => {
            // Scan the most recent page for the member's messages only.
            let recent = channel_id
                .messages(ctx.http(), serenity::GetMessages::new().limit(100))
                .await?;
            let targets: Vec<serenity::MessageId> = recent
                .iter()
                .filter(|m| m.author.id == member.user.id)
                .take(limit as usize)
                .map(|m| m.id)
                .collect();
            delete_batch(ctx, channel_id, targets).await?;
        }
    }
    Ok(())
}

/// The bulk endpoint takes 2..=100 ids; single messages go through the
/// plain delete endpoint.
async fn delete_batch(
    ctx: Context<'_>,
    channel_id: serenity::ChannelId,
    ids: Vec<serenity::MessageId>,
) -> Result<(), Error> {
    match ids.len() {
        0 => Ok(()),
        1 => Ok(channel_id.delete_message(ctx.http(), ids[0]).await?),
        _ => Ok(channel_id.delete_messages(ctx.http(), ids).await?),
    }
}

/// Lock a Channel
#[poise::command(
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_CHANNELS",
    required_bot_permissions = "SEND_MESSAGES | MANAGE_CHANNELS"
)]
pub async fn lock(ctx: Context<'_>, channel: Option<serenity::GuildChannel>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let channel = match channel {
        Some(c) => c,
        None => match ctx.guild_channel().await {
            Some(c) => c,
            None => return Ok(()),
        },
    };

    // The @everyone role id is always the guild id.
    let everyone = serenity::RoleId::new(guild_id.get());
    let current = channel
        .permission_overwrites
        .iter()
        .find(|o| o.kind == serenity::PermissionOverwriteType::Role(everyone));

    let already_locked = current
        .map(|o| o.deny.contains(serenity::Permissions::SEND_MESSAGES))
        .unwrap_or(false);
    if already_locked {
        ctx.say(format!("{} is already on lockdown", channel.mention()))
            .await?;
        return Ok(());
    }

    let mut allow = current.map(|o| o.allow).unwrap_or_default();
    allow.remove(serenity::Permissions::SEND_MESSAGES);
    let deny = current.map(|o| o.deny).unwrap_or_default() | serenity::Permissions::SEND_MESSAGES;
    channel
        .create_permission(
            ctx.http(),
            serenity::PermissionOverwrite {
                allow,
                deny,
                kind: serenity::PermissionOverwriteType::Role(everyone),
            },
        )
        .await?;
    ctx.say(format!("{} is now on lockdown", channel.mention()))
        .await?;
    Ok(())
}

/// Unlock a Channel
#[poise::command(
    prefix_command,
    guild_only,
    required_permissions = "MANAGE_CHANNELS",
    required_bot_permissions = "SEND_MESSAGES | MANAGE_CHANNELS"
)]
pub async fn unlock(
    ctx: Context<'_>,
    channel: Option<serenity::GuildChannel>,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let channel = match channel {
        Some(c) => c,
        None => match ctx.guild_channel().await {
            Some(c) => c,
            None => return Ok(()),
        },
    };

    let everyone = serenity::RoleId::new(guild_id.get());
    let current = channel
        .permission_overwrites
        .iter()
        .find(|o| o.kind == serenity::PermissionOverwriteType::Role(everyone));

    let Some(overwrite) =
        current.filter(|o| o.deny.contains(serenity::Permissions::SEND_MESSAGES))
    else {
        ctx.say(format!("{} is already unlocked", channel.mention()))
            .await?;
        return Ok(());
    };

    let mut deny = overwrite.deny;
    deny.remove(serenity::Permissions::SEND_MESSAGES);
    channel
        .create_permission(
            ctx.http(),
            serenity::PermissionOverwrite {
                allow: overwrite.allow,
                deny,
                kind: serenity::PermissionOverwriteType::Role(everyone),
            },
        )
        .await?;
    ctx.say(format!("{} is now unlocked", channel.mention()))
        .await?;
    Ok(())
}
