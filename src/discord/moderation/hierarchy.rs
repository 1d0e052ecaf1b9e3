// Bridges Discord's role cache to the platform-agnostic hierarchy gate.
//
// Everything read from the guild cache happens synchronously inside
// `snapshot`; the cache guard must never be held across an await.

use crate::core::moderation::{check_hierarchy, HierarchyVerdict, ModAction, RoleStanding};
use crate::discord::commands::{Context, Error};
use poise::serenity_prelude as serenity;

/// The three standings the gate compares, captured from the cache in one go.
pub struct GateSnapshot {
    pub actor: RoleStanding,
    pub target: RoleStanding,
    pub bot_top_role: u16,
}

/// Capture actor, target and bot standings from the guild cache.
/// Returns `None` outside a guild or when the guild is not cached.
pub fn snapshot(ctx: Context<'_>, target: &serenity::Member) -> Option<GateSnapshot> {
    let guild = ctx.guild()?;
    let author_id = ctx.author().id;
    let bot_id = ctx.framework().bot_id;

    let position = |id: serenity::UserId| {
        guild
            .members
            .get(&id)
            .and_then(|m| guild.member_highest_role(m))
            .map(|r| r.position)
            .unwrap_or(0)
    };

    let actor = RoleStanding::new(guild.owner_id == author_id, position(author_id));
    let target_standing = RoleStanding::new(
        guild.owner_id == target.user.id,
        guild
            .member_highest_role(target)
            .map(|r| r.position)
            .unwrap_or(0),
    );

    Some(GateSnapshot {
        actor,
        target: target_standing,
        bot_top_role: position(bot_id),
    })
}

/// Run the hierarchy gate for one target and report rejections in chat.
/// Returns `Ok(true)` when the action may proceed.
pub async fn gate(
    ctx: Context<'_>,
    target: &serenity::Member,
    action: ModAction,
) -> Result<bool, Error> {
    let Some(snap) = snapshot(ctx, target) else {
        return Ok(false);
    };

    match check_hierarchy(snap.actor, snap.target, snap.bot_top_role) {
        HierarchyVerdict::Allowed => Ok(true),
        HierarchyVerdict::TargetIsOwner => {
            ctx.say(format!("Cannot {} the owner", action.verb())).await?;
            Ok(false)
        }
        HierarchyVerdict::ActorOutranked => {
            ctx.say(format!(
                "Cannot {} **{}**, check your role position",
                action.verb(),
                target.user.tag()
            ))
            .await?;
            Ok(false)
        }
        HierarchyVerdict::BotOutranked => {
            ctx.say(format!(
                "Cannot {} **{}**, check my role position",
                action.verb(),
                target.user.tag()
            ))
            .await?;
            Ok(false)
        }
    }
}

/// Find the guild's mute role: the stored one if it still exists, else a
/// role named "muted", else a freshly created "Muted" role. Whatever is
/// found gets written back to settings so the next call is a cheap read.
pub async fn resolve_mute_role(
    ctx: Context<'_>,
    guild_id: serenity::GuildId,
) -> Result<serenity::RoleId, Error> {
    let data = ctx.data();

    if let Some(stored) = data.settings.mute_role(guild_id.get()).await? {
        let role_id = serenity::RoleId::new(stored);
        let still_exists = ctx
            .guild()
            .map(|g| g.roles.contains_key(&role_id))
            .unwrap_or(false);
        if still_exists {
            return Ok(role_id);
        }
    }

    let named = ctx.guild().and_then(|g| {
        g.roles
            .values()
            .find(|r| r.name.to_lowercase() == "muted")
            .map(|r| r.id)
    });

    let role_id = match named {
        Some(id) => id,
        None => {
            let role = guild_id
                .create_role(
                    ctx.http(),
                    serenity::EditRole::new()
                        .name("Muted")
                        .audit_log_reason("Bot Muted Role"),
                )
                .await?;
            role.id
        }
    };

    data.settings
        .set_mute_role(guild_id.get(), role_id.get())
        .await?;
    Ok(role_id)
}
