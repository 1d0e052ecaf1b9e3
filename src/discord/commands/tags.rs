// Tag commands.
//
// Validation and the use counter live in the core service; this layer
// handles Discord quirks: the mention ban on tag bodies, DM-first page
// delivery for long listings, and the button-driven search pager.

use crate::core::tags::build_pages;
use crate::discord::commands::{Context, Error, BOT_COLOUR};
use crate::discord::menus;
use poise::serenity_prelude as serenity;

/// Names shown per page of search results.
const SEARCH_PAGE_SIZE: usize = 15;

/// Look up a tag by name and post its content, counting the use.
/// A miss is reported inline; the unknown-command fallback in `main.rs`
/// goes through the service directly and stays silent instead.
async fn send_tag(ctx: Context<'_>, name: &str) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    match ctx.data().tags.lookup(guild_id.get(), name).await? {
        Some(content) => {
            ctx.say(content).await?;
        }
        None => {
            ctx.say(format!("Tag **{}** doesn't exist", name.to_lowercase()))
                .await?;
        }
    }
    Ok(())
}

/// Tag bodies may not ping anyone. The service defuses @everyone/@here,
/// but explicit user and role mentions are rejected outright.
async fn block_mentions(ctx: Context<'_>) -> Result<bool, Error> {
    if let poise::Context::Prefix(prefix_ctx) = ctx {
        if !prefix_ctx.msg.mentions.is_empty() || !prefix_ctx.msg.mention_roles.is_empty() {
            ctx.say("Tags can't include mentions").await?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Send name pages to the author's DMs, falling back to the channel once
/// DMs turn out to be closed. Every page is delivered either way.
async fn deliver_pages(ctx: Context<'_>, names: &[String]) -> Result<(), Error> {
    let pages = build_pages(names);
    let mut dm_open = true;
    for page in &pages {
        if dm_open {
            match ctx
                .author()
                .direct_message(ctx, serenity::CreateMessage::new().content(page.clone()))
                .await
            {
                Ok(_) => continue,
                Err(_) => dm_open = false,
            }
        }
        ctx.say(page.clone()).await?;
    }
    Ok(())
}

// ============================================================================
// THE TAG GROUP
// ============================================================================

/// Look for a tag
#[poise::command(
    prefix_command,
    guild_only,
    subcommands(
        "tag_get",
        "tag_create",
        "tag_edit",
        "tag_append",
        "tag_delete",
        "tag_info",
        "tag_list",
        "tag_mine",
        "tag_random",
        "tag_search"
    ),
    required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS"
)]
pub async fn tag(ctx: Context<'_>, name: String) -> Result<(), Error> {
    send_tag(ctx, &name).await
}

/// Get a tag
#[poise::command(
    prefix_command,
    rename = "get",
    hide_in_help,
    guild_only,
    required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS"
)]
pub async fn tag_get(ctx: Context<'_>, name: String) -> Result<(), Error> {
    send_tag(ctx, &name).await
}

/// Create a tag
#[poise::command(
    prefix_command,
    rename = "create",
    aliases("add", "+"),
    guild_only,
    required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS"
)]
pub async fn tag_create(
    ctx: Context<'_>,
    name: String,
    #[rest] content: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    if block_mentions(ctx).await? {
        return Ok(());
    }
    let created = ctx
        .data()
        .tags
        .create(guild_id.get(), ctx.author().id.get(), &name, &content)
        .await?;
    ctx.say(format!("Created tag **{created}**")).await?;
    Ok(())
}

/// Edit a tag
#[poise::command(
    prefix_command,
    rename = "edit",
    aliases("update"),
    guild_only,
    required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS"
)]
pub async fn tag_edit(
    ctx: Context<'_>,
    name: String,
    #[rest] content: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    if block_mentions(ctx).await? {
        return Ok(());
    }
    ctx.data().tags.edit(guild_id.get(), &name, &content).await?;
    ctx.say(format!("Edited tag **{name}**")).await?;
    Ok(())
}

/// Add something to an existing tag. A newline will be inserted.
#[poise::command(
    prefix_command,
    rename = "append",
    aliases("+="),
    guild_only,
    required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS"
)]
pub async fn tag_append(
    ctx: Context<'_>,
    name: String,
    #[rest] content: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    if block_mentions(ctx).await? {
        return Ok(());
    }
    ctx.data()
        .tags
        .append(guild_id.get(), &name, &content)
        .await?;
    ctx.say(format!("Appended tag **{name}**")).await?;
    Ok(())
}

/// Delete a tag
#[poise::command(
    prefix_command,
    rename = "delete",
    aliases("-", "remove", "del"),
    guild_only,
    required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS"
)]
pub async fn tag_delete(ctx: Context<'_>, #[rest] name: String) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    ctx.data().tags.delete(guild_id.get(), &name).await?;
    ctx.say(format!("Deleted tag **{name}**")).await?;
    Ok(())
}

/// Displays information about a tag
#[poise::command(
    prefix_command,
    rename = "info",
    guild_only,
    required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS"
)]
pub async fn tag_info(ctx: Context<'_>, name: String) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let info = ctx.data().tags.info(guild_id.get(), &name).await?;

    let embed = serenity::CreateEmbed::new()
        .colour(BOT_COLOUR)
        .title(info.tag.name.clone())
        .field("Owner", format!("<@{}>", info.tag.author_id), false)
        .field("Uses", info.tag.uses.to_string(), false)
        .field("Rank", info.rank.to_string(), false)
        .footer(serenity::CreateEmbedFooter::new(format!(
            "Tag created on {}",
            info.tag.created_at.format("%d %b %Y %H:%M")
        )));
    ctx.send(poise::CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Shows you the names of all tags
#[poise::command(
    prefix_command,
    rename = "list",
    guild_only,
    required_bot_permissions = "SEND_MESSAGES"
)]
pub async fn tag_list(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let names = ctx.data().tags.list(guild_id.get()).await?;
    if names.is_empty() {
        ctx.say("This server has created no tags").await?;
        return Ok(());
    }
    deliver_pages(ctx, &names).await
}

/// Shows all tags a member has created
#[poise::command(
    prefix_command,
    rename = "mine",
    guild_only,
    required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS"
)]
pub async fn tag_mine(ctx: Context<'_>, user: Option<serenity::Member>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let author_id = user
        .map(|m| m.user.id.get())
        .unwrap_or_else(|| ctx.author().id.get());
    let names = ctx.data().tags.mine(guild_id.get(), author_id).await?;
    if names.is_empty() {
        ctx.say("This user has created no tags").await?;
        return Ok(());
    }
    deliver_pages(ctx, &names).await
}

/// Show a random tag
#[poise::command(
    prefix_command,
    rename = "random",
    guild_only,
    required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS"
)]
pub async fn tag_random(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    // The reply is the tag's name, not its content, and the pick still
    // counts as a use.
    match ctx.data().tags.random(guild_id.get()).await? {
        Some(name) => ctx.say(name).await?,
        None => ctx.say("This server has created no tags").await?,
    };
    Ok(())
}

/// Search for a tag
#[poise::command(
    prefix_command,
    rename = "search",
    guild_only,
    required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS | ADD_REACTIONS"
)]
pub async fn tag_search(ctx: Context<'_>, #[rest] query: String) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let results = ctx.data().tags.search(guild_id.get(), &query).await?;
    if results.is_empty() {
        ctx.say("No tags found").await?;
        return Ok(());
    }

    let pages: Vec<serenity::CreateEmbed> = results
        .chunks(SEARCH_PAGE_SIZE)
        .map(|chunk| {
            let mut author = serenity::CreateEmbedAuthor::new(ctx.author().display_name());
            if let Some(avatar) = ctx.author().avatar_url() {
                author = author.icon_url(avatar);
            }
            serenity::CreateEmbed::new()
                .colour(BOT_COLOUR)
                .title("Search Results:")
                .author(author)
                .description(chunk.join("\n"))
                .footer(serenity::CreateEmbedFooter::new(format!(
                    "{} results",
                    results.len()
                )))
        })
        .collect();
    menus::paginate(ctx, pages).await?;
    Ok(())
}

// ============================================================================
// TOP-LEVEL LISTING
// ============================================================================

/// Shows you the names of all tags
#[poise::command(
    prefix_command,
    aliases("taglist"),
    guild_only,
    required_bot_permissions = "SEND_MESSAGES"
)]
pub async fn tags(ctx: Context<'_>) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let names = ctx.data().tags.list(guild_id.get()).await?;
    if names.is_empty() {
        ctx.say("This server has created no tags").await?;
        return Ok(());
    }
    deliver_pages(ctx, &names).await
}
