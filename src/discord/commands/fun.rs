// Fun commands. No persistence, no hierarchy, just replies.

use crate::discord::commands::{BotError, Context, Error, BOT_COLOUR};
use poise::serenity_prelude as serenity;
use rand::seq::SliceRandom;
use rand::Rng;

/// Upper bound on coins per `flip` call.
const MAX_FLIPS: u8 = 10;

/// Longest text the clyde image renderer accepts.
const MAX_CLYDE_LEN: usize = 90;

const EIGHTBALL_RESPONSES: [&str; 20] = [
    "It is certain.",
    "It is decidedly so.",
    "Without a doubt.",
    "Yes – definitely.",
    "You may rely on it.",
    "As I see it, yes.",
    "Most likely.",
    "Outlook good.",
    "Yes.",
    "Signs point to yes.",
    "Reply hazy, try again.",
    "Ask again later.",
    "Better not tell you now.",
    "Cannot predict now.",
    "Concentrate and ask again.",
    "Don't count on it.",
    "My reply is no.",
    "My sources say no.",
    "Outlook not so good.",
    "Very doubtful.",
];

/// Ask the magic 8 ball a question
#[poise::command(
    prefix_command,
    aliases("8ball", "magic8ball", "magicball"),
    required_bot_permissions = "SEND_MESSAGES"
)]
pub async fn eightball(ctx: Context<'_>, #[rest] _question: String) -> Result<(), Error> {
    let response = {
        let mut rng = rand::thread_rng();
        EIGHTBALL_RESPONSES
            .choose(&mut rng)
            .copied()
            .unwrap_or("Ask again later.")
    };
    ctx.reply(format!("🎱 {response}")).await?;
    Ok(())
}

/// Choose from given options, separated by "or"
#[poise::command(prefix_command, required_bot_permissions = "SEND_MESSAGES")]
pub async fn choose(ctx: Context<'_>, #[rest] choices: String) -> Result<(), Error> {
    let options: Vec<&str> = choices.split(" or ").collect();
    if options.len() < 2 {
        ctx.reply("Give me at least 2 options to choose from (separate choices with **or**)")
            .await?;
        return Ok(());
    }
    let choice = {
        let mut rng = rand::thread_rng();
        options.choose(&mut rng).copied().unwrap_or_default().trim().to_string()
    };
    ctx.reply(format!("I choose **{choice}**")).await?;
    Ok(())
}

/// Flip a coin
#[poise::command(prefix_command, required_bot_permissions = "SEND_MESSAGES")]
pub async fn flip(ctx: Context<'_>, coins: Option<u8>) -> Result<(), Error> {
    let coins = coins.unwrap_or(1);
    if coins > MAX_FLIPS {
        ctx.reply(format!("Max amount of flips is {MAX_FLIPS}")).await?;
        return Ok(());
    }
    if coins < 1 {
        ctx.reply("Min amount of flips is 1").await?;
        return Ok(());
    }
    let answers = {
        let mut rng = rand::thread_rng();
        (0..coins)
            .map(|_| if rng.gen_bool(0.5) { "Heads!" } else { "Tails!" })
            .collect::<Vec<_>>()
            .join("\n")
    };
    ctx.reply(answers).await?;
    Ok(())
}

/// Makes the bot say something in the specified channel
#[poise::command(
    prefix_command,
    guild_only,
    required_bot_permissions = "SEND_MESSAGES | ADD_REACTIONS"
)]
pub async fn echo(
    ctx: Context<'_>,
    destination: serenity::GuildChannel,
    #[rest] msg: String,
) -> Result<(), Error> {
    // Both the author and the bot must be able to speak in the target
    // channel, otherwise this becomes a permission bypass.
    let allowed = {
        let Some(guild) = ctx.guild() else {
            return Ok(());
        };
        let can_send = |id: serenity::UserId| {
            guild
                .members
                .get(&id)
                .map(|m| guild.user_permissions_in(&destination, m).send_messages())
                .unwrap_or(false)
        };
        can_send(ctx.author().id) && can_send(ctx.framework().bot_id)
    };

    if !allowed {
        if let poise::Context::Prefix(prefix_ctx) = ctx {
            prefix_ctx.msg.react(ctx, '⛔').await?;
        }
        return Ok(());
    }

    let cleaned = msg
        .replace("@everyone", "@\u{200b}everyone")
        .replace("@here", "@\u{200b}here");
    destination.say(ctx.http(), cleaned).await?;
    if let poise::Context::Prefix(prefix_ctx) = ctx {
        prefix_ctx.msg.react(ctx, '✅').await?;
    }
    Ok(())
}

/// Make Clyde say something
#[poise::command(
    prefix_command,
    required_bot_permissions = "SEND_MESSAGES | EMBED_LINKS"
)]
pub async fn clyde(ctx: Context<'_>, #[rest] message: String) -> Result<(), Error> {
    if message.chars().count() > MAX_CLYDE_LEN {
        ctx.reply(format!(
            "Message too long, max characters is {MAX_CLYDE_LEN}"
        ))
        .await?;
        return Ok(());
    }

    let _ = ctx.channel_id().broadcast_typing(ctx.http()).await;
    let url = ctx
        .data()
        .imagegen
        .clyde(&message)
        .await
        .map_err(|e| BotError::ImageGen(e.to_string()))?;

    let embed = serenity::CreateEmbed::new().colour(BOT_COLOUR).image(url);
    ctx.send(poise::CreateReply::default().embed(embed).reply(true))
        .await?;
    Ok(())
}
