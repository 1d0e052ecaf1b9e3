// Button-driven embed pager with a 60 second idle timeout.
//
// Custom ids are prefixed with the invocation id so two concurrent
// pagers in the same channel never steal each other's presses.

use crate::discord::commands::Context;
use poise::serenity_prelude as serenity;
use std::time::Duration;

const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Show `pages` one at a time with previous/stop/next buttons.
/// Previous and next wrap around; the buttons are removed once the pager
/// stops or times out.
pub async fn paginate(
    ctx: Context<'_>,
    pages: Vec<serenity::CreateEmbed>,
) -> Result<(), serenity::Error> {
    let Some(first) = pages.first() else {
        return Ok(());
    };

    let ctx_id = ctx.id();
    let prev_id = format!("{ctx_id}prev");
    let stop_id = format!("{ctx_id}stop");
    let next_id = format!("{ctx_id}next");

    let buttons = serenity::CreateActionRow::Buttons(vec![
        serenity::CreateButton::new(&prev_id).emoji('⬅'),
        serenity::CreateButton::new(&stop_id).emoji('⏹'),
        serenity::CreateButton::new(&next_id).emoji('➡'),
    ]);

    let reply = poise::CreateReply::default()
        .embed(first.clone())
        .components(vec![buttons]);
    let handle = ctx.send(reply).await?;

    let mut page = 0usize;
    while let Some(press) = serenity::ComponentInteractionCollector::new(ctx)
        .filter(move |press| press.data.custom_id.starts_with(&ctx_id.to_string()))
        .timeout(IDLE_TIMEOUT)
        .await
    {
        if press.data.custom_id == next_id {
            page = (page + 1) % pages.len();
        } else if press.data.custom_id == prev_id {
            page = page.checked_sub(1).unwrap_or(pages.len() - 1);
        } else if press.data.custom_id == stop_id {
            press
                .create_response(
                    ctx.serenity_context(),
                    serenity::CreateInteractionResponse::Acknowledge,
                )
                .await?;
            break;
        } else {
            continue;
        }

        press
            .create_response(
                ctx.serenity_context(),
                serenity::CreateInteractionResponse::UpdateMessage(
                    serenity::CreateInteractionResponseMessage::new()
                        .embed(pages[page].clone()),
                ),
            )
            .await?;
    }

    // Strip the buttons so a dead pager doesn't look interactive.
    handle
        .edit(
            ctx,
            poise::CreateReply::default()
                .embed(pages[page].clone())
                .components(Vec::new()),
        )
        .await?;
    Ok(())
}
