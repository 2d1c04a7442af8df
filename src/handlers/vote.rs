use crate::handlers::{log_failure, refresh_custom_id, user_message, vote_custom_id, within};
use crate::models::{Poll, PollWithResults};
use crate::state::AppState;
use serenity::builder::{CreateComponents, CreateEmbed};
use serenity::model::application::component::ButtonStyle;
use serenity::model::application::interaction::{
    message_component::MessageComponentInteraction, InteractionResponseType,
};
use serenity::prelude::*;
use log::{info, warn};

const BAR_CELLS: usize = 10;
const BUTTONS_PER_ROW: usize = 5;
// One of Discord's five rows is kept for the refresh button
const MAX_VOTE_BUTTONS: usize = 4 * BUTTONS_PER_ROW;
const MAX_LABEL_CHARS: usize = 80;
const MAX_OPTION_CHARS: usize = 100;
pub const MAX_DESCRIPTION_CHARS: usize = 4096;

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

pub fn bar(percentage: u8) -> String {
    let filled = ((percentage.min(100) as usize) + 5) / 10;
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_CELLS - filled))
}

/// One line per option in poll order. Leaders are bolded once anyone has
/// voted. Option names are shortened so the text always fits an embed
/// description.
pub fn render_results(read: &PollWithResults) -> String {
    let leaders: Vec<u32> = read.tally.leaders().iter().map(|r| r.id).collect();

    let lines = read
        .tally
        .results
        .iter()
        .map(|result| {
            let text = truncate(&result.text, MAX_OPTION_CHARS);
            let name = if leaders.contains(&result.id) {
                format!("**{}**", text)
            } else {
                text
            };
            let noun = if result.votes == 1 { "vote" } else { "votes" };
            format!(
                "{}\n`{}` {} {} ({}%)",
                name,
                bar(result.percentage),
                result.votes,
                noun,
                result.percentage
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    truncate(&lines, MAX_DESCRIPTION_CHARS)
}

pub fn created_field(poll: &Poll) -> String {
    format!("<t:{}:R>", poll.created_at.timestamp())
}

pub fn results_embed<'a>(embed: &'a mut CreateEmbed, read: &PollWithResults) -> &'a mut CreateEmbed {
    let voters = if read.tally.total_votes == 1 { "voter" } else { "voters" };
    embed
        .title(truncate(&read.poll.question, 256))
        .description(render_results(read))
        .field("Poll ID", &read.poll.id, true)
        .field("Created", created_field(&read.poll), true)
        .footer(|f| {
            f.text(format!(
                "{} {} · press Refresh for the latest count",
                read.tally.total_votes, voters
            ))
        })
}

pub fn poll_components<'a>(components: &'a mut CreateComponents, poll: &Poll) -> &'a mut CreateComponents {
    if poll.options.len() > MAX_VOTE_BUTTONS {
        warn!(
            "Poll {} has {} options, only the first {} get buttons",
            poll.id,
            poll.options.len(),
            MAX_VOTE_BUTTONS
        );
    }

    let shown = &poll.options[..poll.options.len().min(MAX_VOTE_BUTTONS)];
    for chunk in shown.chunks(BUTTONS_PER_ROW) {
        components.create_action_row(|row| {
            for option in chunk {
                row.create_button(|btn| {
                    btn.custom_id(vote_custom_id(&poll.id, option.id))
                        .label(truncate(&option.text, MAX_LABEL_CHARS))
                        .style(ButtonStyle::Primary)
                });
            }
            row
        });
    }

    components.create_action_row(|row| {
        row.create_button(|btn| {
            btn.custom_id(refresh_custom_id(&poll.id))
                .label("Refresh")
                .style(ButtonStyle::Secondary)
        })
    })
}

async fn respond_ephemeral(
    ctx: &Context,
    component: &MessageComponentInteraction,
    content: &str,
) -> Result<(), SerenityError> {
    component
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content(content).ephemeral(true))
        })
        .await
}

async fn update_results(
    ctx: &Context,
    component: &MessageComponentInteraction,
    read: &PollWithResults,
) -> Result<(), SerenityError> {
    component
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::UpdateMessage)
                .interaction_response_data(|message| {
                    message
                        .embed(|e| results_embed(e, read))
                        .components(|c| poll_components(c, &read.poll))
                })
        })
        .await
}

pub async fn handle_vote(
    state: &AppState,
    ctx: &Context,
    component: &MessageComponentInteraction,
    poll_id: &str,
    option_id: u32,
) -> Result<(), SerenityError> {
    let recorded = match within(
        state.store_timeout,
        state.service.cast_vote(poll_id, &component.user, Some(option_id)),
    )
    .await
    {
        Ok(recorded) => recorded,
        Err(e) => {
            log_failure("vote", poll_id, &e);
            return respond_ephemeral(ctx, component, &user_message(&e)).await;
        }
    };

    // Re-read so the message shows the tally including this vote when the
    // store already serves it
    match within(state.store_timeout, state.service.get_poll_with_results(poll_id)).await {
        Ok(read) => {
            update_results(ctx, component, &read).await?;
            let choice = read
                .poll
                .option(recorded.vote.option_id)
                .map(|o| truncate(&o.text, MAX_OPTION_CHARS))
                .unwrap_or_default();
            component
                .create_followup_message(&ctx.http, |followup| {
                    followup
                        .content(format!("{}: **{}**", recorded.message, choice))
                        .ephemeral(true)
                })
                .await?;
        }
        Err(e) => {
            // The vote stands even if the refresh failed
            log_failure("results after vote", poll_id, &e);
            respond_ephemeral(ctx, component, &recorded.message).await?;
        }
    }

    info!("Handled vote from {} in poll {}", recorded.vote.user_id, poll_id);
    Ok(())
}

pub async fn handle_refresh(
    state: &AppState,
    ctx: &Context,
    component: &MessageComponentInteraction,
    poll_id: &str,
) -> Result<(), SerenityError> {
    match within(state.store_timeout, state.service.get_poll_with_results(poll_id)).await {
        Ok(read) => update_results(ctx, component, &read).await,
        Err(e) => {
            log_failure("refresh", poll_id, &e);
            respond_ephemeral(ctx, component, &user_message(&e)).await
        }
    }
}
