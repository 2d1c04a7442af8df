use crate::handlers::vote::{poll_components, results_embed, truncate};
use crate::handlers::{log_failure, user_message, within};
use crate::models::PollWithResults;
use crate::state::AppState;
use crate::voting::compute_results;
use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;
use serenity::model::application::interaction::application_command::{
    ApplicationCommandInteraction, CommandDataOption,
};
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::*;
use log::info;

// Discord embeds get unwieldy past this
const LIST_LIMIT: usize = 10;

pub fn create_poll_command(command: &mut CreateApplicationCommand) -> &mut CreateApplicationCommand {
    command
        .name("poll")
        .description("Create polls, vote and see results")
        .create_option(|option| {
            option
                .name("create")
                .description("Create a new poll")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("question")
                        .description("The poll question")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("options")
                        .description("Comma-separated list of options")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
        })
        .create_option(|option| {
            option
                .name("list")
                .description("List polls, newest first")
                .kind(CommandOptionType::SubCommand)
        })
        .create_option(|option| {
            option
                .name("results")
                .description("Show the current results of a poll")
                .kind(CommandOptionType::SubCommand)
                .create_sub_option(|sub_option| {
                    sub_option
                        .name("poll_id")
                        .description("ID of the poll")
                        .kind(CommandOptionType::String)
                        .required(true)
                })
        })
}

/// Splits the comma-separated option text, dropping empty entries.
pub fn parse_option_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .collect()
}

fn string_option(sub: &CommandDataOption, name: &str) -> String {
    sub.options
        .iter()
        .find(|option| option.name == name)
        .and_then(|option| option.value.as_ref())
        .and_then(|value| value.as_str())
        .unwrap_or_default()
        .to_string()
}

pub async fn handle_poll_command(
    state: &AppState,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> Result<(), SerenityError> {
    let sub = match command.data.options.first() {
        Some(option) => option,
        None => return send_error_response(ctx, command, "No subcommand provided").await,
    };

    match sub.name.as_str() {
        "create" => handle_create_poll(state, ctx, command, sub).await,
        "list" => handle_list_polls(state, ctx, command).await,
        "results" => handle_results(state, ctx, command, sub).await,
        _ => send_error_response(ctx, command, "Unknown subcommand").await,
    }
}

async fn handle_create_poll(
    state: &AppState,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    sub: &CommandDataOption,
) -> Result<(), SerenityError> {
    let question = string_option(sub, "question");
    let options = parse_option_list(&string_option(sub, "options"));

    // The core has no upper bound, this is a presentation limit
    if options.len() > state.max_poll_options {
        let message = format!(
            "A poll can have at most {} options, got {}.",
            state.max_poll_options,
            options.len()
        );
        return send_error_response(ctx, command, &message).await;
    }

    let poll = match within(state.store_timeout, state.service.create_poll(&question, options.as_slice())).await {
        Ok(poll) => poll,
        Err(e) => {
            log_failure("create", "-", &e);
            return send_error_response(ctx, command, &user_message(&e)).await;
        }
    };
    info!("User {} created poll {}", command.user.id, poll.id);

    let tally = compute_results(&poll, &[]);
    send_poll_message(ctx, command, &PollWithResults { poll, tally }).await
}

async fn handle_list_polls(
    state: &AppState,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> Result<(), SerenityError> {
    let polls = match within(state.store_timeout, state.service.list_polls()).await {
        Ok(polls) => polls,
        Err(e) => {
            log_failure("list", "-", &e);
            return send_error_response(ctx, command, &user_message(&e)).await;
        }
    };

    let description = if polls.is_empty() {
        "No polls yet. Create one with `/poll create`.".to_string()
    } else {
        polls
            .iter()
            .take(LIST_LIMIT)
            .map(|poll| {
                format!(
                    "**{}** ({} options)\n`{}` · <t:{}:R>",
                    truncate(&poll.question, 100),
                    poll.options.len(),
                    poll.id,
                    poll.created_at.timestamp()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };
    let footer = if polls.len() > LIST_LIMIT {
        format!("Showing {} of {} polls", LIST_LIMIT, polls.len())
    } else {
        format!("{} polls", polls.len())
    };

    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| {
                    message.embed(|e| {
                        e.title("Polls")
                            .description(description)
                            .footer(|f| f.text(footer))
                    })
                })
        })
        .await
}

async fn handle_results(
    state: &AppState,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    sub: &CommandDataOption,
) -> Result<(), SerenityError> {
    let poll_id = string_option(sub, "poll_id");
    let poll_id = poll_id.trim();

    match within(state.store_timeout, state.service.get_poll_with_results(poll_id)).await {
        Ok(read) => send_poll_message(ctx, command, &read).await,
        Err(e) => {
            log_failure("results", poll_id, &e);
            send_error_response(ctx, command, &user_message(&e)).await
        }
    }
}

async fn send_poll_message(
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    read: &PollWithResults,
) -> Result<(), SerenityError> {
    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| {
                    message
                        .embed(|e| results_embed(e, read))
                        .components(|c| poll_components(c, &read.poll))
                })
        })
        .await
}

async fn send_error_response(
    ctx: &Context,
    command: &ApplicationCommandInteraction,
    error_message: &str,
) -> Result<(), SerenityError> {
    command
        .create_interaction_response(&ctx.http, |response| {
            response
                .kind(InteractionResponseType::ChannelMessageWithSource)
                .interaction_response_data(|message| message.content(error_message).ephemeral(true))
        })
        .await
}
