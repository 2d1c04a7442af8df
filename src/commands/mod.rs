pub mod poll;

use crate::state::AppState;
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::application::interaction::InteractionResponseType;
use serenity::prelude::*;
use log::info;

pub async fn handle_command(
    state: &AppState,
    ctx: &Context,
    command: &ApplicationCommandInteraction,
) -> Result<(), SerenityError> {
    info!("Received command: {}", command.data.name);
    match command.data.name.as_str() {
        "poll" => poll::handle_poll_command(state, ctx, command).await,
        _ => {
            command
                .create_interaction_response(&ctx.http, |response| {
                    response
                        .kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|message| {
                            message.content("Unknown command").ephemeral(true)
                        })
                })
                .await
        }
    }
}
