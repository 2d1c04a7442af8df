pub mod vote;

use std::future::Future;
use std::time::Duration;

use crate::error::PollError;
use crate::state::AppState;
use serenity::model::application::interaction::message_component::MessageComponentInteraction;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::prelude::*;
use log::{error, info, warn};

/// Button actions, encoded in the component custom_id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentAction {
    // vote_<poll_id>_<option_id>
    Vote { poll_id: String, option_id: u32 },
    // refresh_<poll_id>
    Refresh { poll_id: String },
}

pub fn vote_custom_id(poll_id: &str, option_id: u32) -> String {
    format!("vote_{}_{}", poll_id, option_id)
}

pub fn refresh_custom_id(poll_id: &str) -> String {
    format!("refresh_{}", poll_id)
}

// Poll ids are UUIDs, so they never contain '_'
pub fn parse_custom_id(custom_id: &str) -> Option<ComponentAction> {
    let parts: Vec<&str> = custom_id.split('_').collect();
    match parts.as_slice() {
        ["vote", poll_id, option_id] if !poll_id.is_empty() => Some(ComponentAction::Vote {
            poll_id: poll_id.to_string(),
            option_id: option_id.parse().ok()?,
        }),
        ["refresh", poll_id] if !poll_id.is_empty() => Some(ComponentAction::Refresh {
            poll_id: poll_id.to_string(),
        }),
        _ => None,
    }
}

/// Runs a core call under the caller-side timeout. Expiry is reported as an
/// unavailable store; the call is not retried.
pub async fn within<T, F>(limit: Duration, call: F) -> Result<T, PollError>
where
    F: Future<Output = Result<T, PollError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(PollError::StoreUnavailable(
            format!("no response from store within {}s", limit.as_secs()).into(),
        )),
    }
}

/// Text shown to the user for a failed operation.
pub fn user_message(err: &PollError) -> String {
    match err {
        PollError::Validation(message) => message.clone(),
        PollError::NotFound(_) => "Poll not found.".to_string(),
        PollError::StoreUnavailable(_) => {
            "Polls are temporarily unavailable, please try again shortly.".to_string()
        }
        PollError::Internal(_) => "Something went wrong on our side.".to_string(),
    }
}

// Input problems are expected, everything else is worth a louder log line
pub fn log_failure(action: &str, poll_id: &str, err: &PollError) {
    match err {
        PollError::Validation(_) | PollError::NotFound(_) => {
            info!("Rejected {} for poll '{}': {}", action, poll_id, err)
        }
        PollError::StoreUnavailable(_) => warn!("{} failed for poll '{}': {}", action, poll_id, err),
        PollError::Internal(_) => error!("{} failed for poll '{}': {:?}", action, poll_id, err),
    }
}

pub async fn handle_component(
    state: &AppState,
    ctx: &Context,
    component: &MessageComponentInteraction,
) -> Result<(), SerenityError> {
    let custom_id = &component.data.custom_id;
    info!("Received component interaction: {}", custom_id);

    match parse_custom_id(custom_id) {
        Some(ComponentAction::Vote { poll_id, option_id }) => {
            vote::handle_vote(state, ctx, component, &poll_id, option_id).await
        }
        Some(ComponentAction::Refresh { poll_id }) => {
            vote::handle_refresh(state, ctx, component, &poll_id).await
        }
        None => {
            warn!("Unhandled component custom_id: {}", custom_id);
            component
                .create_interaction_response(&ctx.http, |response| {
                    response
                        .kind(InteractionResponseType::ChannelMessageWithSource)
                        .interaction_response_data(|message| {
                            message.content("Unknown button action.").ephemeral(true)
                        })
                })
                .await
        }
    }
}

pub async fn handle_interaction(state: &AppState, ctx: &Context, interaction: Interaction) {
    let result = match interaction {
        Interaction::ApplicationCommand(command) => {
            crate::commands::handle_command(state, ctx, &command).await
        }
        Interaction::MessageComponent(component) => handle_component(state, ctx, &component).await,
        _ => {
            warn!("Unhandled interaction type: {:?}", interaction.kind());
            Ok(())
        }
    };

    if let Err(why) = result {
        error!("Interaction handler error: {:?}", why);
    }
}
