mod commands;
mod config;
mod db;
mod error;
mod handlers;
mod identity;
mod ledger;
mod models;
mod polls;
mod service;
mod state;
mod voting;

use config::Config;
use serenity::async_trait;
use serenity::model::application::command::Command;
use serenity::model::application::interaction::Interaction;
use serenity::model::gateway::Ready;
use serenity::prelude::*;
use state::AppState;
use std::sync::Arc;
use log::{error, info};

struct Bot {
    state: Arc<AppState>,
}

#[async_trait]
impl EventHandler for Bot {
    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let state = Arc::clone(&self.state);

        // Each interaction is independent, handle them concurrently
        tokio::spawn(async move {
            handlers::handle_interaction(&state, &ctx, interaction).await;
        });
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("{} is connected!", ready.user.name);

        let commands = Command::set_global_application_commands(&ctx.http, |commands_builder| {
            commands_builder.create_application_command(|command| commands::poll::create_poll_command(command))
        })
        .await;

        if let Err(why) = commands {
            error!("Failed to register slash commands: {:?}", why);
        } else {
            info!("Successfully registered global slash commands.");
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return;
        }
    };

    let state = match AppState::new(&config).await {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return;
        }
    };

    // Slash commands and button clicks only
    let intents = GatewayIntents::GUILDS;

    let mut client = match Client::builder(&config.discord_token, intents)
        .event_handler(Bot { state })
        .await
    {
        Ok(client) => client,
        Err(why) => {
            error!("Error creating client: {:?}", why);
            return;
        }
    };

    if let Err(why) = client.start().await {
        error!("Client error: {:?}", why);
    }
}
