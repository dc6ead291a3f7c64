//! Bot layer - Discord-specific interface and command handlers
//!
//! This module wires the framework-agnostic core to Discord: slash commands,
//! the button-press and presence handlers, and the [`DiscordMessenger`] used
//! by the scheduler's tasks.

/// Discord command implementations (general, profile, admin)
pub mod commands;
/// Discord interaction handlers (buttons, presence, autocomplete)
pub mod handlers;
/// Discord implementation of the messaging collaborator
pub mod messenger;

pub use messenger::DiscordMessenger;

use crate::core::context::AppContext;
use crate::core::profile::Actor;
use crate::errors::{Error, Result};
use poise::serenity_prelude as serenity;
use tracing::info;

/// Shared data available to all bot commands.
pub struct BotData {
    /// Collaborators shared with the scheduler
    pub app: AppContext,
}

impl BotData {
    /// Creates a new `BotData` instance around the application context.
    #[must_use]
    pub const fn new(app: AppContext) -> Self {
        Self { app }
    }
}

/// Builds the core's view of a Discord user.
pub fn actor_of(user: &serenity::User) -> Actor {
    Actor {
        external_id: messenger::to_db_id(user.id.get()),
        first_name: user.global_name.clone().unwrap_or_else(|| user.name.clone()),
        username: Some(user.name.clone()),
    }
}

async fn on_error(error: poise::FrameworkError<'_, BotData, Error>) {
    match error {
        poise::FrameworkError::Setup { error, .. } => {
            tracing::error!("Failed to start bot: {error:?}");
        }
        poise::FrameworkError::Command { error, ctx, .. } => {
            tracing::error!("Error in command `{}`: {error:?}", ctx.command().name);
            let reply = match &error {
                Error::InvalidInput { message } => format!("❌ {message}"),
                Error::NotFound { entity, id } => format!("❌ There is no {entity} with id {id}"),
                other => format!("An error occurred: {other}"),
            };
            if let Err(e) = ctx.say(reply).await {
                tracing::error!("Failed to send error message: {e}");
            }
        }
        error => {
            if let Err(e) = poise::builtins::on_error(error).await {
                tracing::error!("Error while handling error: {e}");
            }
        }
    }
}

/// Runs the Discord client until it stops.
///
/// # Errors
/// Returns an error if the client cannot be built or the gateway connection fails.
pub async fn run_bot(token: &str, app: AppContext) -> Result<()> {
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::ping(),
                commands::help(),
                commands::start(),
                commands::phone(),
                commands::birthday(),
                commands::add_chat(),
                commands::card(),
                commands::change_admin(),
                commands::amount(),
                commands::create_event(),
                commands::schedule(),
            ],
            on_error: |error| Box::pin(on_error(error)),
            event_handler: |ctx, event, framework, data| {
                Box::pin(handlers::handle_event(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, ready, framework| {
            Box::pin(async move {
                info!("Logged in as {}", ready.user.name);
                info!("Registering commands globally...");
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                Ok(BotData::new(app))
            })
        })
        .build();

    let intents = serenity::GatewayIntents::GUILDS
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_MEMBERS
        | serenity::GatewayIntents::DIRECT_MESSAGES;

    info!("Setting up Serenity client for Poise framework...");
    let mut client = serenity::Client::builder(token, intents)
        .framework(framework)
        .await
        .inspect_err(|e| tracing::error!("Error creating client: {e:?}"))?;

    info!("Starting bot client...");
    client
        .start()
        .await
        .inspect_err(|e| tracing::error!("Client error: {e:?}"))?;
    Ok(())
}
