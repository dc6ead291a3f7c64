//! Button presses: answers Discord, then hands the custom id to the router.
//!
//! Discord wants an answer within three seconds, while routing may take
//! several database round trips and message edits. The press is acknowledged
//! first; notices go out afterwards as ephemeral follow-ups.

use crate::bot::{actor_of, messenger::to_db_id};
use crate::core::context::AppContext;
use crate::core::panel::MessageRef;
use crate::core::router::{self, Outcome};
use crate::errors::Result;
use poise::serenity_prelude as serenity;
use serenity::{CreateInteractionResponse, CreateInteractionResponseFollowup};

const FAILED: &str = "⚠️ Something went wrong, please try again later.";

/// Text to show the presser once routing is done, if any.
fn notice(outcome: &Result<Outcome>) -> Option<String> {
    match outcome {
        Ok(Outcome::Ignored | Outcome::Acknowledged) => None,
        Ok(Outcome::Alert(text)) => Some(text.clone()),
        Err(_) => Some(FAILED.to_string()),
    }
}

/// Acknowledges one component interaction, routes it and sends any notice.
///
/// Router failures are logged and shown to the presser only; they never
/// reach the framework's error handler.
pub async fn handle_component(
    ctx: &serenity::Context,
    component: &serenity::ComponentInteraction,
    app: &AppContext,
) -> Result<()> {
    component
        .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
        .await?;

    let actor = actor_of(&component.user);
    let origin = MessageRef {
        channel_id: to_db_id(component.channel_id.get()),
        message_id: to_db_id(component.message.id.get()),
    };

    let outcome = router::route(app, &actor, origin, &component.data.custom_id).await;
    if let Err(e) = &outcome {
        tracing::error!(
            "Button {:?} pressed by {} failed: {e}",
            component.data.custom_id,
            actor.external_id
        );
    }

    if let Some(text) = notice(&outcome) {
        component
            .create_followup(
                &ctx.http,
                CreateInteractionResponseFollowup::new()
                    .content(text)
                    .ephemeral(true),
            )
            .await?;
    }
    Ok(())
}
