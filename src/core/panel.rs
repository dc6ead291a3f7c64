//! Outbound panels and the messaging collaborator.
//!
//! A [`Panel`] is text, an optional image and rows of buttons, each button
//! carrying an [`Intent`]. The [`Messenger`] trait is the only way core code
//! talks to the chat platform.

use super::intent::Intent;
use crate::errors::Result;
use async_trait::async_trait;

/// One action button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Visible label
    pub label: String,
    /// Routed back through the token router when pressed
    pub intent: Intent,
}

impl Button {
    /// Button routed through the token router.
    pub fn token(label: impl Into<String>, intent: Intent) -> Self {
        Self {
            label: label.into(),
            intent,
        }
    }
}

/// A message with optional image and action buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Panel {
    /// Text or caption
    pub text: String,
    /// Image shown with the text
    pub image_url: Option<String>,
    /// Button rows, top to bottom
    pub buttons: Vec<Vec<Button>>,
}

impl Panel {
    /// Text-only panel.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Adds a row of buttons.
    #[must_use]
    pub fn row(mut self, row: Vec<Button>) -> Self {
        if !row.is_empty() {
            self.buttons.push(row);
        }
        self
    }

    /// Adds a single-button row.
    #[must_use]
    pub fn button(self, button: Button) -> Self {
        self.row(vec![button])
    }

    /// Attaches an image.
    #[must_use]
    pub fn with_image(mut self, url: Option<String>) -> Self {
        self.image_url = url;
        self
    }

    /// Every intent on the panel, in display order.
    pub fn intents(&self) -> Vec<Intent> {
        self.buttons
            .iter()
            .flatten()
            .map(|button| button.intent)
            .collect()
    }
}

/// Where to send a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recipient {
    /// Direct message to a user, by platform user id
    User(i64),
    /// A channel, by platform channel id
    Channel(i64),
}

/// A sent message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    /// Channel holding the message
    pub channel_id: i64,
    /// Message id
    pub message_id: i64,
}

/// Messaging collaborator.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Sends a new panel.
    async fn send_panel(&self, to: Recipient, panel: &Panel) -> Result<MessageRef>;

    /// Replaces the content of an existing panel.
    async fn edit_panel(&self, at: MessageRef, panel: &Panel) -> Result<()>;

    /// Deletes a message.
    async fn delete_message(&self, at: MessageRef) -> Result<()>;

    /// Whether a user can currently see a channel.
    async fn is_member(&self, channel_id: i64, user_id: i64) -> Result<bool>;

    /// Display title of a channel.
    async fn chat_title(&self, channel_id: i64) -> Result<String>;
}

/// Shows `panel` in place of `origin`.
///
/// When the edit fails (message gone, content unchanged) a new panel is sent
/// to the same channel and the old message is deleted.
pub async fn present(messenger: &dyn Messenger, origin: MessageRef, panel: &Panel) -> Result<()> {
    if let Err(e) = messenger.edit_panel(origin, panel).await {
        tracing::debug!("Editing message {} failed ({e}), sending a new panel", origin.message_id);
        messenger
            .send_panel(Recipient::Channel(origin.channel_id), panel)
            .await?;
        if let Err(e) = messenger.delete_message(origin).await {
            tracing::debug!("Deleting stale message {} failed: {e}", origin.message_id);
        }
    }
    Ok(())
}

/// Title of a chat, or a placeholder when the platform cannot tell.
pub async fn chat_title_or_fallback(messenger: &dyn Messenger, channel_id: i64) -> String {
    match messenger.chat_title(channel_id).await {
        Ok(title) => title,
        Err(e) => {
            tracing::warn!("Could not resolve title of channel {channel_id}: {e}");
            format!("Chat #{channel_id}")
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{MessengerCall, RecordingMessenger};

    fn origin() -> MessageRef {
        MessageRef {
            channel_id: 5,
            message_id: 50,
        }
    }

    #[tokio::test]
    async fn test_present_edits_in_place() {
        let messenger = RecordingMessenger::new();
        present(&messenger, origin(), &Panel::text("hi")).await.unwrap();

        let calls = messenger.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(calls[0], MessengerCall::Edit { .. }));
    }

    #[tokio::test]
    async fn test_present_falls_back_to_send_and_delete() {
        let messenger = RecordingMessenger::new();
        messenger.fail_edits(true);
        present(&messenger, origin(), &Panel::text("hi")).await.unwrap();

        assert_eq!(messenger.sent_to(Recipient::Channel(5)).len(), 1);
        assert_eq!(messenger.deleted(), vec![origin()]);
    }

    #[test]
    fn test_empty_rows_are_skipped() {
        let panel = Panel::text("x")
            .row(vec![])
            .button(Button::token("Close", Intent::Dismiss));
        assert_eq!(panel.buttons.len(), 1);
        assert_eq!(panel.intents(), vec![Intent::Dismiss]);
    }

    #[test]
    fn test_intents_follow_display_order() {
        let panel = Panel::text("menu")
            .row(vec![
                Button::token("Back", Intent::Back),
                Button::token("Home", Intent::Home),
            ])
            .button(Button::token("Close", Intent::Dismiss));
        assert_eq!(panel.intents(), vec![Intent::Back, Intent::Home, Intent::Dismiss]);
        assert_eq!(panel.buttons[0][1].intent, Intent::Home);
    }
}
