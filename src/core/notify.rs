//! Notification content: AI-generated when possible, canned otherwise.

use super::intent::{Intent, UserCommand};
use super::panel::{Button, Panel};
use crate::ai::ContentGenerator;
use crate::entities::{chat, event};

/// Birthday greeting for the group and the person.
pub async fn greeting_panel(ai: &dyn ContentGenerator, name: &str) -> Panel {
    let prompt = format!(
        "Write a short, warm birthday greeting for {name} on behalf of their colleagues. \
         Two or three sentences, no hashtags."
    );
    let text = match ai.generate_text(&prompt).await {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("Greeting text fallback for {name}: {e}");
            format!("Happy birthday, {name}! Wishing you a wonderful year ahead from all of us.")
        }
    };
    let image = illustration(ai, &format!("A festive birthday card for {name}, cake and balloons")).await;

    Panel::text(text)
        .with_image(image)
        .button(Button::token("Close", Intent::Dismiss))
}

/// Contribution request for one participant. Always ends with the card number.
pub async fn ask_panel(
    ai: &dyn ContentGenerator,
    event: &event::Model,
    chat: &chat::Model,
    days_left: u32,
) -> Panel {
    let prompt = format!(
        "Write a short friendly message asking a colleague to chip in {} for a birthday gift \
         for {}. The birthday is in {days_left} days. Do not include payment details.",
        event.amount, event.label
    );
    let body = match ai.generate_text(&prompt).await {
        Ok(text) => text,
        Err(e) => {
            tracing::debug!("Request text fallback for event {}: {e}", event.id);
            format!(
                "{} celebrates a birthday in {days_left} day(s)! We are collecting {} per person for a gift.",
                event.label, event.amount
            )
        }
    };
    let image = illustration(ai, &format!("A gift box with a bow for {}", event.label)).await;

    Panel::text(format!("{body}\n\nCard: {}", chat.card_number))
        .with_image(image)
        .row(vec![
            Button::token("My contributions", Intent::User(UserCommand::MyContributions)),
            Button::token("Close", Intent::Dismiss),
        ])
}

async fn illustration(ai: &dyn ContentGenerator, prompt: &str) -> Option<String> {
    match ai.generate_image(prompt).await {
        Ok(url) => Some(url),
        Err(e) => {
            tracing::debug!("No illustration: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ScriptedAi, date};

    fn sample() -> (event::Model, chat::Model) {
        let now = chrono::NaiveDateTime::default();
        (
            event::Model {
                id: 1,
                user_id: Some(1),
                chat_id: 1,
                label: "Ann +380501".to_string(),
                date_event: date(2026, 3, 15),
                amount: 500,
                status: true,
                created_at: now,
            },
            chat::Model {
                id: 1,
                external_id: 100,
                owner_id: 1,
                card_number: "4000 1234".to_string(),
                status: true,
                created_at: now,
            },
        )
    }

    #[tokio::test]
    async fn test_ask_falls_back_and_keeps_card() {
        let (event, chat) = sample();
        let panel = ask_panel(&ScriptedAi::failing(), &event, &chat, 5).await;

        assert!(panel.text.contains("Ann +380501"));
        assert!(panel.text.ends_with("Card: 4000 1234"));
        assert!(panel.image_url.is_none());
    }

    #[tokio::test]
    async fn test_ask_uses_ai_text() {
        let (event, chat) = sample();
        let ai = ScriptedAi::answering("Chip in please", "https://img/gift.png");
        let panel = ask_panel(&ai, &event, &chat, 5).await;

        assert_eq!(panel.text, "Chip in please\n\nCard: 4000 1234");
        assert_eq!(panel.image_url.as_deref(), Some("https://img/gift.png"));
    }

    #[tokio::test]
    async fn test_greeting_fallback() {
        let panel = greeting_panel(&ScriptedAi::failing(), "Ann").await;
        assert!(panel.text.starts_with("Happy birthday, Ann!"));
    }
}
