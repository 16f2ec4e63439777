//! Conversion between the view's message list and the transcript the model API accepts.
//!
//! Only the reserved history-cleared notice is filtered. AI bubbles marked as errors are
//! replayed like any other AI turn.

use khmerchat_llm::{Content, Part, Role};
use khmerchat_storage::{ChatMessage, ImageAttachment, MessageId, Sender};

/// Most recent entries forwarded when seeding a session.
pub const MAX_HISTORY_ENTRIES: usize = 50;

pub fn encode_default(messages: &[ChatMessage]) -> Vec<Content> {
    encode(messages, MAX_HISTORY_ENTRIES)
}

/// Encodes `messages` into at most `max_entries` transcript entries that open with a user turn.
pub fn encode(messages: &[ChatMessage], max_entries: usize) -> Vec<Content> {
    let mut encoded = messages
        .iter()
        .filter(|message| !message.is_history_cleared_marker())
        .filter_map(encode_message)
        .collect::<Vec<_>>();

    if encoded.len() > max_entries {
        tracing::warn!(
            original_len = encoded.len(),
            max_entries,
            "transcript exceeds history cap, truncating"
        );
        encoded.drain(..encoded.len() - max_entries);
    }

    // The API rejects histories that open with a model turn.
    match encoded.iter().position(|content| content.role == Role::User) {
        Some(0) => encoded,
        Some(first_user) => {
            tracing::warn!(
                dropped = first_user,
                remaining = encoded.len() - first_user,
                "transcript did not start with a user turn, slicing to the first one"
            );
            encoded.split_off(first_user)
        }
        None => {
            if !encoded.is_empty() {
                tracing::debug!(
                    model_turns = encoded.len(),
                    "transcript holds only model turns, seeding with empty history"
                );
            }
            Vec::new()
        }
    }
}

fn encode_message(message: &ChatMessage) -> Option<Content> {
    let mut parts = Vec::with_capacity(message.images.len() + 1);

    let text = message.text.trim();
    if !text.is_empty() {
        parts.push(Part::text(text));
    }

    parts.extend(
        message
            .images
            .iter()
            .map(|image| Part::inline_image(image.mime_type.as_str(), image.base64_data.as_str())),
    );

    if parts.is_empty() {
        return None;
    }

    let role = match message.sender {
        Sender::User => Role::User,
        Sender::Ai => Role::Model,
    };
    Some(Content::new(role, parts))
}

/// Rebuilds view messages from a session transcript, e.g. a chat handle's history.
pub fn decode(history: &[Content]) -> Vec<ChatMessage> {
    history
        .iter()
        .map(|content| {
            let (id, sender) = match content.role {
                Role::User => (MessageId::user(), Sender::User),
                Role::Model => (MessageId::ai(), Sender::Ai),
            };

            let mut message = ChatMessage::new(id, sender, content.text());
            message.images = content
                .parts
                .iter()
                .filter_map(|part| match part {
                    Part::InlineImage { mime_type, data } => {
                        Some(ImageAttachment::new(data.as_str(), mime_type.as_str()))
                    }
                    Part::Text(_) => None,
                })
                .collect();
            message
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use khmerchat_storage::HISTORY_CLEARED_TEXT;

    use super::*;

    fn user(text: &str) -> ChatMessage {
        ChatMessage::user(text, Vec::new())
    }

    fn ai(text: &str) -> ChatMessage {
        ChatMessage::ai(text)
    }

    fn image() -> ImageAttachment {
        ImageAttachment::new("iVBORw0KGgo=", "image/png").with_name("photo.png")
    }

    fn roles(contents: &[Content]) -> Vec<Role> {
        contents.iter().map(|content| content.role).collect()
    }

    #[test]
    fn welcome_only_history_encodes_empty() {
        assert!(encode_default(&[ChatMessage::welcome()]).is_empty());
        assert!(encode_default(&[ai("welcome")]).is_empty());
    }

    #[test]
    fn image_only_user_turn_has_no_text_part() {
        let messages = vec![
            user("hi"),
            ai("hello"),
            ChatMessage::user("", vec![image()]),
        ];

        let encoded = encode_default(&messages);
        assert_eq!(roles(&encoded), vec![Role::User, Role::Model, Role::User]);
        assert_eq!(
            encoded[2].parts,
            vec![Part::inline_image("image/png", "iVBORw0KGgo=")]
        );
    }

    #[test]
    fn text_is_trimmed_and_precedes_images() {
        let message = ChatMessage::user("  អានរូបនេះ \n", vec![image(), image()]);

        let encoded = encode_default(&[message]);
        assert_eq!(encoded.len(), 1);
        assert_eq!(encoded[0].parts[0], Part::text("អានរូបនេះ"));
        assert_eq!(encoded[0].image_count(), 2);
    }

    #[test]
    fn empty_and_cleared_messages_are_dropped() {
        let messages = vec![
            ChatMessage::welcome(),
            ChatMessage::history_cleared(),
            user("   "),
            ai(""),
            user("សួស្តី"),
            ChatMessage::ai_placeholder(),
        ];

        let encoded = encode_default(&messages);
        assert_eq!(encoded, vec![Content::user(vec![Part::text("សួស្តី")])]);
        assert!(
            encoded
                .iter()
                .all(|content| content.text() != HISTORY_CLEARED_TEXT)
        );
    }

    #[test]
    fn leading_model_turns_are_sliced_off() {
        let messages = vec![ai("welcome"), ai("tip"), user("q1"), ai("a1")];

        let encoded = encode_default(&messages);
        assert_eq!(roles(&encoded), vec![Role::User, Role::Model]);
        assert_eq!(encoded[0].text(), "q1");
    }

    #[test]
    fn truncation_keeps_the_most_recent_suffix() {
        let messages = (0..120)
            .map(|index| {
                if index % 2 == 0 {
                    user(&format!("question {index}"))
                } else {
                    ai(&format!("answer {index}"))
                }
            })
            .collect::<Vec<_>>();

        let full = encode(&messages, usize::MAX);
        for cap in [1, 2, 49, 50, 51, 119, 120] {
            let encoded = encode(&messages, cap);
            assert!(encoded.len() <= cap, "cap {cap}");
            if let Some(first) = encoded.first() {
                assert_eq!(first.role, Role::User, "cap {cap}");
            }

            let suffix = &full[full.len() - encoded.len()..];
            assert_eq!(encoded.as_slice(), suffix, "cap {cap}");
        }
    }

    #[test]
    fn truncation_can_expose_a_model_turn_first() {
        let messages = vec![user("q1"), ai("a1"), user("q2"), ai("a2")];

        let encoded = encode(&messages, 3);
        assert_eq!(roles(&encoded), vec![Role::User, Role::Model]);
        assert_eq!(encoded[0].text(), "q2");

        assert!(encode(&messages, 0).is_empty());
        assert!(encode(&messages, 1).is_empty());
    }

    #[test]
    fn error_bubbles_are_replayed() {
        let mut failed = ai("");
        failed.mark_error("API Error: upstream reset");

        let encoded = encode_default(&[user("q1"), failed]);
        assert_eq!(encoded.len(), 2);
        assert_eq!(encoded[1].text(), "API Error: upstream reset");
    }

    #[test]
    fn encoding_is_idempotent_through_decode() {
        let messages = vec![
            ai("welcome"),
            user(" hi "),
            ai("hello"),
            ChatMessage::user("", vec![image()]),
            ChatMessage::history_cleared(),
            user("caption"),
        ];

        let once = encode_default(&messages);
        let twice = encode_default(&decode(&once));
        assert_eq!(once, twice);
        assert_eq!(encode_default(&messages), once);
    }
}
