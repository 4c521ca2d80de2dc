//! Chat replies built from a [`BotAnswer`].

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::engine::{BotAnswer, Certainty};
use crate::placeholder::{Segment, resolve_placeholders};

static MENTION: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"@\d+").ok());

/// Keyword that addresses the bot in group chats.
pub const BOT_MENTION: &str = "@faq";

/// An image to send after the reply text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyImage {
    pub path: String,
    pub caption: String,
}

/// Text plus attachments for one chat reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotReply {
    pub text: String,
    pub images: Vec<ReplyImage>,
}

/// Strip the bot keyword and numeric `@mentions` from a chat message.
pub fn clean_chat_query(message: &str) -> String {
    let without_keyword = message.replace(BOT_MENTION, "");
    let cleaned = match MENTION.as_ref() {
        Some(re) => re.replace_all(&without_keyword, "").into_owned(),
        None => without_keyword,
    };
    cleaned.trim().to_string()
}

/// Render the reply for `sender`.
///
/// Placeholders that resolve become a pointer to the attached image; the
/// rest are dropped. When no placeholder resolves every stored image is
/// attached.
pub fn compose_reply(answer: &BotAnswer, sender: &str) -> BotReply {
    match answer {
        BotAnswer::EmptyQuery => BotReply {
            text: format!("Hi {sender}, please type your question."),
            images: Vec::new(),
        },
        BotAnswer::NotFound { query } => BotReply {
            text: format!("Sorry {sender}, no answer was found for: '{query}'."),
            images: Vec::new(),
        },
        BotAnswer::Answer {
            entry,
            score,
            certainty,
        } => {
            let mut text = match certainty {
                Certainty::Hedged => format!("Not quite sure ({score:.0}%):\n\n"),
                Certainty::Confident => format!("FAQ Assistant ({score:.0}%)\n\n"),
            };

            let resolved = resolve_placeholders(&entry.answer_text, &entry.image_paths);
            let body = resolved.render(|segment| match segment {
                Segment::Image { number, .. } => format!("(see image {number} below)"),
                _ => String::new(),
            });

            text.push_str(&format!("{}\n{body}\n", entry.title));
            if let Some(url) = &entry.source_url {
                text.push_str(&format!("\n{url}"));
            }

            let images = resolved
                .images_to_send()
                .into_iter()
                .enumerate()
                .map(|(i, path)| ReplyImage {
                    path: path.to_string(),
                    caption: format!("Image #{} for {}", i + 1, entry.title),
                })
                .collect();

            BotReply { text, images }
        }
    }
}
