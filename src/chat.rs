use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attachment::ImagePayload;

/// Identifier for a transcript entry. Ids are handed out from a process-wide
/// counter, so later messages always compare greater than earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(u64);

impl MessageId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        MessageId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
}

/// A single transcript entry. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub text: String,
    pub image: Option<ImagePayload>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn user(text: impl Into<String>, image: Option<ImagePayload>) -> Self {
        Self {
            id: MessageId::next(),
            role: Role::User,
            text: text.into(),
            image,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            id: MessageId::next(),
            role: Role::Assistant,
            text: text.into(),
            image: None,
            timestamp: Utc::now(),
        }
    }
}

/// The message being composed. Ephemeral: cleared when a send is dispatched.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub text: String,
    pub image: Option<ImagePayload>,
}

impl Draft {
    /// A draft with no text and no staged image has nothing to send.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.image.is_none()
    }
}

/// Ordered transcript plus the draft being composed and the busy flag.
///
/// The transcript is append-only: entries are never reordered or removed.
/// Everything else in the app only reads this state; mutation goes through
/// the methods below.
#[derive(Default)]
pub struct Conversation {
    messages: Vec<Message>,
    draft: Draft,
    busy: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a message to the end of the transcript. Never fails.
    pub fn append(&mut self, message: Message) {
        debug_assert!(self.messages.last().map_or(true, |last| last.id < message.id));
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn set_draft_text(&mut self, text: impl Into<String>) {
        self.draft.text = text.into();
    }

    /// Inserts a character at a character index (not a byte index).
    pub fn insert_draft_char(&mut self, char_idx: usize, c: char) {
        let byte_pos = char_to_byte_index(&self.draft.text, char_idx);
        self.draft.text.insert(byte_pos, c);
    }

    /// Removes the character at a character index, if there is one.
    pub fn delete_draft_char(&mut self, char_idx: usize) {
        if char_idx < self.draft.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.draft.text, char_idx);
            self.draft.text.remove(byte_pos);
        }
    }

    pub fn set_draft_image(&mut self, image: Option<ImagePayload>) {
        self.draft.image = image;
    }

    pub fn clear_draft(&mut self) {
        self.draft = Draft::default();
    }

    pub fn busy(&self) -> bool {
        self.busy
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
pub(crate) fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut conversation = Conversation::new();
        conversation.append(Message::user("first", None));
        conversation.append(Message::assistant("second"));
        conversation.append(Message::user("third", None));

        let texts: Vec<&str> = conversation
            .messages()
            .iter()
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_message_ids_are_monotonic() {
        let a = Message::user("a", None);
        let b = Message::assistant("b");
        let c = Message::user("c", None);
        assert!(a.id < b.id);
        assert!(b.id < c.id);
    }

    #[test]
    fn test_draft_empty_only_without_text_and_image() {
        let mut draft = Draft::default();
        assert!(draft.is_empty());

        draft.text = "hello".to_string();
        assert!(!draft.is_empty());

        draft.text.clear();
        draft.image = Some(crate::attachment::ImagePayload::new("image/png", "aGk="));
        assert!(!draft.is_empty());
    }

    #[test]
    fn test_insert_and_delete_draft_chars_multibyte() {
        let mut conversation = Conversation::new();
        conversation.set_draft_text("héllo");

        conversation.insert_draft_char(2, 'x');
        assert_eq!(conversation.draft().text, "héxllo");

        conversation.delete_draft_char(1);
        assert_eq!(conversation.draft().text, "hxllo");

        // Past-the-end indices append / do nothing.
        conversation.insert_draft_char(100, '!');
        assert_eq!(conversation.draft().text, "hxllo!");
        conversation.delete_draft_char(100);
        assert_eq!(conversation.draft().text, "hxllo!");
    }

    #[test]
    fn test_clear_draft_resets_text_and_image() {
        let mut conversation = Conversation::new();
        conversation.set_draft_text("pending");
        conversation.set_draft_image(Some(crate::attachment::ImagePayload::new(
            "image/png",
            "aGk=",
        )));

        conversation.clear_draft();
        assert!(conversation.draft().is_empty());
        assert!(conversation.draft().image.is_none());
    }
}
