//! Conversation state
//!
//! The message list is append-only and can only be emptied as a whole. All
//! changes go through [`Conversation::apply`] so the transitions stay testable
//! without a terminal.

use serde::{Deserialize, Serialize};

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Author {
    User,
    Assistant,
}

/// A single exchanged message. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    author: Author,
    text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self { author: Author::User, text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self { author: Author::Assistant, text: text.into() }
    }

    pub fn author(&self) -> Author {
        self.author
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// State transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A prompt and the reply it received, appended together
    Exchange { prompt: String, reply: String },
    Clear,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Exchange { prompt, reply } => {
                self.append(Message::user(prompt));
                self.append(Message::assistant(reply));
            }
            Action::Clear => self.clear(),
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        // Swap in a fresh vec so nothing ever sees a partially emptied list
        self.messages = Vec::new();
    }

    pub fn list(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
