use crate::models::Message;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Storage key of the conversation held when no paper is selected.
pub const GENERAL_KEY: &str = "__general__";

/// Identifies which message thread is active: one per paper, plus general chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ConversationKey {
    General,
    Paper(String),
}

impl ConversationKey {
    pub fn for_paper(name: Option<&str>) -> Self {
        match name {
            Some(name) => ConversationKey::Paper(name.to_string()),
            None => ConversationKey::General,
        }
    }

    pub fn from_storage_key(key: &str) -> Self {
        if key == GENERAL_KEY {
            ConversationKey::General
        } else {
            ConversationKey::Paper(key.to_string())
        }
    }

    pub fn storage_key(&self) -> &str {
        match self {
            ConversationKey::General => GENERAL_KEY,
            ConversationKey::Paper(name) => name,
        }
    }

    /// The paper this conversation is scoped to, `None` for general chat.
    pub fn paper(&self) -> Option<&str> {
        match self {
            ConversationKey::General => None,
            ConversationKey::Paper(name) => Some(name),
        }
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationKey::General => f.write_str("general chat"),
            ConversationKey::Paper(name) => f.write_str(name),
        }
    }
}

/// Chronological list of messages. Append-only apart from explicit deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Removes the message at `index` and returns how many messages went away.
    ///
    /// A user message directly followed by an assistant message is removed
    /// together with that answer. Out-of-range indexes remove nothing.
    pub fn remove_at(&mut self, index: usize) -> usize {
        if index >= self.messages.len() {
            return 0;
        }
        let paired = self.messages[index].is_user()
            && self
                .messages
                .get(index + 1)
                .map(Message::is_assistant)
                .unwrap_or(false);
        let count = if paired { 2 } else { 1 };
        self.messages.drain(index..index + count);
        count
    }
}

impl From<Vec<Message>> for Conversation {
    fn from(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

/// Every conversation the client knows about, keyed by storage key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistories {
    conversations: BTreeMap<String, Conversation>,
}

impl ChatHistories {
    pub fn get(&self, key: &ConversationKey) -> Option<&Conversation> {
        self.conversations.get(key.storage_key())
    }

    pub fn get_mut(&mut self, key: &ConversationKey) -> Option<&mut Conversation> {
        self.conversations.get_mut(key.storage_key())
    }

    pub fn insert(&mut self, key: &ConversationKey, conversation: Conversation) {
        self.conversations
            .insert(key.storage_key().to_string(), conversation);
    }

    pub fn remove(&mut self, key: &ConversationKey) -> Option<Conversation> {
        self.conversations.remove(key.storage_key())
    }

    pub fn keys(&self) -> impl Iterator<Item = ConversationKey> + '_ {
        self.conversations
            .keys()
            .map(|k| ConversationKey::from_storage_key(k))
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}
