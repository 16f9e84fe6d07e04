use domain::conversation::{ChatHistories, Conversation, ConversationKey};
use domain::storage::KeyValueStore;
use serde::{Deserialize, Serialize};
use shared::types::Result;

pub const HISTORY_NAMESPACE: &str = "chatHistories";
/// Where an unreadable history blob is parked before starting over.
pub const CORRUPT_NAMESPACE: &str = "chatHistories.corrupt";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    conversations: &'a ChatHistories,
}

#[derive(Deserialize)]
struct Envelope {
    version: u32,
    #[serde(default)]
    conversations: ChatHistories,
}

/// All conversations, mirrored to a durable key/value backend on every change.
pub struct ChatHistoryStore<S> {
    backend: S,
    histories: ChatHistories,
}

impl<S: KeyValueStore> ChatHistoryStore<S> {
    /// Loads the saved mapping. Never fails: unreadable or foreign data
    /// yields an empty store.
    pub fn load(backend: S) -> Self {
        let histories = match backend.read(HISTORY_NAMESPACE) {
            Ok(Some(raw)) => match decode(&raw) {
                Ok(histories) => histories,
                Err(reason) => {
                    tracing::warn!("discarding saved chat history: {reason}");
                    if let Err(e) = backend.write(CORRUPT_NAMESPACE, &raw) {
                        tracing::warn!("could not back up unreadable chat history: {e:#}");
                    }
                    ChatHistories::default()
                }
            },
            Ok(None) => ChatHistories::default(),
            Err(e) => {
                tracing::warn!("could not read chat history: {e:#}");
                ChatHistories::default()
            }
        };
        tracing::debug!(conversations = histories.len(), "chat history loaded");
        Self { backend, histories }
    }

    /// A copy of the conversation under `key`, empty when none is stored.
    pub fn get(&self, key: &ConversationKey) -> Conversation {
        self.histories.get(key).cloned().unwrap_or_default()
    }

    pub fn contains(&self, key: &ConversationKey) -> bool {
        self.histories.get(key).is_some()
    }

    pub fn keys(&self) -> Vec<ConversationKey> {
        self.histories.keys().collect()
    }

    pub fn histories(&self) -> &ChatHistories {
        &self.histories
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn save(&mut self, key: &ConversationKey, conversation: Conversation) -> Result<()> {
        self.histories.insert(key, conversation);
        self.persist()
    }

    /// Deletes one message (with its answer, for a question) and returns how
    /// many messages went away. Nothing is written when nothing changed.
    pub fn delete_message(&mut self, key: &ConversationKey, index: usize) -> Result<usize> {
        let removed = self
            .histories
            .get_mut(key)
            .map(|conversation| conversation.remove_at(index))
            .unwrap_or(0);
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    pub fn delete_conversation(&mut self, key: &ConversationKey) -> Result<()> {
        if self.histories.remove(key).is_some() {
            self.persist()?;
        }
        Ok(())
    }

    /// Empties the conversation while keeping its key.
    pub fn clear(&mut self, key: &ConversationKey) -> Result<()> {
        self.histories.insert(key, Conversation::new());
        self.persist()
    }

    pub fn persist(&self) -> Result<()> {
        let envelope = EnvelopeRef {
            version: FORMAT_VERSION,
            conversations: &self.histories,
        };
        let raw = serde_json::to_string(&envelope)?;
        self.backend.write(HISTORY_NAMESPACE, &raw)
    }
}

fn decode(raw: &str) -> std::result::Result<ChatHistories, String> {
    let envelope: Envelope = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    if envelope.version != FORMAT_VERSION {
        return Err(format!(
            "unsupported history format version {}",
            envelope.version
        ));
    }
    Ok(envelope.conversations)
}
