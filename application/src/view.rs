use crate::formatter::{escape_html, format_content};
use crate::reveal::RenderTarget;
use domain::conversation::ConversationKey;
use domain::models::{Message, Role, Source};
use shared::utils::truncate;

const SOURCE_NAME_LIMIT: usize = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A stored message prepared for display. Formatting happens here, never in
/// storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub index: usize,
    pub role: Role,
    pub html: String,
    pub sources: Vec<Source>,
    pub sources_html: String,
}

impl RenderedMessage {
    pub fn from_message(index: usize, message: &Message) -> Self {
        Self {
            index,
            role: message.role,
            html: format_content(&message.content),
            sources: message.sources.clone(),
            sources_html: render_sources(&message.sources),
        }
    }
}

pub fn render_conversation(messages: &[Message]) -> Vec<RenderedMessage> {
    messages
        .iter()
        .enumerate()
        .map(|(index, message)| RenderedMessage::from_message(index, message))
        .collect()
}

/// Citation tags for an answer. Paper names are shortened to fit a tag.
pub fn render_sources(sources: &[Source]) -> String {
    sources
        .iter()
        .map(|source| {
            format!(
                "<span class=\"source-tag\"><span class=\"source-paper\">{}</span><span class=\"source-section\">{}</span></span>",
                escape_html(&truncate(&source.paper, SOURCE_NAME_LIMIT)),
                escape_html(&source.section)
            )
        })
        .collect()
}

/// What the conversation controller needs from a chat display.
pub trait ChatView: RenderTarget {
    /// Replaces everything shown with the given conversation.
    fn show_conversation(&mut self, key: &ConversationKey, messages: &[RenderedMessage]);

    fn append_message(&mut self, message: &RenderedMessage);

    /// Opens an empty assistant message that `replace_html` then fills.
    fn begin_assistant_message(&mut self);

    fn attach_sources(&mut self, sources: &[Source], html: &str);

    fn end_assistant_message(&mut self);

    /// Shows or hides the busy indicator.
    fn set_working(&mut self, label: Option<&str>);

    fn set_send_enabled(&mut self, enabled: bool);

    fn notify(&mut self, level: NoticeLevel, text: &str);
}
