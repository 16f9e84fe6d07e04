use anyhow::Context;
use application::formatter::escape_html;
use application::view::RenderedMessage;
use domain::conversation::ConversationKey;
use domain::models::Role;
use shared::types::Result;
use std::path::Path;

const STYLE: &str = "body{font-family:sans-serif;max-width:48rem;margin:2rem auto;line-height:1.5}\
.message{padding:.75rem 1rem;border-radius:.5rem;margin:.75rem 0}\
.user{background:#eef4ff}.assistant{background:#f6f6f6}\
.role{font-weight:bold;font-size:.85rem;color:#555}\
.sources{margin-top:.5rem}\
.source-tag{display:inline-block;font-size:.75rem;background:#e3e3e3;border-radius:.25rem;padding:0 .4rem;margin-right:.3rem}\
.source-section{margin-left:.3rem;color:#666}\
pre{background:#272822;color:#f8f8f2;padding:.75rem;overflow-x:auto}";

/// A standalone HTML page holding one conversation.
pub fn transcript_html(key: &ConversationKey, messages: &[RenderedMessage]) -> String {
    let title = escape_html(&format!("Chat: {key}"));
    let mut page = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n"
    );
    for message in messages {
        let class = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        page.push_str(&format!(
            "<div class=\"message {class}\">\n<div class=\"role\">{}</div>\n<div class=\"content\">{}</div>\n",
            message.role.label(),
            message.html
        ));
        if !message.sources_html.is_empty() {
            page.push_str(&format!(
                "<div class=\"sources\">{}</div>\n",
                message.sources_html
            ));
        }
        page.push_str("</div>\n");
    }
    page.push_str("</body>\n</html>\n");
    page
}

pub fn write_transcript(
    path: &Path,
    key: &ConversationKey,
    messages: &[RenderedMessage],
) -> Result<()> {
    std::fs::write(path, transcript_html(key, messages))
        .with_context(|| format!("could not write {}", path.display()))
}
