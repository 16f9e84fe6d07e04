//! Markdown-subset → HTML fragment rendering for chat messages.
//!
//! Escaping runs before any markup is produced, so the only tags in the
//! output are the ones synthesized here. Code spans and fences are set aside
//! as placeholders right after they are recognised; later patterns never see
//! their contents.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

const STASH_OPEN: char = '\u{E000}';
const STASH_CLOSE: char = '\u{E001}';

const BLOCK_PREFIXES: [&str; 6] = ["<h", "<ul", "<ol", "<pre", "<hr", "<li"];

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```([A-Za-z0-9_]*)\n?(.*?)```").expect("code fence pattern"));
static INLINE_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"`([^`]+)`").expect("inline code pattern"));
static HEADING_3: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^### (.+)$").expect("h3 pattern"));
static HEADING_2: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^## (.+)$").expect("h2 pattern"));
static HEADING_1: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^# (.+)$").expect("h1 pattern"));
static BOLD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*\s](?:.*?[^*\s])?)\*\*").expect("bold pattern"));
// An italic span may hold whole bold spans but never half of one.
static ITALIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\*((?:[^*\s<]|<strong>[^<]*</strong>)(?:[^*\n<]|<strong>[^<]*</strong>)*)\*")
        .expect("italic pattern")
});
static BULLET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[-*] (.+)$").expect("bullet pattern"));
static NUMBERED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\d+\. (.+)$").expect("numbered pattern"));
static LIST_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<li>.*</li>(?:\n<li>.*</li>)*").expect("list run pattern"));
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("link pattern"));
static RULE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^---$").expect("rule pattern"));
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\n+").expect("paragraph pattern"));
static STASHED: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{E000}(\\d+)\u{E001}").expect("placeholder pattern"));

/// Rendered fragments kept out of reach of later substitutions.
#[derive(Default)]
struct Stash {
    entries: Vec<(bool, String)>,
}

impl Stash {
    fn put(&mut self, block: bool, html: String) -> String {
        self.entries.push((block, html));
        format!("{}{}{}", STASH_OPEN, self.entries.len() - 1, STASH_CLOSE)
    }

    fn starts_with_block(&self, segment: &str) -> bool {
        STASHED
            .captures(segment)
            .filter(|caps| caps.get(0).map(|m| m.start()) == Some(0))
            .and_then(|caps| caps[1].parse::<usize>().ok())
            .and_then(|idx| self.entries.get(idx))
            .map(|(block, _)| *block)
            .unwrap_or(false)
    }

    fn restore(&self, html: &str) -> String {
        STASHED
            .replace_all(html, |caps: &Captures| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|idx| self.entries.get(idx))
                    .map(|(_, html)| html.clone())
                    .unwrap_or_default()
            })
            .into_owned()
    }
}

/// Escapes the characters that would otherwise open markup or entities.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn is_safe_href(url: &str) -> bool {
    // Browsers ignore tabs and newlines inside a URL when reading its scheme.
    let lowered: String = url
        .chars()
        .filter(|c| !c.is_ascii_control())
        .collect::<String>()
        .trim_start()
        .to_ascii_lowercase();
    !["javascript:", "vbscript:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
}

/// Renders raw message text as an HTML fragment. Pure and deterministic.
pub fn format_content(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let cleaned: String = text
        .replace("\r\n", "\n")
        .chars()
        .filter(|c| *c != STASH_OPEN && *c != STASH_CLOSE)
        .collect();
    let mut html = escape_text(&cleaned);
    let mut stash = Stash::default();

    html = CODE_FENCE
        .replace_all(&html, |caps: &Captures| {
            let block = format!(
                "<pre><code class=\"lang-{}\">{}</code></pre>",
                &caps[1],
                caps[2].trim()
            );
            stash.put(true, block)
        })
        .into_owned();

    html = INLINE_CODE
        .replace_all(&html, |caps: &Captures| {
            stash.put(false, format!("<code>{}</code>", &caps[1]))
        })
        .into_owned();

    html = HEADING_3.replace_all(&html, "<h4>$1</h4>").into_owned();
    html = HEADING_2.replace_all(&html, "<h3>$1</h3>").into_owned();
    html = HEADING_1.replace_all(&html, "<h3>$1</h3>").into_owned();

    html = BOLD.replace_all(&html, "<strong>$1</strong>").into_owned();
    html = ITALIC.replace_all(&html, "<em>$1</em>").into_owned();

    html = BULLET.replace_all(&html, "<li>$1</li>").into_owned();
    html = NUMBERED.replace_all(&html, "<li>$1</li>").into_owned();
    html = LIST_RUN
        .replace_all(&html, |caps: &Captures| {
            format!("<ul>{}</ul>", caps[0].replace('\n', ""))
        })
        .into_owned();

    html = LINK
        .replace_all(&html, |caps: &Captures| {
            let url = caps[2].trim();
            // Code spans are restored after this pass and would land unescaped in the href.
            if url.contains(STASH_OPEN) {
                return caps[0].to_string();
            }
            if is_safe_href(url) {
                format!(
                    "<a href=\"{}\" target=\"_blank\" rel=\"noopener noreferrer\">{}</a>",
                    url.replace('"', "&quot;"),
                    &caps[1]
                )
            } else {
                caps[1].to_string()
            }
        })
        .into_owned();

    html = RULE.replace_all(&html, "<hr>").into_owned();

    let body: String = PARAGRAPH_BREAK
        .split(&html)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let is_block = BLOCK_PREFIXES.iter().any(|p| segment.starts_with(p))
                || stash.starts_with_block(segment);
            if is_block {
                segment.to_string()
            } else {
                format!("<p>{}</p>", segment.replace('\n', "<br>"))
            }
        })
        .collect();

    stash.restore(&body)
}
