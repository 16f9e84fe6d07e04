//! Terminal rendition of the chat screen.
//!
//! The controller hands over HTML fragments; they are turned into styled
//! text here. While an answer is being revealed on a TTY the in-progress
//! block is redrawn in place.

use application::reveal::RenderTarget;
use application::view::{ChatView, NoticeLevel, RenderedMessage};
use colored::Colorize;
use crossterm::cursor::{MoveToColumn, MoveUp};
use crossterm::terminal::{Clear, ClearType};
use crossterm::tty::IsTty;
use crossterm::queue;
use domain::conversation::ConversationKey;
use domain::library::{ArxivPaper, IndexStats, PaperSummary};
use domain::models::{Role, Source};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use shared::utils::truncate;
use std::io::{self, Stdout, Write};

const RULE_WIDTH: usize = 40;

static CODE_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<pre><code class="lang-[^"]*">(.*?)</code></pre>"#).expect("code block tag")
});
static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<h[1-6]>(.*?)</h[1-6]>").expect("heading tag"));
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"<li>(.*?)</li>").expect("list item tag"));
static LIST: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[uo]l>").expect("list tag"));
static STRONG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<strong>(.*?)</strong>").expect("strong tag"));
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"<em>(.*?)</em>").expect("em tag"));
static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<code>(.*?)</code>").expect("code tag"));
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<a href="([^"]*)"[^>]*>(.*?)</a>"#).expect("link tag"));
static PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<p>(.*?)</p>").expect("p tag"));
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("any tag"));
static EXTRA_BLANK_LINES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("blank lines"));

#[derive(Clone, Copy)]
enum Paint {
    Heading,
    Strong,
    Emphasis,
    Code,
    Link,
    Muted,
}

fn paint(text: &str, paint: Paint, styled: bool) -> String {
    if !styled {
        return text.to_string();
    }
    match paint {
        Paint::Heading => text.bold().underline().to_string(),
        Paint::Strong => text.bold().to_string(),
        Paint::Emphasis => text.italic().to_string(),
        Paint::Code => text.yellow().to_string(),
        Paint::Link => text.blue().underline().to_string(),
        Paint::Muted => text.dimmed().to_string(),
    }
}

fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}

/// Converts a formatter-produced fragment to terminal text.
pub fn html_to_terminal(html: &str, styled: bool) -> String {
    let mut text = CODE_BLOCK
        .replace_all(html, |caps: &Captures| {
            let body: Vec<String> = caps[1]
                .lines()
                .map(|line| format!("    {}", paint(line, Paint::Code, styled)))
                .collect();
            format!("{}\n\n", body.join("\n"))
        })
        .into_owned();
    text = HEADING
        .replace_all(&text, |caps: &Captures| {
            format!("{}\n\n", paint(&caps[1], Paint::Heading, styled))
        })
        .into_owned();
    text = LIST_ITEM.replace_all(&text, "  • $1\n").into_owned();
    text = LIST.replace_all(&text, "\n").into_owned();
    text = STRONG
        .replace_all(&text, |caps: &Captures| paint(&caps[1], Paint::Strong, styled))
        .into_owned();
    text = EMPHASIS
        .replace_all(&text, |caps: &Captures| paint(&caps[1], Paint::Emphasis, styled))
        .into_owned();
    text = CODE
        .replace_all(&text, |caps: &Captures| paint(&caps[1], Paint::Code, styled))
        .into_owned();
    text = LINK
        .replace_all(&text, |caps: &Captures| {
            format!("{} ({})", &caps[2], paint(&caps[1], Paint::Link, styled))
        })
        .into_owned();
    let rule = paint(&"─".repeat(RULE_WIDTH), Paint::Muted, styled);
    text = text.replace("<hr>", &format!("{rule}\n\n"));
    text = text.replace("<br>", "\n");
    text = PARAGRAPH.replace_all(&text, "$1\n\n").into_owned();
    text = ANY_TAG.replace_all(&text, "").into_owned();
    text = EXTRA_BLANK_LINES.replace_all(&text, "\n\n").into_owned();
    unescape_entities(text.trim_matches('\n'))
}

/// One line per citation, the way the source tags read in a browser.
pub fn sources_line(sources: &[Source]) -> String {
    sources
        .iter()
        .map(|s| {
            if s.section.is_empty() {
                truncate(&s.paper, 25)
            } else {
                format!("{} · {}", truncate(&s.paper, 25), s.section)
            }
        })
        .enumerate()
        .map(|(i, tag)| format!("[{}] {}", i + 1, tag))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Rows `text` occupies on a terminal `columns` wide.
fn rows_for(text: &str, columns: u16) -> u16 {
    let columns = usize::from(columns.max(1));
    let rows: usize = text
        .split('\n')
        .map(|line| line.chars().count().max(1).div_ceil(columns))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

/// `ChatView` writing to a terminal (or any writer, for tests and pipes).
pub struct TerminalView<W: Write = Stdout> {
    out: W,
    interactive: bool,
    styled: bool,
    next_index: usize,
    live_rows: u16,
    live_html: String,
    live_sources: Vec<Source>,
    working_shown: bool,
    send_enabled: bool,
}

impl TerminalView<Stdout> {
    pub fn stdout() -> Self {
        let out = io::stdout();
        let interactive = out.is_tty();
        Self::with_writer(out, interactive, interactive)
    }
}

impl<W: Write> TerminalView<W> {
    /// `interactive` enables in-place redraws; `styled` enables ANSI styling.
    pub fn with_writer(out: W, interactive: bool, styled: bool) -> Self {
        Self {
            out,
            interactive,
            styled,
            next_index: 0,
            live_rows: 0,
            live_html: String::new(),
            live_sources: Vec::new(),
            working_shown: false,
            send_enabled: true,
        }
    }

    pub fn send_enabled(&self) -> bool {
        self.send_enabled
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn columns(&self) -> u16 {
        crossterm::terminal::size().map(|(c, _)| c).unwrap_or(80)
    }

    fn header(&self, index: usize, role: Role) -> String {
        let index = paint(&format!("[{index}]"), Paint::Muted, self.styled);
        let label = match (self.styled, role) {
            (false, _) => role.label().to_string(),
            (true, Role::User) => role.label().green().bold().to_string(),
            (true, Role::Assistant) => role.label().cyan().bold().to_string(),
        };
        format!("{index} {label}")
    }

    fn write_message(&mut self, message: &RenderedMessage) {
        let header = self.header(message.index, message.role);
        let body = html_to_terminal(&message.html, self.styled);
        let _ = writeln!(self.out, "{header}\n{body}");
        if !message.sources.is_empty() {
            let line = format!("Sources: {}", sources_line(&message.sources));
            let _ = writeln!(self.out, "{}", paint(&line, Paint::Muted, self.styled));
        }
        let _ = writeln!(self.out);
        self.next_index = message.index + 1;
    }

    fn erase_rows(&mut self, rows: u16) {
        if self.interactive && rows > 0 {
            let _ = queue!(
                self.out,
                MoveToColumn(0),
                MoveUp(rows),
                Clear(ClearType::FromCursorDown)
            );
        }
    }

    /// Paper listing with the selected paper marked.
    pub fn show_papers(&mut self, papers: &[&PaperSummary], selected: Option<&str>) {
        if papers.is_empty() {
            let empty = paint("No papers indexed.", Paint::Muted, self.styled);
            let _ = writeln!(self.out, "{empty}");
        }
        for paper in papers {
            let marker = if selected == Some(paper.paper_name.as_str()) { "▸" } else { " " };
            let _ = writeln!(
                self.out,
                "{} {}  {}",
                marker,
                paper.paper_name,
                paint(&format!("{} chunks", paper.chunk_count), Paint::Muted, self.styled)
            );
        }
        let _ = self.out.flush();
    }

    pub fn show_stats(&mut self, stats: &IndexStats) {
        let _ = writeln!(
            self.out,
            "{} papers · {} chunks",
            stats.papers_indexed, stats.chunks_indexed
        );
        let _ = self.out.flush();
    }

    pub fn show_arxiv_results(&mut self, papers: &[ArxivPaper]) {
        if papers.is_empty() {
            let _ = writeln!(self.out, "{}", paint("No papers found", Paint::Muted, self.styled));
        }
        for paper in papers {
            let _ = writeln!(
                self.out,
                "{}  {}\n    {}\n    {}\n",
                paint(&paper.arxiv_id, Paint::Code, self.styled),
                paint(&paper.title, Paint::Strong, self.styled),
                paper.authors_line(),
                truncate(&paper.summary, 200)
            );
        }
        let _ = self.out.flush();
    }

    pub fn show_text(&mut self, text: &str) {
        let _ = writeln!(self.out, "{text}");
        let _ = self.out.flush();
    }
}

impl<W: Write> RenderTarget for TerminalView<W> {
    fn replace_html(&mut self, html: &str) {
        self.live_html = html.to_string();
        if !self.interactive {
            return;
        }
        let rows = self.live_rows;
        self.erase_rows(rows);
        let body = html_to_terminal(html, self.styled);
        let _ = writeln!(self.out, "{body}");
        self.live_rows = rows_for(&html_to_terminal(html, false), self.columns());
    }

    fn pin_to_bottom(&mut self) {
        let _ = self.out.flush();
    }
}

impl<W: Write> ChatView for TerminalView<W> {
    fn show_conversation(&mut self, key: &ConversationKey, messages: &[RenderedMessage]) {
        let title = format!("── {key} ──");
        let _ = writeln!(self.out, "\n{}\n", paint(&title, Paint::Heading, self.styled));
        if messages.is_empty() {
            let _ = writeln!(
                self.out,
                "{}\n",
                paint("No messages yet.", Paint::Muted, self.styled)
            );
        }
        for message in messages {
            self.write_message(message);
        }
        self.next_index = messages.len();
        let _ = self.out.flush();
    }

    fn append_message(&mut self, message: &RenderedMessage) {
        self.write_message(message);
        let _ = self.out.flush();
    }

    fn begin_assistant_message(&mut self) {
        let header = self.header(self.next_index, Role::Assistant);
        let _ = writeln!(self.out, "{header}");
        self.live_rows = 0;
        self.live_html.clear();
        self.live_sources.clear();
    }

    fn attach_sources(&mut self, sources: &[Source], _html: &str) {
        self.live_sources = sources.to_vec();
    }

    fn end_assistant_message(&mut self) {
        if !self.interactive {
            let body = html_to_terminal(&self.live_html, self.styled);
            let _ = writeln!(self.out, "{body}");
        }
        if !self.live_sources.is_empty() {
            let line = format!("Sources: {}", sources_line(&self.live_sources));
            let _ = writeln!(self.out, "{}", paint(&line, Paint::Muted, self.styled));
        }
        let _ = writeln!(self.out);
        let _ = self.out.flush();
        self.next_index += 1;
        self.live_rows = 0;
    }

    fn set_working(&mut self, label: Option<&str>) {
        match label {
            Some(label) => {
                if self.interactive {
                    if self.working_shown {
                        self.erase_rows(1);
                    }
                    let line = paint(&format!("⋯ {label}"), Paint::Muted, self.styled);
                    let _ = writeln!(self.out, "{line}");
                    let _ = self.out.flush();
                    self.working_shown = true;
                }
            }
            None => {
                if self.working_shown {
                    self.erase_rows(1);
                    let _ = self.out.flush();
                    self.working_shown = false;
                }
            }
        }
    }

    fn set_send_enabled(&mut self, enabled: bool) {
        self.send_enabled = enabled;
    }

    fn notify(&mut self, level: NoticeLevel, text: &str) {
        let line = match level {
            NoticeLevel::Info => format!("ℹ {text}").as_str().blue(),
            NoticeLevel::Success => format!("✓ {text}").as_str().green(),
            NoticeLevel::Error => format!("✗ {text}").as_str().red(),
        };
        eprintln!("{line}");
    }
}
