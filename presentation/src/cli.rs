use crate::export::write_transcript;
use crate::terminal::TerminalView;
use anyhow::{anyhow, bail, Context};
use application::conversation_service::{ConversationController, SendOutcome};
use application::history_service::ChatHistoryStore;
use application::library_service::LibraryService;
use application::reveal::{RevealAnimator, TokioPacer};
use application::view::{render_conversation, ChatView, NoticeLevel};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use infrastructure::api_client::HttpPaperApi;
use infrastructure::config::Config;
use infrastructure::history_storage::SqliteStore;
use shared::confirmation::{ask_confirmation, ask_line};
use shared::types::Result;
use std::path::{Path, PathBuf};

const CHAT_HELP: &str = "\
/help               show this help
/papers [filter]    list indexed papers
/select NAME        talk about one paper (again to go back)
/general            back to general chat
/source N           switch to the paper of citation N of the last answer
/delete INDEX       delete a message (a question takes its answer along)
/clear              clear this conversation
/upload PATH        upload and index a PDF
/arxiv QUERY        search arXiv
/add ID             add an arXiv paper and chat about it
/download ID        index an arXiv paper without switching
/pdf NAME           print the PDF location of a paper
/stats              library statistics
/exit               leave (also: exit, quit)
Anything else is sent as a question.";

#[derive(Parser)]
#[command(name = "paperchat")]
#[command(about = "Chat with your research papers from the terminal")]
pub struct Cli {
    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Interactive chat (default)
    Chat {
        #[arg(long)]
        paper: Option<String>,
    },
    /// Ask a single question and print the answer
    Ask {
        #[arg(long)]
        paper: Option<String>,
        #[arg(required = true, trailing_var_arg = true)]
        question: Vec<String>,
    },
    /// List indexed papers
    Papers {
        #[arg(long)]
        filter: Option<String>,
    },
    /// Library statistics
    Stats,
    /// Upload and index a PDF
    Upload { path: PathBuf },
    /// Remove a paper from the library
    Delete {
        name: String,
        #[arg(long)]
        yes: bool,
    },
    /// Download a paper's PDF, or print its location
    Pdf {
        name: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    #[command(subcommand)]
    Arxiv(ArxivCommand),
    /// Show a stored conversation
    History {
        #[arg(long)]
        paper: Option<String>,
    },
    /// Delete one message of a conversation
    Forget {
        #[arg(long)]
        paper: Option<String>,
        index: usize,
    },
    /// Clear a conversation
    Clear {
        #[arg(long)]
        paper: Option<String>,
        #[arg(long)]
        yes: bool,
    },
    /// Write a conversation to a standalone HTML file
    Export {
        #[arg(long)]
        paper: Option<String>,
        #[arg(short, long)]
        output: PathBuf,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ArxivCommand {
    /// Search arXiv
    Search {
        #[arg(required = true, trailing_var_arg = true)]
        query: Vec<String>,
    },
    /// Add a paper to the library and chat about it
    Add { id: String },
    /// Add a paper to the library only
    Download { id: String },
}

/// One line typed into the interactive chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    Ask(String),
    Help,
    Papers(String),
    Select(String),
    General,
    Source(usize),
    Delete(usize),
    Clear,
    Upload(PathBuf),
    Arxiv(String),
    Add(String),
    Download(String),
    Pdf(String),
    Stats,
    Exit,
    Empty,
    Invalid(String),
}

pub fn parse_chat_command(line: &str) -> ChatCommand {
    let line = line.trim();
    if line.is_empty() {
        return ChatCommand::Empty;
    }
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return ChatCommand::Exit;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ChatCommand::Ask(line.to_string());
    };
    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    let required = |usage: &str, build: fn(String) -> ChatCommand| {
        if rest.is_empty() {
            ChatCommand::Invalid(format!("usage: {usage}"))
        } else {
            build(rest.to_string())
        }
    };
    let index = |usage: &str, build: fn(usize) -> ChatCommand| match rest.parse::<usize>() {
        Ok(n) => build(n),
        Err(_) => ChatCommand::Invalid(format!("usage: {usage}")),
    };

    match name.to_ascii_lowercase().as_str() {
        "help" | "?" => ChatCommand::Help,
        "papers" => ChatCommand::Papers(rest.to_string()),
        "select" => required("/select NAME", ChatCommand::Select),
        "general" => ChatCommand::General,
        "source" => match rest.parse::<usize>() {
            Ok(n) if n >= 1 => ChatCommand::Source(n),
            _ => ChatCommand::Invalid("usage: /source N (starting at 1)".to_string()),
        },
        "delete" => index("/delete INDEX", ChatCommand::Delete),
        "clear" => ChatCommand::Clear,
        "upload" => required("/upload PATH", |p| ChatCommand::Upload(PathBuf::from(p))),
        "arxiv" => required("/arxiv QUERY", ChatCommand::Arxiv),
        "add" => required("/add ARXIV_ID", ChatCommand::Add),
        "download" => required("/download ARXIV_ID", ChatCommand::Download),
        "pdf" => required("/pdf NAME", ChatCommand::Pdf),
        "stats" => ChatCommand::Stats,
        "exit" | "quit" => ChatCommand::Exit,
        other => ChatCommand::Invalid(format!("unknown command /{other}, try /help")),
    }
}

type Controller = ConversationController<HttpPaperApi, SqliteStore, TokioPacer>;

pub struct CliApp {
    config: Config,
    controller: Controller,
    library: LibraryService<HttpPaperApi>,
}

impl CliApp {
    pub fn new(config: Config) -> Result<Self> {
        let api = HttpPaperApi::from_config(&config)?;
        let store = SqliteStore::open(&config.history_db).with_context(|| {
            format!("could not open chat history at {}", config.history_db.display())
        })?;
        let controller = ConversationController::new(
            api.clone(),
            ChatHistoryStore::load(store),
            RevealAnimator::new(TokioPacer, config.reveal_lines_per_second),
        );
        let library = LibraryService::new(api, config.arxiv_max_results);
        Ok(Self {
            config,
            controller,
            library,
        })
    }

    pub async fn run(&mut self, cli: Cli) -> Result<()> {
        let mut view = TerminalView::stdout();
        let command = cli.command.unwrap_or(Command::Chat { paper: None });
        tracing::debug!(?command, api = %self.config.api_base, "running");
        match command {
            Command::Chat { paper } => self.handle_chat(paper.as_deref(), &mut view).await,
            Command::Ask { paper, question } => {
                self.handle_ask(paper.as_deref(), &question.join(" "), &mut view)
                    .await
            }
            Command::Papers { filter } => {
                self.handle_papers(filter.as_deref().unwrap_or(""), &mut view)
                    .await
            }
            Command::Stats => self.handle_stats(&mut view).await,
            Command::Upload { path } => self.handle_upload(&path, &mut view).await,
            Command::Delete { name, yes } => self.handle_delete(&name, yes, &mut view).await,
            Command::Pdf { name, output } => self.handle_pdf(&name, output, &mut view).await,
            Command::Arxiv(ArxivCommand::Search { query }) => {
                self.handle_arxiv_search(&query.join(" "), &mut view).await
            }
            Command::Arxiv(ArxivCommand::Add { id }) => self.handle_arxiv_add(&id, &mut view).await,
            Command::Arxiv(ArxivCommand::Download { id }) => {
                self.handle_arxiv_download(&id, &mut view).await
            }
            Command::History { paper } => {
                self.controller.open(paper.as_deref());
                self.controller.render(&mut view);
                Ok(())
            }
            Command::Forget { paper, index } => {
                self.controller.open(paper.as_deref());
                self.handle_forget(index, &mut view);
                Ok(())
            }
            Command::Clear { paper, yes } => {
                self.controller.open(paper.as_deref());
                self.handle_clear(yes, &mut view).await
            }
            Command::Export { paper, output } => {
                self.controller.open(paper.as_deref());
                self.handle_export(&output, &mut view)
            }
        }
    }

    async fn handle_chat(&mut self, paper: Option<&str>, view: &mut TerminalView) -> Result<()> {
        self.library.refresh().await;
        if self.library.stats().is_none() {
            view.notify(
                NoticeLevel::Error,
                &format!("Paper service unreachable at {}", self.config.api_base),
            );
        }
        self.controller.open(paper);
        self.controller.render(view);
        println!(
            "{}",
            "Ask a question, /help for commands, /exit to leave.".dimmed()
        );

        loop {
            let line = match ask_line("Ask") {
                Ok(line) => line,
                Err(e) => {
                    self.controller.flush(view);
                    return Err(e);
                }
            };
            let command = parse_chat_command(&line);
            if command == ChatCommand::Exit {
                break;
            }
            if let Err(e) = self.handle_chat_command(command, view).await {
                view.notify(NoticeLevel::Error, &format!("{e:#}"));
            }
        }
        self.controller.flush(view);
        Ok(())
    }

    async fn handle_chat_command(
        &mut self,
        command: ChatCommand,
        view: &mut TerminalView,
    ) -> Result<()> {
        match command {
            ChatCommand::Ask(question) => {
                let outcome = self.controller.send(&question, view).await;
                if outcome.library_changed() {
                    self.library.refresh().await;
                }
            }
            ChatCommand::Help => view.show_text(CHAT_HELP),
            ChatCommand::Papers(filter) => {
                self.library.refresh().await;
                let papers = self.library.filter(&filter);
                view.show_papers(&papers, self.controller.selected_paper());
            }
            ChatCommand::Select(name) => {
                if !self.library.contains(&name) {
                    self.library.refresh().await;
                }
                if !self.library.contains(&name) {
                    bail!("unknown paper: {name}");
                }
                self.controller.select_paper(&name, view);
            }
            ChatCommand::General => self.controller.clear_selection(view),
            ChatCommand::Source(n) => {
                let paper = self
                    .controller
                    .last_sources()
                    .get(n.saturating_sub(1))
                    .map(|s| s.paper.clone())
                    .ok_or_else(|| anyhow!("the last answer has no citation {n}"))?;
                self.controller.focus_paper(&paper, view);
            }
            ChatCommand::Delete(index) => self.handle_forget(index, view),
            ChatCommand::Clear => self.handle_clear(false, view).await?,
            ChatCommand::Upload(path) => self.handle_upload(&path, view).await?,
            ChatCommand::Arxiv(query) => self.handle_arxiv_search(&query, view).await?,
            ChatCommand::Add(id) => self.handle_arxiv_add(&id, view).await?,
            ChatCommand::Download(id) => self.handle_arxiv_download(&id, view).await?,
            ChatCommand::Pdf(name) => view.show_text(&self.library.pdf_url(&name)),
            ChatCommand::Stats => self.handle_stats(view).await?,
            ChatCommand::Invalid(message) => view.notify(NoticeLevel::Error, &message),
            ChatCommand::Exit | ChatCommand::Empty => {}
        }
        Ok(())
    }

    async fn handle_ask(
        &mut self,
        paper: Option<&str>,
        question: &str,
        view: &mut TerminalView,
    ) -> Result<()> {
        self.controller.open(paper);
        match self.controller.send(question, view).await {
            SendOutcome::Failed(err) => Err(err.into()),
            SendOutcome::Ignored => bail!("the question is empty"),
            _ => Ok(()),
        }
    }

    async fn handle_papers(&mut self, filter: &str, view: &mut TerminalView) -> Result<()> {
        self.require_library().await?;
        let papers = self.library.filter(filter);
        view.show_papers(&papers, None);
        Ok(())
    }

    async fn handle_stats(&mut self, view: &mut TerminalView) -> Result<()> {
        self.require_library().await?;
        if let Some(stats) = self.library.stats() {
            view.show_stats(stats);
        }
        Ok(())
    }

    async fn handle_upload(&mut self, path: &Path, view: &mut TerminalView) -> Result<()> {
        let receipt = self.library.upload(path).await.context("Upload failed")?;
        view.notify(
            NoticeLevel::Success,
            &format!("Uploaded: {}", receipt.paper_name),
        );
        self.controller.announce_document(&receipt, view).await;
        Ok(())
    }

    async fn handle_delete(
        &mut self,
        name: &str,
        yes: bool,
        view: &mut TerminalView,
    ) -> Result<()> {
        if !yes && !ask_confirmation(&format!("Delete {name} from the library?"), false)? {
            println!("{}", "Delete cancelled.".yellow());
            return Ok(());
        }
        self.library.delete(name).await.context("Delete failed")?;
        self.controller.forget_paper(name, view);
        view.notify(NoticeLevel::Success, &format!("Deleted: {name}"));
        Ok(())
    }

    async fn handle_pdf(
        &mut self,
        name: &str,
        output: Option<PathBuf>,
        view: &mut TerminalView,
    ) -> Result<()> {
        let Some(dest) = output else {
            view.show_text(&self.library.pdf_url(name));
            return Ok(());
        };
        self.library.save_pdf(name, &dest).await?;
        view.notify(
            NoticeLevel::Success,
            &format!("Saved {}", dest.display()),
        );
        Ok(())
    }

    async fn handle_arxiv_search(&mut self, query: &str, view: &mut TerminalView) -> Result<()> {
        let papers = self
            .library
            .search_arxiv(query)
            .await
            .context("Search failed")?;
        view.show_arxiv_results(&papers);
        Ok(())
    }

    async fn handle_arxiv_add(&mut self, arxiv_id: &str, view: &mut TerminalView) -> Result<()> {
        if self.controller.add_arxiv_paper(arxiv_id, view).await.is_none() {
            bail!("could not add arXiv paper {arxiv_id}");
        }
        self.library.refresh().await;
        Ok(())
    }

    async fn handle_arxiv_download(
        &mut self,
        arxiv_id: &str,
        view: &mut TerminalView,
    ) -> Result<()> {
        let name = self
            .library
            .download_arxiv(arxiv_id)
            .await
            .context("Download failed")?;
        view.notify(NoticeLevel::Success, &format!("Downloaded: {name}"));
        Ok(())
    }

    fn handle_forget(&mut self, index: usize, view: &mut TerminalView) {
        if self.controller.delete_message(index, view) == 0 {
            view.notify(NoticeLevel::Error, &format!("No message at index {index}"));
        }
    }

    async fn handle_clear(&mut self, yes: bool, view: &mut TerminalView) -> Result<()> {
        let key = self.controller.active_key();
        if !yes && !ask_confirmation(&format!("Clear {key}?"), false)? {
            println!("{}", "Clear cancelled.".yellow());
            return Ok(());
        }
        if !self.controller.clear_history(view).await {
            bail!("could not clear {key}");
        }
        Ok(())
    }

    fn handle_export(&mut self, output: &Path, view: &mut TerminalView) -> Result<()> {
        let key = self.controller.active_key();
        let messages = render_conversation(self.controller.transcript().messages());
        write_transcript(output, &key, &messages)?;
        view.notify(
            NoticeLevel::Success,
            &format!("Exported {} messages to {}", messages.len(), output.display()),
        );
        Ok(())
    }

    /// Refreshes the library and fails when the service could not be reached.
    async fn require_library(&mut self) -> Result<()> {
        self.library.refresh().await;
        if self.library.stats().is_none() {
            bail!("paper service unreachable at {}", self.config.api_base);
        }
        Ok(())
    }
}
