use crate::history_service::ChatHistoryStore;
use crate::reveal::{Pacer, RevealAnimator};
use crate::view::{render_conversation, render_sources, ChatView, NoticeLevel, RenderedMessage};
use domain::api::{ApiResult, PaperApi};
use domain::conversation::{Conversation, ConversationKey};
use domain::error::ApiError;
use domain::library::{QueryAnswer, QueryRequest, UploadReceipt};
use domain::models::{Message, Source};
use domain::selection::Selection;
use domain::storage::KeyValueStore;
use shared::telemetry::Telemetry;
use shared::utils::truncate;

pub const THINKING_LABEL: &str = "Thinking...";
pub const ADDING_PAPER_LABEL: &str = "Downloading and processing paper...";
pub const QUERY_FAILED_REPLY: &str = "Sorry, an error occurred. Please try again.";
pub const ADD_PAPER_FAILED_REPLY: &str = "Sorry, I could not process this paper. Please try again.";

const SWITCH_NAME_LIMIT: usize = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input. Nothing was sent.
    Ignored,
    Answered { arxiv_fetched: Option<String> },
    Failed(ApiError),
    /// A newer query or a conversation switch made the response obsolete.
    Superseded,
}

impl SendOutcome {
    /// The service added a paper while answering; cached listings are stale.
    pub fn library_changed(&self) -> bool {
        matches!(
            self,
            SendOutcome::Answered {
                arxiv_fetched: Some(_)
            }
        )
    }
}

/// A question that has been shown and recorded but not yet answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingQuery {
    generation: u64,
    key: ConversationKey,
    question: String,
}

impl PendingQuery {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    pub fn question(&self) -> &str {
        &self.question
    }
}

/// Owns the active conversation and the selection, and drives the send flow
/// against the remote service.
///
/// Every query carries the generation it was submitted under; switching
/// conversations or submitting again bumps it, and a response arriving for an
/// older generation is dropped.
pub struct ConversationController<A, S, P> {
    api: A,
    store: ChatHistoryStore<S>,
    animator: RevealAnimator<P>,
    selection: Selection,
    transcript: Conversation,
    generation: u64,
}

impl<A, S, P> ConversationController<A, S, P>
where
    A: PaperApi,
    S: KeyValueStore,
    P: Pacer,
{
    pub fn new(api: A, store: ChatHistoryStore<S>, animator: RevealAnimator<P>) -> Self {
        let transcript = store.get(&ConversationKey::General);
        Self {
            api,
            store,
            animator,
            selection: Selection::default(),
            transcript,
            generation: 0,
        }
    }

    pub fn active_key(&self) -> ConversationKey {
        self.selection.key()
    }

    pub fn selected_paper(&self) -> Option<&str> {
        self.selection.paper()
    }

    pub fn transcript(&self) -> &Conversation {
        &self.transcript
    }

    pub fn store(&self) -> &ChatHistoryStore<S> {
        &self.store
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Sources of the newest answer in the active conversation.
    pub fn last_sources(&self) -> &[Source] {
        self.transcript
            .messages()
            .iter()
            .rev()
            .find(|m| m.is_assistant())
            .map(|m| m.sources.as_slice())
            .unwrap_or(&[])
    }

    /// Makes `paper` (general chat for `None`) the active conversation
    /// without touching the view. Unsaved changes of the previous one are
    /// dropped, so call it before anything has been sent.
    pub fn open(&mut self, paper: Option<&str>) {
        match paper {
            Some(name) => self.selection.select(name),
            None => self.selection.clear(),
        }
        self.generation += 1;
        self.transcript = self.store.get(&self.active_key());
    }

    pub fn render<V: ChatView>(&self, view: &mut V) {
        let rendered = render_conversation(self.transcript.messages());
        view.show_conversation(&self.active_key(), &rendered);
    }

    /// Submits, awaits and completes one question.
    pub async fn send<V: ChatView>(&mut self, question: &str, view: &mut V) -> SendOutcome {
        let Some(pending) = self.submit(question, view) else {
            return SendOutcome::Ignored;
        };
        let result = self.request(&pending).await;
        self.complete(pending, result, view).await
    }

    /// Records and shows the question, then locks input. Blank input is
    /// ignored.
    pub fn submit<V: ChatView>(&mut self, question: &str, view: &mut V) -> Option<PendingQuery> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }
        self.generation += 1;

        let message = Message::user(question);
        view.append_message(&RenderedMessage::from_message(self.transcript.len(), &message));
        self.transcript.push(message);
        view.set_send_enabled(false);
        view.set_working(Some(THINKING_LABEL));

        Some(PendingQuery {
            generation: self.generation,
            key: self.active_key(),
            question: question.to_string(),
        })
    }

    pub async fn request(&self, pending: &PendingQuery) -> ApiResult<QueryAnswer> {
        let request = QueryRequest {
            question: pending.question.clone(),
            auto_fetch_arxiv: true,
            paper_filter: pending.key.paper().map(str::to_string),
        };
        let timer = Telemetry::new();
        let result = self.api.query(&request).await;
        tracing::info!(
            conversation = %pending.key,
            elapsed_ms = timer.elapsed_ms() as u64,
            ok = result.is_ok(),
            "query finished"
        );
        result
    }

    /// Applies a response to the conversation it was asked in, unless that
    /// conversation is no longer the current one.
    pub async fn complete<V: ChatView>(
        &mut self,
        pending: PendingQuery,
        result: ApiResult<QueryAnswer>,
        view: &mut V,
    ) -> SendOutcome {
        if pending.generation != self.generation {
            tracing::debug!(
                conversation = %pending.key,
                submitted = pending.generation,
                current = self.generation,
                "dropping superseded response"
            );
            return SendOutcome::Superseded;
        }
        view.set_working(None);

        let outcome = match result {
            Ok(answer) => {
                let message = Message::assistant(answer.answer, answer.sources);
                self.reveal_assistant(message, view).await;
                self.flush(view);
                if let Some(name) = &answer.arxiv_fetched {
                    view.notify(NoticeLevel::Success, &format!("Auto-fetched: {name}"));
                }
                SendOutcome::Answered {
                    arxiv_fetched: answer.arxiv_fetched,
                }
            }
            Err(err) => {
                tracing::error!("query failed: {err}");
                self.append_assistant(Message::assistant(QUERY_FAILED_REPLY, Vec::new()), view);
                self.flush(view);
                view.notify(NoticeLevel::Error, "Query failed");
                SendOutcome::Failed(err)
            }
        };

        view.set_send_enabled(true);
        outcome
    }

    /// Selects `name`, or returns to general chat when it is already selected.
    pub fn select_paper<V: ChatView>(&mut self, name: &str, view: &mut V) {
        self.flush(view);
        let selected = self.selection.toggle(name);
        self.switch_to_selection(view);
        if selected {
            view.notify(
                NoticeLevel::Info,
                &format!("Switched to: {}", truncate(name, SWITCH_NAME_LIMIT)),
            );
        } else {
            view.notify(NoticeLevel::Info, "Showing general chat");
        }
    }

    /// Selects `name` without toggling. Does nothing if it is already selected.
    pub fn focus_paper<V: ChatView>(&mut self, name: &str, view: &mut V) {
        if self.selection.is_selected(name) {
            return;
        }
        self.flush(view);
        self.selection.select(name);
        self.switch_to_selection(view);
        view.notify(
            NoticeLevel::Info,
            &format!("Switched to: {}", truncate(name, SWITCH_NAME_LIMIT)),
        );
    }

    pub fn clear_selection<V: ChatView>(&mut self, view: &mut V) {
        if self.selection.paper().is_none() {
            return;
        }
        self.flush(view);
        self.selection.clear();
        self.switch_to_selection(view);
        view.notify(NoticeLevel::Info, "Showing general chat");
    }

    /// Deletes the message at `index` of the active conversation, taking a
    /// question's answer along. Returns how many messages were removed.
    pub fn delete_message<V: ChatView>(&mut self, index: usize, view: &mut V) -> usize {
        self.flush(view);
        let key = self.active_key();
        let removed = match self.store.delete_message(&key, index) {
            Ok(removed) => removed,
            Err(e) => {
                tracing::warn!("could not save conversation {key}: {e:#}");
                view.notify(NoticeLevel::Error, "Could not save chat history");
                0
            }
        };
        self.transcript = self.store.get(&key);
        self.render(view);
        removed
    }

    /// Clears the server-side context and, on success, the active
    /// conversation.
    pub async fn clear_history<V: ChatView>(&mut self, view: &mut V) -> bool {
        self.flush(view);
        match self.api.clear_history().await {
            Ok(()) => {
                let key = self.active_key();
                if let Err(e) = self.store.clear(&key) {
                    tracing::warn!("could not save conversation {key}: {e:#}");
                }
                self.transcript.clear();
                self.render(view);
                view.notify(NoticeLevel::Success, "Chat cleared");
                true
            }
            Err(err) => {
                tracing::error!("clear history failed: {err}");
                view.notify(NoticeLevel::Error, "Failed to clear history");
                false
            }
        }
    }

    /// Posts the confirmation shown after a local upload was indexed.
    pub async fn announce_document<V: ChatView>(&mut self, receipt: &UploadReceipt, view: &mut V) {
        let text = format!(
            "📄 **Document Added**: {}\n\nI've processed {} sections from this paper. You can now ask me questions about it!",
            receipt.paper_name, receipt.chunks_created
        );
        self.reveal_assistant(Message::assistant(text, Vec::new()), view)
            .await;
        self.flush(view);
    }

    /// Has the service fetch and index an arXiv paper, then switches to its
    /// conversation and posts the summary there. Returns the new paper name.
    pub async fn add_arxiv_paper<V: ChatView>(
        &mut self,
        arxiv_id: &str,
        view: &mut V,
    ) -> Option<String> {
        self.flush(view);
        view.set_working(Some(ADDING_PAPER_LABEL));
        let result = self.api.arxiv_add_to_chat(arxiv_id.trim()).await;
        view.set_working(None);

        match result {
            Ok(addition) => {
                self.selection.select(&addition.paper_name);
                self.switch_to_selection(view);
                let text = format!(
                    "📄 **Paper Added**: {}\n\n{}",
                    addition.paper_name, addition.summary
                );
                self.reveal_assistant(Message::assistant(text, addition.sources), view)
                    .await;
                self.flush(view);
                view.notify(
                    NoticeLevel::Success,
                    &format!("Added: {}", addition.paper_name),
                );
                Some(addition.paper_name)
            }
            Err(err) => {
                tracing::error!(arxiv_id, "adding arXiv paper failed: {err}");
                self.append_assistant(
                    Message::assistant(ADD_PAPER_FAILED_REPLY, Vec::new()),
                    view,
                );
                self.flush(view);
                view.notify(NoticeLevel::Error, "Failed to add paper");
                None
            }
        }
    }

    /// Drops the stored conversation of a paper that left the library.
    pub fn forget_paper<V: ChatView>(&mut self, name: &str, view: &mut V) {
        let key = ConversationKey::Paper(name.to_string());
        if let Err(e) = self.store.delete_conversation(&key) {
            tracing::warn!("could not delete conversation {key}: {e:#}");
        }
        if self.selection.is_selected(name) {
            self.selection.clear();
            self.switch_to_selection(view);
        }
    }

    /// Writes the active conversation through to storage.
    pub fn flush<V: ChatView>(&mut self, view: &mut V) {
        let key = self.active_key();
        if let Err(e) = self.store.save(&key, self.transcript.clone()) {
            tracing::warn!("could not save conversation {key}: {e:#}");
            view.notify(NoticeLevel::Error, "Could not save chat history");
        }
    }

    fn switch_to_selection<V: ChatView>(&mut self, view: &mut V) {
        self.generation += 1;
        self.transcript = self.store.get(&self.active_key());
        view.set_working(None);
        view.set_send_enabled(true);
        self.render(view);
    }

    async fn reveal_assistant<V: ChatView>(&mut self, message: Message, view: &mut V) {
        view.begin_assistant_message();
        self.animator.reveal(view, &message.content).await;
        if !message.sources.is_empty() {
            view.attach_sources(&message.sources, &render_sources(&message.sources));
        }
        view.end_assistant_message();
        self.transcript.push(message);
    }

    fn append_assistant<V: ChatView>(&mut self, message: Message, view: &mut V) {
        view.append_message(&RenderedMessage::from_message(self.transcript.len(), &message));
        self.transcript.push(message);
    }
}
