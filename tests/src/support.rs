use anyhow::anyhow;
use application::conversation_service::ConversationController;
use application::history_service::ChatHistoryStore;
use application::reveal::{Pacer, RenderTarget, RevealAnimator};
use application::view::{ChatView, NoticeLevel, RenderedMessage};
use domain::api::{ApiResult, PaperApi};
use domain::conversation::ConversationKey;
use domain::error::ApiError;
use domain::library::{
    ArxivAddition, ArxivDownload, ArxivPaper, IndexStats, PaperSummary, QueryAnswer, QueryRequest,
    UploadReceipt,
};
use domain::models::{Role, Source};
use domain::storage::KeyValueStore;
use shared::types::Result;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub type TestController = ConversationController<FakePaperApi, MemoryStore, InstantPacer>;

/// Controller over fresh fakes revealing two lines per second.
pub fn controller(api: &FakePaperApi, store: &MemoryStore, pacer: &InstantPacer) -> TestController {
    ConversationController::new(
        api.clone(),
        ChatHistoryStore::load(store.clone()),
        RevealAnimator::new(pacer.clone(), 2),
    )
}

pub fn fakes() -> (FakePaperApi, MemoryStore, InstantPacer) {
    (
        FakePaperApi::default(),
        MemoryStore::default(),
        InstantPacer::default(),
    )
}

pub fn source(paper: &str, section: &str) -> Source {
    Source {
        paper: paper.to_string(),
        section: section.to_string(),
    }
}

pub fn answer(text: &str) -> QueryAnswer {
    QueryAnswer {
        answer: text.to_string(),
        sources: Vec::new(),
        arxiv_fetched: None,
    }
}

/// In-memory `KeyValueStore`; clones share the same contents.
#[derive(Clone, Default)]
pub struct MemoryStore {
    values: Arc<Mutex<HashMap<String, String>>>,
    fail_writes: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn with(namespace: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .values
            .lock()
            .unwrap()
            .insert(namespace.to_string(), value.to_string());
        store
    }

    pub fn value(&self, namespace: &str) -> Option<String> {
        self.values.lock().unwrap().get(namespace).cloned()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl KeyValueStore for MemoryStore {
    fn read(&self, namespace: &str) -> Result<Option<String>> {
        Ok(self.value(namespace))
    }

    fn write(&self, namespace: &str, value: &str) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("disk full"));
        }
        self.values
            .lock()
            .unwrap()
            .insert(namespace.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct Script {
    answers: VecDeque<ApiResult<QueryAnswer>>,
    additions: VecDeque<ApiResult<ArxivAddition>>,
    search_results: Vec<ArxivPaper>,
    clear_error: Option<ApiError>,
    papers: Vec<PaperSummary>,
    queries: Vec<QueryRequest>,
    calls: Vec<String>,
}

/// Scripted `PaperApi`. Clones share the script and the call log.
#[derive(Clone, Default)]
pub struct FakePaperApi {
    script: Arc<Mutex<Script>>,
}

impl FakePaperApi {
    pub fn push_answer(&self, result: ApiResult<QueryAnswer>) {
        self.script.lock().unwrap().answers.push_back(result);
    }

    pub fn push_addition(&self, result: ApiResult<ArxivAddition>) {
        self.script.lock().unwrap().additions.push_back(result);
    }

    pub fn set_search_results(&self, papers: Vec<ArxivPaper>) {
        self.script.lock().unwrap().search_results = papers;
    }

    pub fn fail_clear(&self, error: ApiError) {
        self.script.lock().unwrap().clear_error = Some(error);
    }

    pub fn add_paper(&self, name: &str) {
        self.script.lock().unwrap().papers.push(PaperSummary {
            paper_name: name.to_string(),
            chunk_count: 3,
        });
    }

    pub fn queries(&self) -> Vec<QueryRequest> {
        self.script.lock().unwrap().queries.clone()
    }

    /// Every call made so far, as `name` or `name:argument`.
    pub fn calls(&self) -> Vec<String> {
        self.script.lock().unwrap().calls.clone()
    }

    fn record(&self, call: String) {
        self.script.lock().unwrap().calls.push(call);
    }
}

impl PaperApi for FakePaperApi {
    async fn stats(&self) -> ApiResult<IndexStats> {
        self.record("stats".to_string());
        let script = self.script.lock().unwrap();
        Ok(IndexStats {
            papers_indexed: script.papers.len() as u64,
            chunks_indexed: script.papers.iter().map(|p| p.chunk_count).sum(),
        })
    }

    async fn papers(&self) -> ApiResult<Vec<PaperSummary>> {
        self.record("papers".to_string());
        Ok(self.script.lock().unwrap().papers.clone())
    }

    async fn delete_paper(&self, name: &str) -> ApiResult<()> {
        self.record(format!("delete_paper:{name}"));
        self.script
            .lock()
            .unwrap()
            .papers
            .retain(|p| p.paper_name != name);
        Ok(())
    }

    async fn paper_pdf(&self, name: &str) -> ApiResult<Vec<u8>> {
        self.record(format!("paper_pdf:{name}"));
        Ok(b"%PDF-1.4 fake".to_vec())
    }

    fn pdf_url(&self, name: &str) -> String {
        format!("http://papers.test/api/papers/{name}/pdf")
    }

    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> ApiResult<UploadReceipt> {
        self.record(format!("upload:{file_name}:{}", bytes.len()));
        self.add_paper(file_name);
        Ok(UploadReceipt {
            paper_name: file_name.to_string(),
            chunks_created: 12,
        })
    }

    async fn query(&self, request: &QueryRequest) -> ApiResult<QueryAnswer> {
        self.record("query".to_string());
        let mut script = self.script.lock().unwrap();
        script.queries.push(request.clone());
        script
            .answers
            .pop_front()
            .unwrap_or_else(|| Ok(answer("ok")))
    }

    async fn arxiv_search(&self, query: &str, max_results: u32) -> ApiResult<Vec<ArxivPaper>> {
        self.record(format!("arxiv_search:{query}:{max_results}"));
        Ok(self.script.lock().unwrap().search_results.clone())
    }

    async fn arxiv_add_to_chat(&self, arxiv_id: &str) -> ApiResult<ArxivAddition> {
        self.record(format!("arxiv_add_to_chat:{arxiv_id}"));
        let next = self.script.lock().unwrap().additions.pop_front();
        let addition = next.unwrap_or_else(|| Err(ApiError::status(404, "not scripted")))?;
        self.add_paper(&addition.paper_name);
        Ok(addition)
    }

    async fn arxiv_download(&self, arxiv_id: &str) -> ApiResult<ArxivDownload> {
        self.record(format!("arxiv_download:{arxiv_id}"));
        let paper_name = format!("{arxiv_id}.pdf");
        self.add_paper(&paper_name);
        Ok(ArxivDownload { paper_name })
    }

    async fn clear_history(&self) -> ApiResult<()> {
        self.record("clear_history".to_string());
        match self.script.lock().unwrap().clear_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Pacer that returns at once and remembers what it was asked to wait.
#[derive(Clone, Default)]
pub struct InstantPacer {
    pauses: Arc<Mutex<Vec<Duration>>>,
}

impl InstantPacer {
    pub fn pauses(&self) -> Vec<Duration> {
        self.pauses.lock().unwrap().clone()
    }
}

impl Pacer for InstantPacer {
    async fn pause(&self, duration: Duration) {
        self.pauses.lock().unwrap().push(duration);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Show {
        key: ConversationKey,
        messages: Vec<RenderedMessage>,
    },
    Append(RenderedMessage),
    Begin,
    Frame(String),
    Sources(Vec<Source>, String),
    End,
    Working(Option<String>),
    SendEnabled(bool),
    Notice(NoticeLevel, String),
}

/// `ChatView` that records every call in order.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub events: Vec<ViewEvent>,
}

impl RecordingView {
    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Notice(level, text) => Some((*level, text.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn frames(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Frame(html) => Some(html.clone()),
                _ => None,
            })
            .collect()
    }

    /// The conversation shown most recently.
    pub fn shown(&self) -> Option<(&ConversationKey, &[RenderedMessage])> {
        self.events.iter().rev().find_map(|e| match e {
            ViewEvent::Show { key, messages } => Some((key, messages.as_slice())),
            _ => None,
        })
    }

    pub fn appended_roles(&self) -> Vec<Role> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Append(message) => Some(message.role),
                _ => None,
            })
            .collect()
    }

    pub fn last_send_enabled(&self) -> Option<bool> {
        self.events.iter().rev().find_map(|e| match e {
            ViewEvent::SendEnabled(enabled) => Some(*enabled),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl RenderTarget for RecordingView {
    fn replace_html(&mut self, html: &str) {
        self.events.push(ViewEvent::Frame(html.to_string()));
    }
}

impl ChatView for RecordingView {
    fn show_conversation(&mut self, key: &ConversationKey, messages: &[RenderedMessage]) {
        self.events.push(ViewEvent::Show {
            key: key.clone(),
            messages: messages.to_vec(),
        });
    }

    fn append_message(&mut self, message: &RenderedMessage) {
        self.events.push(ViewEvent::Append(message.clone()));
    }

    fn begin_assistant_message(&mut self) {
        self.events.push(ViewEvent::Begin);
    }

    fn attach_sources(&mut self, sources: &[Source], html: &str) {
        self.events
            .push(ViewEvent::Sources(sources.to_vec(), html.to_string()));
    }

    fn end_assistant_message(&mut self) {
        self.events.push(ViewEvent::End);
    }

    fn set_working(&mut self, label: Option<&str>) {
        self.events
            .push(ViewEvent::Working(label.map(str::to_string)));
    }

    fn set_send_enabled(&mut self, enabled: bool) {
        self.events.push(ViewEvent::SendEnabled(enabled));
    }

    fn notify(&mut self, level: NoticeLevel, text: &str) {
        self.events.push(ViewEvent::Notice(level, text.to_string()));
    }
}
