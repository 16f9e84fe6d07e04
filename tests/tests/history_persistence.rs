use application::conversation_service::ConversationController;
use application::history_service::{ChatHistoryStore, CORRUPT_NAMESPACE, HISTORY_NAMESPACE};
use application::reveal::RevealAnimator;
use application::view::NoticeLevel;
use domain::conversation::ConversationKey;
use domain::library::QueryAnswer;
use domain::models::Message;
use domain::storage::KeyValueStore;
use infrastructure::history_storage::SqliteStore;
use tests::support::{
    answer, controller, fakes, source, FakePaperApi, InstantPacer, MemoryStore, RecordingView,
};

#[tokio::test]
async fn conversations_survive_a_restart_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("history.db");
    let api = FakePaperApi::default();
    api.push_answer(Ok(QueryAnswer {
        answer: "Masked **language** modelling.".into(),
        sources: vec![source("bert.pdf", "3.1")],
        arxiv_fetched: None,
    }));

    {
        let mut ctl = ConversationController::new(
            api.clone(),
            ChatHistoryStore::load(SqliteStore::open(&db).unwrap()),
            RevealAnimator::new(InstantPacer::default(), 2),
        );
        let mut view = RecordingView::default();
        ctl.select_paper("bert.pdf", &mut view);
        ctl.send("How is BERT trained?", &mut view).await;
    }

    let reopened = ChatHistoryStore::load(SqliteStore::open(&db).unwrap());
    let conversation = reopened.get(&ConversationKey::Paper("bert.pdf".into()));
    assert_eq!(
        conversation.messages(),
        &[
            Message::user("How is BERT trained?"),
            Message::assistant(
                "Masked **language** modelling.",
                vec![source("bert.pdf", "3.1")]
            ),
        ]
    );
    let raw = reopened.backend().read(HISTORY_NAMESPACE).unwrap().unwrap();
    assert!(raw.starts_with(r#"{"version":1,"conversations":{"#));
    assert!(!raw.contains("<strong>"));
}

#[test]
fn legacy_unversioned_blob_is_set_aside() {
    let legacy = r#"{"__general__":[{"role":"user","content":"<p>hi</p>"}]}"#;
    let backend = SqliteStore::in_memory().unwrap();
    backend.write(HISTORY_NAMESPACE, legacy).unwrap();

    let store = ChatHistoryStore::load(&backend);

    assert!(store.keys().is_empty());
    assert_eq!(
        backend.read(CORRUPT_NAMESPACE).unwrap().as_deref(),
        Some(legacy)
    );
}

#[test]
fn future_version_is_not_interpreted() {
    let future = r#"{"version":2,"conversations":{"__general__":[{"role":"user","content":"hi"}]}}"#;
    let store = MemoryStore::with(HISTORY_NAMESPACE, future);

    let loaded = ChatHistoryStore::load(store.clone());

    assert!(loaded.get(&ConversationKey::General).is_empty());
    assert_eq!(store.value(CORRUPT_NAMESPACE).as_deref(), Some(future));
}

#[test]
fn wrong_shape_loads_empty() {
    let store = MemoryStore::with(HISTORY_NAMESPACE, r#"{"version":1,"conversations":[1,2]}"#);
    assert!(ChatHistoryStore::load(store).keys().is_empty());
}

#[tokio::test]
async fn failed_write_is_reported_but_chat_continues() {
    let (api, store, pacer) = fakes();
    let mut ctl = controller(&api, &store, &pacer);
    let mut view = RecordingView::default();
    api.push_answer(Ok(answer("still here")));
    store.fail_writes(true);

    ctl.send("hello", &mut view).await;

    assert_eq!(ctl.transcript().len(), 2);
    assert!(view
        .notices()
        .contains(&(NoticeLevel::Error, "Could not save chat history".to_string())));
    assert_eq!(store.value(HISTORY_NAMESPACE), None);
}
