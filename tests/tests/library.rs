use application::library_service::LibraryService;
use domain::library::ArxivPaper;
use domain::upload_policy::UploadError;
use tests::support::FakePaperApi;

#[tokio::test]
async fn non_pdf_upload_is_rejected_without_a_request() {
    let api = FakePaperApi::default();
    let mut library = LibraryService::new(api.clone(), 5);
    let dir = tempfile::tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "not a paper").unwrap();

    let err = library.upload(&notes).await.unwrap_err();

    assert_eq!(
        err.downcast_ref::<UploadError>(),
        Some(&UploadError::NotPdf("notes.txt".into()))
    );
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn pdf_upload_sends_file_and_refreshes_listing() {
    let api = FakePaperApi::default();
    let mut library = LibraryService::new(api.clone(), 5);
    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("Attention.PDF");
    std::fs::write(&pdf, b"%PDF-1.7 body").unwrap();

    let receipt = library.upload(&pdf).await.unwrap();

    assert_eq!(receipt.paper_name, "Attention.PDF");
    assert_eq!(receipt.chunks_created, 12);
    assert_eq!(
        api.calls(),
        vec!["upload:Attention.PDF:13", "papers", "stats"]
    );
    assert!(library.contains("Attention.PDF"));
    assert_eq!(library.stats().map(|s| s.papers_indexed), Some(1));
}

#[tokio::test]
async fn missing_file_fails_before_any_request() {
    let api = FakePaperApi::default();
    let mut library = LibraryService::new(api.clone(), 5);

    assert!(library
        .upload(std::path::Path::new("/definitely/not/here.pdf"))
        .await
        .is_err());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn filter_works_on_cached_listing() {
    let api = FakePaperApi::default();
    api.add_paper("Attention Is All You Need.pdf");
    api.add_paper("BERT.pdf");
    let mut library = LibraryService::new(api, 5);
    library.refresh().await;

    let hits: Vec<_> = library
        .filter("bert")
        .into_iter()
        .map(|p| p.paper_name.as_str())
        .collect();
    assert_eq!(hits, vec!["BERT.pdf"]);
    assert_eq!(library.filter("").len(), 2);
}

#[tokio::test]
async fn blank_arxiv_search_sends_nothing() {
    let api = FakePaperApi::default();
    let library = LibraryService::new(api.clone(), 5);

    assert!(library.search_arxiv("   ").await.unwrap().is_empty());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn arxiv_search_uses_configured_result_count() {
    let api = FakePaperApi::default();
    api.set_search_results(vec![ArxivPaper {
        title: "Mamba".into(),
        authors: vec!["Gu".into(), "Dao".into()],
        summary: "Selective state spaces.".into(),
        arxiv_id: "2312.00752".into(),
    }]);
    let library = LibraryService::new(api.clone(), 3);

    let results = library.search_arxiv(" state space models ").await.unwrap();

    assert_eq!(results[0].arxiv_id, "2312.00752");
    assert_eq!(api.calls(), vec!["arxiv_search:state space models:3"]);
}

#[tokio::test]
async fn delete_and_download_keep_listing_current() {
    let api = FakePaperApi::default();
    api.add_paper("old.pdf");
    let mut library = LibraryService::new(api.clone(), 5);
    library.refresh().await;

    library.delete("old.pdf").await.unwrap();
    assert!(!library.contains("old.pdf"));

    let name = library.download_arxiv("2401.00001").await.unwrap();
    assert_eq!(name, "2401.00001.pdf");
    assert!(library.contains("2401.00001.pdf"));
}

#[tokio::test]
async fn saved_pdf_lands_at_destination() {
    let api = FakePaperApi::default();
    let library = LibraryService::new(api.clone(), 5);
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("copy.pdf");

    library.save_pdf("bert.pdf", &dest).await.unwrap();

    assert_eq!(std::fs::read(&dest).unwrap(), b"%PDF-1.4 fake");
    assert_eq!(
        library.pdf_url("bert.pdf"),
        "http://papers.test/api/papers/bert.pdf/pdf"
    );
}
